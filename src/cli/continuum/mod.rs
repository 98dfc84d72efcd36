// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::{path::PathBuf, str::FromStr, sync::Arc};

use clap::Parser;
use itertools::Itertools;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use super::common::{display_warnings, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    chunks::{discover_chunks, ChunkError},
    constants::*,
    imaging::{noise::NoiseConfig, thresholds::ThresholdSchedule, ImageGeometry},
    params::{CombineMode, ContinuumParams},
    tools::MiriadTools,
    ContimgError,
};

lazy_static::lazy_static! {
    static ref MODE_HELP: String = format!(
        "How the frequency chunks become one product. Valid modes: {}. Default: stack",
        CombineMode::iter().join(", "));

    static ref VIS_NAME_HELP: String = format!(
        "The name of the visibility dataset inside each chunk directory. Default: {DEFAULT_VIS_NAME}");

    static ref CYCLES_HELP: String = format!(
        "The number of minor (mask -> clean -> restore) cycles per chunk. Default: {DEFAULT_MINOR_CYCLES}");

    static ref MASK_DECAY_HELP: String = format!(
        "The mask-threshold decay constant; the mask threshold for cycle n is image_max / (mask_decay * (1 + n)). Default: {DEFAULT_MASK_DECAY}");

    static ref RATIO_HELP: String = format!(
        "The ratio between the mask threshold and the clean-noise threshold. Default: {DEFAULT_MASK_TO_CLEAN_RATIO}");

    static ref NSIGMA_HELP: String = format!(
        "Cleaning never goes below nsigma times the theoretical thermal noise. Default: {DEFAULT_NSIGMA}");

    static ref SIZE_HELP: String = format!(
        "The image size [pixels]; images are square. Default: {DEFAULT_IMAGE_SIZE}");

    static ref CELL_HELP: String = format!(
        "The cell size [arcsec]. Default: {DEFAULT_CELL_SIZE_ARCSEC}");

    static ref STOKES_HELP: String = format!(
        "The Stokes selection handed to invert. Default: {DEFAULT_STOKES}");

    static ref JY_PER_K_HELP: String = format!(
        "The antenna gain [Jy/K]. Default: {DEFAULT_JY_PER_K}");

    static ref ANTENNA_DIAMETER_HELP: String = format!(
        "The antenna diameter [m]. Default: {DEFAULT_ANTENNA_DIAMETER_M}");

    static ref FREQ_HELP: String = format!(
        "The observing frequency [GHz]. Default: {DEFAULT_FREQ_GHZ}");

    static ref BEAM_FWHM_HELP: String = format!(
        "The primary-beam FWHM [arcsec]. Default: {DEFAULT_BEAM_FWHM_ARCSEC}");

    static ref NUM_ANTENNAS_HELP: String = format!(
        "The number of antennas in the array. Default: {DEFAULT_NUM_ANTENNAS}");

    static ref BANDWIDTH_HELP: String = format!(
        "The bandwidth of each chunk [GHz]. Default: {DEFAULT_BANDWIDTH_GHZ}");

    static ref INTEGRATION_TIME_HELP: String = format!(
        "The total integration time [min]. Default: {DEFAULT_INTEGRATION_TIME_MIN}");

    static ref EFFICIENCY_HELP: String = format!(
        "The correlator efficiency factor. Default: {DEFAULT_EFFICIENCY}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ContinuumArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The working directory containing the numbered frequency-chunk
    /// directories left by the splitting stage.
    #[clap(short, long, help_heading = "INPUT DATA")]
    pub(super) work_dir: Option<PathBuf>,

    #[clap(long, help = VIS_NAME_HELP.as_str(), help_heading = "INPUT DATA")]
    pub(super) vis_name: Option<String>,

    #[clap(short, long, help = MODE_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) mode: Option<String>,

    #[clap(short = 'n', long, help = CYCLES_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) cycles: Option<usize>,

    #[clap(long, help = MASK_DECAY_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) mask_decay: Option<f64>,

    #[clap(long, help = RATIO_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) mask_to_clean_ratio: Option<f64>,

    #[clap(long, help = NSIGMA_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) nsigma: Option<f64>,

    #[clap(long, help = SIZE_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) size: Option<u32>,

    #[clap(long, help = CELL_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) cell: Option<f64>,

    #[clap(long, help = STOKES_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) stokes: Option<String>,

    /// Extra options handed verbatim to the invert operation.
    #[clap(long, multiple_values(true), help_heading = "IMAGING")]
    pub(super) invert_options: Option<Vec<String>>,

    /// The median system temperature [K]. When not supplied (or not finite),
    /// 30 K is assumed.
    #[clap(long, help_heading = "INSTRUMENT", allow_hyphen_values = true)]
    pub(super) tsys: Option<f64>,

    #[clap(long, help = JY_PER_K_HELP.as_str(), help_heading = "INSTRUMENT")]
    pub(super) jy_per_k: Option<f64>,

    #[clap(long, help = ANTENNA_DIAMETER_HELP.as_str(), help_heading = "INSTRUMENT")]
    pub(super) antenna_diameter: Option<f64>,

    #[clap(long, help = FREQ_HELP.as_str(), help_heading = "INSTRUMENT")]
    pub(super) freq: Option<f64>,

    #[clap(long, help = BEAM_FWHM_HELP.as_str(), help_heading = "INSTRUMENT")]
    pub(super) beam_fwhm: Option<f64>,

    #[clap(long, help = NUM_ANTENNAS_HELP.as_str(), help_heading = "INSTRUMENT")]
    pub(super) num_antennas: Option<u32>,

    #[clap(long, help = BANDWIDTH_HELP.as_str(), help_heading = "INSTRUMENT")]
    pub(super) bandwidth: Option<f64>,

    #[clap(long, help = INTEGRATION_TIME_HELP.as_str(), help_heading = "INSTRUMENT")]
    pub(super) integration_time: Option<f64>,

    #[clap(long, help = EFFICIENCY_HELP.as_str(), help_heading = "INSTRUMENT")]
    pub(super) efficiency: Option<f64>,

    /// Keep per-cycle intermediate products instead of deleting them once a
    /// chunk's loop finishes.
    #[clap(long, help_heading = "OUTPUT FILES")]
    #[serde(default)]
    pub(super) keep_intermediates: bool,

    /// Also export the final product to FITS.
    #[clap(long, help_heading = "OUTPUT FILES")]
    #[serde(default)]
    pub(super) fits: bool,
}

impl ContinuumArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified
    /// into a single struct. Where applicable, it will prefer CLI parameters
    /// over those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<ContinuumArgs, ContimgError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let ContinuumArgs {
                args_file: _,
                work_dir,
                vis_name,
                mode,
                cycles,
                mask_decay,
                mask_to_clean_ratio,
                nsigma,
                size,
                cell,
                stokes,
                invert_options,
                tsys,
                jy_per_k,
                antenna_diameter,
                freq,
                beam_fwhm,
                num_antennas,
                bandwidth,
                integration_time,
                efficiency,
                keep_intermediates,
                fits,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when
            // available.
            Ok(ContinuumArgs {
                args_file: None,
                work_dir: cli_args.work_dir.or(work_dir),
                vis_name: cli_args.vis_name.or(vis_name),
                mode: cli_args.mode.or(mode),
                cycles: cli_args.cycles.or(cycles),
                mask_decay: cli_args.mask_decay.or(mask_decay),
                mask_to_clean_ratio: cli_args.mask_to_clean_ratio.or(mask_to_clean_ratio),
                nsigma: cli_args.nsigma.or(nsigma),
                size: cli_args.size.or(size),
                cell: cli_args.cell.or(cell),
                stokes: cli_args.stokes.or(stokes),
                invert_options: cli_args.invert_options.or(invert_options),
                tsys: cli_args.tsys.or(tsys),
                jy_per_k: cli_args.jy_per_k.or(jy_per_k),
                antenna_diameter: cli_args.antenna_diameter.or(antenna_diameter),
                freq: cli_args.freq.or(freq),
                beam_fwhm: cli_args.beam_fwhm.or(beam_fwhm),
                num_antennas: cli_args.num_antennas.or(num_antennas),
                bandwidth: cli_args.bandwidth.or(bandwidth),
                integration_time: cli_args.integration_time.or(integration_time),
                efficiency: cli_args.efficiency.or(efficiency),
                keep_intermediates: cli_args.keep_intermediates || keep_intermediates,
                fits: cli_args.fits || fits,
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ContinuumParams, ContimgError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            work_dir,
            vis_name,
            mode,
            cycles,
            mask_decay,
            mask_to_clean_ratio,
            nsigma,
            size,
            cell,
            stokes,
            invert_options,
            tsys,
            jy_per_k,
            antenna_diameter,
            freq,
            beam_fwhm,
            num_antennas,
            bandwidth,
            integration_time,
            efficiency,
            keep_intermediates,
            fits,
        } = self;

        let work_dir = work_dir.ok_or(ContinuumArgsError::NoWorkDir)?;
        if !work_dir.is_dir() {
            return Err(ContinuumArgsError::DoesNotExist(work_dir).into());
        }

        let mode = match mode {
            None => CombineMode::Stack,
            Some(s) => CombineMode::from_str(&s)
                .map_err(|_| ContinuumArgsError::UnknownMode(s))?,
        };

        let cycles = cycles.unwrap_or(DEFAULT_MINOR_CYCLES);
        if cycles == 0 {
            return Err(ContinuumArgsError::ZeroCycles.into());
        }

        let mask_decay = mask_decay.unwrap_or(DEFAULT_MASK_DECAY);
        if !(mask_decay > 0.0) {
            return Err(ContinuumArgsError::BadMaskDecay(mask_decay).into());
        }
        let mask_to_clean_ratio = mask_to_clean_ratio.unwrap_or(DEFAULT_MASK_TO_CLEAN_RATIO);
        if !(mask_to_clean_ratio > 0.0) {
            return Err(ContinuumArgsError::BadRatio(mask_to_clean_ratio).into());
        }
        if mask_to_clean_ratio <= 1.0 {
            format!(
                "mask-to-clean-ratio {mask_to_clean_ratio} <= 1 means cleaning is shallower than masking"
            )
            .warn();
        }
        let nsigma = nsigma.unwrap_or(DEFAULT_NSIGMA);
        if !(nsigma > 0.0) {
            return Err(ContinuumArgsError::BadNsigma(nsigma).into());
        }

        // A missing or NaN system temperature is substituted later; a
        // non-positive one is meaningless and gets rejected before any
        // external call.
        let tsys_k = tsys.unwrap_or(f64::NAN);
        if tsys_k.is_finite() && tsys_k <= 0.0 {
            return Err(ContinuumArgsError::BadTsys(tsys_k).into());
        }

        let efficiency = efficiency.unwrap_or(DEFAULT_EFFICIENCY);
        if !(efficiency > 0.0) {
            return Err(ContinuumArgsError::BadEfficiency(efficiency).into());
        }

        let vis_name = vis_name.unwrap_or_else(|| DEFAULT_VIS_NAME.to_string());
        let chunks = discover_chunks(&work_dir, &vis_name).map_err(ContinuumArgsError::from)?;

        let schedule = ThresholdSchedule {
            mask_decay,
            mask_to_clean_ratio,
        };
        let noise = NoiseConfig {
            tsys_k,
            jy_per_k: jy_per_k.unwrap_or(DEFAULT_JY_PER_K),
            antenna_diameter_m: antenna_diameter.unwrap_or(DEFAULT_ANTENNA_DIAMETER_M),
            freq_ghz: freq.unwrap_or(DEFAULT_FREQ_GHZ),
            beam_fwhm_arcsec: beam_fwhm.unwrap_or(DEFAULT_BEAM_FWHM_ARCSEC),
            num_antennas: num_antennas.unwrap_or(DEFAULT_NUM_ANTENNAS),
            bandwidth_ghz: bandwidth.unwrap_or(DEFAULT_BANDWIDTH_GHZ),
            integration_time_min: integration_time.unwrap_or(DEFAULT_INTEGRATION_TIME_MIN),
            efficiency,
            nsigma,
        };
        let geometry = ImageGeometry {
            image_size: size.unwrap_or(DEFAULT_IMAGE_SIZE),
            cell_size: cell.unwrap_or(DEFAULT_CELL_SIZE_ARCSEC),
            stokes: stokes.unwrap_or_else(|| DEFAULT_STOKES.to_string()),
            invert_options: invert_options.unwrap_or_default(),
        };

        let mut printer = InfoPrinter::new("Continuum imaging".into());
        printer.push_line(format!("Working directory: {}", work_dir.display()).into());
        printer.push_line(
            format!(
                "{} chunks ({}..{}), mode {mode}",
                chunks.len(),
                chunks.first().name,
                chunks.last().name
            )
            .into(),
        );
        printer.push_line(
            format!(
                "{cycles} minor cycles, mask decay {mask_decay}, mask/clean ratio \
                 {mask_to_clean_ratio}, {nsigma} sigma floor"
            )
            .into(),
        );
        printer.push_line(
            format!(
                "{0}x{0} pixel images, {1} arcsec cells, stokes {2}",
                geometry.image_size, geometry.cell_size, geometry.stokes
            )
            .into(),
        );
        printer.display();

        display_warnings();

        Ok(ContinuumParams {
            work_dir,
            chunks,
            mode,
            schedule,
            noise,
            cycles,
            geometry,
            keep_intermediates,
            fits_output: fits,
            tools: Arc::new(MiriadTools::new()),
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), ContimgError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run()?;
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum ContinuumArgsError {
    #[error("No working directory was specified")]
    NoWorkDir,

    #[error("Working directory '{}' doesn't exist or isn't a directory", .0.display())]
    DoesNotExist(PathBuf),

    #[error("The minor-cycle budget must be at least 1")]
    ZeroCycles,

    #[error("The mask-decay constant must be positive, got {0}")]
    BadMaskDecay(f64),

    #[error("The mask-to-clean ratio must be positive, got {0}")]
    BadRatio(f64),

    #[error("nsigma must be positive, got {0}")]
    BadNsigma(f64),

    #[error("The system temperature must be positive, got {0} K")]
    BadTsys(f64),

    #[error("The correlator efficiency must be positive, got {0}")]
    BadEfficiency(f64),

    #[error("Unrecognised combination mode '{0}'; valid modes are stack, mf")]
    UnknownMode(String),

    #[error(transparent)]
    Chunk(#[from] ChunkError),
}
