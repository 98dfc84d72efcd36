// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::Parser;
use log::{debug, info};

use crate::{
    constants::*,
    imaging::noise::NoiseConfig,
    tools::MiriadTools,
    ContimgError,
};

/// Print the theoretical thermal-noise estimate for a visibility dataset.
#[derive(Parser, Debug)]
pub(super) struct NoiseArgs {
    /// Path to the visibility dataset.
    #[clap(name = "VIS", parse(from_os_str))]
    vis: PathBuf,

    /// The median system temperature [K]. When not supplied, 30 K is assumed.
    #[clap(long, allow_hyphen_values = true)]
    tsys: Option<f64>,

    /// The antenna gain [Jy/K].
    #[clap(long, default_value_t = DEFAULT_JY_PER_K)]
    jy_per_k: f64,

    /// The antenna diameter [m].
    #[clap(long, default_value_t = DEFAULT_ANTENNA_DIAMETER_M)]
    antenna_diameter: f64,

    /// The observing frequency [GHz].
    #[clap(long, default_value_t = DEFAULT_FREQ_GHZ)]
    freq: f64,

    /// The primary-beam FWHM [arcsec].
    #[clap(long, default_value_t = DEFAULT_BEAM_FWHM_ARCSEC)]
    beam_fwhm: f64,

    /// The number of antennas in the array.
    #[clap(long, default_value_t = DEFAULT_NUM_ANTENNAS)]
    num_antennas: u32,

    /// The bandwidth [GHz].
    #[clap(long, default_value_t = DEFAULT_BANDWIDTH_GHZ)]
    bandwidth: f64,

    /// The total integration time [min].
    #[clap(long, default_value_t = DEFAULT_INTEGRATION_TIME_MIN)]
    integration_time: f64,

    /// The correlator efficiency factor.
    #[clap(long, default_value_t = DEFAULT_EFFICIENCY)]
    efficiency: f64,
}

impl NoiseArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), ContimgError> {
        debug!("{:#?}", self);

        // Same policy as the continuum stage: a missing or NaN system
        // temperature is substituted by the estimator, but a non-positive one
        // is meaningless and gets rejected before any external call.
        let tsys_k = self.tsys.unwrap_or(f64::NAN);
        if tsys_k.is_finite() && tsys_k <= 0.0 {
            return Err(NoiseArgsError::BadTsys(tsys_k).into());
        }

        let config = NoiseConfig {
            tsys_k,
            jy_per_k: self.jy_per_k,
            antenna_diameter_m: self.antenna_diameter,
            freq_ghz: self.freq,
            beam_fwhm_arcsec: self.beam_fwhm,
            num_antennas: self.num_antennas,
            bandwidth_ghz: self.bandwidth,
            integration_time_min: self.integration_time,
            efficiency: self.efficiency,
            // Unused here; the floor only matters to the cleaning loop.
            nsigma: 1.0,
        };

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let tools = MiriadTools::new();
        let target = self.vis.display().to_string();
        let noise = config.theoretical_noise(&tools, &target, &self.vis)?;
        info!("Theoretical noise: {:.3} uJy", noise * 1e6);
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum NoiseArgsError {
    #[error("The system temperature must be positive, got {0} K")]
    BadTsys(f64),
}
