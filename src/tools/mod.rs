// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The external "image operations" collaborator. Every imaging, masking,
//! cleaning and combining step is a blocking invocation of an external binary
//! that reads and writes named datasets on disk; this module defines the typed
//! contract for those invocations so the rest of the crate never builds
//! command lines by hand, and so the whole collaborator can be replaced with a
//! recording fake in tests.

mod miriad;

pub use miriad::MiriadTools;

use std::path::{Path, PathBuf};

use strum_macros::Display;
use thiserror::Error;

/// Which restore product `restore` should write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RestoreMode {
    /// The model convolved with the clean beam plus residuals; the
    /// displayable image.
    #[strum(serialize = "clean")]
    Clean,

    /// Only the residuals; the input to the next minor cycle's statistics.
    #[strum(serialize = "residual")]
    Residual,
}

/// Everything needed to produce a dirty map and beam from a visibility
/// dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct InvertRequest {
    pub vis: PathBuf,
    pub map: PathBuf,
    pub beam: PathBuf,
    /// Image size in pixels (square images only).
    pub image_size: u32,
    /// Cell size [arcsec].
    pub cell_size: f64,
    /// Stokes selection, e.g. "i".
    pub stokes: String,
    /// Extra tool-specific options, passed through verbatim.
    pub options: Vec<String>,
}

/// Everything needed for one bounded deconvolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRequest {
    pub map: PathBuf,
    pub beam: PathBuf,
    /// Continue from this model when present (minor cycles after the first).
    pub model_in: Option<PathBuf>,
    pub model_out: PathBuf,
    /// The flux-density cutoff; cleaning stops here, not at the iteration
    /// cap.
    pub cutoff: f64,
    pub max_iterations: u32,
    /// Restrict cleaning to this region/mask when present.
    pub region: Option<PathBuf>,
}

/// Inputs to the theoretical thermal-noise estimation routine.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseRequest {
    pub vis: PathBuf,
    /// Median system temperature [K].
    pub tsys_k: f64,
    /// Antenna gain [Jy/K].
    pub jy_per_k: f64,
    /// Antenna diameter [m].
    pub antenna_diameter_m: f64,
    /// Observing frequency [GHz].
    pub freq_ghz: f64,
    /// Primary-beam FWHM [arcsec].
    pub beam_fwhm_arcsec: f64,
    pub num_antennas: u32,
    /// Bandwidth [GHz].
    pub bandwidth_ghz: f64,
    /// Total integration time [min].
    pub integration_time_min: f64,
    /// Correlator efficiency factor.
    pub efficiency: f64,
}

/// The operations the imaging stage needs from the external tool suite. All
/// calls block until the underlying process exits; outputs are datasets on
/// disk identified by path.
pub trait ImageOps: Send + Sync {
    /// Produce a dirty map and beam from a visibility dataset.
    fn invert(&self, req: &InvertRequest) -> Result<(), ToolError>;

    /// Write a mask selecting pixels of `input` above `threshold`.
    fn mask(&self, input: &Path, output: &Path, threshold: f64) -> Result<(), ToolError>;

    /// Deconvolve down to the request's cutoff.
    fn clean(&self, req: &CleanRequest) -> Result<(), ToolError>;

    /// Restore a model against a map and beam, in either clean or residual
    /// mode.
    fn restore(
        &self,
        model: &Path,
        beam: &Path,
        map: &Path,
        mode: RestoreMode,
        out: &Path,
    ) -> Result<(), ToolError>;

    /// Linearly combine images into a single mosaic.
    fn linear_mosaic(&self, images: &[PathBuf], out: &Path) -> Result<(), ToolError>;

    /// Concatenate visibility datasets into one.
    fn concat_vis(&self, inputs: &[PathBuf], out: &Path) -> Result<(), ToolError>;

    /// The theoretical thermal noise for a dataset [Jy].
    fn noise_estimate(&self, req: &NoiseRequest) -> Result<f64, ToolError>;

    /// The maximum pixel value of an image.
    fn image_max(&self, image: &Path) -> Result<f64, ToolError>;

    /// Export an image dataset to FITS.
    fn fits_export(&self, image: &Path, out: &Path) -> Result<(), ToolError>;
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Couldn't spawn '{tool}'; is it installed and on PATH? ({err})")]
    Spawn {
        tool: &'static str,
        err: std::io::Error,
    },

    #[error("'{tool}' failed with exit code {code:?}:\n{stderr}")]
    Failed {
        tool: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{tool}' exited successfully but expected output '{path}' doesn't exist")]
    MissingOutput { tool: &'static str, path: PathBuf },

    #[error("Couldn't parse the output of '{tool}': {details}")]
    UnparsableOutput {
        tool: &'static str,
        details: String,
    },
}
