// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The theoretical thermal-noise floor. The actual number comes from the
//! external noise-estimation routine; this module carries the instrument
//! parameters to it and applies the missing-metadata policy.

use std::path::Path;

use log::{debug, warn};

use super::ImagingError;
use crate::{
    constants::TSYS_FALLBACK_K,
    tools::{ImageOps, NoiseRequest},
};

/// Instrument and observation parameters feeding the noise estimate, plus the
/// multiplier that turns the estimate into the cleaning floor.
#[derive(Debug, Clone)]
pub struct NoiseConfig {
    /// Median system temperature [K]. NaN means the observation metadata
    /// didn't provide one; [`TSYS_FALLBACK_K`] is substituted.
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
    /// Bandwidth of the dataset being imaged [GHz].
    pub bandwidth_ghz: f64,
    /// Total integration time [min].
    pub integration_time_min: f64,
    /// Correlator efficiency factor.
    pub efficiency: f64,
    /// The cleaning floor is `nsigma` times the theoretical noise.
    pub nsigma: f64,
}

impl NoiseConfig {
    /// The theoretical thermal noise for `vis` [Jy]: one blocking call to the
    /// external estimation routine. A non-finite or negative result is fatal
    /// for the enclosing target.
    pub fn theoretical_noise(
        &self,
        tools: &dyn ImageOps,
        target: &str,
        vis: &Path,
    ) -> Result<f64, ImagingError> {
        let tsys_k = if self.tsys_k.is_finite() {
            self.tsys_k
        } else {
            // Deliberate policy: keep the stage running on incomplete
            // metadata.
            warn!("Chunk {target}: no usable system temperature; assuming {TSYS_FALLBACK_K} K");
            TSYS_FALLBACK_K
        };
        let request = NoiseRequest {
            vis: vis.to_path_buf(),
            tsys_k,
            jy_per_k: self.jy_per_k,
            antenna_diameter_m: self.antenna_diameter_m,
            freq_ghz: self.freq_ghz,
            beam_fwhm_arcsec: self.beam_fwhm_arcsec,
            num_antennas: self.num_antennas,
            bandwidth_ghz: self.bandwidth_ghz,
            integration_time_min: self.integration_time_min,
            efficiency: self.efficiency,
        };
        let noise = tools.noise_estimate(&request).map_err(|err| {
            ImagingError::Tool {
                target: target.to_string(),
                err,
            }
        })?;
        if !noise.is_finite() || noise < 0.0 {
            return Err(ImagingError::BadNoise {
                target: target.to_string(),
                value: noise,
            });
        }
        debug!("Chunk {target}: theoretical noise {noise:e} Jy");
        Ok(noise)
    }

    /// The flux-density floor below which cleaning never proceeds.
    pub fn noise_floor(
        &self,
        tools: &dyn ImageOps,
        target: &str,
        vis: &Path,
    ) -> Result<f64, ImagingError> {
        Ok(self.nsigma * self.theoretical_noise(tools, target, vis)?)
    }
}
