// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. `contimg` should do as many
calculations as possible in double precision; the external imaging tools
receive stringified values at full precision.
 */

/// The default mask-threshold decay constant ("c0"); the mask threshold for
/// minor cycle `n` is `image_max / (c0 * (1 + n))`.
pub const DEFAULT_MASK_DECAY: f64 = 1.5;

/// The default ratio between the mask threshold and the clean-noise threshold
/// ("c1"). Must be greater than 1 so that cleaning always goes deeper than
/// masking.
pub const DEFAULT_MASK_TO_CLEAN_RATIO: f64 = 3.0;

/// The default multiplier applied to the theoretical thermal noise to form the
/// floor below which cleaning never proceeds.
pub const DEFAULT_NSIGMA: f64 = 3.0;

/// The default number of minor (mask -> clean -> restore) cycles per chunk.
pub const DEFAULT_MINOR_CYCLES: usize = 3;

/// The iteration cap handed to the external deconvolution routine. Cleaning is
/// bounded by the cutoff threshold, not this count; it only exists so a
/// pathological image cannot spin forever.
pub const CLEAN_ITERATION_CAP: u32 = 100_000;

/// Substituted for the median system temperature when the observation metadata
/// doesn't provide a usable value [K]. This keeps the stage running on
/// incomplete metadata rather than aborting.
pub const TSYS_FALLBACK_K: f64 = 30.0;

/// The default name of the visibility dataset inside each chunk directory.
pub const DEFAULT_VIS_NAME: &str = "vis";

/// The default image size [pixels]; images are square.
pub const DEFAULT_IMAGE_SIZE: u32 = 1024;

/// The default cell size [arcsec].
pub const DEFAULT_CELL_SIZE_ARCSEC: f64 = 1.5;

/// The default Stokes selection.
pub const DEFAULT_STOKES: &str = "i";

// Instrument defaults below correspond to a 64-antenna 13.5 m dish array
// observing at L band; override them for anything else.

/// The default antenna gain [Jy/K].
pub const DEFAULT_JY_PER_K: f64 = 22.0;

/// The default antenna diameter [m].
pub const DEFAULT_ANTENNA_DIAMETER_M: f64 = 13.5;

/// The default observing frequency [GHz].
pub const DEFAULT_FREQ_GHZ: f64 = 1.28;

/// The default primary-beam FWHM [arcsec].
pub const DEFAULT_BEAM_FWHM_ARCSEC: f64 = 3600.0;

/// The default antenna count.
pub const DEFAULT_NUM_ANTENNAS: u32 = 64;

/// The default per-chunk bandwidth [GHz].
pub const DEFAULT_BANDWIDTH_GHZ: f64 = 0.05;

/// The default total integration time [min].
pub const DEFAULT_INTEGRATION_TIME_MIN: f64 = 600.0;

/// The default correlator efficiency factor.
pub const DEFAULT_EFFICIENCY: f64 = 0.88;
