// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Continuum-imaging stage orchestrator for radio-interferometry pipelines.

An upstream stage splits the observed bandwidth into frequency chunks; this
crate drives external imaging binaries through an adaptive minor-cycle CLEAN
loop over those chunks and combines the results into a final product.
 */

pub mod chunks;
pub mod cli;
pub(crate) mod constants;
pub mod imaging;
pub(crate) mod params;
pub mod tools;

#[cfg(test)]
mod tests;

// Re-exports.
pub use cli::{Contimg, ContimgError};

use crossbeam_utils::atomic::AtomicCell;

/// Are progress bars enabled?
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
