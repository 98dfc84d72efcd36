// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{path::PathBuf, sync::Arc};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use vec1::Vec1;

use crate::{
    chunks::FrequencyChunk,
    imaging::{image_target, noise::NoiseConfig, thresholds::ThresholdSchedule, ImageGeometry,
              ImagingSetup},
    tools::{ImageOps, ToolError},
    PROGRESS_BARS,
};

/// How the per-chunk data become one final product. Fixed for the whole run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
pub(crate) enum CombineMode {
    /// Image every chunk independently, then linearly combine the final
    /// images into a mosaic.
    #[serde(rename = "stack")]
    #[strum(serialize = "stack")]
    Stack,

    /// Concatenate the chunk visibilities first and run a single joint clean
    /// over the combined dataset.
    #[serde(rename = "mf")]
    #[strum(serialize = "mf")]
    Mf,
}

pub(crate) struct ContinuumParams {
    pub(crate) work_dir: PathBuf,
    pub(crate) chunks: Vec1<FrequencyChunk>,
    pub(crate) mode: CombineMode,
    pub(crate) schedule: ThresholdSchedule,
    pub(crate) noise: NoiseConfig,
    pub(crate) cycles: usize,
    pub(crate) geometry: ImageGeometry,
    pub(crate) keep_intermediates: bool,
    /// Also export the final product to FITS.
    pub(crate) fits_output: bool,
    pub(crate) tools: Arc<dyn ImageOps>,
}

impl ContinuumParams {
    pub(crate) fn run(&self) -> Result<(), ContinuumError> {
        let num_targets = match self.mode {
            CombineMode::Stack => self.chunks.len(),
            CombineMode::Mf => 1,
        };
        let progress = ProgressBar::with_draw_target(
            Some((num_targets * self.cycles) as u64),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:16}: [{wide_bar:.blue}] {pos:3}/{len:3} minor cycles ({elapsed_precise}<{eta_precise})")
                .unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Cleaning");

        let setup = ImagingSetup {
            tools: self.tools.as_ref(),
            schedule: self.schedule,
            noise: &self.noise,
            cycles: self.cycles,
            geometry: &self.geometry,
            keep_intermediates: self.keep_intermediates,
        };

        match self.mode {
            CombineMode::Stack => {
                info!(
                    "Imaging {} chunks independently, then mosaicking",
                    self.chunks.len()
                );
                // Chunks are independent; each writes only inside its own
                // directory. The collect is the barrier before combining.
                let outcomes = self
                    .chunks
                    .as_slice()
                    .par_iter()
                    .map(|chunk| {
                        image_target(&setup, &chunk.name, &chunk.dir, &chunk.vis, &progress)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                progress.finish_and_clear();

                let images: Vec<PathBuf> = outcomes.iter().map(|o| o.image.clone()).collect();
                let mosaic = self.work_dir.join("mosaic");
                debug!("Combining {} chunk images into a mosaic", images.len());
                self.tools
                    .linear_mosaic(&images, &mosaic)
                    .map_err(ContinuumError::Combine)?;
                if self.fits_output {
                    let fits = self.work_dir.join("mosaic.fits");
                    self.tools
                        .fits_export(&mosaic, &fits)
                        .map_err(ContinuumError::Fits)?;
                    info!("Wrote {}", fits.display());
                }
                info!("Wrote {}", mosaic.display());
            }

            CombineMode::Mf => {
                info!(
                    "Concatenating {} chunks, then imaging jointly",
                    self.chunks.len()
                );
                let mf_dir = self.work_dir.join("mf");
                std::fs::create_dir_all(&mf_dir)?;
                let vis_paths: Vec<PathBuf> =
                    self.chunks.iter().map(|c| c.vis.clone()).collect();
                let joint_vis = mf_dir.join("vis");
                self.tools
                    .concat_vis(&vis_paths, &joint_vis)
                    .map_err(ContinuumError::Concat)?;

                let outcome = image_target(&setup, "mf", &mf_dir, &joint_vis, &progress)?;
                progress.finish_and_clear();
                if self.fits_output {
                    let fits = mf_dir.join("image.fits");
                    self.tools
                        .fits_export(&outcome.image, &fits)
                        .map_err(ContinuumError::Fits)?;
                    info!("Wrote {}", fits.display());
                }
                info!("Wrote {}", outcome.image.display());
            }
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum ContinuumError {
    #[error(transparent)]
    Imaging(#[from] crate::imaging::ImagingError),

    #[error("Combining chunk images: {0}")]
    Combine(#[source] ToolError),

    #[error("Concatenating chunk visibilities: {0}")]
    Concat(#[source] ToolError),

    #[error("Exporting FITS: {0}")]
    Fits(#[source] ToolError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
