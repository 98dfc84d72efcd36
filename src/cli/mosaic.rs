// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use log::{debug, info};
use vec1::Vec1;

use crate::{
    params::MosaicParams,
    tools::MiriadTools,
    ContimgError,
};

/// Linearly combine existing per-chunk images into one mosaic.
#[derive(Parser, Debug)]
pub(super) struct MosaicArgs {
    /// Paths to the images to combine.
    #[clap(short, long, multiple_values(true), required = true)]
    images: Vec<PathBuf>,

    /// Path to the output mosaic.
    #[clap(short, long)]
    output: PathBuf,

    /// Also export the mosaic to this FITS file.
    #[clap(long)]
    fits: Option<PathBuf>,
}

impl MosaicArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), ContimgError> {
        debug!("{:#?}", self);
        let Self {
            images,
            output,
            fits,
        } = self;

        let images = Vec1::try_from_vec(images).map_err(|_| MosaicArgsError::NoImages)?;
        let params = MosaicParams {
            images,
            output,
            fits_output: fits,
            tools: Arc::new(MiriadTools::new()),
        };

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run()?;
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum MosaicArgsError {
    #[error("No input images were specified")]
    NoImages,
}
