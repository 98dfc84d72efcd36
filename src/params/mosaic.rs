// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{path::PathBuf, sync::Arc};

use log::info;
use vec1::Vec1;

use crate::tools::{ImageOps, ToolError};

/// Combine already-imaged products into a single mosaic, without running any
/// cleaning.
pub(crate) struct MosaicParams {
    pub(crate) images: Vec1<PathBuf>,
    pub(crate) output: PathBuf,
    /// Also export the mosaic to this FITS file.
    pub(crate) fits_output: Option<PathBuf>,
    pub(crate) tools: Arc<dyn ImageOps>,
}

impl MosaicParams {
    pub(crate) fn run(&self) -> Result<(), MosaicError> {
        info!("Combining {} images", self.images.len());
        self.tools
            .linear_mosaic(self.images.as_slice(), &self.output)?;
        info!("Wrote {}", self.output.display());
        if let Some(fits) = &self.fits_output {
            self.tools.fits_export(&self.output, fits)?;
            info!("Wrote {}", fits.display());
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum MosaicError {
    #[error(transparent)]
    Tool(#[from] ToolError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{RecordingTools, ToolCall};

    #[test]
    fn mosaics_all_inputs_into_one_output() {
        let tools = Arc::new(RecordingTools::new(0.0));
        let params = MosaicParams {
            images: vec1::vec1![PathBuf::from("a/image_02"), PathBuf::from("b/image_02")],
            output: PathBuf::from("mosaic"),
            fits_output: Some(PathBuf::from("mosaic.fits")),
            tools: Arc::clone(&tools) as Arc<dyn ImageOps>,
        };
        params.run().unwrap();

        let calls = tools.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            ToolCall::LinearMosaic { images, out } => {
                assert_eq!(images.len(), 2);
                assert_eq!(out, &PathBuf::from("mosaic"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
        assert!(matches!(calls[1], ToolCall::FitsExport { .. }));
    }
}
