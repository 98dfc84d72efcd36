// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Test helpers. The important one is [`RecordingTools`], an [`ImageOps`]
//! that records every call instead of spawning anything, with scriptable
//! image peaks and a fixed noise estimate.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::tools::{
    CleanRequest, ImageOps, InvertRequest, NoiseRequest, RestoreMode, ToolError,
};

#[derive(Debug, Clone)]
pub(crate) enum ToolCall {
    Invert(InvertRequest),
    Mask {
        input: PathBuf,
        output: PathBuf,
        threshold: f64,
    },
    Clean(CleanRequest),
    Restore {
        model: PathBuf,
        beam: PathBuf,
        map: PathBuf,
        mode: RestoreMode,
        out: PathBuf,
    },
    LinearMosaic {
        images: Vec<PathBuf>,
        out: PathBuf,
    },
    ConcatVis {
        inputs: Vec<PathBuf>,
        out: PathBuf,
    },
    NoiseEstimate(NoiseRequest),
    ImageMax(PathBuf),
    FitsExport {
        image: PathBuf,
        out: PathBuf,
    },
}

pub(crate) struct RecordingTools {
    pub(crate) calls: Mutex<Vec<ToolCall>>,
    /// Values handed back by `image_max`, in order. When exhausted, 1.0.
    peaks: Mutex<VecDeque<f64>>,
    noise: f64,
}

impl RecordingTools {
    pub(crate) fn new(noise: f64) -> RecordingTools {
        RecordingTools {
            calls: Mutex::new(vec![]),
            peaks: Mutex::new(VecDeque::new()),
            noise,
        }
    }

    pub(crate) fn script_peaks<I: IntoIterator<Item = f64>>(&self, peaks: I) {
        self.peaks.lock().unwrap().extend(peaks);
    }

    fn record(&self, call: ToolCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ImageOps for RecordingTools {
    fn invert(&self, req: &InvertRequest) -> Result<(), ToolError> {
        self.record(ToolCall::Invert(req.clone()));
        Ok(())
    }

    fn mask(&self, input: &Path, output: &Path, threshold: f64) -> Result<(), ToolError> {
        self.record(ToolCall::Mask {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            threshold,
        });
        Ok(())
    }

    fn clean(&self, req: &CleanRequest) -> Result<(), ToolError> {
        self.record(ToolCall::Clean(req.clone()));
        Ok(())
    }

    fn restore(
        &self,
        model: &Path,
        beam: &Path,
        map: &Path,
        mode: RestoreMode,
        out: &Path,
    ) -> Result<(), ToolError> {
        self.record(ToolCall::Restore {
            model: model.to_path_buf(),
            beam: beam.to_path_buf(),
            map: map.to_path_buf(),
            mode,
            out: out.to_path_buf(),
        });
        Ok(())
    }

    fn linear_mosaic(&self, images: &[PathBuf], out: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::LinearMosaic {
            images: images.to_vec(),
            out: out.to_path_buf(),
        });
        Ok(())
    }

    fn concat_vis(&self, inputs: &[PathBuf], out: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::ConcatVis {
            inputs: inputs.to_vec(),
            out: out.to_path_buf(),
        });
        Ok(())
    }

    fn noise_estimate(&self, req: &NoiseRequest) -> Result<f64, ToolError> {
        self.record(ToolCall::NoiseEstimate(req.clone()));
        Ok(self.noise)
    }

    fn image_max(&self, image: &Path) -> Result<f64, ToolError> {
        self.record(ToolCall::ImageMax(image.to_path_buf()));
        Ok(self.peaks.lock().unwrap().pop_front().unwrap_or(1.0))
    }

    fn fits_export(&self, image: &Path, out: &Path) -> Result<(), ToolError> {
        self.record(ToolCall::FitsExport {
            image: image.to_path_buf(),
            out: out.to_path_buf(),
        });
        Ok(())
    }
}
