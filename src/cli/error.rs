// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all contimg-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::{continuum::ContinuumArgsError, mosaic::MosaicArgsError, noise::NoiseArgsError};
use crate::{
    imaging::ImagingError,
    params::{ContinuumError, MosaicError},
};

/// The *only* publicly visible error from contimg.
#[derive(Error, Debug)]
pub enum ContimgError {
    /// An error related to the continuum imaging stage.
    #[error("{0}")]
    Continuum(String),

    /// An error related to mosaicking.
    #[error("{0}")]
    Mosaic(String),

    /// An error related to the noise estimate.
    #[error("{0}")]
    Noise(String),

    /// An error related to argument files.
    #[error("{0}")]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// Binary sub-command errors.

impl From<ContinuumArgsError> for ContimgError {
    fn from(e: ContinuumArgsError) -> Self {
        Self::Continuum(e.to_string())
    }
}

impl From<MosaicArgsError> for ContimgError {
    fn from(e: MosaicArgsError) -> Self {
        Self::Mosaic(e.to_string())
    }
}

impl From<NoiseArgsError> for ContimgError {
    fn from(e: NoiseArgsError) -> Self {
        Self::Noise(e.to_string())
    }
}

// Library code errors.

impl From<ContinuumError> for ContimgError {
    fn from(e: ContinuumError) -> Self {
        let s = e.to_string();
        match e {
            ContinuumError::Imaging(_)
            | ContinuumError::Combine(_)
            | ContinuumError::Concat(_)
            | ContinuumError::Fits(_) => Self::Continuum(s),
            ContinuumError::IO(_) => Self::Generic(s),
        }
    }
}

impl From<MosaicError> for ContimgError {
    fn from(e: MosaicError) -> Self {
        Self::Mosaic(e.to_string())
    }
}

impl From<ImagingError> for ContimgError {
    fn from(e: ImagingError) -> Self {
        Self::Noise(e.to_string())
    }
}

impl From<std::io::Error> for ContimgError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
