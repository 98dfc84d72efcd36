// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters for subcommands. "Arguments" as supplied by users are pretty
//! flexible, but they get parsed into stricter "parameters"; a parameter
//! struct is valid by construction and owns everything its `run` needs.

mod continuum;
mod mosaic;

pub(crate) use continuum::{CombineMode, ContinuumError, ContinuumParams};
pub(crate) use mosaic::{MosaicError, MosaicParams};
