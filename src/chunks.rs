// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frequency-chunk discovery. An upstream stage partitions the observed
//! bandwidth into chunks, one zero-padded integer-named directory per chunk,
//! each holding a visibility dataset. This stage only ever reads them.

use std::path::{Path, PathBuf};

use thiserror::Error;
use vec1::Vec1;

/// One frequency subdivision of the observed bandwidth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyChunk {
    pub index: usize,

    /// The zero-padded directory name, used to label products and log lines.
    pub name: String,

    /// The chunk's private directory; all of this chunk's products are
    /// written here.
    pub dir: PathBuf,

    /// The visibility dataset inside the chunk directory.
    pub vis: PathBuf,
}

/// Find the chunk directories under `work_dir`, in index order. Each must
/// contain the `vis_name` dataset left by the upstream stage; a chunk without
/// one is an error rather than something to silently skip.
pub fn discover_chunks(work_dir: &Path, vis_name: &str) -> Result<Vec1<FrequencyChunk>, ChunkError> {
    let pattern = work_dir.join("[0-9]*");
    let entries = glob::glob(&pattern.display().to_string())
        .map_err(|e| ChunkError::Glob(e.to_string()))?;

    let mut chunks = vec![];
    for entry in entries {
        let dir = entry.map_err(|e| ChunkError::Glob(e.to_string()))?;
        if !dir.is_dir() {
            continue;
        }
        let name = match dir.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        let index = match name.parse::<usize>() {
            Ok(i) => i,
            // Not a chunk directory; other stages keep their own
            // subdirectories alongside.
            Err(_) => continue,
        };
        let vis = dir.join(vis_name);
        if !vis.exists() {
            return Err(ChunkError::MissingVis {
                chunk: name,
                path: vis,
            });
        }
        chunks.push(FrequencyChunk {
            index,
            name,
            dir,
            vis,
        });
    }
    chunks.sort_unstable_by_key(|c| c.index);

    Vec1::try_from_vec(chunks).map_err(|_| ChunkError::NoChunks {
        dir: work_dir.to_path_buf(),
    })
}

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("No chunk directories found under '{dir}'; has the splitting stage been run?")]
    NoChunks { dir: PathBuf },

    #[error("Chunk {chunk} has no visibility dataset at '{path}'")]
    MissingVis { chunk: String, path: PathBuf },

    #[error("Glob error when searching for chunk directories: {0}")]
    Glob(String),
}
