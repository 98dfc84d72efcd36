// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The adaptive minor-cycle CLEAN loop. For one imaging target (a frequency
//! chunk, or the concatenated dataset in joint mode) this inverts the
//! visibilities once, then repeatedly masks, cleans and restores with
//! thresholds derived from the current image peak, never cleaning below the
//! theoretical-noise floor.

pub mod noise;
pub mod thresholds;

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{debug, info};
use thiserror::Error;

use crate::{
    constants::CLEAN_ITERATION_CAP,
    tools::{CleanRequest, ImageOps, InvertRequest, RestoreMode, ToolError},
};
use noise::NoiseConfig;
use thresholds::ThresholdSchedule;

/// Imaging geometry handed to the invert operation.
#[derive(Debug, Clone)]
pub struct ImageGeometry {
    /// Image size in pixels (square images only).
    pub image_size: u32,
    /// Cell size [arcsec].
    pub cell_size: f64,
    /// Stokes selection, e.g. "i".
    pub stokes: String,
    /// Extra invert options, passed through verbatim.
    pub invert_options: Vec<String>,
}

/// Everything fixed across minor cycles for one run.
pub struct ImagingSetup<'a> {
    pub tools: &'a dyn ImageOps,
    pub schedule: ThresholdSchedule,
    pub noise: &'a NoiseConfig,
    /// The minor-cycle budget; the loop runs exactly this many
    /// mask -> clean -> restore iterations.
    pub cycles: usize,
    pub geometry: &'a ImageGeometry,
    /// Keep per-cycle intermediate products instead of deleting them after
    /// the loop.
    pub keep_intermediates: bool,
}

/// Per-target loop state, updated exactly once per minor cycle.
#[derive(Debug)]
struct MinorCycleState {
    cycle: usize,
    model: Option<PathBuf>,
    residual: Option<PathBuf>,
    cutoff: f64,
}

/// The retained products of a completed minor-cycle loop.
#[derive(Debug, Clone)]
pub struct ImagingOutcome {
    /// The final restored image.
    pub image: PathBuf,
    /// The final accumulated model.
    pub model: PathBuf,
    /// The final residual.
    pub residual: PathBuf,
    /// The theoretical noise used for this target [Jy].
    pub theoretical_noise: f64,
    /// The number of minor cycles performed.
    pub cycles_run: usize,
}

/// Run the full minor-cycle loop for one target. `target` labels log lines
/// and errors (the chunk name, or "mf" for the joint dataset); `dir` is the
/// target's private directory and all products land there.
///
/// # Panics
///
/// The cycle budget must be at least 1; the outcome names products of the
/// last cycle, which must exist.
pub fn image_target(
    setup: &ImagingSetup,
    target: &str,
    dir: &Path,
    vis: &Path,
    progress: &ProgressBar,
) -> Result<ImagingOutcome, ImagingError> {
    assert!(setup.cycles >= 1, "the minor-cycle budget must be at least 1");

    let tool_context = |err: ToolError| ImagingError::Tool {
        target: target.to_string(),
        err,
    };

    // The dirty map and beam are made once; every cycle cleans against them.
    let dirty_map = dir.join("map_dirty");
    let beam = dir.join("beam");
    debug!("Chunk {target}: inverting {}", vis.display());
    setup
        .tools
        .invert(&InvertRequest {
            vis: vis.to_path_buf(),
            map: dirty_map.clone(),
            beam: beam.clone(),
            image_size: setup.geometry.image_size,
            cell_size: setup.geometry.cell_size,
            stokes: setup.geometry.stokes.clone(),
            options: setup.geometry.invert_options.clone(),
        })
        .map_err(tool_context)?;

    let theoretical_noise = setup.noise.theoretical_noise(setup.tools, target, vis)?;
    let noise_floor = setup.noise.nsigma * theoretical_noise;

    let mut state = MinorCycleState {
        cycle: 0,
        model: None,
        residual: None,
        cutoff: f64::INFINITY,
    };

    for cycle in 0..setup.cycles {
        // Statistics come from the dirty map on the first cycle and from the
        // previous cycle's residual after that.
        let stats_image = state.residual.as_deref().unwrap_or(&dirty_map);
        let image_max = setup
            .tools
            .image_max(stats_image)
            .map_err(|err| ImagingError::CycleTool {
                target: target.to_string(),
                cycle,
                err,
            })?;
        if !image_max.is_finite() {
            return Err(ImagingError::NonFinitePeak {
                target: target.to_string(),
                cycle,
            });
        }

        let mask_threshold = setup.schedule.mask_threshold(image_max, cycle);
        let cutoff = setup.schedule.clean_cutoff(image_max, cycle, noise_floor);
        // The comparison against the floor is informational only; termination
        // is the fixed cycle budget.
        if setup.schedule.clean_noise_threshold(image_max, cycle) <= noise_floor {
            debug!(
                "Chunk {target}, cycle {cycle}: clean cutoff clamped at the noise floor \
                 ({noise_floor:e} Jy)"
            );
        }
        debug!(
            "Chunk {target}, cycle {cycle}: peak {image_max:e}, mask threshold \
             {mask_threshold:e}, clean cutoff {cutoff:e}"
        );

        let cycle_tool_context = |err: ToolError| ImagingError::CycleTool {
            target: target.to_string(),
            cycle,
            err,
        };

        let mask = dir.join(format!("mask_{cycle:02}"));
        setup
            .tools
            .mask(stats_image, &mask, mask_threshold)
            .map_err(cycle_tool_context)?;

        let model = dir.join(format!("model_{cycle:02}"));
        setup
            .tools
            .clean(&CleanRequest {
                map: dirty_map.clone(),
                beam: beam.clone(),
                model_in: state.model.clone(),
                model_out: model.clone(),
                cutoff,
                max_iterations: CLEAN_ITERATION_CAP,
                region: Some(mask),
            })
            .map_err(cycle_tool_context)?;

        let image = dir.join(format!("image_{cycle:02}"));
        setup
            .tools
            .restore(&model, &beam, &dirty_map, RestoreMode::Clean, &image)
            .map_err(cycle_tool_context)?;
        let residual = dir.join(format!("residual_{cycle:02}"));
        setup
            .tools
            .restore(&model, &beam, &dirty_map, RestoreMode::Residual, &residual)
            .map_err(cycle_tool_context)?;

        state = MinorCycleState {
            cycle,
            model: Some(model),
            residual: Some(residual),
            cutoff,
        };
        progress.inc(1);
    }

    let last = state.cycle;
    info!(
        "Chunk {target}: {} minor cycles done, final cutoff {:e} Jy",
        setup.cycles, state.cutoff
    );

    if !setup.keep_intermediates {
        for cycle in 0..last {
            for prefix in ["mask", "model", "image", "residual"] {
                remove_product(&dir.join(format!("{prefix}_{cycle:02}")))?;
            }
        }
        remove_product(&dir.join(format!("mask_{last:02}")))?;
    }

    Ok(ImagingOutcome {
        image: dir.join(format!("image_{last:02}")),
        model: dir.join(format!("model_{last:02}")),
        residual: dir.join(format!("residual_{last:02}")),
        theoretical_noise,
        cycles_run: setup.cycles,
    })
}

/// External tools write datasets as directories; tolerate products that were
/// never written or already removed.
fn remove_product(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Chunk {target}, cycle {cycle}: image maximum is not finite")]
    NonFinitePeak { target: String, cycle: usize },

    #[error("Chunk {target}: theoretical noise estimate is unusable ({value})")]
    BadNoise { target: String, value: f64 },

    #[error("Chunk {target}, cycle {cycle}: {err}")]
    CycleTool {
        target: String,
        cycle: usize,
        #[source]
        err: ToolError,
    },

    #[error("Chunk {target}: {err}")]
    Tool {
        target: String,
        #[source]
        err: ToolError,
    },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::tests::{RecordingTools, ToolCall};

    fn noise_config() -> NoiseConfig {
        NoiseConfig {
            tsys_k: 25.0,
            jy_per_k: 22.0,
            antenna_diameter_m: 13.5,
            freq_ghz: 1.28,
            beam_fwhm_arcsec: 3600.0,
            num_antennas: 64,
            bandwidth_ghz: 0.05,
            integration_time_min: 600.0,
            efficiency: 0.88,
            nsigma: 3.0,
        }
    }

    fn geometry() -> ImageGeometry {
        ImageGeometry {
            image_size: 1024,
            cell_size: 1.5,
            stokes: "i".to_string(),
            invert_options: vec!["mfs".to_string(), "double".to_string()],
        }
    }

    #[test]
    fn three_cycles_produce_the_expected_sequence() {
        let tmp = TempDir::new().unwrap();
        let tools = RecordingTools::new(1e-5);
        tools.script_peaks([1.0, 0.3, 0.1]);
        let noise = noise_config();
        let geometry = geometry();
        let setup = ImagingSetup {
            tools: &tools,
            schedule: ThresholdSchedule {
                mask_decay: 1.0,
                mask_to_clean_ratio: 2.0,
            },
            noise: &noise,
            cycles: 3,
            geometry: &geometry,
            keep_intermediates: true,
        };

        let dir = tmp.path().join("00");
        let vis = dir.join("vis");
        let outcome =
            image_target(&setup, "00", &dir, &vis, &ProgressBar::hidden()).unwrap();

        assert_eq!(outcome.cycles_run, 3);
        assert_eq!(outcome.image, dir.join("image_02"));
        assert_eq!(outcome.model, dir.join("model_02"));
        assert_eq!(outcome.residual, dir.join("residual_02"));

        let calls = tools.calls.lock().unwrap();
        // One invert, one noise estimate, then per cycle: stats, mask, clean,
        // restore x2.
        assert!(matches!(calls[0], ToolCall::Invert(_)));
        assert!(matches!(calls[1], ToolCall::NoiseEstimate(_)));
        let mut clean_count = 0;
        for (i, cycle) in (0..3).enumerate() {
            let base = 2 + i * 5;
            match &calls[base] {
                ToolCall::ImageMax(path) => {
                    let expected = if cycle == 0 {
                        dir.join("map_dirty")
                    } else {
                        dir.join(format!("residual_{:02}", cycle - 1))
                    };
                    assert_eq!(path, &expected);
                }
                other => panic!("call {base} unexpected: {other:?}"),
            }
            match &calls[base + 1] {
                ToolCall::Mask { output, .. } => {
                    assert_eq!(output, &dir.join(format!("mask_{cycle:02}")))
                }
                other => panic!("call {} unexpected: {other:?}", base + 1),
            }
            match &calls[base + 2] {
                ToolCall::Clean(req) => {
                    clean_count += 1;
                    assert_eq!(req.model_out, dir.join(format!("model_{cycle:02}")));
                    // The model accumulates: cycles after the first continue
                    // from the previous cycle's model.
                    if cycle == 0 {
                        assert!(req.model_in.is_none());
                    } else {
                        assert_eq!(
                            req.model_in.as_deref(),
                            Some(dir.join(format!("model_{:02}", cycle - 1)).as_path())
                        );
                    }
                }
                other => panic!("call {} unexpected: {other:?}", base + 2),
            }
            match (&calls[base + 3], &calls[base + 4]) {
                (
                    ToolCall::Restore {
                        mode: RestoreMode::Clean,
                        out: image,
                        ..
                    },
                    ToolCall::Restore {
                        mode: RestoreMode::Residual,
                        out: residual,
                        ..
                    },
                ) => {
                    assert_eq!(image, &dir.join(format!("image_{cycle:02}")));
                    assert_eq!(residual, &dir.join(format!("residual_{cycle:02}")));
                }
                other => panic!("calls {}+ unexpected: {other:?}", base + 3),
            }
        }
        assert_eq!(clean_count, 3);
        assert_eq!(calls.len(), 2 + 3 * 5);
    }

    #[test]
    fn cutoff_is_clamped_at_the_noise_floor() {
        let tmp = TempDir::new().unwrap();
        let tools = RecordingTools::new(1e-2);
        // Peak barely above the floor: the geometric schedule would go far
        // below it.
        tools.script_peaks([5e-2, 4e-2]);
        let noise = noise_config();
        let geometry = geometry();
        let setup = ImagingSetup {
            tools: &tools,
            schedule: ThresholdSchedule {
                mask_decay: 1.0,
                mask_to_clean_ratio: 10.0,
            },
            noise: &noise,
            cycles: 2,
            geometry: &geometry,
            keep_intermediates: true,
        };

        let dir = tmp.path().join("00");
        image_target(&setup, "00", &dir, &dir.join("vis"), &ProgressBar::hidden()).unwrap();

        let floor = 3.0 * 1e-2;
        let calls = tools.calls.lock().unwrap();
        for call in calls.iter() {
            if let ToolCall::Clean(req) = call {
                assert_abs_diff_eq!(req.cutoff, floor);
            }
        }
    }

    #[test]
    fn non_finite_peak_aborts_with_context() {
        let tmp = TempDir::new().unwrap();
        let tools = RecordingTools::new(1e-5);
        tools.script_peaks([1.0, f64::NAN]);
        let noise = noise_config();
        let geometry = geometry();
        let setup = ImagingSetup {
            tools: &tools,
            schedule: ThresholdSchedule {
                mask_decay: 1.0,
                mask_to_clean_ratio: 2.0,
            },
            noise: &noise,
            cycles: 3,
            geometry: &geometry,
            keep_intermediates: true,
        };

        let dir = tmp.path().join("05");
        let result = image_target(&setup, "05", &dir, &dir.join("vis"), &ProgressBar::hidden());
        match result {
            Err(ImagingError::NonFinitePeak { target, cycle }) => {
                assert_eq!(target, "05");
                assert_eq!(cycle, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "budget must be at least 1")]
    fn zero_cycle_budget_is_a_caller_bug() {
        let tmp = TempDir::new().unwrap();
        let tools = RecordingTools::new(1e-5);
        let noise = noise_config();
        let geometry = geometry();
        let setup = ImagingSetup {
            tools: &tools,
            schedule: ThresholdSchedule {
                mask_decay: 1.0,
                mask_to_clean_ratio: 2.0,
            },
            noise: &noise,
            cycles: 0,
            geometry: &geometry,
            keep_intermediates: true,
        };
        let dir = tmp.path().join("00");
        let _ = image_target(&setup, "00", &dir, &dir.join("vis"), &ProgressBar::hidden());
    }

    #[test]
    fn intermediates_are_removed_unless_kept() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("00");
        std::fs::create_dir_all(&dir).unwrap();
        // Pretend the tools wrote per-cycle products.
        for cycle in 0..2 {
            for prefix in ["mask", "model", "image", "residual"] {
                std::fs::create_dir(dir.join(format!("{prefix}_{cycle:02}"))).unwrap();
            }
        }

        let tools = RecordingTools::new(1e-5);
        tools.script_peaks([1.0, 0.5]);
        let noise = noise_config();
        let geometry = geometry();
        let setup = ImagingSetup {
            tools: &tools,
            schedule: ThresholdSchedule {
                mask_decay: 1.0,
                mask_to_clean_ratio: 2.0,
            },
            noise: &noise,
            cycles: 2,
            geometry: &geometry,
            keep_intermediates: false,
        };
        image_target(&setup, "00", &dir, &dir.join("vis"), &ProgressBar::hidden()).unwrap();

        // Cycle 0 products and the final mask are gone; finals are retained.
        assert!(!dir.join("model_00").exists());
        assert!(!dir.join("image_00").exists());
        assert!(!dir.join("residual_00").exists());
        assert!(!dir.join("mask_01").exists());
        assert!(dir.join("model_01").exists());
        assert!(dir.join("image_01").exists());
        assert!(dir.join("residual_01").exists());
    }
}
