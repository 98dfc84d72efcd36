// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! [`ImageOps`] implemented against the Miriad tool suite. Each operation
//! spawns the corresponding binary with a `key=value` argument list (no shell
//! involved), waits for it to exit, and checks that the expected output
//! dataset appeared on disk.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use itertools::Itertools;
use log::{debug, trace};
use regex::Regex;

use super::{CleanRequest, ImageOps, InvertRequest, NoiseRequest, RestoreMode, ToolError};

/// Drives the Miriad binaries (`invert`, `maths`, `clean`, `restor`,
/// `linmos`, `uvcat`, `imstat`, `obsrms`, `fits`). They must be on `PATH`.
#[derive(Debug, Default)]
pub struct MiriadTools {
    /// When set, every tool is spawned with this working directory.
    work_dir: Option<PathBuf>,
}

impl MiriadTools {
    pub fn new() -> MiriadTools {
        MiriadTools::default()
    }

    pub fn with_work_dir(work_dir: PathBuf) -> MiriadTools {
        MiriadTools {
            work_dir: Some(work_dir),
        }
    }

    /// Spawn `tool`, wait for it, and hand back its stdout. Non-zero exit is
    /// an error carrying the captured stderr.
    fn run(&self, tool: &'static str, args: &[String]) -> Result<String, ToolError> {
        debug!("Running {tool} {}", args.iter().join(" "));
        let mut command = Command::new(tool);
        command.args(args);
        if let Some(work_dir) = &self.work_dir {
            command.current_dir(work_dir);
        }
        let output = command
            .output()
            .map_err(|err| ToolError::Spawn { tool, err })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("{tool} stdout:\n{stdout}");
        if !output.status.success() {
            return Err(ToolError::Failed {
                tool,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(stdout)
    }

    /// Miriad tools can exit 0 without writing their output (e.g. when given
    /// inconsistent keywords); treat that as a failure here rather than
    /// letting a later tool trip over the missing dataset.
    fn expect_output(&self, tool: &'static str, path: &Path) -> Result<(), ToolError> {
        let on_disk = match (&self.work_dir, path.is_absolute()) {
            (Some(work_dir), false) => work_dir.join(path),
            _ => path.to_path_buf(),
        };
        if on_disk.exists() {
            Ok(())
        } else {
            Err(ToolError::MissingOutput {
                tool,
                path: path.to_path_buf(),
            })
        }
    }
}

impl ImageOps for MiriadTools {
    fn invert(&self, req: &InvertRequest) -> Result<(), ToolError> {
        let mut args = vec![
            format!("vis={}", req.vis.display()),
            format!("map={}", req.map.display()),
            format!("beam={}", req.beam.display()),
            format!("imsize={}", req.image_size),
            format!("cell={}", req.cell_size),
            format!("stokes={}", req.stokes),
        ];
        if !req.options.is_empty() {
            args.push(format!("options={}", req.options.iter().join(",")));
        }
        self.run("invert", &args)?;
        self.expect_output("invert", &req.map)?;
        self.expect_output("invert", &req.beam)
    }

    fn mask(&self, input: &Path, output: &Path, threshold: f64) -> Result<(), ToolError> {
        let args = vec![
            format!("exp=<{}>", input.display()),
            format!("mask=<{}>.gt.{:e}", input.display(), threshold),
            format!("out={}", output.display()),
        ];
        self.run("maths", &args)?;
        self.expect_output("maths", output)
    }

    fn clean(&self, req: &CleanRequest) -> Result<(), ToolError> {
        let mut args = vec![
            format!("map={}", req.map.display()),
            format!("beam={}", req.beam.display()),
            format!("out={}", req.model_out.display()),
            format!("cutoff={:e}", req.cutoff),
            format!("niters={}", req.max_iterations),
        ];
        if let Some(model_in) = &req.model_in {
            args.push(format!("model={}", model_in.display()));
        }
        if let Some(region) = &req.region {
            args.push(format!("region=mask({})", region.display()));
        }
        self.run("clean", &args)?;
        self.expect_output("clean", &req.model_out)
    }

    fn restore(
        &self,
        model: &Path,
        beam: &Path,
        map: &Path,
        mode: RestoreMode,
        out: &Path,
    ) -> Result<(), ToolError> {
        let args = vec![
            format!("model={}", model.display()),
            format!("beam={}", beam.display()),
            format!("map={}", map.display()),
            format!("mode={mode}"),
            format!("out={}", out.display()),
        ];
        self.run("restor", &args)?;
        self.expect_output("restor", out)
    }

    fn linear_mosaic(&self, images: &[PathBuf], out: &Path) -> Result<(), ToolError> {
        let args = vec![
            format!("in={}", images.iter().map(|p| p.display()).join(",")),
            format!("out={}", out.display()),
        ];
        self.run("linmos", &args)?;
        self.expect_output("linmos", out)
    }

    fn concat_vis(&self, inputs: &[PathBuf], out: &Path) -> Result<(), ToolError> {
        let args = vec![
            format!("vis={}", inputs.iter().map(|p| p.display()).join(",")),
            format!("out={}", out.display()),
        ];
        self.run("uvcat", &args)?;
        self.expect_output("uvcat", out)
    }

    fn noise_estimate(&self, req: &NoiseRequest) -> Result<f64, ToolError> {
        let args = vec![
            format!("tsys={}", req.tsys_k),
            format!("jyperk={}", req.jy_per_k),
            format!("antdiam={}", req.antenna_diameter_m),
            format!("freq={}", req.freq_ghz),
            format!("theta={}", req.beam_fwhm_arcsec),
            format!("nants={}", req.num_antennas),
            format!("bw={}", req.bandwidth_ghz),
            format!("inttime={}", req.integration_time_min),
            format!("coreta={}", req.efficiency),
        ];
        let stdout = self.run("obsrms", &args)?;
        parse_obsrms_noise(&stdout)
    }

    fn image_max(&self, image: &Path) -> Result<f64, ToolError> {
        let args = vec![format!("in={}", image.display())];
        let stdout = self.run("imstat", &args)?;
        parse_imstat_max(&stdout)
    }

    fn fits_export(&self, image: &Path, out: &Path) -> Result<(), ToolError> {
        let args = vec![
            format!("in={}", image.display()),
            "op=xyout".to_string(),
            format!("out={}", out.display()),
        ];
        self.run("fits", &args)?;
        self.expect_output("fits", out)
    }
}

/// Pull the rms value out of `obsrms` stdout and convert it to Jy. The line of
/// interest looks like "Rms noise:  45.6 microJy".
fn parse_obsrms_noise(stdout: &str) -> Result<f64, ToolError> {
    lazy_static::lazy_static! {
        static ref RMS_LINE: Regex =
            Regex::new(r"(?i)rms noise[^:]*:\s*([0-9][0-9.eE+-]*)\s*(microJy|uJy|mJy|Jy)?")
                .expect("valid regex");
    }
    let captures = RMS_LINE
        .captures(stdout)
        .ok_or_else(|| ToolError::UnparsableOutput {
            tool: "obsrms",
            details: format!("no rms noise line in:\n{stdout}"),
        })?;
    let value: f64 = captures[1]
        .parse()
        .map_err(|_| ToolError::UnparsableOutput {
            tool: "obsrms",
            details: format!("bad rms value '{}'", &captures[1]),
        })?;
    let scale = match captures.get(2).map(|m| m.as_str()) {
        Some("microJy") | Some("uJy") => 1e-6,
        Some("mJy") => 1e-3,
        _ => 1.0,
    };
    Ok(value * scale)
}

/// Pull the image maximum out of `imstat` stdout. The statistics table has a
/// header row naming the columns; rows under it may carry plane labels, so
/// the "Maximum" column is counted from the right.
fn parse_imstat_max(stdout: &str) -> Result<f64, ToolError> {
    let mut from_right = None;
    let mut max = None;
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match from_right {
            None => {
                if let Some(pos) = fields.iter().position(|f| *f == "Maximum") {
                    from_right = Some(fields.len() - pos);
                }
            }
            Some(from_right) => {
                if fields.len() < from_right {
                    continue;
                }
                if let Ok(v) = fields[fields.len() - from_right].parse::<f64>() {
                    // Keep the last parsable row; imstat prints any per-plane
                    // rows before the totals row.
                    max = Some(v);
                }
            }
        }
    }
    max.ok_or_else(|| ToolError::UnparsableOutput {
        tool: "imstat",
        details: format!("no statistics table in:\n{stdout}"),
    })
}
