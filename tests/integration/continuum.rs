// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests against the command-line interface.

use std::fs::create_dir_all;

use tempfile::TempDir;

use crate::*;

#[test]
fn test_contimg_help_is_correct() {
    let mut stdouts = vec![];

    // First with --help
    let cmd = contimg().arg("--help").ok();
    assert!(cmd.is_ok());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty());
    stdouts.push(stdout);

    // Then with -h
    let cmd = contimg().arg("-h").ok();
    assert!(cmd.is_ok());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty());
    stdouts.push(stdout);

    for stdout in stdouts {
        assert!(stdout.contains("continuum"));
        assert!(stdout.contains("mosaic"));
        assert!(stdout.contains("noise"));
    }
}

#[test]
fn test_continuum_help_lists_the_threshold_arguments() {
    let cmd = contimg().args(["continuum", "--help"]).ok();
    assert!(cmd.is_ok());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty());

    assert!(stdout.contains("--mask-decay"));
    assert!(stdout.contains("--mask-to-clean-ratio"));
    assert!(stdout.contains("--nsigma"));
    assert!(stdout.contains("--cycles"));
}

#[test]
fn test_continuum_without_a_work_dir_fails() {
    let cmd = contimg().arg("continuum").ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("working directory"), "{stderr}");
}

#[test]
fn test_continuum_with_a_missing_work_dir_fails() {
    let cmd = contimg()
        .args(["continuum", "--work-dir", "/does/not/exist"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("doesn't exist"), "{stderr}");
}

#[test]
fn test_continuum_with_no_chunks_fails() {
    let tmp = TempDir::new().unwrap();
    let work_dir = tmp.path().display().to_string();
    let cmd = contimg().args(["continuum", "--work-dir", &work_dir]).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("No chunk directories"), "{stderr}");
}

#[test]
fn test_continuum_dry_run_stops_before_any_imaging() {
    let tmp = TempDir::new().unwrap();
    for name in ["00", "01"] {
        create_dir_all(tmp.path().join(name).join("vis")).unwrap();
    }
    let work_dir = tmp.path().display().to_string();

    // A dry run only validates arguments; it never spawns the external
    // tools, so it succeeds even though none are installed here.
    let cmd = contimg()
        .args(["continuum", "--work-dir", &work_dir, "--dry-run"])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    // Nothing was written into the chunk directories.
    assert!(!tmp.path().join("00").join("map_dirty").exists());
    assert!(!tmp.path().join("mosaic").exists());
}

#[test]
fn test_save_toml_round_trips_through_an_arg_file() {
    let tmp = TempDir::new().unwrap();
    create_dir_all(tmp.path().join("00").join("vis")).unwrap();
    let work_dir = tmp.path().display().to_string();
    let toml_path = tmp.path().join("args.toml");
    let toml_string = toml_path.display().to_string();

    let cmd = contimg()
        .args([
            "continuum",
            "--work-dir",
            &work_dir,
            "--mode",
            "mf",
            "--cycles",
            "4",
            "--dry-run",
            "--save-toml",
            &toml_string,
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    assert!(toml_path.exists());

    // Feed the saved file back in.
    let cmd = contimg()
        .args(["continuum", &toml_string, "--dry-run"])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("mode mf"), "{stdout}");
}

#[test]
fn test_noise_dry_run_performs_no_external_calls() {
    let tmp = TempDir::new().unwrap();
    let vis = tmp.path().join("vis");
    create_dir_all(&vis).unwrap();
    let vis_string = vis.display().to_string();

    // No external tools are installed here; a dry run must not try to spawn
    // the noise-estimation routine.
    let cmd = contimg().args(["noise", &vis_string, "--dry-run"]).ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
}

#[test]
fn test_noise_rejects_a_negative_system_temperature() {
    let cmd = contimg().args(["noise", "vis", "--tsys", "-5.0"]).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("temperature"), "{stderr}");
}

#[test]
fn test_mosaic_requires_images() {
    let cmd = contimg().args(["mosaic", "--output", "out"]).ok();
    assert!(cmd.is_err());
}
