use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Runs the binary from an empty working directory so no stray config file
/// is picked up.
fn archive_mirror(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("archive-mirror").unwrap();
    cmd.current_dir(workdir)
        .env_remove("ARCHIVE_MIRROR_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn missing_arguments_print_usage_and_exit_zero() {
    let work = TempDir::new().unwrap();

    archive_mirror(work.path())
        .assert()
        .code(0)
        .stderr(predicate::str::contains("Usage"));

    archive_mirror(work.path())
        .arg("only-source")
        .assert()
        .code(0)
        .stderr(predicate::str::contains("SOURCE_FOLDER"));
}

#[test]
fn missing_source_folder_exits_with_three() {
    let work = TempDir::new().unwrap();
    let target = work.path().join("out");

    archive_mirror(work.path())
        .arg(work.path().join("does-not-exist"))
        .arg(&target)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("doesn't exist"));

    assert!(!target.exists());
}

#[test]
fn mirrors_files_and_extracts_archives() {
    let work = TempDir::new().unwrap();
    let src = work.path().join("src");
    let dst = work.path().join("dst");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.txt"), "alpha").unwrap();
    fs::write(
        src.join("pkg.zip"),
        zip_bytes(&[("x.txt", b"x"), ("sub/y.txt", b"y")]),
    )
    .unwrap();

    archive_mirror(work.path())
        .arg(&src)
        .arg(&dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Mirror completed"));

    assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "alpha");
    assert_eq!(fs::read_to_string(dst.join("pkg").join("x.txt")).unwrap(), "x");
    assert_eq!(
        fs::read_to_string(dst.join("pkg").join("sub").join("y.txt")).unwrap(),
        "y"
    );
    assert!(!dst.join("pkg.zip").exists());
}

#[test]
fn corrupted_archive_is_reported_and_walk_continues() {
    let work = TempDir::new().unwrap();
    let src = work.path().join("src");
    let dst = work.path().join("dst");
    fs::create_dir_all(&src).unwrap();
    for name in ["one.txt", "two.txt", "three.txt"] {
        fs::write(src.join(name), name).unwrap();
    }
    let mut corrupted = b"PK\x03\x04".to_vec();
    corrupted.extend_from_slice(&[0x5A; 128]);
    fs::write(src.join("broken.zip"), corrupted).unwrap();

    archive_mirror(work.path())
        .arg(&src)
        .arg(&dst)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Failures (1)"));

    for name in ["one.txt", "two.txt", "three.txt"] {
        assert_eq!(fs::read_to_string(dst.join(name)).unwrap(), name);
    }
    assert!(!dst.join("broken.zip").exists());
}

#[test]
fn json_output_from_config_file() {
    let work = TempDir::new().unwrap();
    let src = work.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.txt"), "a").unwrap();
    fs::write(
        work.path().join("archive-mirror.toml"),
        "[output]\nformat = \"json\"\n",
    )
    .unwrap();

    let output = archive_mirror(work.path())
        .arg(&src)
        .arg(work.path().join("dst"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    // Message lines are single-line objects; the summary is pretty-printed.
    let lines: Vec<&str> = stdout.lines().collect();
    let start = lines.iter().position(|line| *line == "{").unwrap();
    let end = lines.iter().rposition(|line| *line == "}").unwrap();
    let value: serde_json::Value = serde_json::from_str(&lines[start..=end].join("\n")).unwrap();
    assert_eq!(value["files_copied"], 1);
}

#[test]
fn invalid_config_exits_with_one() {
    let work = TempDir::new().unwrap();
    let src = work.path().join("src");
    fs::create_dir_all(&src).unwrap();
    let config = work.path().join("custom.toml");
    fs::write(&config, "[extract]\nmax_nesting_depth = 0\n").unwrap();

    archive_mirror(work.path())
        .env("ARCHIVE_MIRROR_CONFIG", &config)
        .arg(&src)
        .arg(work.path().join("dst"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nesting depth"));
}

#[test]
fn version_flag() {
    let work = TempDir::new().unwrap();

    archive_mirror(work.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
