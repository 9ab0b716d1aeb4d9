use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ErrorKind;
use crate::archive::{ArchiveLoader, ExtractedArchive};
use crate::error::FmuError;
use crate::fmi2::{FmuType, ModelBinding, NoopSink};
use crate::platform::PlatformTriple;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "fmusim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn touch(dir: &PathBuf, relative: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(&path, b"").expect("write file");
}

#[test]
fn platforms_are_directories_holding_a_shared_library() {
    let dir = unique_temp_dir("archive-platforms");
    touch(&dir, "binaries/linux64/model.so");
    touch(&dir, "binaries/win64/model.dll");
    touch(&dir, "binaries/darwin64/README.txt");
    touch(&dir, "resources/data.csv");

    let archive = ExtractedArchive::open(&dir).expect("open");
    assert_eq!(archive.supported_platforms(), ["linux64", "win64"]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn binary_path_requires_the_host_platform() {
    let dir = unique_temp_dir("archive-binary");
    touch(&dir, "binaries/linux64/model.so");
    let archive = ExtractedArchive::open(&dir).expect("open");

    let linux = PlatformTriple::from_parts("linux", "x86_64", 64);
    let path = archive.binary_path(&linux, "model").expect("linux binary");
    assert!(path.ends_with("binaries/linux64/model.so"));

    let err = archive
        .binary_path(&linux, "other")
        .expect_err("wrong model identifier");
    assert!(matches!(err, FmuError::BinaryNotFound { .. }), "{err}");

    let windows = PlatformTriple::from_parts("windows", "x86_64", 64);
    let err = archive
        .binary_path(&windows, "model")
        .expect_err("no windows binary");
    assert_eq!(err.kind(), ErrorKind::Load);
    assert!(err.to_string().contains("linux64"), "{err}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn resource_location_is_a_file_uri() {
    let dir = unique_temp_dir("archive-resources");
    let archive = ExtractedArchive::open(&dir).expect("open");
    let uri = archive.resource_location();
    assert!(uri.starts_with("file://"), "{uri}");
    assert!(uri.ends_with("/resources"), "{uri}");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_archive_and_binary_are_load_errors() {
    let err = ExtractedArchive::open("/nonexistent/fmusim/archive").expect_err("missing dir");
    assert_eq!(err.kind(), ErrorKind::Load);

    let err = ModelBinding::load(
        "/nonexistent/fmusim/model.so",
        FmuType::CoSimulation,
        Arc::new(NoopSink),
    )
    .expect_err("missing binary");
    assert!(matches!(err, FmuError::BinaryNotFound { .. }), "{err}");
}

#[test]
fn invalid_shared_library_is_a_load_error() {
    let dir = unique_temp_dir("archive-corrupt");
    touch(&dir, "binaries/linux64/model.so");
    let err = ModelBinding::load(
        dir.join("binaries/linux64/model.so"),
        FmuType::CoSimulation,
        Arc::new(NoopSink),
    )
    .expect_err("empty file is not a library");
    assert_eq!(err.kind(), ErrorKind::Load);
    let _ = fs::remove_dir_all(&dir);
}
