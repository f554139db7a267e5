use assert_cmd::prelude::*;
use image::{DynamicImage, ImageFormat, RgbaImage};
use predicates::str::contains;
use std::io::Cursor;
use std::process::Command;
use tempfile::TempDir;

fn summary_command(assets: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("frosted-glass").expect("binary exists");
    cmd.arg("--summary-only")
        .arg("--assets")
        .arg(assets.path());
    cmd
}

fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([128, 128, 255, 255]),
    ));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png");
    std::fs::write(dir.path().join(name), bytes.into_inner()).expect("write png");
}

#[test]
fn summary_lists_the_four_shapes_and_bloom() {
    let assets = TempDir::new().expect("temp dir");
    summary_command(&assets)
        .assert()
        .success()
        .stdout(contains("Scene: 4 shapes, camera fov 35 at (0.00, 0.00, 8.00), viewport 1280x720"))
        .stdout(contains(" - icosahedron pos=(-0.85, 0.85, 0.00)"))
        .stdout(contains(" - roundedRect pos=(0.85, 0.85, 0.00)"))
        .stdout(contains(" - knot pos=(-0.85, -0.85, 0.00)"))
        .stdout(contains(" - torus pos=(0.85, -0.85, 0.00)"))
        .stdout(contains("Bloom: 1280x720 strength=0.50 radius=0.33 threshold=0.85"))
        .stdout(contains("Debug panel: disabled"))
        .stdout(contains("Frames rendered: 1"));
}

#[test]
fn shapes_spin_with_elapsed_time() {
    let assets = TempDir::new().expect("temp dir");
    summary_command(&assets)
        .args(["--frames", "3", "--frame-time", "1.0"])
        .assert()
        .success()
        .stdout(contains("rot=(1.00, 1.12, 0.00)"))
        .stdout(contains("Frames rendered: 3"));
}

#[test]
fn missing_assets_are_reported_without_failing() {
    let assets = TempDir::new().expect("temp dir");
    summary_command(&assets)
        .assert()
        .success()
        .stdout(contains("Assets:"))
        .stdout(contains(" - background: failed"))
        .stdout(contains(" - environment map: failed"))
        .stdout(contains("env reflections=off"));
}

#[test]
fn present_assets_are_loaded() {
    let assets = TempDir::new().expect("temp dir");
    write_png(&assets, "texture.jpg", 16, 8);
    write_png(&assets, "normal.jpg", 4, 4);
    summary_command(&assets)
        .assert()
        .success()
        .stdout(contains(" - background: loaded 16x8"))
        .stdout(contains(" - normal map: loaded 4x4"));
}

#[test]
fn debug_flag_enables_the_panel() {
    let assets = TempDir::new().expect("temp dir");
    summary_command(&assets)
        .arg("--debug")
        .assert()
        .success()
        .stdout(contains("Debug panel: enabled"));
}

#[test]
fn fragment_must_match_exactly() {
    let assets = TempDir::new().expect("temp dir");
    summary_command(&assets)
        .args(["--fragment", "#debugging"])
        .assert()
        .success()
        .stdout(contains("Debug panel: disabled"));

    summary_command(&assets)
        .args(["--fragment", "#debug"])
        .assert()
        .success()
        .stdout(contains("Debug panel: enabled"));
}

#[test]
fn custom_size_reaches_the_viewport_and_bloom() {
    let assets = TempDir::new().expect("temp dir");
    summary_command(&assets)
        .args(["--width", "640", "--height", "480"])
        .assert()
        .success()
        .stdout(contains("viewport 640x480"))
        .stdout(contains("Bloom: 640x480"));
}
