use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

/// Typeface with block glyphs for every letter of "Pavan" and a fallback.
fn build_font() -> NamedTempFile {
    let block = "m 0 0 l 0 70 l 50 70 l 50 0 l 0 0 ";
    let ring = "m 0 0 l 0 70 l 60 70 l 60 0 l 0 0 m 20 20 l 40 20 l 40 50 l 20 50 l 20 20 ";
    let font = format!(
        r#"{{
            "familyName": "Blocks",
            "resolution": 100,
            "underlineThickness": 5,
            "boundingBox": {{ "xMin": 0, "xMax": 70, "yMin": -10, "yMax": 80 }},
            "glyphs": {{
                "P": {{ "ha": 70, "o": "{ring}" }},
                "a": {{ "ha": 60, "o": "{block}" }},
                "v": {{ "ha": 60, "o": "{block}" }},
                "n": {{ "ha": 60, "o": "{block}" }},
                "?": {{ "ha": 60, "o": "{block}" }}
            }}
        }}"#
    );
    let mut tmp = NamedTempFile::new().expect("temp font");
    tmp.write_all(font.as_bytes()).expect("write font");
    tmp
}

fn headless(font: &NamedTempFile) -> Command {
    let mut cmd = Command::cargo_bin("scroll-scene").expect("binary exists");
    cmd.arg("--headless")
        .arg("--size")
        .arg("800x600")
        .arg("--font")
        .arg(font.path())
        .arg("--model")
        .arg("missing/cartoon_model.glb");
    cmd
}

#[test]
fn headless_run_prints_scene_summary() {
    let font = build_font();
    headless(&font)
        .arg("--frames")
        .arg("2")
        .assert()
        .success()
        .stdout(contains("Rendered 2 frame(s) at 800x600"))
        .stdout(contains("Font: loaded"))
        .stdout(contains("Model: failed"))
        .stdout(contains("Scene has 1 objects"))
        .stdout(contains("Spotlight at (0.00, 0.00, 5.00)"))
        .stdout(contains(" - text pos=(-2.50, 5.00, 0.00)"))
        .stdout(contains("character").not());
}

#[test]
fn scrolling_past_the_trigger_lands_the_text() {
    let font = build_font();
    headless(&font)
        .arg("--scroll")
        .arg("300")
        .assert()
        .success()
        .stdout(contains(" - text pos=(-2.50, 0.00, 0.00)"));
}

#[test]
fn config_file_overrides_defaults() {
    let font = build_font();
    let mut config = NamedTempFile::new().expect("temp config");
    config
        .write_all(br#"{ "text": { "position": [-1.0, 0.0, 0.0], "tween": { "axis": "y", "from": 2.0, "to": 1.0 } } }"#)
        .expect("write config");
    headless(&font)
        .arg("--config")
        .arg(config.path())
        .assert()
        .success()
        .stdout(contains(" - text pos=(-1.00, 2.00, 0.00)"));
}

#[test]
fn missing_assets_still_render() {
    let mut cmd = Command::cargo_bin("scroll-scene").expect("binary exists");
    cmd.args(["--headless", "--font", "missing/font.json", "--model", "missing/model.glb"])
        .assert()
        .success()
        .stdout(contains("Rendered 1 frame(s)"))
        .stdout(contains("Font: failed"))
        .stdout(contains("Scene has 0 objects"));
}

#[test]
fn invalid_arguments_fail() {
    let mut cmd = Command::cargo_bin("scroll-scene").expect("binary exists");
    cmd.arg("--size")
        .arg("wide")
        .assert()
        .failure()
        .stderr(contains("invalid size"));
}
