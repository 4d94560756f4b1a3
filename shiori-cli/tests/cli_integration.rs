//! Integration tests for the shiori CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get the path to a test fixture
fn fixture_path(name: &str) -> String {
    format!("tests/fixtures/{}", name)
}

fn shiori() -> Command {
    Command::cargo_bin("shiori").unwrap()
}

#[test]
fn test_segment_text_output() {
    let mut cmd = shiori();
    cmd.arg("segment")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("== chapter-01.html: chapter 0, 3 blocks"))
        .stdout(predicate::str::contains("ch0-b0\theading\t0..3\t雨の日"))
        .stdout(predicate::str::contains("ch0-b2\tparagraph"));
}

#[test]
fn test_segment_json_output() {
    let mut cmd = shiori();
    cmd.arg("segment")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-f")
        .arg("json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"chapterIndex\": 0"))
        .stdout(predicate::str::contains("\"id\": \"ch0-b1\""))
        .stdout(predicate::str::contains("\"kind\": \"heading\""));
}

#[test]
fn test_segment_markdown_output() {
    let mut cmd = shiori();
    cmd.arg("segment")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-f")
        .arg("markdown");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("## chapter-01.html (chapter 0)"))
        .stdout(predicate::str::contains("| id | kind | range | text |"))
        .stdout(predicate::str::contains("---"))
        .stdout(predicate::str::contains("*Total: 1 chapters"));
}

#[test]
fn test_segment_glob_numbers_chapters_in_order() {
    let mut cmd = shiori();
    cmd.arg("segment")
        .arg("-i")
        .arg(fixture_path("chapter-*.html"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("== chapter-01.html: chapter 0"))
        .stdout(predicate::str::contains("== chapter-02.html: chapter 1, 4 blocks"))
        .stdout(predicate::str::contains("ch1-b2\timage-container"));
}

#[test]
fn test_segment_ruby_readings_not_counted() {
    let mut cmd = shiori();
    cmd.arg("segment")
        .arg("-i")
        .arg(fixture_path("chapter-02.html"))
        .arg("--first-chapter")
        .arg("1");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("邂逅は駅の改札で訪れた。"))
        .stdout(predicate::str::contains("かいこう").not());
}

#[test]
fn test_segment_writes_processed_markup() {
    let temp_dir = TempDir::new().unwrap();
    let markup_dir = temp_dir.path().join("processed");

    let mut cmd = shiori();
    cmd.arg("segment")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-m")
        .arg(&markup_dir)
        .arg("-o")
        .arg(temp_dir.path().join("blocks.txt"));

    cmd.assert().success();

    let markup = fs::read_to_string(markup_dir.join("chapter-01.html")).unwrap();
    assert!(markup.contains(r#"<h1 data-block-id="ch0-b0""#));
    assert!(markup.contains(r#"data-block-id="ch0-b2""#));
    assert!(markup.contains("<title>雨の日</title>"));
}

#[test]
fn test_invalid_file() {
    let mut cmd = shiori();
    cmd.arg("segment").arg("-i").arg("nonexistent.html");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No files found"));
}

#[test]
fn test_stats_output() {
    let mut cmd = shiori();
    cmd.arg("stats")
        .arg("-i")
        .arg(fixture_path("chapter-*.html"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"chapterLengths\""))
        .stdout(predicate::str::contains("\"totalLength\""))
        .stdout(predicate::str::contains("\"blockId\": \"ch1-b3\""));
}

#[test]
fn test_stats_without_block_maps() {
    let mut cmd = shiori();
    cmd.arg("stats")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("--no-block-maps");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"chapterLengths\""))
        .stdout(predicate::str::contains("blockMaps").not());
}

#[test]
fn test_restore_exact_position() {
    let mut cmd = shiori();
    cmd.arg("restore")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-p")
        .arg(fixture_path("position-exact.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("method:      block\n"))
        .stdout(predicate::str::contains("confidence:  high"))
        .stdout(predicate::str::contains("block:       ch0-b2 +4"))
        .stdout(predicate::str::contains("degraded:    none"));
}

#[test]
fn test_restore_stale_block_id_uses_offset() {
    let mut cmd = shiori();
    cmd.arg("restore")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-p")
        .arg(fixture_path("position-stale.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("method:      block-map"))
        .stdout(predicate::str::contains("block:       ch0-b1 +7"))
        .stdout(predicate::str::contains("offset:      10"))
        .stdout(predicate::str::contains("structural-mismatch"));
}

#[test]
fn test_restore_json_report() {
    let mut cmd = shiori();
    cmd.arg("restore")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-p")
        .arg(fixture_path("position-exact.json"))
        .arg("-f")
        .arg("json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"method\": \"block\""))
        .stdout(predicate::str::contains("\"blockId\": \"ch0-b2\""))
        .stdout(predicate::str::contains("\"scrollPosition\""));
}

#[test]
fn test_restore_paged_reports_page() {
    let mut cmd = shiori();
    cmd.arg("restore")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-p")
        .arg(fixture_path("position-exact.json"))
        .arg("--paged");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("method:      block\n"))
        .stdout(predicate::str::contains("page:        0"));
}

#[test]
fn test_restore_without_locator_fails_strictly() {
    let mut cmd = shiori();
    cmd.arg("restore")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-p")
        .arg(fixture_path("position-empty.json"))
        .arg("--strict");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("method:      failed"))
        .stdout(predicate::str::contains("total-failure"))
        .stderr(predicate::str::contains("Restore failed"));
}

#[test]
fn test_restore_malformed_position() {
    let mut cmd = shiori();
    cmd.arg("restore")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-p")
        .arg(fixture_path("chapter-02.html"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Malformed position file"));
}

#[test]
fn test_merge_prefers_further_position() {
    let temp_dir = TempDir::new().unwrap();
    let output_file = temp_dir.path().join("merged.json");

    let mut cmd = shiori();
    cmd.arg("merge")
        .arg("-l")
        .arg(fixture_path("positions-local.json"))
        .arg("-r")
        .arg(fixture_path("positions-remote.json"))
        .arg("-d")
        .arg("phone")
        .arg("-o")
        .arg(&output_file);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("conflict: book-a progress"))
        .stderr(predicate::str::contains("remote (further)"));

    let merged: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output_file).unwrap()).unwrap();
    assert_eq!(merged["book-a"]["chapterIndex"], 5);
    assert_eq!(merged["book-b"]["deviceId"], "phone");
    assert_eq!(merged["book-c"]["syncVersion"], 7);
}

#[test]
fn test_generate_config_then_validate() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("shiori.toml");

    let mut cmd = shiori();
    cmd.arg("generate-config")
        .arg("-o")
        .arg(&config_file)
        .arg("--preset")
        .arg("responsive");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Configuration template generated"));

    let content = fs::read_to_string(&config_file).unwrap();
    assert!(content.contains("[reader]"));
    assert!(content.contains("debounce_ms = 1000"));

    let mut cmd = shiori();
    cmd.arg("validate").arg("-c").arg(&config_file);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("✓ Configuration is valid!"));
}

#[test]
fn test_validate_invalid_config() {
    let mut cmd = shiori();
    cmd.arg("validate")
        .arg("-c")
        .arg(fixture_path("invalid-config.toml"));

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("✗ Configuration is invalid!"))
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn test_config_changes_block_attribute() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("shiori.toml");
    fs::write(&config_file, "[segmenter]\nid_attribute = \"data-shiori-id\"\n").unwrap();
    let markup_dir = temp_dir.path().join("out");

    let mut cmd = shiori();
    cmd.arg("segment")
        .arg("-i")
        .arg(fixture_path("chapter-01.html"))
        .arg("-c")
        .arg(&config_file)
        .arg("-m")
        .arg(&markup_dir)
        .arg("-q");

    cmd.assert().success();

    let markup = fs::read_to_string(markup_dir.join("chapter-01.html")).unwrap();
    assert!(markup.contains(r#"data-shiori-id="ch0-b1""#));
}

#[test]
fn test_help_message() {
    let mut cmd = shiori();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Reading-position indexing"))
        .stdout(predicate::str::contains("segment"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("merge"));
}
