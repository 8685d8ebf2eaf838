//! End-to-end tests for the `fhirtypes` binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(deprecated)]
fn cli() -> Command {
    let mut cmd = Command::cargo_bin("fhirtypes").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

/// Temp dir holding one Extension with an unknown `value[x]` variant
fn unknown_variant() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unknown.json");
    fs::write(&path, r#"{"url": "http://example.org/x", "valueFooBar": 1}"#).unwrap();
    (dir, path)
}

#[test]
fn test_help_lists_subcommands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("decode"))
        .stdout(predicate::str::contains("export-table"));
}

#[test]
fn test_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// decode
// ============================================================================

#[test]
fn test_decode_prints_normalized_json() {
    let value = stdout_json(cli().args(["decode", "--type", "Dosage"]).arg(data("dosage.json")));
    assert_eq!(value["asNeededBoolean"], false);
    assert_eq!(value["doseAndRate"][0]["doseQuantity"]["code"], "TAB");
    assert_eq!(value["timing"]["repeat"]["when"], serde_json::json!(["C"]));
}

#[test]
fn test_decode_to_xml() {
    cli()
        .args(["decode", "--type", "Dosage", "--format", "xml"])
        .arg(data("dosage.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"<dosage xmlns="http://hl7.org/fhir""#))
        .stdout(predicate::str::contains(r#"<asNeededBoolean value="false"/>"#));
}

#[test]
fn test_decode_reads_stdin() {
    let value = stdout_json(
        cli()
            .args(["decode", "-", "--type", "Coding"])
            .write_stdin(r#"{"code": "a", "system": "http://example.org"}"#),
    );
    assert_eq!(value["code"], "a");
}

#[test]
fn test_decode_needs_a_type() {
    cli()
        .arg("decode")
        .arg(data("dosage.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass --type"));
}

#[test]
fn test_decode_rejects_unknown_type() {
    cli()
        .args(["decode", "--type", "NoSuchType"])
        .arg(data("dosage.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown type 'NoSuchType'"));
}

#[test]
fn test_decode_reports_conflict() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conflict.json");
    fs::write(&path, r#"{"url": "http://example.org/x", "valueString": "a", "valueBoolean": true}"#).unwrap();

    cli()
        .args(["decode", "--type", "Extension"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Extension.value[x]"))
        .stderr(predicate::str::contains("valueString"));
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_reports_each_document() {
    cli()
        .args(["check", "--type", "Extension"])
        .arg(data("extensions.json"))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("extensions.json[0]: ok"))
        .stdout(predicate::str::contains("extensions.json[3]: FAILED"))
        .stdout(predicate::str::contains("5 documents, 1 failed"));
}

#[test]
fn test_check_json_report() {
    let output = cli()
        .args(["check", "--type", "Extension", "--report", "json"])
        .arg(data("extensions.json"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = report.as_array().unwrap();
    assert_eq!(entries.len(), 5);
    let failed: Vec<&Value> = entries.iter().filter(|e| e["ok"] == false).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0]["error"].as_str().unwrap().contains("more than one choice variant"));
}

#[test]
fn test_check_ndjson_lines() {
    cli()
        .args(["check", "--type", "Coding"])
        .arg(data("documents.ndjson"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("documents.ndjson:1: ok"))
        .stdout(predicate::str::contains("documents.ndjson:2: FAILED"));
}

#[test]
fn test_check_bad_ndjson_line_fails_alone() {
    let output = cli()
        .args(["check", "--type", "Coding"])
        .arg(data("mixed.ndjson"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4, "unexpected report: {stdout}");
    assert!(lines[0].ends_with("mixed.ndjson:1: ok"));
    assert!(lines[1].contains("mixed.ndjson:2: FAILED invalid JSON"));
    assert!(lines[2].ends_with("mixed.ndjson:3: ok"));
    assert_eq!(lines[3], "3 documents, 1 failed");
}

#[test]
fn test_check_passes_valid_documents() {
    cli()
        .args(["check", "--type", "Dosage"])
        .arg(data("dosage.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 documents, 0 failed"));
}

#[test]
fn test_lenient_flag_keeps_unknown_variants() {
    let (_dir, path) = unknown_variant();

    cli()
        .args(["check", "--type", "Extension"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("valueFooBar"));

    cli()
        .args(["check", "--type", "Extension", "--lenient"])
        .arg(&path)
        .assert()
        .success();
}

// ============================================================================
// configuration
// ============================================================================

#[test]
fn test_config_file_sets_mode() {
    let (dir, path) = unknown_variant();
    let config = dir.path().join("settings.toml");
    fs::write(&config, "[decode]\nmode = \"lenient\"\n").unwrap();

    cli()
        .args(["check", "--type", "Extension", "--config"])
        .arg(&config)
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_environment_sets_mode() {
    let (_dir, path) = unknown_variant();

    cli()
        .env("FHIRTYPES__DECODE__MODE", "lenient")
        .args(["check", "--type", "Extension"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_json_logs_go_to_stderr() {
    let output = cli()
        .args(["--json-logs", "check", "--type", "Dosage"])
        .arg(data("dosage.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("\"level\""));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Check finished"));
}

// ============================================================================
// convert
// ============================================================================

#[test]
fn test_convert_xml_with_schema() {
    let value = stdout_json(cli().args(["convert", "--type", "Extension"]).arg(data("extension.xml")));
    assert_eq!(value["url"], "http://hl7.org/fhir/StructureDefinition/us-core-race");
    assert_eq!(value["extension"][1]["valueInteger"], 2);
    assert_eq!(value["extension"][2]["valueString"], "2106");
}

#[test]
fn test_convert_json_to_xml_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("dosage.xml");

    cli()
        .args(["convert", "--type", "Dosage", "--output"])
        .arg(&out)
        .arg(data("dosage.json"))
        .assert()
        .success();

    let xml = fs::read_to_string(&out).unwrap();
    assert!(xml.contains("<dosage xmlns=\"http://hl7.org/fhir\">"));
    assert!(xml.contains("<doseQuantity>"));
}

#[test]
fn test_convert_data_type_needs_element_name() {
    cli()
        .arg("convert")
        .arg(data("dosage.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--element"));
}

// ============================================================================
// schema and definitions
// ============================================================================

#[test]
fn test_schema_describes_type() {
    cli()
        .args(["schema", "Dosage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("asNeeded[x]"))
        .stdout(predicate::str::contains("boolean | CodeableConcept"));
}

#[test]
fn test_schema_lists_types() {
    cli()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("Timing.Repeat"))
        .stdout(predicate::str::contains("backbone"));
}

#[test]
fn test_schema_lists_types_of_kind() {
    cli()
        .args(["schema", "--kind", "backbone"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Timing.Repeat"))
        .stdout(predicate::str::contains("HumanName").not());
}

#[test]
fn test_schema_json() {
    let value = stdout_json(cli().args(["schema", "--json", "Extension"]));
    assert_eq!(value["name"], "Extension");
    assert!(value["fields"].as_array().unwrap().iter().any(|f| f["name"] == "value"));
}

#[test]
fn test_definitions_extend_registry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no-dose.json");
    fs::write(&path, r#"{"text": "as directed", "doseAndRate": [{}]}"#).unwrap();

    cli()
        .args(["decode", "--type", "StrictDosage", "--definitions"])
        .arg(data("strict-dosage.json"))
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dose[x]"))
        .stderr(predicate::str::contains("required field is missing"));
}

#[test]
fn test_export_table_definitions_only() {
    let value = stdout_json(
        cli()
            .args(["export-table", "--definitions-only", "--definitions"])
            .arg(data("strict-dosage.json")),
    );
    assert_eq!(value["fhirVersion"], "4.0.1");
    let names: Vec<&str> = value["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["StrictDosage", "StrictDosage.DoseAndRate"]);
}
