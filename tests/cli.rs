use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;

mod common;

use common::TestWorkspace;

#[test]
fn describe_writes_schema_json() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "sample.txt",
        "ABC;0001234,56;20230401;       123456789,1234567890;\n",
    );
    let schema_path = workspace.path().join("sample-schema.json");

    cargo_bin_cmd!("csv-recast")
        .args([
            "describe",
            "-i",
            input.to_str().unwrap(),
            "-o",
            schema_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let json: Value =
        serde_json::from_str(&std::fs::read_to_string(&schema_path).expect("read schema"))
            .expect("parse schema JSON");
    let columns = json.as_array().expect("schema array");
    assert_eq!(columns.len(), 4);
    assert_eq!(columns[0]["name"], "C-1");
    assert_eq!(columns[0]["type"], "T_TEXT");
    assert_eq!(columns[1]["type"], "T_NUM");
    assert_eq!(columns[2]["type"], "T_DATE_8");
    assert_eq!(columns[3]["type"], "T_NUM_V4");
    assert_eq!(columns[1]["size"], 10);
}

#[test]
fn describe_fails_on_empty_input() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("empty.txt", "");

    cargo_bin_cmd!("csv-recast")
        .args(["describe", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no row to sample"));
}

#[test]
fn diff_then_transform_rewrites_the_old_layout() {
    let workspace = TestWorkspace::new();
    let old = workspace.write(
        "v1.txt",
        "20230401;ABCDEFGHIJKL;       123456789,1234567890;\n",
    );
    let new = workspace.write("v2.txt", "2023-04-01;ABCDEFGH; 123456789,12;\n");
    let format = workspace.path().join("v1-to-v2.json");

    cargo_bin_cmd!("csv-recast")
        .args([
            "diff",
            "--old",
            old.to_str().unwrap(),
            "--new",
            new.to_str().unwrap(),
            "-o",
            format.to_str().unwrap(),
        ])
        .assert()
        .success();

    let descriptor = std::fs::read_to_string(&format).expect("read descriptor");
    assert!(descriptor.contains("T_DATE_8=>T_DATE_DB2"));
    assert!(descriptor.contains("T_NUM_V4=>T_NUM"));

    let input = workspace.write_rows(
        "data-v1.txt",
        &[
            "20230401;ABCDEFGHIJKL;       123456789,1234567890",
            "20231115;MNOPQRSTUVWX;      -987654321,0987654321",
        ],
    );
    let output = workspace.path().join("data-v2.txt");

    cargo_bin_cmd!("csv-recast")
        .args([
            "transform",
            "-f",
            format.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let rewritten = std::fs::read_to_string(&output).expect("read output");
    assert_eq!(
        rewritten,
        "2023-04-01;ABCDEFGH; 123456789,12\n\
         2023-11-15;MNOPQRST;-987654321,09\n"
    );
}

#[test]
fn transform_applies_a_hand_written_descriptor() {
    let workspace = TestWorkspace::new();
    let format = workspace.write(
        "format.json",
        r#"[
            {"name": "C-1", "changes": "type", "type": "T_NUM=>T_NUM", "size": "10=>10", "nb_decs": "2=>2"},
            {"name": "C-2", "changes": "size", "type": "T_TEXT=>T_TEXT", "size": "15=>10", "size_strip": "R"},
            {"name": "C-3", "changes": "size, type", "type": "T_DATE_8=>T_DATE_DB2", "size": "8=>10"}
        ]"#,
    );
    let input = workspace.write("rows.txt", " 001234,56;TEXT_VALUE_HERE;20230401\n");
    let output = workspace.path().join("rows-out.txt");

    cargo_bin_cmd!("csv-recast")
        .args([
            "transform",
            "-f",
            format.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert_eq!(
        std::fs::read_to_string(&output).expect("read output"),
        " 001234,56;TEXT_VALUE;2023-04-01\n"
    );
}

#[test]
fn transform_streams_between_stdin_and_stdout() {
    let workspace = TestWorkspace::new();
    let format = workspace.write(
        "format.json",
        r#"[{"name": "C-1", "changes": "size, type", "type": "T_DATE_8=>T_DATE_DB2", "size": "8=>10"}]"#,
    );

    cargo_bin_cmd!("csv-recast")
        .args(["transform", "-f", format.to_str().unwrap(), "-i", "-"])
        .write_stdin("20230401;X\n20231115;Y\n")
        .assert()
        .success()
        .stdout("2023-04-01;X\n2023-11-15;Y\n");
}

#[test]
fn transform_fails_fast_on_malformed_numeric_data() {
    let workspace = TestWorkspace::new();
    let format = workspace.write(
        "format.json",
        r#"[{"name": "C-1", "changes": "type", "type": "T_NUM=>T_NUM", "size": "10=>10", "nb_decs": "2=>2"}]"#,
    );
    // Second row is one byte short of the declared width.
    let input = workspace.write_rows("rows.txt", &[" 001234,56;A", " 01234,56;B"]);
    let output = workspace.path().join("rows-out.txt");

    cargo_bin_cmd!("csv-recast")
        .args([
            "transform",
            "-f",
            format.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2").and(predicate::str::contains("C-1")));
}

#[test]
fn transform_rejects_a_descriptor_with_unknown_changes() {
    let workspace = TestWorkspace::new();
    let format = workspace.write(
        "format.json",
        r#"[{"name": "C-1", "changes": "shuffle", "type": "T_TEXT=>T_TEXT", "size": "4=>4"}]"#,
    );
    let input = workspace.write("rows.txt", "AAAA;B\n");

    cargo_bin_cmd!("csv-recast")
        .args([
            "transform",
            "-f",
            format.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown change kind"));
}

#[test]
fn transform_reads_legacy_encoded_input() {
    let workspace = TestWorkspace::new();
    let format = workspace.write(
        "format.json",
        r#"[{"name": "C-1", "changes": "size", "type": "T_TEXT=>T_TEXT", "size": "6=>4", "size_strip": "R"}]"#,
    );
    let content = "CAF\u{c9}S!;1\n";
    let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(content);
    let input = workspace.path().join("latin.txt");
    std::fs::write(&input, &encoded).expect("write encoded input");

    cargo_bin_cmd!("csv-recast")
        .args([
            "transform",
            "-f",
            format.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "--input-encoding",
            "windows-1252",
        ])
        .assert()
        .success()
        .stdout("CAF\u{c9};1\n");
}
