use std::fs;
use std::process::Command;

fn tremor() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tremor"))
}

#[test]
fn deps_emits_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src/lib")).unwrap();
    fs::write(root.join("src/index.ts"), "import { a } from './lib/a';\n").unwrap();
    fs::write(root.join("src/lib/a.ts"), "import { b } from './b';\n").unwrap();
    fs::write(root.join("src/lib/b.ts"), "import { a } from './a';\n").unwrap();

    let output = tremor()
        .args(["deps", "--format", "json", "--path"])
        .arg(root)
        .current_dir(root)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "tremor deps failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["files"], 3);
    assert_eq!(json["summary"]["cycles"], 1);
    assert_eq!(json["entryPoints"][0], "src/index.ts");
}

#[test]
fn deps_text_output_lists_sections() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("main.js"), "const x = require('./x');\n").unwrap();
    fs::write(root.join("x.js"), "module.exports = 1;\n").unwrap();

    let output = tremor()
        .args(["deps", "--path"])
        .arg(root)
        .current_dir(root)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Import graph"));
    assert!(stdout.contains("Cycles (0)"));
    assert!(stdout.contains("Layer violations"));
}

#[test]
fn history_outside_a_repository_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = tremor()
        .args(["history", "--path"])
        .arg(dir.path())
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".tremor.toml"), "[bus_factor]\nthreshold = 2.0\n").unwrap();

    let output = tremor()
        .args(["deps", "--path", "."])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
}
