use std::fs;
use std::io::Write as _;
use std::process::{Command, Stdio};

use tempfile::tempdir;

fn pike_lint_binary() -> &'static str {
    env!("CARGO_BIN_EXE_pike-lint")
}

#[test]
fn reports_uninitialized_read_with_location() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    fs::write(
        tmp.path().join("greet.pike"),
        "int main() {\n  string name;\n  write(name);\n  return 0;\n}\n",
    )?;

    let output = Command::new(pike_lint_binary())
        .current_dir(tmp.path())
        .arg("check")
        .output()
        .expect("run pike-lint check");

    assert!(output.status.success(), "warnings alone should not fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("warning: Variable 'name' is used before being initialized"),
        "expected warning, got: {stderr}"
    );
    assert!(
        stderr.contains("--> greet.pike:3:9"),
        "expected location, got: {stderr}"
    );
    assert!(
        stderr.contains("  write(name);"),
        "expected source line, got: {stderr}"
    );
    assert!(stderr.contains("checked 1 file(s): 1 warning(s)"));
    Ok(())
}

#[test]
fn deny_warnings_fails_the_run() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("maybe.pike");
    fs::write(
        &script_path,
        "void f(int x) { string s; if (x) { s = \"y\"; } write(s); }\n",
    )?;

    let output = Command::new(pike_lint_binary())
        .args(["check", "--deny-warnings"])
        .arg(&script_path)
        .output()
        .expect("run pike-lint check --deny-warnings");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("may be uninitialized"), "got: {stderr}");

    let output = Command::new(pike_lint_binary())
        .args(["check", "--deny-warnings", "--no-maybe"])
        .arg(&script_path)
        .output()
        .expect("run pike-lint check --no-maybe");
    assert!(output.status.success(), "maybe reports are disabled");
    Ok(())
}

#[test]
fn walks_directories_and_skips_other_files() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let nested = tmp.path().join("lib").join("Util.pmod");
    fs::create_dir_all(&nested)?;
    fs::write(nested.join("module.pmod"), "mapping cache;\nmixed get() { return cache; }\n")?;
    fs::write(tmp.path().join("b.pike"), "array items;\nwrite(items);\n")?;
    fs::write(tmp.path().join("notes.txt"), "string s; write(s);\n")?;

    let output = Command::new(pike_lint_binary())
        .args(["check", "--format", "json"])
        .arg(tmp.path())
        .output()
        .expect("run pike-lint check --format json");

    assert!(output.status.success());
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let reports = reports.as_array().expect("array of file reports");
    assert_eq!(reports.len(), 2, "got {reports:?}");

    let b_report = &reports[0];
    assert!(b_report["file"].as_str().unwrap_or_default().ends_with("b.pike"));
    assert_eq!(b_report["diagnostics"][0]["variable"], "items");
    assert_eq!(b_report["diagnostics"][0]["position"]["line"], 2);
    assert_eq!(b_report["diagnostics"][0]["position"]["character"], 6);

    let module_report = &reports[1];
    assert_eq!(module_report["diagnostics"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[test]
fn tokenizer_failures_are_errors() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("broken.pike");
    fs::write(&script_path, "string s = \"unterminated;\n")?;

    let output = Command::new(pike_lint_binary())
        .arg("check")
        .arg(&script_path)
        .output()
        .expect("run pike-lint on broken source");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error: unterminated string literal"),
        "got: {stderr}"
    );
    assert!(stderr.contains("1 file(s) could not be tokenized"), "got: {stderr}");
    Ok(())
}

#[test]
fn dumps_tokens_with_positions() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let script_path = tmp.path().join("tokens.pike");
    fs::write(&script_path, "int x;\n")?;

    let output = Command::new(pike_lint_binary())
        .arg("tokens")
        .arg(&script_path)
        .output()
        .expect("run pike-lint tokens");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1:0\t\"int\""), "got: {stdout}");
    assert!(stdout.contains("1:4\t\"x\""), "got: {stdout}");
    Ok(())
}

#[test]
fn answers_json_requests_on_stdin() -> anyhow::Result<()> {
    let mut child = Command::new(pike_lint_binary())
        .arg("request")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn pike-lint request");

    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(br#"{"code": "string s; write(s);", "filename": "editor.pike"}"#)?;
    let output = child.wait_with_output()?;

    assert!(output.status.success());
    let response: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let diagnostic = &response["diagnostics"][0];
    assert_eq!(diagnostic["variable"], "s");
    assert_eq!(diagnostic["source"], "uninitialized-variable");
    assert_eq!(diagnostic["position"]["file"], "editor.pike");
    Ok(())
}
