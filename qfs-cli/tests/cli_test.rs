use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn create_test_tree(files: &[&str]) -> Result<TempDir> {
    let dir = tempdir()?;
    for relative in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, "")?;
    }
    Ok(dir)
}

fn qfs(root: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("qfs-cli")?;
    cmd.args(["--dir", root.to_str().unwrap(), "--threads", "1"]);
    Ok(cmd)
}

#[test]
fn test_prints_matches_and_summary() -> Result<()> {
    let dir = create_test_tree(&["a/Hello.txt", "b/hello.log", "c/other.bin"])?;

    qfs(dir.path())?
        .args(["--target", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting search for"))
        .stdout(predicate::str::contains("Found Hello.txt at:"))
        .stdout(predicate::str::contains("Found hello.log at:"))
        .stdout(predicate::str::contains("Found 2 results"))
        .stdout(predicate::str::contains("other.bin").not());
    Ok(())
}

#[test]
fn test_quiet_save_writes_sorted_file() -> Result<()> {
    let dir = create_test_tree(&["z/report.txt", "a/report.txt", "m/summary.txt"])?;
    let out = dir.path().join("results.txt");

    qfs(dir.path())?
        .args(["--target", "report", "--quiet", "--save", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Results will NOT be printed during search"))
        .stdout(predicate::str::contains("Found report.txt at:").not());

    let saved = fs::read_to_string(&out)?;
    let lines: Vec<&str> = saved.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Found report.txt at: "));
    assert!(lines[0] < lines[1]);
    assert!(lines[0].contains(&format!("{}a", std::path::MAIN_SEPARATOR)));
    Ok(())
}

#[test]
fn test_json_output() -> Result<()> {
    let dir = create_test_tree(&["data/test1.exe", "data/mytest1.exe"])?;
    let out = dir.path().join("results.json");

    qfs(dir.path())?
        .args(["--target", r"/^test[0-9]+\.exe$/", "--save", "--format", "json", "--output"])
        .arg(&out)
        .assert()
        .success();

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out)?)?;
    let items = saved.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["file_name"], "test1.exe");
    Ok(())
}

#[test]
fn test_nothing_found() -> Result<()> {
    let dir = create_test_tree(&["a.txt"])?;
    qfs(dir.path())?
        .args(["--target", "zzz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing found"));
    Ok(())
}

#[test]
fn test_here_uses_current_directory() -> Result<()> {
    let dir = create_test_tree(&["sub/needle.txt"])?;
    Command::cargo_bin("qfs-cli")?
        .current_dir(dir.path())
        .args(["--target", "needle", "--dir", "here", "--threads", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found needle.txt at:"));
    Ok(())
}

#[test]
fn test_ambiguous_query_fails() -> Result<()> {
    let dir = create_test_tree(&["a.txt"])?;
    qfs(dir.path())?
        .args(["--target", "a&&b||c"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("mixes"));
    Ok(())
}

#[test]
fn test_invalid_regex_fails_before_search() -> Result<()> {
    let dir = create_test_tree(&["a.txt"])?;
    qfs(dir.path())?
        .args(["--target", "/(unclosed/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid regular expression"))
        .stdout(predicate::str::contains("Starting search").not());
    Ok(())
}

#[test]
fn test_missing_directory_fails() -> Result<()> {
    let dir = tempdir()?;
    qfs(&dir.path().join("missing"))?
        .args(["--target", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn test_too_many_threads_fails() -> Result<()> {
    let dir = create_test_tree(&["a.txt"])?;
    Command::cargo_bin("qfs-cli")?
        .args(["--target", "a", "--threads", "100000", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Worker count must be between 1 and"));
    Ok(())
}

#[test]
fn test_missing_target_fails() -> Result<()> {
    let dir = create_test_tree(&["a.txt"])?;
    qfs(dir.path())?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Target file name not specified"));
    Ok(())
}

#[test]
fn test_interactive_mode() -> Result<()> {
    let dir = create_test_tree(&["deep/er/Needle.TXT"])?;
    let script = format!("needle\n1\n{}\nn\n\n", dir.path().display());

    Command::cargo_bin("qfs-cli")?
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Quick File Search"))
        .stdout(predicate::str::contains("Found Needle.TXT at:"))
        .stdout(predicate::str::contains("Press enter to close..."));
    Ok(())
}
