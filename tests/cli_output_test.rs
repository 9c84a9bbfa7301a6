#![cfg(feature = "cli")]

use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn stats_to_stdout(extra_args: &[&str]) -> anyhow::Result<(String, String)> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("a__b.jsonl"), "{\"id\":1}\n{\"id\":2}\n")?;

    let output = Command::new(env!("CARGO_BIN_EXE_repo-miner"))
        .args(extra_args)
        .arg("stats")
        .arg("-d")
        .arg(dir.path())
        .env_remove("RUST_LOG")
        .output()?;

    assert!(output.status.success(), "stats failed: {:?}", output);
    Ok((
        String::from_utf8(output.stdout)?,
        String::from_utf8(output.stderr)?,
    ))
}

#[test]
fn test_stats_stdout_is_plain_csv() -> anyhow::Result<()> {
    let (stdout, stderr) = stats_to_stdout(&[])?;

    assert_eq!(stdout, "repo,records\na/b,2\n");
    assert!(stderr.contains("Done, 1 processed"));
    Ok(())
}

#[test]
fn test_stats_stdout_is_plain_csv_with_json_logs() -> anyhow::Result<()> {
    let (stdout, stderr) = stats_to_stdout(&["--json-logs", "-v"])?;

    assert_eq!(stdout, "repo,records\na/b,2\n");
    assert!(stderr.contains("Starting repo-miner"));
    Ok(())
}
