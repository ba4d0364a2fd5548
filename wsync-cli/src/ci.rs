//! GitHub Actions job outputs
//!
//! Everything is printed to stdout. Inside a workflow run the summary is also
//! appended to `$GITHUB_STEP_SUMMARY` and outputs to `$GITHUB_OUTPUT`.

use std::io::Write;
use std::path::{Path, PathBuf};

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn append(path: &Path, text: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", text)
}

/// Print the markdown summary and append it to the job summary
pub fn emit_summary(markdown: &str) -> anyhow::Result<()> {
    println!("{}", markdown);
    write_summary(env_path("GITHUB_STEP_SUMMARY").as_deref(), markdown)
}

/// Print `name=value` and record it as a step output
pub fn emit_output(name: &str, value: impl std::fmt::Display) -> anyhow::Result<()> {
    let line = format!("{}={}", name, value);
    println!("{}", line);
    write_output(env_path("GITHUB_OUTPUT").as_deref(), &line)
}

fn write_summary(path: Option<&Path>, markdown: &str) -> anyhow::Result<()> {
    if let Some(path) = path {
        append(path, markdown)?;
        tracing::debug!(path = %path.display(), "Wrote job summary");
    }
    Ok(())
}

fn write_output(path: Option<&Path>, line: &str) -> anyhow::Result<()> {
    if let Some(path) = path {
        append(path, line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_outputs_are_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output");
        std::fs::write(&path, "existing=1\n").unwrap();

        write_output(Some(&path), "should-sync=true").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "existing=1\nshould-sync=true\n"
        );
    }

    #[test]
    fn test_summary_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");

        write_summary(Some(&path), "### 🟢 All Repos Now Use `v2` For Workflows").unwrap();
        write_summary(None, "ignored").unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("### 🟢"));
    }
}
