//! Shared test infrastructure for integration tests.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway sheet file plus a config pointing the file store at it.
pub struct SheetFixture {
    pub dir: TempDir,
    pub sheet_path: PathBuf,
    pub config_path: PathBuf,
}

/// Parsed result of one `sheetpost` invocation.
#[derive(Debug)]
pub struct RunOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Parse stdout as JSON, panicking with stderr context on failure.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout).unwrap_or_else(|err| {
            panic!(
                "stdout is not JSON ({err}):\n{}\nstderr:\n{}",
                self.stdout, self.stderr
            )
        })
    }
}

impl SheetFixture {
    /// Write `rows` as the sheet and a file-store config beside it.
    pub fn new(rows: Value) -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let sheet_path = dir.path().join("sheet.json");
        let config_path = dir.path().join("config.json");
        std::fs::write(&sheet_path, serde_json::to_string_pretty(&rows)?)?;
        let config = json!({
            "store": { "kind": "file", "path": sheet_path },
            "image_root": dir.path().join("media"),
        });
        std::fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
        Ok(Self {
            dir,
            sheet_path,
            config_path,
        })
    }

    /// Run the binary with this fixture's config.
    pub fn run(&self, args: &[&str]) -> RunOutput {
        let mut full = vec!["--config", path_str(&self.config_path)];
        full.extend_from_slice(args);
        run_sheetpost(&full)
    }

    /// Current sheet contents.
    pub fn sheet(&self) -> Value {
        let text = std::fs::read_to_string(&self.sheet_path).expect("read sheet");
        serde_json::from_str(&text).expect("parse sheet")
    }
}

/// Run the binary with an environment scrubbed of config overrides.
pub fn run_sheetpost(args: &[&str]) -> RunOutput {
    let output = Command::new(env!("CARGO_BIN_EXE_sheetpost"))
        .args(args)
        .env_remove("SHEETPOST_CONFIG")
        .env_remove("SHEETS_WEB_APP_URL")
        .env_remove("SHEETS_TOKEN")
        .env_remove("SHEETPOST_LOG")
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn sheetpost");
    RunOutput::from_output(output)
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

/// Three pending content groups, two platform rows each.
pub fn sample_rows() -> Value {
    json!([
        { "콘텐츠ID": "A", "플랫폼": "naver_blog", "제목": "A blog", "본문HTML": "<p>A</p>[이미지#1]", "상태": "", "시도횟수": 0, "이미지파일(JSON)": "[\"a/1.png\"]" },
        { "콘텐츠ID": "A", "플랫폼": "threads", "제목": "A thread", "내용(원문)": "A text", "상태": "pending", "시도횟수": 0 },
        { "콘텐츠ID": "B", "플랫폼": "naver_blog", "제목": "B blog", "본문HTML": "<p>B</p>", "상태": "" },
        { "콘텐츠ID": "B", "플랫폼": "threads", "제목": "B thread", "내용(원문)": "B text", "상태": "done" },
        { "콘텐츠ID": "C", "플랫폼": "naver_blog", "제목": "C blog", "본문HTML": "<p>C</p>", "상태": "" },
        { "콘텐츠ID": "C", "플랫폼": "threads", "제목": "C thread", "내용(원문)": "C text", "상태": "" }
    ])
}
