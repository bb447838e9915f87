//! Publisher backed by an external automation command.
//!
//! Browser automation lives outside this crate. The configured command is run
//! once per item with a JSON request on stdin and must print a JSON
//! `PlatformResult` on stdout:
//!
//! ```text
//! {"platform": "naver_blog", "settings": {...}, "input": {"item": {...}, "renderedBody": "...", "mediaPaths": [...]}}
//! ```
//!
//! `login()` runs the same command with a trailing `--login` argument and only
//! checks its exit status.
use super::{Publisher, UploadInput};
use crate::config::PlatformSettings;
use crate::model::{Platform, PlatformResult};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

const MAX_STDERR_BYTES: usize = 2000;

#[derive(Serialize)]
struct CommandRequest<'a> {
    platform: Platform,
    settings: &'a PlatformSettings,
    input: &'a UploadInput<'a>,
}

#[derive(Debug, Clone)]
pub struct CommandPublisher {
    platform: Platform,
    program: PathBuf,
    args: Vec<String>,
    settings: PlatformSettings,
}

impl CommandPublisher {
    /// Parse `command` with shell quoting rules and resolve its program on `PATH`.
    pub fn new(platform: Platform, command: &str, settings: PlatformSettings) -> Result<Self> {
        let mut words = shell_words::split(command)
            .with_context(|| format!("parse publish command for {platform}: {command}"))?;
        if words.is_empty() {
            return Err(anyhow!("publish command for {platform} is empty"));
        }
        let program = words.remove(0);
        let program = which::which(&program)
            .with_context(|| format!("locate publish command {program} for {platform}"))?;
        Ok(CommandPublisher {
            platform,
            program,
            args: words,
            settings,
        })
    }

    fn run(&self, extra_args: &[&str], stdin: &[u8]) -> Result<Vec<u8>> {
        let start = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn publish command {}", self.program.display()))?;

        if let Some(mut child_stdin) = child.stdin.take() {
            child_stdin
                .write_all(stdin)
                .context("write request to publish command stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("wait for publish command")?;
        tracing::debug!(
            platform = %self.platform,
            elapsed_ms = start.elapsed().as_millis() as u64,
            response_bytes = output.stdout.len(),
            "publish command finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let cut = stderr
                .char_indices()
                .map(|(idx, _)| idx)
                .find(|idx| *idx >= MAX_STDERR_BYTES)
                .unwrap_or(stderr.len());
            return Err(anyhow!(
                "publish command exited with {}: {}",
                output.status,
                &stderr[..cut]
            ));
        }
        Ok(output.stdout)
    }
}

impl Publisher for CommandPublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn login(&mut self) -> Result<()> {
        self.run(&["--login"], b"")
            .with_context(|| format!("log in to {}", self.platform))?;
        Ok(())
    }

    fn upload(&mut self, input: &UploadInput<'_>) -> Result<PlatformResult> {
        let request = CommandRequest {
            platform: self.platform,
            settings: &self.settings,
            input,
        };
        let payload = serde_json::to_vec(&request).context("serialize publish request")?;
        let stdout = self.run(&[], &payload)?;
        parse_response(&stdout)
    }
}

/// Decode the command's stdout, tolerating log lines before the JSON object.
fn parse_response(stdout: &[u8]) -> Result<PlatformResult> {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    if let Ok(result) = serde_json::from_str::<PlatformResult>(trimmed) {
        return Ok(result);
    }
    let last_line = trimmed.lines().rev().find(|line| !line.trim().is_empty());
    last_line
        .and_then(|line| serde_json::from_str::<PlatformResult>(line.trim()).ok())
        .ok_or_else(|| anyhow!("publish command printed no result JSON"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_log_prefixed_responses() {
        let result = parse_response(br#"{"ok": true, "url": "https://blog/1", "id": "1"}"#)
            .expect("plain json");
        assert!(result.ok);
        assert_eq!(result.url.as_deref(), Some("https://blog/1"));

        let result = parse_response(b"opening browser\n{\"ok\": false, \"error\": \"captcha\"}\n")
            .expect("log-prefixed json");
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("captcha"));

        assert!(parse_response(b"nothing useful").is_err());
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = CommandPublisher::new(Platform::Tistory, "   ", PlatformSettings::default())
            .expect_err("empty command");
        assert!(err.to_string().contains("empty"));
    }

    #[cfg(unix)]
    #[test]
    fn runs_command_with_request_on_stdin() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("publish.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nif [ \"$1\" = \"--login\" ]; then exit 0; fi\ncat > \"$(dirname \"$0\")/request.json\"\necho '{\"ok\": true, \"url\": \"https://blog/42\"}'\n",
        )
        .expect("write script");
        let mut perms = std::fs::metadata(&script).expect("stat script").permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        std::fs::set_permissions(&script, perms).expect("chmod script");

        let command = shell_words::quote(&script.to_string_lossy()).into_owned();
        let mut publisher =
            CommandPublisher::new(Platform::Tistory, &command, PlatformSettings::default())
                .expect("command publisher");
        publisher.login().expect("login");

        let item = crate::model::ContentItem {
            content_id: "C-9".to_string(),
            platform: Some(Platform::Tistory),
            platform_label: "tistory".to_string(),
            title: "t".to_string(),
            body: String::new(),
            tags: Vec::new(),
            status: String::new(),
            attempts: 0,
            image_files: Vec::new(),
            alt_captions: Vec::new(),
            extra_meta: serde_json::Value::Null,
            image_meta: serde_json::Value::Null,
        };
        let media = vec![PathBuf::from("/data/a.jpg")];
        let result = publisher
            .upload(&UploadInput {
                item: &item,
                rendered_body: "<p>x</p>",
                media_paths: &media,
            })
            .expect("upload");
        assert_eq!(result.url.as_deref(), Some("https://blog/42"));

        let request: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("request.json")).expect("read request"),
        )
        .expect("parse request");
        assert_eq!(request["platform"], "tistory");
        assert_eq!(request["input"]["item"]["contentId"], "C-9");
        assert_eq!(request["input"]["mediaPaths"][0], "/data/a.jpg");
    }
}
