use crate::domain::ports::Desktop;
use crate::utils::error::{LauncherError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;

/// 透過 `xdotool` 查詢視窗標題與送出按鍵 (X11)
#[derive(Debug, Clone)]
pub struct XdotoolDesktop {
    binary: PathBuf,
}

impl XdotoolDesktop {
    pub fn new() -> Self {
        Self::with_binary("xdotool")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Option<String> {
        let output = Command::new(&self.binary).args(args).output().await.ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn find_window(&self, pid: u32) -> Option<String> {
        let pid = pid.to_string();
        let stdout = self
            .run(&["search", "--onlyvisible", "--pid", &pid])
            .await?;
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

impl Default for XdotoolDesktop {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Desktop for XdotoolDesktop {
    async fn window_title(&self, pid: u32) -> Option<String> {
        let window = self.find_window(pid).await?;
        let title = self.run(&["getwindowname", &window]).await?;
        Some(title.trim_end().to_string())
    }

    async fn send_keys(&self, pid: u32, keys: &str) -> Result<()> {
        let window = self
            .find_window(pid)
            .await
            .ok_or_else(|| LauncherError::ProcessError {
                message: format!("no window found for pid {}", pid),
            })?;

        self.run(&["windowactivate", "--sync", &window, "key", "--clearmodifiers", keys])
            .await
            .map(|_| ())
            .ok_or_else(|| LauncherError::ProcessError {
                message: format!("xdotool could not send '{}' to window {}", keys, window),
            })
    }
}

/// No window system integration: polling only waits for the process to exit.
#[derive(Debug, Clone, Default)]
pub struct NullDesktop;

#[async_trait]
impl Desktop for NullDesktop {
    async fn window_title(&self, _pid: u32) -> Option<String> {
        None
    }

    async fn send_keys(&self, pid: u32, keys: &str) -> Result<()> {
        tracing::debug!("No desktop integration, '{}' not sent to pid {}", keys, pid);
        Ok(())
    }
}

pub const DESKTOP_BACKENDS: [&str; 2] = ["xdotool", "none"];

pub fn desktop_from_name(name: &str) -> Arc<dyn Desktop> {
    match name {
        "xdotool" => Arc::new(XdotoolDesktop::new()),
        _ => Arc::new(NullDesktop),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_xdotool(dir: &TempDir) -> PathBuf {
        let log = dir.path().join("calls.log");
        let script = format!(
            r#"#!/bin/sh
echo "$@" >> "{}"
case "$1" in
  search) echo 4242 ;;
  getwindowname) echo "gpuDX11 Demul" ;;
  windowactivate) exit 0 ;;
esac
"#,
            log.display()
        );
        let path = dir.path().join("xdotool");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_window_title_and_send_keys() {
        let dir = TempDir::new().unwrap();
        let desktop = XdotoolDesktop::with_binary(fake_xdotool(&dir));

        assert_eq!(desktop.window_title(99).await.as_deref(), Some("gpuDX11 Demul"));
        desktop.send_keys(99, "alt+Return").await.unwrap();

        let calls = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(calls.contains("search --onlyvisible --pid 99"));
        assert!(calls.contains("getwindowname 4242"));
        assert!(calls.contains("windowactivate --sync 4242 key --clearmodifiers alt+Return"));
    }

    #[tokio::test]
    async fn test_missing_binary_has_no_window() {
        let desktop = XdotoolDesktop::with_binary("/no/such/xdotool");
        assert_eq!(desktop.window_title(1).await, None);
        assert!(desktop.send_keys(1, "alt+Return").await.is_err());
    }

    #[tokio::test]
    async fn test_null_desktop() {
        let desktop = desktop_from_name("none");
        assert_eq!(desktop.window_title(1).await, None);
        assert!(desktop.send_keys(1, "alt+Return").await.is_ok());
    }
}
