use crate::domain::model::LaunchSpec;
use crate::domain::ports::Desktop;
use crate::utils::error::{LauncherError, Result};
use crate::utils::monitor::ProcessMonitor;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};

/// How often a running emulator is checked for its main window.
pub const WINDOW_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Alt+Enter
pub const FULLSCREEN_TOGGLE: &str = "alt+Return";

/// Result of polling a child process for its window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowWait {
    Found { title: String },
    Exited(i32),
}

pub fn exit_code(status: ExitStatus) -> i32 {
    // 被 signal 終止時沒有 exit code
    status.code().unwrap_or(-1)
}

/// 子行程生命週期管理：啟動、輪詢視窗、送出熱鍵、等待結束
pub struct Supervisor {
    desktop: Arc<dyn Desktop>,
    monitor_enabled: bool,
    monitor_interval: Duration,
}

impl Supervisor {
    pub fn new(desktop: Arc<dyn Desktop>) -> Self {
        Self {
            desktop,
            monitor_enabled: false,
            monitor_interval: Duration::from_secs(5),
        }
    }

    pub fn with_monitoring(mut self, enabled: bool, interval: Duration) -> Self {
        self.monitor_enabled = enabled;
        self.monitor_interval = interval.max(Duration::from_secs(1));
        self
    }

    pub fn spawn(&self, spec: &LaunchSpec) -> Result<Child> {
        tracing::info!("🚀 Launching {}", spec.command_line());

        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        command.spawn().map_err(|e| LauncherError::ProcessError {
            message: format!("failed to start {}: {}", spec.program.display(), e),
        })
    }

    /// Blocks until the child exits and returns its exit code.
    pub async fn wait(&self, child: &mut Child) -> Result<i32> {
        let monitor = self
            .monitor_enabled
            .then(|| ProcessMonitor::new(true, child.id().unwrap_or(0)))
            .filter(ProcessMonitor::is_enabled);
        let Some(monitor) = monitor else {
            let status = child.wait().await?;
            return Ok(exit_code(status));
        };

        let mut ticker = tokio::time::interval(self.monitor_interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                status = child.wait() => {
                    monitor.log_final_stats();
                    return Ok(exit_code(status?));
                }
                _ = ticker.tick() => monitor.log_stats("Emulator"),
            }
        }
    }

    pub async fn run_and_wait(&self, spec: &LaunchSpec) -> Result<i32> {
        let mut child = self.spawn(spec)?;
        let code = self.wait(&mut child).await?;
        tracing::info!("Emulator exited with code {}", code);
        Ok(code)
    }

    /// Polls every [`WINDOW_POLL_INTERVAL`] until a window owned by the child
    /// matches `matcher`, or the child exits.
    pub async fn wait_for_window<F>(&self, child: &mut Child, matcher: F) -> Result<WindowWait>
    where
        F: Fn(&str) -> bool,
    {
        let pid = child.id().ok_or_else(|| LauncherError::ProcessError {
            message: "process exited before it could be polled".to_string(),
        })?;

        loop {
            if let Ok(status) = tokio::time::timeout(WINDOW_POLL_INTERVAL, child.wait()).await {
                return Ok(WindowWait::Exited(exit_code(status?)));
            }

            if let Some(title) = self.desktop.window_title(pid).await {
                if matcher(&title) {
                    tracing::debug!("Found window '{}' for pid {}", title, pid);
                    return Ok(WindowWait::Found { title });
                }
            }
        }
    }

    pub async fn send_keys(&self, pid: u32, keys: &str) -> Result<()> {
        tracing::debug!("Sending '{}' to pid {}", keys, pid);
        self.desktop.send_keys(pid, keys).await
    }
}
