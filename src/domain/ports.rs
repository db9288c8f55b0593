use crate::core::process::Supervisor;
use crate::domain::model::{LaunchContext, LaunchRequest, LaunchSpec};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Per-emulator adapter.
#[async_trait]
pub trait Generator: Send {
    /// Rewrites the emulator's own config files and builds its command line.
    /// `Ok(None)` means the executable is missing.
    fn generate(
        &mut self,
        request: &LaunchRequest,
        context: &LaunchContext,
    ) -> Result<Option<LaunchSpec>>;

    async fn run_and_wait(&mut self, spec: &LaunchSpec, supervisor: &Supervisor) -> Result<i32> {
        supervisor.run_and_wait(spec).await
    }
}

/// 視窗查詢與按鍵注入
#[async_trait]
pub trait Desktop: Send + Sync {
    /// Title of the first top-level window owned by `pid`, if any.
    async fn window_title(&self, pid: u32) -> Option<String>;

    /// `keys` uses xdotool syntax, e.g. `alt+Return`.
    async fn send_keys(&self, pid: u32, keys: &str) -> Result<()>;
}
