use crate::core::features::{bind_opt_feature, IniSection};
use crate::core::ini::IniFile;
use crate::core::process::{Supervisor, WindowWait, FULLSCREEN_TOGGLE};
use crate::domain::model::{LaunchContext, LaunchRequest, LaunchSpec};
use crate::domain::ports::Generator;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

const EXECUTABLE: &str = "demul.exe";

/// Demul (Dreamcast, Naomi, Atomiswave, Hikaru, Gaelco)
#[derive(Debug, Default)]
pub struct DemulGenerator {
    old_version: bool,
}

impl DemulGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value passed to `-run=`.
    pub fn demul_core(system: &str, emulator: &str, core: &str) -> &'static str {
        if emulator == "demul-hikaru" || core == "hikaru" {
            return "hikaru";
        }
        if emulator == "demul-gaelco" || core == "gaelco" {
            return "gaelco";
        }
        if emulator == "demul-atomiswave" || core == "atomiswave" {
            return "awave";
        }
        if emulator == "demul-naomi" || emulator == "demul-naomi2" || core == "naomi" {
            return "naomi";
        }

        match system {
            "hikaru" => "hikaru",
            "gaelco" => "gaelco",
            "naomi" | "naomi2" => "naomi",
            "atomiswave" => "awave",
            _ => "dreamcast",
        }
    }

    fn setup_general_config(
        &self,
        path: &Path,
        request: &LaunchRequest,
        context: &LaunchContext,
    ) -> Result<()> {
        let mut ini = IniFile::load(path.join("Demul.ini"))?;

        let bios = context
            .paths
            .full_path("bios")
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let roms = request
            .rom
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        ini.write_value("files", "roms0", &bios);
        ini.write_value("files", "roms1", &roms);
        ini.write_value("files", "romsPathsCount", "2");

        ini.write_value("plugins", "directory", ".\\plugins\\");

        let gpu = if self.old_version || request.core == "gaelco" || request.system == "gaelco" {
            "gpuDX11old.dll"
        } else {
            "gpuDX11.dll"
        };
        ini.write_value("plugins", "gpu", gpu);

        for (key, default) in [
            ("pad", "padDemul.dll"),
            ("gdr", "gdrCHD.dll"),
            ("spu", "spuDemul.dll"),
        ] {
            if ini.get_value("plugins", key).unwrap_or("").is_empty() {
                ini.write_value("plugins", key, default);
            }
        }

        // 空字串代表使用者停用網路外掛，只有完全沒有設定時才補上
        if ini.get_value("plugins", "net").is_none() {
            ini.write_value("plugins", "net", "netDemul.dll");
        }

        ini.save()
    }

    fn setup_dx11_config(&self, path: &Path, context: &LaunchContext) -> Result<()> {
        let mut ini = IniFile::load(path.join("gpuDX11.ini"))?;

        // 全螢幕由啟動後的 Alt+Enter 切換
        ini.write_value("main", "UseFullscreen", "0");
        let vsync = if context.features.get("VSync") != "false" { "1" } else { "0" };
        ini.write_value("main", "Vsync", vsync);

        let mut main = IniSection {
            ini: &mut ini,
            section: "main",
        };
        // 沒有設定時保留使用者原本的值
        bind_opt_feature(&mut main, &context.features, "aspect", "demul_ratio");
        bind_opt_feature(&mut main, &context.features, "scaling", "demul_scaling");

        ini.save()
    }
}

#[async_trait]
impl Generator for DemulGenerator {
    fn generate(
        &mut self,
        request: &LaunchRequest,
        context: &LaunchContext,
    ) -> Result<Option<LaunchSpec>> {
        let folder = if request.emulator == "demul-old" || request.core == "demul-old" {
            "demul-old"
        } else {
            "demul"
        };
        self.old_version = folder == "demul-old";

        let path = context
            .paths
            .full_path(folder)
            .filter(|p| p.is_dir())
            .or_else(|| context.paths.full_path("demul"));
        let Some(path) = path else {
            return Ok(None);
        };

        let exe = path.join(EXECUTABLE);
        if !exe.is_file() {
            tracing::debug!("{} not found", exe.display());
            return Ok(None);
        }

        // 設定檔寫入失敗不影響啟動
        if let Err(e) = self.setup_general_config(&path, request, context) {
            tracing::warn!("Could not update Demul.ini: {}", e);
        }
        if let Err(e) = self.setup_dx11_config(&path, context) {
            tracing::warn!("Could not update gpuDX11.ini: {}", e);
        }

        let demul_core = Self::demul_core(&request.system, &request.emulator, &request.core);
        let rom_name = request
            .rom
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Ok(Some(LaunchSpec {
            program: exe,
            working_dir: Some(path),
            args: vec![format!("-run={}", demul_core), format!("-rom={}", rom_name)],
        }))
    }

    /// Demul opens windowed; once its gpu window shows up it is switched to
    /// fullscreen with Alt+Enter.
    async fn run_and_wait(&mut self, spec: &LaunchSpec, supervisor: &Supervisor) -> Result<i32> {
        let mut child = supervisor.spawn(spec)?;
        let pid = child.id().unwrap_or(0);

        match supervisor
            .wait_for_window(&mut child, |title| title.starts_with("gpu"))
            .await?
        {
            WindowWait::Exited(code) => return Ok(code),
            WindowWait::Found { .. } => {
                if let Err(e) = supervisor.send_keys(pid, FULLSCREEN_TOGGLE).await {
                    tracing::warn!("Could not switch Demul to fullscreen: {}", e);
                }
            }
        }

        supervisor.wait(&mut child).await
    }
}


#[cfg(all(test, unix))]
mod run_tests {
    use super::*;
    use crate::adapters::NullDesktop;
    use crate::domain::ports::Desktop;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Reports `title` for every pid and records the keys sent to it.
    struct RecordingDesktop {
        title: Option<&'static str>,
        sent: Mutex<Vec<String>>,
    }

    impl RecordingDesktop {
        fn new(title: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                title,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Desktop for RecordingDesktop {
        async fn window_title(&self, _pid: u32) -> Option<String> {
            self.title.map(str::to_string)
        }

        async fn send_keys(&self, _pid: u32, keys: &str) -> Result<()> {
            self.sent.lock().unwrap().push(keys.to_string());
            Ok(())
        }
    }

    fn shell(script: &str) -> LaunchSpec {
        LaunchSpec {
            program: PathBuf::from("sh"),
            working_dir: None,
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[tokio::test]
    async fn test_fullscreen_toggle_sent_once_when_gpu_window_appears() {
        let desktop = RecordingDesktop::new(Some("gpuDX11 - Demul"));
        let supervisor = Supervisor::new(desktop.clone());

        let code = DemulGenerator::new()
            .run_and_wait(&shell("sleep 0.5; exit 5"), &supervisor)
            .await
            .unwrap();

        assert_eq!(code, 5);
        assert_eq!(desktop.sent(), vec![FULLSCREEN_TOGGLE.to_string()]);
    }

    #[tokio::test]
    async fn test_other_windows_get_no_keys() {
        let desktop = RecordingDesktop::new(Some("Demul"));
        let supervisor = Supervisor::new(desktop.clone());

        let code = DemulGenerator::new()
            .run_and_wait(&shell("sleep 0.2; exit 3"), &supervisor)
            .await
            .unwrap();

        assert_eq!(code, 3);
        assert!(desktop.sent().is_empty());
    }

    #[tokio::test]
    async fn test_without_window_support_exit_code_passes_through() {
        let desktop = RecordingDesktop::new(None);
        let supervisor = Supervisor::new(desktop.clone());

        let code = DemulGenerator::new()
            .run_and_wait(&shell("sleep 0.2; exit 5"), &supervisor)
            .await
            .unwrap();
        assert_eq!(code, 5);
        assert!(desktop.sent().is_empty());

        let null = Supervisor::new(Arc::new(NullDesktop));
        let code = DemulGenerator::new()
            .run_and_wait(&shell("exit 6"), &null)
            .await
            .unwrap();
        assert_eq!(code, 6);
    }
}
