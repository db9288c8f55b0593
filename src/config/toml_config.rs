use crate::adapters::desktop::DESKTOP_BACKENDS;
use crate::core::installer::Installer;
use crate::domain::model::{AppPaths, SystemConfig};
use crate::utils::error::{LauncherError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default)]
    pub launcher: LauncherSection,
    /// 邏輯資料夾 (bios, saves, records, screenshots, 模擬器資料夾...)
    #[serde(default)]
    pub paths: HashMap<String, String>,
    /// 全域選項
    #[serde(default)]
    pub features: HashMap<String, toml::Value>,
    #[serde(default)]
    pub systems: HashMap<String, SystemSection>,
    #[serde(default)]
    pub installers: HashMap<String, InstallerSection>,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LauncherSection {
    pub emulators_dir: Option<String>,
    pub desktop: Option<String>,
    pub check_updates: Option<bool>,
    pub monitor: Option<bool>,
    pub monitor_interval_secs: Option<u64>,
    pub updates_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemSection {
    pub emulator: Option<String>,
    pub core: Option<String>,
    pub features: Option<HashMap<String, toml::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerSection {
    pub url: String,
    /// 預設為套件名稱
    pub folder: Option<String>,
}

/// TOML 選項值一律轉成字串
fn feature_layer(values: &HashMap<String, toml::Value>) -> HashMap<String, String> {
    values
        .iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

impl LauncherConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(LauncherError::IoError)?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// 檔案不存在時使用空白配置 (以目前目錄為基準)
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }
        tracing::warn!(
            "Configuration file {} not found, using defaults",
            path.display()
        );
        Ok(Self {
            base_dir: std::env::current_dir()?,
            ..Self::default()
        })
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| LauncherError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RETROBAT_ROOT})
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        for (name, path) in &self.paths {
            validation::validate_path(&format!("paths.{}", name), path)?;
        }

        if let Some(dir) = &self.launcher.emulators_dir {
            validation::validate_path("launcher.emulators_dir", dir)?;
        }

        if let Some(desktop) = &self.launcher.desktop {
            validation::validate_one_of("launcher.desktop", desktop, &DESKTOP_BACKENDS)?;
        }

        if let Some(interval) = self.launcher.monitor_interval_secs {
            validation::validate_positive_number("launcher.monitor_interval_secs", interval, 1)?;
        }

        if let Some(url) = &self.launcher.updates_url {
            validation::validate_url("launcher.updates_url", url)?;
        }

        for (name, installer) in &self.installers {
            validation::validate_url(&format!("installers.{}.url", name), &installer.url)?;
            if let Some(folder) = &installer.folder {
                validation::validate_path(&format!("installers.{}.folder", name), folder)?;
            }
        }

        for (name, system) in &self.systems {
            if let Some(emulator) = &system.emulator {
                validation::validate_non_empty_string(
                    &format!("systems.{}.emulator", name),
                    emulator,
                )?;
            }
        }

        Ok(())
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn app_paths(&self) -> AppPaths {
        let entries = self
            .paths
            .iter()
            .map(|(key, path)| (key.clone(), self.resolve(path)))
            .collect();
        let emulators_dir = self.launcher.emulators_dir.as_deref().map(|d| self.resolve(d));
        AppPaths::new(entries, emulators_dir)
    }

    /// 全域 < 系統 < 命令列
    pub fn system_config(&self, system: &str, overrides: &HashMap<String, String>) -> SystemConfig {
        let global = feature_layer(&self.features);
        let per_system = self
            .systems
            .get(system)
            .and_then(|s| s.features.as_ref())
            .map(feature_layer)
            .unwrap_or_default();

        SystemConfig::from_layers([&global, &per_system, overrides])
    }

    pub fn default_emulator(&self, system: &str) -> Option<&str> {
        self.systems.get(system)?.emulator.as_deref()
    }

    pub fn default_core(&self, system: &str) -> Option<&str> {
        self.systems.get(system)?.core.as_deref()
    }

    pub fn installer(&self, name: &str) -> Option<Installer> {
        let section = self.installers.get(name)?;
        let folder = section.folder.as_deref().unwrap_or(name);
        let install_folder = match self.app_paths().full_path(folder) {
            Some(path) => path,
            None => self.resolve(folder),
        };
        Some(Installer::new(name, &section.url, install_folder))
    }

    pub fn installers(&self) -> Vec<Installer> {
        let mut names: Vec<&String> = self.installers.keys().collect();
        names.sort();
        names.into_iter().filter_map(|n| self.installer(n)).collect()
    }

    pub fn desktop_backend(&self) -> &str {
        self.launcher.desktop.as_deref().unwrap_or("none")
    }

    pub fn check_updates(&self) -> bool {
        self.launcher.check_updates.unwrap_or(false)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.launcher.monitor.unwrap_or(false)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.launcher.monitor_interval_secs.unwrap_or(5))
    }

    pub fn updates_url(&self) -> Option<&str> {
        self.launcher.updates_url.as_deref()
    }
}

impl Validate for LauncherConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
