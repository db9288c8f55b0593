use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 一次啟動請求：哪個系統、哪個模擬器 (可空)、哪個核心 (可空)、哪個 ROM
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    pub system: String,
    pub emulator: String,
    pub core: String,
    pub rom: PathBuf,
}

impl LaunchRequest {
    pub fn new(system: &str, emulator: &str, core: &str, rom: impl Into<PathBuf>) -> Self {
        Self {
            system: system.to_string(),
            emulator: emulator.to_string(),
            core: core.to_string(),
            rom: rom.into(),
        }
    }
}

/// 啟動模擬器所需的全部資訊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub working_dir: Option<PathBuf>,
    pub args: Vec<String>,
}

impl LaunchSpec {
    /// Human readable command line, used for logs and dry runs.
    pub fn command_line(&self) -> String {
        let mut parts = vec![quote(&self.program.to_string_lossy())];
        parts.extend(self.args.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

fn quote(value: &str) -> String {
    if value.contains(' ') {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

/// 使用者選擇的選項 (features)，鍵值皆為字串
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemConfig {
    values: HashMap<String, String>,
}

impl SystemConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later layers override earlier ones.
    pub fn from_layers<'a, I>(layers: I) -> Self
    where
        I: IntoIterator<Item = &'a HashMap<String, String>>,
    {
        let mut config = Self::new();
        for layer in layers {
            config.merge(layer);
        }
        config
    }

    pub fn merge(&mut self, layer: &HashMap<String, String>) {
        for (key, value) in layer {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn is_opt_set(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Empty string when the option is not set.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn get_bool(&self, key: &str) -> bool {
        matches!(
            self.get(key).trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "on" | "yes" | "enabled"
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 邏輯資料夾名稱 -> 絕對路徑
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppPaths {
    entries: HashMap<String, PathBuf>,
    emulators_dir: Option<PathBuf>,
}

impl AppPaths {
    pub fn new(entries: HashMap<String, PathBuf>, emulators_dir: Option<PathBuf>) -> Self {
        Self {
            entries,
            emulators_dir,
        }
    }

    pub fn full_path(&self, key: &str) -> Option<PathBuf> {
        if let Some(path) = self.entries.get(key) {
            return Some(path.clone());
        }
        self.emulators_dir.as_ref().map(|dir| dir.join(key))
    }

    pub fn emulators_dir(&self) -> Option<&Path> {
        self.emulators_dir.as_deref()
    }
}

/// Everything a generator may read while building its launch parameters.
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    pub paths: AppPaths,
    pub features: SystemConfig,
}

/// 下載 / 安裝進度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub package: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_config_layers() {
        let mut global = HashMap::new();
        global.insert("VSync".to_string(), "true".to_string());
        global.insert("mesen_region".to_string(), "Auto".to_string());

        let mut system = HashMap::new();
        system.insert("mesen_region".to_string(), "Pal".to_string());
        system.insert("rewind".to_string(), String::new());

        let config = SystemConfig::from_layers([&global, &system]);

        assert_eq!(config.get("mesen_region"), "Pal");
        assert!(config.get_bool("VSync"));
        assert!(!config.is_opt_set("rewind"));
        assert_eq!(config.get("missing"), "");
        assert!(!config.get_bool("missing"));
    }

    #[test]
    fn test_app_paths_fallback_to_emulators_dir() {
        let mut entries = HashMap::new();
        entries.insert("bios".to_string(), PathBuf::from("/rb/bios"));
        let paths = AppPaths::new(entries, Some(PathBuf::from("/rb/emulators")));

        assert_eq!(paths.full_path("bios"), Some(PathBuf::from("/rb/bios")));
        assert_eq!(
            paths.full_path("mesen"),
            Some(PathBuf::from("/rb/emulators/mesen"))
        );

        let empty = AppPaths::default();
        assert_eq!(empty.full_path("mesen"), None);
    }

    #[test]
    fn test_command_line_quotes_spaces() {
        let spec = LaunchSpec {
            program: PathBuf::from("/emu/Mesen.exe"),
            working_dir: None,
            args: vec!["/roms/Super Mario.nes".to_string(), "--fullscreen".to_string()],
        };
        assert_eq!(
            spec.command_line(),
            "/emu/Mesen.exe \"/roms/Super Mario.nes\" --fullscreen"
        );
    }
}
