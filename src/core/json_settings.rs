use crate::utils::error::{LauncherError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// 模擬器的 JSON 設定檔 (例如 Mesen 的 settings.json)
#[derive(Debug, Clone)]
pub struct JsonSettings {
    path: PathBuf,
    root: Value,
}

/// A mutable view on one JSON object inside a settings document.
pub struct JsonSection<'a> {
    map: &'a mut Map<String, Value>,
}

/// Converts a raw option string into the JSON type the emulator expects.
pub fn typed_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if raw.contains('.') {
        if let Ok(float) = raw.parse::<f64>() {
            if let Some(number) = serde_json::Number::from_f64(float) {
                return Value::Number(number);
            }
        }
    }
    Value::String(raw.to_string())
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

impl JsonSettings {
    /// 載入設定檔，不存在時先寫入 `{}`
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&path, "{}")?;
        }

        let content = fs::read_to_string(&path)?;
        let content = content.trim_start_matches('\u{feff}');
        let root: Value = if content.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(content)?
        };

        if !root.is_object() {
            return Err(LauncherError::ConfigError {
                message: format!("{} does not contain a JSON object", path.display()),
            });
        }

        Ok(Self { path, root })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&mut self) -> JsonSection<'_> {
        JsonSection {
            map: ensure_object(&mut self.root),
        }
    }

    pub fn value(&self) -> &Value {
        &self.root
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.root)?;
        fs::write(&self.path, content)?;
        tracing::debug!("Saved {}", self.path.display());
        Ok(())
    }
}

impl<'a> JsonSection<'a> {
    /// Nested object under `key`, created (or replaced when not an object).
    pub fn get_or_create_container(&mut self, key: &str) -> JsonSection<'_> {
        let entry = self
            .map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        JsonSection {
            map: ensure_object(entry),
        }
    }

    pub fn set(&mut self, key: &str, raw: &str) {
        self.map.insert(key.to_string(), typed_value(raw));
    }

    pub fn set_array(&mut self, key: &str, values: &[i64]) {
        let array = values.iter().copied().map(Value::from).collect();
        self.map.insert(key.to_string(), Value::Array(array));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }
}
