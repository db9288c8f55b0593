use crate::core::ini::IniFile;
use crate::core::json_settings::JsonSection;
use crate::domain::model::SystemConfig;

/// 把使用者選項對應到模擬器設定值
pub trait FeatureBinder {
    fn write_setting(&mut self, key: &str, value: &str);
}

impl FeatureBinder for JsonSection<'_> {
    fn write_setting(&mut self, key: &str, value: &str) {
        self.set(key, value);
    }
}

/// An INI section used as a binding target.
pub struct IniSection<'a> {
    pub ini: &'a mut IniFile,
    pub section: &'a str,
}

impl FeatureBinder for IniSection<'_> {
    fn write_setting(&mut self, key: &str, value: &str) {
        self.ini.write_value(self.section, key, value);
    }
}

/// Writes the option's value when it is set, `default` otherwise.
pub fn bind_feature<B: FeatureBinder + ?Sized>(
    target: &mut B,
    features: &SystemConfig,
    key: &str,
    option: &str,
    default: &str,
) {
    if features.is_opt_set(option) {
        target.write_setting(key, features.get(option));
    } else {
        target.write_setting(key, default);
    }
}

/// Writes the option's value only when it is set; the current setting stays otherwise.
pub fn bind_opt_feature<B: FeatureBinder + ?Sized>(
    target: &mut B,
    features: &SystemConfig,
    key: &str,
    option: &str,
) {
    if features.is_opt_set(option) {
        target.write_setting(key, features.get(option));
    }
}

/// Writes `true_value` when the option is set and truthy, `false_value` otherwise.
pub fn bind_bool_feature<B: FeatureBinder + ?Sized>(
    target: &mut B,
    features: &SystemConfig,
    key: &str,
    option: &str,
    true_value: &str,
    false_value: &str,
) {
    if features.is_opt_set(option) && features.get_bool(option) {
        target.write_setting(key, true_value);
    } else {
        target.write_setting(key, false_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        values: HashMap<String, String>,
    }

    impl FeatureBinder for Recorder {
        fn write_setting(&mut self, key: &str, value: &str) {
            self.values.insert(key.to_string(), value.to_string());
        }
    }

    #[test]
    fn test_bind_feature_uses_default_when_unset() {
        let mut features = SystemConfig::new();
        features.set("mesen_filter", "NtscBisqwit");

        let mut target = Recorder::default();
        bind_feature(&mut target, &features, "VideoFilter", "mesen_filter", "None");
        bind_feature(&mut target, &features, "AspectRatio", "mesen_ratio", "Auto");

        assert_eq!(target.values["VideoFilter"], "NtscBisqwit");
        assert_eq!(target.values["AspectRatio"], "Auto");
    }

    #[test]
    fn test_bind_bool_feature_inverted_values() {
        let mut features = SystemConfig::new();
        features.set("mesen_osd", "1");
        features.set("rewind", "false");

        let mut target = Recorder::default();
        bind_bool_feature(&mut target, &features, "DisableOsd", "mesen_osd", "false", "true");
        bind_bool_feature(&mut target, &features, "EnableRewind", "rewind", "true", "false");
        bind_bool_feature(&mut target, &features, "ShowFps", "mesen_fps", "true", "false");

        assert_eq!(target.values["DisableOsd"], "false");
        assert_eq!(target.values["EnableRewind"], "false");
        assert_eq!(target.values["ShowFps"], "false");
    }

    #[test]
    fn test_bind_opt_feature_keeps_unset_values() {
        let mut features = SystemConfig::new();
        features.set("demul_ratio", "0");
        features.set("demul_scaling", "");

        let mut target = Recorder::default();
        bind_opt_feature(&mut target, &features, "aspect", "demul_ratio");
        bind_opt_feature(&mut target, &features, "scaling", "demul_scaling");

        assert_eq!(target.values["aspect"], "0");
        assert!(!target.values.contains_key("scaling"));
    }

    #[test]
    fn test_bind_into_ini_section() {
        let mut ini = IniFile::load(PathBuf::from("/nonexistent/dir/gpu.ini")).unwrap();
        let mut features = SystemConfig::new();
        features.set("smooth", "true");

        let mut section = IniSection {
            ini: &mut ini,
            section: "main",
        };
        bind_bool_feature(&mut section, &features, "Smooth", "smooth", "1", "0");

        assert_eq!(ini.get_value("main", "Smooth"), Some("1"));
    }
}
