use crate::core::features::{bind_bool_feature, bind_feature};
use crate::core::json_settings::{JsonSection, JsonSettings};
use crate::core::process::Supervisor;
use crate::domain::model::{LaunchContext, LaunchRequest, LaunchSpec, SystemConfig};
use crate::domain::ports::Generator;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

const EXECUTABLE: &str = "Mesen.exe";

// 512 起為滑鼠按鍵
const ZAPPER_BUTTONS: [i64; 2] = [512, 513];
const SUPER_SCOPE_BUTTONS: [i64; 4] = [512, 513, 514, 6];

/// Mesen 2 (NES, FDS, SNES, Game Boy, PC Engine)
#[derive(Debug, Default)]
pub struct MesenGenerator;

impl MesenGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Name of the per-system section in `settings.json`.
    pub fn mesen_system(system: &str) -> Option<&'static str> {
        match system {
            "nes" | "fds" => Some("Nes"),
            "snes" => Some("Snes"),
            "gb" | "gbc" => Some("Gameboy"),
            "pcengine" => Some("PcEngine"),
            _ => None,
        }
    }

    fn setup_json_configuration(
        &self,
        path: &Path,
        request: &LaunchRequest,
        context: &LaunchContext,
    ) -> Result<()> {
        let mut settings = JsonSettings::load_or_create(path.join("settings.json"))?;

        let Some(mesen_system) = Self::mesen_system(&request.system) else {
            tracing::debug!("System '{}' has no Mesen settings section", request.system);
            return Ok(());
        };
        let features = &context.features;
        let system = request.system.as_str();

        let mut root = settings.root();
        root.set("FirstRun", "false");

        {
            let mut section = root.get_or_create_container(mesen_system);
            configure_nes(&mut section, features, system);
            configure_pc_engine(&mut section, features, system);
            configure_snes(&mut section, features, system);
            setup_guns(&mut section, features, mesen_system);
        }

        {
            let mut preference = root.get_or_create_container("Preferences");
            configure_preferences(&mut preference, request, context);
        }

        {
            let mut video = root.get_or_create_container("Video");
            bind_feature(&mut video, features, "VideoFilter", "mesen_filter", "None");
            bind_feature(&mut video, features, "AspectRatio", "mesen_ratio", "Auto");
            bind_bool_feature(&mut video, features, "UseBilinearInterpolation", "bilinear_filtering", "true", "false");
            bind_bool_feature(&mut video, features, "VerticalSync", "mesen_vsync", "false", "true");
            bind_feature(&mut video, features, "ScanlineIntensity", "mesen_scanlines", "0");
            bind_bool_feature(&mut video, features, "FullscreenForceIntegerScale", "integerscale", "true", "false");
        }

        {
            let mut emulation = root.get_or_create_container("Emulation");
            bind_feature(&mut emulation, features, "RunAheadFrames", "mesen_runahead", "0");
        }

        {
            let mut input = root.get_or_create_container("Input");
            bind_bool_feature(&mut input, features, "HidePointerForLightGuns", "mesen_target", "false", "true");
        }

        settings.save()
    }
}

fn configure_nes(section: &mut JsonSection<'_>, features: &SystemConfig, system: &str) {
    if system != "nes" && system != "fds" {
        return;
    }

    bind_bool_feature(section, features, "EnableHdPacks", "mesen_customtextures", "true", "false");
    bind_feature(section, features, "Region", "mesen_region", "Auto");
    bind_bool_feature(section, features, "RemoveSpriteLimit", "mesen_spritelimit", "true", "false");

    if system == "fds" {
        bind_bool_feature(section, features, "FdsAutoInsertDisk", "mesen_fdsautoinsertdisk", "true", "false");
        bind_bool_feature(section, features, "FdsFastForwardOnLoad", "mesen_fdsfastforwardload", "true", "false");
        section.set("FdsAutoLoadDisk", "true");
    }
}

fn configure_pc_engine(section: &mut JsonSection<'_>, features: &SystemConfig, system: &str) {
    if system != "pcengine" {
        return;
    }

    bind_bool_feature(section, features, "RemoveSpriteLimit", "mesen_spritelimit", "true", "false");
}

fn configure_snes(section: &mut JsonSection<'_>, features: &SystemConfig, system: &str) {
    if system != "snes" {
        return;
    }

    bind_feature(section, features, "Region", "mesen_region", "Auto");
}

/// Light guns are plugged on the port named by the option (`Port1`, `Port2`...).
fn setup_guns(section: &mut JsonSection<'_>, features: &SystemConfig, mesen_system: &str) {
    let (option, gun_type, buttons_key, buttons) = match mesen_system {
        "Nes" => ("mesen_zapper", "Zapper", "ZapperButtons", &ZAPPER_BUTTONS[..]),
        "Snes" => (
            "mesen_superscope",
            "SuperScope",
            "SuperScopeButtons",
            &SUPER_SCOPE_BUTTONS[..],
        ),
        _ => return,
    };

    let port = features.get(option);
    if !features.is_opt_set(option) || port == "none" {
        return;
    }

    let mut port_section = section.get_or_create_container(port);
    port_section
        .get_or_create_container("Mapping1")
        .set_array(buttons_key, buttons);
    port_section.set("Type", gun_type);
}

fn configure_preferences(preference: &mut JsonSection<'_>, request: &LaunchRequest, context: &LaunchContext) {
    let features = &context.features;

    for (key, value) in [
        ("AutomaticallyCheckForUpdates", "false"),
        ("SingleInstance", "true"),
        ("AutoLoadPatches", "true"),
        ("PauseWhenInBackground", "true"),
        ("PauseWhenInMenusAndConfig", "true"),
        ("AllowBackgroundInput", "true"),
        ("ConfirmExitResetPower", "false"),
        ("AssociateSnesRomFiles", "false"),
        ("AssociateSnesMusicFiles", "false"),
        ("AssociateNesRomFiles", "false"),
        ("AssociateNesMusicFiles", "false"),
        ("AssociateGbRomFiles", "false"),
        ("AssociateGbMusicFiles", "false"),
        ("AssociatePceRomFiles", "false"),
        ("AssociatePceMusicFiles", "false"),
    ] {
        preference.set(key, value);
    }

    if features.is_opt_set("mesen_autosave") && features.get("mesen_autosave") != "false" {
        preference.set("EnableAutoSaveState", "true");
        preference.set("AutoSaveStateDelay", features.get("mesen_autosave"));
    } else {
        preference.set("EnableAutoSaveState", "false");
    }

    bind_bool_feature(preference, features, "EnableRewind", "rewind", "true", "false");
    bind_bool_feature(preference, features, "DisableOsd", "mesen_osd", "false", "true");
    bind_bool_feature(preference, features, "ShowGameTimer", "mesen_timecounter", "true", "false");
    bind_bool_feature(preference, features, "ShowFps", "mesen_fps", "true", "false");

    if let Some(games) = request.rom.parent().filter(|p| p.is_dir()) {
        preference.set("OverrideGameFolder", "true");
        preference.set("GameFolder", &games.display().to_string());
    }

    let paths = &context.paths;
    let system = request.system.as_str();
    let folders: [(&str, &str, Option<PathBuf>); 4] = [
        (
            "OverrideAviFolder",
            "AviFolder",
            paths.full_path("records").map(|p| p.join("output").join("mesen")),
        ),
        (
            "OverrideSaveDataFolder",
            "SaveDataFolder",
            paths.full_path("saves").map(|p| p.join(system).join("mesen")),
        ),
        (
            "OverrideSaveStateFolder",
            "SaveStateFolder",
            paths
                .full_path("saves")
                .map(|p| p.join(system).join("mesen").join("SaveStates")),
        ),
        (
            "OverrideScreenshotFolder",
            "ScreenshotFolder",
            paths.full_path("screenshots").map(|p| p.join("mesen")),
        ),
    ];

    for (override_key, folder_key, folder) in folders {
        let Some(folder) = folder else { continue };
        if ensure_folder(&folder) {
            preference.set(override_key, "true");
            preference.set(folder_key, &folder.display().to_string());
        }
    }
}

/// 盡力建立資料夾，回傳資料夾是否存在
fn ensure_folder(folder: &Path) -> bool {
    if !folder.is_dir() {
        if let Err(e) = fs::create_dir_all(folder) {
            tracing::warn!("Could not create {}: {}", folder.display(), e);
        }
    }
    folder.is_dir()
}

#[async_trait]
impl Generator for MesenGenerator {
    fn generate(
        &mut self,
        request: &LaunchRequest,
        context: &LaunchContext,
    ) -> Result<Option<LaunchSpec>> {
        let Some(path) = context.paths.full_path("mesen") else {
            return Ok(None);
        };

        let exe = path.join(EXECUTABLE);
        if !exe.is_file() {
            tracing::debug!("{} not found", exe.display());
            return Ok(None);
        }

        self.setup_json_configuration(&path, request, context)?;

        Ok(Some(LaunchSpec {
            program: exe,
            working_dir: Some(path),
            args: vec![request.rom.display().to_string(), "--fullscreen".to_string()],
        }))
    }

    async fn run_and_wait(&mut self, spec: &LaunchSpec, supervisor: &Supervisor) -> Result<i32> {
        let code = supervisor.run_and_wait(spec).await?;

        // Mesen 正常關閉時回傳 1
        if code == 1 {
            return Ok(0);
        }
        Ok(code)
    }
}
