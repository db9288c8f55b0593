use crate::domain::model::LaunchRequest;
use crate::utils::error::{LauncherError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "emu-launcher")]
#[command(about = "Configure and launch a standalone emulator for a game")]
pub struct CliConfig {
    /// Game system, e.g. nes, snes, naomi
    #[arg(long)]
    pub system: String,

    /// Emulator name; defaults to the one configured for the system
    #[arg(long, default_value = "")]
    pub emulator: String,

    #[arg(long, default_value = "")]
    pub core: String,

    #[arg(long)]
    pub rom: PathBuf,

    /// Path to the launcher TOML configuration
    #[arg(short, long, default_value = "emulatorlauncher.toml")]
    pub config: PathBuf,

    /// Option override, e.g. --set mesen_region=Pal
    #[arg(long = "set", value_parser = parse_key_value)]
    pub overrides: Vec<(String, String)>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub log_json: bool,

    #[arg(long, help = "Log emulator CPU and memory usage")]
    pub monitor: bool,

    /// Write the emulator configuration and print the command without launching
    #[arg(long)]
    pub dry_run: bool,

    /// Answer yes to installation prompts
    #[arg(short = 'y', long)]
    pub yes: bool,
}

pub fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

impl CliConfig {
    pub fn request(&self) -> LaunchRequest {
        LaunchRequest::new(&self.system, &self.emulator, &self.core, self.rom.clone())
    }

    pub fn overrides_map(&self) -> HashMap<String, String> {
        self.overrides.iter().cloned().collect()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("system", &self.system)?;
        validation::validate_path("rom", &self.rom.to_string_lossy())?;
        if !self.rom.exists() {
            return Err(LauncherError::InvalidConfigValueError {
                field: "rom".to_string(),
                value: self.rom.display().to_string(),
                reason: "ROM file does not exist".to_string(),
            });
        }
        Ok(())
    }
}
