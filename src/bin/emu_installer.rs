use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use emu_launcher::app::prompt::{InstallerPrompt, PromptResult};
use emu_launcher::core::installer::PackageManager;
use emu_launcher::utils::{logger, validation::Validate};
use emu_launcher::LauncherConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "emu-installer")]
#[command(about = "Install and update emulator packages")]
struct Args {
    /// Path to the launcher TOML configuration
    #[arg(short, long, default_value = "emulatorlauncher.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    verbose: bool,

    /// Answer yes to every prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install (or update) a package from the [installers] section
    Install { name: String },
    /// Install a core from an explicit package URL
    InstallCore {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        folder: PathBuf,
    },
    /// Update every installed package with a newer version on the server
    UpdateAll,
    /// List configured packages with their installed and server versions
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = LauncherConfig::from_file_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.validate().context("invalid launcher configuration")?;

    let packages = PackageManager::new(config.updates_url().map(str::to_string));
    let stdin = std::io::stdin();
    let mut prompt = InstallerPrompt::new(stdin.lock(), std::io::stdout(), packages.clone())
        .assume_yes(args.yes);

    match args.command {
        Command::Install { name } => {
            let Some(mut installer) = config.installer(&name) else {
                bail!("no installer configured for '{}'", name);
            };
            if let Err(e) = packages.refresh(std::slice::from_mut(&mut installer)).await {
                tracing::warn!("Could not check versions: {}", e);
            }

            if installer.is_installed() && !installer.has_update() {
                println!("✅ {} is up to date", installer.name());
                return Ok(());
            }
            if prompt.offer_installer(&installer).await? == PromptResult::Cancel {
                println!("Installation of {} cancelled", installer.name());
            }
        }
        Command::InstallCore { name, url, folder } => {
            let folder = config.resolve(&folder.to_string_lossy());
            if prompt.offer_core(&name, &url, &folder).await? == PromptResult::Cancel {
                println!("Installation of {} cancelled", name);
            }
        }
        Command::UpdateAll => {
            let mut installers = config.installers();
            let updated = prompt.update_all(&mut installers).await?;
            for name in updated {
                println!("✅ {} updated", name);
            }
        }
        Command::Status => {
            let mut installers = config.installers();
            if let Err(e) = packages.refresh(&mut installers).await {
                tracing::warn!("Could not check versions: {}", e);
            }

            for installer in &installers {
                let installed = if installer.is_installed() {
                    installer
                        .installed_version()
                        .unwrap_or_else(|| "unknown".to_string())
                } else {
                    "not installed".to_string()
                };
                let marker = if installer.has_update() { " (update available)" } else { "" };
                println!(
                    "{:<16} {:<16} server: {}{}",
                    installer.name(),
                    installed,
                    installer.server_version().unwrap_or("-"),
                    marker
                );
            }
        }
    }

    Ok(())
}
