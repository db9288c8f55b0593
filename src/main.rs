use clap::Parser;
use emu_launcher::adapters::desktop_from_name;
use emu_launcher::core::process::Supervisor;
use emu_launcher::utils::{logger, validation::Validate};
use emu_launcher::{
    CliConfig, GeneratorRegistry, LaunchOptions, LaunchOutcome, Launcher, LauncherConfig,
    LauncherError,
};

fn report(e: &LauncherError) -> i32 {
    tracing::error!(
        "❌ Launch failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    e.exit_code()
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting emu-launcher");
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    if let Err(e) = cli.validate() {
        std::process::exit(report(&e));
    }

    let config = match LauncherConfig::from_file_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => std::process::exit(report(&e)),
    };
    if let Err(e) = config.validate() {
        std::process::exit(report(&e));
    }

    let monitor_enabled = cli.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let supervisor = Supervisor::new(desktop_from_name(config.desktop_backend()))
        .with_monitoring(monitor_enabled, config.monitor_interval());
    let options = LaunchOptions {
        dry_run: cli.dry_run,
        check_updates: config.check_updates(),
    };

    let mut launcher = Launcher::new(
        config,
        GeneratorRegistry::with_defaults(),
        supervisor,
        std::io::stdin().lock(),
        std::io::stdout(),
    )
    .with_options(options)
    .assume_yes(cli.yes);

    let code = match launcher.run(cli.request(), &cli.overrides_map()).await {
        Ok(LaunchOutcome::DryRun(spec)) => {
            println!("{}", spec.command_line());
            0
        }
        Ok(LaunchOutcome::Exited(code)) => {
            tracing::info!("✅ Emulator exited with code {}", code);
            code
        }
        Err(e) => report(&e),
    };

    std::process::exit(code);
}
