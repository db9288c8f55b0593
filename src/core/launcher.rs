use crate::app::prompt::{InstallerPrompt, PromptResult};
use crate::config::toml_config::LauncherConfig;
use crate::core::installer::{Installer, PackageManager};
use crate::core::process::Supervisor;
use crate::core::registry::GeneratorRegistry;
use crate::domain::model::{LaunchContext, LaunchRequest, LaunchSpec};
use crate::domain::ports::Generator;
use crate::utils::error::{LauncherError, Result};
use crate::utils::validation;
use std::collections::HashMap;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchOptions {
    /// Stop after writing the emulator configuration.
    pub dry_run: bool,
    /// Offer package updates before launching.
    pub check_updates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Exited(i32),
    DryRun(LaunchSpec),
}

impl LaunchOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchOutcome::Exited(code) => *code,
            LaunchOutcome::DryRun(_) => 0,
        }
    }
}

/// 啟動流程：選擇 generator、寫入模擬器設定、必要時安裝、啟動並等待結束
pub struct Launcher<R: BufRead, W: Write> {
    config: LauncherConfig,
    registry: GeneratorRegistry,
    supervisor: Supervisor,
    packages: PackageManager,
    prompt: InstallerPrompt<R, W>,
    options: LaunchOptions,
}

impl<R: BufRead, W: Write> Launcher<R, W> {
    pub fn new(
        config: LauncherConfig,
        registry: GeneratorRegistry,
        supervisor: Supervisor,
        input: R,
        output: W,
    ) -> Self {
        let packages = PackageManager::new(config.updates_url().map(str::to_string));
        let prompt = InstallerPrompt::new(input, output, packages.clone());

        Self {
            config,
            registry,
            supervisor,
            packages,
            prompt,
            options: LaunchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LaunchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.prompt = self.prompt.assume_yes(yes);
        self
    }

    /// Fills emulator and core from the system defaults when the request has none.
    pub fn resolve_request(&self, mut request: LaunchRequest) -> Result<LaunchRequest> {
        if request.emulator.is_empty() {
            let emulator = self.config.default_emulator(&request.system);
            request.emulator = validation::validate_required_field(
                &format!("systems.{}.emulator", request.system),
                &emulator,
            )?
            .to_string();
        }
        if request.core.is_empty() {
            if let Some(core) = self.config.default_core(&request.system) {
                request.core = core.to_string();
            }
        }
        Ok(request)
    }

    pub fn context(&self, request: &LaunchRequest, overrides: &HashMap<String, String>) -> LaunchContext {
        LaunchContext {
            paths: self.config.app_paths(),
            features: self.config.system_config(&request.system, overrides),
        }
    }

    fn installer_for(&self, emulator: &str) -> Option<Installer> {
        let family = emulator.split('-').next().unwrap_or(emulator);
        self.config
            .installer(emulator)
            .or_else(|| self.config.installer(family))
    }

    async fn refresh_installer(&self, installer: &mut Installer) {
        let refreshed = self.packages.refresh(std::slice::from_mut(installer)).await;
        if let Err(e) = refreshed {
            tracing::warn!("Could not check versions for {}: {}", installer.name(), e);
        }
    }

    async fn offer_update(&mut self, emulator: &str) -> Result<()> {
        let Some(mut installer) = self.installer_for(emulator) else {
            return Ok(());
        };
        if !installer.is_installed() {
            return Ok(());
        }

        self.refresh_installer(&mut installer).await;
        if installer.has_update() {
            self.prompt.offer_installer(&installer).await?;
        }
        Ok(())
    }

    /// Writes the emulator configuration and returns the generator with its
    /// launch parameters, installing the emulator first when it is missing.
    pub async fn prepare(
        &mut self,
        request: LaunchRequest,
        overrides: &HashMap<String, String>,
    ) -> Result<(Box<dyn Generator>, LaunchSpec)> {
        let request = self.resolve_request(request)?;
        let mut generator = self.registry.create(&request.emulator)?;
        let context = self.context(&request, overrides);

        tracing::info!(
            "🎮 system={} emulator={} core={} rom={}",
            request.system,
            request.emulator,
            request.core,
            request.rom.display()
        );
        tracing::debug!("{} options set", context.features.len());

        if self.options.check_updates {
            if let Err(e) = self.offer_update(&request.emulator).await {
                tracing::warn!("Update of {} failed: {}", request.emulator, e);
            }
        }

        if let Some(spec) = generator.generate(&request, &context)? {
            return Ok((generator, spec));
        }

        let not_found = || LauncherError::ExecutableNotFound {
            emulator: request.emulator.clone(),
        };

        let Some(mut installer) = self.installer_for(&request.emulator) else {
            return Err(not_found());
        };
        self.refresh_installer(&mut installer).await;

        match self.prompt.offer_missing(&installer).await? {
            PromptResult::Cancel => Err(LauncherError::InstallCancelled {
                name: installer.name().to_string(),
            }),
            PromptResult::Ok => {
                let spec = generator.generate(&request, &context)?.ok_or_else(not_found)?;
                Ok((generator, spec))
            }
        }
    }

    pub async fn run(
        &mut self,
        request: LaunchRequest,
        overrides: &HashMap<String, String>,
    ) -> Result<LaunchOutcome> {
        let (mut generator, spec) = self.prepare(request, overrides).await?;

        if self.options.dry_run {
            tracing::info!("🔍 DRY RUN - {}", spec.command_line());
            return Ok(LaunchOutcome::DryRun(spec));
        }

        let code = generator.run_and_wait(&spec, &self.supervisor).await?;
        Ok(LaunchOutcome::Exited(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::NullDesktop;
    use std::io::Cursor;
    use std::sync::Arc;

    fn launcher(toml: &str) -> Launcher<Cursor<Vec<u8>>, Vec<u8>> {
        let config = LauncherConfig::from_toml_str(toml).unwrap();
        Launcher::new(
            config,
            GeneratorRegistry::with_defaults(),
            Supervisor::new(Arc::new(NullDesktop)),
            Cursor::new(Vec::new()),
            Vec::new(),
        )
    }

    #[test]
    fn test_resolve_request_uses_system_defaults() {
        let launcher = launcher(
            r#"
[systems.naomi]
emulator = "demul"
core = "naomi"
"#,
        );

        let request = launcher
            .resolve_request(LaunchRequest::new("naomi", "", "", "/roms/a.zip"))
            .unwrap();
        assert_eq!(request.emulator, "demul");
        assert_eq!(request.core, "naomi");

        let explicit = launcher
            .resolve_request(LaunchRequest::new("naomi", "demul-old", "hikaru", "/roms/a.zip"))
            .unwrap();
        assert_eq!(explicit.emulator, "demul-old");
        assert_eq!(explicit.core, "hikaru");

        assert!(matches!(
            launcher.resolve_request(LaunchRequest::new("snes", "", "", "/roms/a.sfc")),
            Err(LauncherError::MissingConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_emulator_without_installer() {
        let mut launcher = launcher("");
        let result = launcher
            .run(LaunchRequest::new("nes", "mesen", "", "/roms/smb.nes"), &HashMap::new())
            .await;

        assert!(matches!(
            result,
            Err(LauncherError::ExecutableNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_emulator() {
        let mut launcher = launcher("");
        let result = launcher
            .run(LaunchRequest::new("ps2", "pcsx2", "", "/roms/a.iso"), &HashMap::new())
            .await;

        assert!(matches!(result, Err(LauncherError::UnknownEmulator { .. })));
    }
}
