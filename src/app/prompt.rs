use crate::core::installer::{Installer, PackageManager};
use crate::domain::model::ProgressEvent;
use crate::utils::error::Result;
use std::io::{BufRead, Write};
use std::path::Path;

/// Outcome of an installation prompt. `Ok` lets the launch go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResult {
    Ok,
    Cancel,
}

pub fn emulator_not_installed(name: &str) -> String {
    format!("{} is not installed. Do you want to download and install it?", name)
}

pub fn update_available(name: &str, server_version: &str, installed_version: &str) -> String {
    format!(
        "An update is available for {}: version {} (installed: {}). Do you want to install it?",
        name, server_version, installed_version
    )
}

pub fn core_not_installed(name: &str) -> String {
    format!("Core {} is not installed. Do you want to download and install it?", name)
}

/// 終端機版的安裝對話框
pub struct InstallerPrompt<R: BufRead, W: Write> {
    input: R,
    output: W,
    packages: PackageManager,
    assume_yes: bool,
}

/// Prints download progress, one line per package.
struct ProgressPrinter<'a, W: Write> {
    output: &'a mut W,
    current: Option<String>,
}

impl<W: Write> ProgressPrinter<'_, W> {
    fn on_progress(&mut self, event: ProgressEvent) {
        if event.package.is_some() && event.package != self.current {
            if self.current.is_some() {
                let _ = writeln!(self.output);
            }
            self.current = event.package.clone();
            if let Some(name) = &event.package {
                let _ = writeln!(self.output, "Updating {}...", name);
            }
        }

        if event.percent == 100 {
            let _ = writeln!(self.output, "\r100% Installing...");
        } else {
            let _ = write!(self.output, "\r{:>3}%", event.percent);
        }
        let _ = self.output.flush();
    }
}

impl<R: BufRead, W: Write> InstallerPrompt<R, W> {
    pub fn new(input: R, output: W, packages: PackageManager) -> Self {
        Self {
            input,
            output,
            packages,
            assume_yes: false,
        }
    }

    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Enter 代表預設的「是」
    fn ask(&mut self, message: &str) -> Result<bool> {
        write!(self.output, "{} [Y/n] ", message)?;
        if self.assume_yes {
            writeln!(self.output, "y")?;
            return Ok(true);
        }
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            writeln!(self.output)?;
            return Ok(false);
        }

        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "" | "y" | "yes"
        ))
    }

    async fn download(&mut self, url: &str, folder: &Path, installer: Option<&Installer>) -> Result<()> {
        let name = url
            .rsplit('/')
            .next()
            .map(|file| file.split('.').next().unwrap_or(file))
            .unwrap_or(url);
        writeln!(self.output, "Downloading {}...", name)?;

        let Self {
            output, packages, ..
        } = self;
        let mut printer = ProgressPrinter {
            output,
            current: None,
        };

        match installer {
            Some(installer) => {
                packages
                    .install(installer, |event| printer.on_progress(event))
                    .await
            }
            None => {
                packages
                    .download_and_install(url, folder, None, None, |event| printer.on_progress(event))
                    .await
            }
        }
    }

    /// Emulator missing or outdated.
    pub async fn offer_installer(&mut self, installer: &Installer) -> Result<PromptResult> {
        if !installer.has_update() {
            return self.offer_missing(installer).await;
        }

        let message = update_available(
            installer.default_folder_name(),
            installer.server_version().unwrap_or_default(),
            &installer.installed_version().unwrap_or_default(),
        );
        if self.ask(&message)? {
            self.download(installer.package_url(), installer.install_folder(), Some(installer))
                .await?;
        }

        // 拒絕更新時仍以已安裝的版本啟動
        Ok(PromptResult::Ok)
    }

    /// The emulator cannot be launched without this package, whatever its
    /// folder still holds.
    pub async fn offer_missing(&mut self, installer: &Installer) -> Result<PromptResult> {
        if !self.ask(&emulator_not_installed(installer.default_folder_name()))? {
            return Ok(PromptResult::Cancel);
        }
        self.download(installer.package_url(), installer.install_folder(), Some(installer))
            .await?;
        Ok(PromptResult::Ok)
    }

    pub async fn offer_core(&mut self, name: &str, url: &str, install_folder: &Path) -> Result<PromptResult> {
        if !self.ask(&core_not_installed(name))? {
            return Ok(PromptResult::Cancel);
        }
        self.download(url, install_folder, None).await?;
        Ok(PromptResult::Ok)
    }

    pub async fn update_all(&mut self, installers: &mut [Installer]) -> Result<Vec<String>> {
        writeln!(self.output, "Looking for updates...")?;

        let Self {
            output, packages, ..
        } = self;
        let mut printer = ProgressPrinter {
            output,
            current: None,
        };
        let updated = packages
            .update_all(installers, |event| printer.on_progress(event))
            .await?;

        if updated.is_empty() {
            writeln!(self.output, "Everything is up to date.")?;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompt(answer: &str) -> InstallerPrompt<Cursor<Vec<u8>>, Vec<u8>> {
        InstallerPrompt::new(
            Cursor::new(answer.as_bytes().to_vec()),
            Vec::new(),
            PackageManager::new(None),
        )
    }

    #[tokio::test]
    async fn test_declining_missing_emulator_cancels() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let installer = Installer::new(
            "demul",
            "http://127.0.0.1:9/demul.zip",
            temp_dir.path().join("demul"),
        );

        let mut prompt = prompt("n\n");
        let result = prompt.offer_installer(&installer).await.unwrap();

        assert_eq!(result, PromptResult::Cancel);
        let output = String::from_utf8(prompt.into_output()).unwrap();
        assert!(output.contains("demul is not installed"));
    }

    #[tokio::test]
    async fn test_declining_update_keeps_launching() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let folder = temp_dir.path().join("mesen");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(
            folder.join(crate::core::installer::VERSION_FILE),
            r#"{"version": "1.0", "installed_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let mut installer = Installer::new("mesen", "http://127.0.0.1:9/mesen.zip", &folder);
        installer.set_server_version(Some("2.1".to_string()));

        let mut prompt = prompt("no\n");
        let result = prompt.offer_installer(&installer).await.unwrap();

        assert_eq!(result, PromptResult::Ok);
        let output = String::from_utf8(prompt.into_output()).unwrap();
        assert!(output.contains("version 2.1 (installed: 1.0)"));
    }

    #[tokio::test]
    async fn test_missing_executable_with_stale_version_is_not_an_update() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let folder = temp_dir.path().join("demul");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(
            folder.join(crate::core::installer::VERSION_FILE),
            r#"{"version": "0.7.1", "installed_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let mut installer = Installer::new("demul", "http://127.0.0.1:9/demul.zip", &folder);
        installer.set_server_version(Some("0.7.3".to_string()));
        assert!(installer.has_update());

        let mut prompt = prompt("n\n");
        let result = prompt.offer_missing(&installer).await.unwrap();

        assert_eq!(result, PromptResult::Cancel);
        let output = String::from_utf8(prompt.into_output()).unwrap();
        assert!(output.contains("demul is not installed"));
        assert!(!output.contains("update is available"));
    }

    #[tokio::test]
    async fn test_end_of_input_means_no() {
        let mut prompt = prompt("");
        let result = prompt
            .offer_core("flycast", "http://127.0.0.1:9/flycast.zip", Path::new("/tmp/none"))
            .await
            .unwrap();
        assert_eq!(result, PromptResult::Cancel);
    }

    #[test]
    fn test_progress_printer_announces_packages() {
        let mut output = Vec::new();
        let mut printer = ProgressPrinter {
            output: &mut output,
            current: None,
        };

        for (percent, package) in [(0, "mesen"), (50, "mesen"), (100, "mesen"), (0, "demul")] {
            printer.on_progress(ProgressEvent {
                percent,
                package: Some(package.to_string()),
            });
        }

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("Updating mesen...\n"));
        assert!(text.contains(" 50%"));
        assert!(text.contains("100% Installing..."));
        assert!(text.contains("Updating demul..."));
    }
}
