use crate::domain::model::ProgressEvent;
use crate::utils::error::{LauncherError, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// 安裝資料夾中記錄已安裝版本的檔案
pub const VERSION_FILE: &str = "version.info";

/// Recorded when a package is installed without a known server version.
pub const UNKNOWN_VERSION: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledVersion {
    pub version: String,
    pub installed_at: DateTime<Utc>,
}

/// A downloadable emulator package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installer {
    name: String,
    package_url: String,
    install_folder: PathBuf,
    server_version: Option<String>,
}

impl Installer {
    pub fn new(name: &str, package_url: &str, install_folder: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            package_url: package_url.to_string(),
            install_folder: install_folder.into(),
            server_version: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package_url(&self) -> &str {
        &self.package_url
    }

    pub fn install_folder(&self) -> &Path {
        &self.install_folder
    }

    pub fn default_folder_name(&self) -> &str {
        self.install_folder
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    pub fn set_server_version(&mut self, version: Option<String>) {
        self.server_version = version;
    }

    pub fn is_installed(&self) -> bool {
        fs::read_dir(&self.install_folder)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    pub fn installed(&self) -> Option<InstalledVersion> {
        let content = fs::read_to_string(self.install_folder.join(VERSION_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn installed_version(&self) -> Option<String> {
        self.installed().map(|v| v.version)
    }

    /// Installed with a known version that is older than the server's.
    pub fn has_update(&self) -> bool {
        match (self.server_version(), self.installed_version()) {
            (Some(server), Some(local)) => compare_versions(server, &local) == Ordering::Greater,
            _ => false,
        }
    }
}

/// 比較以點分隔的版本號 (1.10 > 1.9)，非數字部分以字串比較
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let split = |v: &str| -> Vec<String> {
        v.trim()
            .trim_start_matches(['v', 'V'])
            .split(['.', '-'])
            .map(str::to_string)
            .collect()
    };
    let (left, right) = (split(a), split(b));

    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).map(String::as_str).unwrap_or("0");
        let r = right.get(i).map(String::as_str).unwrap_or("0");
        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => l.cmp(r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// 下載與安裝模擬器套件
#[derive(Debug, Clone)]
pub struct PackageManager {
    client: Client,
    updates_url: Option<String>,
}

impl PackageManager {
    pub fn new(updates_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            updates_url,
        }
    }

    /// `{"<package>": "<version>"}` from the update server; empty without one.
    pub async fn fetch_server_versions(&self) -> Result<HashMap<String, String>> {
        let Some(url) = &self.updates_url else {
            return Ok(HashMap::new());
        };

        tracing::debug!("Fetching package versions from {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Fills the server version of each installer.
    pub async fn refresh(&self, installers: &mut [Installer]) -> Result<()> {
        let versions = self.fetch_server_versions().await?;
        for installer in installers.iter_mut() {
            installer.set_server_version(versions.get(installer.name()).cloned());
        }
        Ok(())
    }

    pub async fn install<F>(&self, installer: &Installer, progress: F) -> Result<()>
    where
        F: FnMut(ProgressEvent),
    {
        self.download_and_install(
            installer.package_url(),
            installer.install_folder(),
            Some(installer.name()),
            installer.server_version(),
            progress,
        )
        .await
    }

    /// Downloads a zip package and extracts it into `install_folder`.
    /// Progress reaches 100 when the download is done and extraction starts.
    pub async fn download_and_install<F>(
        &self,
        url: &str,
        install_folder: &Path,
        package: Option<&str>,
        version: Option<&str>,
        mut progress: F,
    ) -> Result<()>
    where
        F: FnMut(ProgressEvent),
    {
        let package_name = package.map(str::to_string);
        let event = |percent: u8| ProgressEvent {
            percent,
            package: package_name.clone(),
        };

        tracing::info!("📥 Downloading {}", url);
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length().filter(|t| *t > 0);

        let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut last_percent = 0u8;
        progress(event(0));

        while let Some(chunk) = response.chunk().await? {
            data.extend_from_slice(&chunk);
            if let Some(total) = total {
                let percent = ((data.len() as u64 * 100) / total).min(99) as u8;
                if percent != last_percent {
                    last_percent = percent;
                    progress(event(percent));
                }
            }
        }
        tracing::debug!("Downloaded {} bytes", data.len());

        progress(event(100));

        let name = package.unwrap_or(url);
        let files = extract_zip(&data, install_folder).map_err(|e| match e {
            LauncherError::InstallError { message, .. } => LauncherError::InstallError {
                name: name.to_string(),
                message,
            },
            other => other,
        })?;
        tracing::info!(
            "📦 Installed {} files into {}",
            files,
            install_folder.display()
        );

        // 版本未知時寫入 "0"，之後任何伺服器版本都算較新
        let marker = InstalledVersion {
            version: version.unwrap_or(UNKNOWN_VERSION).to_string(),
            installed_at: Utc::now(),
        };
        fs::write(
            install_folder.join(VERSION_FILE),
            serde_json::to_string_pretty(&marker)?,
        )?;

        Ok(())
    }

    /// Reinstalls every installed package with a newer server version.
    /// Returns the names of the updated packages.
    pub async fn update_all<F>(&self, installers: &mut [Installer], mut progress: F) -> Result<Vec<String>>
    where
        F: FnMut(ProgressEvent),
    {
        self.refresh(installers).await?;

        let mut updated = Vec::new();
        for installer in installers.iter().filter(|i| i.has_update()) {
            tracing::info!(
                "🔄 Updating {} ({} -> {})",
                installer.name(),
                installer.installed_version().unwrap_or_default(),
                installer.server_version().unwrap_or_default()
            );
            self.install(installer, &mut progress).await?;
            updated.push(installer.name().to_string());
        }

        Ok(updated)
    }
}

/// 解壓縮到目標資料夾，拒絕跳出資料夾的路徑
pub fn extract_zip(data: &[u8], install_folder: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    fs::create_dir_all(install_folder)?;

    let mut files = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| LauncherError::InstallError {
                name: String::new(),
                message: format!("archive entry '{}' escapes the install folder", entry.name()),
            })?;
        let target = install_folder.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = fs::File::create(&target)?;
        std::io::copy(&mut entry, &mut output)?;
        files += 1;
    }

    Ok(files)
}
