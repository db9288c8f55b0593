use anyhow::Result;
use emu_launcher::core::installer::{Installer, PackageManager, UNKNOWN_VERSION, VERSION_FILE};
use emu_launcher::domain::model::ProgressEvent;
use emu_launcher::LauncherError;
use httpmock::prelude::*;
use std::io::{Cursor, Write};
use tempfile::TempDir;
use zip::write::{FileOptions, ZipWriter};

fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        zip.start_file::<_, ()>(*name, FileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn write_marker(folder: &std::path::Path, version: &str) {
    std::fs::create_dir_all(folder).unwrap();
    std::fs::write(
        folder.join(VERSION_FILE),
        format!(r#"{{"version": "{}", "installed_at": "2024-01-01T00:00:00Z"}}"#, version),
    )
    .unwrap();
}

/// 下載套件並解壓縮，進度最後停在 100
#[tokio::test]
async fn test_install_reports_progress_and_writes_version() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    let package = build_zip(&[("Mesen.exe", "MZ"), ("Docs/readme.txt", "hello")]);
    let package_mock = server.mock(|when, then| {
        when.method(GET).path("/mesen.zip");
        then.status(200).body(package.clone());
    });

    let folder = temp_dir.path().join("emulators").join("mesen");
    let mut installer = Installer::new("mesen", &server.url("/mesen.zip"), &folder);
    installer.set_server_version(Some("2.0.0".to_string()));

    let mut events: Vec<ProgressEvent> = Vec::new();
    PackageManager::new(None)
        .install(&installer, |event| events.push(event))
        .await?;

    package_mock.assert();
    assert_eq!(std::fs::read_to_string(folder.join("Mesen.exe"))?, "MZ");
    assert_eq!(std::fs::read_to_string(folder.join("Docs/readme.txt"))?, "hello");

    assert_eq!(events.first().map(|e| e.percent), Some(0));
    assert_eq!(events.last().map(|e| e.percent), Some(100));
    assert!(events
        .iter()
        .all(|e| e.package.as_deref() == Some("mesen")));

    assert!(installer.is_installed());
    assert_eq!(installer.installed_version().as_deref(), Some("2.0.0"));
    assert!(!installer.has_update());

    Ok(())
}

/// 沒有版本伺服器時仍寫入 version.info，之後設定伺服器就能更新
#[tokio::test]
async fn test_install_without_server_version_can_be_updated_later() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/demul.zip");
        then.status(200).body(build_zip(&[("demul.exe", "MZ")]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/versions.json");
        then.status(200).json_body(serde_json::json!({ "demul": "0.7.3" }));
    });

    let folder = temp_dir.path().join("demul");
    let installer = Installer::new("demul", &server.url("/demul.zip"), &folder);
    PackageManager::new(None).install(&installer, |_| {}).await?;

    assert!(folder.join(VERSION_FILE).is_file());
    assert_eq!(installer.installed_version().as_deref(), Some(UNKNOWN_VERSION));
    assert!(!installer.has_update());

    let mut installers = vec![installer];
    PackageManager::new(Some(server.url("/versions.json")))
        .refresh(&mut installers)
        .await?;
    assert!(installers[0].has_update());

    Ok(())
}

#[tokio::test]
async fn test_install_missing_package_is_http_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/demul.zip");
        then.status(404);
    });

    let installer = Installer::new("demul", &server.url("/demul.zip"), temp_dir.path().join("demul"));
    let result = PackageManager::new(None).install(&installer, |_| {}).await;

    let err = result.unwrap_err();
    assert!(matches!(err, LauncherError::HttpError(_)));
    assert_eq!(err.exit_code(), 2);
    assert!(!installer.is_installed());

    Ok(())
}

/// 只更新已安裝且伺服器版本較新的套件
#[tokio::test]
async fn test_update_all_only_touches_outdated_packages() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/versions.json");
        then.status(200).json_body(serde_json::json!({
            "mesen": "2.1",
            "demul": "0.7.3",
            "flycast": "2.4"
        }));
    });
    let mesen_mock = server.mock(|when, then| {
        when.method(GET).path("/mesen.zip");
        then.status(200).body(build_zip(&[("Mesen.exe", "new")]));
    });
    let demul_mock = server.mock(|when, then| {
        when.method(GET).path("/demul.zip");
        then.status(200).body(build_zip(&[("demul.exe", "new")]));
    });
    let flycast_mock = server.mock(|when, then| {
        when.method(GET).path("/flycast.zip");
        then.status(200).body(build_zip(&[("flycast.exe", "new")]));
    });

    let mesen_dir = temp_dir.path().join("mesen");
    let demul_dir = temp_dir.path().join("demul");
    write_marker(&mesen_dir, "2.0");
    write_marker(&demul_dir, "0.7.3");

    let mut installers = vec![
        Installer::new("mesen", &server.url("/mesen.zip"), &mesen_dir),
        Installer::new("demul", &server.url("/demul.zip"), &demul_dir),
        Installer::new("flycast", &server.url("/flycast.zip"), temp_dir.path().join("flycast")),
    ];

    let mut packages_seen = Vec::new();
    let updated = PackageManager::new(Some(server.url("/versions.json")))
        .update_all(&mut installers, |event| {
            if let Some(name) = event.package {
                if !packages_seen.contains(&name) {
                    packages_seen.push(name);
                }
            }
        })
        .await?;

    assert_eq!(updated, vec!["mesen".to_string()]);
    assert_eq!(packages_seen, vec!["mesen".to_string()]);
    mesen_mock.assert();
    demul_mock.assert_hits(0);
    flycast_mock.assert_hits(0);

    assert_eq!(std::fs::read_to_string(mesen_dir.join("Mesen.exe"))?, "new");
    assert_eq!(installers[0].installed_version().as_deref(), Some("2.1"));
    assert!(!installers[2].is_installed());

    Ok(())
}
