//! Live end-to-end tests against a real SFTP server.
//!
//! These tests are skipped unless a target server is configured through
//! the environment:
//!
//! - `SKIFF_TEST_SFTP_HOST` (required; its absence skips every test)
//! - `SKIFF_TEST_SFTP_PORT` (default 22)
//! - `SKIFF_TEST_SFTP_USER` and `SKIFF_TEST_SFTP_PASSWORD`
//! - `SKIFF_TEST_SFTP_DIR` a remote directory the user may write to
//!   (default `/tmp`)

use skiff_core::{FileSource, TransferOperation};
use skiff_sftp::{AuthMethod, SftpConfig, SftpSource};
use std::io::Write;
use tempfile::NamedTempFile;

fn live_config() -> Option<(SftpConfig, String)> {
    let host = std::env::var("SKIFF_TEST_SFTP_HOST").ok()?;
    let port = std::env::var("SKIFF_TEST_SFTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(22);
    let username = std::env::var("SKIFF_TEST_SFTP_USER").unwrap_or_else(|_| "user".into());
    let password = std::env::var("SKIFF_TEST_SFTP_PASSWORD").unwrap_or_default();
    let remote_dir = std::env::var("SKIFF_TEST_SFTP_DIR").unwrap_or_else(|_| "/tmp".into());

    Some((
        SftpConfig {
            host,
            port,
            username,
            auth: AuthMethod::Password { password },
        },
        remote_dir,
    ))
}

macro_rules! require_live_server {
    () => {
        match live_config() {
            Some(setup) => setup,
            None => {
                eprintln!("Skipping: SKIFF_TEST_SFTP_HOST not set");
                return;
            }
        }
    };
}

#[tokio::test]
async fn full_file_lifecycle() {
    let (config, remote_dir) = require_live_server!();
    let mut source = SftpSource::connect_ready(config)
        .await
        .expect("Failed to connect");

    let remote_path = format!("{remote_dir}/skiff-lifecycle-{}.txt", std::process::id());
    let copy_path = format!("{remote_path}.copy");
    let renamed_path = format!("{remote_path}.renamed");

    // Upload a small payload.
    let mut local = NamedTempFile::new().unwrap();
    local.write_all(b"skiff e2e payload").unwrap();
    source
        .upload_file(&TransferOperation::new(local.path(), &remote_path))
        .await
        .expect("Upload failed");

    // The uploaded file is visible to stat and carries a size.
    let stat = source
        .stat(&remote_path)
        .await
        .expect("Stat failed")
        .expect("Stat unavailable");
    assert_eq!(stat.size, Some(17));

    // Download it back and compare content.
    let download_target = NamedTempFile::new().unwrap();
    source
        .download_file(&TransferOperation::new(download_target.path(), &remote_path))
        .await
        .expect("Download failed");
    let roundtrip = std::fs::read(download_target.path()).unwrap();
    assert_eq!(roundtrip, b"skiff e2e payload");

    // Copy preserves content through the local staging file.
    source
        .copy_file(&remote_path, &copy_path)
        .await
        .expect("Copy failed");

    // Tighten permissions, then rename.
    source
        .change_permissions(0o600, &copy_path)
        .await
        .expect("Chmod failed");
    source
        .rename(&copy_path, &renamed_path)
        .await
        .expect("Rename failed");

    source.delete_file(&remote_path).await.expect("Delete failed");
    source.delete_file(&renamed_path).await.expect("Delete failed");

    source.disconnect().await.expect("Disconnect failed");
}

#[tokio::test]
async fn directory_lifecycle_and_listing() {
    let (config, remote_dir) = require_live_server!();
    let mut source = SftpSource::connect_ready(config)
        .await
        .expect("Failed to connect");

    let dir_path = format!("{remote_dir}/skiff-dir-{}", std::process::id());
    let hidden_path = format!("{dir_path}/.hidden");
    let visible_path = format!("{dir_path}/visible.txt");

    source.make_directory(&dir_path).await.expect("Mkdir failed");

    // Creating the same directory again names the existing path.
    let err = source.make_directory(&dir_path).await.unwrap_err();
    assert!(err.to_string().contains("file exists at"));

    let mut payload = NamedTempFile::new().unwrap();
    payload.write_all(b"x").unwrap();
    for remote in [&hidden_path, &visible_path] {
        source
            .upload_file(&TransferOperation::new(payload.path(), remote.as_str()))
            .await
            .expect("Upload failed");
    }

    // Hidden entries only surface when requested; reserved names never do.
    let plain = source.list_directory(&dir_path, false).await.unwrap();
    let names: Vec<&str> = plain.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["visible.txt"]);

    let all = source.list_directory(&dir_path, true).await.unwrap();
    let names: Vec<&str> = all.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&".hidden"));
    assert!(names.contains(&"visible.txt"));
    assert!(!names.contains(&"."));
    assert!(!names.contains(&".."));

    // Every surfaced entry carried a successful stat probe.
    assert!(all.iter().all(|e| e.stat.is_some()));

    source.delete_file(&hidden_path).await.unwrap();
    source.delete_file(&visible_path).await.unwrap();
    source.remove_directory(&dir_path).await.expect("Rmdir failed");

    source.disconnect().await.expect("Disconnect failed");
}

#[tokio::test]
async fn missing_paths_classify_as_not_found() {
    let (config, remote_dir) = require_live_server!();
    let mut source = SftpSource::connect_ready(config)
        .await
        .expect("Failed to connect");

    let missing = format!("{remote_dir}/skiff-missing-{}", std::process::id());

    let diagnosis = source.diagnose(&missing, true).await.unwrap();
    assert_eq!(
        diagnosis,
        Some(format!("no such file or directory {missing}"))
    );

    let err = source.delete_file(&missing).await.unwrap_err();
    assert!(err.to_string().contains("no such file or directory"));

    let err = source
        .download_file(&TransferOperation::new("/dev/null", &missing))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no such file or directory"));

    // A missing path is an explicit None, not an error.
    assert_eq!(source.stat(&missing).await.unwrap(), None);

    source.disconnect().await.expect("Disconnect failed");
}

#[tokio::test]
async fn operations_fail_cleanly_after_disconnect() {
    let (config, _) = require_live_server!();
    let mut source = SftpSource::connect_ready(config)
        .await
        .expect("Failed to connect");

    source.disconnect().await.expect("Disconnect failed");

    let err = source.stat("/").await.unwrap_err();
    assert!(err.to_string().contains("not ready"));

    // Disconnecting twice is harmless.
    source.disconnect().await.expect("Second disconnect failed");
}

#[tokio::test]
async fn wrong_password_is_an_authentication_error() {
    let (mut config, _) = require_live_server!();
    config.auth = AuthMethod::Password {
        password: "definitely-wrong-password".into(),
    };

    let err = SftpSource::connect_ready(config).await.unwrap_err();
    assert!(matches!(err, skiff_core::Error::Authentication(_)));
}
