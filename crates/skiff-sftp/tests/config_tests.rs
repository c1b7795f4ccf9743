//! Configuration loading and validation tests.

use skiff_core::Error;
use skiff_sftp::{AuthMethod, SftpConfig};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write config");
    file
}

#[test]
fn loads_password_config_from_file() {
    let file = write_config(
        r#"
        host = "files.example.net"
        port = 2222
        username = "deploy"

        [auth]
        mode = "password"
        password = "hunter2"
        "#,
    );

    let config = SftpConfig::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.host, "files.example.net");
    assert_eq!(config.port, 2222);
    assert_eq!(config.username, "deploy");
    assert_eq!(config.auth.name(), "password");
}

#[test]
fn port_defaults_to_22_when_omitted() {
    let file = write_config(
        r#"
        host = "files.example.net"
        username = "deploy"

        [auth]
        mode = "agent"
        "#,
    );

    let config = SftpConfig::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.port, 22);
    assert_eq!(config.auth.name(), "agent");
}

#[test]
fn keyfile_config_keeps_optional_fields() {
    let file = write_config(
        r#"
        host = "files.example.net"
        username = "deploy"

        [auth]
        mode = "keyfile"
        private_key_path = "/home/deploy/.ssh/id_ed25519"
        passphrase = "secret"
        "#,
    );

    let config = SftpConfig::from_file(file.path().to_str().unwrap()).unwrap();
    match config.auth {
        AuthMethod::KeyFile {
            private_key_path,
            passphrase,
            public_key_path,
        } => {
            assert_eq!(
                private_key_path,
                PathBuf::from("/home/deploy/.ssh/id_ed25519")
            );
            assert_eq!(passphrase.as_deref(), Some("secret"));
            assert_eq!(public_key_path, None);
        }
        other => panic!("expected keyfile auth, got {other:?}"),
    }
}

#[test]
fn unknown_auth_mode_fails_to_parse() {
    let file = write_config(
        r#"
        host = "files.example.net"
        username = "deploy"

        [auth]
        mode = "kerberos"
        "#,
    );

    let err = SftpConfig::from_file(file.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.is_fatal());
}

#[test]
fn empty_username_is_rejected_on_load() {
    let file = write_config(
        r#"
        host = "files.example.net"
        username = ""

        [auth]
        mode = "agent"
        "#,
    );

    let err = SftpConfig::from_file(file.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let err = SftpConfig::from_file("/nonexistent/skiff-sftp.toml").unwrap_err();
    match err {
        Error::Config(message) => assert!(message.contains("failed to read")),
        other => panic!("expected Config error, got {other:?}"),
    }
}
