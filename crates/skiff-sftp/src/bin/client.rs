//! SFTP command-line client.
//!
//! Run with: cargo run --bin skiff-sftp

use anyhow::Context;
use clap::{Parser, Subcommand};
use skiff_core::{FileSource, TransferOperation};
use skiff_sftp::{AuthMethod, SftpConfig, SftpSource};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; command-line connection flags are ignored
    /// when set
    #[arg(short, long)]
    config: Option<String>,

    /// Server host
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "22")]
    port: u16,

    /// Username
    #[arg(short, long, default_value = "user")]
    username: String,

    /// Authentication mode: password, keyfile or agent
    #[arg(short, long, default_value = "agent")]
    auth: String,

    /// Password for password authentication
    #[arg(long, env = "SKIFF_SFTP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to SSH private key for keyfile authentication
    #[arg(short = 'i', long)]
    identity: Option<PathBuf>,

    /// Passphrase for the private key
    #[arg(long, env = "SKIFF_SFTP_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List directory contents
    Ls {
        /// Remote directory path
        #[arg(default_value = "/")]
        path: String,
        /// Include hidden entries
        #[arg(short, long)]
        all: bool,
    },
    /// Upload a file
    Put {
        /// Local file path
        local: PathBuf,
        /// Remote file path
        remote: String,
    },
    /// Download a file
    Get {
        /// Remote file path
        remote: String,
        /// Local file path
        local: PathBuf,
    },
    /// Remove file
    Rm {
        /// Remote file path
        path: String,
    },
    /// Create directory
    Mkdir {
        /// Remote directory path
        path: String,
    },
    /// Remove directory
    Rmdir {
        /// Remote directory path
        path: String,
    },
    /// Rename file or directory
    Rename {
        /// Old path
        old: String,
        /// New path
        new: String,
    },
    /// Change permissions
    Chmod {
        /// Octal mode, e.g. 644
        mode: String,
        /// Remote path
        path: String,
    },
    /// Copy a remote file to another remote path
    Cp {
        /// Source path
        source: String,
        /// Destination path
        destination: String,
    },
    /// Show remote file metadata
    Stat {
        /// Remote path
        path: String,
    },
}

/// Expand a leading tilde against $HOME.
fn expand_tilde(path: PathBuf) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            let path_str = path.to_string_lossy();
            return PathBuf::from(path_str.replacen("~", &home.to_string_lossy(), 1));
        }
    }
    path
}

fn build_config(args: &Args) -> anyhow::Result<SftpConfig> {
    if let Some(config_path) = &args.config {
        return SftpConfig::from_file(config_path)
            .with_context(|| format!("loading configuration from {config_path}"));
    }

    let auth = AuthMethod::from_name(
        &args.auth,
        args.password.clone(),
        args.identity.clone().map(expand_tilde),
        None,
        args.passphrase.clone(),
    )
    .context("building authentication configuration")?;

    Ok(SftpConfig {
        host: args.host.clone(),
        port: args.port,
        username: args.username.clone(),
        auth,
    })
}

fn format_mtime(seconds: Option<u32>) -> String {
    seconds
        .and_then(|s| chrono::DateTime::from_timestamp(s as i64, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose {
        "debug,russh=info"
    } else {
        "info,russh=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Connect, authenticate and open the SFTP subsystem
    let mut source = match SftpSource::connect_ready(config).await {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to connect: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match args.command {
        Commands::Ls { path, all } => match source.list_directory(&path, all).await {
            Ok(entries) => {
                for entry in entries {
                    match entry.stat {
                        Some(stat) => {
                            let mode = stat
                                .permission_bits()
                                .map(|bits| format!("{bits:04o}"))
                                .unwrap_or_else(|| "----".to_string());
                            let size = stat
                                .size
                                .map(|s| s.to_string())
                                .unwrap_or_else(|| "-".to_string());
                            println!(
                                "{mode} {size:>12} {} {}",
                                format_mtime(stat.modified),
                                entry.name
                            );
                        }
                        None => println!("?            ? {:16} {}", "-", entry.name),
                    }
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        Commands::Put { local, remote } => {
            source
                .upload_file(&TransferOperation::new(local, remote))
                .await
        }
        Commands::Get { remote, local } => {
            source
                .download_file(&TransferOperation::new(local, remote))
                .await
        }
        Commands::Rm { path } => source.delete_file(&path).await,
        Commands::Mkdir { path } => source.make_directory(&path).await,
        Commands::Rmdir { path } => source.remove_directory(&path).await,
        Commands::Rename { old, new } => source.rename(&old, &new).await,
        Commands::Chmod { mode, path } => match u32::from_str_radix(&mode, 8) {
            Ok(bits) => source.change_permissions(bits, &path).await,
            Err(_) => {
                error!("Invalid octal mode: {}", mode);
                std::process::exit(1);
            }
        },
        Commands::Cp {
            source: from,
            destination,
        } => source.copy_file(&from, &destination).await,
        Commands::Stat { path } => match source.stat(&path).await {
            Ok(Some(stat)) => {
                println!(
                    "mode: {}",
                    stat.permissions
                        .map(|m| format!("{m:o}"))
                        .unwrap_or_else(|| "-".to_string())
                );
                println!(
                    "size: {}",
                    stat.size
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
                println!("mtime: {}", format_mtime(stat.modified));
                println!("directory: {}", stat.is_dir());
                Ok(())
            }
            Ok(None) => {
                error!("Stat unavailable for {}", path);
                std::process::exit(1);
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        error!("Operation failed: {}", e);
        let _ = source.disconnect().await;
        std::process::exit(1);
    }

    // Disconnect
    if let Err(e) = source.disconnect().await {
        error!("Disconnect error: {}", e);
        std::process::exit(1);
    }
}
