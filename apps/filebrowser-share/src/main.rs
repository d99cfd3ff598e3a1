//! `filebrowser-share` entry point.
//!
//! Uploads one file to a File Browser instance and offers the public link
//! through a desktop notification. Every user-facing message is also printed
//! to stdout; logs go to stderr.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use fbshare_desktop::{ConsoleNotifier, DesktopNotifier, Notifier, SystemClipboard};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::app::{App, Request};
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "filebrowser-share",
    version,
    about = "Upload a file to File Browser and share a public link"
)]
struct Cli {
    /// Path to the file to upload.
    #[arg(long = "filePath", alias = "file-path")]
    file_path: Option<PathBuf>,

    /// Create a share without expiration.
    #[arg(long)]
    permanent: bool,

    /// Set when launched by the service menu without a file.
    #[arg(long)]
    awoken: bool,

    /// Path to TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print messages only, without desktop notifications.
    #[arg(long)]
    no_notify: bool,
}

impl Cli {
    fn request(&self) -> Request {
        Request {
            file_path: self.file_path.clone(),
            permanent: self.permanent,
            awoken: self.awoken,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "arguments parsed");

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            println!("Error loading config from file: {e}");
            return Ok(());
        }
    };
    tracing::info!(instance = %config.instance_url, "configuration loaded");

    let notifier: Box<dyn Notifier> = if cli.no_notify || !DesktopNotifier::session_available() {
        tracing::debug!("desktop notifications disabled");
        Box::new(ConsoleNotifier)
    } else {
        Box::new(DesktopNotifier::new())
    };
    let clipboard = SystemClipboard::default();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("SIGINT received, shutting down");
                on_signal.cancel();
            }
        });

        let app = App::new(&config, notifier.as_ref(), &clipboard);
        let outcome = app.run(&cli.request(), cancel).await;
        tracing::debug!(?outcome, "finished");
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_path_flag() {
        let cli = Cli::try_parse_from(["filebrowser-share", "--filePath", "/tmp/a b.txt"])
            .expect("CLI should parse --filePath");
        assert_eq!(cli.file_path, Some(PathBuf::from("/tmp/a b.txt")));
        assert!(!cli.permanent);
        assert!(!cli.awoken);
        assert!(!cli.no_notify);
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "filebrowser-share",
            "--filePath",
            "x",
            "--permanent",
            "--no-notify",
            "--config",
            "/etc/fb.toml",
        ])
        .unwrap();
        assert!(cli.permanent);
        assert!(cli.no_notify);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/fb.toml")));

        let request = cli.request();
        assert!(request.permanent);
        assert_eq!(request.file_path, Some(PathBuf::from("x")));
    }

    #[test]
    fn file_path_is_optional() {
        let cli = Cli::try_parse_from(["filebrowser-share", "--awoken"]).unwrap();
        assert!(cli.awoken);
        assert!(cli.file_path.is_none());
    }
}
