use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use yoshi_core::{Config, KubeOption, SessionOptions};

#[derive(Parser, Debug)]
#[command(name = "yoshi")]
#[command(author, version, about = "View the logs of Docker containers and Kubernetes pods in your terminal")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Hide containers managed by Docker Compose
    #[arg(short = 'c', long, visible_alias = "compose")]
    exclude_compose: bool,

    /// Only show containers with these names
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',', num_args = 1..)]
    include: Vec<String>,

    /// Never show containers with these names
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',', num_args = 1.., visible_aliases = ["ignore", "hide"])]
    exclude: Vec<String>,

    /// Also list Kubernetes pods, optionally from a single namespace
    #[arg(short, long, value_name = "NAMESPACE", num_args = 0..=1, visible_alias = "kubernetes")]
    kube: Option<Option<String>>,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    fn session_options(&self, config: &Config) -> SessionOptions {
        let kube = self.kube.as_ref().map(|namespace| match namespace {
            Some(ns) => KubeOption::Scoped {
                namespace: Some(ns.clone()),
                display: Some(true),
            },
            None if config.kube.namespace.is_some() || config.kube.display.is_some() => {
                KubeOption::Scoped {
                    namespace: config.kube.namespace.clone(),
                    display: Some(config.kube.display.unwrap_or(true)),
                }
            }
            None => KubeOption::Flag(true),
        });

        SessionOptions {
            exclude_compose: self.exclude_compose,
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            kube,
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::options().create(true).append(true).open(path)
}

/// The dashboard owns the terminal, so diagnostics go to a file.
fn setup_logging(config: &Config) {
    let Ok(file) = open_log_file(&config.log_file()) else {
        return;
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    setup_logging(&config);

    let options = cli.session_options(&config);
    tracing::info!(?options, "starting yoshi");

    yoshi_tui::run(&config, options).await
}
