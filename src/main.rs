use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use voxlate::cli::{Cli, Commands, ConfigAction, RunArgs};
use voxlate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Some(args) = cli.run_args() {
        return run_relay(cli.config.as_deref(), args.clone()).await;
    }

    match cli.command {
        Some(Commands::Devices) => {
            list_output_devices()?;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "voxlate", &mut std::io::stdout());
        }
        Some(Commands::Run(_)) | None => {}
    }

    Ok(())
}

/// Initialise stderr logging.
///
/// `RUST_LOG` wins; otherwise `-q` → warn, default → info, `-v` → debug,
/// `-vv` → trace for this crate.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,voxlate={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/voxlate/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides are applied on top.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()?)?,
    };
    Ok(config.with_env_overrides())
}

fn config_path(custom_path: Option<&Path>) -> Result<PathBuf> {
    match custom_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

/// Relay the transcript feed until EOF or Ctrl+C.
///
/// The pipeline runs on a blocking thread; Ctrl+C asks it to drain and the
/// process exits once the drain has finished.
async fn run_relay(custom_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let mut config = load_config(custom_path)?;
    args.apply(&mut config);
    config.validate()?;

    tracing::info!(version = %voxlate::version_string(), "voxlate starting");

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    let input = args.input.clone();
    let mut relay = tokio::task::spawn_blocking(move || {
        voxlate::app::run(&config, input.as_deref(), shutdown_rx)
    });

    tokio::select! {
        result = &mut relay => {
            result??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to wait for Ctrl+C")?;
            eprintln!("\n{}", "Draining queued utterances...".dimmed());
            if shutdown_tx.try_send(()).is_err() {
                tracing::debug!("relay already stopping");
            }
        }
    }

    relay.await??;
    Ok(())
}

/// List available audio output devices.
#[cfg(feature = "playback")]
fn list_output_devices() -> Result<()> {
    let devices = voxlate::speech::cpal_player::list_output_devices()?;

    if devices.is_empty() {
        eprintln!("No audio output devices found");
        std::process::exit(1);
    }

    println!("Available audio output devices:");
    for (idx, device) in devices.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}

#[cfg(not(feature = "playback"))]
fn list_output_devices() -> Result<()> {
    anyhow::bail!("built without audio playback (enable the `playback` feature)")
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", config_path(custom_path)?.display());
        }
        ConfigAction::Init { force } => {
            let path = config_path(custom_path)?;
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, Config::default().to_toml()?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
