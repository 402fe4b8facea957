//! secondseat - command line entry point
//!
//! `add` walks the operator through assigning a second mouse and keyboard to a
//! new primary pair, `remove` tears that pair down again, `list` shows the
//! current device tree.

use anyhow::Context;
use clap::{Parser, Subcommand};
use secondseat::session::write_device_tree;
use secondseat::{Config, DeviceManager, Session, XinputCli};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "secondseat",
    about = "Add or remove input devices for a second seat.",
    version
)]
struct Cli {
    /// TOML config file (defaults to configs/default.toml when present)
    #[arg(long, global = true, env = "SECONDSEAT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add input devices for a second user
    Add {
        /// Name for the new primary pair (overrides seat_name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove second input user
    Remove {
        /// Name of the primary pair to remove (overrides seat_name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show primary devices and the devices attached to them
    List {
        /// Print the devices as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(cli.config.as_deref()).context("failed to load configuration")?;
    let settings = config.settings;

    let gateway = XinputCli::new(settings.xinput_command.clone());
    let required = settings.required_version()?;
    let mut manager =
        DeviceManager::connect(gateway, &required).context("failed to read X input devices")?;

    match cli.command {
        Command::Add { name } => {
            let name = name.unwrap_or_else(|| settings.seat_name.clone());
            let stdin = io::stdin();
            let mut session = Session::new(&mut manager, stdin.lock(), io::stdout(), &settings);
            session
                .add_seat(&name)
                .with_context(|| format!("adding second seat failed at stage {}", session.stage()))?;
        }
        Command::Remove { name } => {
            let name = name.unwrap_or_else(|| settings.seat_name.clone());
            let stdin = io::stdin();
            let mut session = Session::new(&mut manager, stdin.lock(), io::stdout(), &settings);
            session
                .remove_seat(&name)
                .with_context(|| format!("removing second seat '{}' failed", name))?;
        }
        Command::List { json } => {
            let snapshot = manager.state();
            if json {
                let devices: Vec<_> = snapshot.devices().collect();
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else {
                write_device_tree(snapshot, &mut io::stdout())?;
            }
        }
    }

    Ok(())
}
