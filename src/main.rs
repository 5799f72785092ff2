//! Command line front end for the multi-switch.
//!
//! Usage:
//!   multi-switch list
//!   multi-switch --config switches.json set laser.shutter open
//!   multi-switch set-many '{"shutter": "open", "mirror": "up"}'
//!   multi-switch run-task

use clap::{Parser, Subcommand};
use log::info;
use multi_switch::config::{Config, load_dotenv};
use multi_switch::error::Result;
use multi_switch::switch::SwitchInterface;
use multi_switch::task::{DummyTask, ModuleTask};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "multi-switch")]
#[command(about = "Drive several switch devices through one composite switch")]
struct Cli {
    /// JSON configuration file (built-in demo devices when omitted)
    #[arg(long, env = "MULTISWITCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every switch with its allowed states
    List,
    /// Print the current state of every switch
    States,
    /// Print the current state of one switch
    Get { switch: String },
    /// Change the state of one switch
    Set { switch: String, state: String },
    /// Change several switches from a JSON object {"switch": "state"}
    SetMany { states: String },
    /// Flip the first switch of every configured device to its last state
    RunTask,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    load_dotenv(".env");
    init_logger();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let switches = config.build_switches()?;
    let multi = config.build_multiswitch(switches.clone());
    multi.activate()?;
    info!("Using {} ({} devices)", multi.name(), multi.switches().len());

    match cli.command {
        Commands::List => {
            for (switch, states) in multi.available_states() {
                println!("{}: {}", switch, states.join(", "));
            }
        }
        Commands::States => {
            for (switch, state) in multi.states()? {
                println!("{}: {}", switch, state);
            }
        }
        Commands::Get { switch } => {
            println!("{}", multi.get_state(&switch)?);
        }
        Commands::Set { switch, state } => {
            multi.set_state(&switch, &state)?;
            info!("{} -> {}", switch, state);
        }
        Commands::SetMany { states } => {
            let value: serde_json::Value = serde_json::from_str(&states)?;
            multi.set_states_json(&value)?;
        }
        Commands::RunTask => {
            DummyTask::new(switches).run()?;
            for (switch, state) in multi.states()? {
                println!("{}: {}", switch, state);
            }
        }
    }

    multi.deactivate();
    Ok(())
}
