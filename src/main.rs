mod cli_app;

use clap::{Parser, Subcommand};
use cli_app::CliApp;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "dsu-bridge", about = "Receive motion and touch from a DSU server")]
pub struct Cli {
    /// Server IPv4 address (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Server UDP port (overrides config)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Pad index to subscribe to (overrides config)
    #[arg(long, global = true)]
    pub pad: Option<u8>,

    /// Client id sent in every request (overrides config)
    #[arg(long, global = true)]
    pub client_id: Option<u32>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Stream motion/touch and print it until Ctrl+C (default)
    Run,
    /// Check that the server answers with pad data
    Test,
    /// Learn the touch panel's range and save it to the config
    Calibrate,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("dsu_input_bridge={log_level},dsu_bridge={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut app = CliApp::new(&cli);
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => app.run(),
        Command::Test => app.test(),
        Command::Calibrate => app.calibrate(),
    }
}
