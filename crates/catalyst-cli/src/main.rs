mod cmd;
mod collaborator;
mod output;
mod root;
mod session;
mod source;

use clap::{Parser, Subcommand};
use cmd::{actions::ActionsSubcommand, config::ConfigSubcommand};
use session::Overrides;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "catalyst",
    about = "Command executor that writes the actions it is missing and keeps them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Catalyst root (default: nearest .catalyst/ upward, else home)
    #[arg(long, global = true, env = "CATALYST_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Model used by the planner (overrides config)
    #[arg(long, global = true, env = "CATALYST_MODEL")]
    model: Option<String>,

    /// Do not persist planner sessions
    #[arg(long, global = true)]
    no_trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .catalyst/ with a default config and an empty catalog
    Init,

    /// Read utterances from stdin, one per line (default)
    Listen,

    /// Handle a single utterance
    Run {
        #[arg(required = true, trailing_var_arg = true)]
        utterance: Vec<String>,
    },

    /// Inspect the action catalog
    Actions {
        #[command(subcommand)]
        subcommand: ActionsSubcommand,
    },

    /// Show catalog size and any pending continuation
    Status,

    /// Inspect or validate .catalyst/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Listen);

    let default_level = match &command {
        Commands::Listen => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let overrides = Overrides {
        model: cli.model,
        no_trace: cli.no_trace,
    };

    let result = root::resolve_root(cli.root.as_deref()).and_then(|root| match command {
        Commands::Init => cmd::init::run(&root),
        Commands::Listen => cmd::listen::run(&root, &overrides, cli.json),
        Commands::Run { utterance } => cmd::run::run(&root, &utterance, &overrides, cli.json),
        Commands::Actions { subcommand } => cmd::actions::run(&root, subcommand, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    });

    if let Err(e) = result {
        // Full chain, anyhow's alternate Display
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
