//! PKI Deploy - Private Certificate Authority Management
//!
//! Runs one menu action per invocation. The action is taken from the first
//! positional argument when given, otherwise from the interactive menu.
//!
//! ```bash
//! pki-deploy                  # show the menu
//! pki-deploy 6                # create a server certificate
//! pki-deploy --config /etc/pki-deploy.toml 1
//! ```
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `pki_deploy=info`).

use anyhow::Result;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use pki_deploy::commands::{dispatch, Session, REMOTE_EXECUTABLE_NAME};
use pki_deploy::configs::AppConfig;
use pki_deploy::error::exit_code_for;
use pki_deploy::menu::{MenuChoice, Prompter};
use pki_deploy::remote::OpenSshClient;

#[derive(Parser, Debug)]
#[command(name = "pki-deploy", version)]
#[command(about = "Private CA hierarchy management and certificate deployment over SSH")]
struct Args {
    /// Menu action to run (1-8); shows the menu when omitted
    choice: Option<String>,

    /// Path to the TOML configuration file
    #[arg(short, long, env = "PKI_DEPLOY_CONFIG")]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pki_deploy=info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code_for(&e));
    }
}

fn run(args: Args) -> Result<()> {
    // Reject a bad argument before touching configuration or disk.
    let preselected = args
        .choice
        .as_deref()
        .map(str::parse::<MenuChoice>)
        .transpose()?;

    let config = AppConfig::load(args.config.as_deref())?;
    debug!(?config, "Configuration loaded");

    let executable = std::env::current_exe().unwrap_or_else(|e| {
        warn!(error = %e, "Could not resolve own executable path");
        PathBuf::from(REMOTE_EXECUTABLE_NAME)
    });

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    let choice = match preselected {
        Some(choice) => choice,
        None => prompter.choose()?,
    };

    let remote = OpenSshClient::new();
    let mut session = Session::new(&config, &remote, prompter, executable);
    dispatch(choice, &mut session)
}
