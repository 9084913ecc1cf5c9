mod cli;
mod client;
mod commands;
mod config;
mod error;
mod manager;
mod output;
mod session;
mod types;

use std::error::Error as _;
use std::io;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::Config;
use error::Result;
use session::{SessionGate, SessionStore};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");

        // Show error chain if verbose flag was passed
        if std::env::args().any(|arg| arg == "--verbose" || arg == "-v") {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    output::set_format(cli.output_format());
    output::set_quiet(cli.quiet);

    match cli.command {
        // Commands that don't require config or a session
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "users", &mut io::stdout());
        }
        Commands::Init => {
            commands::init::run().await?;
        }
        command => {
            let config = Config::load()?;
            let gate = Arc::new(SessionGate::new(
                config.identity.clone(),
                SessionStore::open_default()?,
            )?);

            match command {
                Commands::Login => commands::auth::login(&gate, &config).await?,
                Commands::Logout => commands::auth::logout(&gate, &config).await?,
                Commands::Status => commands::auth::status(&gate),
                Commands::Shell => commands::shell::run(&config, &gate).await?,
                Commands::List => {
                    let mut manager = commands::users::connect(&config, &gate)?;
                    commands::users::list(&mut manager).await?
                }
                // Everything below works on a mounted manager
                command => {
                    let mut manager = commands::users::mount(&config, &gate).await?;

                    match command {
                        Commands::Show { id } => commands::users::show(&manager, id).await?,
                        Commands::Add(args) => commands::users::add(&mut manager, args).await?,
                        Commands::Edit(args) => commands::users::edit(&mut manager, args).await?,
                        Commands::Delete { id } => {
                            commands::users::delete(&mut manager, id).await?
                        }
                        Commands::Login
                        | Commands::Logout
                        | Commands::List
                        | Commands::Status
                        | Commands::Shell
                        | Commands::Completions { .. }
                        | Commands::Init => {
                            // Already handled above
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
