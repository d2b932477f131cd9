//! `lexi`: keep a dictionary of words, translations and example sentences.
//!
//! The entry point owns the whole lifecycle: load configuration, install
//! logging, open the database (running migrations), run one command and close
//! the database again. Ctrl-C cancels the command in flight; any open
//! transaction is rolled back.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use crate::output::Printer;
use clap::Parser;
use exn::ResultExt;
use lexi_catalogue::Catalogue;
use lexi_config::Config;
use lexi_store::{CancellationToken, Database, PoolSettings, Repository};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    run(cli).await.map_err(|err| {
        let mut diagnostic = miette::MietteDiagnostic::new(format!("{err:?}"));
        if err.is_retryable() {
            diagnostic = diagnostic.with_help("the command was interrupted or the database was busy; try again");
        }
        miette::Report::new(diagnostic)
    })
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    logging::init(&config.log.level, cli.verbose);

    let path = &config.database.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
    }
    let settings = PoolSettings {
        max_connections: config.database.max_connections,
        busy_timeout: config.database.busy_timeout(),
        ..PoolSettings::default()
    };
    let db = Database::connect_with(path, settings).await.or_raise(|| ErrorKind::Database)?;

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let mut repo = Repository::from(&db).with_cancellation(cancel);
    if let Some(timeout) = config.database.operation_timeout() {
        repo = repo.with_timeout(timeout);
    }
    let printer = Printer::new(cli.json);
    let outcome = match cli.command {
        Command::Migrate => match db.migrate().await.or_raise(|| ErrorKind::Database) {
            Ok(()) => printer.message(&format!("database up to date: {}", path.display())),
            Err(err) => Err(err),
        },
        Command::Catalogue(command) => commands::execute(&Catalogue::new(repo), command, printer).await,
    };

    interrupt.abort();
    db.close().await;
    outcome
}
