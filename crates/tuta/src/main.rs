use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::{
    EnvFilter, prelude::__tracing_subscriber_SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::command::{AuthCommands, Cli, Commands, FoldersCommands, MailsCommands};
use crate::commands::Ctx;
use crate::credentials::EnvCredentials;
use crate::store::{FileSessionStore, persistence_disabled};

mod command;
mod commands;
mod credentials;
mod diagnostics;
mod store;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .env values never override the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    color_eyre::install()?;

    // RUST_LOG wins over the flag-derived default.
    let default_directive = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::builder()
        .with_default_directive(
            default_directive
                .parse()
                .expect("static directive is valid"),
        )
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let store: Box<dyn tutanota_core::SessionStore> = if persistence_disabled() {
        Box::new(tutanota_core::NoopSessionStore)
    } else {
        Box::new(FileSessionStore::new()?)
    };

    let ctx = Ctx {
        api_url: cli.api_url,
        json: cli.json,
        store,
        credentials: EnvCredentials::new(),
    };

    match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::Check => commands::auth::check(&ctx).await,
            AuthCommands::Logout => commands::auth::logout(&ctx).await,
        },
        Commands::Profile => commands::profile::run(&ctx).await,
        Commands::Folders { command } => match command {
            FoldersCommands::List => commands::folders::list(&ctx).await,
        },
        Commands::Mails { command } => match command {
            MailsCommands::List { folder_id } => commands::mails::list(&ctx, &folder_id).await,
        },
    }
}
