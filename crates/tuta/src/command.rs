use clap::{Parser, Subcommand};

pub const DEFAULT_API_URL: &str = "https://app.tuta.com";

#[derive(Parser)]
#[command(name = "tuta", version, about = "Tutanota command-line client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Print results as JSON.")]
    pub json: bool,

    #[arg(long, global = true, help = "Verbose logging to stderr.")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        env = "TUTANOTA_API_URL",
        default_value = DEFAULT_API_URL,
        help = "Service base URL."
    )]
    pub api_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Session management.
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Show account information.
    Profile,

    /// Mailbox folders.
    Folders {
        #[command(subcommand)]
        command: FoldersCommands,
    },

    /// Mails.
    Mails {
        #[command(subcommand)]
        command: MailsCommands,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Validate the stored session, logging in if necessary.
    Check,

    /// Discard the stored session.
    Logout,
}

#[derive(Subcommand)]
pub enum FoldersCommands {
    /// List all folders and labels of the mailbox.
    List,
}

#[derive(Subcommand)]
pub enum MailsCommands {
    /// List the newest mails of a folder.
    List {
        /// The folder's element id, as printed by `folders list`.
        folder_id: String,
    },
}
