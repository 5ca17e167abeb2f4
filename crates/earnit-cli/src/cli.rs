use clap::{Parser, Subcommand};
use earnit_core::session::Role;

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "earnit",
    about = "Session and API companion for the EarnIt chore tracker",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to `whoami` when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a session token (and optionally a role) after signing in elsewhere.
    Login {
        token: String,
        /// Role for this session (`parent`, `child`, ...). Keeps the stored role when omitted.
        #[arg(long)]
        role: Option<Role>,
    },
    /// Replace the stored role only.
    Role { role: Role },
    /// Store an extra value, e.g. `set parentCode ABC123`.
    Set { key: String, value: String },
    /// Show the current session, decoded claims and start screen.
    Whoami,
    /// Clear the stored session.
    Logout,
    /// GET a path on the API and print the body.
    Get {
        path: String,
        /// Do not attach the stored bearer token.
        #[arg(long)]
        no_auth: bool,
    },
    /// POST a JSON body to a path on the API and print the reply.
    Post {
        path: String,
        /// JSON request body.
        #[arg(long, default_value = "{}")]
        body: String,
        /// Do not attach the stored bearer token.
        #[arg(long)]
        no_auth: bool,
    },
    /// Check which storage backend is in use and that it round-trips.
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
