use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "grpc-broker", about = "Obtain and inspect broker sessions")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a session, logging in or refreshing as needed.
    Login {
        #[arg(long, conflicts_with = "service", required_unless_present = "service")]
        user: Option<i64>,
        #[arg(long)]
        service: bool,
    },
    /// Create a backend account for a user.
    Register {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        username: String,
    },
    /// Drop a user's session. Sessions live in memory only, so this logs in
    /// against the configured backend first and then evicts that session.
    Logout {
        #[arg(long)]
        user: i64,
    },
}
