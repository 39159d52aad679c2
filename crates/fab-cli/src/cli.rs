use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fab", about = "fab: publish Markdown documents by name", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with server settings; FAB_* variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Create all tables
    Syncdb,
    /// Log everyone out and drop all tables
    Clear(ClearArgs),
    /// Register a user
    Register(RegisterArgs),
    /// Publish a file as a document
    Put(PutArgs),
    /// Print a document
    Get(GetArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Overrides FAB_BIND_ADDR
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Required; there is no undo
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct RegisterArgs {
    pub username: String,
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub owner: String,
    pub slug: String,
    /// File to publish; stdin if omitted or `-`
    pub file: Option<PathBuf>,
    /// The owner's password
    #[arg(long)]
    pub password: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub owner: String,
    pub slug: String,
    /// Print rendered HTML instead of the source
    #[arg(long)]
    pub rendered: bool,
    /// Print the document record instead of its body
    #[arg(long, conflicts_with = "rendered")]
    pub info: bool,
    /// The owner's password, needed for private documents
    #[arg(long)]
    pub password: Option<String>,
}
