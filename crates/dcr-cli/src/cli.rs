use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dcr",
    about = "Distributed DCR workflow event nodes",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the event node to talk to.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    pub node: String,

    /// Bearer token sent with create, delete and reset.
    #[arg(long, global = true)]
    pub admin_token: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(long, global = true, default_value = "10000")]
    pub timeout_ms: u64,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run an event node
    Serve(ServeArgs),
    /// Check that a node is up
    Health,
    /// Show the stored state of an event
    Show(EventArgs),
    /// Show whether an event is executable right now
    State(StateArgs),
    /// Show and verify event or workflow history
    History(HistoryArgs),
    /// Stitch workflow histories from several nodes into a causal graph
    Graph(GraphArgs),
    /// Create an event from a JSON definition file
    Create(CreateArgs),
    /// Delete an event
    Delete(EventArgs),
    /// Restore an event to its initial state
    Reset(EventArgs),
    /// Execute an event
    Execute(ExecuteArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// URI peers use to reach this node.
    #[arg(long)]
    pub public_uri: Option<String>,
}

#[derive(Args)]
pub struct EventArgs {
    pub workflow_id: String,
    pub event_id: String,
}

#[derive(Args)]
pub struct StateArgs {
    #[command(flatten)]
    pub event: EventArgs,
    /// Identity reported to the node as the asking event.
    #[arg(long, default_value = "dcr-cli")]
    pub sender: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub workflow_id: String,
    /// Restrict to one event.
    pub event_id: Option<String>,
    /// Check the hash chain and timestamp sequence of each event.
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args)]
pub struct GraphArgs {
    pub workflow_id: String,
    /// Additional nodes whose history is merged in.
    #[arg(long = "with", value_name = "URL")]
    pub nodes: Vec<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Path to an event definition in JSON.
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ExecuteArgs {
    #[command(flatten)]
    pub event: EventArgs,
    /// Roles to execute with, comma separated.
    #[arg(long, value_delimiter = ',', conflicts_with = "registry")]
    pub roles: Vec<String>,
    /// Registry to log in at and resolve the event's node from.
    #[arg(long, requires_all = ["user", "password"])]
    pub registry: Option<String>,
    /// Node configuration whose `registry_url` is used when `--registry` is
    /// not given.
    #[arg(long, requires_all = ["user", "password"], conflicts_with = "roles")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
}
