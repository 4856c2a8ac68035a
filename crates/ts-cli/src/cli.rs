use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "timestreams",
    about = "Time Streams: serve and read time-ordered posts",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the full error chain on failure
    #[arg(long, global = true)]
    pub trace: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve a post store over HTTP
    Serve(ServeArgs),
    /// Fetch one post and print it
    Get(GetArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Path or http(s) url of the store to serve
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// TOML file with server settings; flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Publish opaque ids instead of raw post ids
    #[arg(long)]
    pub opaque_ids: bool,
}

#[derive(Args)]
pub struct GetArgs {
    /// Path or http(s) url of the store
    pub url: String,
    /// Header format: http, json or gemini
    #[arg(long, default_value = "http")]
    pub format: String,
    /// Print headers before the body
    #[arg(long)]
    pub headers: bool,
    /// Print headers only
    #[arg(long)]
    pub headers_only: bool,
    /// Newest post strictly before this instant
    #[arg(long)]
    pub before: Option<String>,
    /// Fetch this post id
    #[arg(long)]
    pub id: Option<String>,
}
