//! Server configuration from command line and environment

use std::path::PathBuf;
use clap::Parser;
use crate::protocol::DEFAULT_MAX_MESSAGE_BYTES;

pub const DEFAULT_SOCKET: &str = "/tmp/invdb.sock";

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Inventory graph server over a Unix socket")]
pub struct ServerConfig {
    /// Unix socket path to listen on
    #[arg(long, env = "INVDB_SOCKET", default_value = DEFAULT_SOCKET)]
    pub socket: PathBuf,

    /// Frames above this size are rejected and the client dropped
    #[arg(long, env = "INVDB_MAX_MESSAGE_BYTES", default_value_t = DEFAULT_MAX_MESSAGE_BYTES)]
    pub max_message_bytes: usize,

    /// Log filter directives (e.g. "info" or "invdb=debug")
    #[arg(long, env = "INVDB_LOG", default_value = "info")]
    pub log: String,

    /// JSON file holding an array of wire chunk records (newest first) to
    /// reconstruct and load at start-up
    #[arg(long)]
    pub preload: Option<PathBuf>,
}
