//! invdb server - Unix socket server for the inventory graph
//!
//! Provides a MessagePack-based protocol for inventory operations.
//! Multiple clients can connect and share the same graph.
//!
//! Usage:
//!   invdb-server [--socket /tmp/invdb.sock] [--preload chunks.json]
//!
//! Protocol:
//!   Request:  [4-byte length BE] [MessagePack payload]
//!   Response: [4-byte length BE] [MessagePack payload]

use std::fs;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use invdb::chunk::reconstruct;
use invdb::config::ServerConfig;
use invdb::graph::SharedInventory;
use invdb::protocol::{decode_chunks, handle_frame, read_message, write_message, WireChunk};

fn handle_client(mut stream: UnixStream, shared: SharedInventory, client_id: usize, max_message_bytes: usize, socket_path: PathBuf) {
    tracing::info!("Client {} connected", client_id);

    loop {
        let frame = match read_message(&mut stream, max_message_bytes) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!("Client {} disconnected", client_id);
                break;
            }
            Err(e) => {
                tracing::warn!("Client {} read error: {}", client_id, e);
                break;
            }
        };

        let (response, is_shutdown) = match handle_frame(&shared, &frame) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Client {} response encoding failed: {}", client_id, e);
                continue;
            }
        };

        if let Err(e) = write_message(&mut stream, &response) {
            tracing::warn!("Client {} write error: {}", client_id, e);
            break;
        }

        if is_shutdown {
            tracing::info!("Shutdown requested by client {}", client_id);
            let _ = fs::remove_file(&socket_path);
            std::process::exit(0);
        }
    }
}

fn preload(shared: &SharedInventory, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read preload file {:?}", path))?;
    let chunks: Vec<WireChunk> = serde_json::from_str(&text)
        .with_context(|| format!("Preload file {:?} is not a JSON array of chunks", path))?;
    let records = decode_chunks(chunks)?;

    match reconstruct(&records)? {
        Some(doc) => {
            let stats = shared.ingest(&doc);
            tracing::info!(
                "Preloaded {:?}: {} resources, {} resource types, {} metrics",
                path,
                stats.resources,
                stats.resource_types,
                stats.metrics
            );
        }
        None => tracing::warn!("Preload file {:?} holds no snapshot", path),
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log).context("Invalid log filter")?)
        .init();

    let shared = SharedInventory::new();
    if let Some(path) = &config.preload {
        preload(&shared, path)?;
    }

    // Remove stale socket file
    let _ = fs::remove_file(&config.socket);

    let listener = UnixListener::bind(&config.socket)
        .with_context(|| format!("Failed to bind socket {:?}", config.socket))?;
    tracing::info!("Listening on {:?}", config.socket);

    let socket_for_signal = config.socket.clone();
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ])
    .context("Failed to register signal handlers")?;

    thread::spawn(move || {
        for sig in signals.forever() {
            tracing::info!("Received signal {}, exiting", sig);
            let _ = fs::remove_file(&socket_for_signal);
            std::process::exit(0);
        }
    });

    let mut client_id = 0;
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                client_id += 1;
                let shared = shared.clone();
                let max_message_bytes = config.max_message_bytes;
                let socket_path = config.socket.clone();
                let id = client_id;
                thread::spawn(move || {
                    handle_client(stream, shared, id, max_message_bytes, socket_path);
                });
            }
            Err(e) => {
                tracing::warn!("Accept error: {}", e);
            }
        }
    }

    Ok(())
}
