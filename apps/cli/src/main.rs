//! OnionMesh CLI
//!
//! Thin operator front end for a node: start it, then drive its peers,
//! chat, file swarm, and HTTP exit through a line-oriented prompt. No
//! protocol logic lives here — every command is a direct call into the node
//! facade or one of its modules.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use onionmesh_core::PeerDescriptor;
use onionmesh_node::NodeConfig;
use onionmesh_settings::Settings;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// OnionMesh — a multi-hop onion-routed overlay for chat, file sharing, and HTTP fetching.
#[derive(Parser)]
#[command(name = "onionmesh", author, version, about)]
struct Cli {
    /// Settings file path; defaults to the platform config directory.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    onionmesh_logging::init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path).context("failed to load settings")?,
        None => Settings::load_or_default().context("failed to load settings")?,
    };

    let pins_path = settings
        .node
        .pins_path
        .clone()
        .unwrap_or_else(onionmesh_settings::default_pins_path);

    let config = NodeConfig {
        discovery_port: settings.network.discovery_port,
        relay_port_range: settings.network.relay_port_start..settings.network.relay_port_end,
        hops: settings.network.hops,
        connect_timeout: Duration::from_secs(settings.node.connect_timeout_secs),
        pins_path,
        advertise_host: settings.network.advertise_host.clone(),
    };

    info!("starting node");
    let runtime = onionmesh_node::start(config).await.context("failed to start node")?;
    info!(
        relay_port = runtime.node.relay_port(),
        pubkey_prefix = &runtime.node.pubkey()[..27.min(runtime.node.pubkey().len())],
        "node running"
    );

    for entry in &settings.network.bootstrap_peers {
        if let Some((host, port)) = entry.rsplit_once(':') {
            match port.parse::<u16>() {
                Ok(port) => {
                    if let Err(e) = runtime.discovery.manual_connect(host, port).await {
                        warn!(error = %e, peer = %entry, "bootstrap connect failed");
                    }
                }
                Err(_) => warn!(peer = %entry, "bad bootstrap peer port"),
            }
        } else {
            warn!(peer = %entry, "bootstrap peer must be host:port");
        }
    }

    println!("onionmesh node listening on relay port {}", runtime.node.relay_port());
    println!("type `help` for a list of commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if handle_command(&line, &runtime).await {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "failed to read stdin");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Returns `true` if the command line requested a shutdown.
async fn handle_command(line: &str, runtime: &onionmesh_node::Runtime) -> bool {
    let mut parts = line.trim().splitn(2, char::is_whitespace);
    let Some(cmd) = parts.next().filter(|c| !c.is_empty()) else {
        return false;
    };
    let rest = parts.next().unwrap_or("").trim();

    match cmd {
        "help" => print_help(),
        "quit" | "exit" => return true,
        "peers" => print_peers(&runtime.node.peers()),
        "connect" => connect(rest, runtime).await,
        "chat" => runtime.modules.chat.send_message(rest),
        "log" => print_chat_log(&runtime.modules.chat.messages()),
        "share" => share_file(rest, runtime),
        "get" => runtime.modules.torrent.request_file(rest),
        "fetch" => runtime.modules.proxy.fetch(rest),
        "responses" => print_responses(&runtime.modules.proxy.responses()),
        _ => println!("unknown command: {cmd} (try `help`)"),
    }
    false
}

fn print_help() {
    println!("commands:");
    println!("  peers                 list known peers");
    println!("  connect <host> <port> send a manual HELLO to a peer");
    println!("  chat <text>           send a chat message through a random circuit");
    println!("  log                   show chat messages sent and received");
    println!("  share <path>          make a local file available to the swarm");
    println!("  get <hash>            request a file from the swarm by hash");
    println!("  fetch <url>           fetch a URL through the onion-routed HTTP exit");
    println!("  responses             show HTTP exit responses received so far");
    println!("  quit                  stop the node and exit");
}

fn print_peers(peers: &[PeerDescriptor]) {
    if peers.is_empty() {
        println!("no peers known yet");
        return;
    }
    for peer in peers {
        println!("{}  {}", peer.id(), &peer.pubkey[..27.min(peer.pubkey.len())]);
    }
}

async fn connect(rest: &str, runtime: &onionmesh_node::Runtime) {
    let mut parts = rest.split_whitespace();
    let (Some(host), Some(port)) = (parts.next(), parts.next()) else {
        println!("usage: connect <host> <port>");
        return;
    };
    let Ok(port) = port.parse::<u16>() else {
        println!("bad port: {port}");
        return;
    };
    if let Err(e) = runtime.discovery.manual_connect(host, port).await {
        println!("connect failed: {e}");
    }
}

fn print_chat_log(messages: &[onionmesh_core::Value]) {
    for message in messages {
        let text = message.get("text").and_then(onionmesh_core::Value::as_str).unwrap_or("");
        let ts = message.get("ts").and_then(onionmesh_core::Value::as_str).unwrap_or("");
        let sender = message.get("sender_fp").and_then(onionmesh_core::Value::as_str).unwrap_or("");
        println!("[{ts}] {sender} {text}");
    }
}

fn share_file(path: &str, runtime: &onionmesh_node::Runtime) {
    if path.is_empty() {
        println!("usage: share <path>");
        return;
    }
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            println!("failed to read {path}: {e}");
            return;
        }
    };
    let name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    let hash = runtime.modules.torrent.add_file(&name, &data);
    println!("shared {name} as {hash} ({} bytes)", data.len());
}

fn print_responses(responses: &[String]) {
    if responses.is_empty() {
        println!("no responses yet");
        return;
    }
    for response in responses {
        println!("{response}");
    }
}
