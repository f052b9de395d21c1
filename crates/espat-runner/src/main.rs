//! Console runner: the firmware core on stdin/stdout with a real TCP
//! listener behind `CIPSERVER`.
//!
//! The process is the "device": AT commands typed on stdin are answered on
//! stdout, and remote clients connect over TCP to occupy link slots. One
//! cooperative loop services the engine; there is no async runtime.

mod net;

use std::error::Error;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use espat_core::{AtEngine, FirmwareConfig, MockWireless};
use espat_link::Listener;

use crate::net::TcpGateway;

#[derive(Parser, Debug)]
#[command(name = "espat", about = "AT command firmware core on a console")]
struct Args {
    /// JSON configuration file; missing fields use built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        tracing::error!(%e, "runner failed");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<FirmwareConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(FirmwareConfig::default()),
    }
}

/// Read stdin on its own thread; the main loop must never block.
fn spawn_console() -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut chunk = [0u8; 256];
        loop {
            match stdin.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = load_config(args.config.as_ref())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))?;
    }

    let console = spawn_console();
    let mut engine = AtEngine::new(config.clone(), Box::new(MockWireless::new()))?;
    let mut gateway: Option<TcpGateway> = None;

    println!("{}", engine.greeting());

    while !shutdown.load(Ordering::SeqCst) {
        let input = match console.try_recv() {
            Ok(bytes) => bytes,
            Err(TryRecvError::Empty) => Vec::new(),
            Err(TryRecvError::Disconnected) => break,
        };

        // Keep the TCP listener in step with the CIPSERVER state.
        let server = engine.context().server;
        if server.running {
            let rebind = gateway.as_ref().map_or(true, |g| g.port() != server.port);
            if rebind {
                match TcpGateway::bind(server.port) {
                    Ok(bound) => gateway = Some(bound),
                    Err(e) => {
                        tracing::error!(%e, port = server.port, "bind failed");
                        engine.context_mut().server.running = false;
                        gateway = None;
                    }
                }
            }
        } else if gateway.is_some() {
            tracing::info!("listener released");
            gateway = None;
        }

        let listener = gateway.as_mut().map(|g| g as &mut dyn Listener);
        for line in engine.service(&input, listener) {
            println!("{}", line);
        }

        if engine.reset_requested() {
            tracing::info!("restarting engine");
            gateway = None;
            engine = AtEngine::new(config.clone(), Box::new(MockWireless::new()))?;
            println!("{}", engine.greeting());
        }

        if input.is_empty() {
            thread::sleep(Duration::from_millis(2));
        }
    }

    tracing::info!("shutting down");
    Ok(())
}
