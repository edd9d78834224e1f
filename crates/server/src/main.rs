use std::error::Error;
use std::net::IpAddr;

use chatmux::config::{DEFAULT_BACKLOG, DEFAULT_PORT, DEFAULT_WS_PATH};
use chatmux::protocol::DEFAULT_MAX_FRAME_LENGTH;
use chatmux::websocket::SessionRegistry;
use chatmux::{Server, ServerConfig};
use chatmux_http::connection::DEFAULT_MAX_BODY_SIZE;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod demo;

/// Serves the binary IM protocol, HTTP and WebSocket on one port.
#[derive(Parser, Debug)]
#[command(name = "chatmux", version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Pending connection queue length
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: u32,

    /// Runtime worker threads, defaults to the available parallelism
    #[arg(long)]
    workers: Option<usize>,

    /// Tasks accepting on the listener
    #[arg(long, default_value_t = 1)]
    acceptors: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_LENGTH)]
    max_frame_length: usize,

    /// Largest HTTP body and WebSocket message
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_SIZE)]
    max_body_size: usize,

    #[arg(long, default_value = DEFAULT_WS_PATH)]
    ws_path: String,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, chatmux::ConfigError> {
        let mut builder = ServerConfig::builder()
            .host(self.host)
            .port(self.port)
            .backlog(self.backlog)
            .acceptors(self.acceptors)
            .max_frame_length(self.max_frame_length)
            .max_body_size(self.max_body_size)
            .ws_path(self.ws_path);
        if let Some(workers) = self.workers {
            builder = builder.worker_threads(workers);
        }
        builder.build()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatmux=info,chatmux_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().into_config()?;
    info!(
        address = %config.address,
        workers = config.worker_threads,
        acceptors = config.acceptors,
        ws_path = %config.ws_path,
        "configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name("chatmux-worker")
        .enable_all()
        .build()?;

    let sessions = SessionRegistry::new();
    let server = Server::builder()
        .config(config)
        .sessions(sessions.clone())
        .frame_handler(demo::Echo)
        .http_handler(demo::Pages::new(sessions))
        .websocket_handler(demo::Room)
        .build()?;

    runtime.block_on(async move {
        let listener = server.bind()?;
        tokio::select! {
            () = server.serve(listener) => warn!("every acceptor stopped"),
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("received ctrl-c, shutting down");
            }
        }
        Ok::<_, std::io::Error>(())
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_is_positional() {
        let config = Args::parse_from(["chatmux", "9000", "--acceptors", "2"]).into_config().unwrap();
        assert_eq!(config.address.port(), 9000);
        assert_eq!(config.acceptors, 2);
        assert_eq!(config.ws_path, "/im");
    }

    #[test]
    fn defaults_to_10080() {
        let config = Args::parse_from(["chatmux"]).into_config().unwrap();
        assert_eq!(config.address.port(), 10080);
        assert_eq!(config.max_body_size, 64 * 1024);
    }

    #[test]
    fn invalid_frame_length_is_rejected() {
        let result = Args::parse_from(["chatmux", "--max-frame-length", "100000"]).into_config();
        assert!(result.is_err());
    }
}
