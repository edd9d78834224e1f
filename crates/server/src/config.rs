//! Server settings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

use chatmux_http::connection::DEFAULT_MAX_BODY_SIZE;
use thiserror::Error;

use crate::protocol::DEFAULT_MAX_FRAME_LENGTH;

pub const DEFAULT_PORT: u16 = 10080;
pub const DEFAULT_BACKLOG: u32 = 1024;
pub const DEFAULT_WS_PATH: &str = "/im";
pub const DEFAULT_CLASSIFY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Validated settings shared read-only by every connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub backlog: u32,
    /// Number of tasks accepting on the shared listener.
    pub acceptors: usize,
    /// Runtime worker threads, used by whoever builds the runtime.
    pub worker_threads: usize,
    /// Largest binary frame payload, at most `u16::MAX`.
    pub max_frame_length: usize,
    /// Largest aggregated HTTP body, also the largest WebSocket message.
    pub max_body_size: usize,
    pub ws_path: String,
    pub classify_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            backlog: DEFAULT_BACKLOG,
            acceptors: 1,
            worker_threads: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            ws_path: DEFAULT_WS_PATH.to_owned(),
            classify_timeout: DEFAULT_CLASSIFY_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backlog must be positive")]
    ZeroBacklog,
    #[error("at least one acceptor is required")]
    ZeroAcceptors,
    #[error("at least one worker thread is required")]
    ZeroWorkers,
    #[error("max frame length {0} exceed the header limit {max}", max = u16::MAX)]
    FrameLengthOutOfRange(usize),
    #[error("max body size must be positive")]
    ZeroBodySize,
    #[error("websocket path must start with '/', found {0:?}")]
    InvalidWsPath(String),
    #[error("timeouts must be positive")]
    ZeroTimeout,
}

/// Builds a [`ServerConfig`], checking every setting in [`build`](Self::build).
#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    config: ServerConfig,
}

impl ConfigBuilder {
    pub fn address(mut self, address: SocketAddr) -> Self {
        self.config.address = address;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.address.set_port(port);
        self
    }

    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.address.set_ip(host);
        self
    }

    pub fn backlog(mut self, backlog: u32) -> Self {
        self.config.backlog = backlog;
        self
    }

    pub fn acceptors(mut self, acceptors: usize) -> Self {
        self.config.acceptors = acceptors;
        self
    }

    pub fn worker_threads(mut self, worker_threads: usize) -> Self {
        self.config.worker_threads = worker_threads;
        self
    }

    pub fn max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.config.max_frame_length = max_frame_length;
        self
    }

    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.config.max_body_size = max_body_size;
        self
    }

    pub fn ws_path(mut self, ws_path: impl Into<String>) -> Self {
        self.config.ws_path = ws_path.into();
        self
    }

    pub fn classify_timeout(mut self, classify_timeout: Duration) -> Self {
        self.config.classify_timeout = classify_timeout;
        self
    }

    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.config.idle_timeout = idle_timeout;
        self
    }

    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let config = self.config;
        if config.backlog == 0 {
            return Err(ConfigError::ZeroBacklog);
        }
        if config.acceptors == 0 {
            return Err(ConfigError::ZeroAcceptors);
        }
        if config.worker_threads == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if config.max_frame_length > usize::from(u16::MAX) {
            return Err(ConfigError::FrameLengthOutOfRange(config.max_frame_length));
        }
        if config.max_body_size == 0 {
            return Err(ConfigError::ZeroBodySize);
        }
        if !config.ws_path.starts_with('/') {
            return Err(ConfigError::InvalidWsPath(config.ws_path));
        }
        if config.classify_timeout.is_zero() || config.idle_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(config)
    }
}
