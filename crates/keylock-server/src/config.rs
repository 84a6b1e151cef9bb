//! Server configuration from command-line flags and environment variables.
//!
//! | Flag         | Environment        | Default   |
//! |--------------|--------------------|-----------|
//! | `--host`     | `KEYLOCK_HOST`     | `0.0.0.0` |
//! | `--port`     | `KEYLOCK_PORT`     | `8080`    |
//! | `--registry` | `KEYLOCK_REGISTRY` | `coarse`  |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use keylock_core::RegistryKind;

/// Advisory lock server for named keys.
#[derive(Debug, Clone, Parser)]
#[command(name = "keylock-server", about = "Advisory lock server for named keys")]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "KEYLOCK_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "KEYLOCK_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Registry implementation: `coarse` (one global guard) or `sharded`.
    #[arg(long, env = "KEYLOCK_REGISTRY", default_value_t = RegistryKind::Coarse)]
    pub registry: RegistryKind,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
