//! The web front end: page handlers, views and the HTTP server that hosts them.

mod controller;
mod instrument;
mod routes;
mod server;
mod tls;
mod view;

use std::{
    net::{Ipv4Addr, SocketAddr, ToSocketAddrs},
    path::PathBuf,
};

use anyhow::Context;
use clap::Args;
use http_body_util::Full;
use hyper::body::Bytes;

pub use controller::{DisplayResult, HomeController, ABOUT_MESSAGE, CONTACT_MESSAGE};
pub use instrument::MatchedRoute;
pub use routes::{Route, WELL_KNOWN_PREFIX};
pub use server::HttpServer;
pub use tls::TlsConfig;
pub use view::{Layout, ViewData};

/// Response body type used by the server.
pub type Body = Full<Bytes>;

pub(crate) mod body {
    use super::*;

    pub fn full(bytes: impl Into<Bytes>) -> Body {
        Full::new(bytes.into())
    }

    pub fn empty() -> Body {
        Full::default()
    }
}

#[derive(Args, Debug)]
pub struct CliArgs {
    /// IP address and port to listen on
    #[clap(long = "listen", default_value = "127.0.0.1:3000", value_parser = parse_listen_addr)]
    pub address: SocketAddr,

    /// The path to the certificate to use for https, if this is not set, normal http will be used. The cert should be in PEM format
    #[clap(long, env = "KVWEB_TLS_CERT", requires = "tls-key")]
    pub tls_cert: Option<PathBuf>,

    /// The path to the certificate key to use for https, if this is not set, normal http will be used. The key should be in PKCS#8 format
    #[clap(long, env = "KVWEB_TLS_KEY", requires = "tls-cert")]
    pub tls_key: Option<PathBuf>,
}

impl CliArgs {
    pub fn into_tls_config(self) -> Option<TlsConfig> {
        match (self.tls_cert, self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path,
                key_path,
            }),
            // clap enforces that the two are given together
            _ => None,
        }
    }
}

fn parse_listen_addr(addr: &str) -> anyhow::Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
    // Prefer 127.0.0.1 over e.g. [::1]
    if let Some(addr) = addrs
        .iter()
        .find(|addr| addr.is_ipv4() && addr.ip() == Ipv4Addr::LOCALHOST)
    {
        return Ok(*addr);
    }
    // Otherwise, take the first addr (OS preference)
    addrs.into_iter().next().context("couldn't resolve address")
}
