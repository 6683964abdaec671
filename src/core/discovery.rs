//! Broker address resolution
//!
//! A configured host wins. Without one, the broker is assumed to live on
//! this machine and is reached through its own IPv4 address.

use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use tracing::debug;

use crate::config::TransportConfig;
use crate::error::ConnectionError;

/// Public address used only to pick the outbound interface; nothing is sent
const ROUTE_PROBE: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// IPv4 address of the interface that carries outbound traffic
pub fn local_ipv4() -> Result<Ipv4Addr, ConnectionError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .map_err(|_| ConnectionError::NoIpv4Address)?;
    socket
        .connect(ROUTE_PROBE)
        .map_err(|_| ConnectionError::NoIpv4Address)?;

    match socket.local_addr() {
        Ok(SocketAddr::V4(addr)) if !addr.ip().is_unspecified() => Ok(*addr.ip()),
        _ => Err(ConnectionError::NoIpv4Address),
    }
}

/// Where the broker gateway listens
pub fn resolve_broker_addr(transport: &TransportConfig) -> Result<SocketAddr, ConnectionError> {
    let addr = match transport.host.as_deref() {
        Some(host) => resolve_host(host, transport.port)?,
        None => SocketAddr::from((local_ipv4()?, transport.port)),
    };
    debug!(%addr, "broker address resolved");
    Ok(addr)
}

fn resolve_host(host: &str, port: u16) -> Result<SocketAddr, ConnectionError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ConnectionError::Resolve {
            host: host.to_string(),
            source,
        })?;
    addrs
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ConnectionError::Unresolved {
            host: host.to_string(),
        })
}
