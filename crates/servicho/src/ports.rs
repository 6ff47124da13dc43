//! Port allocation from a fixed candidate pool.
//!
//! The HTTP server and the push channel each need a port. Both are picked
//! at startup by probing the pool in order, so a stale browser tab from a
//! previous run never talks to the wrong listener.

use crate::error::{Result, ServeError};
use std::net::{IpAddr, TcpListener};
use std::ops::RangeInclusive;

/// Ports probed when no pool is configured.
pub const DEFAULT_PORT_RANGE: RangeInclusive<u16> = 13001..=13010;

/// Ports needed by one session: HTTP first, push channel second.
pub const SESSION_PORT_COUNT: usize = 2;

/// The default candidate pool as a list.
pub fn default_pool() -> Vec<u16> {
    DEFAULT_PORT_RANGE.collect()
}

/// Check whether `port` can currently be bound on `host`.
///
/// The probe listener is dropped before returning, so the port is free
/// again for the real listener.
pub fn is_port_available(host: IpAddr, port: u16) -> bool {
    TcpListener::bind((host, port)).is_ok()
}

/// Pick the first `count` free ports from `pool`, preserving pool order.
///
/// Duplicate entries are probed once, so the returned ports are distinct.
///
/// # Errors
///
/// Returns [`ServeError::NoAvailablePort`] when the pool is exhausted first.
/// The pool is static, so retrying cannot help.
pub fn allocate(host: IpAddr, pool: &[u16], count: usize) -> Result<Vec<u16>> {
    let mut allocated = Vec::with_capacity(count);

    for &port in pool {
        if allocated.len() == count {
            break;
        }
        if allocated.contains(&port) {
            continue;
        }

        if is_port_available(host, port) {
            tracing::debug!(port, "port is available");
            allocated.push(port);
        } else {
            tracing::debug!(port, "port is busy, trying next candidate");
        }
    }

    if allocated.len() < count {
        return Err(ServeError::NoAvailablePort {
            needed: count,
            pool: pool.to_vec(),
        });
    }

    Ok(allocated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// Bind `n` ephemeral listeners and return them with their ports.
    fn reserve(n: usize) -> Vec<(TcpListener, u16)> {
        (0..n)
            .map(|_| {
                let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
                let port = listener.local_addr().unwrap().port();
                (listener, port)
            })
            .collect()
    }

    #[test]
    fn test_default_pool() {
        let pool = default_pool();
        assert_eq!(pool.len(), 10);
        assert_eq!(pool.first(), Some(&13001));
        assert_eq!(pool.last(), Some(&13010));
    }

    #[test]
    fn test_allocate_skips_occupied_ports_in_order() {
        let mut reserved = reserve(4);
        let pool: Vec<u16> = reserved.iter().map(|(_, port)| *port).collect();

        // Keep the first two bound, release the last two.
        reserved.truncate(2);

        let ports = allocate(LOCALHOST, &pool, 2).unwrap();
        assert_eq!(ports, vec![pool[2], pool[3]]);
    }

    #[test]
    fn test_allocate_fails_when_pool_exhausted() {
        let reserved = reserve(2);
        let pool: Vec<u16> = reserved.iter().map(|(_, port)| *port).collect();

        let err = allocate(LOCALHOST, &pool, 2).unwrap_err();
        match err {
            ServeError::NoAvailablePort { needed, pool: probed } => {
                assert_eq!(needed, 2);
                assert_eq!(probed, pool);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_allocate_ignores_duplicates() {
        let reserved = reserve(2);
        let pool: Vec<u16> = reserved.iter().map(|(_, port)| *port).collect();
        drop(reserved);

        let ports = allocate(LOCALHOST, &[pool[0], pool[0], pool[1]], 2).unwrap();
        assert_eq!(ports, vec![pool[0], pool[1]]);
    }

    #[test]
    fn test_port_is_free_after_probe() {
        let (listener, port) = reserve(1).pop().unwrap();
        drop(listener);

        assert!(is_port_available(LOCALHOST, port));
        // The probe must not keep the port bound.
        assert!(is_port_available(LOCALHOST, port));
    }
}
