//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use beamcast_shared::constants::{DEFAULT_CLEANUP_GRACE_SECS, DEFAULT_MAX_ROOMS, DEFAULT_PORT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the WebSocket endpoint listens on.
    /// Env: `PORT`
    /// Default: `0.0.0.0:3000`
    pub listen_addr: SocketAddr,

    /// Hard cap on concurrent rooms.
    /// Env: `MAX_ROOMS`
    /// Default: `5`
    pub max_rooms: usize,

    /// Grace period after a room becomes empty during which a join can
    /// still revive it.
    /// Env: `ROOM_CLEANUP_GRACE_SECS`
    /// Default: 60 seconds
    pub cleanup_grace: Duration,

    /// PEM certificate chain for the TLS listener.
    /// Env: `TLS_CERT_PATH`
    /// Default: unset (plain TCP)
    pub tls_cert: Option<PathBuf>,

    /// PEM private key for the TLS listener.
    /// Env: `TLS_KEY_PATH`
    /// Default: unset (plain TCP)
    pub tls_key: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: ([0, 0, 0, 0], DEFAULT_PORT).into(),
            max_rooms: DEFAULT_MAX_ROOMS,
            cleanup_grace: Duration::from_secs(DEFAULT_CLEANUP_GRACE_SECS),
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.listen_addr = ([0, 0, 0, 0], parsed).into();
            } else {
                tracing::warn!(value = %port, "Invalid PORT, using default");
            }
        }

        if let Ok(val) = std::env::var("MAX_ROOMS") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_rooms = n;
            } else {
                tracing::warn!(value = %val, "Invalid MAX_ROOMS, using default");
            }
        }

        if let Ok(val) = std::env::var("ROOM_CLEANUP_GRACE_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.cleanup_grace = Duration::from_secs(secs);
            } else {
                tracing::warn!(value = %val, "Invalid ROOM_CLEANUP_GRACE_SECS, using default");
            }
        }

        if let Ok(path) = std::env::var("TLS_CERT_PATH") {
            if !path.is_empty() {
                config.tls_cert = Some(PathBuf::from(path));
            }
        }

        if let Ok(path) = std::env::var("TLS_KEY_PATH") {
            if !path.is_empty() {
                config.tls_key = Some(PathBuf::from(path));
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// Certificate and key paths, when both are configured.
    /// TLS is only enabled with the complete pair.
    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, ([0, 0, 0, 0], 3000).into());
        assert_eq!(config.max_rooms, 5);
        assert_eq!(config.cleanup_grace, Duration::from_secs(60));
        assert!(config.tls_paths().is_none());
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let mut config = ServerConfig::default();
        config.tls_cert = Some(PathBuf::from("/etc/beamcast/cert.pem"));
        assert!(config.tls_paths().is_none());

        config.tls_key = Some(PathBuf::from("/etc/beamcast/key.pem"));
        assert!(config.tls_paths().is_some());
    }
}
