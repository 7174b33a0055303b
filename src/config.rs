//! Runtime configuration for the two hops.
//!
//! A [`ConfigFile`] is the TOML shape read from disk; [`Config`] is the
//! validated runtime form. All validation happens before the server
//! starts: a bad port or wrong-length secret is a startup-time fatal
//! error, never a runtime one.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::cipher::CipherKey;
use crate::error::{Error, Result};

/// Which hop this process plays.
#[derive(Debug, Clone)]
pub enum Mode {
    /// Client-facing hop: accepts SOCKS5 and forwards to the remote hop
    Local {
        /// Address of the remote hop
        remote: Address,
    },
    /// Destination-facing hop: accepts encrypted links and connects out
    Remote,
}

/// Validated runtime configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Listen address for inbound connections
    pub listen: Address,
    /// Hop role
    pub mode: Mode,
    /// Shared secret, identical on both hops
    pub key: CipherKey,
}

/// Configuration file format.
///
/// `remote_host`/`remote_port` are required for the local hop and absent
/// for the remote hop.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Listen host (IP literal or hostname)
    pub listen_host: String,
    /// Listen port, 1-65535
    pub listen_port: u16,
    /// Remote hop host (local hop only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_host: Option<String>,
    /// Remote hop port, 1-65535 (local hop only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<u16>,
    /// Shared secret, exactly 32 bytes
    pub key: String,
}

impl ConfigFile {
    /// Template for a local-hop configuration, for `--generate`.
    pub fn local_template() -> Self {
        Self {
            listen_host: "127.0.0.1".into(),
            listen_port: 5050,
            remote_host: Some("203.0.113.1".into()),
            remote_port: Some(6060),
            key: "change me to a 32 byte secret!!!".into(),
        }
    }

    /// Template for a remote-hop configuration, for `--generate`.
    pub fn remote_template() -> Self {
        Self {
            listen_host: "0.0.0.0".into(),
            listen_port: 6060,
            remote_host: None,
            remote_port: None,
            key: "change me to a 32 byte secret!!!".into(),
        }
    }

    /// Validate into a local-hop runtime configuration.
    pub fn to_local_config(&self) -> Result<Config> {
        let (remote_host, remote_port) = match (&self.remote_host, self.remote_port) {
            (Some(host), Some(port)) => (host.as_str(), port),
            _ => {
                return Err(Error::config(
                    "local hop requires remote_host and remote_port",
                ))
            }
        };
        if remote_port == 0 {
            return Err(Error::config("remote_port must be in 1-65535"));
        }
        Ok(Config {
            listen: self.listen_addr()?,
            mode: Mode::Local {
                remote: Address::from_host_order(remote_host, remote_port)?,
            },
            key: self.key()?,
        })
    }

    /// Validate into a remote-hop runtime configuration.
    pub fn to_remote_config(&self) -> Result<Config> {
        if self.remote_host.is_some() || self.remote_port.is_some() {
            return Err(Error::config(
                "remote hop takes no remote_host/remote_port",
            ));
        }
        Ok(Config {
            listen: self.listen_addr()?,
            mode: Mode::Remote,
            key: self.key()?,
        })
    }

    fn listen_addr(&self) -> Result<Address> {
        if self.listen_port == 0 {
            return Err(Error::config("listen_port must be in 1-65535"));
        }
        Address::from_host_order(&self.listen_host, self.listen_port)
    }

    fn key(&self) -> Result<CipherKey> {
        CipherKey::from_secret(self.key.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_template_validates() {
        let file = ConfigFile::local_template();
        let config = file.to_local_config().unwrap();
        assert_eq!(config.listen.to_string(), "127.0.0.1:5050");
        match config.mode {
            Mode::Local { remote } => assert_eq!(remote.to_string(), "203.0.113.1:6060"),
            Mode::Remote => panic!("expected local mode"),
        }
    }

    #[test]
    fn test_remote_template_validates() {
        let file = ConfigFile::remote_template();
        let config = file.to_remote_config().unwrap();
        assert!(matches!(config.mode, Mode::Remote));
    }

    #[test]
    fn test_template_toml_roundtrip() {
        let file = ConfigFile::local_template();
        let toml_text = toml::to_string_pretty(&file).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_text).unwrap();
        assert!(parsed.to_local_config().is_ok());

        let remote_toml = toml::to_string_pretty(&ConfigFile::remote_template()).unwrap();
        assert!(!remote_toml.contains("remote_host"));
    }

    #[test]
    fn test_wrong_length_key_is_fatal() {
        let mut file = ConfigFile::local_template();
        file.key = "only10byte".into();
        assert!(matches!(
            file.to_local_config().unwrap_err(),
            Error::KeySize {
                expected: 32,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_port_zero_is_fatal() {
        let mut file = ConfigFile::local_template();
        file.listen_port = 0;
        assert!(matches!(
            file.to_local_config().unwrap_err(),
            Error::Config(_)
        ));

        let mut file = ConfigFile::local_template();
        file.remote_port = Some(0);
        assert!(file.to_local_config().is_err());
    }

    #[test]
    fn test_local_mode_requires_remote() {
        let mut file = ConfigFile::local_template();
        file.remote_host = None;
        assert!(matches!(
            file.to_local_config().unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn test_remote_mode_rejects_remote_fields() {
        let file = ConfigFile::local_template();
        assert!(file.to_remote_config().is_err());
    }
}
