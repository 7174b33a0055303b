//! Accept loop: one listener per process, one task per session.
//!
//! Every inbound connection gets its own tokio task owning its tunnel
//! exclusively, so no locking is needed anywhere in the session path.
//! Session failures never escape their task.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::config::{Config, Mode};
use crate::error::Result;
use crate::tunnel;

/// Main server instance for either hop.
pub struct Server {
    config: Arc<Config>,
}

impl Server {
    /// Create a server from a validated configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Bind the listen address and serve sessions until the process exits.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen.to_string()).await?;
        match &self.config.mode {
            Mode::Local { remote } => {
                tracing::info!(
                    "local hop listening on {}, remote hop at {}",
                    self.config.listen,
                    remote
                );
            }
            Mode::Remote => {
                tracing::info!("remote hop listening on {}", self.config.listen);
            }
        }

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!("connection from {}", peer);
                    let config = Arc::clone(&self.config);
                    tokio::spawn(async move {
                        match Self::serve(config, stream).await {
                            Ok(()) => {}
                            Err(e) if e.is_closed() => {}
                            Err(e) => tracing::debug!("session from {} ended: {}", peer, e),
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("accept error: {}", e);
                }
            }
        }
    }

    async fn serve(config: Arc<Config>, stream: TcpStream) -> Result<()> {
        stream.set_nodelay(true)?;
        match &config.mode {
            Mode::Local { remote } => {
                let remote = remote.to_string();
                tunnel::run_local_session(stream, &config.key, move || async move {
                    let link = TcpStream::connect(remote).await?;
                    link.set_nodelay(true)?;
                    Ok(link)
                })
                .await
            }
            Mode::Remote => {
                tunnel::run_remote_session(stream, &config.key, |target| async move {
                    TcpStream::connect(target.to_string()).await
                })
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;

    #[test]
    fn test_server_from_config() {
        let config = ConfigFile::local_template().to_local_config().unwrap();
        let server = Server::new(config);
        assert!(matches!(server.config.mode, Mode::Local { .. }));
    }
}
