use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::responses::{TOO_MANY_CONNECTIONS, format_response};
use crate::server::session::handle_session;
use crate::storage::Storage;

pub struct Server {
    listener: TcpListener,
    storage: Arc<Storage>,
    config: Arc<ServerConfig>,
    sessions: Arc<Semaphore>,
}

impl Server {
    /// Opens the storage root and binds the listener.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let storage = Storage::open(config.storage_root_path())?;
        info!("Storage root: {}", storage.root().path().display());

        let address = config.listen_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        info!("Server bound to {address}");

        Ok(Self {
            listener,
            storage: Arc::new(storage),
            sessions: Arc::new(Semaphore::new(config.max_clients)),
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Accepts connections forever, one task per session.
    pub async fn start(&self) {
        info!(
            "Starting RAX Drive server on {} (max {} clients)",
            self.config.listen_address(),
            self.config.max_clients
        );

        loop {
            let (mut stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting connection: {e}");
                    continue;
                }
            };

            let permit = match Arc::clone(&self.sessions).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Rejected {addr}: too many connections");
                    tokio::spawn(async move {
                        let reply = format_response(
                            TOO_MANY_CONNECTIONS,
                            "Too many connections. Try again later.",
                        );
                        let _ = stream.write_all(reply.as_bytes()).await;
                        let _ = stream.shutdown().await;
                    });
                    continue;
                }
            };

            let storage = Arc::clone(&self.storage);
            let config = Arc::clone(&self.config);

            // Spawn a task for each client so accept loop doesn't block
            tokio::spawn(async move {
                info!("Client connected: {addr}");
                if let Err(e) = handle_session(stream, addr, storage, config).await {
                    warn!("Session with {addr} ended with error: {e}");
                }
                drop(permit);
                info!("Client {addr} disconnected");
            });
        }
    }
}
