//! Accept loop: binds the control port and hands accepted connections to
//! protocol interpreter threads from a bounded slot pool.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use basalt_vfs::Vfs;
use feldspar_config::FeldsparConfig;
use tracing::{debug, info, warn};

use crate::auth::Authenticator;
use crate::pi;

/// The FTP server: one listener, a bounded pool of interpreter threads.
pub struct FtpServer {
    listener: TcpListener,
    vfs: Arc<dyn Vfs>,
    auth: Arc<dyn Authenticator>,
    max_sessions: usize,
    timeout: Duration,
}

impl FtpServer {
    /// Binds the control port from the configuration. Port 0 picks an
    /// ephemeral port, which tests read back via [`FtpServer::local_addr`].
    pub fn bind(
        config: &FeldsparConfig,
        vfs: Arc<dyn Vfs>,
        auth: Arc<dyn Authenticator>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", config.control_port))?;
        info!(port = listener.local_addr()?.port(), "ftp server listening");
        Ok(Self {
            listener,
            vfs,
            auth,
            max_sessions: config.max_sessions,
            timeout: Duration::from_millis(config.queue_timeout_ms),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop on its own thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("ftp-server".into())
            .spawn(move || self.run())
    }

    /// Accepts control connections forever. A connection gets the first
    /// free interpreter slot (never used, or its thread has finished);
    /// with no slot free the connection is refused by closing it.
    pub fn run(self) {
        let mut slots: Vec<Option<JoinHandle<()>>> = Vec::new();
        slots.resize_with(self.max_sessions, || None);

        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(%err, "failed to accept control connection");
                    continue;
                }
            };

            let index = slots
                .iter()
                .position(|slot| slot.as_ref().is_none_or(|handle| handle.is_finished()));
            let Some(index) = index else {
                warn!("cannot accept new control connection, no interpreter slots available");
                drop(stream);
                continue;
            };
            debug!(%peer, index, "accepted new control connection");

            let vfs = self.vfs.clone();
            let auth = self.auth.clone();
            let timeout = self.timeout;
            let spawned = thread::Builder::new()
                .name(format!("ftp-s-{index:03}-pi"))
                .spawn(move || pi::run_session(stream, peer, index, vfs, auth, timeout));
            match spawned {
                Ok(handle) => slots[index] = Some(handle),
                Err(err) => warn!(%err, "failed to create interpreter thread"),
            }
        }
    }
}
