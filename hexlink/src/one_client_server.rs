use std::net::SocketAddr;

use tokio::{
    net::{TcpListener, TcpStream},
    sync::{mpsc, watch},
    task::JoinHandle,
};

/// A TCP server that serves a single client.
///
/// While a client is live, additional connection attempts are closed
/// immediately without disturbing the existing one. Connection-state
/// transitions are published through a watch channel that notifies at most
/// once per actual transition.
///
/// The accepted stream is handed to the owner by [`accept`](Self::accept);
/// the owner reports the end of the session with
/// [`close_client`](Self::close_client) so the next peer can be adopted.
pub struct OneClientServer {
    name: &'static str,
    local_addr: SocketAddr,
    connected_tx: watch::Sender<bool>,
    client_rx: mpsc::Receiver<TcpStream>,
    accept_task: JoinHandle<()>,
}

impl OneClientServer {
    /// Binds the listening socket and starts accepting.
    ///
    /// Bind failures (address or port unavailable) surface here. Pass port 0
    /// to bind an ephemeral port; the bound address is available from
    /// [`local_addr`](Self::local_addr).
    pub async fn bind(name: &'static str, addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let connected_tx = watch::Sender::new(false);
        let (client_tx, client_rx) = mpsc::channel(1);
        let accept_task = tokio::spawn(accept_loop(
            name,
            listener,
            connected_tx.clone(),
            client_tx,
        ));
        tracing::info!(name, %local_addr, "server listening");
        Ok(Self {
            name,
            local_addr,
            connected_tx,
            client_rx,
            accept_task,
        })
    }

    /// The bound listening address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns true if a client is currently adopted.
    pub fn connected(&self) -> bool {
        *self.connected_tx.borrow()
    }

    /// A channel observing connect/disconnect transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.connected_tx.subscribe()
    }

    /// Waits for the next client and adopts it as the current peer.
    ///
    /// Returns `None` once the server is closed.
    pub async fn accept(&mut self) -> Option<TcpStream> {
        self.client_rx.recv().await
    }

    /// Ends the current client session, if any, notifying subscribers once.
    ///
    /// The owner drops the stream it took from [`accept`](Self::accept);
    /// a peer that was accepted but never claimed is dropped here.
    pub fn close_client(&mut self) {
        if let Ok(stream) = self.client_rx.try_recv() {
            drop(stream);
        }
        let changed = self
            .connected_tx
            .send_if_modified(|connected| std::mem::replace(connected, false));
        if changed {
            tracing::info!(name = self.name, "client disconnected");
        }
    }

    /// Stops listening and ends the current client session.
    ///
    /// Idempotent; safe to call multiple times.
    pub fn close(&mut self) {
        self.accept_task.abort();
        self.close_client();
    }
}

impl Drop for OneClientServer {
    fn drop(&mut self) {
        self.close();
    }
}

async fn accept_loop(
    name: &'static str,
    listener: TcpListener,
    connected_tx: watch::Sender<bool>,
    client_tx: mpsc::Sender<TcpStream>,
) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(name, %e, "accept failed");
                continue;
            }
        };
        if *connected_tx.borrow() {
            tracing::error!(name, %peer_addr, "rejecting connection; a client is already connected");
            drop(stream);
            continue;
        }
        connected_tx.send_if_modified(|connected| !std::mem::replace(connected, true));
        tracing::info!(name, %peer_addr, "client connected");
        if client_tx.send(stream).await.is_err() {
            return;
        }
    }
}
