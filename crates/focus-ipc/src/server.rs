//! IPC server implementation

use focus_api::{Command, Event, Request, Response};
use focus_util::ClientId;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::{IpcError, IpcResult};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Message from the server to the daemon
pub enum ServerMessage {
    Request {
        client_id: ClientId,
        request: Request,
    },
    ClientConnected {
        client_id: ClientId,
        uid: Option<u32>,
    },
    ClientDisconnected {
        client_id: ClientId,
    },
}

/// Server-side view of one connected client
struct Peer {
    outbox: mpsc::UnboundedSender<String>,
    subscribed: Arc<AtomicBool>,
}

type PeerMap = Arc<RwLock<HashMap<ClientId, Peer>>>;

/// Unix socket server speaking newline-delimited JSON
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    peers: PeerMap,
    event_tx: broadcast::Sender<Event>,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
    message_rx: Mutex<Option<mpsc::UnboundedReceiver<ServerMessage>>>,
}

impl IpcServer {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            listener: None,
            peers: PeerMap::default(),
            event_tx,
            message_tx,
            message_rx: Mutex::new(Some(message_rx)),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Bind the socket, replacing a stale one
    pub async fn start(&mut self) -> IpcResult<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        // Owner only: every client may edit the planner
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;

        info!(path = %self.socket_path.display(), "IPC server listening");
        self.listener = Some(listener);
        Ok(())
    }

    /// Receiver for client requests; can be taken once
    pub async fn take_message_receiver(&self) -> Option<mpsc::UnboundedReceiver<ServerMessage>> {
        self.message_rx.lock().await.take()
    }

    /// Accept connections until the task is dropped
    pub async fn run(&self) -> IpcResult<()> {
        let Some(listener) = self.listener.as_ref() else {
            return Err(IpcError::ServerError("Server not started".into()));
        };

        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            };
            self.register(stream).await;
        }
    }

    /// Track a new connection and spawn its reader and writer tasks
    async fn register(&self, stream: UnixStream) {
        let client_id = ClientId::new();
        let uid = peer_uid(&stream);
        info!(client_id = %client_id, uid = ?uid, "Client connected");

        let (outbox, inbox) = mpsc::unbounded_channel();
        let subscribed = Arc::new(AtomicBool::new(false));
        self.peers.write().await.insert(
            client_id.clone(),
            Peer {
                outbox,
                subscribed: subscribed.clone(),
            },
        );
        let _ = self.message_tx.send(ServerMessage::ClientConnected {
            client_id: client_id.clone(),
            uid,
        });

        let (read_half, write_half) = stream.into_split();
        tokio::spawn(read_requests(
            BufReader::new(read_half),
            client_id.clone(),
            subscribed.clone(),
            self.peers.clone(),
            self.message_tx.clone(),
        ));
        tokio::spawn(write_outgoing(
            write_half,
            client_id,
            subscribed,
            inbox,
            self.event_tx.subscribe(),
            self.peers.clone(),
            self.message_tx.clone(),
        ));
    }

    /// Queue a response for one client; unknown clients are ignored
    pub async fn send_response(&self, client_id: &ClientId, response: Response) -> IpcResult<()> {
        let json = serde_json::to_string(&response)?;
        match self.peers.read().await.get(client_id) {
            Some(peer) => peer.outbox.send(json).map_err(|_| IpcError::ConnectionClosed),
            None => Ok(()),
        }
    }

    /// Fan an event out to subscribed clients
    pub fn broadcast_event(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    pub async fn client_count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Remove the socket file
    pub fn shutdown(&self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

/// Parse request lines until EOF, then drop the peer
async fn read_requests(
    mut reader: BufReader<OwnedReadHalf>,
    client_id: ClientId,
    subscribed: Arc<AtomicBool>,
    peers: PeerMap,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(client_id = %client_id, error = %e, "Read error");
                break;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<Request>(line.trim()) {
            Ok(request) => request,
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Invalid request");
                continue;
            }
        };
        if matches!(request.command, Command::SubscribeEvents) {
            subscribed.store(true, Ordering::SeqCst);
        }
        let _ = message_tx.send(ServerMessage::Request {
            client_id: client_id.clone(),
            request,
        });
    }

    debug!(client_id = %client_id, "Client closed its end");
    // Dropping the peer closes the writer's inbox
    peers.write().await.remove(&client_id);
}

/// Write queued responses and, once subscribed, broadcast events
async fn write_outgoing(
    mut writer: OwnedWriteHalf,
    client_id: ClientId,
    subscribed: Arc<AtomicBool>,
    mut inbox: mpsc::UnboundedReceiver<String>,
    mut events: broadcast::Receiver<Event>,
    peers: PeerMap,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    loop {
        let mut line = tokio::select! {
            response = inbox.recv() => match response {
                Some(json) => json,
                None => break,
            },
            event = events.recv() => match event {
                Ok(event) if subscribed.load(Ordering::SeqCst) => {
                    match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode event");
                            continue;
                        }
                    }
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(client_id = %client_id, skipped, "Client lagging, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!(client_id = %client_id, error = %e, "Write error");
            break;
        }
    }

    peers.write().await.remove(&client_id);
    let _ = message_tx.send(ServerMessage::ClientDisconnected { client_id });
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn peer_uid(stream: &UnixStream) -> Option<u32> {
    use std::os::unix::io::AsFd;

    let fd = stream.as_fd();
    nix::sys::socket::getsockopt(&fd, nix::sys::socket::sockopt::PeerCredentials)
        .ok()
        .map(|cred| cred.uid())
}
