// client.rs - client side of the wire protocol
//
// One `EngineClient` owns one connection. Calls can be issued
// concurrently from clones of the client; each gets its own id and the
// reader task routes every reply back to the call waiting for it.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, BufWriter};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::grid::Grid;
use crate::params::{Progress, RunParameters};
use crate::wire::{self, Reply, Request, RequestFrame, ResponseFrame, SaveReply};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unable to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("connection to engine lost")]
    Disconnected,

    #[error("engine refused: {0}")]
    Remote(#[from] EngineError),

    #[error("unexpected reply to {0}")]
    UnexpectedReply(&'static str),
}

type Pending = HashMap<u64, oneshot::Sender<Result<Reply, EngineError>>>;

/// Calls awaiting a reply; `None` once the connection is gone.
struct PendingCalls(Mutex<Option<Pending>>);

impl PendingCalls {
    fn lock(&self) -> MutexGuard<'_, Option<Pending>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Shared {
    next_id: AtomicU64,
    pending: Arc<PendingCalls>,
    // Dropping the last client drops this, which closes the connection.
    outgoing: mpsc::UnboundedSender<RequestFrame>,
}

#[derive(Clone)]
pub struct EngineClient {
    shared: Arc<Shared>,
}

impl EngineClient {
    pub async fn connect<A>(addr: A) -> Result<Self, ClientError>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let label = addr.to_string();
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect { addr: label, source })?;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        let (outgoing, mut rx) = mpsc::unbounded_channel::<RequestFrame>();
        let pending = Arc::new(PendingCalls(Mutex::new(Some(HashMap::new()))));

        tokio::spawn(async move {
            let mut write = BufWriter::new(write);
            while let Some(frame) = rx.recv().await {
                if let Err(err) = wire::write_frame(&mut write, &frame).await {
                    warn!(%err, "failed to send request");
                    break;
                }
            }
        });
        tokio::spawn(read_replies(read, Arc::clone(&pending)));

        Self {
            shared: Arc::new(Shared {
                next_id: AtomicU64::new(1),
                pending,
                outgoing,
            }),
        }
    }

    async fn call(&self, request: Request) -> Result<Reply, ClientError> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        match self.shared.pending.lock().as_mut() {
            Some(pending) => {
                pending.insert(id, tx);
            }
            None => return Err(ClientError::Disconnected),
        }

        if self.shared.outgoing.send(RequestFrame { id, request }).is_err() {
            if let Some(pending) = self.shared.pending.lock().as_mut() {
                pending.remove(&id);
            }
            return Err(ClientError::Disconnected);
        }

        Ok(rx.await.map_err(|_| ClientError::Disconnected)??)
    }

    pub async fn is_already_running(&self, params: RunParameters) -> Result<bool, ClientError> {
        match self.call(Request::IsAlreadyRunning(params)).await? {
            Reply::Running(running) => Ok(running),
            _ => Err(ClientError::UnexpectedReply("IsAlreadyRunning")),
        }
    }

    pub async fn start(&self, params: RunParameters, world: Grid) -> Result<Grid, ClientError> {
        match self.call(Request::Start { params, world }).await? {
            Reply::World(world) => Ok(world),
            _ => Err(ClientError::UnexpectedReply("Start")),
        }
    }

    pub async fn continue_run(&self) -> Result<Grid, ClientError> {
        match self.call(Request::Continue).await? {
            Reply::World(world) => Ok(world),
            _ => Err(ClientError::UnexpectedReply("Continue")),
        }
    }

    pub async fn save(&self) -> Result<SaveReply, ClientError> {
        self.snapshot(Request::Save).await
    }

    pub async fn pause(&self) -> Result<SaveReply, ClientError> {
        self.snapshot(Request::Pause).await
    }

    pub async fn execute(&self) -> Result<SaveReply, ClientError> {
        self.snapshot(Request::Execute).await
    }

    async fn snapshot(&self, request: Request) -> Result<SaveReply, ClientError> {
        let name = request.name();
        match self.call(request).await? {
            Reply::Snapshot(snapshot) => Ok(snapshot),
            _ => Err(ClientError::UnexpectedReply(name)),
        }
    }

    pub async fn quit(&self) -> Result<u64, ClientError> {
        match self.call(Request::Quit).await? {
            Reply::Turns(turns) => Ok(turns),
            _ => Err(ClientError::UnexpectedReply("Quit")),
        }
    }

    pub async fn get_alive_cells(&self) -> Result<Progress, ClientError> {
        match self.call(Request::GetAliveCells).await? {
            Reply::AliveCells(progress) => Ok(progress),
            _ => Err(ClientError::UnexpectedReply("GetAliveCells")),
        }
    }
}

async fn read_replies(read: OwnedReadHalf, pending: Arc<PendingCalls>) {
    let mut lines = BufReader::new(read).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "reading replies failed");
                break;
            }
        };
        let frame = match wire::decode::<ResponseFrame>(&line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "undecodable reply");
                continue;
            }
        };
        let waiter = pending.lock().as_mut().and_then(|p| p.remove(&frame.id));
        match waiter {
            Some(waiter) => {
                let _ = waiter.send(frame.result);
            }
            None => debug!(id = frame.id, "reply with no caller"),
        }
    }
    // Dropping the senders fails every outstanding call with Disconnected.
    pending.lock().take();
    debug!("reply reader finished");
}
