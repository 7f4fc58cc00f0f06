// server.rs - TCP listener: one task per connection, one task per request

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::service::Engine;
use crate::wire::{self, RequestFrame, ResponseFrame};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);      // Pause after a failed accept

/// Source of incoming connections.
trait Incoming {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Incoming for TcpListener {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Accepts connections until `shutdown` resolves.
///
/// Runs already in flight are left alone; only the listener stops. A failed
/// accept (descriptor exhaustion, an aborted handshake) is logged and retried.
pub async fn serve<F>(listener: TcpListener, engine: Engine, shutdown: F)
where
    F: Future<Output = ()>,
{
    accept_loop(&listener, engine, shutdown).await
}

async fn accept_loop<L, F>(listener: &L, engine: Engine, shutdown: F)
where
    L: Incoming,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!(%peer, "connection accepted");
                    tokio::spawn(connection(stream, peer, engine.clone()));
                }
                Err(err) => {
                    warn!(%err, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            () = &mut shutdown => {
                info!("shutting down listener");
                return;
            }
        }
    }
}

async fn connection(stream: TcpStream, peer: SocketAddr, engine: Engine) {
    match handle_connection(stream, engine).await {
        Ok(()) => info!(%peer, "connection closed"),
        Err(err) => warn!(%peer, %err, "connection failed"),
    }
}

async fn handle_connection(stream: TcpStream, engine: Engine) -> io::Result<()> {
    let (read, write) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ResponseFrame>();

    // Replies are produced by many request tasks; one writer keeps frames whole.
    let writer = tokio::spawn(async move {
        let mut write = BufWriter::new(write);
        while let Some(frame) = rx.recv().await {
            wire::write_frame(&mut write, &frame).await?;
        }
        Ok::<_, io::Error>(())
    });

    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match wire::decode::<RequestFrame>(&line) {
            Ok(RequestFrame { id, request }) => {
                debug!(id, op = request.name(), "request");
                let engine = engine.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = engine.handle(request).await;
                    if let Err(err) = &result {
                        debug!(id, %err, "request refused");
                    }
                    // The peer may be gone by the time a long Start returns.
                    let _ = tx.send(ResponseFrame { id, result });
                });
            }
            Err(err) => {
                warn!(%err, "undecodable request");
                let _ = tx.send(ResponseFrame {
                    id: wire::recover_id(&line),
                    result: Err(EngineError::Malformed(err.to_string())),
                });
            }
        }
    }

    // Outstanding request tasks hold their own senders, so the writer keeps
    // running until the last of them has replied.
    drop(tx);
    writer.await.map_err(io::Error::other)?
}
