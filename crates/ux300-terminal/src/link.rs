use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::SinkExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use ux300_frame::{ControlSignal, FrameAssembler, FrameCodec, FrameConfig, Inbound, Outbound};

use crate::dispatcher::MessageDispatcher;
use crate::error::{Result, TerminalError};
use crate::events::{EventBus, TerminalEvent};
use crate::handshake::{HandshakeKind, HandshakeTable};

const READ_CHUNK_SIZE: usize = 256;

struct WriteRequest {
    item: Outbound,
    done: Option<oneshot::Sender<io::Result<()>>>,
}

/// Everything a link needs besides its stream.
#[derive(Debug, Clone)]
pub(crate) struct LinkContext {
    pub frame: FrameConfig,
    pub dispatcher: MessageDispatcher,
    pub bus: EventBus,
    pub write_queue: usize,
}

struct Shared {
    endpoint: String,
    cancel: CancellationToken,
    handshakes: Mutex<HandshakeTable>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn handshakes(&self) -> MutexGuard<'_, HandshakeTable> {
        self.handshakes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the link closed. Pending handshakes fail before the link reads
    /// as closed.
    fn shut(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.handshakes().clear();
        self.cancel.cancel();
    }
}

/// One open stream to the terminal, driven by a reader and a writer task.
///
/// The reader feeds the assembler, dispatches frames, resolves handshakes
/// and queues ACKs. The writer owns the write half and serializes every
/// outbound item. Either task shuts the link down on EOF or I/O failure.
#[derive(Clone)]
pub(crate) struct Link {
    shared: Arc<Shared>,
    writes: mpsc::Sender<WriteRequest>,
}

impl Link {
    pub(crate) fn spawn<S>(stream: S, ctx: LinkContext, endpoint: String) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (writes, requests) = mpsc::channel(ctx.write_queue.max(1));
        let shared = Arc::new(Shared {
            endpoint,
            cancel: CancellationToken::new(),
            handshakes: Mutex::new(HandshakeTable::new()),
            tasks: Mutex::new(Vec::new()),
        });

        let writer_task = tokio::spawn(write_loop(
            writer,
            requests,
            ctx.bus.clone(),
            Arc::clone(&shared),
        ));
        let reader_task = tokio::spawn(read_loop(
            reader,
            ctx,
            Arc::clone(&shared),
            writes.clone(),
        ));
        shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([reader_task, writer_task]);

        Self { shared, writes }
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Queue `item` and wait until it has been flushed to the stream.
    pub(crate) async fn write(&self, item: Outbound) -> Result<()> {
        if self.is_closed() {
            return Err(TerminalError::NotOpen);
        }
        let (done, completed) = oneshot::channel();
        self.writes
            .send(WriteRequest {
                item,
                done: Some(done),
            })
            .await
            .map_err(|_| TerminalError::NotOpen)?;
        completed.await.map_err(|_| TerminalError::Closed)??;
        Ok(())
    }

    pub(crate) fn register(&self, kind: HandshakeKind) -> Result<oneshot::Receiver<()>> {
        self.shared.handshakes().register(kind)
    }

    pub(crate) fn cancel_handshake(&self, kind: HandshakeKind) {
        self.shared.handshakes().cancel(kind);
    }

    /// Signal both tasks to stop without waiting.
    pub(crate) fn shut(&self) {
        self.shared.shut();
    }

    /// Stop both tasks and wait for them to finish.
    pub(crate) async fn close(&self) {
        self.shared.shut();
        let tasks = std::mem::take(
            &mut *self
                .shared
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "link task failed");
            }
        }
    }
}

async fn read_loop<R>(
    mut reader: R,
    ctx: LinkContext,
    shared: Arc<Shared>,
    writes: mpsc::Sender<WriteRequest>,
) where
    R: AsyncRead + Unpin,
{
    let mut assembler = FrameAssembler::with_config(ctx.frame.clone());
    let mut buf = [0u8; READ_CHUNK_SIZE];

    let failure = loop {
        let read = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break None,
            read = reader.read(&mut buf) => read,
        };
        match read {
            Ok(0) => {
                info!(endpoint = %shared.endpoint, "terminal closed the link");
                break Some("link closed by terminal".to_string());
            }
            Ok(n) => {
                trace!(bytes = n, "read");
                for item in assembler.push(&buf[..n]) {
                    handle(item, &ctx, &shared, &writes).await;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                error!(endpoint = %shared.endpoint, error = %err, "read failed");
                break Some(err.to_string());
            }
        }
    };

    shared.shut();
    if let Some(message) = failure {
        ctx.bus.emit(TerminalEvent::TransportError { message });
    }
    debug!(endpoint = %shared.endpoint, "reader stopped");
}

async fn handle(
    item: Inbound,
    ctx: &LinkContext,
    shared: &Shared,
    writes: &mpsc::Sender<WriteRequest>,
) {
    let dispatch = match item {
        Inbound::Control(ControlSignal::Ack) => {
            let resolved = shared.handshakes().resolve_ack();
            match resolved {
                Some(kind) => {
                    debug!(kind = kind.name(), "handshake acknowledged");
                    ctx.dispatcher.on_handshake_ack(kind)
                }
                None => {
                    trace!("ACK with no pending handshake");
                    return;
                }
            }
        }
        Inbound::Control(ControlSignal::Nak) => {
            warn!(endpoint = %shared.endpoint, "terminal answered NAK");
            return;
        }
        Inbound::Message(message) => {
            debug!(
                type_code = message.type_code(),
                fields = message.field_count(),
                "frame received"
            );
            ctx.dispatcher.dispatch(&message)
        }
    };

    if dispatch.ack {
        let ack = WriteRequest {
            item: Outbound::Control(ControlSignal::Ack),
            done: None,
        };
        if writes.send(ack).await.is_err() {
            debug!("writer gone, ACK not sent");
        }
    }
    if let Some(event) = dispatch.event {
        ctx.bus.emit(event);
    }
}

async fn write_loop<W>(
    writer: W,
    mut requests: mpsc::Receiver<WriteRequest>,
    bus: EventBus,
    shared: Arc<Shared>,
) where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(writer, FrameCodec::new());

    loop {
        let request = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            request = requests.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };
        let WriteRequest { item, done } = request;
        trace!(?item, "write");

        match framed.send(item).await {
            Ok(()) => {
                if let Some(done) = done {
                    let _ = done.send(Ok(()));
                }
            }
            Err(err) => {
                error!(endpoint = %shared.endpoint, error = %err, "write failed");
                shared.shut();
                bus.emit(TerminalEvent::TransportError {
                    message: err.to_string(),
                });
                if let Some(done) = done {
                    let _ = done.send(Err(err));
                }
                break;
            }
        }
    }

    if let Err(err) = framed.close().await {
        debug!(error = %err, "shutting down write half");
    }
    debug!(endpoint = %shared.endpoint, "writer stopped");
}
