use std::{
    mem::size_of,
    net::SocketAddr,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex as StdMutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use hexlink_core::{
    error::LinkError,
    frame::{Command, CommandStatus, Frame, Header, COMMANDER_CSC},
};
use tokio::{
    io::AsyncWriteExt,
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::{oneshot, watch, Mutex as TokioMutex},
    task::JoinHandle,
};

use crate::io;

/// Timeouts governing [`CommandTelemetryClient`] operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkOptions {
    /// Time limit for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Time limit for a command acknowledgement to arrive.
    pub command_timeout: Duration,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(5),
        }
    }
}

type ConnectCallback = Box<dyn Fn(bool) + Send + Sync>;
type FrameCallback<F> = Box<dyn Fn(&F) + Send + Sync>;

/// Observer registrations invoked from the read loop.
///
/// A panicking callback is caught and logged; it never stops the read loop.
pub struct Callbacks<C, T> {
    on_connect: Option<ConnectCallback>,
    on_config: Option<FrameCallback<C>>,
    on_telemetry: Option<FrameCallback<T>>,
}

impl<C, T> Default for Callbacks<C, T> {
    fn default() -> Self {
        Self {
            on_connect: None,
            on_config: None,
            on_telemetry: None,
        }
    }
}

impl<C, T> Callbacks<C, T> {
    /// No observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the new state on each connect/disconnect transition.
    pub fn on_connect(mut self, callback: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Box::new(callback));
        self
    }

    /// Called with each configuration frame received.
    pub fn on_config(mut self, callback: impl Fn(&C) + Send + Sync + 'static) -> Self {
        self.on_config = Some(Box::new(callback));
        self
    }

    /// Called with each telemetry frame received.
    pub fn on_telemetry(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_telemetry = Some(Box::new(callback));
        self
    }
}

struct PendingCommand {
    counter: u32,
    reply: oneshot::Sender<CommandStatus>,
}

struct Shared<C, T> {
    callbacks: Callbacks<C, T>,
    connected: watch::Sender<bool>,
    should_be_connected: AtomicBool,
    config: watch::Sender<Option<C>>,
    telemetry: watch::Sender<Option<T>>,
    pending: StdMutex<Option<PendingCommand>>,
}

impl<C, T> Shared<C, T> {
    fn pending_slot(&self) -> MutexGuard<'_, Option<PendingCommand>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops the in-flight command slot, failing its waiter.
    fn cancel_pending(&self) {
        self.pending_slot().take();
    }

    /// Publishes a connection-state change, invoking the connect callback
    /// at most once per actual transition.
    fn transition(&self, connected: bool) {
        let changed = self
            .connected
            .send_if_modified(|current| std::mem::replace(current, connected) != connected);
        if changed {
            if let Some(callback) = &self.callbacks.on_connect {
                invoke_callback("connect", || callback(connected));
            }
        }
    }
}

fn invoke_callback(name: &str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        tracing::error!(callback = name, "callback panicked");
    }
}

struct CommandChannel {
    writer: OwnedWriteHalf,
    next_counter: u32,
}

/// Client side of the command/telemetry link.
///
/// Owns one TCP connection to the low-level controller. A read loop
/// demultiplexes incoming frames into configuration, telemetry and
/// command-status events; outgoing commands are serialized through a single
/// in-flight slot with counter-based acknowledgement correlation.
///
/// A closed client is not reusable; reconnecting requires a new instance.
pub struct CommandTelemetryClient<C: Frame, T: Frame> {
    shared: Arc<Shared<C, T>>,
    channel: TokioMutex<CommandChannel>,
    read_task: JoinHandle<()>,
    options: LinkOptions,
    peer_addr: SocketAddr,
}

impl<C: Frame, T: Frame> CommandTelemetryClient<C, T> {
    /// Connects to the controller and starts the read loop.
    ///
    /// Fails with [`LinkError::ConnectTimeout`] if the transport cannot be
    /// established within `options.connect_timeout`; nothing is left
    /// running on failure.
    pub async fn connect(
        addr: SocketAddr,
        options: LinkOptions,
        callbacks: Callbacks<C, T>,
    ) -> Result<Self, LinkError> {
        let stream = tokio::time::timeout(options.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| LinkError::ConnectTimeout {
                addr,
                timeout: options.connect_timeout,
            })??;
        let (reader, writer) = stream.into_split();
        let shared = Arc::new(Shared {
            callbacks,
            connected: watch::Sender::new(false),
            should_be_connected: AtomicBool::new(true),
            config: watch::Sender::new(None),
            telemetry: watch::Sender::new(None),
            pending: StdMutex::new(None),
        });
        shared.transition(true);
        tracing::info!(%addr, "connected to controller");
        let read_task = tokio::spawn(read_loop(reader, Arc::clone(&shared)));
        Ok(Self {
            shared,
            channel: TokioMutex::new(CommandChannel {
                writer,
                next_counter: 0,
            }),
            read_task,
            options,
            peer_addr: addr,
        })
    }

    /// Address of the controller endpoint.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns true if the transport is currently connected.
    pub fn connected(&self) -> bool {
        *self.shared.connected.borrow()
    }

    /// Returns false once [`close`](Self::close) was called.
    ///
    /// `connected() == false` with `should_be_connected() == true` is an
    /// unexpected drop; the owner may treat it as a fault.
    pub fn should_be_connected(&self) -> bool {
        self.shared.should_be_connected.load(Ordering::Acquire)
    }

    /// The most recently received configuration, if any.
    pub fn config(&self) -> Option<C> {
        *self.shared.config.borrow()
    }

    /// The most recently received telemetry, if any.
    pub fn telemetry(&self) -> Option<T> {
        *self.shared.telemetry.borrow()
    }

    /// Sends a command and waits for its acknowledgement.
    ///
    /// Commands from concurrent callers are serialized; the next command is
    /// not written until this one resolves. On ACK returns the controller's
    /// estimated completion duration in seconds. On NO_ACK fails with
    /// [`LinkError::CommandRejected`] carrying the reason text; the link
    /// stays connected. Fails before writing anything if not connected.
    pub async fn run_command(&self, mut command: Command) -> Result<f64, LinkError> {
        if !self.connected() {
            return Err(LinkError::NotConnected);
        }
        let mut channel = self.channel.lock().await;
        if !self.connected() {
            return Err(LinkError::NotConnected);
        }
        let counter = channel.next_counter;
        channel.next_counter = counter.wrapping_add(1);
        command.commander = COMMANDER_CSC;
        command.counter = counter;

        let (reply_tx, reply_rx) = oneshot::channel();
        *self.shared.pending_slot() = Some(PendingCommand {
            counter,
            reply: reply_tx,
        });

        let header = Header::new(Command::FRAME_ID, counter);
        if let Err(e) = io::write_frame(&mut channel.writer, &header, &command).await {
            self.shared.cancel_pending();
            return Err(LinkError::Io(e));
        }

        match tokio::time::timeout(self.options.command_timeout, reply_rx).await {
            Err(_) => {
                self.shared.cancel_pending();
                Err(LinkError::CommandTimeout {
                    counter,
                    timeout: self.options.command_timeout,
                })
            }
            Ok(Err(_)) => Err(LinkError::ConnectionClosed),
            Ok(Ok(status)) => {
                if status.is_ack() {
                    Ok(status.duration)
                } else {
                    Err(LinkError::CommandRejected {
                        counter,
                        reason: status.reason(),
                    })
                }
            }
        }
    }

    /// Waits for the next telemetry frame received after this call.
    ///
    /// Never resolves with the currently cached snapshot; callers use this
    /// to observe the effect of a command without racing the read loop.
    pub async fn next_telemetry(&self) -> Result<T, LinkError> {
        let mut telemetry = self.shared.telemetry.subscribe();
        let mut connected = self.shared.connected.subscribe();
        if !*connected.borrow_and_update() {
            return Err(LinkError::NotConnected);
        }
        loop {
            tokio::select! {
                changed = telemetry.changed() => {
                    if changed.is_err() {
                        return Err(LinkError::ConnectionClosed);
                    }
                    if let Some(snapshot) = *telemetry.borrow_and_update() {
                        return Ok(snapshot);
                    }
                }
                changed = connected.changed() => {
                    if changed.is_err() || !*connected.borrow_and_update() {
                        return Err(LinkError::ConnectionClosed);
                    }
                }
            }
        }
    }

    /// Waits until the first configuration frame has been received and
    /// returns it; resolves immediately once configured.
    pub async fn configured(&self) -> Result<C, LinkError> {
        let mut config = self.shared.config.subscribe();
        let mut connected = self.shared.connected.subscribe();
        if let Some(snapshot) = *config.borrow_and_update() {
            return Ok(snapshot);
        }
        if !*connected.borrow_and_update() {
            return Err(LinkError::NotConnected);
        }
        loop {
            tokio::select! {
                changed = config.changed() => {
                    if changed.is_err() {
                        return Err(LinkError::ConnectionClosed);
                    }
                    if let Some(snapshot) = *config.borrow_and_update() {
                        return Ok(snapshot);
                    }
                }
                changed = connected.changed() => {
                    if changed.is_err() || !*connected.borrow_and_update() {
                        return Err(LinkError::ConnectionClosed);
                    }
                }
            }
        }
    }

    /// Closes the link.
    ///
    /// Cancels the read loop, fails any pending command wait with
    /// [`LinkError::ConnectionClosed`] rather than a timeout, and fails any
    /// outstanding [`next_telemetry`](Self::next_telemetry) waiters.
    pub async fn close(&self) {
        self.shared
            .should_be_connected
            .store(false, Ordering::Release);
        self.read_task.abort();
        self.shared.cancel_pending();
        self.shared.transition(false);
        let mut channel = self.channel.lock().await;
        let _ = channel.writer.shutdown().await;
        tracing::info!(addr = %self.peer_addr, "link closed");
    }
}

impl<C: Frame, T: Frame> Drop for CommandTelemetryClient<C, T> {
    fn drop(&mut self) {
        self.read_task.abort();
    }
}

/// Reads frames until EOF, cancellation or a transport error, dispatching
/// on the header's frame ID.
async fn read_loop<C: Frame, T: Frame>(mut reader: OwnedReadHalf, shared: Arc<Shared<C, T>>) {
    // Resynchronization discards the largest payload this link can carry.
    let resync_len = size_of::<C>()
        .max(size_of::<T>())
        .max(size_of::<CommandStatus>());
    loop {
        let header: Header = match io::read_record(&mut reader).await {
            Ok(header) => header,
            Err(e) => {
                if shared.should_be_connected.load(Ordering::Acquire) {
                    tracing::warn!(%e, "connection lost");
                } else {
                    tracing::debug!(%e, "read loop ended");
                }
                break;
            }
        };
        let frame_id = header.frame_id;
        let result = if frame_id == CommandStatus::FRAME_ID {
            handle_command_status(&mut reader, &shared, &header).await
        } else if frame_id == C::FRAME_ID {
            handle_config(&mut reader, &shared).await
        } else if frame_id == T::FRAME_ID {
            handle_telemetry(&mut reader, &shared).await
        } else {
            tracing::error!(frame_id, discarding = resync_len, "unrecognized frame ID; resynchronizing");
            io::discard(&mut reader, resync_len).await
        };
        if let Err(e) = result {
            tracing::warn!(%e, "connection lost mid-frame");
            break;
        }
    }
    shared.cancel_pending();
    shared.transition(false);
}

async fn handle_command_status<C: Frame, T: Frame>(
    reader: &mut OwnedReadHalf,
    shared: &Shared<C, T>,
    header: &Header,
) -> std::io::Result<()> {
    let status: CommandStatus = io::read_record(reader).await?;
    let counter = header.counter;
    let mut pending = shared.pending_slot();
    match pending.take() {
        Some(command) if command.counter == counter => {
            let _ = command.reply.send(status);
        }
        Some(command) => {
            tracing::warn!(
                expected = command.counter,
                received = counter,
                "discarding command status with mismatched counter"
            );
            *pending = Some(command);
        }
        None => {
            tracing::warn!(counter, "discarding command status; no command in flight");
        }
    }
    Ok(())
}

async fn handle_config<C: Frame, T: Frame>(
    reader: &mut OwnedReadHalf,
    shared: &Shared<C, T>,
) -> std::io::Result<()> {
    let config: C = io::read_record(reader).await?;
    shared.config.send_replace(Some(config));
    if let Some(callback) = &shared.callbacks.on_config {
        invoke_callback("config", || callback(&config));
    }
    Ok(())
}

async fn handle_telemetry<C: Frame, T: Frame>(
    reader: &mut OwnedReadHalf,
    shared: &Shared<C, T>,
) -> std::io::Result<()> {
    let telemetry: T = io::read_record(reader).await?;
    shared.telemetry.send_replace(Some(telemetry));
    if let Some(callback) = &shared.callbacks.on_telemetry {
        invoke_callback("telemetry", || callback(&telemetry));
    }
    Ok(())
}
