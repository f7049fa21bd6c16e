use std::{
    collections::HashMap,
    mem::size_of,
    net::SocketAddr,
    sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError},
    time::Duration,
};

use hexlink::{io, OneClientServer};
use hexlink_core::{
    frame::{Command, CommandStatus, Frame, Header},
    state::{ControllerState, SetStateParam},
};
use tokio::{
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::{watch, Mutex as TokioMutex},
    task::JoinHandle,
};

use crate::device::{CommandKey, CommandRejection, CommandReply, DeviceHandler, DeviceModel};
use crate::state_machine::StateMachine;

/// Options for [`MockController`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockControllerOptions {
    /// Initial controller state.
    pub initial_state: ControllerState,
    /// Interval between telemetry frames.
    pub telemetry_interval: Duration,
}

impl Default for MockControllerOptions {
    fn default() -> Self {
        Self {
            initial_state: ControllerState::Offline,
            telemetry_interval: Duration::from_millis(100),
        }
    }
}

struct ControllerCore<D: DeviceModel> {
    device: D,
    state: StateMachine,
    commands: HashMap<CommandKey, DeviceHandler<D>>,
    config_counter: u32,
    telemetry_counter: u32,
    config_dirty: bool,
}

impl<D: DeviceModel> ControllerCore<D> {
    /// Validates and applies one command, producing its acknowledgement.
    fn execute(&mut self, command: &Command) -> CommandStatus {
        let key = D::command_key(command);
        let outcome = match self.commands.get(&key) {
            Some(handler) => handler(&mut self.device, &mut self.state, command),
            None if command.code == D::SET_STATE_CODE => {
                let param = SetStateParam::from_raw(command.param1 as u32);
                self.state
                    .handle_set_state(param)
                    .map(|()| CommandReply::done())
            }
            None => {
                let code = command.code;
                let param1 = command.param1;
                Err(CommandRejection::new(format!(
                    "unrecognized command code={code} param1={param1}"
                )))
            }
        };
        match outcome {
            Ok(reply) => {
                if reply.config_changed {
                    self.config_dirty = true;
                }
                CommandStatus::ack(reply.duration)
            }
            Err(rejection) => {
                let code = command.code;
                tracing::warn!(code, %rejection, "command rejected");
                CommandStatus::no_ack(&rejection.to_string())
            }
        }
    }
}

/// The hardware-side peer of the command/telemetry link.
///
/// Listens for exactly one client at a time. For each accepted client it
/// runs a command loop (read, validate against the state machine, reply
/// with a counter-correlated [`CommandStatus`]) and a telemetry loop
/// (configuration once per connection and whenever it changes, telemetry at
/// a fixed interval). When the client drops, both loops stop and the next
/// client may connect.
pub struct MockController<D: DeviceModel> {
    core: Arc<StdMutex<ControllerCore<D>>>,
    local_addr: SocketAddr,
    connected_rx: watch::Receiver<bool>,
    run_task: JoinHandle<()>,
}

impl<D: DeviceModel> MockController<D> {
    /// Binds the acceptor and starts serving.
    ///
    /// Pass port 0 to bind an ephemeral port; the bound address is
    /// available from [`local_addr`](Self::local_addr).
    pub async fn start(
        device: D,
        addr: SocketAddr,
        options: MockControllerOptions,
    ) -> std::io::Result<Self> {
        let server = OneClientServer::bind("MockController", addr).await?;
        let local_addr = server.local_addr();
        let connected_rx = server.subscribe();
        let core = Arc::new(StdMutex::new(ControllerCore {
            device,
            state: StateMachine::new(options.initial_state),
            commands: D::extra_commands().into_iter().collect(),
            config_counter: 0,
            telemetry_counter: 0,
            config_dirty: false,
        }));
        let run_task = tokio::spawn(run(server, Arc::clone(&core), options.telemetry_interval));
        Ok(Self {
            core,
            local_addr,
            connected_rx,
            run_task,
        })
    }

    /// The bound listening address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns true if a client is connected.
    pub fn connected(&self) -> bool {
        *self.connected_rx.borrow()
    }

    /// A channel observing client connect/disconnect transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// Current controller state.
    pub fn state(&self) -> ControllerState {
        lock(&self.core).state.state()
    }

    /// Latches an externally simulated fault.
    pub fn fault(&self) {
        lock(&self.core).state.fault();
    }

    /// Runs `f` with the emulated device.
    pub fn with_device<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&lock(&self.core).device)
    }

    /// Stops the command and telemetry loops and the acceptor.
    pub fn close(&self) {
        self.run_task.abort();
    }
}

impl<D: DeviceModel> Drop for MockController<D> {
    fn drop(&mut self) {
        self.run_task.abort();
    }
}

fn lock<D: DeviceModel>(core: &Arc<StdMutex<ControllerCore<D>>>) -> MutexGuard<'_, ControllerCore<D>> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run<D: DeviceModel>(
    mut server: OneClientServer,
    core: Arc<StdMutex<ControllerCore<D>>>,
    telemetry_interval: Duration,
) {
    while let Some(stream) = server.accept().await {
        if let Err(e) = serve_client(stream, &core, telemetry_interval).await {
            tracing::debug!(%e, "client session ended");
        }
        server.close_client();
    }
}

/// Serves one client until it disconnects; the command and telemetry loops
/// stop together.
async fn serve_client<D: DeviceModel>(
    stream: TcpStream,
    core: &Arc<StdMutex<ControllerCore<D>>>,
    telemetry_interval: Duration,
) -> std::io::Result<()> {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(TokioMutex::new(writer));
    lock(core).config_dirty = false;
    tokio::select! {
        result = command_loop(&mut reader, &writer, core) => result,
        result = telemetry_loop(&writer, core, telemetry_interval) => result,
    }
}

async fn command_loop<D: DeviceModel>(
    reader: &mut OwnedReadHalf,
    writer: &Arc<TokioMutex<OwnedWriteHalf>>,
    core: &Arc<StdMutex<ControllerCore<D>>>,
) -> std::io::Result<()> {
    loop {
        let header: Header = io::read_record(reader).await?;
        let frame_id = header.frame_id;
        if frame_id != Command::FRAME_ID {
            tracing::error!(frame_id, "unexpected frame ID from client; resynchronizing");
            io::discard(reader, size_of::<Command>()).await?;
            continue;
        }
        let command: Command = io::read_record(reader).await?;
        let (status, config_dirty) = {
            let mut core = lock(core);
            let status = core.execute(&command);
            (status, std::mem::take(&mut core.config_dirty))
        };
        let reply_header = Header::new(CommandStatus::FRAME_ID, command.counter);
        {
            let mut writer = writer.lock().await;
            io::write_frame(&mut *writer, &reply_header, &status).await?;
        }
        if config_dirty {
            write_config(writer, core).await?;
        }
    }
}

async fn telemetry_loop<D: DeviceModel>(
    writer: &Arc<TokioMutex<OwnedWriteHalf>>,
    core: &Arc<StdMutex<ControllerCore<D>>>,
    telemetry_interval: Duration,
) -> std::io::Result<()> {
    // Configuration goes out once per connection, before any telemetry.
    write_config(writer, core).await?;
    let mut ticks = tokio::time::interval(telemetry_interval);
    loop {
        ticks.tick().await;
        let (header, telemetry) = {
            let mut core = lock(core);
            core.telemetry_counter = core.telemetry_counter.wrapping_add(1);
            let header = Header::new(D::Telemetry::FRAME_ID, core.telemetry_counter);
            let state = core.state;
            let telemetry = core.device.update_telemetry(&state);
            (header, telemetry)
        };
        let mut writer = writer.lock().await;
        io::write_frame(&mut *writer, &header, &telemetry).await?;
    }
}

async fn write_config<D: DeviceModel>(
    writer: &Arc<TokioMutex<OwnedWriteHalf>>,
    core: &Arc<StdMutex<ControllerCore<D>>>,
) -> std::io::Result<()> {
    let (header, config) = {
        let mut core = lock(core);
        core.config_counter = core.config_counter.wrapping_add(1);
        (
            Header::new(D::Config::FRAME_ID, core.config_counter),
            core.device.config(),
        )
    };
    let mut writer = writer.lock().await;
    io::write_frame(&mut *writer, &header, &config).await
}
