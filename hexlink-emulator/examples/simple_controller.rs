use std::time::Duration;

use hexlink::{Callbacks, CommandTelemetryClient, LinkOptions};
use hexlink_core::{
    frame::Command,
    state::{ControllerState, SetStateParam},
};
use hexlink_emulator::{
    MockController, MockControllerOptions, SimpleCommandCode, SimpleConfig, SimpleDevice,
    SimpleTelemetry,
};

fn set_state(param: SetStateParam) -> Command {
    Command::new(SimpleCommandCode::SetState as u32).with_param1(param as u32 as f64)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let controller = MockController::start(
        SimpleDevice::default(),
        "127.0.0.1:0".parse()?,
        MockControllerOptions {
            telemetry_interval: Duration::from_millis(100),
            ..Default::default()
        },
    )
    .await?;

    let client: CommandTelemetryClient<SimpleConfig, SimpleTelemetry> =
        CommandTelemetryClient::connect(
            controller.local_addr(),
            LinkOptions::default(),
            Callbacks::new().on_telemetry(|telemetry: &SimpleTelemetry| {
                let state = telemetry.state;
                let position = telemetry.curr_position;
                tracing::info!(state, position, "telemetry");
            }),
        )
        .await?;

    let config = client.configured().await?;
    let min = config.min_position;
    let max = config.max_position;
    tracing::info!(min, max, "configured");

    for param in [
        SetStateParam::EnterControl,
        SetStateParam::Start,
        SetStateParam::Enable,
    ] {
        client.run_command(set_state(param)).await?;
    }
    anyhow::ensure!(controller.state() == ControllerState::Enabled);

    let duration = client.run_command(Command::new(SimpleCommandCode::Move as u32).with_param1(10.0)).await?;
    tracing::info!(duration, "move accepted");

    tokio::time::sleep(Duration::from_millis(300)).await;
    client.close().await;
    Ok(())
}
