use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{broadcast, mpsc},
    task::JoinSet,
    time::sleep,
};
use tracing::{debug, info};

use crate::{
    config::BridgeConfig,
    dispatch::{
        jog::{run_jog_loop, JogSettings},
        Dispatcher,
    },
    error::LineError,
    grbl::{
        commands::GrblCommand,
        lines::LineDecoder,
        machine::{GrblMachine, MachineLink, MachineParts},
    },
    presets::GrblPresetStore,
    serial::{pump::pump, transmit::Transmitter},
    visca::{frame::FrameDecoder, run_interpreter},
};

/*
    Brings the controller into a known state. Nothing is sent before the greeting, since a
    controller rebooted by opening its port discards what it receives while booting. The wake lines are answered with one `ok` each,
    so they go out unacknowledged and get a grace period to drain before the first real command.
*/
pub async fn startup<L: MachineLink>(link: &L, config: &BridgeConfig) -> Result<(), LineError> {
    link.wait_for_greeting().await?;
    link.send_unacknowledged(&GrblCommand::Wake).await;
    sleep(config.settle_delay).await;
    if config.skip_homing {
        info!("skipping homing cycle");
    } else {
        info!("start homing");
        link.send_command(&GrblCommand::Home).await?;
    }
    link.send_command(&GrblCommand::ReportMachinePosition).await?;
    link.send_command(&GrblCommand::ViewParameters).await?;
    link.send_command(&GrblCommand::SelectCoordinateSystem(0)).await?;
    link.send_command(&GrblCommand::Rapid { x: 0.0, y: 0.0 }).await?;
    info!("ready");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Transmit,
    Replies,
    StatusPoll,
    CameraInput,
    Interpreter,
    Jog,
    Dispatch,
}

/*
    Wires both serial channels together and runs until the camera side closes (after every
    queued command has been handled) or either channel fails.
*/
pub async fn run_bridge<V, GR, GW>(camera: V, controller_in: GR, controller_out: GW, config: BridgeConfig) -> anyhow::Result<()>
where
    V: AsyncRead + Unpin + Send + 'static,
    GR: AsyncRead + Unpin + Send + 'static,
    GW: AsyncWrite + Unpin + Send + 'static,
{
    let transmitter = Arc::new(Transmitter::new());
    let MachineParts { machine, processor } = GrblMachine::create(transmitter.clone(), config.ack_timeout);
    let machine = Arc::new(machine);
    let (line_tx, line_rx) = mpsc::channel(config.queue_capacity);
    let (frame_tx, frame_rx) = mpsc::channel(config.queue_capacity);
    let (command_tx, command_rx) = broadcast::channel(config.queue_capacity);

    let mut tasks: JoinSet<anyhow::Result<Role>> = JoinSet::new();
    tasks.spawn(async move {
        transmitter.run(controller_out).await.context("writing to controller")?;
        Ok(Role::Transmit)
    });
    tasks.spawn(async move {
        pump(controller_in, LineDecoder::new(), line_tx, "grbl line").await.context("reading from controller")?;
        Err(anyhow!("controller closed the connection"))
    });
    tasks.spawn(async move {
        processor.run(line_rx).await;
        Ok(Role::Replies)
    });
    let poller = machine.clone();
    let poll_interval = config.status_poll_interval;
    tasks.spawn(async move {
        poller.poll_status(poll_interval).await;
        Ok(Role::StatusPoll)
    });

    startup(machine.as_ref(), &config).await.context("controller startup")?;
    for offset in machine.work_offsets() {
        info!("G{} offset {}", 54 + offset.index, offset.offset);
    }

    let store = GrblPresetStore::open(machine.clone(), config.presets_path()).await.context("opening preset record")?;
    let (dispatcher, jog_rx) = Dispatcher::new(machine.clone(), store, config.settle_delay);
    let jog_settings = JogSettings {
        step: config.jog_step,
        feed: config.jog_feed,
        idle_interval: config.jog_idle_interval,
    };
    tasks.spawn(async move {
        pump(camera, FrameDecoder::new(), frame_tx, "visca frame").await.context("reading from camera host")?;
        Ok(Role::CameraInput)
    });
    tasks.spawn(async move {
        run_interpreter(frame_rx, command_tx).await;
        Ok(Role::Interpreter)
    });
    tasks.spawn(async move {
        run_jog_loop(machine, jog_rx, jog_settings).await;
        Ok(Role::Jog)
    });
    tasks.spawn(async move {
        dispatcher.run(command_rx).await;
        Ok(Role::Dispatch)
    });

    while let Some(finished) = tasks.join_next().await {
        match finished? {
            Ok(Role::Dispatch) => {
                info!("camera input finished");
                break;
            }
            Ok(role) => debug!("{:?} finished", role),
            Err(error) => return Err(error),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use machine_mock::{rebooting_machine, recording_machine, trivial_machine, Received};
    use tempdir::TempDir;
    use tokio::io::{duplex, split, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

    use super::*;
    use crate::{
        grbl::messages::Position,
        testing::{RecordingLink, Sent},
    };

    type MachineEnd = (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>);

    // A GrblMachine with its writer, reader and reply tasks running, and the controller's end of the link.
    fn connected_machine(ack_timeout: Option<Duration>) -> (Arc<GrblMachine>, MachineEnd) {
        let (bridge_side, machine_side) = duplex(4096);
        let (controller_in, controller_out) = split(bridge_side);
        let transmitter = Arc::new(Transmitter::new());
        let MachineParts { machine, processor } = GrblMachine::create(transmitter.clone(), ack_timeout);
        let (line_tx, line_rx) = mpsc::channel(32);
        tokio::spawn(async move { transmitter.run(controller_out).await });
        tokio::spawn(pump(controller_in, LineDecoder::new(), line_tx, "grbl line"));
        tokio::spawn(processor.run(line_rx));
        (Arc::new(machine), split(machine_side))
    }

    #[tokio::test]
    async fn startup_waits_for_late_greeting() {
        let (machine, (machine_in, machine_out)) = connected_machine(Some(Duration::from_secs(1)));
        tokio::spawn(rebooting_machine(machine_in, machine_out, Duration::from_millis(300)));
        let config = BridgeConfig { settle_delay: Duration::from_millis(20), ..BridgeConfig::default() };
        assert_eq!(startup(machine.as_ref(), &config).await, Ok(()));
    }

    #[tokio::test]
    async fn startup_reads_work_offsets() {
        let (machine, (machine_in, machine_out)) = connected_machine(None);
        tokio::spawn(trivial_machine(machine_in, machine_out));
        let config = BridgeConfig { settle_delay: Duration::from_millis(20), ..BridgeConfig::default() };
        startup(machine.as_ref(), &config).await.unwrap();
        let offsets = machine.work_offsets();
        assert_eq!(offsets[0].offset, Position::default());
        assert_eq!(offsets[1].offset, Position::new(10.0, 20.0, 0.0));
    }

    #[tokio::test]
    async fn startup_sequence() {
        let link = RecordingLink::default();
        let config = BridgeConfig { settle_delay: Duration::ZERO, ..BridgeConfig::default() };
        startup(&link, &config).await.unwrap();
        assert_eq!(
            link.lines(),
            vec!["\r\n\r\n", "$H\n", "$10=1\n", "$#\n", "G54\n", "G0 X0.000Y0.000\n"]
        );
        let link = RecordingLink::default();
        startup(&link, &BridgeConfig { skip_homing: true, ..config }).await.unwrap();
        assert!(!link.sent().contains(&Sent::Line("$H\n".into())));
    }

    #[tokio::test]
    async fn startup_stops_at_first_rejection() {
        let link = RecordingLink::default();
        link.reject_with(Some(9));
        let config = BridgeConfig { settle_delay: Duration::ZERO, ..BridgeConfig::default() };
        assert_eq!(startup(&link, &config).await, Err(LineError::Grbl(9)));
        assert_eq!(link.lines(), vec!["\r\n\r\n", "$H\n"]);
    }

    #[tokio::test]
    async fn camera_commands_reach_the_controller() {
        let data = TempDir::new("bridge").unwrap();
        let config = BridgeConfig {
            settle_delay: Duration::from_millis(20),
            status_poll_interval: Duration::from_millis(10),
            data_folder: data.path().to_path_buf(),
            ..BridgeConfig::default()
        };

        let (bridge_side, machine_side) = duplex(4096);
        let (machine_in, machine_out) = split(machine_side);
        let (log_tx, mut log_rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(recording_machine(machine_in, machine_out, Some(log_tx)));
        let (controller_in, controller_out) = split(bridge_side);

        let (mut host, camera) = duplex(256);
        host.write_all(&[0x81, 0x01, 0x06, 0x02, 0x10, 0x10, 0x00, 0x00, 0x05, 0xDC, 0x0F, 0x0F, 0x0E, 0x0C, 0xFF])
            .await
            .unwrap();
        host.write_all(&[0x81, 0x01, 0x04, 0x3F, 0x01, 0x02, 0xFF]).await.unwrap();
        host.write_all(&[0x81, 0x01, 0x06, 0x05, 0xFF]).await.unwrap();
        drop(host);

        run_bridge(camera, controller_in, controller_out, config).await.unwrap();

        let mut lines = Vec::new();
        while let Ok(received) = log_rx.try_recv() {
            if let Received::Line(line) = received {
                lines.push(line);
            }
        }
        assert_eq!(lines[..2], ["", ""]);
        assert_eq!(lines[2..7], ["$H", "$10=1", "$#", "G54", "G0 X0.000Y0.000"]);
        assert_eq!(lines[7..9], ["G90", "G0 X0.230Y0.220"]);
        assert!(lines[7..].contains(&"G10 L2 P3 X0.000 Y1.000".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("$X"));
        assert!(data.path().join("presets.json").exists());
    }
}
