pub mod command;
pub mod frame;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use command::{interpret, ViscaCommand};
use frame::ViscaRawFrame;

/*
    Turns decoded frames into commands for the dispatcher; frames that match no known shape are
    dropped. The command queue is a broadcast ring with one consumer: when the dispatcher falls
    behind, the oldest commands are overwritten, so the latest intent (a Stop in particular)
    always gets through.
*/
pub async fn run_interpreter(mut frames: mpsc::Receiver<ViscaRawFrame>, commands: broadcast::Sender<ViscaCommand>) {
    while let Some(frame) = frames.recv().await {
        match interpret(&frame) {
            Ok(command) => {
                debug!("visca {:#04x}: {:?}", frame.address, command);
                if commands.send(command).is_err() {
                    return;
                }
            }
            Err(error) => info!("unable to parse visca frame {:02x?}: {}", frame.payload(), error),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::RecvError;

    use super::*;
    use command::{JogDirection, Speeds};

    fn jog_frame(pan_dir: u8, tilt_dir: u8) -> ViscaRawFrame {
        let mut frame = ViscaRawFrame::new(0x81);
        let payload = [0x01, 0x06, 0x01, 0x10, 0x10, pan_dir, tilt_dir];
        frame.data[..payload.len()].copy_from_slice(&payload);
        frame.length = payload.len() as u8;
        frame
    }

    fn jog(direction: JogDirection) -> ViscaCommand {
        ViscaCommand::Jog { direction, speeds: Speeds { pan: 0x10, tilt: 0x10 } }
    }

    #[tokio::test]
    async fn full_queue_keeps_latest_stop() {
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let (command_tx, mut command_rx) = broadcast::channel(2);
        for (pan_dir, tilt_dir) in [(0x03, 0x01), (0x01, 0x03), (0x03, 0x03)] {
            frame_tx.send(jog_frame(pan_dir, tilt_dir)).await.unwrap();
        }
        drop(frame_tx);
        run_interpreter(frame_rx, command_tx).await;

        assert_eq!(command_rx.recv().await, Err(RecvError::Lagged(1)));
        assert_eq!(command_rx.recv().await, Ok(jog(JogDirection::Left)));
        assert_eq!(command_rx.recv().await, Ok(jog(JogDirection::Stop)));
        assert_eq!(command_rx.recv().await, Err(RecvError::Closed));
    }

    #[tokio::test]
    async fn unparsable_frames_are_skipped() {
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let (command_tx, mut command_rx) = broadcast::channel(4);
        let mut garbage = ViscaRawFrame::new(0x82);
        garbage.length = 2;
        frame_tx.send(garbage).await.unwrap();
        frame_tx.send(jog_frame(0x03, 0x02)).await.unwrap();
        drop(frame_tx);
        run_interpreter(frame_rx, command_tx).await;
        assert_eq!(command_rx.recv().await, Ok(jog(JogDirection::Down)));
        assert_eq!(command_rx.recv().await, Err(RecvError::Closed));
    }
}
