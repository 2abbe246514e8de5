use std::fmt;

use super::messages::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMode {
    Absolute,
    Relative,
}

/*
    The fixed set of lines sent to the controller. Display renders the wire text, newline included.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum GrblCommand {
    Wake,
    Home,
    Unlock,
    ReportMachinePosition,
    ViewParameters,
    SetMode(DistanceMode),
    Rapid { x: f64, y: f64 },
    Jog { x: f64, y: f64, feed: f64 },
    SelectCoordinateSystem(u8),
    SetCoordinateSystem { index: u8, position: Position },
    SetReferencePoint1,
    SetReferencePoint2,
    GoToReferencePoint1,
    GoToReferencePoint2,
}
impl fmt::Display for GrblCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrblCommand::Wake => write!(f, "\r\n\r\n"),
            GrblCommand::Home => writeln!(f, "$H"),
            GrblCommand::Unlock => writeln!(f, "$X"),
            GrblCommand::ReportMachinePosition => writeln!(f, "$10=1"),
            GrblCommand::ViewParameters => writeln!(f, "$#"),
            GrblCommand::SetMode(DistanceMode::Absolute) => writeln!(f, "G90"),
            GrblCommand::SetMode(DistanceMode::Relative) => writeln!(f, "G91"),
            GrblCommand::Rapid { x, y } => writeln!(f, "G0 X{:.3}Y{:.3}", x, y),
            GrblCommand::Jog { x, y, feed } => writeln!(f, "$J=G91 X{:.3}Y{:.3} F{:.3}", x, y, feed),
            // G54 is system 1.
            GrblCommand::SelectCoordinateSystem(index) => writeln!(f, "G5{}", index + 4),
            GrblCommand::SetCoordinateSystem { index, position } => {
                writeln!(f, "G10 L2 P{} X{:.3} Y{:.3}", index + 1, position.x, position.y)
            }
            GrblCommand::SetReferencePoint1 => writeln!(f, "G28.1"),
            GrblCommand::SetReferencePoint2 => writeln!(f, "G30.1"),
            GrblCommand::GoToReferencePoint1 => writeln!(f, "G28"),
            GrblCommand::GoToReferencePoint2 => writeln!(f, "G30"),
        }
    }
}
