use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }
}
// Same grammar the controller uses in reports: "<x>,<y>,<z>".
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineState {
    #[default]
    Idle,
    Run,
    Hold,
    Jog,
    Alarm,
    Door,
    Check,
    Home,
    Sleep,
}
impl MachineState {
    pub const ALL: [MachineState; 9] = [
        MachineState::Idle,
        MachineState::Run,
        MachineState::Hold,
        MachineState::Jog,
        MachineState::Alarm,
        MachineState::Door,
        MachineState::Check,
        MachineState::Home,
        MachineState::Sleep,
    ];
    pub fn name(self) -> &'static str {
        match self {
            MachineState::Idle => "Idle",
            MachineState::Run => "Run",
            MachineState::Hold => "Hold",
            MachineState::Jog => "Jog",
            MachineState::Alarm => "Alarm",
            MachineState::Door => "Door",
            MachineState::Check => "Check",
            MachineState::Home => "Home",
            MachineState::Sleep => "Sleep",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GrblState {
    pub state: MachineState,
    pub pos_act: Position,
}

pub const WORK_OFFSET_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorkOffset {
    pub index: usize,
    pub offset: Position,
}
pub type WorkOffsets = [WorkOffset; WORK_OFFSET_COUNT];

pub fn initial_work_offsets() -> WorkOffsets {
    let mut offsets = [WorkOffset::default(); WORK_OFFSET_COUNT];
    for (index, offset) in offsets.iter_mut().enumerate() {
        offset.index = index;
    }
    offsets
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Ok,
    Report,
    Error,
    Alarm,
    Feedback,
    Settings,
    StartupExec,
    Welcome,
    Invalid,
}
impl MessageKind {
    // Checked in this order; the first prefix that matches wins.
    pub const PREFIXES: [(&'static str, MessageKind); 8] = [
        ("ok", MessageKind::Ok),
        ("<", MessageKind::Report),
        ("error:", MessageKind::Error),
        ("Alarm:", MessageKind::Alarm),
        ("[", MessageKind::Feedback),
        ("$", MessageKind::Settings),
        (">", MessageKind::StartupExec),
        ("Grbl", MessageKind::Welcome),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub state: MachineState,
    pub machine_position: Option<Position>,
}

pub fn get_alarm_text(index: u64) -> Cow<'static, str> {
    match index {
        1 => "Hard limit triggered. Machine position is likely lost due to sudden and immediate halt. Re-homing is highly recommended.".into(),
        2 => "G-code motion target exceeds machine travel. Machine position safely retained. Alarm may be unlocked.".into(),
        3 => "Reset while in motion. Grbl cannot guarantee position. Lost steps are likely. Re-homing is highly recommended.".into(),
        4 => "Probe fail. The probe is not in the expected initial state before starting probe cycle.".into(),
        5 => "Probe fail. Probe did not contact the workpiece within the programmed travel.".into(),
        6 => "Homing fail. Reset during active homing cycle.".into(),
        7 => "Homing fail. Safety door was opened during active homing cycle.".into(),
        8 => "Homing fail. Cycle failed to clear limit switch when pulling off. Try increasing pull-off setting or check wiring.".into(),
        9 => "Homing fail. Could not find limit switch within search distance.".into(),
        _ => Cow::Owned(format!("Unknown ALARM:{}", index)),
    }
}
pub fn get_error_text(index: u64) -> Cow<'static, str> {
    match index {
        1 => "G-code words consist of a letter and a value. Letter was not found.".into(),
        2 => "Numeric value format is not valid or missing an expected value.".into(),
        3 => "Grbl '$' system command was not recognized or supported.".into(),
        4 => "Negative value received for an expected positive value.".into(),
        5 => "Homing cycle is not enabled via settings.".into(),
        8 => "Grbl '$' command cannot be used unless Grbl is IDLE.".into(),
        9 => "G-code locked out during alarm or jog state".into(),
        15 => "Jog target exceeds machine travel. Command ignored.".into(),
        16 => "Jog command with no '=' or contains prohibited g-code.".into(),
        20 => "Unsupported or invalid g-code command found in block.".into(),
        22 => "Feed rate has not yet been set or is undefined.".into(),
        26 => "A G-code command implicitly or explicitly requires XYZ axis words in the block, but none were detected.".into(),
        28 => "A G-code command was sent, but is missing some required P or L value words in the line.".into(),
        29 => "Grbl supports six work coordinate systems G54-G59. G59.1, G59.2, and G59.3 are not supported.".into(),
        _ => Cow::Owned(format!("Unknown error:{}", index)),
    }
}
