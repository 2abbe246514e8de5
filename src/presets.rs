use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tracing::info;

use crate::{
    error::StoreError,
    grbl::{commands::GrblCommand, machine::MachineLink, messages::Position},
    util::file_backed_json::FileBackedValue,
};

pub const PRESET_SLOTS: u8 = 8;
// Slots below this map onto work coordinate systems G54..G59.
const COORDINATE_SLOTS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PresetSlot(u8);
impl PresetSlot {
    pub fn index(self) -> u8 {
        self.0
    }
}
impl TryFrom<u8> for PresetSlot {
    type Error = StoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value < PRESET_SLOTS {
            Ok(PresetSlot(value))
        } else {
            Err(StoreError::InvalidSlot(value))
        }
    }
}

#[async_trait]
pub trait PresetStore: Send {
    /// Moves to the stored preset and reports where that is.
    async fn load(&mut self, slot: PresetSlot) -> Result<Position, StoreError>;
    async fn save(&mut self, slot: PresetSlot, position: Position) -> Result<(), StoreError>;
}

/*
    Presets live in the controller itself: slots 0-5 are work coordinate systems, 6 and 7 the two
    reference points. The JSON record only remembers what was stored so a recall can report it.
*/
pub struct GrblPresetStore<L> {
    link: Arc<L>,
    records: FileBackedValue<BTreeMap<u8, Position>>,
}

impl<L: MachineLink> GrblPresetStore<L> {
    pub async fn open(link: Arc<L>, path: PathBuf) -> Result<Self, StoreError> {
        Ok(GrblPresetStore {
            link,
            records: FileBackedValue::new(path, BTreeMap::new).await?,
        })
    }
    pub fn recorded(&self, slot: PresetSlot) -> Option<Position> {
        self.records.get().get(&slot.0).copied()
    }
}

#[async_trait]
impl<L: MachineLink + 'static> PresetStore for GrblPresetStore<L> {
    async fn load(&mut self, slot: PresetSlot) -> Result<Position, StoreError> {
        match slot.0 {
            index if index < COORDINATE_SLOTS => {
                self.link.send_command(&GrblCommand::SelectCoordinateSystem(index)).await?;
                self.link.send_command(&GrblCommand::Rapid { x: 0.0, y: 0.0 }).await?;
            }
            6 => self.link.send_command(&GrblCommand::GoToReferencePoint1).await?,
            _ => self.link.send_command(&GrblCommand::GoToReferencePoint2).await?,
        }
        let position = self.recorded(slot).unwrap_or_default();
        info!("recalled preset {} at {}", slot.0, position);
        Ok(position)
    }
    async fn save(&mut self, slot: PresetSlot, position: Position) -> Result<(), StoreError> {
        match slot.0 {
            index if index < COORDINATE_SLOTS => {
                self.link
                    .send_command(&GrblCommand::SetCoordinateSystem { index, position })
                    .await?
            }
            6 => self.link.send_command(&GrblCommand::SetReferencePoint1).await?,
            _ => self.link.send_command(&GrblCommand::SetReferencePoint2).await?,
        }
        self.records.mutate(|records| records.insert(slot.0, position)).await?;
        info!("stored preset {} at {}", slot.0, position);
        Ok(())
    }
}
