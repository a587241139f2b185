//! Persistence Layer
//!
//! Ein einziger Record fester Größe im Flash. Jeder Save schreibt den
//! kompletten Record (read-modify-write), es gibt kein Wear-Leveling und
//! keine Versionierung.
//!
//! # Layout (little endian, 372 Bytes)
//!
//! | Offset | Größe  | Feld                                              |
//! |--------|--------|---------------------------------------------------|
//! | 0      | 4      | Magic `RH01`                                      |
//! | 4      | 40     | Gerätename, UTF-8, mit NUL aufgefüllt             |
//! | 44     | 8 × 24 | Outputs: active, level, interval u16, name[20]    |
//! | 236    | 4 × 33 | Gruppen: id, active, count, members[8], interval u16, name[20] |
//! | 368    | 2      | CRC-16/IBM-3740 über Bytes 0..368                 |
//! | 370    | 2      | Padding                                           |
//!
//! Ein Record ist entweder komplett gültig oder wird verworfen.

use crc::{CRC_16_IBM_3740, Crc};
use embedded_storage::Storage;
use heapless::{String, Vec};

use crate::error::StorageError;
use crate::groups::GroupTable;
use crate::registry::OutputRegistry;
use crate::types::{ChasingGroup, DeviceName, GroupId, Name, Output};
use crate::{
    MAX_DEVICE_NAME_LEN, MAX_GROUP_MEMBERS, MAX_GROUPS, MAX_NAME_LEN, MAX_OUTPUTS, MIN_GROUP_MEMBERS,
    MIN_STEP_INTERVAL_MS, logic,
};

const MAGIC: [u8; 4] = *b"RH01";
const ERASED: u8 = 0xFF;

const DEVICE_NAME_OFFSET: usize = 4;
const DEVICE_NAME_FIELD: usize = MAX_DEVICE_NAME_LEN + 1;
const OUTPUTS_OFFSET: usize = DEVICE_NAME_OFFSET + DEVICE_NAME_FIELD;
const OUTPUT_RECORD_SIZE: usize = 4 + MAX_NAME_LEN;
const GROUPS_OFFSET: usize = OUTPUTS_OFFSET + MAX_OUTPUTS * OUTPUT_RECORD_SIZE;
const GROUP_RECORD_SIZE: usize = 3 + MAX_GROUP_MEMBERS + 2 + MAX_NAME_LEN;
const CRC_OFFSET: usize = GROUPS_OFFSET + MAX_GROUPS * GROUP_RECORD_SIZE;

/// Größe des Records im Flash
pub const RECORD_SIZE: usize = CRC_OFFSET + 4;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Persistierter Zustand eines Outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub active: bool,
    pub level: u8,
    pub blink_interval_ms: u16,
    pub name: Name,
}

impl Default for OutputRecord {
    fn default() -> Self {
        Self {
            active: false,
            level: u8::MAX,
            blink_interval_ms: 0,
            name: Name::new(),
        }
    }
}

impl From<&Output> for OutputRecord {
    fn from(output: &Output) -> Self {
        Self {
            active: output.active,
            level: output.level,
            blink_interval_ms: output.blink_interval_ms,
            name: output.name.clone(),
        }
    }
}

/// Persistierte Lauflicht-Gruppe (ohne Laufzeit-Zustand)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub id: GroupId,
    pub members: Vec<u8, MAX_GROUP_MEMBERS>,
    pub step_interval_ms: u16,
    pub name: Name,
}

impl From<&ChasingGroup> for GroupRecord {
    fn from(group: &ChasingGroup) -> Self {
        Self {
            id: group.id,
            members: group.members.clone(),
            step_interval_ms: group.step_interval_ms,
            name: group.name.clone(),
        }
    }
}

impl GroupRecord {
    /// Laufzeit-Gruppe mit Schritt 0
    pub(crate) fn to_group(&self, now_ms: u32) -> ChasingGroup {
        ChasingGroup {
            id: self.id,
            name: self.name.clone(),
            members: self.members.clone(),
            step_interval_ms: self.step_interval_ms,
            current_step: 0,
            last_step_ms: now_ms,
        }
    }
}

/// Der komplette persistierte Zustand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub device_name: DeviceName,
    pub outputs: [OutputRecord; MAX_OUTPUTS],
    pub groups: [Option<GroupRecord>; MAX_GROUPS],
}

impl Record {
    /// Werkseinstellungen: alle Outputs aus, keine Gruppen
    pub fn defaults(device_name: &str) -> Self {
        Self {
            device_name: logic::normalize_name(device_name),
            outputs: core::array::from_fn(|_| OutputRecord::default()),
            groups: [const { None }; MAX_GROUPS],
        }
    }

    /// Schnappschuss des Live-Zustands
    pub fn capture<const N: usize>(device_name: &str, outputs: &OutputRegistry<N>, groups: &GroupTable) -> Self {
        let mut record = Self::defaults(device_name);
        record.set_outputs(outputs);
        record.set_groups(groups);
        record
    }

    pub fn set_output(&mut self, index: usize, output: &Output) {
        if let Some(slot) = self.outputs.get_mut(index) {
            *slot = OutputRecord::from(output);
        }
    }

    pub fn set_outputs<const N: usize>(&mut self, outputs: &OutputRegistry<N>) {
        for (index, output) in outputs.iter().enumerate() {
            self.set_output(index, output);
        }
    }

    pub fn set_groups(&mut self, groups: &GroupTable) {
        self.groups = [const { None }; MAX_GROUPS];
        for (slot, group) in self.groups.iter_mut().zip(groups.iter()) {
            *slot = Some(GroupRecord::from(group));
        }
    }

    /// Serialisiert den Record inklusive Magic und CRC
    pub fn encode(&self, buf: &mut [u8; RECORD_SIZE]) {
        buf.fill(0);
        buf[..4].copy_from_slice(&MAGIC);
        write_name(&mut buf[DEVICE_NAME_OFFSET..OUTPUTS_OFFSET], &self.device_name);

        for (i, output) in self.outputs.iter().enumerate() {
            let start = OUTPUTS_OFFSET + i * OUTPUT_RECORD_SIZE;
            let field = &mut buf[start..start + OUTPUT_RECORD_SIZE];
            field[0] = u8::from(output.active);
            field[1] = output.level;
            field[2..4].copy_from_slice(&output.blink_interval_ms.to_le_bytes());
            write_name(&mut field[4..], &output.name);
        }

        for (i, group) in self.groups.iter().enumerate() {
            let Some(group) = group else {
                continue;
            };
            let start = GROUPS_OFFSET + i * GROUP_RECORD_SIZE;
            let field = &mut buf[start..start + GROUP_RECORD_SIZE];
            field[0] = group.id.get();
            field[1] = 1;
            field[2] = group.members.len() as u8;
            field[3..3 + group.members.len()].copy_from_slice(&group.members);
            let interval = 3 + MAX_GROUP_MEMBERS;
            field[interval..interval + 2].copy_from_slice(&group.step_interval_ms.to_le_bytes());
            write_name(&mut field[interval + 2..], &group.name);
        }

        let crc = CRC16.checksum(&buf[..CRC_OFFSET]);
        buf[CRC_OFFSET..CRC_OFFSET + 2].copy_from_slice(&crc.to_le_bytes());
    }

    /// Liest und prüft einen Record für `output_count` Outputs
    ///
    /// Gelöschter Flash liefert `Blank`, jede andere Abweichung `Corrupt`.
    pub fn decode(buf: &[u8; RECORD_SIZE], output_count: usize) -> Result<Self, StorageError> {
        if buf[..4] != MAGIC {
            return Err(if buf[..4].iter().all(|&b| b == ERASED) {
                StorageError::Blank
            } else {
                StorageError::Corrupt
            });
        }

        let stored_crc = u16::from_le_bytes([buf[CRC_OFFSET], buf[CRC_OFFSET + 1]]);
        if CRC16.checksum(&buf[..CRC_OFFSET]) != stored_crc {
            return Err(StorageError::Corrupt);
        }

        let device_name = read_name(&buf[DEVICE_NAME_OFFSET..OUTPUTS_OFFSET])?;
        if device_name.len() > MAX_DEVICE_NAME_LEN {
            return Err(StorageError::Corrupt);
        }
        let mut record = Self::defaults("");
        record.device_name = device_name;

        for (i, output) in record.outputs.iter_mut().enumerate() {
            let start = OUTPUTS_OFFSET + i * OUTPUT_RECORD_SIZE;
            let field = &buf[start..start + OUTPUT_RECORD_SIZE];
            *output = OutputRecord {
                active: read_bool(field[0])?,
                level: field[1],
                blink_interval_ms: u16::from_le_bytes([field[2], field[3]]),
                name: read_name(&field[4..])?,
            };
        }

        let mut claimed = [false; MAX_OUTPUTS];
        for (i, slot) in record.groups.iter_mut().enumerate() {
            let start = GROUPS_OFFSET + i * GROUP_RECORD_SIZE;
            let field = &buf[start..start + GROUP_RECORD_SIZE];
            if !read_bool(field[1])? {
                continue;
            }

            let id = GroupId::new(field[0]).ok_or(StorageError::Corrupt)?;
            let count = usize::from(field[2]);
            if !(MIN_GROUP_MEMBERS..=MAX_GROUP_MEMBERS).contains(&count) {
                return Err(StorageError::Corrupt);
            }

            let mut members = Vec::new();
            for &member in &field[3..3 + count] {
                let index = usize::from(member);
                if index >= output_count || claimed[index] {
                    return Err(StorageError::Corrupt);
                }
                claimed[index] = true;
                members.push(member).map_err(|_| StorageError::Corrupt)?;
            }

            let interval = 3 + MAX_GROUP_MEMBERS;
            let step_interval_ms = u16::from_le_bytes([field[interval], field[interval + 1]]);
            if step_interval_ms < MIN_STEP_INTERVAL_MS {
                return Err(StorageError::Corrupt);
            }

            *slot = Some(GroupRecord {
                id,
                members,
                step_interval_ms,
                name: read_name(&field[interval + 2..])?,
            });
        }

        for (i, group) in record.groups.iter().enumerate() {
            let Some(group) = group else {
                continue;
            };
            let duplicate = record.groups[..i].iter().flatten().any(|other| other.id == group.id);
            if duplicate {
                return Err(StorageError::Corrupt);
            }
        }

        Ok(record)
    }
}

fn write_name(field: &mut [u8], name: &str) {
    let len = name.len().min(field.len());
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
}

fn read_name<const CAP: usize>(field: &[u8]) -> Result<String<CAP>, StorageError> {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let text = core::str::from_utf8(&field[..len]).map_err(|_| StorageError::Corrupt)?;
    String::try_from(text).map_err(|_| StorageError::Corrupt)
}

fn read_bool(raw: u8) -> Result<bool, StorageError> {
    match raw {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(StorageError::Corrupt),
    }
}

/// Zugriff auf den Record im nichtflüchtigen Speicher
///
/// # Implementierungen von `S`
/// - **Production:** `esp_storage::FlashStorage`
/// - **Testing:** MockFlash (in-memory Mock)
pub struct RecordStore<S> {
    storage: S,
    offset: u32,
}

impl<S: Storage> RecordStore<S> {
    pub fn new(storage: S, offset: u32) -> Self {
        Self { storage, offset }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Liest den Record und prüft ihn
    pub fn load(&mut self, output_count: usize) -> Result<Record, StorageError> {
        let mut buf = [0u8; RECORD_SIZE];
        self.storage
            .read(self.offset, &mut buf)
            .map_err(|_| StorageError::Io)?;
        Record::decode(&buf, output_count)
    }

    pub fn save(&mut self, record: &Record) -> Result<(), StorageError> {
        let mut buf = [0u8; RECORD_SIZE];
        record.encode(&mut buf);
        self.storage
            .write(self.offset, &buf)
            .map_err(|_| StorageError::Io)?;
        debug!("Storage: record saved ({} bytes @ 0x{:x})", RECORD_SIZE, self.offset);
        Ok(())
    }

    /// Read-modify-write auf dem gespeicherten Record
    ///
    /// Ist der aktuelle Inhalt ungültig, wird auf den Werkseinstellungen
    /// aufgesetzt.
    pub fn update(
        &mut self,
        output_count: usize,
        default_device_name: &str,
        patch: impl FnOnce(&mut Record),
    ) -> Result<(), StorageError> {
        let mut record = match self.load(output_count) {
            Ok(record) => record,
            Err(StorageError::Io) => return Err(StorageError::Io),
            Err(_) => Record::defaults(default_device_name),
        };
        patch(&mut record);
        self.save(&record)
    }

    /// Überschreibt den Record mit dem Löschmuster (0xFF)
    pub fn erase(&mut self) -> Result<(), StorageError> {
        let buf = [ERASED; RECORD_SIZE];
        self.storage
            .write(self.offset, &buf)
            .map_err(|_| StorageError::Io)?;
        info!("Storage: record erased");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_size() {
        assert_eq!(OUTPUTS_OFFSET, 44);
        assert_eq!(GROUPS_OFFSET, 236);
        assert_eq!(CRC_OFFSET, 368);
        assert_eq!(RECORD_SIZE, 372);
    }

    #[test]
    fn test_erased_flash_is_blank() {
        let buf = [ERASED; RECORD_SIZE];
        assert_eq!(Record::decode(&buf, 7), Err(StorageError::Blank));
    }

    #[test]
    fn test_flipped_bit_is_corrupt() {
        let mut buf = [0u8; RECORD_SIZE];
        Record::defaults("RailHub").encode(&mut buf);
        assert!(Record::decode(&buf, 7).is_ok());

        buf[OUTPUTS_OFFSET + 1] ^= 0x01;
        assert_eq!(Record::decode(&buf, 7), Err(StorageError::Corrupt));
    }

    #[test]
    fn test_member_out_of_range_is_corrupt() {
        let mut record = Record::defaults("RailHub");
        record.groups[0] = Some(GroupRecord {
            id: GroupId::new(1).unwrap(),
            members: Vec::from_slice(&[0, 6]).unwrap(),
            step_interval_ms: 100,
            name: Name::try_from("Lauflicht").unwrap(),
        });
        let mut buf = [0u8; RECORD_SIZE];
        record.encode(&mut buf);

        assert!(Record::decode(&buf, 7).is_ok());
        // Mit nur 6 Outputs zeigt Mitglied 6 ins Leere
        assert_eq!(Record::decode(&buf, 6), Err(StorageError::Corrupt));
    }

    #[test]
    fn test_shared_member_is_corrupt() {
        let mut record = Record::defaults("RailHub");
        for (slot, id) in [(0, 1), (1, 2)] {
            record.groups[slot] = Some(GroupRecord {
                id: GroupId::new(id).unwrap(),
                members: Vec::from_slice(&[slot as u8, 3]).unwrap(),
                step_interval_ms: 100,
                name: Name::new(),
            });
        }
        let mut buf = [0u8; RECORD_SIZE];
        record.encode(&mut buf);
        assert_eq!(Record::decode(&buf, 7), Err(StorageError::Corrupt));
    }
}
