//! Core Types für die Output-Steuerung
//!
//! Datenstrukturen ohne Hardware-Dependencies

use heapless::{String, Vec};

use crate::{MAX_DEVICE_NAME_LEN, MAX_GROUP_MEMBERS, MAX_NAME_LEN};

/// Anzeigename eines Outputs oder einer Gruppe (max. 20 Bytes)
pub type Name = String<MAX_NAME_LEN>;

/// Gerätename (max. 39 Bytes)
pub type DeviceName = String<MAX_DEVICE_NAME_LEN>;

/// Von außen gewählte Gruppen-ID im Bereich 1-255
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GroupId(u8);

impl GroupId {
    /// `None` für die reservierte ID 0
    pub const fn new(raw: u8) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Ein dimmbarer Output
///
/// `channel` ist die GPIO-Nummer und bleibt nach dem Boot fest.
/// `level` ist die gespeicherte Helligkeit (0-255), unabhängig von `active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub channel: u8,
    pub active: bool,
    pub level: u8,
    pub name: Name,
    /// 0 = kein Blinken
    pub blink_interval_ms: u16,
    pub group: Option<GroupId>,
    pub(crate) blink_on: bool,
    pub(crate) last_blink_ms: u32,
}

impl Output {
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            active: false,
            level: u8::MAX,
            name: Name::new(),
            blink_interval_ms: 0,
            group: None,
            blink_on: false,
            last_blink_ms: 0,
        }
    }

    pub fn brightness_percent(&self) -> u8 {
        crate::level_to_percent(self.level)
    }

    /// Aktuelle Blink-Phase (true = an)
    pub fn blink_on(&self) -> bool {
        self.blink_on
    }

    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }
}

/// Lauflicht-Gruppe
///
/// `members` enthält Output-Indizes in Lauf-Reihenfolge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChasingGroup {
    pub id: GroupId,
    pub name: Name,
    pub members: Vec<u8, MAX_GROUP_MEMBERS>,
    pub step_interval_ms: u16,
    pub(crate) current_step: usize,
    pub(crate) last_step_ms: u32,
}

impl ChasingGroup {
    /// Index des gerade leuchtenden Outputs
    pub fn current_member(&self) -> Option<usize> {
        self.members.get(self.current_step).map(|&m| usize::from(m))
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn contains(&self, index: usize) -> bool {
        self.members.iter().any(|&m| usize::from(m) == index)
    }
}
