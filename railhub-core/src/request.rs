//! Client-Requests (WebSocket und REST)
//!
//! Flache JSON-Objekte, z.B. `{"type":"control","pin":4,"active":true}`.
//! Bei REST-Routen fehlt `type`, der Pfad gibt den Typ vor.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::MAX_GROUP_MEMBERS;
use crate::controller::Command;

/// Kommando-Request vom Browser oder Skript
///
/// Hinweis: Flache Struktur mit optionalen Feldern statt getaggtem Enum,
/// serde-json-core unterstützt keine internally tagged Enums beim Parsen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientRequest<'a> {
    /// Pflicht über WebSocket, bei REST durch den Pfad vorgegeben
    #[serde(default, rename = "type")]
    pub msg_type: Option<MessageType>,
    #[serde(default)]
    pub pin: Option<u8>,
    #[serde(default)]
    pub active: Option<bool>,
    /// Helligkeit in Prozent, wird im Core auf 0-100 begrenzt
    #[serde(default)]
    pub brightness: Option<i32>,
    #[serde(default, borrow)]
    pub name: Option<&'a str>,
    #[serde(default)]
    pub interval: Option<u16>,
    #[serde(default, rename = "groupId")]
    pub group_id: Option<u8>,
    /// GPIO-Nummern der Gruppen-Mitglieder in Reihenfolge
    /// Doppelt so groß wie erlaubt, damit zu lange Listen als
    /// "Invalid parameters" statt als Parse-Fehler ankommen
    #[serde(default)]
    pub outputs: Option<Vec<u8, { 2 * MAX_GROUP_MEMBERS }>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Control,
    SetName,
    SetInterval,
    CreateGroup,
    DeleteGroup,
    RenameGroup,
    SetDeviceName,
    ResetStorage,
}

impl<'a> ClientRequest<'a> {
    /// Übersetzt die Nachricht in ein Core-Kommando
    ///
    /// `kind` überschreibt das `type`-Feld (REST-Routen). Fehlende
    /// Pflichtfelder ergeben eine Fehlermeldung für den Client,
    /// Wertebereiche prüft erst der Controller.
    pub fn to_command(&'a self, kind: Option<MessageType>) -> Result<Command<'a>, &'static str> {
        const MISSING: &str = "Missing parameters";

        let command = match kind.or(self.msg_type).ok_or(MISSING)? {
            MessageType::Control => Command::Control {
                channel: self.pin.ok_or(MISSING)?,
                active: self.active.ok_or(MISSING)?,
                brightness_percent: self.brightness.unwrap_or(100),
            },
            MessageType::SetName => Command::RenameOutput {
                channel: self.pin.ok_or(MISSING)?,
                name: self.name.ok_or(MISSING)?,
            },
            MessageType::SetInterval => Command::SetInterval {
                channel: self.pin.ok_or(MISSING)?,
                interval_ms: self.interval.ok_or(MISSING)?,
            },
            MessageType::CreateGroup => Command::CreateGroup {
                group_id: self.group_id.ok_or(MISSING)?,
                step_interval_ms: self.interval.ok_or(MISSING)?,
                members: self.outputs.as_deref().ok_or(MISSING)?,
                name: self.name,
            },
            MessageType::DeleteGroup => Command::DeleteGroup {
                group_id: self.group_id.ok_or(MISSING)?,
            },
            MessageType::RenameGroup => Command::RenameGroup {
                group_id: self.group_id.ok_or(MISSING)?,
                name: self.name,
            },
            MessageType::SetDeviceName => Command::SetDeviceName {
                name: self.name.ok_or(MISSING)?,
            },
            MessageType::ResetStorage => Command::ResetStorage,
        };
        Ok(command)
    }
}

