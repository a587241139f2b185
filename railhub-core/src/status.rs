//! Status Snapshot Builder
//!
//! Projiziert den Live-Zustand in eine serialisierbare Struktur. Die
//! Laufzeit-Werte (MAC, IP, Heap, ...) kennt der Core nicht, sie kommen
//! als `RuntimeInfo` von der Firmware.

use heapless::{String, Vec};
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::groups::GroupTable;
use crate::registry::OutputRegistry;
use crate::types::{DeviceName, Name};
use crate::{MAX_GROUP_MEMBERS, MAX_GROUPS};

/// Betriebsart des WiFi-Interfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiMode {
    #[cfg_attr(feature = "serde", serde(rename = "STA"))]
    Station,
    #[cfg_attr(feature = "serde", serde(rename = "AP"))]
    AccessPoint,
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "OFF"))]
    Off,
}

/// Werte, die nur die Laufzeitumgebung liefern kann
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuntimeInfo {
    /// "AA:BB:CC:DD:EE:FF"
    pub mac_address: String<17>,
    pub wifi_mode: WifiMode,
    pub ip: String<15>,
    pub ssid: String<32>,
    pub free_heap: u32,
    pub uptime_ms: u64,
    /// Größe des Flash-Chips in Bytes
    pub flash_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct OutputStatus {
    /// GPIO-Nummer
    pub pin: u8,
    pub active: bool,
    /// 0-100
    pub brightness: u8,
    pub name: Name,
    pub interval: u16,
    pub chasing_group: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GroupStatus {
    pub group_id: u8,
    pub name: Name,
    pub interval: u16,
    pub output_count: u8,
    /// GPIO-Nummern in Lauf-Reihenfolge
    pub outputs: Vec<u8, MAX_GROUP_MEMBERS>,
}

/// Kompletter Status für `/api/status` und WebSocket-Broadcasts
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StatusSnapshot<const N: usize> {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub msg_type: &'static str,
    pub name: DeviceName,
    pub mac_address: String<17>,
    pub wifi_mode: WifiMode,
    pub ip: String<15>,
    pub ssid: String<32>,
    pub free_heap: u32,
    pub uptime: u64,
    pub flash_size: u32,
    pub outputs: Vec<OutputStatus, N>,
    pub chasing_groups: Vec<GroupStatus, MAX_GROUPS>,
}

impl<const N: usize> StatusSnapshot<N> {
    pub fn build(
        device_name: &DeviceName,
        outputs: &OutputRegistry<N>,
        groups: &GroupTable,
        runtime: &RuntimeInfo,
    ) -> Self {
        let mut output_status = Vec::new();
        for output in outputs.iter() {
            // Genau N Einträge, passt immer
            let _ = output_status.push(OutputStatus {
                pin: output.channel,
                active: output.active,
                brightness: output.brightness_percent(),
                name: output.name.clone(),
                interval: output.blink_interval_ms,
                chasing_group: output.group.map(|g| g.get()),
            });
        }

        let mut group_status = Vec::new();
        for group in groups.iter() {
            let pins = group
                .members
                .iter()
                .filter_map(|&m| outputs.get(usize::from(m)).map(|o| o.channel))
                .collect();
            let _ = group_status.push(GroupStatus {
                group_id: group.id.get(),
                name: group.name.clone(),
                interval: group.step_interval_ms,
                output_count: group.members.len() as u8,
                outputs: pins,
            });
        }

        Self {
            msg_type: "status",
            name: device_name.clone(),
            mac_address: runtime.mac_address.clone(),
            wifi_mode: runtime.wifi_mode,
            ip: runtime.ip.clone(),
            ssid: runtime.ssid.clone(),
            free_heap: runtime.free_heap,
            uptime: runtime.uptime_ms,
            flash_size: runtime.flash_size,
            outputs: output_status,
            chasing_groups: group_status,
        }
    }
}

/// Empfänger für Status-Snapshots nach einem Kommando
///
/// # Implementierungen
/// - **Production:** Broadcast über den Status-PubSubChannel an alle WebSocket-Clients
/// - **Testing:** RecordingSink (sammelt Snapshots)
pub trait StatusSink<const N: usize> {
    /// Aktuelle Laufzeit-Werte für den Snapshot
    fn runtime_info(&self) -> RuntimeInfo;

    /// Fire-and-forget: Zustellung wird nicht bestätigt
    fn publish(&mut self, snapshot: StatusSnapshot<N>);
}
