// Status-Broadcast an alle WebSocket-Clients
//
// Implementiert `StatusSink` aus railhub-core: Nach jedem Kommando und
// periodisch aus dem Control-Task wird ein Snapshot in den
// StatusChannel gepublisht (fire-and-forget).

use core::fmt::Write;

use defmt::debug;
use heapless::String;
use railhub_core::{RuntimeInfo, StatusSink, WifiMode};

use crate::config::{OUTPUT_COUNT, WIFI_SSID};
use crate::{AppState, FirmwareSnapshot};

/// Publisht Snapshots in den StatusChannel
pub struct StatusBroadcaster<'a> {
    state: &'a AppState,
}

impl<'a> StatusBroadcaster<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }
}

impl StatusSink<OUTPUT_COUNT> for StatusBroadcaster<'_> {
    fn runtime_info(&self) -> RuntimeInfo {
        runtime_info(self.state)
    }

    fn publish(&mut self, snapshot: FirmwareSnapshot) {
        // Ältester Snapshot wird verworfen, falls ein Client hinterherhinkt
        self.state.status.immediate_publisher().publish_immediate(snapshot);
        debug!("Status: snapshot published");
    }
}

/// Sammelt die Laufzeit-Werte für den Status-Snapshot
pub fn runtime_info(state: &AppState) -> RuntimeInfo {
    let mut info = RuntimeInfo {
        mac_address: state.mac_address.clone(),
        free_heap: esp_alloc::HEAP.free() as u32,
        uptime_ms: embassy_time::Instant::now().as_millis(),
        flash_size: state.flash_size,
        ..RuntimeInfo::default()
    };

    if let Some(config) = state.stack.config_v4() {
        info.wifi_mode = WifiMode::Station;
        let _ = write!(info.ip, "{}", config.address.address());
        let _ = info.ssid.push_str(WIFI_SSID);
    }
    info
}

/// Formatiert eine MAC-Adresse als "AA:BB:CC:DD:EE:FF"
pub fn format_mac(mac: [u8; 6]) -> String<17> {
    let mut out = String::new();
    for (i, byte) in mac.iter().enumerate() {
        if i > 0 {
            let _ = out.push(':');
        }
        let _ = write!(out, "{:02X}", byte);
    }
    out
}
