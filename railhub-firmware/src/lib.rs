// Library-Root: Wiederverwendbare Logik und Module
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Heap für REST-Bodies (picoserve `alloc`)
extern crate alloc;

// Module
pub mod config;
pub mod hal;
pub mod tasks;
pub mod web;

use core::cell::RefCell;

use embassy_net::Stack;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Subscriber};
use embassy_time::Instant;
use esp_storage::FlashStorage;
use heapless::String;

// Re-exports von railhub-core
pub use railhub_core::{Command, CommandError, Controller, StatusSnapshot};

use crate::config::OUTPUT_COUNT;
use crate::hal::LedcPwmWriter;

/// Controller mit echter Hardware
pub type FirmwareController = Controller<OUTPUT_COUNT, LedcPwmWriter, FlashStorage<'static>>;

/// Snapshot mit der Output-Anzahl dieser Firmware
pub type FirmwareSnapshot = StatusSnapshot<OUTPUT_COUNT>;

// ============================================================================
// Type-Aliase für Shared State und Channel-Typen
// ============================================================================

/// Controller, geteilt zwischen Control-Task und HTTP-Tasks
///
/// Alle Tasks laufen im selben Executor. Ein Kommando läuft komplett
/// innerhalb von `lock()` und damit nie parallel zu einem Tick.
pub type SharedController = Mutex<NoopRawMutex, RefCell<FirmwareController>>;

/// PubSubChannel für Status-Broadcasts
/// - 2: Nachrichten-Kapazität im Queue
/// - 10: Maximale Anzahl Subscribers (WebSocket-Clients)
/// - 1: Publisher (Publish erfolgt über ImmediatePublisher)
pub type StatusChannel = PubSubChannel<NoopRawMutex, FirmwareSnapshot, 2, 10, 1>;

/// Subscriber für Status-Broadcasts (einer pro WebSocket-Connection)
pub type StatusSubscriber = Subscriber<'static, NoopRawMutex, FirmwareSnapshot, 2, 10, 1>;

/// Gemeinsamer Zustand aller Tasks
pub struct AppState {
    pub controller: SharedController,
    pub status: StatusChannel,
    pub stack: Stack<'static>,
    /// "AA:BB:CC:DD:EE:FF" der Station-Schnittstelle
    pub mac_address: String<17>,
    pub flash_size: u32,
}

/// Millisekunden seit Boot als u32
///
/// Läuft nach ca. 49 Tagen über, der Core rechnet mit `wrapping_sub`.
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}
