//! Gemeinsame Mocks für die Integration Tests
//!
//! Keine Mocking-Library: alle Mocks sind einfache In-Memory Structs.

#![allow(dead_code)]

use embedded_storage::{ReadStorage, Storage};
use railhub_core::{
    Controller, LedError, PwmWriter, RecordStore, RuntimeInfo, SmartLedWriter, StatusSink,
    StatusSnapshot, WifiMode,
};
use rgb::RGB8;

/// GPIO-Nummern der Referenz-Konfiguration
pub const CHANNELS: [u8; 7] = [4, 5, 12, 13, 14, 16, 2];
pub const OUTPUT_COUNT: usize = CHANNELS.len();
pub const DEFAULT_NAME: &str = "RailHub-Test";
pub const FLASH_SIZE: usize = 4096;
pub const RECORD_OFFSET: u32 = 0;

pub type TestController = Controller<OUTPUT_COUNT, MockPwmWriter, MockFlash>;

// ============================================================================
// Mock PWM Writer
// ============================================================================

#[derive(Default)]
pub struct MockPwmWriter {
    /// Aktueller Pegel pro Output-Index
    pub levels: [u8; OUTPUT_COUNT],
    /// Alle Schreibzugriffe (Index, Pegel) in Reihenfolge
    pub writes: Vec<(usize, u8)>,
    pub fail_writes: bool,
}

impl MockPwmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Indizes aller Outputs mit Pegel > 0
    pub fn lit(&self) -> Vec<usize> {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, level)| **level > 0)
            .map(|(index, _)| index)
            .collect()
    }
}

impl PwmWriter for MockPwmWriter {
    fn set_level(&mut self, index: usize, level: u8) -> Result<(), LedError> {
        if self.fail_writes {
            return Err(LedError::WriteFailed);
        }
        let slot = self.levels.get_mut(index).ok_or(LedError::InvalidChannel)?;
        *slot = level;
        self.writes.push((index, level));
        Ok(())
    }
}

// ============================================================================
// Mock Flash
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFlashError;

/// Flash im gelöschten Zustand (alle Bytes 0xFF)
#[derive(Clone)]
pub struct MockFlash {
    pub data: Vec<u8>,
    pub write_count: usize,
    pub fail_writes: bool,
}

impl MockFlash {
    pub fn new() -> Self {
        Self::from_bytes(vec![0xFF; FLASH_SIZE])
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            write_count: 0,
            fail_writes: false,
        }
    }
}

impl ReadStorage for MockFlash {
    type Error = MockFlashError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let src = self.data.get(start..start + bytes.len()).ok_or(MockFlashError)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl Storage for MockFlash {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MockFlashError);
        }
        let start = offset as usize;
        let dst = self.data.get_mut(start..start + bytes.len()).ok_or(MockFlashError)?;
        dst.copy_from_slice(bytes);
        self.write_count += 1;
        Ok(())
    }
}

// ============================================================================
// Recording Status Sink
// ============================================================================

pub struct RecordingSink {
    pub runtime: RuntimeInfo,
    pub snapshots: Vec<StatusSnapshot<OUTPUT_COUNT>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        let mut runtime = RuntimeInfo {
            wifi_mode: WifiMode::Station,
            free_heap: 48_000,
            uptime_ms: 1_234,
            ..RuntimeInfo::default()
        };
        runtime.mac_address.push_str("AA:BB:CC:DD:EE:FF").unwrap();
        runtime.ip.push_str("192.168.1.50").unwrap();
        runtime.ssid.push_str("Modellbahn").unwrap();
        Self {
            runtime,
            snapshots: Vec::new(),
        }
    }

    pub fn last(&self) -> &StatusSnapshot<OUTPUT_COUNT> {
        self.snapshots.last().expect("no snapshot published")
    }
}

impl StatusSink<OUTPUT_COUNT> for RecordingSink {
    fn runtime_info(&self) -> RuntimeInfo {
        self.runtime.clone()
    }

    fn publish(&mut self, snapshot: StatusSnapshot<OUTPUT_COUNT>) {
        self.snapshots.push(snapshot);
    }
}

// ============================================================================
// Mock LED Writer (Status-LED)
// ============================================================================

#[derive(Default)]
pub struct MockLedWriter {
    pub last_color: Option<RGB8>,
    pub write_count: usize,
    pub fail_next_write: bool,
}

impl MockLedWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SmartLedWriter for MockLedWriter {
    fn write(&mut self, color: RGB8) -> Result<(), LedError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(LedError::WriteFailed);
        }

        self.last_color = Some(color);
        self.write_count += 1;
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Controller mit leerem Flash, bereits gebootet bei t=0
pub fn controller() -> TestController {
    controller_with_flash(MockFlash::new())
}

pub fn controller_with_flash(flash: MockFlash) -> TestController {
    let store = RecordStore::new(flash, RECORD_OFFSET);
    let mut ctl = Controller::new(CHANNELS, MockPwmWriter::new(), store, DEFAULT_NAME);
    ctl.restore(0);
    ctl
}

/// Simulierter Neustart: neuer Controller auf demselben Flash-Inhalt
pub fn reboot(ctl: &TestController, now_ms: u32) -> TestController {
    let flash = MockFlash::from_bytes(ctl.store().storage().data.clone());
    let store = RecordStore::new(flash, RECORD_OFFSET);
    let mut next = Controller::new(CHANNELS, MockPwmWriter::new(), store, DEFAULT_NAME);
    next.restore(now_ms);
    next
}

/// Output-Index einer GPIO-Nummer
pub fn index(channel: u8) -> usize {
    CHANNELS.iter().position(|&c| c == channel).unwrap()
}
