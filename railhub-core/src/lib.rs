//! RailHub Core - Platform-agnostic Output Logic
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Outputs, Lauflicht-Gruppen, Scheduler, Persistenz und Status sind
//! hier als reine Logik über Traits (`PwmWriter`, `SmartLedWriter`,
//! `embedded_storage::Storage`) implementiert und auf dem Host testbar.

#![no_std]

// Muss zuerst kommen, damit die Log-Makros in allen Modulen sichtbar sind
#[macro_use]
mod fmt;

pub mod controller;
pub mod error;
pub mod groups;
pub mod indicator;
pub mod logic;
pub mod persistence;
pub mod registry;
pub mod reset;
#[cfg(feature = "serde")]
pub mod request;
pub mod scheduler;
pub mod status;
pub mod traits;
pub mod types;

/// Obergrenze für Outputs im persistenten Record
pub const MAX_OUTPUTS: usize = 8;
/// Anzahl der Lauflicht-Slots
pub const MAX_GROUPS: usize = 4;
pub const MAX_GROUP_MEMBERS: usize = 8;
pub const MIN_GROUP_MEMBERS: usize = 2;
/// Maximale Länge von Output- und Gruppennamen in Bytes
pub const MAX_NAME_LEN: usize = 20;
pub const MAX_DEVICE_NAME_LEN: usize = 39;
/// Kleinstes erlaubtes Schritt-Intervall einer Gruppe
pub const MIN_STEP_INTERVAL_MS: u16 = 50;

// Re-exports für einfachen Zugriff
pub use controller::{Command, Controller};
pub use error::{CommandError, StorageError};
pub use groups::{GroupRequest, GroupTable};
pub use indicator::{IndicatorState, StatusIndicator, indicator_color};
pub use logic::{hostname_from_device_name, level_to_percent, normalize_name, percent_to_level};
pub use persistence::{RECORD_SIZE, Record, RecordStore};
pub use registry::OutputRegistry;
pub use reset::{HoldEvent, HoldTrigger};
#[cfg(feature = "serde")]
pub use request::{ClientRequest, MessageType};
pub use status::{GroupStatus, OutputStatus, RuntimeInfo, StatusSink, StatusSnapshot, WifiMode};
pub use traits::{LedError, PwmWriter, SmartLedWriter};
pub use types::{ChasingGroup, DeviceName, GroupId, Name, Output};
