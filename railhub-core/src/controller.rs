//! Command Dispatcher
//!
//! `Controller` besitzt den kompletten Live-Zustand (Outputs, Gruppen,
//! Gerätename) sowie PWM-Treiber und Record-Store. Jedes Kommando wird
//! vollständig validiert, dann angewendet, persistiert und als Status
//! veröffentlicht.

use embedded_storage::Storage;
use heapless::Vec;

use crate::error::{CommandError, StorageError};
use crate::groups::{GroupRequest, GroupTable};
use crate::persistence::{Record, RecordStore};
use crate::registry::OutputRegistry;
use crate::status::{RuntimeInfo, StatusSink, StatusSnapshot};
use crate::traits::{PwmWriter, drive};
use crate::types::DeviceName;
use crate::{MAX_GROUP_MEMBERS, MIN_GROUP_MEMBERS, logic, scheduler};

/// Bereits dekodiertes Kommando von außen
///
/// Outputs werden über ihre GPIO-Nummer (`channel`) referenziert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Control {
        channel: u8,
        active: bool,
        brightness_percent: i32,
    },
    RenameOutput {
        channel: u8,
        name: &'a str,
    },
    SetInterval {
        channel: u8,
        interval_ms: u16,
    },
    CreateGroup {
        group_id: u8,
        step_interval_ms: u16,
        members: &'a [u8],
        name: Option<&'a str>,
    },
    DeleteGroup {
        group_id: u8,
    },
    RenameGroup {
        group_id: u8,
        name: Option<&'a str>,
    },
    SetDeviceName {
        name: &'a str,
    },
    /// Gespeicherten Record verwerfen, Live-Zustand bleibt
    ResetStorage,
}

/// Welcher Teil des Records nach einem Kommando geschrieben wird
#[derive(Debug, Clone, Copy)]
enum Dirty {
    Output(usize),
    Groups,
    DeviceName,
    Erase,
}

pub struct Controller<const N: usize, P, S> {
    outputs: OutputRegistry<N>,
    groups: GroupTable,
    device_name: DeviceName,
    default_device_name: &'static str,
    pwm: P,
    store: RecordStore<S>,
}

impl<const N: usize, P: PwmWriter, S: Storage> Controller<N, P, S> {
    pub fn new(channels: [u8; N], pwm: P, store: RecordStore<S>, default_device_name: &'static str) -> Self {
        Self {
            outputs: OutputRegistry::new(channels),
            groups: GroupTable::new(),
            device_name: logic::normalize_name(default_device_name),
            default_device_name,
            pwm,
            store,
        }
    }

    pub fn outputs(&self) -> &OutputRegistry<N> {
        &self.outputs
    }

    pub fn groups(&self) -> &GroupTable {
        &self.groups
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    /// Lädt den Record beim Boot und treibt alle Outputs
    ///
    /// Ein ungültiger oder gelöschter Record wird durch Werkseinstellungen
    /// ersetzt und sofort neu geschrieben.
    pub fn restore(&mut self, now_ms: u32) {
        let record = match self.store.load(N) {
            Ok(record) => {
                info!("Storage: record loaded");
                record
            }
            Err(StorageError::Io) => {
                // Flash nicht lesbar: nichts überschreiben
                error!("Storage: read failed, using defaults");
                Record::defaults(self.default_device_name)
            }
            Err(e) => {
                warn!("Storage: {}, writing defaults", e);
                let defaults = Record::defaults(self.default_device_name);
                if let Err(e) = self.store.save(&defaults) {
                    warn!("Storage: failed to write defaults: {}", e);
                }
                defaults
            }
        };
        self.apply_record(&record, now_ms);
    }

    fn apply_record(&mut self, record: &Record, now_ms: u32) {
        self.device_name = if record.device_name.is_empty() {
            logic::normalize_name(self.default_device_name)
        } else {
            record.device_name.clone()
        };

        self.groups.clear();
        for (output, stored) in self.outputs.iter_mut().zip(record.outputs.iter()) {
            output.active = stored.active;
            output.level = stored.level;
            output.blink_interval_ms = stored.blink_interval_ms;
            output.name = stored.name.clone();
            output.group = None;
        }
        self.outputs.drive_ungrouped(&mut self.pwm, now_ms);

        for group in record.groups.iter().flatten() {
            if let Err(e) = self.groups.restore(&mut self.outputs, &mut self.pwm, group.to_group(now_ms)) {
                warn!("Storage: group {} not restored: {}", group.id.get(), e);
            }
        }

        info!(
            "Restored '{}': {} outputs, {} chasing groups",
            self.device_name.as_str(),
            N,
            self.groups.len()
        );
    }

    /// Ein Scheduler-Durchlauf
    pub fn tick(&mut self, now_ms: u32) {
        scheduler::tick(&mut self.outputs, &mut self.groups, &mut self.pwm, now_ms);
    }

    pub fn snapshot(&self, runtime: &RuntimeInfo) -> StatusSnapshot<N> {
        StatusSnapshot::build(&self.device_name, &self.outputs, &self.groups, runtime)
    }

    /// Wendet ein Kommando an, persistiert und veröffentlicht den Status
    pub fn execute<K: StatusSink<N>>(
        &mut self,
        command: Command<'_>,
        now_ms: u32,
        sink: &mut K,
    ) -> Result<(), CommandError> {
        self.apply(command, now_ms)?;
        let snapshot = self.snapshot(&sink.runtime_info());
        sink.publish(snapshot);
        Ok(())
    }

    /// Wendet ein Kommando an und persistiert, ohne Status zu veröffentlichen
    pub fn apply(&mut self, command: Command<'_>, now_ms: u32) -> Result<(), CommandError> {
        let dirty = match command {
            Command::Control {
                channel,
                active,
                brightness_percent,
            } => {
                let index = self
                    .outputs
                    .set_output(&mut self.pwm, channel, active, brightness_percent, now_ms)?;
                Dirty::Output(index)
            }
            Command::RenameOutput { channel, name } => Dirty::Output(self.outputs.set_name(channel, name)?),
            Command::SetInterval { channel, interval_ms } => {
                let index = self
                    .outputs
                    .set_interval(&mut self.pwm, channel, interval_ms, now_ms)?;
                Dirty::Output(index)
            }
            Command::CreateGroup {
                group_id,
                step_interval_ms,
                members,
                name,
            } => {
                let indices = self.resolve_members(members)?;
                let request = GroupRequest {
                    id: group_id,
                    members: &indices,
                    step_interval_ms,
                    name,
                };
                self.groups
                    .create(&mut self.outputs, &mut self.pwm, &request, now_ms)?;
                Dirty::Groups
            }
            Command::DeleteGroup { group_id } => {
                self.groups.delete(&mut self.outputs, &mut self.pwm, group_id)?;
                Dirty::Groups
            }
            Command::RenameGroup { group_id, name } => {
                self.groups.rename(group_id, name)?;
                Dirty::Groups
            }
            Command::SetDeviceName { name } => {
                let name: DeviceName = logic::normalize_name(name);
                self.device_name = if name.is_empty() {
                    logic::normalize_name(self.default_device_name)
                } else {
                    name
                };
                info!("Device name set to '{}'", self.device_name.as_str());
                Dirty::DeviceName
            }
            Command::ResetStorage => Dirty::Erase,
        };

        self.persist(dirty);
        Ok(())
    }

    /// Löst GPIO-Nummern in Output-Indizes auf
    ///
    /// Anzahl wird vor der Auflösung geprüft, Duplikate erkennt
    /// `GroupRequest::validate`.
    fn resolve_members(&self, members: &[u8]) -> Result<Vec<usize, MAX_GROUP_MEMBERS>, CommandError> {
        if !(MIN_GROUP_MEMBERS..=MAX_GROUP_MEMBERS).contains(&members.len()) {
            return Err(CommandError::InvalidParams);
        }
        let mut indices = Vec::new();
        for &channel in members {
            let index = self.outputs.index_of(channel)?;
            indices.push(index).map_err(|_| CommandError::InvalidParams)?;
        }
        Ok(indices)
    }

    fn persist(&mut self, dirty: Dirty) {
        let outputs = &self.outputs;
        let groups = &self.groups;
        let device_name = &self.device_name;

        let result = match dirty {
            Dirty::Output(index) => self.store.update(N, self.default_device_name, |record| {
                if let Some(output) = outputs.get(index) {
                    record.set_output(index, output);
                }
            }),
            // Gruppen-Änderungen schalten auch Outputs, daher beides schreiben
            Dirty::Groups => self.store.update(N, self.default_device_name, |record| {
                record.set_outputs(outputs);
                record.set_groups(groups);
            }),
            Dirty::DeviceName => self.store.update(N, self.default_device_name, |record| {
                record.device_name = device_name.clone();
            }),
            Dirty::Erase => self.store.erase(),
        };

        if let Err(e) = result {
            warn!("Storage: write failed, live state kept: {}", e);
        }
    }

    /// Verwirft den Record und schaltet alle Outputs aus
    ///
    /// Der Aufrufer startet danach neu.
    pub fn factory_reset(&mut self) -> Result<(), StorageError> {
        for index in 0..N {
            drive(&mut self.pwm, index, 0);
        }
        self.store.erase()
    }
}
