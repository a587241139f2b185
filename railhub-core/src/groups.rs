//! Chasing Group Table
//!
//! Bis zu vier Lauflicht-Gruppen. Jede Gruppe besitzt ihre Mitglieder
//! exklusiv: `Output::group` und `ChasingGroup::members` werden immer
//! gemeinsam geändert.

use core::fmt::Write;

use heapless::Vec;

use crate::error::CommandError;
use crate::registry::OutputRegistry;
use crate::traits::{PwmWriter, drive};
use crate::types::{ChasingGroup, GroupId, Name};
use crate::{
    MAX_GROUP_MEMBERS, MAX_GROUPS, MAX_NAME_LEN, MIN_GROUP_MEMBERS, MIN_STEP_INTERVAL_MS, logic,
};

/// Parameter für das Anlegen oder Aktualisieren einer Gruppe
///
/// `members` sind bereits aufgelöste Output-Indizes in Lauf-Reihenfolge.
#[derive(Debug, Clone, Copy)]
pub struct GroupRequest<'a> {
    pub id: u8,
    pub members: &'a [usize],
    pub step_interval_ms: u16,
    pub name: Option<&'a str>,
}

impl GroupRequest<'_> {
    /// Prüft die Anfrage ohne Seiteneffekte
    pub fn validate(&self, output_count: usize) -> Result<GroupId, CommandError> {
        let id = GroupId::new(self.id).ok_or(CommandError::InvalidParams)?;

        if !(MIN_GROUP_MEMBERS..=MAX_GROUP_MEMBERS).contains(&self.members.len()) {
            return Err(CommandError::InvalidParams);
        }
        if self.step_interval_ms < MIN_STEP_INTERVAL_MS {
            return Err(CommandError::InvalidParams);
        }
        for (i, &member) in self.members.iter().enumerate() {
            if member >= output_count || self.members[..i].contains(&member) {
                return Err(CommandError::InvalidParams);
            }
        }
        Ok(id)
    }
}

/// Standard-Bezeichnung "Group {id}"
pub fn default_group_name(id: GroupId) -> Name {
    let mut name = Name::new();
    // "Group 255" passt immer in 20 Bytes
    let _ = write!(name, "Group {}", id.get());
    name
}

pub struct GroupTable {
    slots: [Option<ChasingGroup>; MAX_GROUPS],
}

impl Default for GroupTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTable {
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; MAX_GROUPS],
        }
    }

    pub fn get(&self, id: GroupId) -> Option<&ChasingGroup> {
        self.iter().find(|g| g.id == id)
    }

    /// Alle aktiven Gruppen in Slot-Reihenfolge
    pub fn iter(&self) -> impl Iterator<Item = &ChasingGroup> {
        self.slots.iter().flatten()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChasingGroup> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn position(&self, id: GroupId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|g| g.id == id))
    }

    /// Slot derselben ID wiederverwenden, sonst den ersten freien
    fn find_slot(&self, id: GroupId) -> Result<usize, CommandError> {
        self.position(id)
            .or_else(|| self.slots.iter().position(Option::is_none))
            .ok_or(CommandError::NoCapacity)
    }

    /// Legt eine Gruppe an oder ersetzt die Gruppe mit derselben ID
    ///
    /// Es wird komplett validiert, bevor irgendetwas verändert wird.
    /// Mitglieder anderer Gruppen werden dort herausgelöst; fällt eine
    /// Gruppe dadurch unter zwei Mitglieder, wird sie aufgelöst.
    pub fn create<const N: usize, P: PwmWriter>(
        &mut self,
        outputs: &mut OutputRegistry<N>,
        pwm: &mut P,
        request: &GroupRequest<'_>,
        now_ms: u32,
    ) -> Result<GroupId, CommandError> {
        let id = request.validate(outputs.len())?;
        let slot = self.find_slot(id)?;

        // Update: bisherige Mitglieder, die nicht mehr dabei sind, ausschalten
        if let Some(previous) = self.slots[slot].take() {
            for &member in previous.members.iter() {
                let member = usize::from(member);
                if !request.members.contains(&member) {
                    outputs.release(pwm, member);
                }
            }
        }

        for &member in request.members {
            let owner = outputs.get(member).and_then(|o| o.group);
            if let Some(owner) = owner.filter(|&owner| owner != id) {
                self.detach(outputs, pwm, owner, member);
            }
        }

        let name = request
            .name
            .map(logic::normalize_name::<MAX_NAME_LEN>)
            .filter(|n: &Name| !n.is_empty())
            .unwrap_or_else(|| default_group_name(id));

        let mut members: Vec<u8, MAX_GROUP_MEMBERS> = Vec::new();
        for (step, &member) in request.members.iter().enumerate() {
            // validate() garantiert member < N <= MAX_OUTPUTS und Anzahl <= 8
            let _ = members.push(member as u8);
            if let Some(output) = outputs.get_mut(member) {
                output.group = Some(id);
                output.active = true;
                output.blink_on = false;
                let level = if step == 0 { output.level } else { 0 };
                drive(pwm, member, level);
            }
        }

        info!(
            "Group {} '{}': {} outputs, step {}ms",
            id.get(),
            name.as_str(),
            members.len(),
            request.step_interval_ms
        );

        self.slots[slot] = Some(ChasingGroup {
            id,
            name,
            members,
            step_interval_ms: request.step_interval_ms,
            current_step: 0,
            last_step_ms: now_ms,
        });
        Ok(id)
    }

    /// Entfernt einen Output aus der Gruppe `owner`
    fn detach<const N: usize, P: PwmWriter>(
        &mut self,
        outputs: &mut OutputRegistry<N>,
        pwm: &mut P,
        owner: GroupId,
        member: usize,
    ) {
        let Some(slot) = self.position(owner) else {
            return;
        };
        let Some(group) = self.slots[slot].as_mut() else {
            return;
        };
        let Some(position) = group.members.iter().position(|&m| usize::from(m) == member) else {
            return;
        };

        group.members.remove(position);
        if let Some(output) = outputs.get_mut(member) {
            output.group = None;
        }
        info!("Group {}: output {} moved to another group", owner.get(), member);

        if group.members.len() < MIN_GROUP_MEMBERS {
            let remaining = core::mem::take(&mut group.members);
            self.slots[slot] = None;
            for &m in remaining.iter() {
                outputs.release(pwm, usize::from(m));
            }
            warn!("Group {} dissolved: fewer than {} members left", owner.get(), MIN_GROUP_MEMBERS);
            return;
        }

        let was_current = position == group.current_step;
        if position < group.current_step {
            group.current_step -= 1;
        }
        if group.current_step >= group.members.len() {
            group.current_step = 0;
        }
        if was_current {
            if let Some(lit) = group.current_member() {
                let level = outputs.get(lit).map_or(0, |o| o.level);
                drive(pwm, lit, level);
            }
        }
    }

    /// Löscht eine Gruppe und schaltet alle Mitglieder aus
    pub fn delete<const N: usize, P: PwmWriter>(
        &mut self,
        outputs: &mut OutputRegistry<N>,
        pwm: &mut P,
        id: u8,
    ) -> Result<(), CommandError> {
        let id = GroupId::new(id).ok_or(CommandError::NotFound)?;
        let slot = self.position(id).ok_or(CommandError::NotFound)?;
        let Some(group) = self.slots[slot].take() else {
            return Err(CommandError::NotFound);
        };

        for &member in group.members.iter() {
            outputs.release(pwm, usize::from(member));
        }
        info!("Group {} deleted, {} outputs released", id.get(), group.members.len());
        Ok(())
    }

    /// Benennt eine Gruppe um; leer oder `None` = "Group {id}"
    pub fn rename(&mut self, id: u8, name: Option<&str>) -> Result<(), CommandError> {
        let id = GroupId::new(id).ok_or(CommandError::NotFound)?;
        let group = self.iter_mut().find(|g| g.id == id).ok_or(CommandError::NotFound)?;

        group.name = name
            .map(logic::normalize_name::<MAX_NAME_LEN>)
            .filter(|n: &Name| !n.is_empty())
            .unwrap_or_else(|| default_group_name(id));
        info!("Group {} renamed to '{}'", id.get(), group.name.as_str());
        Ok(())
    }

    /// Übernimmt eine bereits validierte Gruppe beim Boot
    ///
    /// Erstes Mitglied leuchtet, alle anderen sind aus. `active` der
    /// Mitglieder kommt unverändert aus dem Record.
    pub(crate) fn restore<const N: usize, P: PwmWriter>(
        &mut self,
        outputs: &mut OutputRegistry<N>,
        pwm: &mut P,
        group: ChasingGroup,
    ) -> Result<(), CommandError> {
        let slot = self.find_slot(group.id)?;
        for (step, &member) in group.members.iter().enumerate() {
            let member = usize::from(member);
            if let Some(output) = outputs.get_mut(member) {
                output.group = Some(group.id);
                output.blink_on = false;
                let level = if step == 0 { output.level } else { 0 };
                drive(pwm, member, level);
            }
        }
        self.slots[slot] = Some(group);
        Ok(())
    }

    /// Verwirft alle Gruppen ohne Hardware-Zugriff
    pub(crate) fn clear(&mut self) {
        self.slots = [const { None }; MAX_GROUPS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullPwm;

    impl PwmWriter for NullPwm {
        fn set_level(&mut self, _index: usize, _level: u8) -> Result<(), crate::LedError> {
            Ok(())
        }
    }

    fn request(id: u8, members: &[usize]) -> GroupRequest<'_> {
        GroupRequest {
            id,
            members,
            step_interval_ms: 100,
            name: None,
        }
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        assert_eq!(request(0, &[0, 1]).validate(7), Err(CommandError::InvalidParams));
        assert_eq!(request(1, &[0]).validate(7), Err(CommandError::InvalidParams));
        assert_eq!(request(1, &[0, 0]).validate(7), Err(CommandError::InvalidParams));
        assert_eq!(request(1, &[0, 7]).validate(7), Err(CommandError::InvalidParams));
        assert_eq!(
            request(1, &[0, 1, 2, 3, 4, 5, 6, 0, 1]).validate(7),
            Err(CommandError::InvalidParams)
        );

        let slow = GroupRequest {
            step_interval_ms: 49,
            ..request(1, &[0, 1])
        };
        assert_eq!(slow.validate(7), Err(CommandError::InvalidParams));
    }

    #[test]
    fn test_validate_accepts_minimum_interval() {
        let req = GroupRequest {
            step_interval_ms: MIN_STEP_INTERVAL_MS,
            ..request(255, &[6, 0])
        };
        assert_eq!(req.validate(7).map(GroupId::get), Ok(255));
    }

    #[test]
    fn test_default_group_name() {
        let id = GroupId::new(42).unwrap();
        assert_eq!(default_group_name(id).as_str(), "Group 42");
    }

    #[test]
    fn test_no_capacity_after_four_groups() {
        let mut outputs = OutputRegistry::new([1, 2, 3, 4, 5, 6, 7, 8]);
        let mut table = GroupTable::new();
        let mut pwm = NullPwm;

        for (id, pair) in [[0, 1], [2, 3], [4, 5], [6, 7]].iter().enumerate() {
            table
                .create(&mut outputs, &mut pwm, &request(id as u8 + 1, pair), 0)
                .unwrap();
        }
        assert_eq!(table.len(), 4);

        // Neue ID ohne freien Slot
        let err = table.create(&mut outputs, &mut pwm, &request(9, &[0, 2]), 0);
        assert_eq!(err, Err(CommandError::NoCapacity));
        assert_eq!(outputs.get(0).unwrap().group, GroupId::new(1));

        // Bestehende ID darf aktualisiert werden
        assert!(table.create(&mut outputs, &mut pwm, &request(4, &[7, 6]), 0).is_ok());
    }

    #[test]
    fn test_steal_dissolves_small_group() {
        let mut outputs = OutputRegistry::new([1, 2, 3, 4]);
        let mut table = GroupTable::new();
        let mut pwm = NullPwm;

        table.create(&mut outputs, &mut pwm, &request(1, &[0, 1]), 0).unwrap();
        table.create(&mut outputs, &mut pwm, &request(2, &[1, 2]), 0).unwrap();

        assert!(table.get(GroupId::new(1).unwrap()).is_none());
        let first = outputs.get(0).unwrap();
        assert!(!first.active);
        assert_eq!(first.group, None);
        assert_eq!(outputs.get(1).unwrap().group, GroupId::new(2));
    }

    #[test]
    fn test_steal_keeps_larger_group() {
        let mut outputs = OutputRegistry::new([1, 2, 3, 4, 5]);
        let mut table = GroupTable::new();
        let mut pwm = NullPwm;

        table.create(&mut outputs, &mut pwm, &request(1, &[0, 1, 2]), 0).unwrap();
        table.create(&mut outputs, &mut pwm, &request(2, &[2, 3]), 0).unwrap();

        let first = table.get(GroupId::new(1).unwrap()).unwrap();
        assert_eq!(first.members.as_slice(), &[0, 1]);
        assert_eq!(outputs.get(2).unwrap().group, GroupId::new(2));
    }
}
