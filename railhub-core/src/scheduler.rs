//! Tick Scheduler
//!
//! Wird bei jedem Durchlauf der Control-Loop aufgerufen. Es gibt keine
//! eigenen Timer: Alle Entscheidungen basieren auf der vergangenen Zeit
//! seit dem letzten Schritt bzw. Toggle.
//!
//! Reihenfolge pro Tick:
//! 1. Lauflicht-Gruppen weiterschalten
//! 2. Blinken für alle Outputs OHNE Gruppe
//!
//! Gruppen-Mitglieder werden im Blink-Durchlauf komplett übersprungen.

use crate::groups::GroupTable;
use crate::registry::OutputRegistry;
use crate::traits::{PwmWriter, drive};

/// Vergangene Zeit seit `since`, korrekt über den u32-Überlauf hinweg
#[inline]
pub fn elapsed_ms(now_ms: u32, since_ms: u32) -> u32 {
    now_ms.wrapping_sub(since_ms)
}

/// Ein Scheduler-Durchlauf
pub fn tick<const N: usize, P: PwmWriter>(
    outputs: &mut OutputRegistry<N>,
    groups: &mut GroupTable,
    pwm: &mut P,
    now_ms: u32,
) {
    step_groups(outputs, groups, pwm, now_ms);
    toggle_blinks(outputs, pwm, now_ms);
}

fn step_groups<const N: usize, P: PwmWriter>(
    outputs: &mut OutputRegistry<N>,
    groups: &mut GroupTable,
    pwm: &mut P,
    now_ms: u32,
) {
    for group in groups.iter_mut() {
        if group.members.is_empty() {
            continue;
        }
        if elapsed_ms(now_ms, group.last_step_ms) < u32::from(group.step_interval_ms) {
            continue;
        }

        if let Some(current) = group.current_member() {
            drive(pwm, current, 0);
        }
        group.current_step = (group.current_step + 1) % group.members.len();
        group.last_step_ms = now_ms;

        if let Some(next) = group.current_member() {
            // Unabhängig von `active` des Mitglieds
            let level = outputs.get(next).map_or(0, |o| o.level);
            drive(pwm, next, level);
            debug!("Group {}: step {} -> output {}", group.id.get(), group.current_step, next);
        }
    }
}

fn toggle_blinks<const N: usize, P: PwmWriter>(outputs: &mut OutputRegistry<N>, pwm: &mut P, now_ms: u32) {
    for (index, output) in outputs.iter_mut().enumerate() {
        if output.group.is_some() || !output.active {
            continue;
        }

        if output.blink_interval_ms == 0 {
            // Dauerhaft an: nur neu schreiben, wenn die Phase aus war
            if !output.blink_on {
                output.blink_on = true;
                drive(pwm, index, output.level);
            }
            continue;
        }

        if elapsed_ms(now_ms, output.last_blink_ms) >= u32::from(output.blink_interval_ms) {
            output.blink_on = !output.blink_on;
            output.last_blink_ms = now_ms;
            drive(pwm, index, if output.blink_on { output.level } else { 0 });
        }
    }
}
