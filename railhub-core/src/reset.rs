//! Factory-Reset über langes Drücken einer Taste
//!
//! Wird bei jedem Durchlauf der Control-Loop mit dem aktuellen
//! Tasten-Zustand abgetastet. Kein eigener Timer: Loslassen vor Ablauf
//! der Schwelle setzt alles zurück.

use crate::scheduler::elapsed_ms;

/// Ergebnis eines Abtast-Schritts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HoldEvent {
    /// Taste nicht gedrückt
    Idle,
    /// Flanke: Taste wurde gerade gedrückt
    Pressed,
    /// Taste weiterhin gedrückt, Schwelle nicht erreicht
    Holding { held_ms: u32 },
    /// Warn-Schwelle erreicht (einmal pro Druck)
    Warning { held_ms: u32 },
    /// Reset-Schwelle erreicht (einmal pro Druck)
    Triggered,
    /// Taste losgelassen
    Released { held_ms: u32 },
}

#[derive(Debug, Clone)]
pub struct HoldTrigger {
    threshold_ms: u32,
    warning_ms: u32,
    pressed_since: Option<u32>,
    warned: bool,
    fired: bool,
}

impl HoldTrigger {
    pub const fn new(threshold_ms: u32, warning_ms: u32) -> Self {
        Self {
            threshold_ms,
            warning_ms,
            pressed_since: None,
            warned: false,
            fired: false,
        }
    }

    /// Wie lange die Taste aktuell gehalten wird
    pub fn held_ms(&self, now_ms: u32) -> Option<u32> {
        self.pressed_since.map(|since| elapsed_ms(now_ms, since))
    }

    pub fn sample(&mut self, pressed: bool, now_ms: u32) -> HoldEvent {
        match (pressed, self.pressed_since) {
            (false, None) => HoldEvent::Idle,
            (false, Some(since)) => {
                let held_ms = elapsed_ms(now_ms, since);
                self.pressed_since = None;
                self.warned = false;
                self.fired = false;
                HoldEvent::Released { held_ms }
            }
            (true, None) => {
                self.pressed_since = Some(now_ms);
                HoldEvent::Pressed
            }
            (true, Some(since)) => {
                let held_ms = elapsed_ms(now_ms, since);
                if self.fired {
                    HoldEvent::Holding { held_ms }
                } else if held_ms >= self.threshold_ms {
                    self.fired = true;
                    info!("Reset button held for {}ms: factory reset", held_ms);
                    HoldEvent::Triggered
                } else if held_ms >= self.warning_ms && !self.warned {
                    self.warned = true;
                    warn!("Reset button held for {}ms, release to cancel", held_ms);
                    HoldEvent::Warning { held_ms }
                } else {
                    HoldEvent::Holding { held_ms }
                }
            }
        }
    }
}
