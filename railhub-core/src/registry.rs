//! Output Registry
//!
//! Feste Tabelle aller Outputs. Einträge werden beim Boot angelegt und
//! danach nur noch verändert, nie entfernt.

use crate::error::CommandError;
use crate::traits::{PwmWriter, drive};
use crate::types::{Name, Output};
use crate::{MAX_OUTPUTS, logic};

pub struct OutputRegistry<const N: usize> {
    outputs: [Output; N],
}

impl<const N: usize> OutputRegistry<N> {
    /// Legt die Registry für die gegebenen GPIO-Nummern an
    pub fn new(channels: [u8; N]) -> Self {
        const { assert!(N <= MAX_OUTPUTS, "too many outputs for the persisted record") };
        Self {
            outputs: channels.map(Output::new),
        }
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn get(&self, index: usize) -> Option<&Output> {
        self.outputs.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Output> {
        self.outputs.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Output> {
        self.outputs.iter_mut()
    }

    /// Löst eine Channel-Referenz (GPIO) in den Output-Index auf
    pub fn index_of(&self, channel: u8) -> Result<usize, CommandError> {
        self.outputs
            .iter()
            .position(|o| o.channel == channel)
            .ok_or(CommandError::UnknownChannel)
    }

    /// Schaltet einen Output und setzt seine Helligkeit
    ///
    /// Prozentwerte werden auf 0-100 begrenzt. Gehört der Output zu einer
    /// Lauflicht-Gruppe, wird nur der Zustand übernommen, den Pegel setzt
    /// der Scheduler beim nächsten Schritt. Gibt den Output-Index zurück.
    pub fn set_output<P: PwmWriter>(
        &mut self,
        pwm: &mut P,
        channel: u8,
        active: bool,
        brightness_percent: i32,
        now_ms: u32,
    ) -> Result<usize, CommandError> {
        let index = self.index_of(channel)?;
        let output = &mut self.outputs[index];

        output.active = active;
        output.level = logic::percent_to_level(brightness_percent);

        if output.group.is_none() {
            if active {
                output.blink_on = true;
                output.last_blink_ms = now_ms;
                drive(pwm, index, output.level);
            } else {
                output.blink_on = false;
                drive(pwm, index, 0);
            }
        }

        info!(
            "Output {} (GPIO {}): {} @ {}%",
            index,
            channel,
            if active { "ON" } else { "OFF" },
            output.brightness_percent()
        );
        Ok(index)
    }

    /// Setzt den Anzeigenamen; leer (nach Trim) = Standard-Bezeichnung
    pub fn set_name(&mut self, channel: u8, name: &str) -> Result<usize, CommandError> {
        let index = self.index_of(channel)?;
        let name: Name = logic::normalize_name(name);
        if name.is_empty() {
            info!("Output {} (GPIO {}): custom name removed", index, channel);
        } else {
            info!("Output {} (GPIO {}): renamed to '{}'", index, channel, name.as_str());
        }
        self.outputs[index].name = name;
        Ok(index)
    }

    /// Setzt das Blink-Intervall (0 = dauerhaft an)
    ///
    /// Das Blinken startet in der An-Phase. Gruppen-Mitglieder werden nicht
    /// angesteuert, solange die Gruppe sie besitzt.
    pub fn set_interval<P: PwmWriter>(
        &mut self,
        pwm: &mut P,
        channel: u8,
        interval_ms: u16,
        now_ms: u32,
    ) -> Result<usize, CommandError> {
        let index = self.index_of(channel)?;
        let output = &mut self.outputs[index];

        output.blink_interval_ms = interval_ms;
        output.last_blink_ms = now_ms;
        output.blink_on = true;

        if output.active && output.group.is_none() {
            drive(pwm, index, output.level);
        }

        if interval_ms > 0 {
            info!("Output {} (GPIO {}): blink every {}ms", index, channel, interval_ms);
        } else {
            info!("Output {} (GPIO {}): blinking disabled (solid)", index, channel);
        }
        Ok(index)
    }

    /// Löst einen Output aus seiner Gruppe und schaltet ihn aus
    pub(crate) fn release<P: PwmWriter>(&mut self, pwm: &mut P, index: usize) {
        if let Some(output) = self.outputs.get_mut(index) {
            output.group = None;
            output.active = false;
            output.blink_on = false;
            drive(pwm, index, 0);
        }
    }

    /// Treibt alle ungruppierten Outputs auf ihren Soll-Zustand
    ///
    /// Blinkende Outputs starten in der An-Phase.
    pub(crate) fn drive_ungrouped<P: PwmWriter>(&mut self, pwm: &mut P, now_ms: u32) {
        for (index, output) in self.outputs.iter_mut().enumerate() {
            if output.group.is_some() {
                continue;
            }
            output.last_blink_ms = now_ms;
            output.blink_on = output.active;
            drive(pwm, index, if output.active { output.level } else { 0 });
        }
    }
}
