//! Status-LED Muster
//!
//! Die on-board RGB LED zeigt den Gerätezustand:
//! - WiFi verbindet: blau, langsam blinkend
//! - Verbunden: grün, dauerhaft
//! - Reset-Taste über Warn-Schwelle: rot, schnell blinkend
//! - Reset ausgelöst: rot, sehr schnell blinkend bis zum Neustart

use rgb::RGB8;

use crate::traits::SmartLedWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorState {
    Connecting,
    Connected,
    ResetArmed,
    Resetting,
}

impl IndicatorState {
    /// Halbe Periode in ms, `None` = dauerhaft an
    const fn blink_half_period_ms(self) -> Option<u32> {
        match self {
            IndicatorState::Connecting => Some(500),
            IndicatorState::Connected => None,
            IndicatorState::ResetArmed => Some(100),
            IndicatorState::Resetting => Some(50),
        }
    }
}

/// Farbe der Status-LED zum Zeitpunkt `now_ms`
pub fn indicator_color(state: IndicatorState, now_ms: u32, brightness: u8) -> RGB8 {
    let lit = match state.blink_half_period_ms() {
        None => true,
        Some(half) => (now_ms / half) % 2 == 0,
    };
    if !lit {
        return RGB8::default();
    }

    match state {
        IndicatorState::Connecting => RGB8::new(0, 0, brightness),
        IndicatorState::Connected => RGB8::new(0, brightness, 0),
        IndicatorState::ResetArmed | IndicatorState::Resetting => RGB8::new(brightness, 0, 0),
    }
}

/// Treibt die Status-LED und schreibt nur bei Farbwechsel
pub struct StatusIndicator<L: SmartLedWriter> {
    led: L,
    brightness: u8,
    last: Option<RGB8>,
}

impl<L: SmartLedWriter> StatusIndicator<L> {
    pub fn new(led: L, brightness: u8) -> Self {
        Self {
            led,
            brightness,
            last: None,
        }
    }

    pub fn update(&mut self, state: IndicatorState, now_ms: u32) {
        let color = indicator_color(state, now_ms, self.brightness);
        if self.last == Some(color) {
            return;
        }
        match self.led.write(color) {
            Ok(()) => self.last = Some(color),
            Err(e) => error!("Status LED: write failed: {}", e),
        }
    }

    pub fn led(&self) -> &L {
        &self.led
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_is_solid_green() {
        for now in [0, 499, 500, 12345] {
            assert_eq!(indicator_color(IndicatorState::Connected, now, 10), RGB8::new(0, 10, 0));
        }
    }

    #[test]
    fn test_connecting_blinks_blue() {
        assert_eq!(indicator_color(IndicatorState::Connecting, 0, 10), RGB8::new(0, 0, 10));
        assert_eq!(indicator_color(IndicatorState::Connecting, 500, 10), RGB8::default());
        assert_eq!(indicator_color(IndicatorState::Connecting, 1000, 10), RGB8::new(0, 0, 10));
    }

    #[test]
    fn test_reset_armed_blinks_fast() {
        assert_eq!(indicator_color(IndicatorState::ResetArmed, 50, 10), RGB8::new(10, 0, 0));
        assert_eq!(indicator_color(IndicatorState::ResetArmed, 150, 10), RGB8::default());
    }
}
