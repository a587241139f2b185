//! Hardware Abstraction Traits
//!
//! Diese Traits definieren Schnittstellen für Hardware-Zugriff
//! ohne konkrete Implementierung. Der nichtflüchtige Speicher nutzt
//! direkt `embedded_storage::Storage`.

use rgb::RGB8;

/// Fehler-Typ für LED- und PWM-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    WriteFailed,
    /// Output-Index hat keinen PWM-Kanal
    InvalidChannel,
}

/// Trait für die dimmbaren Outputs
///
/// Der Index ist der Output-Index in der Registry (nicht die GPIO-Nummer).
/// `level` ist der PWM Duty-Cycle 0-255.
///
/// # Implementierungen
/// - **Production:** LedcPwmWriter (ESP32 LEDC Peripheral)
/// - **Testing:** MockPwmWriter (in-memory Mock)
pub trait PwmWriter {
    fn set_level(&mut self, index: usize, level: u8) -> Result<(), LedError>;
}

/// Trait für SmartLED Hardware-Zugriff
///
/// Abstrahiert den Zugriff auf die Status-LED (WS2812/Neopixel).
///
/// # Implementierungen
/// - **Production:** RmtLedWriter (ESP32 RMT Peripheral)
/// - **Testing:** MockLedWriter (in-memory Mock)
pub trait SmartLedWriter: Send {
    /// Schreibt eine RGB-Farbe auf die LED
    ///
    /// # Fehlerbehandlung
    /// Gibt `LedError::WriteFailed` zurück wenn Hardware-Zugriff fehlschlägt
    fn write(&mut self, color: RGB8) -> Result<(), LedError>;
}

/// Setzt einen Output auf `level` und loggt Hardware-Fehler
///
/// Ein fehlgeschlagener Schreibzugriff bricht weder Tick noch Kommando ab.
pub(crate) fn drive<P: PwmWriter>(pwm: &mut P, index: usize, level: u8) {
    if let Err(e) = pwm.set_level(index, level) {
        error!("PWM: failed to set output {} to {}: {}", index, level, e);
    }
}
