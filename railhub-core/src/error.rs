//! Fehler-Typen der Core-Library
//!
//! Alle Fehler sind recoverable: Der Aufrufer bekommt eine Ablehnung,
//! der Zustand bleibt unverändert (validate-then-commit).

/// Ablehnungsgrund für ein Kommando
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Channel-Referenz (GPIO) gehört zu keinem Output
    UnknownChannel,
    /// Gruppen-ID, Mitgliederzahl, Duplikate oder Intervall ungültig
    InvalidParams,
    /// Alle Gruppen-Slots sind belegt
    NoCapacity,
    /// Gruppe existiert nicht
    NotFound,
}

impl CommandError {
    /// Kurzer Text für die Fehler-Antwort an den Client
    pub fn message(self) -> &'static str {
        match self {
            CommandError::UnknownChannel => "Output not found",
            CommandError::InvalidParams => "Invalid parameters",
            CommandError::NoCapacity => "No free chasing group slot",
            CommandError::NotFound => "Group not found",
        }
    }
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

/// Fehler beim Lesen/Schreiben des persistenten Records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Flash-Treiber hat einen Fehler gemeldet
    Io,
    /// Speicher ist gelöscht (0xFF) oder wurde nie beschrieben
    Blank,
    /// Checksumme oder Plausibilitätsprüfung fehlgeschlagen
    Corrupt,
}
