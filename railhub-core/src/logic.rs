//! Pure Business Logic Functions
//!
//! Funktionen ohne Hardware-Dependencies (testbar!)

use heapless::String;

/// Rechnet Helligkeit in Prozent in den PWM-Level 0-255 um
///
/// Werte außerhalb von 0-100 werden begrenzt, nicht abgelehnt.
/// Gerundet wird kaufmännisch: `round(percent * 255 / 100)`.
///
/// # Beispiele
///
/// ```
/// # use railhub_core::percent_to_level;
/// assert_eq!(percent_to_level(0), 0);
/// assert_eq!(percent_to_level(50), 128);
/// assert_eq!(percent_to_level(100), 255);
/// assert_eq!(percent_to_level(150), 255);
/// ```
pub fn percent_to_level(percent: i32) -> u8 {
    let percent = percent.clamp(0, 100) as u32;
    ((percent * 255 + 50) / 100) as u8
}

/// Rechnet einen PWM-Level 0-255 zurück in Prozent
///
/// ```
/// # use railhub_core::level_to_percent;
/// assert_eq!(level_to_percent(0), 0);
/// assert_eq!(level_to_percent(128), 50);
/// assert_eq!(level_to_percent(255), 100);
/// ```
pub fn level_to_percent(level: u8) -> u8 {
    let level = u32::from(level);
    ((level * 200 + 255) / 510) as u8
}

/// Bereinigt einen Anzeigenamen
///
/// Entfernt Whitespace am Rand und kürzt auf `CAP` Bytes, ohne ein
/// UTF-8 Zeichen zu zerschneiden. Ein leeres Ergebnis bedeutet
/// "Standard-Bezeichnung verwenden".
pub fn normalize_name<const CAP: usize>(raw: &str) -> String<CAP> {
    let mut name = String::new();
    for ch in raw.trim().chars() {
        if name.push(ch).is_err() {
            break;
        }
    }
    name
}

/// Leitet den mDNS-Hostnamen aus dem Gerätenamen ab
///
/// Kleinbuchstaben, Leerzeichen und `_` werden zu `-`, alles außer
/// `[a-z0-9-]` fällt weg. Bleibt nichts übrig, wird `fallback` genutzt.
///
/// ```
/// # use railhub_core::hostname_from_device_name;
/// let host = hostname_from_device_name::<32>("RailHub C6 #01", "railhub");
/// assert_eq!(host.as_str(), "railhub-c6-01");
/// ```
pub fn hostname_from_device_name<const CAP: usize>(device_name: &str, fallback: &str) -> String<CAP> {
    let mut host: String<CAP> = String::new();
    for ch in device_name.trim().chars() {
        let mapped = match ch {
            'a'..='z' | '0'..='9' | '-' => ch,
            'A'..='Z' => ch.to_ascii_lowercase(),
            ' ' | '_' => '-',
            _ => continue,
        };
        if host.push(mapped).is_err() {
            break;
        }
    }

    while host.ends_with('-') {
        host.pop();
    }

    if host.is_empty() {
        for ch in fallback.chars() {
            if host.push(ch).is_err() {
                break;
            }
        }
    }
    host
}
