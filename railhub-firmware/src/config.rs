// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen
#![allow(dead_code)]

// ============================================================================
// Outputs (PWM über LEDC)
// ============================================================================

/// Anzahl der dimmbaren Outputs
/// Der ESP32-C6 hat 6 LEDC-Kanäle, daher maximal 6 Outputs
pub const OUTPUT_COUNT: usize = 6;

/// GPIO-Nummern der Outputs in Registry-Reihenfolge
/// Muss zur Pin-Zuordnung in `main.rs` passen
pub const OUTPUT_PINS: [u8; OUTPUT_COUNT] = [2, 3, 4, 5, 6, 7];

/// PWM-Frequenz in kHz (8 Bit Auflösung)
pub const PWM_FREQUENCY_KHZ: u32 = 1;

/// Takt der Control-Loop in Millisekunden
/// Kleinstes Gruppen-Intervall ist 50ms, 5ms Auflösung reicht
pub const TICK_INTERVAL_MS: u64 = 5;

/// Intervall für periodische Status-Broadcasts an alle WebSocket-Clients
pub const BROADCAST_INTERVAL_MS: u32 = 500;

// ============================================================================
// Gerät
// ============================================================================

/// Standard-Gerätename (wenn keiner gespeichert ist)
pub const DEVICE_NAME: &str = "RailHub-C6-01";

/// Fallback-Hostname, falls der Gerätename keine gültigen Zeichen enthält
pub const FALLBACK_HOSTNAME: &str = "railhub";

// ============================================================================
// Persistenz
// ============================================================================

/// Flash-Offset des gespeicherten Records
/// 0x9000 ist die NVS-Partition der Standard-Partitionstabelle
pub const STORAGE_OFFSET: u32 = 0x9000;

// ============================================================================
// Factory-Reset (BOOT-Taste, GPIO9)
// ============================================================================

/// Haltezeit bis zum Factory-Reset
pub const RESET_HOLD_MS: u32 = 3000;

/// Ab dieser Haltezeit blinkt die Status-LED rot
pub const RESET_WARNING_MS: u32 = 2500;

/// Dauer der Bestätigungs-Anzeige vor dem Neustart
pub const RESET_CONFIRM_MS: u32 = 1000;

// ============================================================================
// Status-LED Konfiguration
// ============================================================================

/// Helligkeits-Level für die Status-LED (0-255)
/// Wert ist gedimmt für Augenschonung
pub const LED_BRIGHTNESS: u8 = 10;

/// RMT Taktfrequenz in MHz
/// 80 MHz ist optimal für WS2812 LED-Timing
pub const RMT_CLOCK_MHZ: u32 = 80;

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// WiFi SSID (Netzwerk-Name)
/// Wird zur Build-Zeit aus der Environment Variable WIFI_SSID geladen
/// Setze diese in .env file
pub const WIFI_SSID: &str = env!(
    "WIFI_SSID",
    "WiFi SSID nicht gesetzt! Erstelle .env file mit WIFI_SSID und WIFI_PASSWORD"
);

/// WiFi Passwort
/// Wird zur Build-Zeit aus der Environment Variable WIFI_PASSWORD geladen
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WiFi Password nicht gesetzt! Erstelle .env file mit WIFI_SSID und WIFI_PASSWORD"
);

/// Wartezeit nach WiFi-Fehlern in Sekunden
pub const WIFI_RETRY_DELAY_SECS: u64 = 5;

/// Heap-Größe für WiFi (Bytes)
/// WiFi benötigt dynamischen Speicher für Pakete
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
pub const EXTRA_HEAP_SIZE: usize = 36864; // 36 KB

// ============================================================================
// mDNS-Konfiguration
// ============================================================================

/// Maximale Länge des mDNS Hostnamens (ohne .local)
pub const MDNS_HOSTNAME_LEN: usize = 32;

/// mDNS TTL (Time To Live) in Sekunden
pub const MDNS_TTL_SECS: u32 = 120;

/// mDNS Reconnect Delay in Sekunden
pub const MDNS_RECONNECT_DELAY_SECS: u64 = 5;

/// mDNS Port (Standard: 5353, RFC 6762)
pub const MDNS_PORT: u16 = 5353;

/// mDNS IPv4 Multicast-Adresse (224.0.0.251)
pub const MDNS_MULTICAST_ADDR: [u8; 4] = [224, 0, 0, 251];

/// UDP Buffer-Größen für mDNS (TX, RX in Bytes)
pub const MDNS_UDP_BUFFER_SIZE: usize = 512;

/// mDNS Receive/Send Buffer-Größen in Bytes
/// 1500 Bytes = Standard MTU für Ethernet/WiFi
pub const MDNS_PACKET_BUFFER_SIZE: usize = 1500;

// ============================================================================
// HTTP Server Konfiguration
// ============================================================================

/// Anzahl paralleler HTTP-Server Tasks
pub const HTTP_TASK_COUNT: usize = 4;

/// HTTP Buffer-Größe in Bytes
/// Für HTTP Request/Response Headers und Body
pub const HTTP_BUFFER_SIZE: usize = 2048;

/// TCP RX Buffer-Größe in Bytes
pub const TCP_RX_BUFFER_SIZE: usize = 1024;

/// TCP TX Buffer-Größe in Bytes
pub const TCP_TX_BUFFER_SIZE: usize = 1024;

/// WebSocket Message Buffer-Größe in Bytes
/// create_group mit 6 Outputs und Namen bleibt unter 200 Bytes
pub const WEBSOCKET_BUFFER_SIZE: usize = 512;

/// JSON Serialisierungs-Buffer für Status-Snapshots
/// 6 Outputs + 4 Gruppen mit vollen Namen: ca. 1.4 KB
pub const JSON_STATUS_BUFFER_SIZE: usize = 2048;

/// JSON Serialisierungs-Buffer für Ack/Error-Messages
/// Für {"type":"error","message":"..."}
pub const JSON_REPLY_BUFFER_SIZE: usize = 128;
