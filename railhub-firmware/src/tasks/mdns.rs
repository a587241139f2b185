// mDNS Responder Task - Advertised Hostname via Multicast DNS
//
// Der ESP32-C6 wird unter einem lesbaren Hostnamen (z.B. "railhub-c6-01.local")
// im lokalen Netzwerk erreichbar, ohne dass ein DNS-Server benötigt wird.
// Der Hostname wird aus dem aktuellen Gerätenamen abgeleitet.
//
// Technische Details:
// - Protokoll: mDNS (RFC 6762)
// - Transport: UDP Multicast auf 224.0.0.251:5353
// - Unterstützt: A-Records (IPv4 Hostname-Auflösung)
// - Library: edge-mdns 0.6.1 (no_std)
// - Adapter: edge-nal-embassy 0.7.0 (embassy-net Integration)

use defmt::{Debug2Format, error, info, warn};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};

use core::net::{Ipv4Addr, SocketAddr};
use core::sync::atomic::{AtomicU32, Ordering};

use edge_mdns::{HostAnswersMdnsHandler, buf::VecBufAccess, domain::base::Ttl, host::Host, io};
use edge_nal::{MulticastV4, UdpBind, UdpSplit};
use edge_nal_embassy::{Udp, UdpBuffers};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;
use heapless::String;
use railhub_core::hostname_from_device_name;

use crate::AppState;
use crate::config::{
    FALLBACK_HOSTNAME, MDNS_HOSTNAME_LEN, MDNS_MULTICAST_ADDR, MDNS_PACKET_BUFFER_SIZE, MDNS_PORT,
    MDNS_RECONNECT_DELAY_SECS, MDNS_TTL_SECS, MDNS_UDP_BUFFER_SIZE,
};

type MdnsUdpBuffers = UdpBuffers<1, MDNS_UDP_BUFFER_SIZE, MDNS_UDP_BUFFER_SIZE>;

/// Atomischer Counter für Random Number Generator
///
/// Wird für mDNS Transaction IDs verwendet. Ein einfacher Counter
/// ist für mDNS ausreichend, da keine kryptographische Sicherheit
/// benötigt wird.
static RNG_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Random Number Generator für mDNS
///
/// Nutzt einen wrapping counter statt echter Zufallszahlen.
fn mdns_rng(buf: &mut [u8]) {
    let mut counter = RNG_COUNTER.fetch_add(1, Ordering::Relaxed);
    for chunk in buf.chunks_mut(4) {
        let bytes = counter.to_le_bytes();
        let len = chunk.len().min(4);
        chunk[..len].copy_from_slice(&bytes[..len]);
        counter = counter.wrapping_add(1);
    }
}

/// mDNS Responder Task
///
/// Advertised den ESP32-C6 unter `<hostname>.local`, wobei der Hostname
/// bei jedem (Neu-)Start des Responders aus dem Gerätenamen abgeleitet
/// wird. Eine Umbenennung wird damit spätestens nach einem Reconnect
/// sichtbar.
///
/// # Ablauf
/// 1. Wartet auf WiFi-Link und DHCP-Adresse
/// 2. Bindet `0.0.0.0:MDNS_PORT` und joined `MDNS_MULTICAST_ADDR`
/// 3. Beantwortet A-Record Queries (TTL: MDNS_TTL_SECS)
/// 4. Bei Fehlern: Neustart nach MDNS_RECONNECT_DELAY_SECS
#[embassy_executor::task]
pub async fn mdns_responder_task(state: &'static AppState) {
    info!("mDNS: Task started, waiting for network...");
    let udp_buffers = MdnsUdpBuffers::new();

    loop {
        wait_for_network(state.stack).await;

        let hostname: String<MDNS_HOSTNAME_LEN> = state.controller.lock(|c| {
            hostname_from_device_name(c.borrow().device_name(), FALLBACK_HOSTNAME)
        });

        match run_mdns_responder(state.stack, &udp_buffers, &hostname).await {
            Ok(_) => warn!("mDNS: Responder stopped normally"),
            Err(e) => error!("mDNS: Error: {}", e),
        }
        info!("mDNS: Reconnecting in {}s...", MDNS_RECONNECT_DELAY_SECS);
        Timer::after(Duration::from_secs(MDNS_RECONNECT_DELAY_SECS)).await;
    }
}

/// Wartet bis WiFi-Link und IPv4-Konfiguration verfügbar sind
///
/// Prüft alle 500ms - Balance zwischen Reaktivität und CPU-Last
async fn wait_for_network(stack: Stack<'static>) {
    loop {
        if stack.is_link_up() && stack.config_v4().is_some() {
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Führt mDNS Responder Loop aus
///
/// Der UDP-Stack wird via `edge-nal-embassy` erstellt, welcher als Adapter
/// zwischen `edge-mdns` (benötigt edge-nal traits) und `embassy-net` dient.
///
/// Die UDP-Buffers gehören dem Task und überleben damit jeden Neustart
/// des Responders.
async fn run_mdns_responder(
    stack: Stack<'static>,
    udp_buffers: &MdnsUdpBuffers,
    hostname: &str,
) -> Result<(), MdnsError> {
    // IP-Adresse vom DHCP holen (Lease kann seit dem Warten verloren sein)
    let our_ip = stack
        .config_v4()
        .ok_or(MdnsError::NoAddress)?
        .address
        .address();
    info!("mDNS: Using IP {}", Debug2Format(&our_ip));

    let udp_stack = Udp::new(stack, udp_buffers);

    // Multicast Socket auf 0.0.0.0:MDNS_PORT binden
    let mut socket = udp_stack
        .bind(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), MDNS_PORT))
        .await
        .map_err(|_| MdnsError::SocketBindFailed)?;

    socket
        .join_v4(Ipv4Addr::from(MDNS_MULTICAST_ADDR), Ipv4Addr::UNSPECIFIED)
        .await
        .map_err(|_| MdnsError::MulticastJoinFailed)?;

    // Socket in RX/TX splitten für edge-mdns API
    let (recv, send) = socket.split();

    let host = Host {
        hostname,
        ipv4: our_ip.into(),
        ipv6: [0u8; 16].into(), // kein proto-ipv6 in smoltcp
        ttl: Ttl::from_secs(MDNS_TTL_SECS),
    };

    let recv_buf = VecBufAccess::<NoopRawMutex, MDNS_PACKET_BUFFER_SIZE>::new();
    let send_buf = VecBufAccess::<NoopRawMutex, MDNS_PACKET_BUFFER_SIZE>::new();

    // Signal für Broadcast-Notifications (nicht verwendet, aber von API benötigt)
    let signal = Signal::<NoopRawMutex, ()>::new();

    let mdns = io::Mdns::new(
        Some(our_ip),
        None,
        recv,
        send,
        recv_buf,
        send_buf,
        mdns_rng,
        &signal,
    );

    info!("mDNS: Responder running, advertising '{}.local'", hostname);

    // Läuft bis ein Fehler auftritt (nur A-Records, kein Service Discovery)
    mdns.run(HostAnswersMdnsHandler::new(&host))
        .await
        .map_err(|_| MdnsError::ResponderFailed)?;

    Ok(())
}

/// mDNS Fehler-Typen
///
/// Jeder Fehler führt zu einem Reconnect-Versuch im Haupt-Loop.
#[derive(Debug)]
enum MdnsError {
    /// DHCP-Lease ging zwischen Warten und Start verloren
    NoAddress,
    /// UDP Socket konnte nicht auf Port MDNS_PORT gebunden werden
    SocketBindFailed,
    /// Multicast-Gruppe konnte nicht gejoint werden
    MulticastJoinFailed,
    /// mDNS Responder Loop ist fehlgeschlagen (z.B. Verbindung verloren)
    ResponderFailed,
}

impl defmt::Format for MdnsError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MdnsError::NoAddress => defmt::write!(fmt, "No IPv4 address"),
            MdnsError::SocketBindFailed => defmt::write!(fmt, "Socket bind failed"),
            MdnsError::MulticastJoinFailed => defmt::write!(fmt, "Multicast join failed"),
            MdnsError::ResponderFailed => defmt::write!(fmt, "Responder failed"),
        }
    }
}
