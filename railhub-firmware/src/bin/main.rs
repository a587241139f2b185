// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

// Heap Allocator (WiFi benötigt dynamischen Speicher)
extern crate alloc;

use core::cell::RefCell;

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, StackResources};
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Pull};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_storage::FlashStorage;

use defmt::info;
use embedded_storage::ReadStorage;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

// Projekt-Module und Konfiguration
use railhub_core::RecordStore;
use railhub_firmware::config::{
    DEVICE_NAME, EXTRA_HEAP_SIZE, HTTP_TASK_COUNT, OUTPUT_PINS, STORAGE_OFFSET, WIFI_HEAP_SIZE,
};
use railhub_firmware::hal::LedcPwmWriter;
use railhub_firmware::tasks::{
    connection_task, control_task, dhcp_task, http_server_task, mdns_responder_task, net_task,
};
use railhub_firmware::web::broadcast::format_mac;
use railhub_firmware::{AppState, FirmwareController, StatusChannel, now_ms};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Main Entry Point
///
/// Initialisiert Hardware, stellt den gespeicherten Zustand wieder her,
/// startet WiFi und spawnt Tasks. Danach schläft main() - alle Arbeit
/// läuft in Tasks.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Heap Allocator initialisieren (WiFi braucht dynamischen Speicher!)
    // Zwei Bereiche: reclaimed RAM (64 KB) + extra (36 KB) = 100 KB total
    esp_alloc::heap_allocator!(
        #[esp_hal::ram(reclaimed)]
        size: WIFI_HEAP_SIZE
    );
    esp_alloc::heap_allocator!(size: EXTRA_HEAP_SIZE);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    // Outputs: ein LEDC-Kanal pro Pin, Reihenfolge wie OUTPUT_PINS
    let pwm = LedcPwmWriter::new(
        peripherals.LEDC,
        [
            peripherals.GPIO2.into(),
            peripherals.GPIO3.into(),
            peripherals.GPIO4.into(),
            peripherals.GPIO5.into(),
            peripherals.GPIO6.into(),
            peripherals.GPIO7.into(),
        ],
    )
    .expect("Failed to initialize LEDC outputs");

    // Gespeicherten Zustand laden (Defaults bei leerem oder defektem Record)
    // Läuft vor dem WiFi-Start: Outputs stehen sofort nach dem Boot
    let flash = FlashStorage::new(peripherals.FLASH);
    let flash_size = flash.capacity() as u32;
    let mut controller: FirmwareController = FirmwareController::new(
        OUTPUT_PINS,
        pwm,
        RecordStore::new(flash, STORAGE_OFFSET),
        DEVICE_NAME,
    );
    controller.restore(now_ms());
    info!("Storage: device name '{}'", controller.device_name());

    // BOOT-Taste für Factory-Reset (aktiv low)
    let reset_button = Input::new(
        peripherals.GPIO9,
        InputConfig::default().with_pull(Pull::Up),
    );

    // WiFi Hardware initialisieren
    static RADIO_INIT: static_cell::StaticCell<esp_radio::Controller> =
        static_cell::StaticCell::new();
    let radio_init =
        RADIO_INIT.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));

    let (wifi_controller, wifi_interface) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi");

    let mac_address = format_mac(wifi_interface.sta.mac_address());
    info!("WiFi: MAC {}", mac_address.as_str());

    // Random seed für TCP/IP Stack (von Hardware RNG)
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    // 12 Sockets: HTTP-Listener (4) + mDNS (1) + DHCP (1) + Reserve
    static RESOURCES: static_cell::StaticCell<StackResources<12>> = static_cell::StaticCell::new();
    let resources = RESOURCES.init(StackResources::new());

    // embassy-net erstellt Stack + Runner (nutzt STA interface für Client-Modus)
    let (stack, runner) = embassy_net::new(
        wifi_interface.sta,
        NetConfig::dhcpv4(Default::default()),
        resources,
        seed,
    );

    // Gemeinsamer Zustand für alle Tasks
    static APP_STATE: static_cell::StaticCell<AppState> = static_cell::StaticCell::new();
    let state: &'static AppState = APP_STATE.init(AppState {
        controller: Mutex::new(RefCell::new(controller)),
        status: StatusChannel::new(),
        stack,
        mac_address,
        flash_size,
    });

    // Spawn Control Task (Scheduler, Status-LED, Reset-Taste)
    spawner
        .spawn(control_task(
            state,
            peripherals.GPIO8,
            peripherals.RMT,
            reset_button,
        ))
        .unwrap();

    // Spawn WiFi Tasks
    spawner.spawn(connection_task(wifi_controller)).unwrap();
    spawner.spawn(net_task(runner)).unwrap();
    spawner.spawn(dhcp_task(stack)).unwrap();

    // Spawn HTTP Server Tasks für concurrent connections
    for task_id in 0..HTTP_TASK_COUNT {
        spawner.spawn(http_server_task(task_id, state)).unwrap();
    }

    // Spawn mDNS Responder Task (Hostname aus dem Gerätenamen)
    spawner.spawn(mdns_responder_task(state)).unwrap();

    // Main-Loop: schläft (alle Arbeit läuft in Tasks)
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
