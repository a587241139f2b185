// Control Task - Scheduler-Takt, Status-LED und Factory-Reset
use defmt::{error, info, warn};
use embassy_time::{Duration, Timer};
use esp_hal::gpio::Input;
use esp_hal_smartled::smart_led_buffer;
use railhub_core::{HoldEvent, HoldTrigger, IndicatorState, SmartLedWriter, StatusIndicator, StatusSink};

use crate::config::{
    BROADCAST_INTERVAL_MS, LED_BRIGHTNESS, RESET_CONFIRM_MS, RESET_HOLD_MS, RESET_WARNING_MS,
    RMT_CLOCK_MHZ, TICK_INTERVAL_MS,
};
use crate::hal::RmtLedWriter;
use crate::web::broadcast::StatusBroadcaster;
use crate::{AppState, now_ms};

/// Control Loop - ohne Hardware-Initialisierung
///
/// Pro Durchlauf:
/// - Blink- und Lauflicht-Scheduler weiterschalten
/// - Reset-Taste abtasten (aktiv low)
/// - Status-LED nachführen
/// - alle `BROADCAST_INTERVAL_MS` einen Status-Snapshot publishen
///
/// Die Status-LED ist optional: Ohne LED läuft der Rest unverändert weiter.
pub async fn control_logic<L: SmartLedWriter>(
    state: &'static AppState,
    mut indicator: Option<StatusIndicator<L>>,
    reset_button: Input<'static>,
) -> ! {
    let mut reset = HoldTrigger::new(RESET_HOLD_MS, RESET_WARNING_MS);
    let mut armed = false;
    let mut last_broadcast = now_ms();

    loop {
        let now = now_ms();

        state.controller.lock(|c| c.borrow_mut().tick(now));

        match reset.sample(reset_button.is_low(), now) {
            HoldEvent::Pressed => info!("Reset: button pressed"),
            HoldEvent::Warning { held_ms } => {
                warn!("Reset: button held for {}ms, release to cancel", held_ms);
                armed = true;
            }
            HoldEvent::Triggered => factory_reset(state, &mut indicator).await,
            HoldEvent::Released { held_ms } => {
                if armed {
                    info!("Reset: cancelled after {}ms", held_ms);
                }
                armed = false;
            }
            HoldEvent::Idle | HoldEvent::Holding { .. } => {}
        }

        if let Some(indicator) = indicator.as_mut() {
            let led_state = if armed {
                IndicatorState::ResetArmed
            } else if state.stack.is_config_up() {
                IndicatorState::Connected
            } else {
                IndicatorState::Connecting
            };
            indicator.update(led_state, now);
        }

        if now.wrapping_sub(last_broadcast) >= BROADCAST_INTERVAL_MS {
            last_broadcast = now;
            let mut broadcaster = StatusBroadcaster::new(state);
            let runtime = broadcaster.runtime_info();
            let snapshot = state.controller.lock(|c| c.borrow().snapshot(&runtime));
            broadcaster.publish(snapshot);
        }

        Timer::after(Duration::from_millis(TICK_INTERVAL_MS)).await;
    }
}

/// Löscht den gespeicherten Record, zeigt die Bestätigung und startet neu
async fn factory_reset<L: SmartLedWriter>(
    state: &'static AppState,
    indicator: &mut Option<StatusIndicator<L>>,
) -> ! {
    warn!("Reset: factory reset triggered");

    if let Err(e) = state.controller.lock(|c| c.borrow_mut().factory_reset()) {
        error!("Reset: erasing storage failed: {}", e);
    }

    let start = now_ms();
    while now_ms().wrapping_sub(start) < RESET_CONFIRM_MS {
        if let Some(indicator) = indicator.as_mut() {
            indicator.update(IndicatorState::Resetting, now_ms());
        }
        Timer::after(Duration::from_millis(TICK_INTERVAL_MS)).await;
    }

    info!("Reset: restarting");
    esp_hal::system::software_reset()
}

/// Control Task - Embassy Task
///
/// Initialisiert die Status-LED (GPIO8 über RMT) und ruft dann
/// `control_logic()` auf.
///
/// # Parameter
/// - `state`: Gemeinsamer Zustand (Controller, StatusChannel, Netzwerk-Stack)
/// - `gpio8`: GPIO8 Peripheral für die Status-LED
/// - `rmt_peripheral`: RMT Peripheral für präzises Timing
/// - `reset_button`: BOOT-Taste (GPIO9) mit Pull-Up
#[embassy_executor::task]
pub async fn control_task(
    state: &'static AppState,
    gpio8: esp_hal::peripherals::GPIO8<'static>,
    rmt_peripheral: esp_hal::peripherals::RMT<'static>,
    reset_button: Input<'static>,
) {
    // Buffer für SmartLED Daten erstellen (1 LED)
    let mut rmt_buffer = smart_led_buffer!(1);

    let indicator = match RmtLedWriter::new(gpio8, rmt_peripheral, RMT_CLOCK_MHZ, &mut rmt_buffer) {
        Ok(led) => Some(StatusIndicator::new(led, LED_BRIGHTNESS)),
        Err(e) => {
            error!("Control: status LED unavailable: {}", e);
            None
        }
    };

    info!("Control: loop running every {}ms", TICK_INTERVAL_MS);
    control_logic(state, indicator, reset_button).await
}
