// PWM Writer: dimmbare Outputs über das LEDC Peripheral
//
// Alle Outputs teilen sich einen Low-Speed Timer (8 Bit, 1 kHz).
// Jeder Output bekommt einen eigenen LEDC-Kanal.

use defmt::info;
use esp_hal::gpio::{AnyPin, DriveMode};
use esp_hal::ledc::channel::{self, ChannelHW, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::peripherals::LEDC;
use esp_hal::time::Rate;
use heapless::Vec;
use railhub_core::{LedError, PwmWriter};
use static_cell::StaticCell;

use crate::config::{OUTPUT_COUNT, PWM_FREQUENCY_KHZ};

/// LEDC-Kanäle in Output-Reihenfolge
const CHANNELS: [channel::Number; OUTPUT_COUNT] = [
    channel::Number::Channel0,
    channel::Number::Channel1,
    channel::Number::Channel2,
    channel::Number::Channel3,
    channel::Number::Channel4,
    channel::Number::Channel5,
];

/// Fehler bei der LEDC-Initialisierung
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum PwmInitError {
    Timer,
    Channel(usize),
    /// `new()` wurde mehr als einmal aufgerufen
    AlreadyInitialized,
}

/// Real Hardware PWM Writer
///
/// Der Timer muss 'static sein, weil jeder Kanal eine Referenz darauf hält.
pub struct LedcPwmWriter {
    channels: Vec<channel::Channel<'static, LowSpeed>, OUTPUT_COUNT>,
}

impl LedcPwmWriter {
    /// Konfiguriert Timer und Kanäle, alle Outputs starten mit Duty 0
    ///
    /// # Parameter
    /// - `ledc_peripheral`: LEDC Peripheral
    /// - `pins`: Output-Pins in der Reihenfolge von `OUTPUT_PINS`
    pub fn new(
        ledc_peripheral: LEDC<'static>,
        pins: [AnyPin<'static>; OUTPUT_COUNT],
    ) -> Result<Self, PwmInitError> {
        static TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();

        let mut ledc = Ledc::new(ledc_peripheral);
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

        let mut lstimer = ledc.timer::<LowSpeed>(timer::Number::Timer0);
        lstimer
            .configure(timer::config::Config {
                duty: timer::config::Duty::Duty8Bit,
                clock_source: timer::LSClockSource::APBClk,
                frequency: Rate::from_khz(PWM_FREQUENCY_KHZ),
            })
            .map_err(|_| PwmInitError::Timer)?;
        let lstimer: &'static timer::Timer<'static, LowSpeed> =
            TIMER.try_init(lstimer).ok_or(PwmInitError::AlreadyInitialized)?;

        let mut channels = Vec::new();
        for (index, (number, pin)) in CHANNELS.into_iter().zip(pins).enumerate() {
            let mut ch = ledc.channel(number, pin);
            ch.configure(channel::config::Config {
                timer: lstimer,
                duty_pct: 0,
                drive_mode: DriveMode::PushPull,
            })
            .map_err(|_| PwmInitError::Channel(index))?;
            channels
                .push(ch)
                .map_err(|_| PwmInitError::Channel(index))?;
        }

        info!(
            "PWM: {} LEDC channels ready ({} kHz, 8 bit)",
            channels.len(),
            PWM_FREQUENCY_KHZ
        );
        Ok(Self { channels })
    }
}

impl PwmWriter for LedcPwmWriter {
    fn set_level(&mut self, index: usize, level: u8) -> Result<(), LedError> {
        let channel = self.channels.get(index).ok_or(LedError::InvalidChannel)?;
        // Duty8Bit: Duty-Wert entspricht direkt dem Level 0-255
        channel.set_duty_hw(u32::from(level));
        Ok(())
    }
}
