// Hardware Abstraction Layer (HAL) Module
//
// Implementiert die Hardware-Traits aus railhub-core für den ESP32-C6.
// Die Logik dahinter ist in railhub-core auf dem Host getestet.

pub mod led_writer;
pub mod pwm_writer;

pub use led_writer::RmtLedWriter;
pub use pwm_writer::{LedcPwmWriter, PwmInitError};
