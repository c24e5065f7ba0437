//! Application configuration and constants
//!
//! Central naming and board-level constants. Timing policy lives with the
//! code it governs (`DecoderConfig`, `PlayerTiming`, `ActivityTiming`).

/// The application name
pub const APP_NAME: &str = "Tonbox";

/// The application type/category
pub const APP_TYPE: &str = "RFID audio player";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Control-loop period in milliseconds.
///
/// Every decoder threshold is a multiple of this, so changing it does not
/// change gesture classification, only its latency.
pub const TICK_MS: u64 = 10;

/// Audio module UART baud rate (fixed by the module).
pub const AUDIO_MODULE_BAUD: u32 = 9_600;

/// Development mode banner
pub const fn dev_banner() -> &'static str {
    "Tonbox - Development Mode"
}
