//! RP2040 platform glue for the USB-to-arcade adapter.
//!
//! Everything with behavior lives in [`pad_core`] (and the `hid-proto`
//! crate underneath it); this crate only wires that to the chip:
//!
//! - [`flash`]: the serialized config stream in the last flash sector
//! - [`output`]: per-port button masks driven onto open-drain GPIOs
//! - [`button`]: mode-button sampling (edge, hold, long press)
//!
//! The main loop ticks at the vsync rate, feeds decoded reports into the
//! [`pad_core::PadManager`], and polls its save-request flag to schedule
//! flash writes outside the hot path.
//!
//! # Features
//!
//! - **`dev-panic`** (default): `panic-probe` prints panic info via RTT
//! - **`prod-panic`**: `panic-reset` for silent watchdog reset

#![no_std]

pub use pad_core::{PadInput, PadManager};

pub mod button;
pub mod flash;
pub mod output;

pub use button::{ModeButton, ModeEvents};
pub use flash::ConfigFlash;
pub use output::PortPins;
