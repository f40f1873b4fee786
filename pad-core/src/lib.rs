//! Input translation and state engine for the USB-to-arcade adapter.
//!
//! Raw reports flow from the USB host stack into [`device::HidDevice`],
//! come out as canonical [`PadInput`] snapshots, and are routed by
//! [`manager::PadManager`] through the per-device config store
//! ([`translator::PadTranslator`]) into one [`state::PadState`] per
//! output port, which applies turbo-fire gating and yields the mask the
//! GPIO driver transmits.
//!
//! The other half of the crate is configuration: the interactive
//! [`learn::LearnSession`] builds new mappings from live input, and
//! [`persist`] carries everything to and from flash in a versioned,
//! little-endian, truncation-safe stream.
//!
//! Like its sibling `hid-proto`, the crate is `no_std`, allocation-free
//! and platform-agnostic; all I/O stays in the firmware layer.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This must go first so the macros are visible in the other modules.
mod fmt;

pub mod app_config;
pub mod buttons;
pub mod config;
pub mod device;
pub mod input;
pub mod learn;
pub mod manager;
pub mod midi;
pub mod persist;
pub mod rot_encoder;
pub mod state;
pub mod translator;

pub use app_config::{AnalogMode, AppConfig, ButtonDispMode, RapidSetting};
pub use buttons::{PadButton, NUM_BUTTONS, NUM_BUTTONS_TWIN};
pub use config::{AnalogPos, HatPos, PadConfig, Unit, UnitSource};
pub use device::HidDevice;
pub use input::PadInput;
pub use learn::{LearnKind, LearnSession, LearnStep};
pub use manager::{PadManager, MIDI_PORT, NUM_OUTPUT_PORTS, NUM_PORTS};
pub use midi::{MidiKeyState, PID_MIDI, VID_MIDI};
pub use persist::{load_state, save_state, PersistError};
pub use rot_encoder::RotEncoder;
pub use state::{AnalogState, PadState};
pub use translator::PadTranslator;
