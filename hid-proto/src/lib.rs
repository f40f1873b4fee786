//! Generic HID input parsing for the arcade adapter.
//!
//! The crate is split along the two phases of handling a device:
//!
//! - [`descriptor`]: walk a report descriptor once at mount time and build
//!   a [`DescriptorTable`] of the fields worth decoding.
//! - [`report`]: decode each incoming input report against that table into
//!   a canonical [`DecodedReport`].
//!
//! Everything is `no_std` and allocation-free; tables live in fixed-size
//! [`heapless`] vectors.
//!
//! # Example
//!
//! ```
//! use hid_proto::{DescriptorTable, ParseOptions, decode};
//!
//! // Minimal one-axis joystick descriptor.
//! let desc = [
//!     0x05, 0x01, 0x09, 0x04, 0xA1, 0x01,
//!     0x09, 0x30, 0x15, 0x00, 0x26, 0xFF, 0x00,
//!     0x75, 0x08, 0x95, 0x01, 0x81, 0x02,
//!     0xC0,
//! ];
//! let table = DescriptorTable::parse(&desc, ParseOptions::default());
//! let report = decode(&table, &[0x80]).unwrap();
//! assert_eq!(report.analogs[0], 128);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This must go first so the macros are visible in the other modules.
mod fmt;

pub mod descriptor;
pub mod items;
pub mod report;
pub mod usage;

pub use descriptor::{DescriptorTable, Field, ParseOptions, ReportSet};
pub use report::{decode, decode_report, DecodedReport, HAT_IDLE, NEUTRAL_ANALOGS};
pub use usage::NUM_ANALOGS;
