//! Raw per-device input snapshots, as delivered by the USB and MIDI
//! collaborators.

use hid_proto::{DecodedReport, NEUTRAL_ANALOGS, NUM_ANALOGS};

/// Maximum raw buttons a single device can report.
pub const MAX_RAW_BUTTONS: usize = 128;

/// One raw input snapshot from a physical (or virtual) device.
///
/// Buttons are indexed by raw bit, not canonical slot; the hat is 0..=7
/// clockwise from up or -1 when idle; analogs are the nine canonical
/// channels in device order, `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadInput {
    pub vid: u16,
    pub pid: u16,
    pub buttons: [u32; MAX_RAW_BUTTONS / 32],
    pub hat: i8,
    pub analogs: [u8; NUM_ANALOGS],
}

impl Default for PadInput {
    fn default() -> Self {
        Self {
            vid: 0,
            pid: 0,
            buttons: [0; MAX_RAW_BUTTONS / 32],
            hat: -1,
            analogs: NEUTRAL_ANALOGS,
        }
    }
}

impl PadInput {
    #[must_use]
    pub fn from_report(vid: u16, pid: u16, report: &DecodedReport) -> Self {
        let mut buttons = [0; MAX_RAW_BUTTONS / 32];
        buttons[0] = report.buttons;
        Self {
            vid,
            pid,
            buttons,
            hat: report.hat,
            analogs: report.analogs,
        }
    }

    /// State of raw button `i`.
    #[inline]
    #[must_use]
    pub fn button(&self, i: usize) -> bool {
        if i >= MAX_RAW_BUTTONS {
            return false;
        }
        self.buttons[i >> 5] & (1 << (i & 31)) != 0
    }

    #[inline]
    pub fn set_button(&mut self, i: usize, on: bool) {
        if i >= MAX_RAW_BUTTONS {
            return;
        }
        let mask = 1 << (i & 31);
        if on {
            self.buttons[i >> 5] |= mask;
        } else {
            self.buttons[i >> 5] &= !mask;
        }
    }

    /// True if any raw button is held.
    #[must_use]
    pub fn any_button(&self) -> bool {
        self.buttons.iter().any(|&w| w != 0)
    }

    /// Back to the resting state; identity is kept.
    pub fn reset(&mut self) {
        self.buttons = [0; MAX_RAW_BUTTONS / 32];
        self.hat = -1;
        self.analogs = NEUTRAL_ANALOGS;
    }
}
