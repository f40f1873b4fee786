//! GPIO output of the per-port button masks.
//!
//! Each arcade-side signal is one active-low GPIO per canonical button slot
//! (COIN through F; the CMD slot never leaves the board). Levels are
//! rewritten every vsync tick from [`pad_core::PadManager::get_buttons`].

use embassy_rp::gpio::Output;
use heapless::Vec;
use pad_core::NUM_BUTTONS;

/// The wired outputs of one port, in canonical slot order starting at COIN.
pub struct PortPins<'d> {
    pins: Vec<Output<'d>, { NUM_BUTTONS - 1 }>,
}

impl<'d> PortPins<'d> {
    pub fn new() -> Self {
        Self { pins: Vec::new() }
    }

    /// Wire the next slot. Ignored once all slots are assigned.
    pub fn push(&mut self, pin: Output<'d>) {
        let _ = self.pins.push(pin);
    }

    /// Drive a button mask onto the pins. Bit 1 of `mask` is COIN.
    pub fn write(&mut self, mask: u32) {
        for (slot, pin) in self.pins.iter_mut().enumerate() {
            // Active low: pressed pulls the line down.
            if mask & (1 << (slot + 1)) != 0 {
                pin.set_low();
            } else {
                pin.set_high();
            }
        }
    }

    /// Release every line.
    pub fn clear(&mut self) {
        for pin in self.pins.iter_mut() {
            pin.set_high();
        }
    }
}

impl<'d> Default for PortPins<'d> {
    fn default() -> Self {
        Self::new()
    }
}
