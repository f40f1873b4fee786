//! Virtual MIDI input: note on/off tracking mapped onto the synthetic
//! MIDI device slot.

use crate::input::PadInput;

/// Vendor/product identity of the synthetic MIDI device. Every MIDI
/// interface shares it, so one learned mapping covers them all.
pub const VID_MIDI: u16 = 0;
pub const PID_MIDI: u16 = 1;

/// Held-key bitmap over the 128 MIDI notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MidiKeyState {
    keys: [u32; 4],
}

impl MidiKeyState {
    pub fn clear(&mut self) {
        self.keys = [0; 4];
    }

    pub fn key_on(&mut self, note: u8) {
        if note < 128 {
            self.keys[(note >> 5) as usize] |= 1 << (note & 31);
        }
    }

    pub fn key_off(&mut self, note: u8) {
        if note < 128 {
            self.keys[(note >> 5) as usize] &= !(1 << (note & 31));
        }
    }

    /// Apply one MIDI event. Note-on with zero velocity counts as note-off,
    /// as the wire protocol allows.
    pub fn on_message(&mut self, status: u8, note: u8, velocity: u8) {
        match status & 0xF0 {
            0x80 => self.key_off(note & 127),
            0x90 if velocity == 0 => self.key_off(note & 127),
            0x90 => self.key_on(note & 127),
            _ => {}
        }
    }

    #[must_use]
    pub fn is_on(&self, note: u8) -> bool {
        note < 128 && self.keys[(note >> 5) as usize] & (1 << (note & 31)) != 0
    }

    /// Snapshot as a raw input for the MIDI slot: each note is a raw
    /// button, everything else neutral.
    #[must_use]
    pub fn to_pad_input(&self) -> PadInput {
        PadInput {
            vid: VID_MIDI,
            pid: PID_MIDI,
            buttons: self.keys,
            ..PadInput::default()
        }
    }
}
