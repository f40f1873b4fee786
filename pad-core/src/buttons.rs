//! The canonical button space all devices are mapped onto.

/// One canonical output button.
///
/// The numeric order is load-bearing: it is the output bit position, the
/// learn-mode slot order, and part of the persisted unit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PadButton {
    Cmd,
    Coin,
    Start,
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    C,
    D,
    E,
    F,
}

/// Number of canonical buttons per output port.
pub const NUM_BUTTONS: usize = 13;

/// Learn-slot count in twin-port mode: a second full set minus CMD, which
/// is shared between both ports.
pub const NUM_BUTTONS_TWIN: usize = NUM_BUTTONS * 2 - 1;

/// Buttons excluded from the turbo-toggle gesture: CMD is the modifier and
/// the directions adjust the turbo divisor instead.
pub const RAPID_EXEMPT_MASK: u32 = PadButton::Cmd.bit()
    | PadButton::Up.bit()
    | PadButton::Down.bit()
    | PadButton::Left.bit()
    | PadButton::Right.bit();

impl PadButton {
    /// Output bitmask for this button.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u32 {
        1 << self as u32
    }

    /// Canonical button for a learn-slot index, folding the twin-port
    /// second set back onto the first (slot 13 is COIN of port 2).
    #[must_use]
    pub fn from_slot(slot: usize) -> Option<Self> {
        const TABLE: [PadButton; NUM_BUTTONS] = [
            PadButton::Cmd,
            PadButton::Coin,
            PadButton::Start,
            PadButton::Up,
            PadButton::Down,
            PadButton::Left,
            PadButton::Right,
            PadButton::A,
            PadButton::B,
            PadButton::C,
            PadButton::D,
            PadButton::E,
            PadButton::F,
        ];
        match slot {
            0..=12 => Some(TABLE[slot]),
            13..=24 => Some(TABLE[slot - NUM_BUTTONS + 1]),
            _ => None,
        }
    }

    /// Display name, for learn-mode prompts.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PadButton::Cmd => "CMD",
            PadButton::Coin => "COIN",
            PadButton::Start => "START",
            PadButton::Up => "UP",
            PadButton::Down => "DOWN",
            PadButton::Left => "LEFT",
            PadButton::Right => "RIGHT",
            PadButton::A => "A",
            PadButton::B => "B",
            PadButton::C => "C",
            PadButton::D => "D",
            PadButton::E => "E",
            PadButton::F => "F",
        }
    }
}
