//! Mode-button sampling.
//!
//! The physical mode button is sampled once per vsync tick and folded into
//! the three signals [`pad_core::PadManager::update`] consumes: level, press
//! edge, and a one-shot long-press event.

/// Ticks of continuous hold that count as a long press (~1 s at 60 Hz).
pub const LONG_PRESS_TICKS: u32 = 60;

/// One tick's worth of mode-button signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeEvents {
    pub held: bool,
    pub trigger: bool,
    pub long: bool,
}

/// Debounced hold tracker for the mode button.
#[derive(Default)]
pub struct ModeButton {
    held_ticks: u32,
    long_sent: bool,
}

impl ModeButton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into events. `pressed` is the debounced level.
    pub fn poll(&mut self, pressed: bool, dticks: u32) -> ModeEvents {
        let mut ev = ModeEvents {
            held: pressed,
            ..Default::default()
        };

        if pressed {
            ev.trigger = self.held_ticks == 0;
            self.held_ticks = self.held_ticks.saturating_add(dticks);
            if self.held_ticks >= LONG_PRESS_TICKS && !self.long_sent {
                self.long_sent = true;
                ev.long = true;
            }
        } else {
            self.held_ticks = 0;
            self.long_sent = false;
        }
        ev
    }
}
