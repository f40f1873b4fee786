//! Velocity-driven quadrature encoder emulation.
//!
//! An assigned analog channel's deflection becomes the rotation speed of a
//! virtual 4-phase encoder; its two phase lines then override a pair of
//! direction bits on the output port. Applied after turbo gating,
//! independent of the mapping table.

/// One virtual rotary encoder.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RotEncoder {
    axis: Option<u8>,
    scale: i32,
    elapsed: u32,
    /// Quadrature phase, 0..=3.
    phase: u8,
}

impl RotEncoder {
    /// Analog channel driving the encoder, or `None` to disable it.
    pub fn set_axis(&mut self, axis: Option<u8>) {
        self.axis = axis;
    }

    #[must_use]
    pub fn axis(&self) -> Option<u8> {
        self.axis
    }

    pub fn set_scale(&mut self, scale: i32) {
        self.scale = scale;
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.axis.is_some()
    }

    /// Advance by `dticks` ticks of a `tick_hz` clock. `velocity` is the
    /// signed axis deflection; the phase steps `|velocity * scale|` times
    /// per second in the sign's direction.
    pub fn update(&mut self, dticks: u32, velocity: i32, tick_hz: u32) {
        self.elapsed = self.elapsed.saturating_add(dticks);

        let v = velocity.saturating_mul(self.scale.max(1));
        let speed = v.unsigned_abs();
        if speed == 0 {
            return;
        }

        let ticks_per_step = (tick_hz / speed).max(1);
        if self.elapsed >= ticks_per_step {
            self.elapsed = 0;
            self.phase = if v > 0 {
                (self.phase + 1) & 3
            } else {
                self.phase.wrapping_sub(1) & 3
            };
        }
    }

    /// The two quadrature lines for the current phase.
    #[must_use]
    pub fn enc_state(&self) -> (bool, bool) {
        const TABLE: [(bool, bool); 4] =
            [(false, false), (true, false), (true, true), (false, true)];
        TABLE[(self.phase & 3) as usize]
    }

    /// Replace bits `bit_a`/`bit_b` of an output mask with the encoder
    /// lines.
    #[must_use]
    pub fn override_buttons(&self, buttons: u32, bit_a: u32, bit_b: u32) -> u32 {
        let (a, b) = self.enc_state();
        let mut r = buttons & !((1 << bit_a) | (1 << bit_b));
        if a {
            r |= 1 << bit_a;
        }
        if b {
            r |= 1 << bit_b;
        }
        r
    }
}
