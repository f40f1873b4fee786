//! Per-output-port button state: mapping, turbo-fire gating and the
//! CMD-gesture runtime controls.

use crate::buttons::{PadButton, RAPID_EXEMPT_MASK};
use crate::config::{ANALOG_RANGE, MAX_BUTTON_UNITS};
use crate::input::PadInput;
use crate::translator::PadTranslator;

/// Canonical analog output channels per port.
pub const NUM_ANALOG_CHANNELS: usize = 4;

/// Default two-phase alternation pattern: adjacent turbo units land on
/// opposite phases so they never flicker in sync.
pub const DEFAULT_RAPID_PHASE: u32 = 0xAAAA_AAAA;

/// Final analog outputs of one port, in `0..ANALOG_RANGE`.
///
/// `center_mask` flags channels whose value came from a high/low source
/// pair and is therefore centered around the midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogState {
    pub values: [u16; NUM_ANALOG_CHANNELS],
    pub center_mask: u8,
}

/// State processor for one output port.
///
/// `set` maps a raw input snapshot through the device's config, `update`
/// runs the CMD-gesture controls, and `get_buttons` produces the mask the
/// output driver transmits each tick.
pub struct PadState {
    rapid_fire_div: u8,
    /// Turbo-enabled units, indexed by button-unit slot (not canonical bit).
    rapid_fire_mask: u32,
    rapid_fire_phase: u32,
    vsync_count: u32,

    /// Per unit: canonical output mask when the unit is active, and
    /// unconditionally.
    button_map: [u32; MAX_BUTTON_UNITS],
    button_map0: [u32; MAX_BUTTON_UNITS],
    n_map_buttons: usize,

    mapped_buttons: u32,
    mapped_buttons_prev: u32,
    unmapped_buttons: u32,
    unmapped_buttons_prev: u32,

    /// Canonical masks of the units active in each turbo phase, for the
    /// UI blink display.
    mapped_rapid_a: u32,
    mapped_rapid_b: u32,
    /// The turbo mask translated to canonical bits.
    mapped_rapid_mask: u32,

    analog: AnalogState,
}

impl Default for PadState {
    fn default() -> Self {
        Self {
            rapid_fire_div: 1,
            rapid_fire_mask: 0,
            rapid_fire_phase: DEFAULT_RAPID_PHASE,
            vsync_count: 0,
            button_map: [0; MAX_BUTTON_UNITS],
            button_map0: [0; MAX_BUTTON_UNITS],
            n_map_buttons: 0,
            mapped_buttons: 0,
            mapped_buttons_prev: 0,
            unmapped_buttons: 0,
            unmapped_buttons_prev: 0,
            mapped_rapid_a: 0,
            mapped_rapid_b: 0,
            mapped_rapid_mask: 0,
            analog: AnalogState::default(),
        }
    }
}

impl PadState {
    /// Translate one raw snapshot through the device's config and refresh
    /// the gesture/turbo bookkeeping. The config lookup never misses; the
    /// default mapping covers unknown devices.
    pub fn set(&mut self, translator: &PadTranslator, port_offset: u8, input: &PadInput) {
        self.mapped_buttons_prev = self.mapped_buttons;
        self.unmapped_buttons_prev = self.unmapped_buttons;

        let config = translator.find(input.vid, input.pid, port_offset);

        let mut mapped = 0u32;
        let mut unmapped = 0u32;
        let n = config.buttons.len().min(MAX_BUTTON_UNITS);
        for i in 0..n {
            let active = config.convert_button(i, input);
            let m0 = 1u32 << config.buttons[i].index;
            let m = if active { m0 } else { 0 };
            self.button_map[i] = m;
            self.button_map0[i] = m0;
            mapped |= m;
            if active {
                unmapped |= 1 << i;
            }
        }
        self.mapped_buttons = mapped;
        self.unmapped_buttons = unmapped;
        self.n_map_buttons = n;

        // Analog channels merge their bound sources: a high/low pair
        // produces a centered value, a single source passes through (low
        // sources complemented).
        let mut high = [None::<u16>; NUM_ANALOG_CHANNELS];
        let mut low = [None::<u16>; NUM_ANALOG_CHANNELS];
        for (i, unit) in config.analogs.iter().enumerate() {
            let Some(v) = config.convert_analog(i, input) else {
                continue;
            };
            let ch = (unit.index >> 1) as usize;
            if ch >= NUM_ANALOG_CHANNELS {
                continue;
            }
            let slot = if unit.index & 1 == 0 { &mut high[ch] } else { &mut low[ch] };
            *slot = Some(slot.map_or(v, |prev| prev.max(v)));
        }
        let mut center_mask = 0u8;
        for ch in 0..NUM_ANALOG_CHANNELS {
            self.analog.values[ch] = match (high[ch], low[ch]) {
                (Some(h), Some(l)) => {
                    center_mask |= 1 << ch;
                    ((h as i32 - l as i32 + ANALOG_RANGE as i32) / 2) as u16
                }
                (Some(h), None) => h,
                (None, Some(l)) => ANALOG_RANGE - 1 - l,
                (None, None) => 0,
            };
        }
        self.analog.center_mask = center_mask;

        self.update();
    }

    /// CMD-gesture handling and the phase-snapshot refresh.
    fn update(&mut self) {
        let cmd = self.mapped_buttons & PadButton::Cmd.bit() != 0;
        let mapped_trigger = (self.mapped_buttons ^ self.mapped_buttons_prev) & self.mapped_buttons;
        let unmapped_trigger =
            (self.unmapped_buttons ^ self.unmapped_buttons_prev) & self.unmapped_buttons;

        if cmd && (mapped_trigger != 0 || unmapped_trigger != 0) {
            // CMD + button toggles that unit's turbo, unless the press
            // landed on a reserved output (directions adjust the divisor).
            if unmapped_trigger != 0 && mapped_trigger & RAPID_EXEMPT_MASK == 0 {
                self.rapid_fire_mask ^= unmapped_trigger;
                debug!("rapid fire mask = {:08x}", self.rapid_fire_mask);
            }
            if mapped_trigger & PadButton::Up.bit() != 0 {
                self.rapid_fire_div = self.rapid_fire_div.saturating_sub(1).max(1);
                debug!("rapid div = {}", self.rapid_fire_div);
            }
            if mapped_trigger & PadButton::Down.bit() != 0 {
                self.rapid_fire_div = (self.rapid_fire_div + 1).min(4);
                debug!("rapid div = {}", self.rapid_fire_div);
            }
        }

        let base = !self.rapid_fire_mask;
        let mask_a = base | (self.rapid_fire_mask & self.rapid_fire_phase);
        let mask_b = base | (self.rapid_fire_mask & !self.rapid_fire_phase);
        let mut mm_a = 0;
        let mut mm_b = 0;
        let mut mm = 0;
        for i in 0..self.n_map_buttons {
            let bit = 1u32 << i;
            if mask_a & bit != 0 {
                mm_a |= self.button_map[i];
            }
            if mask_b & bit != 0 {
                mm_b |= self.button_map[i];
            }
            if self.rapid_fire_mask & bit != 0 {
                mm |= self.button_map0[i];
            }
        }
        self.mapped_rapid_a = mm_a;
        self.mapped_rapid_b = mm_b;
        self.mapped_rapid_mask = mm;
    }

    /// The transmitted canonical mask for the current vsync tick.
    ///
    /// Turbo units alternate with period `2 * div` ticks, split across the
    /// two phases; everything else passes through.
    #[must_use]
    pub fn get_buttons(&self) -> u32 {
        let rapid_on = (self.vsync_count / self.rapid_fire_div.max(1) as u32) & 1 != 0;
        let rapid = if rapid_on { u32::MAX } else { 0 };

        let mask_a = rapid & self.rapid_fire_phase;
        let mask_b = !rapid & !self.rapid_fire_phase;
        // Units suppressed in this tick.
        let off = self.rapid_fire_mask & (mask_a | mask_b);

        let mut r = 0;
        for i in 0..self.n_map_buttons {
            if off & (1 << i) == 0 {
                r |= self.button_map[i];
            }
        }
        r
    }

    /// Mapped mask with no turbo applied (UI display).
    #[must_use]
    pub fn get_non_rapid_buttons(&self) -> u32 {
        self.mapped_buttons
    }

    /// Per-phase active masks, for the blink display.
    #[must_use]
    pub fn get_rapid_phase_buttons(&self) -> [u32; 2] {
        [self.mapped_rapid_a, self.mapped_rapid_b]
    }

    /// Turbo mask in canonical bits.
    #[must_use]
    pub fn get_rapid_fire_mask(&self) -> u32 {
        self.mapped_rapid_mask
    }

    /// Turbo mask in unit slots, the persisted form.
    #[must_use]
    pub fn get_unit_rapid_fire_mask(&self) -> u32 {
        self.rapid_fire_mask
    }

    pub fn set_unit_rapid_fire_mask(&mut self, mask: u32) {
        self.rapid_fire_mask = mask;
    }

    #[must_use]
    pub fn get_rapid_fire_div(&self) -> u8 {
        self.rapid_fire_div
    }

    pub fn set_rapid_fire_div(&mut self, div: u8) {
        self.rapid_fire_div = div.clamp(1, 4);
    }

    pub fn set_rapid_fire_phase(&mut self, phase: u32) {
        self.rapid_fire_phase = phase;
    }

    pub fn set_vsync_count(&mut self, count: u32) {
        self.vsync_count = count;
    }

    #[must_use]
    pub fn analog_state(&self) -> &AnalogState {
        &self.analog
    }

    /// Power-transition reset: drop the live mapping but keep the user's
    /// turbo settings.
    pub fn reset(&mut self) {
        self.mapped_buttons = 0;
        self.mapped_buttons_prev = 0;
        self.unmapped_buttons = 0;
        self.unmapped_buttons_prev = 0;
        self.button_map = [0; MAX_BUTTON_UNITS];
        self.button_map0 = [0; MAX_BUTTON_UNITS];
        self.n_map_buttons = 0;
        self.mapped_rapid_a = 0;
        self.mapped_rapid_b = 0;
        self.mapped_rapid_mask = 0;
        self.analog = AnalogState::default();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::{AnalogPos, PadConfig, Unit, UnitSource};

    fn translator_with(config: PadConfig) -> PadTranslator {
        let mut t = PadTranslator::default();
        t.append(config, true, true);
        t
    }

    fn press(state: &mut PadState, translator: &PadTranslator, raw: &[usize]) {
        let mut input = PadInput::default();
        for &b in raw {
            input.set_button(b, true);
        }
        state.set(translator, 0, &input);
    }

    #[test]
    fn test_default_mapping_pass_through() {
        let translator = PadTranslator::default();
        let mut state = PadState::default();

        press(&mut state, &translator, &[0, 3]);
        assert_eq!(
            state.get_buttons(),
            PadButton::A.bit() | PadButton::Start.bit()
        );
        assert_eq!(state.get_non_rapid_buttons(), state.get_buttons());

        press(&mut state, &translator, &[]);
        assert_eq!(state.get_buttons(), 0);
    }

    /// Config where raw button 8 maps to CMD so gestures can be driven.
    fn cmd_config() -> PadConfig {
        let mut config = PadConfig::new(0x10, 0x20, 0);
        let slots = [
            (8u8, PadButton::Cmd),
            (0, PadButton::A),
            (1, PadButton::B),
            (2, PadButton::Up),
            (3, PadButton::Down),
        ];
        for (raw, out) in slots {
            config
                .buttons
                .push(Unit {
                    source: UnitSource::Button(raw),
                    index: out as u8,
                    ..Unit::default()
                })
                .unwrap();
        }
        config
    }

    fn cmd_input(raw: &[usize]) -> PadInput {
        let mut input = PadInput {
            vid: 0x10,
            pid: 0x20,
            ..PadInput::default()
        };
        for &b in raw {
            input.set_button(b, true);
        }
        input
    }

    #[test]
    fn test_cmd_gesture_toggles_turbo() {
        let translator = translator_with(cmd_config());
        let mut state = PadState::default();

        // CMD held, then A pressed: unit 1 (raw 0 -> A) toggles on.
        state.set(&translator, 0, &cmd_input(&[8]));
        state.set(&translator, 0, &cmd_input(&[8, 0]));
        assert_eq!(state.get_unit_rapid_fire_mask(), 1 << 1);
        assert_eq!(state.get_rapid_fire_mask(), PadButton::A.bit());

        // Same gesture again toggles it back off.
        state.set(&translator, 0, &cmd_input(&[8]));
        state.set(&translator, 0, &cmd_input(&[8, 0]));
        assert_eq!(state.get_unit_rapid_fire_mask(), 0);

        // Without CMD nothing toggles.
        state.set(&translator, 0, &cmd_input(&[]));
        state.set(&translator, 0, &cmd_input(&[1]));
        assert_eq!(state.get_unit_rapid_fire_mask(), 0);
    }

    #[test]
    fn test_cmd_up_down_adjust_divisor() {
        let translator = translator_with(cmd_config());
        let mut state = PadState::default();
        assert_eq!(state.get_rapid_fire_div(), 1);

        // CMD + DOWN increments, ceiling 4.
        for _ in 0..6 {
            state.set(&translator, 0, &cmd_input(&[8]));
            state.set(&translator, 0, &cmd_input(&[8, 3]));
        }
        assert_eq!(state.get_rapid_fire_div(), 4);
        // The direction press does not join the turbo mask.
        assert_eq!(state.get_unit_rapid_fire_mask(), 0);

        // CMD + UP decrements, floor 1.
        for _ in 0..6 {
            state.set(&translator, 0, &cmd_input(&[8]));
            state.set(&translator, 0, &cmd_input(&[8, 2]));
        }
        assert_eq!(state.get_rapid_fire_div(), 1);
    }

    #[test]
    fn test_turbo_gating_period() {
        let translator = translator_with(cmd_config());
        let mut state = PadState::default();

        // Enable turbo on A via the gesture, then hold A alone.
        state.set(&translator, 0, &cmd_input(&[8]));
        state.set(&translator, 0, &cmd_input(&[8, 0]));
        state.set(&translator, 0, &cmd_input(&[0, 1]));

        for div in 1..=4u32 {
            state.set_rapid_fire_div(div as u8);
            let period = 2 * div;
            let mut samples = std::vec::Vec::new();
            for t in 0..4 * period {
                state.set_vsync_count(t);
                let out = state.get_buttons();
                // B is not in the mask and always passes through.
                assert_ne!(out & PadButton::B.bit(), 0);
                samples.push(out & PadButton::A.bit() != 0);
            }
            // Pure function of vsync with period 2*div.
            for t in 0..samples.len() - period as usize {
                assert_eq!(samples[t], samples[t + period as usize], "div {div} t {t}");
            }
            // And it actually blinks.
            assert!(samples.iter().any(|&s| s));
            assert!(samples.iter().any(|&s| !s));
        }
    }

    #[test]
    fn test_phase_split() {
        let translator = translator_with(cmd_config());
        let mut state = PadState::default();

        // Turbo on A (unit 1) and B (unit 2): adjacent units sit on
        // opposite phases of the default pattern.
        state.set_unit_rapid_fire_mask((1 << 1) | (1 << 2));
        state.set(&translator, 0, &cmd_input(&[0, 1]));
        state.set_rapid_fire_div(1);

        for t in 0..8u32 {
            state.set_vsync_count(t);
            let out = state.get_buttons();
            let a = out & PadButton::A.bit() != 0;
            let b = out & PadButton::B.bit() != 0;
            assert_ne!(a, b, "phases must alternate, t = {t}");
        }

        // Unit 1 sits on a set phase bit, unit 2 on a clear one.
        let [phase_a, phase_b] = state.get_rapid_phase_buttons();
        assert_ne!(phase_a & PadButton::A.bit(), 0);
        assert_eq!(phase_a & PadButton::B.bit(), 0);
        assert_ne!(phase_b & PadButton::B.bit(), 0);
        assert_eq!(phase_b & PadButton::A.bit(), 0);
    }

    #[test]
    fn test_analog_center_merge() {
        let mut config = PadConfig::new(0x10, 0x20, 0);
        // Channel 0 gets a high/low pair on raw axes 2 and 3.
        for (channel, index) in [(2u8, 0u8), (3, 1)] {
            config
                .analogs
                .push(Unit {
                    source: UnitSource::Analog {
                        channel,
                        on: AnalogPos::High,
                        off: AnalogPos::Low,
                    },
                    index,
                    ..Unit::default()
                })
                .unwrap();
        }
        // Channel 1 gets a single high source on raw axis 4.
        config
            .analogs
            .push(Unit {
                source: UnitSource::Analog {
                    channel: 4,
                    on: AnalogPos::High,
                    off: AnalogPos::Low,
                },
                index: 2,
                ..Unit::default()
            })
            .unwrap();
        let translator = translator_with(config);

        let mut input = PadInput {
            vid: 0x10,
            pid: 0x20,
            ..PadInput::default()
        };
        // high = 200, low = 50 in raw 8-bit terms.
        input.analogs[2] = 200;
        input.analogs[3] = 50;
        input.analogs[4] = 200;

        let mut state = PadState::default();
        state.set(&translator, 0, &input);

        let analog = state.analog_state();
        let high = 200 * 1023 / 255;
        let low = 50 * 1023 / 255;
        assert_eq!(analog.values[0] as i32, (high - low + 1024) / 2);
        assert_ne!(analog.center_mask & 1, 0);

        // Single-source channel passes straight through, no center flag.
        assert_eq!(analog.values[1] as i32, high);
        assert_eq!(analog.center_mask & 2, 0);
    }
}
