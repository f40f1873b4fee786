//! The input router and mode controller.
//!
//! One explicitly constructed [`PadManager`] owns the config store, the
//! per-port state processors and the mode state machine. The platform
//! glue feeds it raw snapshots and mode-button events and polls
//! [`PadManager::take_save_request`] to learn when flash must be
//! rewritten; the router itself never performs I/O.

use hid_proto::NUM_ANALOGS;

use crate::app_config::{AnalogMode, AppConfig};
use crate::buttons::{PadButton, NUM_BUTTONS, NUM_BUTTONS_TWIN};
use crate::input::PadInput;
use crate::learn::{LearnKind, LearnSession, LearnStep, NUM_INPUT_PORTS};
use crate::persist::{Deserializer, PersistError, Serializer};
use crate::rot_encoder::RotEncoder;
use crate::state::{AnalogState, PadState};
use crate::translator::PadTranslator;

/// Physical input slots: two USB ports plus the virtual MIDI slot.
pub const NUM_PORTS: usize = NUM_INPUT_PORTS;

/// Output ports wired to the arcade side.
pub const NUM_OUTPUT_PORTS: usize = 2;

/// Input slot index of the virtual MIDI device.
pub const MIDI_PORT: usize = 2;

/// Rotary-encoder overlays per output port (LEFT/RIGHT and UP/DOWN).
pub const NUM_ROT_ENCODERS: usize = 2;

enum Mode {
    Normal,
    Learn(LearnSession),
}

pub struct PadManager {
    latest: [PadInput; NUM_PORTS],
    states: [PadState; NUM_PORTS],
    translator: PadTranslator,
    rot_encoders: [[RotEncoder; NUM_ROT_ENCODERS]; NUM_OUTPUT_PORTS],

    mode: Mode,
    twin_port: bool,
    analog_mode: AnalogMode,
    /// Update ticks per second, for the encoder speed computation.
    tick_hz: u32,

    save_request: bool,
}

impl Default for PadManager {
    fn default() -> Self {
        Self::new(60)
    }
}

impl PadManager {
    #[must_use]
    pub fn new(tick_hz: u32) -> Self {
        Self {
            latest: [PadInput::default(); NUM_PORTS],
            states: Default::default(),
            translator: PadTranslator::default(),
            rot_encoders: Default::default(),
            mode: Mode::Normal,
            twin_port: false,
            analog_mode: AnalogMode::Disabled,
            tick_hz: tick_hz.max(1),
            save_request: false,
        }
    }

    /// One tick of the main loop: mode-button events in, mode transitions
    /// and overlays out.
    pub fn update(&mut self, dticks: u32, mode_held: bool, mode_trigger: bool, mode_long: bool) {
        match &mut self.mode {
            Mode::Normal => {
                if mode_long {
                    self.enter_button_learn();
                }
            }
            Mode::Learn(session) => {
                if session.update(mode_held, mode_trigger, mode_long) == LearnStep::Finished {
                    self.finish_learn();
                }
            }
        }

        for port in 0..NUM_OUTPUT_PORTS {
            for enc in &mut self.rot_encoders[port] {
                if let Some(axis) = enc.axis() {
                    let v = self.latest[port].analogs[axis as usize % NUM_ANALOGS] as i32 - 127;
                    enc.update(dticks, v, self.tick_hz);
                }
            }
        }
    }

    /// Deposit one raw snapshot from a physical or virtual input slot.
    ///
    /// In normal mode it is translated straight into the state processor
    /// of the routed output port(s); in learn mode it feeds the session
    /// instead and never reaches an output.
    pub fn set_data(&mut self, port: usize, input: &PadInput) {
        if port >= NUM_PORTS {
            return;
        }

        match &mut self.mode {
            Mode::Normal => {
                let fan_out = if self.twin_port { 2 } else { 1 };
                for i in 0..fan_out {
                    let p = port + i;
                    if p < NUM_OUTPUT_PORTS || p == MIDI_PORT && i == 0 {
                        self.states[p].set(&self.translator, i as u8, input);
                    }
                }
            }
            Mode::Learn(session) => session.feed(port, input),
        }

        self.latest[port] = *input;
    }

    /// Forget the last snapshot of a slot (device unplugged).
    pub fn reset_latest(&mut self, port: usize) {
        if port < NUM_PORTS {
            self.latest[port].reset();
            if let Mode::Normal = self.mode {
                let input = self.latest[port];
                self.set_data(port, &input);
            }
        }
    }

    fn enter_button_learn(&mut self) {
        let slots = if self.twin_port { NUM_BUTTONS_TWIN } else { NUM_BUTTONS };
        self.enter_learn(LearnKind::Button, slots);
    }

    /// Menu entry point for analog learning.
    pub fn enter_analog_learn(&mut self) {
        self.enter_learn(LearnKind::Analog, self.analog_mode.learn_slots());
    }

    fn enter_learn(&mut self, kind: LearnKind, slots: usize) {
        let mut neutral = [[0u8; NUM_ANALOGS]; NUM_PORTS];
        for (n, input) in neutral.iter_mut().zip(self.latest.iter()) {
            *n = input.analogs;
        }
        self.mode = Mode::Learn(LearnSession::new(kind, slots, neutral));
    }

    fn finish_learn(&mut self) {
        if let Mode::Learn(session) = core::mem::replace(&mut self.mode, Mode::Normal) {
            if session.commit(&mut self.translator, self.twin_port) {
                self.save_request = true;
            }
        }
        info!("back to normal mode");
    }

    /// True while a learn session is running.
    #[must_use]
    pub fn in_learn_mode(&self) -> bool {
        matches!(self.mode, Mode::Learn(_))
    }

    /// The session's current prompt, if button learning is active.
    #[must_use]
    pub fn learn_prompt(&self) -> Option<PadButton> {
        match &self.mode {
            Mode::Learn(session) => session.current_button(),
            Mode::Normal => None,
        }
    }

    /// Take the pending flash-save request, clearing it.
    #[must_use]
    pub fn take_save_request(&mut self) -> bool {
        core::mem::take(&mut self.save_request)
    }

    /// The transmitted mask of an output port, with the MIDI slot merged
    /// into port 0 and the encoder overlays applied last.
    #[must_use]
    pub fn get_buttons(&self, port: usize) -> u32 {
        if port >= NUM_OUTPUT_PORTS {
            return 0;
        }
        let mut v = self.states[port].get_buttons();
        if port == 0 {
            v |= self.states[MIDI_PORT].get_buttons();
        }

        let encs = &self.rot_encoders[port];
        if encs[0].is_active() {
            v = encs[0].override_buttons(v, PadButton::Left as u32, PadButton::Right as u32);
        }
        if encs[1].is_active() {
            v = encs[1].override_buttons(v, PadButton::Up as u32, PadButton::Down as u32);
        }
        v
    }

    /// Mapped mask without turbo, for the display.
    #[must_use]
    pub fn get_non_rapid_buttons(&self, port: usize) -> u32 {
        if port >= NUM_OUTPUT_PORTS {
            return 0;
        }
        let mut v = self.states[port].get_non_rapid_buttons();
        if port == 0 {
            v |= self.states[MIDI_PORT].get_non_rapid_buttons();
        }
        v
    }

    /// Per-phase blink snapshots for the display.
    #[must_use]
    pub fn get_rapid_phase_buttons(&self, port: usize) -> [u32; 2] {
        match self.states.get(port) {
            Some(s) if port < NUM_OUTPUT_PORTS => s.get_rapid_phase_buttons(),
            _ => [0; 2],
        }
    }

    #[must_use]
    pub fn get_rapid_fire_mask(&self, port: usize) -> u32 {
        match self.states.get(port) {
            Some(s) if port < NUM_OUTPUT_PORTS => s.get_rapid_fire_mask(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn get_unit_rapid_fire_mask(&self, port: usize) -> u32 {
        match self.states.get(port) {
            Some(s) if port < NUM_OUTPUT_PORTS => s.get_unit_rapid_fire_mask(),
            _ => 0,
        }
    }

    pub fn set_unit_rapid_fire_mask(&mut self, port: usize, mask: u32) {
        if port < NUM_OUTPUT_PORTS {
            self.states[port].set_unit_rapid_fire_mask(mask);
        }
    }

    #[must_use]
    pub fn get_rapid_fire_div(&self, port: usize) -> u8 {
        match self.states.get(port) {
            Some(s) if port < NUM_OUTPUT_PORTS => s.get_rapid_fire_div(),
            _ => 1,
        }
    }

    pub fn set_rapid_fire_div(&mut self, port: usize, div: u8) {
        if port < NUM_OUTPUT_PORTS {
            self.states[port].set_rapid_fire_div(div);
        }
    }

    pub fn set_rapid_fire_phase(&mut self, phase: u32) {
        for state in &mut self.states {
            state.set_rapid_fire_phase(phase);
        }
    }

    pub fn set_vsync_count(&mut self, count: u32) {
        for state in &mut self.states {
            state.set_vsync_count(count);
        }
    }

    #[must_use]
    pub fn analog_state(&self, port: usize) -> &AnalogState {
        self.states[port.min(NUM_OUTPUT_PORTS - 1)].analog_state()
    }

    pub fn set_twin_port(&mut self, on: bool) {
        self.twin_port = on;
    }

    #[must_use]
    pub fn twin_port(&self) -> bool {
        self.twin_port
    }

    pub fn set_analog_mode(&mut self, mode: AnalogMode) {
        self.analog_mode = mode;
    }

    /// Assign an encoder overlay on all output ports. `kind` 0 drives
    /// LEFT/RIGHT, 1 drives UP/DOWN.
    pub fn set_rot_encoder(&mut self, kind: usize, axis: Option<u8>, scale: i32) {
        if kind >= NUM_ROT_ENCODERS {
            return;
        }
        for encs in &mut self.rot_encoders {
            encs[kind].set_axis(axis);
            encs[kind].set_scale(scale);
        }
    }

    /// Push the menu-edited settings into the runtime state.
    pub fn apply_config(&mut self, config: &AppConfig) {
        self.twin_port = config.twin_port;
        self.analog_mode = config.analog_mode;
        self.set_rapid_fire_phase(config.rapid_phase_mask());
        for (port, rs) in config.rapid_settings.iter().enumerate() {
            self.set_unit_rapid_fire_mask(port, rs.mask);
            self.set_rapid_fire_div(port, rs.div);
        }
    }

    /// Collect the per-port turbo settings for persisting.
    pub fn collect_config(&self, config: &mut AppConfig) {
        for (port, rs) in config.rapid_settings.iter_mut().enumerate() {
            rs.mask = self.get_unit_rapid_fire_mask(port);
            rs.div = self.get_rapid_fire_div(port);
        }
    }

    pub fn serialize(&self, s: &mut Serializer<'_>) {
        self.translator.serialize(s);
    }

    pub fn deserialize(&mut self, d: &mut Deserializer<'_>) -> Result<(), PersistError> {
        self.translator.deserialize(d)
    }

    #[must_use]
    pub fn translator(&self) -> &PadTranslator {
        &self.translator
    }

    #[must_use]
    pub fn translator_mut(&mut self) -> &mut PadTranslator {
        &mut self.translator
    }

    /// Power-transition reset of the output-port processors.
    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }
}
