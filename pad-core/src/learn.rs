//! Interactive learn mode: watch a device's raw input and record which
//! raw signal belongs to which canonical slot.
//!
//! One session type covers both button and analog learning; the
//! differences (slot count, digital filtering, unit-list target, twin-port
//! reindexing) hang off [`LearnKind`].

use heapless::Vec;

use crate::buttons::{PadButton, NUM_BUTTONS};
use crate::config::{test_hat, AnalogPos, HatPos, PadConfig, Unit, UnitSource, MAX_BUTTON_UNITS};
use crate::input::{PadInput, MAX_RAW_BUTTONS};
use crate::translator::PadTranslator;
use hid_proto::NUM_ANALOGS;

/// Physical input slots observed by a session (2 USB ports + MIDI).
pub const NUM_INPUT_PORTS: usize = 3;

/// Upper bound on learn slots (twin-port button session).
pub const MAX_LEARN_SLOTS: usize = NUM_BUTTONS * 2 - 1;

/// Update ticks of all-quiet before a slot with data auto-advances
/// (about 100 ms at 60 updates per second).
pub const IDLE_ADVANCE_FRAMES: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LearnKind {
    Button,
    Analog,
}

/// What one `update` tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LearnStep {
    Continue,
    /// Moved on to the next slot.
    Advanced,
    /// All slots visited or finalized early; ready to commit.
    Finished,
}

/// Everything observed for one canonical slot.
#[derive(Debug, Clone, Copy)]
struct SlotRecord {
    buttons: [u32; MAX_RAW_BUTTONS / 32],
    /// At most one analog assignment: channel with its on/off levels.
    analog: Option<(u8, AnalogPos, AnalogPos)>,
    hat: i8,
}

impl Default for SlotRecord {
    fn default() -> Self {
        Self {
            buttons: [0; MAX_RAW_BUTTONS / 32],
            analog: None,
            hat: -1,
        }
    }
}

impl SlotRecord {
    fn button(&self, i: usize) -> bool {
        self.buttons[i >> 5] & (1 << (i & 31)) != 0
    }

    fn has_data(&self) -> bool {
        self.buttons.iter().any(|&b| b != 0) || self.analog.is_some() || self.hat >= 0
    }

    /// Devices that report a digital and an analog signal for the same
    /// physical control must not double-map in analog learning.
    fn filter_for_analog(&mut self) {
        if self.analog.is_some() {
            self.buttons = [0; MAX_RAW_BUTTONS / 32];
            self.hat = -1;
        }
    }
}

/// One learn session, stepped by the router every update tick.
pub struct LearnSession {
    kind: LearnKind,
    slot_count: usize,

    /// Waiting for the mode button to be released after entry.
    wait_first_idle: bool,
    /// Locked to the first physical port that shows activity.
    port: Option<usize>,
    vid: u16,
    pid: u16,

    /// Analog resting levels captured at entry. Best effort: a device
    /// plugged in right before entering may not have reported yet.
    analog_neutral: [[u8; NUM_ANALOGS]; NUM_INPUT_PORTS],

    cur_slot: usize,
    cur: SlotRecord,
    any_on: bool,
    idle_frames: u32,

    sets: Vec<SlotRecord, MAX_LEARN_SLOTS>,
}

impl LearnSession {
    /// Start a session. `neutral` is the last-known analog snapshot per
    /// physical port.
    #[must_use]
    pub fn new(
        kind: LearnKind,
        slot_count: usize,
        neutral: [[u8; NUM_ANALOGS]; NUM_INPUT_PORTS],
    ) -> Self {
        info!("learn session start, {} slots", slot_count);
        Self {
            kind,
            slot_count: slot_count.min(MAX_LEARN_SLOTS),
            wait_first_idle: true,
            port: None,
            vid: 0,
            pid: 0,
            analog_neutral: neutral,
            cur_slot: 0,
            cur: SlotRecord::default(),
            any_on: false,
            idle_frames: 0,
            sets: Vec::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> LearnKind {
        self.kind
    }

    /// Slot currently being learned.
    #[must_use]
    pub fn current_slot(&self) -> usize {
        self.cur_slot
    }

    /// Canonical button of the current slot, for prompts.
    #[must_use]
    pub fn current_button(&self) -> Option<PadButton> {
        match self.kind {
            LearnKind::Button => PadButton::from_slot(self.cur_slot),
            LearnKind::Analog => None,
        }
    }

    /// Observe one raw snapshot. The first activity locks the session to
    /// that physical port; other ports are ignored until the session ends.
    pub fn feed(&mut self, port: usize, input: &PadInput) {
        if port >= NUM_INPUT_PORTS {
            return;
        }

        let mut cur = self.cur;
        let mut any_on = false;

        for (acc, &live) in cur.buttons.iter_mut().zip(input.buttons.iter()) {
            *acc |= live;
            any_on |= live != 0;
        }

        if input.hat >= 0 {
            cur.hat = input.hat;
            any_on = true;
        }

        for ch in 0..NUM_ANALOGS {
            let live = AnalogPos::classify(input.analogs[ch]);
            let rest = AnalogPos::classify(self.analog_neutral[port][ch]);
            if live != rest {
                cur.analog = Some((ch as u8, live, rest));
                any_on = true;
            }
        }

        match self.port {
            None => {
                if !any_on {
                    return;
                }
                self.port = Some(port);
                self.vid = input.vid;
                self.pid = input.pid;
                debug!("learning port {} ({:04x}:{:04x})", port, input.vid, input.pid);
            }
            Some(locked) if locked != port => return,
            Some(_) => {}
        }

        self.cur = cur;
        self.any_on = any_on;
    }

    /// Advance the session by one tick of mode-button state.
    pub fn update(
        &mut self,
        mode_held: bool,
        mode_trigger: bool,
        mode_long: bool,
    ) -> LearnStep {
        if self.wait_first_idle {
            // The long press that opened the session is still in flight.
            if mode_held || mode_trigger {
                return LearnStep::Continue;
            }
            self.wait_first_idle = false;
        }

        if mode_long {
            // Commit what was learned so far.
            return LearnStep::Finished;
        }

        if mode_trigger && !self.cur.has_data() {
            debug!("skip slot {}", self.cur_slot);
            return self.advance();
        }

        if !self.any_on && self.cur.has_data() {
            self.idle_frames += 1;
            if self.idle_frames > IDLE_ADVANCE_FRAMES {
                return self.advance();
            }
        } else {
            self.idle_frames = 0;
        }

        LearnStep::Continue
    }

    fn advance(&mut self) -> LearnStep {
        let mut record = self.cur;
        if self.kind == LearnKind::Analog {
            record.filter_for_analog();
        }
        // Capacity equals the maximum slot count.
        let _ = self.sets.push(record);
        self.cur = SlotRecord::default();
        self.any_on = false;
        self.idle_frames = 0;

        self.cur_slot += 1;
        if self.cur_slot >= self.slot_count {
            return LearnStep::Finished;
        }
        LearnStep::Advanced
    }

    /// Convert the recorded slots into unit lists and register them.
    /// Returns true when anything was actually saved (and flash should be
    /// rewritten).
    pub fn commit(&self, translator: &mut PadTranslator, twin_port: bool) -> bool {
        if self.sets.is_empty() {
            return false;
        }

        let mut units: [Vec<Unit, MAX_BUTTON_UNITS>; 2] = [Vec::new(), Vec::new()];
        for (slot, record) in self.sets.iter().enumerate() {
            let mut sub_index = 0;
            let mut push = |source: UnitSource, units: &mut [Vec<Unit, MAX_BUTTON_UNITS>; 2]| {
                let unit = Unit {
                    source,
                    index: 0,
                    sub_index,
                    in_port_offset: 0,
                };
                sub_index += 1;
                self.place_unit(unit, slot, twin_port, units);
            };

            for i in 0..MAX_RAW_BUTTONS {
                if record.button(i) {
                    push(UnitSource::Button(i as u8), &mut units);
                }
            }
            if let Some((channel, on, off)) = record.analog {
                push(UnitSource::Analog { channel, on, off }, &mut units);
            }
            for pos in HatPos::ALL {
                if test_hat(record.hat, pos) {
                    push(UnitSource::Hat(pos), &mut units);
                }
            }
        }

        if units.iter().all(Vec::is_empty) {
            debug!("learn session recorded nothing");
            return false;
        }

        for (port, list) in units.iter().enumerate() {
            if list.is_empty() {
                continue;
            }
            let mut config = PadConfig::new(self.vid, self.pid, port as u8);
            match self.kind {
                LearnKind::Button => {
                    for &unit in list.iter() {
                        if config.buttons.push(unit).is_err() {
                            warn!("button unit overflow while committing");
                        }
                    }
                    translator.append(config, true, false);
                }
                LearnKind::Analog => {
                    for &unit in list.iter() {
                        if config.analogs.push(unit).is_err() {
                            warn!("analog unit overflow while committing");
                        }
                    }
                    translator.append(config, false, true);
                }
            }
        }
        true
    }

    /// Route one unit to its destination port and canonical index.
    ///
    /// Button sessions in twin-port mode split the slot range across the
    /// two ports, sharing CMD; analog sessions always target port 1 with
    /// the slot as the destination index.
    fn place_unit(
        &self,
        mut unit: Unit,
        slot: usize,
        twin_port: bool,
        units: &mut [Vec<Unit, MAX_BUTTON_UNITS>; 2],
    ) {
        match self.kind {
            LearnKind::Analog => {
                unit.index = slot as u8;
                let _ = units[0].push(unit);
            }
            LearnKind::Button => {
                if slot < NUM_BUTTONS {
                    unit.index = slot as u8;
                    let _ = units[0].push(unit);
                    if slot == PadButton::Cmd as usize && twin_port {
                        // CMD is shared between both fanned-out ports.
                        let _ = units[1].push(unit);
                    }
                } else if twin_port {
                    // Second set has no CMD slot of its own.
                    unit.index = (slot - NUM_BUTTONS + 1) as u8;
                    let _ = units[1].push(unit);
                }
            }
        }
    }
}
