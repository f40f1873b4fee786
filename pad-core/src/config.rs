//! Per-device mapping configuration: units and `PadConfig`.

use heapless::Vec;

use crate::input::PadInput;
use crate::persist::{Deserializer, PersistError, Serializer};

/// Analog output range: values are in `0..ANALOG_RANGE`.
pub const ANALOG_RANGE: u16 = 1024;

/// Full-scale analog output (digital sources map to 0 or this).
pub const ANALOG_ON: u16 = ANALOG_RANGE - 1;

/// Maximum button units per config. Matches the per-port output mask width
/// used by the state processor.
pub const MAX_BUTTON_UNITS: usize = 32;

/// Maximum analog units per config (8 learnable analog slots).
pub const MAX_ANALOG_UNITS: usize = 8;

/// Reference level of an 8-bit analog sample. Wire values: H=0, MID=1, L=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AnalogPos {
    #[default]
    High = 0,
    Mid = 1,
    Low = 2,
}

impl AnalogPos {
    #[inline]
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            AnalogPos::High => 255,
            AnalogPos::Mid => 128,
            AnalogPos::Low => 0,
        }
    }

    /// Three-band classification of a raw sample.
    #[inline]
    #[must_use]
    pub const fn classify(v: u8) -> Self {
        if v < 85 {
            AnalogPos::Low
        } else if v > 170 {
            AnalogPos::High
        } else {
            AnalogPos::Mid
        }
    }

    fn from_wire(v: u8) -> Self {
        match v {
            0 => AnalogPos::High,
            2 => AnalogPos::Low,
            _ => AnalogPos::Mid,
        }
    }
}

/// One of the four hat edges. Wire values: Left=0, Right=1, Up=2, Down=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HatPos {
    #[default]
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
}

impl HatPos {
    pub const ALL: [HatPos; 4] = [HatPos::Left, HatPos::Right, HatPos::Up, HatPos::Down];

    fn from_wire(v: u8) -> Self {
        match v {
            0 => HatPos::Left,
            1 => HatPos::Right,
            2 => HatPos::Up,
            _ => HatPos::Down,
        }
    }
}

/// Does hat value `hat` (0..=7 clockwise from up, -1 idle) press edge `pos`?
#[must_use]
pub fn test_hat(hat: i8, pos: HatPos) -> bool {
    const L: u8 = 1 << HatPos::Left as u8;
    const R: u8 = 1 << HatPos::Right as u8;
    const U: u8 = 1 << HatPos::Up as u8;
    const D: u8 = 1 << HatPos::Down as u8;
    const TABLE: [u8; 8] = [U, U | R, R, D | R, D, L | D, L, L | U];

    match usize::try_from(hat) {
        Ok(i) if i < 8 => TABLE[i] & (1 << pos as u8) != 0,
        _ => false,
    }
}

/// The raw signal a unit reads. Wire type bytes: 0=None, 1=Button,
/// 2=Analog, 3=Hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnitSource {
    #[default]
    None,
    /// Raw button bit index.
    Button(u8),
    /// Raw analog channel with the two reference levels: `on` is where the
    /// control rests when active, `off` where it rests when released.
    Analog { channel: u8, on: AnalogPos, off: AnalogPos },
    /// Hat edge membership.
    Hat(HatPos),
}

/// One raw-to-canonical binding record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Unit {
    pub source: UnitSource,
    /// Destination canonical slot (button bit, or analog high/low slot).
    pub index: u8,
    /// Disambiguates several raw sources mapped to one destination.
    pub sub_index: u8,
    /// Input port offset, for devices spanning ports.
    pub in_port_offset: u8,
}

impl Unit {
    /// Nearest-reference test of a raw analog sample: true when `v` is
    /// closer to the on level than to the off level.
    #[must_use]
    pub fn test_analog(&self, v: u8) -> bool {
        let UnitSource::Analog { on, off, .. } = self.source else {
            return false;
        };
        let d_on = on.level() as i32 - v as i32;
        let d_off = off.level() as i32 - v as i32;
        d_off * d_off > d_on * d_on
    }

    /// Fixed 8-byte record: type, number, analogOn, analogOff, hatPos,
    /// index, subIndex, inPortOfs.
    pub fn serialize(&self, s: &mut Serializer<'_>) {
        let (ty, number, on, off, hat) = match self.source {
            UnitSource::None => (0, 0, 0, 0, 0),
            UnitSource::Button(n) => (1, n, 0, 0, 0),
            UnitSource::Analog { channel, on, off } => (2, channel, on as u8, off as u8, 0),
            UnitSource::Hat(pos) => (3, 0, 0, 0, pos as u8),
        };
        s.append_u8(ty);
        s.append_u8(number);
        s.append_u8(on);
        s.append_u8(off);
        s.append_u8(hat);
        s.append_u8(self.index);
        s.append_u8(self.sub_index);
        s.append_u8(self.in_port_offset);
    }

    pub fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, PersistError> {
        let ty = d.read_u8()?;
        let number = d.read_u8()?;
        let on = d.read_u8()?;
        let off = d.read_u8()?;
        let hat = d.read_u8()?;
        let index = d.read_u8()?;
        let sub_index = d.read_u8()?;
        let in_port_offset = d.read_u8()?;

        // The index becomes a shift amount in the state processor; it must
        // stay inside the mask width.
        if index as usize >= MAX_BUTTON_UNITS {
            warn!("unit index {} out of range", index);
            return Err(PersistError::BadRecord);
        }

        let source = match ty {
            1 => UnitSource::Button(number),
            2 => UnitSource::Analog {
                channel: number,
                on: AnalogPos::from_wire(on),
                off: AnalogPos::from_wire(off),
            },
            3 => UnitSource::Hat(HatPos::from_wire(hat)),
            _ => UnitSource::None,
        };
        Ok(Self {
            source,
            index,
            sub_index,
            in_port_offset,
        })
    }
}

/// The mapping of one device onto one output port.
///
/// Identity is `(vid, pid, out_port_offset)`: in twin-port mode a single
/// physical device owns two configs, one per fanned-out port.
#[derive(Debug, Clone, Default)]
pub struct PadConfig {
    pub vid: u16,
    pub pid: u16,
    pub out_port_offset: u8,
    pub buttons: Vec<Unit, MAX_BUTTON_UNITS>,
    pub analogs: Vec<Unit, MAX_ANALOG_UNITS>,
}

impl PadConfig {
    #[must_use]
    pub fn new(vid: u16, pid: u16, out_port_offset: u8) -> Self {
        Self {
            vid,
            pid,
            out_port_offset,
            buttons: Vec::new(),
            analogs: Vec::new(),
        }
    }

    /// Sort/lookup key.
    #[inline]
    #[must_use]
    pub fn key(&self) -> (u16, u16, u8) {
        (self.vid, self.pid, self.out_port_offset)
    }

    /// Evaluate the `i`-th button unit against a raw input snapshot.
    #[must_use]
    pub fn convert_button(&self, i: usize, input: &PadInput) -> bool {
        let Some(unit) = self.buttons.get(i) else {
            return false;
        };
        match unit.source {
            UnitSource::Button(n) => input.button(n as usize),
            UnitSource::Analog { channel, .. } => {
                let v = input.analogs.get(channel as usize).copied().unwrap_or(128);
                unit.test_analog(v)
            }
            UnitSource::Hat(pos) => test_hat(input.hat, pos),
            UnitSource::None => false,
        }
    }

    /// Evaluate the `i`-th analog unit, yielding a value in `0..1024`.
    ///
    /// Digital sources produce the rail values 0 and [`ANALOG_ON`]; analog
    /// sources rescale linearly between the off and on reference levels.
    #[must_use]
    pub fn convert_analog(&self, i: usize, input: &PadInput) -> Option<u16> {
        let unit = self.analogs.get(i)?;
        match unit.source {
            UnitSource::Button(n) => Some(if input.button(n as usize) { ANALOG_ON } else { 0 }),
            UnitSource::Analog { channel, on, off } => {
                let v = input.analogs.get(channel as usize).copied().unwrap_or(128) as i32;
                let lo = off.level() as i32;
                let hi = on.level() as i32;
                if hi == lo {
                    return Some(0);
                }
                let scaled = (v - lo) * ANALOG_ON as i32 / (hi - lo);
                Some(scaled.clamp(0, ANALOG_ON as i32) as u16)
            }
            UnitSource::Hat(pos) => Some(if test_hat(input.hat, pos) { ANALOG_ON } else { 0 }),
            UnitSource::None => None,
        }
    }

    /// Store-block entry body (the enabled marker is the caller's).
    pub fn serialize(&self, s: &mut Serializer<'_>) {
        s.append_u16(self.vid);
        s.append_u16(self.pid);
        s.append_u8(self.out_port_offset);
        s.append_u16(self.buttons.len() as u16);
        for unit in &self.buttons {
            unit.serialize(s);
        }
        s.append_u8(self.analogs.len() as u8);
        for unit in &self.analogs {
            unit.serialize(s);
        }
    }

    pub fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, PersistError> {
        let vid = d.read_u16()?;
        let pid = d.read_u16()?;
        let out_port_offset = d.read_u8()?;
        let mut config = Self::new(vid, pid, out_port_offset);

        let n_buttons = d.read_u16()? as usize;
        for _ in 0..n_buttons {
            let unit = Unit::deserialize(d)?;
            if config.buttons.push(unit).is_err() {
                warn!("button unit overflow for {:04x}:{:04x}", vid, pid);
            }
        }
        let n_analogs = d.read_u8()? as usize;
        for _ in 0..n_analogs {
            let unit = Unit::deserialize(d)?;
            if config.analogs.push(unit).is_err() {
                warn!("analog unit overflow for {:04x}:{:04x}", vid, pid);
            }
        }
        Ok(config)
    }
}
