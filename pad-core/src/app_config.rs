//! Runtime application settings, edited by the menu collaborator and
//! persisted alongside the config store.

use crate::persist::{Deserializer, PersistError, Serializer};
use crate::state::DEFAULT_RAPID_PHASE;

/// Number of user-editable turbo phase flags (buttons A..F).
pub const NUM_RAPID_PHASE_FLAGS: usize = 6;

/// Bit position of button A in the canonical mask; the phase flags cover
/// A..F.
const PHASE_FLAG_BASE: u32 = 7;

/// Analog output channel routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AnalogMode {
    #[default]
    Disabled = 0,
    /// Two channels on each of the two output ports.
    TwoChTwoPort = 1,
    /// All four channels on port 1 only.
    FourChOnePort = 2,
}

impl AnalogMode {
    fn from_wire(v: u8) -> Self {
        match v {
            1 => AnalogMode::TwoChTwoPort,
            2 => AnalogMode::FourChOnePort,
            _ => AnalogMode::Disabled,
        }
    }

    /// Learnable analog slots in this mode.
    #[must_use]
    pub const fn learn_slots(self) -> usize {
        match self {
            AnalogMode::FourChOnePort => 8,
            _ => 4,
        }
    }
}

/// Per-output-port turbo settings restored at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RapidSetting {
    /// Unit-slot turbo mask, as the state processor persists it.
    pub mask: u32,
    pub div: u8,
}

impl Default for RapidSetting {
    fn default() -> Self {
        Self { mask: 0, div: 1 }
    }
}

/// What the LCD shows while playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ButtonDispMode {
    #[default]
    InputButtons = 0,
    RapidButtons = 1,
    None = 2,
}

impl ButtonDispMode {
    fn from_wire(v: u8) -> Self {
        match v {
            1 => ButtonDispMode::RapidButtons,
            2 => ButtonDispMode::None,
            _ => ButtonDispMode::InputButtons,
        }
    }
}

/// The whole menu-editable configuration.
///
/// Serialization is gated by a version byte: any mismatch aborts the load
/// and the compiled-in defaults stay in charge. A format change bumps the
/// version, there is no migration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppConfig {
    pub init_power_on: bool,
    pub disp_fps: bool,
    pub button_disp_mode: ButtonDispMode,
    pub back_light: bool,
    /// Turbo clocked from the video sync instead of the software timer.
    pub rapid_mode_synchro: bool,
    /// Software turbo rate, in half-cycles per second.
    pub software_rapid_speed: u8,
    /// Per-button phase assignment for A..F.
    pub rapid_phase: [bool; NUM_RAPID_PHASE_FLAGS],
    pub twin_port: bool,
    pub analog_mode: AnalogMode,
    pub rapid_settings: [RapidSetting; 2],
}

/// Version byte for the AppConfig block.
pub const APP_CONFIG_VERSION: u8 = 0;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            init_power_on: false,
            disp_fps: true,
            button_disp_mode: ButtonDispMode::default(),
            back_light: true,
            rapid_mode_synchro: true,
            software_rapid_speed: 10,
            rapid_phase: [false, true, false, true, false, true],
            twin_port: false,
            analog_mode: AnalogMode::default(),
            rapid_settings: [RapidSetting::default(); 2],
        }
    }
}

impl AppConfig {
    pub fn set_software_rapid_speed(&mut self, v: u8) {
        self.software_rapid_speed = v.clamp(1, 30);
    }

    pub fn reset_rapid_phase(&mut self) {
        self.rapid_phase = [false, true, false, true, false, true];
    }

    /// Expand the six A..F flags onto the default alternation pattern,
    /// producing the phase mask the state processor consumes.
    #[must_use]
    pub fn rapid_phase_mask(&self) -> u32 {
        let mut phase = DEFAULT_RAPID_PHASE;
        for (i, &flag) in self.rapid_phase.iter().enumerate() {
            let bit = 1u32 << (PHASE_FLAG_BASE + i as u32);
            if flag {
                phase |= bit;
            } else {
                phase &= !bit;
            }
        }
        phase
    }

    pub fn serialize(&self, s: &mut Serializer<'_>) {
        s.append_u8(APP_CONFIG_VERSION);
        s.append_u8(self.init_power_on as u8);
        s.append_u8(self.disp_fps as u8);
        s.append_u8(self.button_disp_mode as u8);
        s.append_u8(self.back_light as u8);
        s.append_u8(self.rapid_mode_synchro as u8);
        s.append_u8(self.software_rapid_speed);
        for &flag in &self.rapid_phase {
            s.append_u8(flag as u8);
        }
        s.append_u8(self.twin_port as u8);
        s.append_u8(self.analog_mode as u8);
        for rs in &self.rapid_settings {
            s.append_u32(rs.mask);
            s.append_u8(rs.div);
        }
    }

    /// Read the block in place. A version mismatch is an error and leaves
    /// `self` untouched.
    pub fn deserialize(&mut self, d: &mut Deserializer<'_>) -> Result<(), PersistError> {
        let version = d.read_u8()?;
        if version != APP_CONFIG_VERSION {
            warn!("app config version {} != {}", version, APP_CONFIG_VERSION);
            return Err(PersistError::BadVersion);
        }

        let mut loaded = Self::default();
        loaded.init_power_on = d.read_u8()? != 0;
        loaded.disp_fps = d.read_u8()? != 0;
        loaded.button_disp_mode = ButtonDispMode::from_wire(d.read_u8()?);
        loaded.back_light = d.read_u8()? != 0;
        loaded.rapid_mode_synchro = d.read_u8()? != 0;
        loaded.set_software_rapid_speed(d.read_u8()?);
        for i in 0..NUM_RAPID_PHASE_FLAGS {
            loaded.rapid_phase[i] = d.read_u8()? != 0;
        }
        loaded.twin_port = d.read_u8()? != 0;
        loaded.analog_mode = AnalogMode::from_wire(d.read_u8()?);
        for rs in &mut loaded.rapid_settings {
            rs.mask = d.read_u32()?;
            rs.div = d.read_u8()?.clamp(1, 4);
        }

        *self = loaded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::buttons::PadButton;

    #[test]
    fn test_round_trip() {
        let mut config = AppConfig::default();
        config.twin_port = true;
        config.analog_mode = AnalogMode::FourChOnePort;
        config.set_software_rapid_speed(25);
        config.rapid_phase = [true; NUM_RAPID_PHASE_FLAGS];
        config.rapid_settings[1] = RapidSetting { mask: 0x16, div: 3 };

        let mut buf = [0u8; 256];
        let mut s = Serializer::new(&mut buf, 0);
        config.serialize(&mut s);
        s.finish();

        let mut loaded = AppConfig::default();
        let mut d = Deserializer::open(&buf).unwrap();
        loaded.deserialize(&mut d).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_version_gate_aborts_and_keeps_defaults() {
        let config = AppConfig {
            twin_port: true,
            ..AppConfig::default()
        };
        let mut buf = [0u8; 256];
        let mut s = Serializer::new(&mut buf, 0);
        config.serialize(&mut s);
        s.finish();
        // Corrupt the version byte.
        buf[crate::persist::HEADER_LEN] = 9;

        let mut loaded = AppConfig::default();
        let mut d = Deserializer::open(&buf).unwrap();
        assert_eq!(
            loaded.deserialize(&mut d).unwrap_err(),
            PersistError::BadVersion
        );
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn test_phase_mask_expansion() {
        let mut config = AppConfig::default();
        // Defaults alternate starting at A: A off-phase, B on-phase.
        let phase = config.rapid_phase_mask();
        assert_eq!(phase & PadButton::A.bit(), 0);
        assert_ne!(phase & PadButton::B.bit(), 0);
        assert_eq!(phase & PadButton::E.bit(), 0);
        assert_ne!(phase & PadButton::F.bit(), 0);
        // Bits outside A..F keep the default pattern.
        assert_eq!(
            phase & !(0x3F << 7),
            DEFAULT_RAPID_PHASE & !(0x3F << 7)
        );

        config.rapid_phase = [true; NUM_RAPID_PHASE_FLAGS];
        let phase = config.rapid_phase_mask();
        assert_eq!(phase & (0x3F << 7), 0x3F << 7);
    }

    #[test]
    fn test_speed_clamp() {
        let mut config = AppConfig::default();
        config.set_software_rapid_speed(0);
        assert_eq!(config.software_rapid_speed, 1);
        config.set_software_rapid_speed(200);
        assert_eq!(config.software_rapid_speed, 30);
    }
}
