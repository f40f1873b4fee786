//! The sorted per-device config store with its default fallback.

use heapless::Vec;

use crate::buttons::PadButton;
use crate::config::{AnalogPos, HatPos, PadConfig, Unit, UnitSource};
use crate::persist::{Deserializer, PersistError, Serializer};

/// Maximum learned configs kept in the store.
pub const MAX_CONFIGS: usize = 16;

/// Config store keyed by `(vid, pid, out_port_offset)`, kept sorted for
/// binary search. Lookups never miss: unknown devices get the generic
/// default mapping.
pub struct PadTranslator {
    configs: Vec<PadConfig, MAX_CONFIGS>,
    default_config: PadConfig,
}

impl Default for PadTranslator {
    fn default() -> Self {
        Self {
            configs: Vec::new(),
            default_config: default_pad_config(),
        }
    }
}

/// The compiled-in mapping for devices never seen in learn mode: the two
/// primary stick axes and the hat drive the directions, raw buttons 1..=8
/// land on A, B, COIN, START, C, D, E, F.
fn default_pad_config() -> PadConfig {
    use PadButton as B;

    let button = |n: u8, index: B| Unit {
        source: UnitSource::Button(n),
        index: index as u8,
        ..Unit::default()
    };
    let analog = |channel: u8, on: AnalogPos, index: B| Unit {
        source: UnitSource::Analog {
            channel,
            on,
            off: AnalogPos::Mid,
        },
        index: index as u8,
        ..Unit::default()
    };
    let hat = |pos: HatPos, index: B| Unit {
        source: UnitSource::Hat(pos),
        index: index as u8,
        ..Unit::default()
    };

    let mut config = PadConfig::new(0, 0, 0);
    let units = [
        analog(0, AnalogPos::Low, B::Left),
        analog(0, AnalogPos::High, B::Right),
        analog(1, AnalogPos::Low, B::Up),
        analog(1, AnalogPos::High, B::Down),
        hat(HatPos::Left, B::Left),
        hat(HatPos::Right, B::Right),
        hat(HatPos::Up, B::Up),
        hat(HatPos::Down, B::Down),
        button(0, B::A),
        button(1, B::B),
        button(2, B::Coin),
        button(3, B::Start),
        button(4, B::C),
        button(5, B::D),
        button(6, B::E),
        button(7, B::F),
    ];
    for unit in units {
        // Capacity is sized well above the default table.
        let _ = config.buttons.push(unit);
    }
    config
}

impl PadTranslator {
    pub fn set_default_config(&mut self, config: PadConfig) {
        self.default_config = config;
    }

    /// Exact-match lookup falling back to the default config, so callers
    /// can always translate.
    #[must_use]
    pub fn find(&self, vid: u16, pid: u16, port_offset: u8) -> &PadConfig {
        match self.position(vid, pid, port_offset) {
            Some(i) => &self.configs[i],
            None => &self.default_config,
        }
    }

    fn position(&self, vid: u16, pid: u16, port_offset: u8) -> Option<usize> {
        let key = (vid, pid, port_offset);
        let i = self.configs.partition_point(|c| c.key() < key);
        (i < self.configs.len() && self.configs[i].key() == key).then_some(i)
    }

    /// Insert or replace a config.
    ///
    /// When the key already exists, only the selected unit lists are
    /// overwritten so a button-learn session does not clobber a previous
    /// analog-learn result (and vice versa). A full store drops the new
    /// entry.
    pub fn append(&mut self, config: PadConfig, replace_buttons: bool, replace_analogs: bool) {
        if let Some(i) = self.position(config.vid, config.pid, config.out_port_offset) {
            let existing = &mut self.configs[i];
            if replace_buttons {
                existing.buttons = config.buttons;
            }
            if replace_analogs {
                existing.analogs = config.analogs;
            }
            return;
        }

        if self.configs.push(config).is_err() {
            warn!("config store full, dropping entry");
            return;
        }
        self.sort();
    }

    fn sort(&mut self) {
        self.configs.sort_unstable_by_key(PadConfig::key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn reset(&mut self) {
        self.configs.clear();
    }

    /// Store block: entry count, then marker-prefixed entries. When the
    /// writer's size ceiling is reached a zero marker terminates the block
    /// early and the remaining entries are dropped.
    pub fn serialize(&self, s: &mut Serializer<'_>) {
        s.append_i32(self.configs.len() as i32);
        for config in &self.configs {
            if s.over_limit() || s.remaining() < 1 {
                s.append_u8(0);
                return;
            }
            s.append_u8(1);
            config.serialize(s);
        }
    }

    /// Replace the store contents from a stream. Entries beyond capacity
    /// are consumed and dropped so the cursor stays consistent.
    pub fn deserialize(&mut self, d: &mut Deserializer<'_>) -> Result<(), PersistError> {
        self.configs.clear();
        let count = d.read_i32()?;
        for _ in 0..count.max(0) {
            if d.read_u8()? == 0 {
                break;
            }
            let config = PadConfig::deserialize(d)?;
            if self.configs.push(config).is_err() {
                warn!("config store full, skipping persisted entry");
            }
        }
        self.sort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::input::PadInput;

    fn config_with_marker(vid: u16, pid: u16, port: u8, raw_button: u8) -> PadConfig {
        let mut c = PadConfig::new(vid, pid, port);
        c.buttons
            .push(Unit {
                source: UnitSource::Button(raw_button),
                index: PadButton::A as u8,
                ..Unit::default()
            })
            .unwrap();
        c
    }

    #[test]
    fn test_default_fallback_never_misses() {
        let translator = PadTranslator::default();
        let cfg = translator.find(0xDEAD, 0xBEEF, 0);
        assert!(!cfg.buttons.is_empty());
        assert_eq!(cfg.key(), (0, 0, 0));
    }

    #[test]
    fn test_default_mapping_scenario() {
        // A generic 2-axis/8-button pad against the compiled-in mapping.
        let translator = PadTranslator::default();
        let cfg = translator.find(0x1234, 0x5678, 0);

        let mapped = |input: &PadInput| -> u32 {
            let mut m = 0;
            for i in 0..cfg.buttons.len() {
                if cfg.convert_button(i, input) {
                    m |= 1 << cfg.buttons[i].index;
                }
            }
            m
        };

        // Stick hard left + button 1.
        let mut input = PadInput::default();
        input.analogs[0] = 0;
        input.set_button(0, true);
        assert_eq!(mapped(&input), PadButton::Left.bit() | PadButton::A.bit());

        // Stick up-right via hat + button 4.
        let mut input = PadInput::default();
        input.hat = 1;
        input.set_button(3, true);
        assert_eq!(
            mapped(&input),
            PadButton::Up.bit() | PadButton::Right.bit() | PadButton::Start.bit()
        );

        // Buttons 3 and 8 only, stick neutral.
        let mut input = PadInput::default();
        input.set_button(2, true);
        input.set_button(7, true);
        assert_eq!(mapped(&input), PadButton::Coin.bit() | PadButton::F.bit());
    }

    #[test]
    fn test_sort_invariant_and_search_agrees_with_scan() {
        let mut translator = PadTranslator::default();
        let keys = [
            (3u16, 1u16, 0u8),
            (1, 9, 1),
            (1, 9, 0),
            (2, 0, 0),
            (1, 2, 0),
        ];
        for (i, &(vid, pid, port)) in keys.iter().enumerate() {
            translator.append(config_with_marker(vid, pid, port, i as u8), true, true);
        }

        let sorted: std::vec::Vec<_> = translator.configs.iter().map(PadConfig::key).collect();
        let mut expect = sorted.clone();
        expect.sort_unstable();
        assert_eq!(sorted, expect);

        for &(vid, pid, port) in &keys {
            let by_search = translator.find(vid, pid, port);
            let by_scan = translator
                .configs
                .iter()
                .find(|c| c.key() == (vid, pid, port))
                .unwrap();
            assert_eq!(by_search.key(), by_scan.key());
            assert_eq!(by_search.buttons.as_slice(), by_scan.buttons.as_slice());
        }
    }

    #[test]
    fn test_append_selective_replace() {
        let mut translator = PadTranslator::default();

        let mut first = config_with_marker(7, 7, 0, 1);
        first
            .analogs
            .push(Unit {
                source: UnitSource::Analog {
                    channel: 0,
                    on: AnalogPos::High,
                    off: AnalogPos::Mid,
                },
                index: 0,
                ..Unit::default()
            })
            .unwrap();
        translator.append(first.clone(), true, true);

        // A button-only relearn must not touch the analog list.
        let relearn = config_with_marker(7, 7, 0, 9);
        translator.append(relearn, true, false);

        let cfg = translator.find(7, 7, 0);
        assert_eq!(cfg.buttons[0].source, UnitSource::Button(9));
        assert_eq!(cfg.analogs.as_slice(), first.analogs.as_slice());
    }

    #[test]
    fn test_store_round_trip() {
        let mut translator = PadTranslator::default();
        translator.append(config_with_marker(0x0F0D, 0x0011, 0, 2), true, true);
        translator.append(config_with_marker(0x054C, 0x09CC, 1, 5), true, true);

        let mut buf = [0u8; 512];
        let mut s = Serializer::new(&mut buf, 0);
        translator.serialize(&mut s);
        s.finish();

        let mut fresh = PadTranslator::default();
        let mut d = Deserializer::open(&buf).unwrap();
        fresh.deserialize(&mut d).unwrap();

        assert_eq!(fresh.len(), 2);
        for (vid, pid, port) in [(0x0F0D, 0x0011, 0u8), (0x054C, 0x09CC, 1u8)] {
            assert_eq!(
                fresh.find(vid, pid, port).buttons.as_slice(),
                translator.find(vid, pid, port).buttons.as_slice()
            );
        }
    }

    #[test]
    fn test_capacity_truncation_keeps_stream_parseable() {
        let mut translator = PadTranslator::default();
        for i in 0..MAX_CONFIGS {
            translator.append(config_with_marker(i as u16, 0, 0, 0), true, true);
        }

        // Room for a handful of entries, far fewer than the store holds;
        // the margin absorbs the entry that crosses the ceiling.
        let mut buf = [0u8; 160];
        let mut s = Serializer::new(&mut buf, 32);
        translator.serialize(&mut s);
        let len = s.finish();
        assert!(len <= buf.len());

        let mut fresh = PadTranslator::default();
        let mut d = Deserializer::open(&buf).unwrap();
        fresh.deserialize(&mut d).unwrap();
        assert!(fresh.len() < MAX_CONFIGS);
        assert!(!fresh.is_empty());
    }
}
