//! HID report-descriptor parsing.
//!
//! [`DescriptorTable::parse`] walks the item stream once at device mount
//! and produces, per report ID, sorted tables of the input/output/feature
//! fields the translation core understands. Parsing follows a
//! partial-result policy: malformed or truncated descriptors keep whatever
//! was decoded before the problem, they never fail outright.

use heapless::Vec;

use crate::items::{
    ItemReader, ItemType, MAIN_BUFFERED_BYTES, MAIN_CONSTANT, MAIN_NULL_STATE, MAIN_VARIABLE,
    TAG_COLLECTION, TAG_END_COLLECTION, TAG_FEATURE, TAG_INPUT, TAG_LOGICAL_MAXIMUM,
    TAG_LOGICAL_MINIMUM, TAG_OUTPUT, TAG_POP, TAG_PUSH, TAG_REPORT_COUNT, TAG_REPORT_ID,
    TAG_REPORT_SIZE, TAG_USAGE, TAG_USAGE_MAXIMUM, TAG_USAGE_MINIMUM, TAG_USAGE_PAGE,
};
use crate::usage;

/// Maximum number of fields kept per report set and kind.
pub const MAX_FIELDS: usize = 48;

/// Maximum number of distinct report IDs per device.
pub const MAX_REPORT_SETS: usize = 8;

/// Maximum explicit usages buffered between MAIN items.
const MAX_LOCAL_USAGES: usize = 32;

/// Maximum PUSH nesting.
const MAX_STATE_DEPTH: usize = 4;

/// One decoded report field.
///
/// `usage` is the packed `page << 16 | usage` value; fields are ordered by
/// `(usage, bit_offset)` once parsing finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    pub usage: u32,
    pub bit_offset: u32,
    pub bit_width: u8,
    pub logical_min: i32,
    pub logical_max: i32,
    pub is_constant: bool,
    pub is_array: bool,
    pub is_nullable: bool,
}

impl Field {
    /// True for usages on the button page.
    #[inline]
    #[must_use]
    pub const fn is_button(&self) -> bool {
        usage::is_button(self.usage)
    }

    /// True for the hat-switch usage.
    #[inline]
    #[must_use]
    pub const fn is_hat(&self) -> bool {
        usage::is_hat(self.usage)
    }

    /// Canonical analog index for linear-axis usages.
    #[inline]
    #[must_use]
    pub const fn analog_index(&self) -> Option<usize> {
        usage::analog_index(self.usage)
    }
}

/// The fields of one report ID, split by direction.
#[derive(Debug, Default, Clone)]
pub struct ReportSet {
    pub inputs: Vec<Field, MAX_FIELDS>,
    pub outputs: Vec<Field, MAX_FIELDS>,
    pub features: Vec<Field, MAX_FIELDS>,
}

/// Parser options. Defaults keep only button/hat/axis usages and drop
/// output and feature fields, which the adapter never consumes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParseOptions {
    pub enable_unknowns: bool,
    pub enable_output: bool,
    pub enable_feature: bool,
}

/// Parsed descriptor: report sets keyed by report ID.
///
/// Rebuilt from scratch on every device mount; there is no incremental
/// update.
#[derive(Debug, Default, Clone)]
pub struct DescriptorTable {
    sets: Vec<(u8, ReportSet), MAX_REPORT_SETS>,
    /// Usage of the outermost collection. Callers use it to tell device
    /// genres apart (joystick vs. multi-axis controller).
    pub usage_lv0: u32,
}

/// Item-state context, stacked by PUSH/POP.
#[derive(Debug, Default, Clone)]
struct State {
    report_id: u8,
    usage_page: i32,
    usages: Vec<i32, MAX_LOCAL_USAGES>,
    usage_min: i32,
    usage_max: i32,
    logical_min: i32,
    logical_max: i32,
    report_size: i32,
    report_count: i32,
}

impl State {
    fn clear_local(&mut self) {
        self.usages.clear();
        self.usage_min = 0;
        self.usage_max = 0;
    }

    fn packed_usage(&self, u: i32) -> u32 {
        ((self.usage_page as u32) << 16) | (u as u32 & 0xFFFF)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Input,
    Output,
    Feature,
}

impl DescriptorTable {
    /// Parse a raw report descriptor.
    #[must_use]
    pub fn parse(data: &[u8], options: ParseOptions) -> Self {
        let mut table = Self::default();
        let mut stack: Vec<State, MAX_STATE_DEPTH> = Vec::new();
        // The stack always holds at least one state.
        let _ = stack.push(State::default());

        let mut collection_level: i32 = 0;
        let mut bit_offset: u32 = 0;

        for item in ItemReader::new(data) {
            let Some(state) = stack.last_mut() else {
                break;
            };

            match item.item_type {
                ItemType::Main => {
                    match item.tag {
                        TAG_INPUT => {
                            table.emit(state, FieldKind::Input, item.value, &mut bit_offset, &options);
                        }
                        TAG_OUTPUT => {
                            table.emit(state, FieldKind::Output, item.value, &mut bit_offset, &options);
                        }
                        TAG_FEATURE => {
                            table.emit(state, FieldKind::Feature, item.value, &mut bit_offset, &options);
                        }
                        TAG_COLLECTION => {
                            if collection_level == 0 {
                                if let Some(&u) = state.usages.first() {
                                    table.usage_lv0 = state.packed_usage(u);
                                }
                            }
                            collection_level += 1;
                        }
                        TAG_END_COLLECTION => {
                            collection_level -= 1;
                            if collection_level < 0 {
                                warn!("collection level underflow");
                            }
                        }
                        _ => {}
                    }
                    state.clear_local();
                }
                ItemType::Global => match item.tag {
                    TAG_USAGE_PAGE => state.usage_page = item.value,
                    TAG_LOGICAL_MINIMUM => state.logical_min = item.value,
                    TAG_LOGICAL_MAXIMUM => state.logical_max = item.value,
                    TAG_REPORT_SIZE => state.report_size = item.value,
                    TAG_REPORT_ID => {
                        state.report_id = item.value as u8;
                        bit_offset = 0;
                    }
                    TAG_REPORT_COUNT => state.report_count = item.value,
                    TAG_PUSH => {
                        let copy = state.clone();
                        if stack.push(copy).is_err() {
                            warn!("state stack overflow");
                        }
                    }
                    TAG_POP => {
                        if stack.len() <= 1 {
                            warn!("state stack underflow");
                        } else {
                            stack.pop();
                        }
                    }
                    _ => {}
                },
                ItemType::Local => match item.tag {
                    TAG_USAGE => {
                        if state.usages.push(item.value).is_err() {
                            warn!("usage list overflow");
                        }
                    }
                    TAG_USAGE_MINIMUM => state.usage_min = item.value,
                    TAG_USAGE_MAXIMUM => state.usage_max = item.value,
                    _ => {}
                },
                ItemType::Reserved => {}
            }
        }

        for (_, set) in table.sets.iter_mut() {
            normalize(&mut set.inputs);
            normalize(&mut set.outputs);
            normalize(&mut set.features);
        }

        table
    }

    /// The report set for a given report ID, if any.
    #[must_use]
    pub fn report_set(&self, id: u8) -> Option<&ReportSet> {
        self.sets.iter().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    /// The sole report set of a device that does not use report IDs.
    #[must_use]
    pub fn sole_report_set(&self) -> Option<&ReportSet> {
        match self.sets.as_slice() {
            [(0, set)] => Some(set),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    fn set_for(&mut self, id: u8) -> Option<&mut ReportSet> {
        if let Some(i) = self.sets.iter().position(|(rid, _)| *rid == id) {
            return self.sets.get_mut(i).map(|(_, s)| s);
        }
        if self.sets.push((id, ReportSet::default())).is_err() {
            warn!("too many report IDs");
            return None;
        }
        self.sets.last_mut().map(|(_, s)| s)
    }

    /// Expand one MAIN item into fields and advance the bit cursor.
    fn emit(
        &mut self,
        state: &State,
        kind: FieldKind,
        flags: i32,
        bit_offset: &mut u32,
        options: &ParseOptions,
    ) {
        // "Buffered bytes" fields are byte-aligned and step by whole bytes.
        let buffered = flags & MAIN_BUFFERED_BYTES != 0;
        if buffered {
            *bit_offset = (*bit_offset + 7) & !7;
        }
        let step_mul: u32 = if buffered { 8 } else { 1 };
        let bit_step = step_mul * state.report_size.max(0) as u32;
        let count = state.report_count.max(0) as u32;

        let enabled = match kind {
            FieldKind::Input => true,
            FieldKind::Output => options.enable_output,
            FieldKind::Feature => options.enable_feature,
        };

        if enabled {
            let template = Field {
                usage: 0,
                bit_offset: 0,
                bit_width: state.report_size.clamp(0, 255) as u8,
                logical_min: state.logical_min,
                logical_max: state.logical_max,
                is_constant: flags & MAIN_CONSTANT != 0,
                is_array: flags & MAIN_VARIABLE == 0,
                is_nullable: flags & MAIN_NULL_STATE != 0,
            };

            let mut offset = *bit_offset;
            let mut push = |usage: u32, set: &mut ReportSet| {
                if options.enable_unknowns || usage::is_interesting(usage) {
                    let field = Field {
                        usage,
                        bit_offset: offset,
                        ..template
                    };
                    let list = match kind {
                        FieldKind::Input => &mut set.inputs,
                        FieldKind::Output => &mut set.outputs,
                        FieldKind::Feature => &mut set.features,
                    };
                    if list.push(field).is_err() {
                        warn!("field table full, dropping usage {:08x}", usage);
                    }
                }
                offset += bit_step;
            };

            if state.usages.is_empty() {
                if state.usage_min > 0 && state.usage_max >= state.usage_min {
                    if let Some(set) = self.set_for(state.report_id) {
                        let mut left = count;
                        for u in state.usage_min..=state.usage_max {
                            if left == 0 {
                                break;
                            }
                            left -= 1;
                            push(state.packed_usage(u), set);
                        }
                        if left > 0 {
                            warn!("usage range short of report count, left = {}", left);
                        }
                    }
                }
            } else if let Some(set) = self.set_for(state.report_id) {
                if state.usages.len() as u32 != count {
                    warn!(
                        "usage count mismatch {} != {}",
                        state.usages.len(),
                        count
                    );
                }
                for &u in state.usages.iter().take(count as usize) {
                    push(state.packed_usage(u), set);
                }
            }
        }

        *bit_offset += bit_step * count;
    }
}

/// Sort by (usage, bit offset) and collapse duplicate usages, keeping the
/// last occurrence of each.
fn normalize(fields: &mut Vec<Field, MAX_FIELDS>) {
    fields.sort_unstable_by_key(|f| (f.usage, f.bit_offset));

    let mut i = 0;
    while i + 1 < fields.len() {
        if fields[i].usage == fields[i + 1].usage {
            fields.remove(i);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;

    use super::*;
    use crate::usage::pack;

    /// Generic 2-axis / 8-button gamepad without report IDs.
    pub(crate) const GAMEPAD_DESC: &[u8] = &[
        0x05, 0x01, // Usage Page (Generic Desktop)
        0x09, 0x05, // Usage (Gamepad)
        0xA1, 0x01, // Collection (Application)
        0x09, 0x30, //   Usage (X)
        0x09, 0x31, //   Usage (Y)
        0x15, 0x00, //   Logical Minimum (0)
        0x26, 0xFF, 0x00, //   Logical Maximum (255)
        0x75, 0x08, //   Report Size (8)
        0x95, 0x02, //   Report Count (2)
        0x81, 0x02, //   Input (Data, Var, Abs)
        0x05, 0x09, //   Usage Page (Button)
        0x19, 0x01, //   Usage Minimum (1)
        0x29, 0x08, //   Usage Maximum (8)
        0x15, 0x00, //   Logical Minimum (0)
        0x25, 0x01, //   Logical Maximum (1)
        0x75, 0x01, //   Report Size (1)
        0x95, 0x08, //   Report Count (8)
        0x81, 0x02, //   Input (Data, Var, Abs)
        0xC0, // End Collection
    ];

    #[test]
    fn test_gamepad_descriptor() {
        let table = DescriptorTable::parse(GAMEPAD_DESC, ParseOptions::default());
        assert_eq!(table.usage_lv0, pack(0x0001, 0x0005));

        let set = table.sole_report_set().unwrap();
        // 2 axes + 8 buttons
        assert_eq!(set.inputs.len(), 10);

        let x = set.inputs.iter().find(|f| f.usage == 0x0001_0030).unwrap();
        assert_eq!(x.bit_offset, 0);
        assert_eq!(x.bit_width, 8);
        assert_eq!(x.logical_max, 255);

        let y = set.inputs.iter().find(|f| f.usage == 0x0001_0031).unwrap();
        assert_eq!(y.bit_offset, 8);

        for (i, ofs) in (1..=8u16).zip(16..24u32) {
            let b = set
                .inputs
                .iter()
                .find(|f| f.usage == pack(0x09, i))
                .unwrap();
            assert_eq!(b.bit_offset, ofs);
            assert_eq!(b.bit_width, 1);
        }
    }

    #[test]
    fn test_fields_sorted_by_usage_and_offset() {
        let table = DescriptorTable::parse(GAMEPAD_DESC, ParseOptions::default());
        let set = table.sole_report_set().unwrap();
        let keys: std::vec::Vec<_> = set
            .inputs
            .iter()
            .map(|f| (f.usage, f.bit_offset))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_report_id_selects_set_and_resets_offset() {
        let desc = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x04, // Usage (Joystick)
            0xA1, 0x01, // Collection
            0x85, 0x01, //   Report ID (1)
            0x09, 0x30, //   Usage (X)
            0x15, 0x00, 0x26, 0xFF, 0x00, // Logical 0..255
            0x75, 0x08, 0x95, 0x01, // 8 bits x 1
            0x81, 0x02, //   Input
            0x85, 0x02, //   Report ID (2)
            0x09, 0x31, //   Usage (Y)
            0x75, 0x08, 0x95, 0x01, // 8 bits x 1
            0x81, 0x02, //   Input
            0xC0,
        ];
        let table = DescriptorTable::parse(&desc, ParseOptions::default());
        assert!(table.sole_report_set().is_none());

        let s1 = table.report_set(1).unwrap();
        assert_eq!(s1.inputs.len(), 1);
        assert_eq!(s1.inputs[0].usage, 0x0001_0030);
        assert_eq!(s1.inputs[0].bit_offset, 0);

        // Bit offset restarted for the second report ID.
        let s2 = table.report_set(2).unwrap();
        assert_eq!(s2.inputs[0].usage, 0x0001_0031);
        assert_eq!(s2.inputs[0].bit_offset, 0);
    }

    #[test]
    fn test_unknown_usages_filtered() {
        let desc = [
            0x06, 0x00, 0xFF, // Usage Page (Vendor 0xFF00)
            0x09, 0x01, // Usage (1)
            0xA1, 0x01, // Collection
            0x09, 0x20, //   Usage (0x20)
            0x75, 0x08, 0x95, 0x01, // 8 bits x 1
            0x81, 0x02, //   Input
            0xC0,
        ];
        let table = DescriptorTable::parse(&desc, ParseOptions::default());
        assert!(
            table.report_set(0).map_or(true, |s| s.inputs.is_empty()),
            "vendor usages must be filtered by default"
        );

        let table = DescriptorTable::parse(
            &desc,
            ParseOptions {
                enable_unknowns: true,
                ..ParseOptions::default()
            },
        );
        assert_eq!(table.report_set(0).unwrap().inputs.len(), 1);
    }

    #[test]
    fn test_push_pop_state() {
        let desc = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x04, // Usage (Joystick)
            0xA1, 0x01, // Collection
            0x15, 0x00, 0x26, 0xFF, 0x00, // Logical 0..255
            0x75, 0x08, 0x95, 0x01, // 8 bits x 1
            0xA4, //   Push
            0x26, 0x0F, 0x00, //   Logical Maximum (15)
            0x09, 0x30, //   Usage (X)
            0x81, 0x02, //   Input
            0xB4, //   Pop
            0x09, 0x31, //   Usage (Y)
            0x81, 0x02, //   Input
            0xC0,
        ];
        let table = DescriptorTable::parse(&desc, ParseOptions::default());
        let set = table.report_set(0).unwrap();
        let x = set.inputs.iter().find(|f| f.usage == 0x0001_0030).unwrap();
        let y = set.inputs.iter().find(|f| f.usage == 0x0001_0031).unwrap();
        assert_eq!(x.logical_max, 15);
        assert_eq!(y.logical_max, 255, "pop must restore the outer maximum");
    }

    #[test]
    fn test_buffered_bytes_alignment() {
        let desc = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x04, // Usage (Joystick)
            0xA1, 0x01, // Collection
            0x05, 0x09, //   Usage Page (Button)
            0x19, 0x01, 0x29, 0x03, //   Usage 1..3
            0x75, 0x01, 0x95, 0x03, //   1 bit x 3
            0x81, 0x02, //   Input
            0x05, 0x01, //   Usage Page (Generic Desktop)
            0x09, 0x30, //   Usage (X)
            0x75, 0x08, 0x95, 0x01, //   8 bits x 1
            0x82, 0x02, 0x01, //   Input (Var, Buffered Bytes)
            0xC0,
        ];
        let table = DescriptorTable::parse(&desc, ParseOptions::default());
        let set = table.report_set(0).unwrap();
        let x = set.inputs.iter().find(|f| f.usage == 0x0001_0030).unwrap();
        // 3 button bits used, buffered field aligns up to bit 8.
        assert_eq!(x.bit_offset, 8);
    }

    #[test]
    fn test_duplicate_usage_keeps_last() {
        let desc = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x04, // Usage (Joystick)
            0xA1, 0x01, // Collection
            0x15, 0x00, 0x26, 0xFF, 0x00, // Logical 0..255
            0x75, 0x08, 0x95, 0x01, // 8 bits x 1
            0x09, 0x30, // Usage (X)
            0x81, 0x02, // Input  (X at offset 0)
            0x09, 0x30, // Usage (X) again
            0x81, 0x02, // Input  (X at offset 8)
            0xC0,
        ];
        let table = DescriptorTable::parse(&desc, ParseOptions::default());
        let set = table.report_set(0).unwrap();
        let xs: std::vec::Vec<_> = set
            .inputs
            .iter()
            .filter(|f| f.usage == 0x0001_0030)
            .collect();
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].bit_offset, 8);
    }

    #[test]
    fn test_truncated_descriptor_keeps_partial_result() {
        // Valid X field, then a truncated item.
        let desc = [
            0x05, 0x01, 0x09, 0x04, 0xA1, 0x01, // preamble
            0x15, 0x00, 0x26, 0xFF, 0x00, // Logical 0..255
            0x75, 0x08, 0x95, 0x01, // 8 bits x 1
            0x09, 0x30, 0x81, 0x02, // X input
            0x26, 0xFF, // truncated logical maximum
        ];
        let table = DescriptorTable::parse(&desc, ParseOptions::default());
        let set = table.report_set(0).unwrap();
        assert_eq!(set.inputs.len(), 1);
    }

    #[test]
    fn test_collection_underflow_tolerated() {
        let desc = [0xC0, 0xC0, 0x05, 0x01];
        // Must not panic.
        let _ = DescriptorTable::parse(&desc, ParseOptions::default());
    }
}
