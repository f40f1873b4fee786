//! Input-report decoding against a parsed [`ReportSet`].

use crate::descriptor::{DescriptorTable, Field, ReportSet};
use crate::usage::NUM_ANALOGS;

/// Resting value per analog channel: sticks centered, triggers released.
pub const NEUTRAL_ANALOGS: [u8; NUM_ANALOGS] = [128, 128, 128, 0, 0, 128, 0, 0, 0];

/// Hat value meaning "no direction pressed".
pub const HAT_IDLE: i8 = -1;

/// One decoded input report in canonical form.
///
/// `buttons` holds button-page usages 1..=32 as bits 0..=31. `hat` is
/// 0..=7 clockwise from up, or [`HAT_IDLE`]. Analog channels are rescaled
/// to `0..=255` regardless of the device's logical range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodedReport {
    pub buttons: u32,
    pub hat: i8,
    pub analogs: [u8; NUM_ANALOGS],
}

impl Default for DecodedReport {
    fn default() -> Self {
        Self {
            buttons: 0,
            hat: HAT_IDLE,
            analogs: NEUTRAL_ANALOGS,
        }
    }
}

/// Extract `width` bits starting at `bit_offset`, little-endian bit order,
/// possibly crossing byte boundaries. Out-of-range reads yield `None`.
fn get_bits(data: &[u8], bit_offset: u32, width: u8) -> Option<u32> {
    if width == 0 || width > 32 {
        return None;
    }
    let first = (bit_offset / 8) as usize;
    let last = ((bit_offset + width as u32 - 1) / 8) as usize;
    if last >= data.len() {
        return None;
    }

    let mut value: u64 = 0;
    for (i, &byte) in data[first..=last].iter().enumerate() {
        value |= (byte as u64) << (8 * i);
    }
    value >>= bit_offset % 8;

    let mask = if width == 32 { u32::MAX as u64 } else { (1u64 << width) - 1 };
    Some((value & mask) as u32)
}

/// Read one field's raw value, sign-extending when the logical range says
/// the field is signed.
fn field_value(data: &[u8], field: &Field) -> Option<i32> {
    let raw = get_bits(data, field.bit_offset, field.bit_width)?;
    if field.logical_min < 0 && field.bit_width < 32 {
        let sign = 1u32 << (field.bit_width - 1);
        if raw & sign != 0 {
            return Some((raw | !(sign | (sign - 1))) as i32);
        }
    }
    Some(raw as i32)
}

/// Rescale a logical value into `0..=255`, clamping out-of-range inputs.
/// A degenerate logical range maps everything to 0.
fn rescale(value: i32, min: i32, max: i32) -> u8 {
    let range = max as i64 - min as i64;
    if range <= 0 {
        return 0;
    }
    let clamped = (value as i64).clamp(min as i64, max as i64);
    (((clamped - min as i64) * 255 + range / 2) / range) as u8
}

/// Decode one report against a field set.
#[must_use]
pub fn decode_report(set: &ReportSet, data: &[u8]) -> DecodedReport {
    let mut out = DecodedReport::default();

    for field in set.inputs.iter() {
        if field.is_constant {
            continue;
        }
        let Some(raw) = field_value(data, field) else {
            continue;
        };

        if field.is_button() {
            let number = field.usage & 0xFFFF;
            if (1..=32).contains(&number) && raw != 0 {
                out.buttons |= 1 << (number - 1);
            }
        } else if field.is_hat() {
            let pos = raw - field.logical_min;
            out.hat = if (0..8).contains(&pos) { pos as i8 } else { HAT_IDLE };
        } else if let Some(index) = field.analog_index() {
            out.analogs[index] = rescale(raw, field.logical_min, field.logical_max);
        }
    }

    out
}

/// Decode a report from a device that may or may not prefix reports with a
/// report ID. When the table holds several sets the first payload byte
/// selects one; unknown IDs decode to `None`.
#[must_use]
pub fn decode(table: &DescriptorTable, data: &[u8]) -> Option<DecodedReport> {
    if let Some(set) = table.sole_report_set() {
        return Some(decode_report(set, data));
    }
    let (&id, payload) = data.split_first()?;
    table.report_set(id).map(|set| decode_report(set, payload))
}
