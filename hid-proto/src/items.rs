//! Bounds-checked reader for HID report-descriptor items.
//!
//! A descriptor is a stream of short items (1-byte prefix + 0/1/2/4 data
//! bytes) and the rarely-seen long item (0xFE prefix, explicit length).
//! The reader never reads past the end of the slice; a truncated item ends
//! the stream instead of failing.

/// Prefix byte that introduces a long item.
const LONG_ITEM_PREFIX: u8 = 0xFE;

/// Item type field of a short item prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ItemType {
    Main,
    Global,
    Local,
    Reserved,
}

/// One decoded descriptor item.
///
/// `value` is sign-extended from the item's data size, matching how
/// signed globals (logical minimum/maximum) are declared on the wire.
/// Tags that want an unsigned interpretation mask it back down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Item {
    pub item_type: ItemType,
    pub tag: u8,
    pub value: i32,
}

// Main item tags
pub const TAG_INPUT: u8 = 8;
pub const TAG_OUTPUT: u8 = 9;
pub const TAG_COLLECTION: u8 = 10;
pub const TAG_FEATURE: u8 = 11;
pub const TAG_END_COLLECTION: u8 = 12;

// Global item tags
pub const TAG_USAGE_PAGE: u8 = 0;
pub const TAG_LOGICAL_MINIMUM: u8 = 1;
pub const TAG_LOGICAL_MAXIMUM: u8 = 2;
pub const TAG_PHYSICAL_MINIMUM: u8 = 3;
pub const TAG_PHYSICAL_MAXIMUM: u8 = 4;
pub const TAG_REPORT_SIZE: u8 = 7;
pub const TAG_REPORT_ID: u8 = 8;
pub const TAG_REPORT_COUNT: u8 = 9;
pub const TAG_PUSH: u8 = 10;
pub const TAG_POP: u8 = 11;

// Local item tags
pub const TAG_USAGE: u8 = 0;
pub const TAG_USAGE_MINIMUM: u8 = 1;
pub const TAG_USAGE_MAXIMUM: u8 = 2;

// Main item data bits
pub const MAIN_CONSTANT: i32 = 1 << 0;
pub const MAIN_VARIABLE: i32 = 1 << 1;
pub const MAIN_NULL_STATE: i32 = 1 << 6;
pub const MAIN_BUFFERED_BYTES: i32 = 1 << 8;

/// Iterator over the items of a raw descriptor.
pub struct ItemReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ItemReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }
}

impl<'a> Iterator for ItemReader<'a> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        let prefix = *self.take(1)?.first()?;

        if prefix == LONG_ITEM_PREFIX {
            // Long item: length byte, tag byte, then payload. Nothing the
            // decoder cares about lives here; skip it whole.
            let head = self.take(2)?;
            let len = head[0] as usize;
            if self.take(len).is_none() {
                warn!("long item truncated");
                return None;
            }
            return self.next();
        }

        const SIZE_TABLE: [usize; 4] = [0, 1, 2, 4];
        let size = SIZE_TABLE[(prefix & 0x3) as usize];
        let item_type = match (prefix >> 2) & 0x3 {
            0 => ItemType::Main,
            1 => ItemType::Global,
            2 => ItemType::Local,
            _ => ItemType::Reserved,
        };
        let tag = prefix >> 4;

        let Some(data) = self.take(size) else {
            warn!("item truncated");
            return None;
        };

        let value = match *data {
            [] => 0,
            [b0] => b0 as i8 as i32,
            [b0, b1] => i16::from_le_bytes([b0, b1]) as i32,
            [b0, b1, b2, b3] => i32::from_le_bytes([b0, b1, b2, b3]),
            _ => 0,
        };

        Some(Item {
            item_type,
            tag,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    #[test]
    fn test_short_items() {
        // Usage Page (Generic Desktop), Logical Maximum 255 (2 bytes)
        let data = [0x05, 0x01, 0x26, 0xFF, 0x00];
        let items: Vec<Item> = ItemReader::new(&data).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_type, ItemType::Global);
        assert_eq!(items[0].tag, TAG_USAGE_PAGE);
        assert_eq!(items[0].value, 1);
        assert_eq!(items[1].tag, TAG_LOGICAL_MAXIMUM);
        assert_eq!(items[1].value, 255);
    }

    #[test]
    fn test_sign_extension() {
        // Logical Minimum -128 (1 byte)
        let data = [0x15, 0x80];
        let items: Vec<Item> = ItemReader::new(&data).collect();
        assert_eq!(items[0].value, -128);
    }

    #[test]
    fn test_truncated_item_ends_stream() {
        // Prefix declares 2 data bytes but only 1 follows
        let data = [0x05, 0x01, 0x26, 0xFF];
        let items: Vec<Item> = ItemReader::new(&data).collect();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_long_item_skipped() {
        // Long item (len 3) followed by a short usage page item
        let data = [0xFE, 0x03, 0x42, 0xAA, 0xBB, 0xCC, 0x05, 0x09];
        let items: Vec<Item> = ItemReader::new(&data).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].tag, TAG_USAGE_PAGE);
        assert_eq!(items[0].value, 0x09);
    }

    #[test]
    fn test_empty() {
        assert_eq!(ItemReader::new(&[]).next(), None);
    }
}
