//! HID usage constants and classification helpers.
//!
//! A usage is stored as a packed 32-bit value: `page << 16 | usage-in-page`.
//! The decoder only cares about three classes of usages: buttons (page
//! 0x09), the hat switch and the nine linear axes of the generic-desktop
//! page.

/// Usage page for buttons.
pub const PAGE_BUTTON: u16 = 0x09;

/// Generic desktop / hat switch.
pub const USAGE_HAT: u32 = 0x0001_0039;

/// First linear axis usage (Generic Desktop / X).
pub const USAGE_AXIS_FIRST: u32 = 0x0001_0030;

/// Last linear axis usage (Generic Desktop / Wheel).
pub const USAGE_AXIS_LAST: u32 = 0x0001_0038;

/// Number of canonical analog channels (X, Y, Z, RX, RY, RZ, SLIDER, DIAL, WHEEL).
pub const NUM_ANALOGS: usize = 9;

/// Pack a usage page and an in-page usage into one 32-bit value.
#[inline]
#[must_use]
pub const fn pack(page: u16, usage: u16) -> u32 {
    ((page as u32) << 16) | usage as u32
}

/// True for usages on the button page.
#[inline]
#[must_use]
pub const fn is_button(usage: u32) -> bool {
    (usage >> 16) == PAGE_BUTTON as u32
}

/// True for the hat-switch usage.
#[inline]
#[must_use]
pub const fn is_hat(usage: u32) -> bool {
    usage == USAGE_HAT
}

/// Canonical analog index for a linear-axis usage, if it is one.
#[inline]
#[must_use]
pub const fn analog_index(usage: u32) -> Option<usize> {
    if usage >= USAGE_AXIS_FIRST && usage <= USAGE_AXIS_LAST {
        Some((usage - USAGE_AXIS_FIRST) as usize)
    } else {
        None
    }
}

/// Default filter: keep only usages the translation core understands.
///
/// Vendor-specific and exotic usages would otherwise pollute the field
/// table; a caller that wants them anyway can parse with
/// `enable_unknowns`.
#[inline]
#[must_use]
pub const fn is_interesting(usage: u32) -> bool {
    is_button(usage) || is_hat(usage) || analog_index(usage).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack() {
        assert_eq!(pack(0x0001, 0x0039), USAGE_HAT);
        assert_eq!(pack(0x09, 0x0001), 0x0009_0001);
    }

    #[test]
    fn test_classification() {
        assert!(is_button(pack(PAGE_BUTTON, 1)));
        assert!(!is_button(USAGE_HAT));
        assert!(is_hat(USAGE_HAT));
        assert_eq!(analog_index(USAGE_AXIS_FIRST), Some(0));
        assert_eq!(analog_index(USAGE_AXIS_LAST), Some(8));
        assert_eq!(analog_index(USAGE_HAT), None);
    }

    #[test]
    fn test_interesting_filter() {
        assert!(is_interesting(pack(PAGE_BUTTON, 12)));
        assert!(is_interesting(USAGE_HAT));
        assert!(is_interesting(pack(0x0001, 0x0030)));
        // Vendor page
        assert!(!is_interesting(pack(0xFF00, 0x0001)));
        // Generic desktop, but not an axis or hat
        assert!(!is_interesting(pack(0x0001, 0x0004)));
    }
}
