//! The device-mount interface between the USB host stack and the router.

use hid_proto::{decode, DescriptorTable, ParseOptions};

use crate::input::PadInput;

/// One mounted HID device: identity plus its parsed descriptor table.
///
/// Rebuilt from scratch on every mount; reports arriving for an unknown
/// report ID decode to `None` and are dropped by the caller.
pub struct HidDevice {
    vid: u16,
    pid: u16,
    table: DescriptorTable,
}

impl HidDevice {
    /// Parse the report descriptor delivered at mount time.
    #[must_use]
    pub fn on_descriptor(vid: u16, pid: u16, descriptor: &[u8]) -> Self {
        let table = DescriptorTable::parse(descriptor, ParseOptions::default());
        if table.is_empty() {
            warn!("no usable fields in descriptor of {:04x}:{:04x}", vid, pid);
        }
        Self { vid, pid, table }
    }

    #[must_use]
    pub fn vid(&self) -> u16 {
        self.vid
    }

    #[must_use]
    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// Usage of the device's outermost collection (joystick, gamepad, ...).
    #[must_use]
    pub fn usage(&self) -> u32 {
        self.table.usage_lv0
    }

    /// Decode one interrupt-in report into a raw snapshot for the router.
    #[must_use]
    pub fn on_report(&self, report: &[u8]) -> Option<PadInput> {
        let decoded = decode(&self.table, report)?;
        Some(PadInput::from_report(self.vid, self.pid, &decoded))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::buttons::PadButton;
    use crate::manager::PadManager;

    /// Plain 2-axis/8-button gamepad.
    const GAMEPAD_DESC: &[u8] = &[
        0x05, 0x01, 0x09, 0x05, 0xA1, 0x01, // Gamepad collection
        0x09, 0x30, 0x09, 0x31, // X, Y
        0x15, 0x00, 0x26, 0xFF, 0x00, // Logical 0..255
        0x75, 0x08, 0x95, 0x02, 0x81, 0x02, // 8 bits x 2
        0x05, 0x09, 0x19, 0x01, 0x29, 0x08, // Buttons 1..8
        0x15, 0x00, 0x25, 0x01, 0x75, 0x01, 0x95, 0x08, 0x81, 0x02,
        0xC0,
    ];

    #[test]
    fn test_mount_and_decode() {
        let dev = HidDevice::on_descriptor(0x045E, 0x028E, GAMEPAD_DESC);
        assert_eq!(dev.usage(), 0x0001_0005);

        let input = dev.on_report(&[0x00, 0xFF, 0b0000_0101]).unwrap();
        assert_eq!(input.vid, 0x045E);
        assert!(input.button(0));
        assert!(input.button(2));
        assert!(!input.button(1));
        assert_eq!(input.analogs[0], 0);
        assert_eq!(input.analogs[1], 255);
    }

    /// Descriptor bytes to output mask, end to end through the router.
    #[test]
    fn test_report_to_output_scenario() {
        let dev = HidDevice::on_descriptor(0x0A0B, 0x0C0D, GAMEPAD_DESC);
        let mut mgr = PadManager::default();

        // Stick left + button 1.
        let input = dev.on_report(&[0x00, 0x80, 0x01]).unwrap();
        mgr.set_data(0, &input);
        assert_eq!(mgr.get_buttons(0), PadButton::Left.bit() | PadButton::A.bit());

        // Stick down + buttons 3 and 8.
        let input = dev.on_report(&[0x80, 0xFF, 0b1000_0100]).unwrap();
        mgr.set_data(0, &input);
        assert_eq!(
            mgr.get_buttons(0),
            PadButton::Down.bit() | PadButton::Coin.bit() | PadButton::F.bit()
        );

        // Neutral: nothing transmitted.
        let input = dev.on_report(&[0x80, 0x80, 0x00]).unwrap();
        mgr.set_data(0, &input);
        assert_eq!(mgr.get_buttons(0), 0);
    }
}
