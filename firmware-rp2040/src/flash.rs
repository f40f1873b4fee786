//! Flash-backed storage for the serialized config stream.
//!
//! The stream lives in the last 4 KiB sector of the 2 MiB XIP flash. Saves
//! erase the sector and rewrite it whole; the serializer's margin keeps the
//! stream from ever outgrowing it.

use defmt::{info, warn};
use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use pad_core::{load_state, save_state, AppConfig, PadTranslator};

/// Total flash size of the Pico's W25Q16.
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Offset of the config sector, at the very end of flash.
pub const CONFIG_OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

/// Headroom the serializer keeps below the sector size, sized to absorb
/// one store entry that straddles the limit.
pub const SAVE_MARGIN: usize = 64;

/// The config sector plus the blocking flash driver.
pub struct ConfigFlash<'d> {
    flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>,
}

impl<'d> ConfigFlash<'d> {
    pub fn new(flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>) -> Self {
        Self { flash }
    }

    /// Read the sector and apply it. Errors (blank flash, version drift)
    /// leave the compiled-in defaults in charge.
    pub fn load(&mut self, config: &mut AppConfig, translator: &mut PadTranslator) {
        let mut buf = [0u8; ERASE_SIZE];
        if self.flash.blocking_read(CONFIG_OFFSET, &mut buf).is_err() {
            warn!("config flash read failed");
            return;
        }
        match load_state(config, translator, &buf) {
            Ok(()) => info!("config loaded, {} pad entries", translator.len()),
            Err(e) => warn!("no stored config ({:?}), using defaults", e),
        }
    }

    /// Serialize and rewrite the sector.
    pub fn save(&mut self, config: &AppConfig, translator: &PadTranslator) {
        let mut buf = [0xFFu8; ERASE_SIZE];
        let len = save_state(config, translator, &mut buf, SAVE_MARGIN);

        let end = CONFIG_OFFSET + ERASE_SIZE as u32;
        if self.flash.blocking_erase(CONFIG_OFFSET, end).is_err() {
            warn!("config flash erase failed");
            return;
        }
        // Writes must cover whole 256-byte pages.
        let write_len = (len + 255) & !255;
        if self.flash.blocking_write(CONFIG_OFFSET, &buf[..write_len]).is_err() {
            warn!("config flash write failed");
            return;
        }
        info!("config saved, {} bytes", len);
    }
}
