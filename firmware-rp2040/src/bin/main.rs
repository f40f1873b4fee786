#![no_std]
#![no_main]

use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::flash::Flash;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Ticker};
use pad_core::{AppConfig, PadInput, PadManager};
use usb_pad_bridge_rp2040::flash::FLASH_SIZE;
use usb_pad_bridge_rp2040::{ConfigFlash, ModeButton, PortPins};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

/// Vsync tick rate of the arcade side.
const TICK_HZ: u32 = 60;

/// Decoded reports from the USB host stack, tagged with the input slot.
/// The host task runs on core 1 (PIO-USB) and only touches this channel.
static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, (usize, PadInput), 8> = Channel::new();

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("usb-pad-bridge starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Persistence ---
    let mut config_flash = ConfigFlash::new(Flash::<_, _, FLASH_SIZE>::new_blocking(p.FLASH));
    let mut app_config = AppConfig::default();
    let mut manager = PadManager::new(TICK_HZ);
    config_flash.load(&mut app_config, manager.translator_mut());
    manager.apply_config(&app_config);

    // --- Mode button and port outputs ---
    let mode_pin = Input::new(p.PIN_22, Pull::Up);
    let mut mode_button = ModeButton::new();

    let mut port0 = PortPins::new();
    port0.push(Output::new(p.PIN_2, Level::High));
    port0.push(Output::new(p.PIN_3, Level::High));
    port0.push(Output::new(p.PIN_4, Level::High));
    port0.push(Output::new(p.PIN_5, Level::High));
    port0.push(Output::new(p.PIN_6, Level::High));
    port0.push(Output::new(p.PIN_7, Level::High));
    port0.push(Output::new(p.PIN_8, Level::High));
    port0.push(Output::new(p.PIN_9, Level::High));
    port0.push(Output::new(p.PIN_10, Level::High));
    port0.push(Output::new(p.PIN_11, Level::High));
    port0.push(Output::new(p.PIN_12, Level::High));
    port0.push(Output::new(p.PIN_13, Level::High));

    let mut port1 = PortPins::new();
    port1.push(Output::new(p.PIN_14, Level::High));
    port1.push(Output::new(p.PIN_15, Level::High));
    port1.push(Output::new(p.PIN_16, Level::High));
    port1.push(Output::new(p.PIN_17, Level::High));
    port1.push(Output::new(p.PIN_18, Level::High));
    port1.push(Output::new(p.PIN_19, Level::High));
    port1.push(Output::new(p.PIN_20, Level::High));
    port1.push(Output::new(p.PIN_21, Level::High));

    info!("usb-pad-bridge initialized, entering vsync loop");

    // --- Vsync loop ---
    let mut ticker = Ticker::every(Duration::from_hz(TICK_HZ as u64));
    loop {
        ticker.next().await;

        while let Ok((slot, input)) = INPUT_CHANNEL.try_receive() {
            manager.set_data(slot, &input);
        }

        let ev = mode_button.poll(mode_pin.is_low(), 1);
        manager.update(1, ev.held, ev.trigger, ev.long);

        port0.write(manager.get_buttons(0));
        port1.write(manager.get_buttons(1));

        if manager.take_save_request() {
            manager.collect_config(&mut app_config);
            config_flash.save(&app_config, manager.translator());
        }
    }
}
