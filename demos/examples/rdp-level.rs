// Prints the flash read protection level, should work for all STM32F4 boards.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f4xx_rdp::{self as hal, Mmio, RdpLevel, ReadProtection, pac};

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut cp: pac::CorePeripherals = pac::CorePeripherals::take().unwrap();
    let dp: pac::Peripherals = pac::Peripherals::take().unwrap();

    // HSI after reset
    let clock = hal::DwtClock::new(&mut cp.DCB, &mut cp.DWT, 16_000_000);
    let mut rdp = ReadProtection::new(Mmio::new(dp.FLASH), clock);

    let level: RdpLevel = rdp.get_level();
    defmt::info!("RDP: {}", level);

    let ctrl = rdp.option_control();
    defmt::info!("OPTLOCK: {}", ctrl.is_locked());
    defmt::info!("busy: {}", ctrl.is_busy());
    defmt::info!("error flags: {=u32:#x}", ctrl.error_flags().bits());

    loop {
        hal::cortex_m::asm::bkpt();
    }
}
