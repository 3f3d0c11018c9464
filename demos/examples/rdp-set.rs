// Sets the flash read protection level.
//
// Level 1 blocks debug access to the flash, going back to level 0 mass erases
// the flash memory. Level 2 is permanent and disables the debug port.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f4xx_rdp::{self as hal, Mmio, RdpLevel, ReadProtection, Timeout, pac};

const TARGET: RdpLevel = RdpLevel::L1;

// must be set to allow TARGET = RdpLevel::L2
const CONFIRM_L2: bool = false;

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut cp: pac::CorePeripherals = pac::CorePeripherals::take().unwrap();
    let dp: pac::Peripherals = pac::Peripherals::take().unwrap();

    let clock = hal::DwtClock::new(&mut cp.DCB, &mut cp.DWT, 16_000_000);
    let mut rdp = ReadProtection::new(Mmio::new(dp.FLASH), clock);

    let current: RdpLevel = rdp.get_level();
    defmt::info!("RDP: {}", current);

    if current == TARGET {
        defmt::info!("nothing to do");
    } else if TARGET.is_irreversible() && !CONFIRM_L2 {
        defmt::error!("refusing to set level 2 without CONFIRM_L2");
    } else {
        let ret = cortex_m::interrupt::free(|_| rdp.set_level(TARGET, Timeout::DEFAULT));
        match ret {
            Ok(()) => defmt::info!("RDP set to {}, takes effect after a power cycle", TARGET),
            Err(e) => {
                defmt::error!("failed to set RDP: {}", e);
                let ctrl = rdp.option_control();
                ctrl.clear_errors();
                ctrl.lock();
            }
        }
    }

    loop {
        hal::cortex_m::asm::bkpt();
    }
}
