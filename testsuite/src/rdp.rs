#![no_std]
#![no_main]

use defmt::unwrap;
use defmt_rtt as _; // global logger
use panic_probe as _;
use static_assertions as sa;
use stm32f4xx_rdp::{
    self as hal, DwtClock, Error, Mmio, RdpLevel, ReadProtection, Timeout, cortex_m,
    get_protection_level,
    pac::{self, DWT},
    set_protection_level,
};

// HSI after reset
const FREQ: u32 = 16_000_000;
const CYC_PER_MICRO: u32 = FREQ / 1000 / 1000;
sa::const_assert_eq!(FREQ % 1_000_000, 0);

// WARNING will wrap-around eventually, use this for relative timing only
defmt::timestamp!("{=u32:us}", DWT::cycle_count() / CYC_PER_MICRO);

#[cortex_m_rt::exception]
#[allow(non_snake_case)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    cortex_m::interrupt::disable();
    defmt::error!("HardFault {:#}", defmt::Debug2Format(ef));
    defmt::flush();
    loop {
        cortex_m::asm::udf()
    }
}

#[defmt_test::tests]
mod tests {
    use super::*;

    struct TestArgs {
        rdp: ReadProtection<Mmio, DwtClock>,
        level: RdpLevel,
    }

    #[init]
    fn init() -> TestArgs {
        let mut cp: pac::CorePeripherals = unwrap!(pac::CorePeripherals::take());
        let dp: pac::Peripherals = unwrap!(pac::Peripherals::take());

        let clock: DwtClock = DwtClock::new(&mut cp.DCB, &mut cp.DWT, FREQ);
        let mut rdp: ReadProtection<Mmio, DwtClock> =
            ReadProtection::new(Mmio::new(dp.FLASH), clock);

        let level: RdpLevel = rdp.get_level();
        defmt::info!("Testing at RDP {}", level);

        TestArgs { rdp, level }
    }

    #[test]
    fn get_level(ta: &mut TestArgs) {
        defmt::assert_eq!(ta.rdp.get_level(), ta.level);
        let idx: u8 = get_protection_level(unsafe { Mmio::steal() });
        defmt::assert_eq!(idx, ta.level.to_index());
    }

    #[test]
    fn idle_completes(ta: &mut TestArgs) {
        let ctrl = ta.rdp.option_control();
        defmt::assert!(!ctrl.is_busy());
        defmt::assert_eq!(ctrl.wait_for_completion(Timeout::from_millis(0)), Ok(()));
        defmt::assert_eq!(ctrl.wait_for_completion(Timeout::DEFAULT), Ok(()));
        defmt::assert_eq!(ctrl.wait_for_completion(Timeout::Infinite), Ok(()));
    }

    #[test]
    fn clock_advances() {
        use hal::MonotonicClock;

        let mut cp: pac::CorePeripherals = unsafe { pac::CorePeripherals::steal() };
        let mut clock: DwtClock = DwtClock::new(&mut cp.DCB, &mut cp.DWT, FREQ);
        let start: u32 = clock.now_ms();
        cortex_m::asm::delay(FREQ / 100);
        let elapsed: u32 = clock.now_ms().wrapping_sub(start);
        defmt::info!("elapsed: {} ms", elapsed);
        // delay is a lower bound
        defmt::assert!((10..30).contains(&elapsed));
    }

    #[test]
    fn unlock_lock(ta: &mut TestArgs) {
        let ctrl = ta.rdp.option_control();
        defmt::assert!(ctrl.is_locked());

        unwrap!(ctrl.unlock());
        defmt::assert!(!ctrl.is_locked());
        defmt::assert_eq!(ctrl.unlock(), Err(Error::UnlockFailed));
        defmt::assert!(!ctrl.is_locked());

        ctrl.lock();
        defmt::assert!(ctrl.is_locked());
        ctrl.lock();
        defmt::assert!(ctrl.is_locked());
    }

    #[test]
    fn invalid_level(ta: &mut TestArgs) {
        defmt::assert_eq!(
            ta.rdp.set_index(3, Timeout::DEFAULT),
            Err(Error::InvalidLevel(3))
        );
        defmt::assert_eq!(
            set_protection_level(
                unsafe { Mmio::steal() },
                hal::FnClock::new(|| 0),
                7,
                Timeout::DEFAULT
            ),
            Err(Error::InvalidLevel(7))
        );
        defmt::assert!(ta.rdp.option_control().is_locked());
    }

    #[test]
    fn rewrite_level_0(ta: &mut TestArgs) {
        // only rewrite the level that is already there
        if ta.level != RdpLevel::L0 {
            defmt::warn!("skipping, RDP is {}", ta.level);
            return;
        }

        let ret = cortex_m::interrupt::free(|_| ta.rdp.set_level(RdpLevel::L0, Timeout::DEFAULT));
        defmt::assert_eq!(ret, Ok(()));
        defmt::assert_eq!(ta.rdp.get_level(), RdpLevel::L0);

        let ctrl = ta.rdp.option_control();
        defmt::assert!(ctrl.is_locked());
        defmt::assert!(ctrl.error_flags().is_empty());
    }
}
