//! Flash option control
//!
//! The option bytes are changed through `FLASH_OPTCR`, which is write
//! protected by `OPTLOCK` after reset. The sequence is:
//!
//! 1. [`unlock`](OptionControl::unlock) with the two option keys
//! 2. wait for any flash operation in progress
//! 3. write the new option value
//! 4. [`launch`](OptionControl::launch) the option byte programming
//! 5. [`lock`](OptionControl::lock)

use crate::{
    access::RegisterAccess,
    clock::{MonotonicClock, Timeout},
    regs::{
        FLASH_OPTCR, FLASH_OPTKEYR, FLASH_SR, OPT_KEY1, OPT_KEY2, OPTCR_BYTE0,
        OPTCR_OPTLOCK, OPTCR_OPTSTRT, SR_ERROR_MASK, flags,
    },
};
use core::fmt::Display;

/// Error flags latched in the flash status register.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorFlags(u32);

impl ErrorFlags {
    /// No error flags.
    pub const NONE: ErrorFlags = ErrorFlags(0);

    /// Extract the error flags from a raw status register value.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f4xx_rdp::ErrorFlags;
    ///
    /// // busy and write protection error
    /// let errors = ErrorFlags::from_sr(0x0001_0010);
    /// assert_eq!(errors.bits(), 0x10);
    /// assert!(errors.write_protection());
    /// ```
    pub const fn from_sr(sr: u32) -> ErrorFlags {
        ErrorFlags(sr & SR_ERROR_MASK)
    }

    /// Raw error mask.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if no error flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Operation error (`OPERR`).
    pub const fn operation(self) -> bool {
        self.0 & flags::OPERR != 0
    }

    /// Write protection error (`WRPERR`).
    ///
    /// The target belongs to a write protected part of the flash memory.
    pub const fn write_protection(self) -> bool {
        self.0 & flags::WRPERR != 0
    }

    /// Programming alignment error (`PGAERR`).
    pub const fn alignment(self) -> bool {
        self.0 & flags::PGAERR != 0
    }

    /// Programming parallelism error (`PGPERR`).
    ///
    /// The access size does not match the configured parallelism.
    pub const fn parallelism(self) -> bool {
        self.0 & flags::PGPERR != 0
    }

    /// Programming sequence error (`PGSERR`).
    pub const fn sequence(self) -> bool {
        self.0 & flags::PGSERR != 0
    }

    /// Read protection error (`RDERR`).
    pub const fn read_protection(self) -> bool {
        self.0 & flags::RDERR != 0
    }
}

impl Display for ErrorFlags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        const NAMES: [(u32, &str); 6] = [
            (flags::OPERR, "OPERR"),
            (flags::WRPERR, "WRPERR"),
            (flags::PGAERR, "PGAERR"),
            (flags::PGPERR, "PGPERR"),
            (flags::PGSERR, "PGSERR"),
            (flags::RDERR, "RDERR"),
        ];

        if self.is_empty() {
            return f.write_str("none");
        }

        let mut first: bool = true;
        for (_, name) in NAMES.iter().filter(|(bit, _)| self.0 & bit != 0) {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

/// Flash option control errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The requested protection level is not 0, 1, or 2.
    ///
    /// No register was accessed.
    InvalidLevel(u8),
    /// The option control register was already unlocked.
    ///
    /// Writing the keys to an unlocked register is not allowed, nothing was
    /// written.
    UnlockFailed,
    /// The flash interface stayed busy for longer than the timeout.
    TimedOut,
    /// The flash interface completed the operation with error flags set.
    ///
    /// The flags stay latched until cleared with
    /// [`clear_errors`](OptionControl::clear_errors).
    Hardware(ErrorFlags),
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidLevel(level) => {
                write!(f, "read protection level should be 0, 1 or 2, not {level}")
            }
            Error::UnlockFailed => f.write_str("option control register already unlocked"),
            Error::TimedOut => f.write_str("timeout waiting for the flash interface"),
            Error::Hardware(errors) => write!(f, "flash error flags: {errors}"),
        }
    }
}

/// Flash option control driver.
///
/// Owns the register access and the clock used for timeouts. Nothing is
/// cached, every operation reads the hardware state it depends on.
#[derive(Debug)]
pub struct OptionControl<R, C> {
    regs: R,
    clock: C,
}

impl<R: RegisterAccess, C: MonotonicClock> OptionControl<R, C> {
    /// Create a new option control driver.
    ///
    /// This does not access the hardware.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use stm32f4xx_rdp::{cortex_m, flash::OptionControl, pac, DwtClock, Mmio};
    ///
    /// let mut cp = cortex_m::Peripherals::take().unwrap();
    /// let dp = pac::Peripherals::take().unwrap();
    ///
    /// let clock = DwtClock::new(&mut cp.DCB, &mut cp.DWT, 16_000_000);
    /// let mut ctrl = OptionControl::new(Mmio::new(dp.FLASH), clock);
    /// ```
    pub const fn new(regs: R, clock: C) -> Self {
        Self { regs, clock }
    }

    /// Free the register access and the clock from the driver.
    pub fn free(self) -> (R, C) {
        (self.regs, self.clock)
    }

    pub(crate) fn regs(&mut self) -> &mut R {
        &mut self.regs
    }

    fn sr(&mut self) -> u32 {
        self.regs.read32(FLASH_SR)
    }

    /// Returns `true` if a flash operation is in progress.
    pub fn is_busy(&mut self) -> bool {
        self.sr() & flags::BSY != 0
    }

    /// Error flags currently latched in the status register.
    pub fn error_flags(&mut self) -> ErrorFlags {
        ErrorFlags::from_sr(self.sr())
    }

    /// Clear the latched error flags.
    ///
    /// The status register error flags are cleared by writing `1`, only the
    /// flags currently set are written.
    pub fn clear_errors(&mut self) {
        let errors: ErrorFlags = self.error_flags();
        if !errors.is_empty() {
            debug!("clearing flash errors {=u32:#x}", errors.bits());
            self.regs.write32(FLASH_SR, errors.bits());
        }
    }

    /// Wait for the last flash operation to complete.
    ///
    /// Polls the busy flag until it clears, then checks the error flags
    /// latched in the same status register read.
    ///
    /// A timeout of [`Timeout::Millis(0)`](Timeout::Millis) fails on the first
    /// busy read without polling again.
    ///
    /// This never writes to the hardware.
    ///
    /// # Errors
    ///
    /// - [`Error::TimedOut`] if the busy flag is still set after `timeout`
    /// - [`Error::Hardware`] if any error flag is set once the flash is idle
    pub fn wait_for_completion(&mut self, timeout: Timeout) -> Result<(), Error> {
        let start: u32 = match timeout {
            Timeout::Millis(_) => self.clock.now_ms(),
            Timeout::Infinite => 0,
        };

        loop {
            let sr: u32 = self.sr();

            if sr & flags::BSY == 0 {
                let errors: ErrorFlags = ErrorFlags::from_sr(sr);
                return if errors.is_empty() {
                    Ok(())
                } else {
                    warn!("flash error flags {=u32:#x}", errors.bits());
                    Err(Error::Hardware(errors))
                };
            }

            match timeout {
                Timeout::Infinite => (),
                Timeout::Millis(0) => return Err(Error::TimedOut),
                Timeout::Millis(ms) => {
                    let elapsed: u32 = self.clock.now_ms().wrapping_sub(start);
                    if elapsed > ms {
                        warn!("flash busy for more than {=u32} ms", ms);
                        return Err(Error::TimedOut);
                    }
                }
            }
        }
    }

    /// Returns `true` if `FLASH_OPTCR` is write protected.
    pub fn is_locked(&mut self) -> bool {
        self.regs.read32(FLASH_OPTCR) & OPTCR_OPTLOCK != 0
    }

    /// Unlock the option control register.
    ///
    /// Writes the two option keys to `FLASH_OPTKEYR`, in order.
    ///
    /// # Errors
    ///
    /// [`Error::UnlockFailed`] if the register is already unlocked, the keys
    /// are not written in that case.
    pub fn unlock(&mut self) -> Result<(), Error> {
        if !self.is_locked() {
            warn!("option control register already unlocked");
            return Err(Error::UnlockFailed);
        }

        self.regs.write32(FLASH_OPTKEYR, OPT_KEY1);
        self.regs.write32(FLASH_OPTKEYR, OPT_KEY2);
        trace!("option control register unlocked");
        Ok(())
    }

    /// Lock the option control register.
    ///
    /// Setting `OPTLOCK` when it is already set has no effect.
    pub fn lock(&mut self) {
        let optcr: u32 = self.regs.read32(FLASH_OPTCR);
        self.regs.write32(FLASH_OPTCR, optcr | OPTCR_OPTLOCK);
        trace!("option control register locked");
    }

    /// Launch option byte programming and wait for it to complete.
    ///
    /// Sets `OPTSTRT`, the flash interface then writes the option values
    /// from `FLASH_OPTCR` into the option bytes.
    ///
    /// # Errors
    ///
    /// Same as [`wait_for_completion`](Self::wait_for_completion).
    pub fn launch(&mut self, timeout: Timeout) -> Result<(), Error> {
        let byte0: u8 = self.regs.read8(OPTCR_BYTE0);
        self.regs.write8(OPTCR_BYTE0, byte0 | OPTCR_OPTSTRT as u8);
        trace!("option byte programming started");
        self.wait_for_completion(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorFlags, OptionControl};
    use crate::{
        clock::Timeout,
        regs::{FLASH_OPTKEYR, FLASH_SR, OPT_KEY1, OPT_KEY2, OPTCR_BYTE0, flags},
        sim::{SimFlash, StepClock, Write},
    };

    fn ctrl(sim: SimFlash, step: u32) -> OptionControl<SimFlash, StepClock> {
        OptionControl::new(sim, StepClock::new(step))
    }

    #[test]
    fn idle_completes_in_one_read() {
        let mut ctrl = ctrl(SimFlash::new(), 1);
        assert_eq!(ctrl.wait_for_completion(Timeout::Millis(10)), Ok(()));
        let (sim, _) = ctrl.free();
        assert_eq!(sim.sr_reads, 1);
        assert!(sim.writes.is_empty());
    }

    #[test]
    fn busy_clears_within_budget() {
        // k = 5 busy polls at 2 ms each
        for budget in [10, 11, 100] {
            let mut sim = SimFlash::new();
            sim.busy_polls = 5;
            let mut ctrl = ctrl(sim, 2);
            assert_eq!(ctrl.wait_for_completion(Timeout::Millis(budget)), Ok(()));
        }
    }

    #[test]
    fn busy_exceeds_budget() {
        for budget in [1, 5, 9] {
            let mut sim = SimFlash::new();
            sim.busy_polls = 5;
            let mut ctrl = ctrl(sim, 2);
            assert_eq!(
                ctrl.wait_for_completion(Timeout::Millis(budget)),
                Err(Error::TimedOut)
            );
        }
    }

    #[test]
    fn zero_timeout_reads_busy_once() {
        let mut sim = SimFlash::new();
        sim.busy_polls = 1;
        let mut ctrl = ctrl(sim, 1);
        assert_eq!(
            ctrl.wait_for_completion(Timeout::Millis(0)),
            Err(Error::TimedOut)
        );
        let (sim, _) = ctrl.free();
        assert_eq!(sim.sr_reads, 1);
    }

    #[test]
    fn zero_timeout_idle() {
        let mut ctrl = ctrl(SimFlash::new(), 1);
        assert_eq!(ctrl.wait_for_completion(Timeout::Millis(0)), Ok(()));
    }

    #[test]
    fn infinite_never_reads_clock() {
        let mut sim = SimFlash::new();
        sim.busy_polls = 1_000;
        let mut ctrl = ctrl(sim, 1_000);
        assert_eq!(ctrl.wait_for_completion(Timeout::Infinite), Ok(()));
        let (sim, clock) = ctrl.free();
        assert_eq!(sim.sr_reads, 1_001);
        assert_eq!(clock.reads, 0);
    }

    #[test]
    fn clock_wraps() {
        let mut sim = SimFlash::new();
        sim.busy_polls = 3;
        let mut clock = StepClock::new(1);
        clock.now = u32::MAX - 1;
        let mut ctrl = OptionControl::new(sim, clock);
        assert_eq!(ctrl.wait_for_completion(Timeout::Millis(3)), Ok(()));
    }

    #[test]
    fn error_flags_after_idle() {
        let mut sim = SimFlash::new();
        sim.busy_polls = 2;
        sim.sr = flags::PGSERR | flags::PGPERR;
        let mut ctrl = ctrl(sim, 1);
        assert_eq!(
            ctrl.wait_for_completion(Timeout::Millis(10)),
            Err(Error::Hardware(ErrorFlags::from_sr(
                flags::PGSERR | flags::PGPERR
            )))
        );
    }

    #[test]
    fn unlock_writes_keys_in_order() {
        let mut ctrl = ctrl(SimFlash::new(), 1);
        assert!(ctrl.is_locked());
        assert_eq!(ctrl.unlock(), Ok(()));
        assert!(!ctrl.is_locked());
        let (sim, _) = ctrl.free();
        assert_eq!(
            sim.writes,
            [
                Write::Word(FLASH_OPTKEYR, OPT_KEY1),
                Write::Word(FLASH_OPTKEYR, OPT_KEY2),
            ]
        );
    }

    #[test]
    fn unlock_twice_fails_without_writes() {
        let mut ctrl = ctrl(SimFlash::new(), 1);
        assert_eq!(ctrl.unlock(), Ok(()));
        assert_eq!(ctrl.unlock(), Err(Error::UnlockFailed));
        let (sim, _) = ctrl.free();
        assert_eq!(sim.writes.len(), 2);
    }

    #[test]
    fn lock_is_idempotent() {
        let mut ctrl = ctrl(SimFlash::new(), 1);
        ctrl.unlock().unwrap();
        ctrl.lock();
        assert!(ctrl.is_locked());
        ctrl.lock();
        assert!(ctrl.is_locked());
        assert_eq!(ctrl.unlock(), Ok(()));
    }

    #[test]
    fn launch_sets_optstrt() {
        let mut sim = SimFlash::new();
        sim.launch_busy_polls = 3;
        let mut ctrl = ctrl(sim, 1);
        ctrl.unlock().unwrap();
        assert_eq!(ctrl.launch(Timeout::Millis(100)), Ok(()));
        let (sim, _) = ctrl.free();
        assert_eq!(sim.launches, 1);
        assert!(
            sim.writes
                .iter()
                .any(|w| matches!(w, Write::Byte(OPTCR_BYTE0, b) if b & 0x02 != 0))
        );
    }

    #[test]
    fn launch_times_out() {
        let mut sim = SimFlash::new();
        sim.launch_busy_polls = 50;
        let mut ctrl = ctrl(sim, 1);
        ctrl.unlock().unwrap();
        assert_eq!(ctrl.launch(Timeout::Millis(10)), Err(Error::TimedOut));
    }

    #[test]
    fn clear_errors_writes_only_set_flags() {
        let mut sim = SimFlash::new();
        sim.sr = flags::WRPERR;
        let mut ctrl = ctrl(sim, 1);
        assert!(ctrl.error_flags().write_protection());
        ctrl.clear_errors();
        assert!(ctrl.error_flags().is_empty());
        ctrl.clear_errors();
        let (sim, _) = ctrl.free();
        assert_eq!(sim.writes, [Write::Word(FLASH_SR, flags::WRPERR)]);
    }

    #[test]
    fn error_flags_display() {
        assert_eq!(ErrorFlags::NONE.to_string(), "none");
        assert_eq!(
            ErrorFlags::from_sr(flags::WRPERR | flags::RDERR | flags::BSY).to_string(),
            "WRPERR | RDERR"
        );
        assert_eq!(
            Error::Hardware(ErrorFlags::from_sr(flags::PGAERR)).to_string(),
            "flash error flags: PGAERR"
        );
    }
}
