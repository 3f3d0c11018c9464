//! Flash read protection (RDP)
//!
//! # Example
//!
//! Read the current level and set level 1:
//!
//! ```ignore
//! use stm32f4xx_rdp::{cortex_m, pac, DwtClock, Mmio, RdpLevel, ReadProtection, Timeout};
//!
//! let mut cp = cortex_m::Peripherals::take().unwrap();
//! let dp = pac::Peripherals::take().unwrap();
//!
//! let clock = DwtClock::new(&mut cp.DCB, &mut cp.DWT, 16_000_000);
//! let mut rdp = ReadProtection::new(Mmio::new(dp.FLASH), clock);
//!
//! if rdp.get_level() == RdpLevel::L0 {
//!     cortex_m::interrupt::free(|_| rdp.set_level(RdpLevel::L1, Timeout::DEFAULT))?;
//! }
//! ```

use crate::{
    access::RegisterAccess,
    clock::{MonotonicClock, Timeout},
    flash::{Error, OptionControl},
    level::RdpLevel,
    regs::OPTCR_BYTE1,
};

fn read_level<R: RegisterAccess>(regs: &mut R) -> RdpLevel {
    RdpLevel::from_sentinel(regs.read8(OPTCR_BYTE1))
}

/// Read protection driver.
///
/// The caller must ensure exclusive access to the flash interface for the
/// duration of every call, no other code, interrupt handler, or DMA may use
/// the flash control, status, or key registers meanwhile. This driver does no
/// locking of its own.
#[derive(Debug)]
pub struct ReadProtection<R, C> {
    ctrl: OptionControl<R, C>,
}

impl<R: RegisterAccess, C: MonotonicClock> ReadProtection<R, C> {
    /// Create a new read protection driver.
    ///
    /// This does not access the hardware.
    pub const fn new(regs: R, clock: C) -> Self {
        Self {
            ctrl: OptionControl::new(regs, clock),
        }
    }

    /// Free the register access and the clock from the driver.
    pub fn free(self) -> (R, C) {
        self.ctrl.free()
    }

    /// Option control driver, for the individual steps of the option
    /// programming sequence.
    pub fn option_control(&mut self) -> &mut OptionControl<R, C> {
        &mut self.ctrl
    }

    /// Current read protection level.
    ///
    /// A single byte read of the RDP option, sentinels other than the three
    /// known values are reported as [`RdpLevel::L0`].
    pub fn get_level(&mut self) -> RdpLevel {
        read_level(self.ctrl.regs())
    }

    /// Set the read protection level.
    ///
    /// Runs the whole option programming sequence once:
    ///
    /// 1. unlock the option control register
    /// 2. wait for the last flash operation, with `timeout`
    /// 3. write the level sentinel
    /// 4. launch option programming, waiting with `timeout` again
    /// 5. lock the option control register
    ///
    /// Each wait gets the full `timeout`. The first failure aborts the
    /// sequence:
    ///
    /// - an unlock failure leaves the hardware untouched
    /// - a failure in step 2 or 4 leaves the option control register
    ///   **unlocked**, a retry must [`lock`](OptionControl::lock) first,
    ///   otherwise it fails with [`Error::UnlockFailed`]
    ///
    /// # Level 2
    ///
    /// Committing [`RdpLevel::L2`] is permanent, there is no path back to
    /// level 1 or 0. This function does not ask for confirmation, callers
    /// should.
    ///
    /// # Errors
    ///
    /// - [`Error::UnlockFailed`] if the option control register was unlocked
    /// - [`Error::TimedOut`] if a wait exceeded `timeout`
    /// - [`Error::Hardware`] if the flash interface latched error flags
    pub fn set_level(&mut self, level: RdpLevel, timeout: Timeout) -> Result<(), Error> {
        let sentinel: u8 = level.sentinel();

        if level.is_irreversible() {
            warn!("committing RDP level 2, this is permanent");
        }

        self.ctrl.unlock()?;
        self.ctrl.wait_for_completion(timeout)?;

        debug!("writing RDP option {=u8:#x}", sentinel);
        self.ctrl.regs().write8(OPTCR_BYTE1, sentinel);

        // on failure the control register stays unlocked
        self.ctrl.launch(timeout)?;
        self.ctrl.lock();

        Ok(())
    }

    /// Set the read protection level from its number.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLevel`] if `level` is not 0, 1, or 2, without any
    /// register access. Otherwise the same as [`set_level`](Self::set_level).
    pub fn set_index(&mut self, level: u8, timeout: Timeout) -> Result<(), Error> {
        let level: RdpLevel = RdpLevel::try_from(level)?;
        self.set_level(level, timeout)
    }
}

/// Read the current read protection level, 0, 1, or 2.
pub fn get_protection_level<R: RegisterAccess>(mut regs: R) -> u8 {
    read_level(&mut regs).to_index()
}

/// Set the read protection level, 0, 1, or 2.
///
/// See [`ReadProtection::set_level`] for the sequence and its failure modes.
///
/// # Example
///
/// ```ignore
/// use stm32f4xx_rdp::{set_protection_level, FnClock, Mmio, Timeout};
///
/// let mut mmio = unsafe { Mmio::steal() };
/// let clock = FnClock::new(|| millis());
///
/// set_protection_level(&mut mmio, clock, 1, Timeout::DEFAULT)?;
/// ```
pub fn set_protection_level<R: RegisterAccess, C: MonotonicClock>(
    regs: R,
    clock: C,
    level: u8,
    timeout: Timeout,
) -> Result<(), Error> {
    ReadProtection::new(regs, clock).set_index(level, timeout)
}
