//! Monotonic millisecond clocks and timeout budgets

use cortex_m::peripheral::{DCB, DWT};

/// Monotonic millisecond clock.
///
/// The value may wrap around `u32::MAX`, elapsed time is always computed with
/// wrapping subtraction. It must not go backwards within a single call to a
/// flash operation.
pub trait MonotonicClock {
    /// Current time in milliseconds.
    fn now_ms(&mut self) -> u32;
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for &mut T {
    #[inline]
    fn now_ms(&mut self) -> u32 {
        (**self).now_ms()
    }
}

/// Adapts a tick closure into a [`MonotonicClock`].
///
/// # Example
///
/// ```
/// use core::sync::atomic::{AtomicU32, Ordering::Relaxed};
/// use stm32f4xx_rdp::{FnClock, MonotonicClock};
///
/// // incremented by a SysTick handler
/// static TICKS: AtomicU32 = AtomicU32::new(0);
///
/// let mut clock = FnClock::new(|| TICKS.load(Relaxed));
/// assert_eq!(clock.now_ms(), 0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnClock<F> {
    f: F,
}

impl<F: FnMut() -> u32> FnClock<F> {
    /// Create a new clock from a function returning milliseconds.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F: FnMut() -> u32> MonotonicClock for FnClock<F> {
    #[inline]
    fn now_ms(&mut self) -> u32 {
        (self.f)()
    }
}

/// Millisecond clock derived from the DWT cycle counter.
///
/// The cycle counter wraps every `2^32` core cycles (about 25 seconds at
/// 168 MHz), the clock must be sampled at least once per wrap to stay
/// monotonic. Busy-wait loops sample it continuously.
#[derive(Debug)]
pub struct DwtClock {
    cycles_per_ms: u32,
    last: u32,
    ms: u32,
}

impl DwtClock {
    /// Enable the cycle counter and create a new clock.
    ///
    /// `sysclk_hz` is the core clock frequency.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use stm32f4xx_rdp::{cortex_m, DwtClock};
    ///
    /// let mut cp = cortex_m::Peripherals::take().unwrap();
    /// let clock = DwtClock::new(&mut cp.DCB, &mut cp.DWT, 16_000_000);
    /// ```
    pub fn new(dcb: &mut DCB, dwt: &mut DWT, sysclk_hz: u32) -> DwtClock {
        dcb.enable_trace();
        dwt.enable_cycle_counter();
        DwtClock::with_start(sysclk_hz, DWT::cycle_count())
    }

    const fn with_start(sysclk_hz: u32, start: u32) -> DwtClock {
        let cycles_per_ms: u32 = sysclk_hz / 1000;
        DwtClock {
            cycles_per_ms: if cycles_per_ms == 0 { 1 } else { cycles_per_ms },
            last: start,
            ms: 0,
        }
    }

    fn advance(&mut self, cycles: u32) -> u32 {
        let elapsed_ms: u32 = cycles.wrapping_sub(self.last) / self.cycles_per_ms;
        self.last = self
            .last
            .wrapping_add(elapsed_ms.wrapping_mul(self.cycles_per_ms));
        self.ms = self.ms.wrapping_add(elapsed_ms);
        self.ms
    }
}

impl MonotonicClock for DwtClock {
    fn now_ms(&mut self) -> u32 {
        self.advance(DWT::cycle_count())
    }
}

/// Time budget for a busy-wait on the flash interface.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Wait until the operation completes, however long it takes.
    Infinite,
    /// Wait at most this many milliseconds.
    ///
    /// Zero fails immediately if the flash interface is busy.
    Millis(u32),
}

impl Timeout {
    /// Flash operation timeout used by the vendor HAL, 50 seconds.
    pub const DEFAULT: Timeout = Timeout::Millis(50_000);

    /// Create a timeout from milliseconds.
    ///
    /// `u32::MAX` is the vendor "maximum delay" and means [`Timeout::Infinite`].
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f4xx_rdp::Timeout;
    ///
    /// assert_eq!(Timeout::from_millis(1000), Timeout::Millis(1000));
    /// assert_eq!(Timeout::from_millis(u32::MAX), Timeout::Infinite);
    /// ```
    pub const fn from_millis(ms: u32) -> Timeout {
        if ms == u32::MAX {
            Timeout::Infinite
        } else {
            Timeout::Millis(ms)
        }
    }

    /// Returns `true` if this timeout never expires.
    pub const fn is_infinite(&self) -> bool {
        matches!(self, Timeout::Infinite)
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::DEFAULT
    }
}

impl From<u32> for Timeout {
    fn from(ms: u32) -> Self {
        Timeout::from_millis(ms)
    }
}
