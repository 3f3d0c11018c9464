//! Memory-mapped register access

use core::ptr::{read_volatile, write_volatile};

/// Register access at absolute addresses.
///
/// Every call must reach the hardware immediately, at the requested width,
/// without buffering or reordering. The flash option protocol depends on the
/// order of these accesses.
pub trait RegisterAccess {
    /// Read a byte.
    fn read8(&mut self, addr: usize) -> u8;

    /// Write a byte.
    fn write8(&mut self, addr: usize, value: u8);

    /// Read a word.
    fn read32(&mut self, addr: usize) -> u32;

    /// Write a word.
    fn write32(&mut self, addr: usize, value: u32);
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    #[inline]
    fn read8(&mut self, addr: usize) -> u8 {
        (**self).read8(addr)
    }

    #[inline]
    fn write8(&mut self, addr: usize, value: u8) {
        (**self).write8(addr, value)
    }

    #[inline]
    fn read32(&mut self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    #[inline]
    fn write32(&mut self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }
}

/// Volatile access to the memory-mapped flash interface.
#[derive(Debug)]
pub struct Mmio {
    _priv: (),
}

impl Mmio {
    /// Take ownership of the flash interface.
    ///
    /// The `FLASH` peripheral singleton is consumed, no other driver can
    /// obtain it afterwards.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use stm32f4xx_rdp::{pac, Mmio};
    ///
    /// let dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mmio: Mmio = Mmio::new(dp.FLASH);
    /// ```
    #[cfg(any(
        feature = "stm32f401",
        feature = "stm32f405",
        feature = "stm32f407",
        feature = "stm32f411",
        feature = "stm32f427",
        feature = "stm32f429",
        feature = "stm32f446",
    ))]
    pub fn new(flash: crate::pac::FLASH) -> Mmio {
        let _ = flash;
        Mmio { _priv: () }
    }

    /// Steal register access from whatever is currently using it.
    ///
    /// # Safety
    ///
    /// Every access is a raw volatile read or write at the address passed in.
    /// You are responsible for passing valid, aligned register addresses, and
    /// for ensuring nothing else (another driver, an interrupt handler, DMA)
    /// touches the flash interface while this is in use.
    pub unsafe fn steal() -> Mmio {
        Mmio { _priv: () }
    }
}

impl RegisterAccess for Mmio {
    #[inline]
    fn read8(&mut self, addr: usize) -> u8 {
        unsafe { read_volatile(addr as *const u8) }
    }

    #[inline]
    fn write8(&mut self, addr: usize, value: u8) {
        unsafe { write_volatile(addr as *mut u8, value) }
    }

    #[inline]
    fn read32(&mut self, addr: usize) -> u32 {
        debug_assert_eq!(addr % 4, 0, "unaligned 32-bit read");
        unsafe { read_volatile(addr as *const u32) }
    }

    #[inline]
    fn write32(&mut self, addr: usize, value: u32) {
        debug_assert_eq!(addr % 4, 0, "unaligned 32-bit write");
        unsafe { write_volatile(addr as *mut u32, value) }
    }
}
