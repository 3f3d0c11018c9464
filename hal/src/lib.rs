//! STM32F4 flash read protection.
//!
//! Reads and sets the flash read protection (RDP) level through the option
//! control register of the flash interface.
//!
//! Register access and time are injected through the [`RegisterAccess`] and
//! [`MonotonicClock`] traits, [`Mmio`] and [`DwtClock`] are the on-target
//! implementations.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
mod fmt;

pub mod access;
pub mod clock;
pub mod flash;
pub mod level;
pub mod rdp;
pub mod regs;

#[cfg(test)]
mod sim;

pub use cortex_m;
#[cfg(feature = "rt")]
#[cfg_attr(docsrs, doc(cfg(feature = "rt")))]
pub use cortex_m_rt;

cfg_if::cfg_if! {
    if #[cfg(feature = "stm32f401")] {
        /// Peripheral access crate.
        pub use stm32f4::stm32f401 as pac;
    } else if #[cfg(feature = "stm32f405")] {
        /// Peripheral access crate.
        pub use stm32f4::stm32f405 as pac;
    } else if #[cfg(feature = "stm32f407")] {
        /// Peripheral access crate.
        pub use stm32f4::stm32f407 as pac;
    } else if #[cfg(feature = "stm32f411")] {
        /// Peripheral access crate.
        pub use stm32f4::stm32f411 as pac;
    } else if #[cfg(feature = "stm32f427")] {
        /// Peripheral access crate.
        pub use stm32f4::stm32f427 as pac;
    } else if #[cfg(feature = "stm32f429")] {
        /// Peripheral access crate.
        pub use stm32f4::stm32f429 as pac;
    } else if #[cfg(feature = "stm32f446")] {
        /// Peripheral access crate.
        pub use stm32f4::stm32f446 as pac;
    }
}

pub use access::{Mmio, RegisterAccess};
pub use clock::{DwtClock, FnClock, MonotonicClock, Timeout};
pub use flash::{Error, ErrorFlags, OptionControl};
pub use level::RdpLevel;
pub use rdp::{ReadProtection, get_protection_level, set_protection_level};
