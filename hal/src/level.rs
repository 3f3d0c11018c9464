//! Read protection levels

use crate::{
    flash::Error,
    regs::{RDP_LEVEL_0, RDP_LEVEL_1, RDP_LEVEL_2},
};
use core::fmt::Display;

/// Flash read protection (RDP) level.
///
/// Externally a level is the integer 0, 1, or 2, in the option byte it is one
/// of three sentinel bytes.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RdpLevel {
    /// Level 0, no protection.
    L0,
    /// Level 1, read protection of the memory.
    ///
    /// Going back to level 0 triggers a mass erase of the flash memory.
    L1,
    /// Level 2, full chip protection.
    ///
    /// # WARNING
    ///
    /// - This can't be undone, there is no way back to level 1 or 0
    /// - The debug ports are disabled forever
    /// - The option bytes are frozen, including this one
    /// - Boot from RAM and from the system memory bootloader is disabled
    L2,
}

impl RdpLevel {
    /// Decode the option byte sentinel.
    ///
    /// Unknown values decode to [`RdpLevel::L0`], the hardware treats any
    /// value other than the level 0 and level 2 sentinels as level 1, but the
    /// reported level is never "unknown".
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f4xx_rdp::RdpLevel;
    ///
    /// assert_eq!(RdpLevel::from_sentinel(0x55), RdpLevel::L1);
    /// assert_eq!(RdpLevel::from_sentinel(0xCC), RdpLevel::L2);
    /// assert_eq!(RdpLevel::from_sentinel(0x12), RdpLevel::L0);
    /// ```
    pub const fn from_sentinel(byte: u8) -> RdpLevel {
        match byte {
            RDP_LEVEL_1 => RdpLevel::L1,
            RDP_LEVEL_2 => RdpLevel::L2,
            _ => RdpLevel::L0,
        }
    }

    /// Option byte sentinel for this level.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f4xx_rdp::RdpLevel;
    ///
    /// assert_eq!(RdpLevel::L0.sentinel(), 0xAA);
    /// assert_eq!(RdpLevel::L1.sentinel(), 0x55);
    /// assert_eq!(RdpLevel::L2.sentinel(), 0xCC);
    /// ```
    pub const fn sentinel(self) -> u8 {
        match self {
            RdpLevel::L0 => RDP_LEVEL_0,
            RdpLevel::L1 => RDP_LEVEL_1,
            RdpLevel::L2 => RDP_LEVEL_2,
        }
    }

    /// Create a level from its number.
    ///
    /// Returns `None` if `idx` is greater than 2.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f4xx_rdp::RdpLevel;
    ///
    /// assert_eq!(RdpLevel::from_index(1), Some(RdpLevel::L1));
    /// assert_eq!(RdpLevel::from_index(3), None);
    /// ```
    pub const fn from_index(idx: u8) -> Option<RdpLevel> {
        match idx {
            0 => Some(RdpLevel::L0),
            1 => Some(RdpLevel::L1),
            2 => Some(RdpLevel::L2),
            _ => None,
        }
    }

    /// Level number, 0, 1, or 2.
    pub const fn to_index(self) -> u8 {
        match self {
            RdpLevel::L0 => 0,
            RdpLevel::L1 => 1,
            RdpLevel::L2 => 2,
        }
    }

    /// Returns `true` for levels that can never be left once committed.
    pub const fn is_irreversible(self) -> bool {
        matches!(self, RdpLevel::L2)
    }
}

impl TryFrom<u8> for RdpLevel {
    type Error = Error;

    fn try_from(idx: u8) -> Result<Self, Self::Error> {
        RdpLevel::from_index(idx).ok_or(Error::InvalidLevel(idx))
    }
}

impl From<RdpLevel> for u8 {
    fn from(level: RdpLevel) -> Self {
        level.to_index()
    }
}

impl Display for RdpLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "level {}", self.to_index())
    }
}
