//! Flash interface register map
//!
//! Addresses and bit definitions for the STM32F4 flash interface, as found in
//! RM0090 section 3.9. Only the registers involved in option byte control are
//! listed.

/// Flash interface base address.
pub const FLASH_BASE: usize = 0x4002_3C00;

/// Flash option key register.
pub const FLASH_OPTKEYR: usize = FLASH_BASE + 0x08;
/// Flash status register.
pub const FLASH_SR: usize = FLASH_BASE + 0x0C;
/// Flash option control register.
pub const FLASH_OPTCR: usize = FLASH_BASE + 0x14;

/// Option control register byte 0 (bits 7:0), holds `OPTLOCK`, `OPTSTRT` and
/// the BOR level.
pub const OPTCR_BYTE0: usize = FLASH_OPTCR;
/// Option control register byte 1 (bits 15:8), holds the RDP sentinel.
pub const OPTCR_BYTE1: usize = FLASH_OPTCR + 1;

/// Option lock bit in `FLASH_OPTCR`.
pub const OPTCR_OPTLOCK: u32 = 1 << 0;
/// Option start bit in `FLASH_OPTCR`.
pub const OPTCR_OPTSTRT: u32 = 1 << 1;

/// Status register (SR) flags.
pub mod flags {
    /// Operation error.
    pub const OPERR: u32 = 1 << 1;
    /// Write protection error.
    pub const WRPERR: u32 = 1 << 4;
    /// Programming alignment error.
    pub const PGAERR: u32 = 1 << 5;
    /// Programming parallelism error.
    pub const PGPERR: u32 = 1 << 6;
    /// Programming sequence error.
    pub const PGSERR: u32 = 1 << 7;
    /// Read protection error (PCROP).
    pub const RDERR: u32 = 1 << 8;
    /// Busy.
    pub const BSY: u32 = 1 << 16;
}

/// Every error flag in `FLASH_SR`.
pub const SR_ERROR_MASK: u32 = flags::OPERR
    | flags::WRPERR
    | flags::PGAERR
    | flags::PGPERR
    | flags::PGSERR
    | flags::RDERR;

/// First option key, written to `FLASH_OPTKEYR`.
pub const OPT_KEY1: u32 = 0x0819_2A3B;
/// Second option key, written to `FLASH_OPTKEYR` after [`OPT_KEY1`].
pub const OPT_KEY2: u32 = 0x4C5D_6E7F;

/// RDP sentinel for level 0, no protection.
pub const RDP_LEVEL_0: u8 = 0xAA;
/// RDP sentinel for level 1, read protection of the memory.
pub const RDP_LEVEL_1: u8 = 0x55;
/// RDP sentinel for level 2, full chip protection.
pub const RDP_LEVEL_2: u8 = 0xCC;
