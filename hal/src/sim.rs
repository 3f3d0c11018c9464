//! Simulated flash interface for host tests.

use crate::{
    access::RegisterAccess,
    clock::MonotonicClock,
    regs::{
        FLASH_OPTCR, FLASH_OPTKEYR, FLASH_SR, OPT_KEY1, OPT_KEY2, OPTCR_BYTE0, OPTCR_BYTE1,
        OPTCR_OPTLOCK, OPTCR_OPTSTRT, RDP_LEVEL_0, SR_ERROR_MASK, flags,
    },
};

/// A recorded register write.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Write {
    Byte(usize, u8),
    Word(usize, u32),
}

/// Register bank of the flash interface, as far as option control goes.
///
/// - `OPTLOCK` is set after reset and only cleared by the key sequence
/// - byte writes to `FLASH_OPTCR` are ignored while locked
/// - `OPTSTRT` keeps the interface busy for `launch_busy_polls` status reads,
///   then latches `launch_errors`
/// - status error flags are write-one-to-clear
#[derive(Debug)]
pub(crate) struct SimFlash {
    pub optcr: u32,
    pub sr: u32,
    /// Status reads that report busy before the next idle read.
    pub busy_polls: u32,
    pub launch_busy_polls: u32,
    pub launch_errors: u32,
    pub launches: u32,
    pub sr_reads: u32,
    pub reads: u32,
    pub writes: Vec<Write>,
    key_stage: u8,
}

impl SimFlash {
    pub fn new() -> SimFlash {
        SimFlash {
            // reset value from RM0090, RDP level 0 and OPTLOCK
            optcr: 0x0FFF_0000 | (u32::from(RDP_LEVEL_0) << 8) | 0xED,
            sr: 0,
            busy_polls: 0,
            launch_busy_polls: 0,
            launch_errors: 0,
            launches: 0,
            sr_reads: 0,
            reads: 0,
            writes: Vec::new(),
            key_stage: 0,
        }
    }

    pub fn with_rdp(byte: u8) -> SimFlash {
        let mut sim: SimFlash = SimFlash::new();
        sim.optcr = (sim.optcr & !0xFF00) | (u32::from(byte) << 8);
        sim
    }

    pub fn unlocked() -> SimFlash {
        let mut sim: SimFlash = SimFlash::new();
        sim.optcr &= !OPTCR_OPTLOCK;
        sim
    }

    pub fn rdp_byte(&self) -> u8 {
        (self.optcr >> 8) as u8
    }

    pub fn locked(&self) -> bool {
        self.optcr & OPTCR_OPTLOCK != 0
    }

    fn write_optcr_byte(&mut self, shift: u32, value: u8) {
        if self.locked() {
            return;
        }
        self.optcr = (self.optcr & !(0xFF << shift)) | (u32::from(value) << shift);
    }
}

impl RegisterAccess for SimFlash {
    fn read8(&mut self, addr: usize) -> u8 {
        self.reads += 1;
        match addr {
            OPTCR_BYTE0 => self.optcr as u8,
            OPTCR_BYTE1 => (self.optcr >> 8) as u8,
            _ => panic!("unexpected byte read at {addr:#010X}"),
        }
    }

    fn write8(&mut self, addr: usize, value: u8) {
        self.writes.push(Write::Byte(addr, value));
        match addr {
            OPTCR_BYTE0 => {
                let launch: bool = !self.locked() && u32::from(value) & OPTCR_OPTSTRT != 0;
                self.write_optcr_byte(0, value & !(OPTCR_OPTSTRT as u8));
                if launch {
                    self.launches += 1;
                    self.busy_polls = self.launch_busy_polls;
                    self.sr |= self.launch_errors;
                }
            }
            OPTCR_BYTE1 => self.write_optcr_byte(8, value),
            _ => panic!("unexpected byte write at {addr:#010X}"),
        }
    }

    fn read32(&mut self, addr: usize) -> u32 {
        self.reads += 1;
        match addr {
            FLASH_SR => {
                self.sr_reads += 1;
                if self.busy_polls > 0 {
                    self.busy_polls -= 1;
                    self.sr | flags::BSY
                } else {
                    self.sr
                }
            }
            FLASH_OPTCR => self.optcr,
            _ => panic!("unexpected word read at {addr:#010X}"),
        }
    }

    fn write32(&mut self, addr: usize, value: u32) {
        self.writes.push(Write::Word(addr, value));
        match addr {
            FLASH_OPTKEYR => {
                self.key_stage = match (self.key_stage, value) {
                    (_, OPT_KEY1) => 1,
                    (1, OPT_KEY2) => {
                        self.optcr &= !OPTCR_OPTLOCK;
                        0
                    }
                    _ => 0,
                };
            }
            FLASH_SR => self.sr &= !(value & SR_ERROR_MASK),
            FLASH_OPTCR => {
                if self.locked() {
                    self.optcr |= value & OPTCR_OPTLOCK;
                } else {
                    self.optcr = value & !OPTCR_OPTSTRT;
                }
            }
            _ => panic!("unexpected word write at {addr:#010X}"),
        }
    }
}

/// Clock that advances a fixed step on every read.
#[derive(Debug)]
pub(crate) struct StepClock {
    pub now: u32,
    pub step: u32,
    pub reads: u32,
}

impl StepClock {
    pub fn new(step: u32) -> StepClock {
        StepClock {
            now: 0,
            step,
            reads: 0,
        }
    }
}

impl MonotonicClock for StepClock {
    fn now_ms(&mut self) -> u32 {
        self.reads += 1;
        let now: u32 = self.now;
        self.now = self.now.wrapping_add(self.step);
        now
    }
}
