//! STM32 SDMMC 寄存器定义
//!
//! 只描述 IDMA、时钟、电源与中断屏蔽相关的寄存器，命令/数据通路由协议层负责。
//!
//! ```text
//! 0x000 POWER      0x004 CLKCR     0x03c MASK
//! 0x050 IDMACTRL   0x054 IDMABSIZE 0x058 IDMABASE0
//! 0x064 IDMALAR    0x068 IDMABAR
//! ```

use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use crate::Mmio;

// =============================================================================
// 寄存器位字段定义
// =============================================================================

register_bitfields![u32,
    /// Power control register
    pub POWER [
        PWRCTRL OFFSET(0) NUMBITS(2) [
            Off = 0,
            Cycle = 2,
            On = 3
        ],
        VSWITCH OFFSET(2) NUMBITS(1) [],
        VSWITCHEN OFFSET(3) NUMBITS(1) [],
        /// Data and command direction signals polarity
        DIRPOL OFFSET(4) NUMBITS(1) []
    ],

    /// Clock control register
    pub CLKCR [
        /// cclk = mclk / (2 * CLKDIV), 0 bypasses the divider
        CLKDIV OFFSET(0) NUMBITS(10) [],
        PWRSAV OFFSET(12) NUMBITS(1) [],
        WIDBUS OFFSET(14) NUMBITS(2) [
            One = 0,
            Four = 1,
            Eight = 2
        ],
        NEGEDGE OFFSET(16) NUMBITS(1) [],
        HWFC_EN OFFSET(17) NUMBITS(1) [],
        DDR OFFSET(18) NUMBITS(1) [],
        BUSSPEED OFFSET(19) NUMBITS(1) [],
        /// Receive clock selection
        SELCLKRX OFFSET(20) NUMBITS(2) [
            Ck = 0,
            CkIn = 1,
            Fbck = 2
        ]
    ],

    /// Interrupt mask register
    pub MASK [
        CCRCFAIL OFFSET(0) NUMBITS(1) [],
        DCRCFAIL OFFSET(1) NUMBITS(1) [],
        CTIMEOUT OFFSET(2) NUMBITS(1) [],
        DTIMEOUT OFFSET(3) NUMBITS(1) [],
        TXUNDERR OFFSET(4) NUMBITS(1) [],
        RXOVERR OFFSET(5) NUMBITS(1) [],
        CMDREND OFFSET(6) NUMBITS(1) [],
        CMDSENT OFFSET(7) NUMBITS(1) [],
        DATAEND OFFSET(8) NUMBITS(1) []
    ],

    /// IDMA control register
    pub IDMACTRL [
        IDMAEN OFFSET(0) NUMBITS(1) [],
        /// Linked list mode
        IDMALLIEN OFFSET(1) NUMBITS(1) []
    ],

    /// IDMA buffer size register
    pub IDMABSIZE [
        /// Number of bytes per buffer, in bursts
        IDMABNDT OFFSET(5) NUMBITS(8) []
    ],

    /// IDMA linked list address register, also the first word of a descriptor
    pub IDMALAR [
        /// Offset of the next descriptor from IDMABAR
        IDMALA OFFSET(0) NUMBITS(14) [],
        /// Auto buffer reload
        ABR OFFSET(29) NUMBITS(1) [],
        /// Update IDMABSIZE from the next descriptor
        ULS OFFSET(30) NUMBITS(1) [],
        /// Update IDMALAR from the next descriptor, cleared on the last one
        ULA OFFSET(31) NUMBITS(1) []
    ]
];

register_structs! {
    pub SdmmcRegisters {
        (0x000 => pub power: ReadWrite<u32, POWER::Register>),
        (0x004 => pub clkcr: ReadWrite<u32, CLKCR::Register>),
        (0x008 => _reserved0),
        (0x03c => pub mask: ReadWrite<u32, MASK::Register>),
        (0x040 => _reserved1),
        (0x050 => pub idmactrl: ReadWrite<u32, IDMACTRL::Register>),
        (0x054 => pub idmabsize: ReadWrite<u32, IDMABSIZE::Register>),
        (0x058 => pub idmabase0: ReadWrite<u32>),
        (0x05c => _reserved2),
        (0x064 => pub idmalar: ReadWrite<u32, IDMALAR::Register>),
        (0x068 => pub idmabar: ReadWrite<u32>),
        (0x06c => @END),
    }
}

/// SDMMC 寄存器访问器
pub struct SdmmcReg {
    base: usize,
}

impl SdmmcReg {
    /// # Safety
    ///
    /// `base` 必须指向有效的 SDMMC 寄存器区域，并在访问器生命周期内保持映射
    pub unsafe fn new(base: Mmio) -> Self {
        Self {
            base: base.as_ptr() as usize,
        }
    }

    pub fn regs(&self) -> &'static SdmmcRegisters {
        unsafe { &*(self.base as *const SdmmcRegisters) }
    }

    pub fn base(&self) -> usize {
        self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_encodings() {
        assert_eq!(POWER::PWRCTRL::Off.value, 0x0);
        assert_eq!(POWER::PWRCTRL::Cycle.value, 0x2);
        assert_eq!(POWER::PWRCTRL::On.value, 0x3);
        assert_eq!(POWER::DIRPOL::SET.value, 1 << 4);
    }

    #[test]
    fn test_clkcr_fields() {
        assert_eq!(CLKCR::WIDBUS::Four.value, 1 << 14);
        assert_eq!(CLKCR::WIDBUS::Eight.value, 1 << 15);
        assert_eq!(CLKCR::HWFC_EN::SET.value, 1 << 17);
        assert_eq!(CLKCR::DDR::SET.value, 1 << 18);
        assert_eq!(CLKCR::BUSSPEED::SET.value, 1 << 19);
        assert_eq!(CLKCR::SELCLKRX::Fbck.value, 2 << 20);
        assert_eq!(CLKCR::SELCLKRX::Fbck.mask(), 3 << 20);
    }

    #[test]
    fn test_lli_flags() {
        let flags = IDMALAR::ULA::SET + IDMALAR::ULS::SET + IDMALAR::ABR::SET;
        assert_eq!(flags.value, 0xe000_0000);
        assert_eq!(IDMABSIZE::IDMABNDT.mask << IDMABSIZE::IDMABNDT.shift, 0x1fe0);
    }
}
