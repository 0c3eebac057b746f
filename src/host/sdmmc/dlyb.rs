//! Delay block (DLYB) in front of the SDMMC feedback clock.
//!
//! Tuning runs in two stages. Length tuning looks for the smallest delay
//! unit whose 12 taps span one input clock period and derives how many
//! phases fit in it. Phase tuning then walks those phases with the tuning
//! block and settles in the middle of the longest passing window.

use core::time::Duration;

use log::{debug, error, trace, warn};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use crate::{Kernel, Mmio, TuningOp, err::*, osal::poll_timeout};

register_bitfields![u32,
    DLYB_CR [
        /// Delay line enable
        DEN OFFSET(0) NUMBITS(1) [],
        /// Sampler length enable
        SEN OFFSET(1) NUMBITS(1) []
    ],
    DLYB_CFGR [
        /// Output clock phase selection
        SEL OFFSET(0) NUMBITS(4) [],
        /// Delay of one unit
        UNIT OFFSET(8) NUMBITS(7) [],
        /// Delay line length value
        LNG OFFSET(16) NUMBITS(12) [],
        /// Length valid flag
        LNGF OFFSET(31) NUMBITS(1) []
    ]
];

register_structs! {
    DlybRegisters {
        (0x0 => cr: ReadWrite<u32, DLYB_CR::Register>),
        (0x4 => cfgr: ReadWrite<u32, DLYB_CFGR::Register>),
        (0x8 => @END),
    }
}

pub const DLYB_NB_DELAY: u32 = 11;
/// Phase value selecting the full line, used while measuring.
pub const DLYB_CFGR_SEL_MAX: u8 = DLYB_NB_DELAY as u8 + 1;
pub const DLYB_CFGR_UNIT_MAX: u8 = 127;

const LNG_POLL_INTERVAL: Duration = Duration::from_micros(1);
const LNG_POLL_TIMEOUT: Duration = Duration::from_micros(1000);

pub struct DelayBlock {
    base: usize,
    unit: u8,
    max: u8,
    phase: u8,
}

impl DelayBlock {
    /// # Safety
    ///
    /// `base` must map the delay block registers for the lifetime of the
    /// returned value.
    pub unsafe fn new(base: Mmio) -> Self {
        Self {
            base: base.as_ptr() as usize,
            unit: 0,
            max: 0,
            phase: 0,
        }
    }

    fn regs(&self) -> &'static DlybRegisters {
        unsafe { &*(self.base as *const DlybRegisters) }
    }

    /// Unit found by the last length tuning.
    pub fn unit(&self) -> u8 {
        self.unit
    }

    /// Highest phase index usable with [`Self::unit`].
    pub fn max_phase(&self) -> u8 {
        self.max
    }

    /// Phase picked by the last successful phase tuning.
    pub fn phase(&self) -> u8 {
        self.phase
    }

    /// Output clock = input clock.
    pub fn input_ck(&self) {
        self.regs().cr.set(0);
    }

    /// Programs unit and phase. With `sampler` the line is left measuring,
    /// otherwise only the delay stays enabled and the setting is locked.
    pub fn set_cfgr(&self, unit: u8, phase: u8, sampler: bool) {
        let regs = self.regs();
        regs.cr.write(DLYB_CR::SEN::SET + DLYB_CR::DEN::SET);
        regs.cfgr
            .write(DLYB_CFGR::UNIT.val(unit as u32) + DLYB_CFGR::SEL.val(phase as u32));
        if !sampler {
            regs.cr.write(DLYB_CR::DEN::SET);
        }
    }

    fn measure_length(&self, kernel: &dyn Kernel, unit: u8) -> Result<u32> {
        self.set_cfgr(unit, DLYB_CFGR_SEL_MAX, true);

        let cfgr = &self.regs().cfgr;
        match poll_timeout(
            kernel,
            LNG_POLL_INTERVAL,
            LNG_POLL_TIMEOUT,
            || cfgr.extract(),
            |v| v.is_set(DLYB_CFGR::LNGF),
        ) {
            Ok(v) => Ok(v.read(DLYB_CFGR::LNG)),
            Err(v) => {
                warn!("delay line cfg timeout unit:{} cfgr:{:#x}", unit, v.get());
                Err(SdmmcError::TuningStatusTimeout { unit })
            }
        }
    }

    /// Finds the first unit with a valid line length and stores it with the
    /// matching phase count.
    pub fn lng_tuning(&mut self, kernel: &dyn Kernel) -> Result {
        for unit in 0..=DLYB_CFGR_UNIT_MAX {
            let lng = match self.measure_length(kernel, unit) {
                Ok(lng) => lng,
                Err(_) => continue,
            };

            if lng > 0 && lng < 1 << DLYB_NB_DELAY {
                self.unit = unit;
                self.max = lng.ilog2() as u8;
                trace!("delay line unit:{} lng:{:#x} max:{}", unit, lng, self.max);
                return Ok(());
            }
        }

        Err(SdmmcError::TuningUnitNotFound)
    }

    /// Sweeps phases `0..=max_phase` and locks the middle of the longest
    /// run of passing phases.
    pub fn phase_tuning(&mut self, tuning: &mut dyn TuningOp, opcode: u32) -> Result {
        let mut cur_len = 0u8;
        let mut max_len = 0u8;
        let mut end_of_len = 0u8;

        for phase in 0..=self.max {
            self.set_cfgr(self.unit, phase, false);

            if tuning.send_tuning(opcode).is_err() {
                cur_len = 0;
            } else {
                cur_len += 1;
                if cur_len > max_len {
                    max_len = cur_len;
                    end_of_len = phase;
                }
            }
        }

        if max_len == 0 {
            error!("no tuning point found");
            return Err(SdmmcError::TuningNoStablePhase);
        }

        let phase = end_of_len - max_len / 2;
        self.set_cfgr(self.unit, phase, false);
        self.phase = phase;

        debug!(
            "unit:{} max_dly:{} phase:{}",
            self.unit, self.max, phase
        );

        Ok(())
    }
}
