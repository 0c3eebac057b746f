//! STM32 SDMMC variant
//!
//! SDMMC 自带 IDMA（支持链表模式），并可选配一个外部 delay block 用于
//! SDR104 / HS200 的采样相位调节。

use alloc::sync::Arc;

use log::{error, info};

pub mod clock;
pub mod dlyb;
pub mod idma;
mod power;
pub mod reg;

pub use clock::{CLKDIV_MAX, clkcr_value, compute_divider};
pub use dlyb::DelayBlock;
pub use idma::{IDMA_BURST, Idma, LLI_DESC_SIZE, LliDesc, build_chain, validate_sg};
use reg::SdmmcReg;

use super::{DmaCaps, VariantOps};
use crate::{Data, Ios, Kernel, Mmio, TuningOp, err::*};

bitflags::bitflags! {
    /// Bits OR-ed into every CLKCR write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClkRegAdd: u32 {
        /// prop `st,neg-edge`
        const NEG_EDGE = 1 << 16;
        /// prop `st,use-ckin`
        const USE_CKIN = 1 << 20;
    }
}

bitflags::bitflags! {
    /// Bits OR-ed into every POWER write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PwrRegAdd: u32 {
        /// prop `st,sig-dir`
        const DIR_POL = 1 << 4;
    }
}

/// Controller reset line.
pub trait ResetOp: Send + Sync + 'static {
    fn assert(&self);
    fn deassert(&self);
}

#[derive(Debug, Clone, Copy)]
pub struct SdmmcParam {
    /// Kernel clock feeding the card clock divider.
    pub mclk_hz: u32,
    /// IDMA linked list support.
    pub dma_lli: bool,
    /// Max request size, the segment size limit without linked list.
    pub max_req_size: usize,
    pub clk_reg_add: ClkRegAdd,
    pub pwr_reg_add: PwrRegAdd,
    /// Second `reg` entry, the delay block.
    pub dlyb: Option<Mmio>,
}

impl Default for SdmmcParam {
    fn default() -> Self {
        Self {
            mclk_hz: 0,
            dma_lli: true,
            max_req_size: 1 << 20,
            clk_reg_add: ClkRegAdd::empty(),
            pwr_reg_add: PwrRegAdd::empty(),
            dlyb: None,
        }
    }
}

pub struct Sdmmc {
    reg: SdmmcReg,
    idma: Idma,
    dlyb: Option<DelayBlock>,
    param: SdmmcParam,
    kernel: Arc<dyn Kernel>,
    rst: Arc<dyn ResetOp>,
    clk_reg: u32,
    pwr_reg: u32,
}

impl Sdmmc {
    /// # Safety
    ///
    /// `base` and `param.dlyb`, when present, must map the SDMMC and delay
    /// block registers for the lifetime of the host.
    pub unsafe fn new(
        base: Mmio,
        param: SdmmcParam,
        kernel: Arc<dyn Kernel>,
        rst: Arc<dyn ResetOp>,
    ) -> Self {
        let reg = unsafe { SdmmcReg::new(base) };
        let dlyb = param.dlyb.map(|b| unsafe { DelayBlock::new(b) });
        if dlyb.is_none() {
            info!("SDMMC@{:#x}: no delay block, tuning unsupported", reg.base());
        }

        Self {
            reg,
            idma: Idma::new(param.dma_lli),
            dlyb,
            param,
            kernel,
            rst,
            clk_reg: 0,
            pwr_reg: 0,
        }
    }

    pub fn delay_block(&self) -> Option<&DelayBlock> {
        self.dlyb.as_ref()
    }

    pub fn idma(&self) -> &Idma {
        &self.idma
    }

    /// Last value written to CLKCR.
    pub fn clk_reg(&self) -> u32 {
        self.clk_reg
    }

    /// Last value written to POWER.
    pub fn pwr_reg(&self) -> u32 {
        self.pwr_reg
    }
}

impl VariantOps for Sdmmc {
    fn validate_data(&self, data: &Data) -> Result {
        validate_sg(&data.sg).map_err(|e| {
            error!("{e}");
            SdmmcError::from(e)
        })
    }

    fn prep_data(&mut self, data: &mut Data) -> Result {
        self.idma.prep(data)
    }

    fn unprep_data(&mut self, data: &mut Data, _err: Option<&SdmmcError>) {
        self.idma.unprep(data);
    }

    fn dma_setup(&mut self) -> Result<DmaCaps> {
        self.idma
            .setup(self.kernel.page_size(), self.param.max_req_size)
    }

    fn dma_start(&mut self, data: &Data) {
        self.idma.start(self.reg.regs(), data);
    }

    fn dma_finalize(&mut self, _data: &Data) {
        self.idma.finalize(self.reg.regs());
    }

    fn set_clkreg(&mut self, ios: &Ios, desired: u32) -> u32 {
        self.update_clkreg(ios, desired)
    }

    fn set_pwrreg(&mut self, ios: &Ios) {
        self.update_pwrreg(ios)
    }

    fn execute_tuning(&mut self, tuning: &mut dyn TuningOp, opcode: u32) -> Result {
        let Some(dlyb) = self.dlyb.as_mut() else {
            return Err(SdmmcError::TuningUnsupported);
        };

        dlyb.lng_tuning(self.kernel.as_ref())?;
        dlyb.phase_tuning(tuning, opcode)
    }
}
