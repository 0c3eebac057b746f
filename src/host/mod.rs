use core::ptr::NonNull;

use alloc::sync::Arc;
use log::{error, info, warn};

pub mod sdmmc;

use crate::{Data, Ios, Kernel, PowerMode, TuningOp, err::*};
pub use sdmmc::{ClkRegAdd, PwrRegAdd, ResetOp, Sdmmc, SdmmcParam};

/// Segment limits the protocol layer must respect when building requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaCaps {
    pub max_segs: usize,
    pub max_seg_size: usize,
}

/// Per variant operations, one implementation per controller flavour.
pub trait VariantOps {
    fn validate_data(&self, data: &Data) -> Result;

    /// Maps the transfer buffers for the device.
    fn prep_data(&mut self, data: &mut Data) -> Result;

    fn unprep_data(&mut self, data: &mut Data, err: Option<&SdmmcError>);

    fn dma_setup(&mut self) -> Result<DmaCaps>;

    /// Arms the DMA for an already validated and mapped transfer.
    fn dma_start(&mut self, data: &Data);

    /// Disables the DMA whatever the transfer outcome was.
    fn dma_finalize(&mut self, data: &Data);

    /// Programs the card clock and returns its effective rate.
    fn set_clkreg(&mut self, ios: &Ios, desired: u32) -> u32;

    fn set_pwrreg(&mut self, ios: &Ios);

    fn execute_tuning(&mut self, _tuning: &mut dyn TuningOp, _opcode: u32) -> Result {
        Err(SdmmcError::TuningUnsupported)
    }
}

/// Host side of one controller: transfer lifecycle and bus settings on top
/// of a [`VariantOps`] implementation.
///
/// The protocol layer serializes requests, at most one transfer is
/// started and not yet finalized at any time.
pub struct SdmmcHost<V>
where
    V: VariantOps,
{
    variant: V,
    ios: Ios,
    caps: Option<DmaCaps>,
    next_cookie: u32,
    cclk: u32,
}

impl<V> From<V> for SdmmcHost<V>
where
    V: VariantOps,
{
    fn from(value: V) -> Self {
        Self {
            variant: value,
            ios: Ios::default(),
            caps: None,
            next_cookie: 0,
            cclk: 0,
        }
    }
}

impl SdmmcHost<Sdmmc> {
    /// # Safety
    ///
    /// See [`Sdmmc::new`].
    pub unsafe fn new(
        reg_base: NonNull<u8>,
        param: SdmmcParam,
        kernel: Arc<dyn Kernel>,
        rst: Arc<dyn ResetOp>,
    ) -> Self {
        Self::from(unsafe { Sdmmc::new(reg_base, param, kernel, rst) })
    }
}

impl<V> SdmmcHost<V>
where
    V: VariantOps,
{
    /// Sets up the DMA resources and returns the segment limits.
    pub fn init(&mut self) -> Result<DmaCaps> {
        let caps = self.variant.dma_setup()?;
        info!(
            "max_segs {}, max_seg_size {:#x}",
            caps.max_segs, caps.max_seg_size
        );
        self.caps = Some(caps);
        Ok(caps)
    }

    /// Refuses transfers the DMA can't carry. Nothing is accepted before
    /// [`Self::init`].
    pub fn validate(&self, data: &Data) -> Result {
        let Some(caps) = self.caps else {
            error!("DMA not set up");
            return Err(SdmmcError::NotInitialized);
        };

        if data.sg.is_empty() {
            error!("empty scatterlist");
            return Err(SdmmcError::Map);
        }

        let max_segs = caps.max_segs;
        if data.sg_len() > max_segs {
            error!("{} segments, at most {}", data.sg_len(), max_segs);
            return Err(SdmmcError::TooManySegments {
                count: data.sg_len(),
                max: max_segs,
            });
        }

        self.variant.validate_data(data)
    }

    /// Maps `data` unless a previous `pre_request` already did.
    pub fn prepare(&mut self, data: &mut Data, speculative: bool) -> Result {
        // Check if job is already prepared.
        if data.is_mapped() {
            if !speculative && data.host_cookie != self.next_cookie {
                warn!(
                    "data mapped under cookie {}, next is {}",
                    data.host_cookie, self.next_cookie
                );
            }
            return Ok(());
        }

        self.variant.prep_data(data)?;
        data.set_mapped(true);
        Ok(())
    }

    pub fn start(&mut self, data: &Data) {
        if !data.is_mapped() {
            warn!("start on unmapped data ignored");
            return;
        }
        self.variant.dma_start(data);
    }

    /// Unmaps `data`. Safe to call on data that was never mapped or is
    /// already unmapped.
    pub fn unprepare(&mut self, data: &mut Data, err: Option<&SdmmcError>) {
        if !data.is_mapped() {
            return;
        }
        self.variant.unprep_data(data, err);
        data.set_mapped(false);
    }

    pub fn finalize(&mut self, data: &Data) {
        self.variant.dma_finalize(data);
    }

    /// Tags `data` with a fresh cookie and maps it ahead of its turn.
    pub fn pre_request(&mut self, data: &mut Data) -> Result {
        self.next_cookie = match self.next_cookie.wrapping_add(1) {
            0 => 1,
            c => c,
        };
        data.host_cookie = self.next_cookie;
        let res = self.prepare(data, true);
        if res.is_err() {
            data.host_cookie = 0;
        }
        res
    }

    pub fn post_request(&mut self, data: &mut Data, err: Option<&SdmmcError>) {
        self.unprepare(data, err);
        data.host_cookie = 0;
    }

    /// Validate, prepare and start in one go.
    pub fn request(&mut self, data: &mut Data) -> Result {
        self.validate(data)?;
        self.prepare(data, false)?;
        self.start(data);
        Ok(())
    }

    pub fn set_clock(&mut self, desired: u32) {
        self.ios.clock = desired;
        self.cclk = self.variant.set_clkreg(&self.ios, desired);
    }

    pub fn set_power(&mut self, mode: PowerMode) {
        self.ios.power_mode = mode;
        self.variant.set_pwrreg(&self.ios);
    }

    pub fn set_ios(&mut self, ios: Ios) {
        self.ios = ios;
        self.cclk = self.variant.set_clkreg(&self.ios, ios.clock);
        self.variant.set_pwrreg(&self.ios);
    }

    pub fn execute_tuning(&mut self, tuning: &mut dyn TuningOp, opcode: u32) -> Result {
        self.variant.execute_tuning(tuning, opcode)
    }

    pub fn ios(&self) -> &Ios {
        &self.ios
    }

    /// Effective card clock, 0 unless powered on.
    pub fn actual_clock(&self) -> u32 {
        if self.ios.power_mode == PowerMode::On {
            self.cclk
        } else {
            0
        }
    }

    pub fn caps(&self) -> Option<DmaCaps> {
        self.caps
    }

    pub fn next_cookie(&self) -> u32 {
        self.next_cookie
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    pub fn variant_mut(&mut self) -> &mut V {
        &mut self.variant
    }
}
