//! Internal DMA: scatter list checks, linked list descriptors and arming.

use dma_api::{DSlice, DSliceMut, DVec, Direction};
use log::{debug, error, trace};
use mbarrier::wmb;
use tock_registers::interfaces::Writeable;

use super::reg::*;
use crate::{BusAddr, Data, DataDirection, Segment, err::*, host::DmaCaps};

/// IDMA burst, every segment but the last must be a multiple of it.
pub const IDMA_BURST: u32 = 1 << 5;

/// Largest buffer one descriptor can describe.
pub const IDMA_BSIZE_MASK: usize = 0x1fe0;

/// One linked list item as the IDMA fetches it.
#[repr(C)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LliDesc {
    pub idmalar: u32,
    pub idmabase: u32,
    pub idmasize: u32,
}

pub const LLI_DESC_SIZE: usize = size_of::<LliDesc>();

const _: () = assert!(LLI_DESC_SIZE == 12);

/// Checks IDMA constraints on a scatter list.
///
/// Every element needs a word aligned offset and a burst multiple length,
/// except the last one which has no constraint on its length.
pub fn validate_sg(sg: &[Segment]) -> core::result::Result<(), AlignmentError> {
    let Some((last, interior)) = sg.split_last() else {
        return Ok(());
    };

    for (index, seg) in interior.iter().enumerate() {
        if seg.offset % 4 != 0 || seg.length % IDMA_BURST != 0 {
            return Err(AlignmentError {
                index,
                offset: seg.offset,
                length: seg.length,
                position: SegmentPosition::Interior,
            });
        }
    }

    if last.offset % 4 != 0 {
        return Err(AlignmentError {
            index: interior.len(),
            offset: last.offset,
            length: last.length,
            position: SegmentPosition::Last,
        });
    }

    Ok(())
}

/// Writes one descriptor per mapped segment and terminates the list.
///
/// Returns the first descriptor, which the caller loads into the IDMA
/// registers. A list longer than `lli` is refused without touching it.
pub fn build_chain(lli: &mut DVec<LliDesc>, sg: &[Segment]) -> Result<LliDesc> {
    if sg.is_empty() || sg.len() > lli.len() {
        return Err(SdmmcError::TooManySegments {
            count: sg.len(),
            max: lli.len(),
        });
    }

    let link = (IDMALAR::ULA::SET + IDMALAR::ULS::SET + IDMALAR::ABR::SET).value;
    let end = sg.len() - 1;
    let mut first = LliDesc::default();

    for (i, seg) in sg.iter().enumerate() {
        let mut desc = LliDesc {
            idmalar: ((i + 1) * LLI_DESC_SIZE) as u32 | link,
            idmabase: seg.dma_address.raw(),
            idmasize: seg.dma_length,
        };
        // notice the end of link list
        if i == end {
            desc.idmalar &= !IDMALAR::ULA::SET.value;
        }
        trace!("LLI[{i}] {desc:x?}");
        if i == 0 {
            first = desc;
        }
        lli.set(i, desc);
    }

    Ok(first)
}

fn dma_direction(dir: DataDirection) -> Direction {
    match dir {
        DataDirection::Read => Direction::FromDevice,
        DataDirection::Write => Direction::ToDevice,
    }
}

fn segment_buf<'a>(seg: &Segment) -> &'a mut [u8] {
    // segments describe memory owned by the request until it is unprepared
    unsafe { core::slice::from_raw_parts_mut(seg.cpu_addr() as *mut u8, seg.length as usize) }
}

pub struct Idma {
    dma_lli: bool,
    lli: Option<DVec<LliDesc>>,
}

impl Idma {
    pub fn new(dma_lli: bool) -> Self {
        Self { dma_lli, lli: None }
    }

    pub fn setup(&mut self, page_size: usize, max_req_size: usize) -> Result<DmaCaps> {
        if !self.dma_lli {
            return Ok(DmaCaps {
                max_segs: 1,
                max_seg_size: max_req_size,
            });
        }

        if self.lli.is_none() {
            let lli = DVec::zeros(page_size / LLI_DESC_SIZE, page_size, Direction::ToDevice)
                .ok_or_else(|| {
                    error!("Failed to alloc IDMA descriptor");
                    SdmmcError::NoMemory
                })?;
            if lli.bus_addr() > u32::MAX as u64 {
                error!("IDMA descriptor @{:#x} out of reach", lli.bus_addr());
                return Err(SdmmcError::NoMemory);
            }
            debug!("IDMA LLI buffer @{:#x}, {} entries", lli.bus_addr(), lli.len());
            self.lli = Some(lli);
        }

        Ok(DmaCaps {
            max_segs: self.lli.as_ref().map_or(1, DVec::len),
            max_seg_size: IDMA_BSIZE_MASK,
        })
    }

    pub fn prep(&self, data: &mut Data) -> Result {
        let dir = data.direction;
        for i in 0..data.sg.len() {
            let seg = &data.sg[i];
            let buf = segment_buf(seg);
            let bus = match dir {
                DataDirection::Write => {
                    let ds = DSlice::from(buf, dma_direction(dir));
                    ds.confirm_write_all();
                    ds.bus_addr()
                }
                DataDirection::Read => DSliceMut::from(buf, dma_direction(dir)).bus_addr(),
            };

            let Ok(addr) = u32::try_from(bus) else {
                error!("dma_map_sg failed: sg[{i}] @{bus:#x}");
                Self::clear(&mut data.sg);
                return Err(SdmmcError::Map);
            };

            let seg = &mut data.sg[i];
            seg.dma_address = BusAddr::new(addr);
            seg.dma_length = seg.length;
        }
        Ok(())
    }

    pub fn unprep(&self, data: &mut Data) {
        if data.direction == DataDirection::Read {
            for seg in data.sg.iter() {
                DSliceMut::from(segment_buf(seg), Direction::FromDevice).preper_read_all();
            }
        }
        Self::clear(&mut data.sg);
    }

    fn clear(sg: &mut [Segment]) {
        for seg in sg.iter_mut() {
            seg.dma_address = BusAddr::default();
            seg.dma_length = 0;
        }
    }

    pub fn start(&mut self, regs: &SdmmcRegisters, data: &Data) {
        let Some(first) = data.sg.first() else {
            return;
        };

        if data.sg_len() == 1 || !self.dma_lli {
            regs.idmabase0.set(first.dma_address.raw());
            regs.idmabsize.set(first.dma_length);
            regs.idmactrl.write(IDMACTRL::IDMAEN::SET);
            return;
        }

        let Some(lli) = self.lli.as_mut() else {
            error!("IDMA LLI buffer not set up, {} segments dropped", data.sg_len());
            return;
        };

        let desc = match build_chain(lli, &data.sg) {
            Ok(desc) => desc,
            Err(e) => {
                error!("{e}");
                return;
            }
        };

        // descriptors must reach memory before the IDMA fetches them
        wmb();
        regs.idmabar.set(lli.bus_addr() as u32);
        regs.idmalar.set(desc.idmalar);
        regs.idmabase0.set(desc.idmabase);
        regs.idmabsize.set(desc.idmasize);
        regs.idmactrl
            .write(IDMACTRL::IDMAEN::SET + IDMACTRL::IDMALLIEN::SET);
    }

    pub fn finalize(&self, regs: &SdmmcRegisters) {
        regs.idmactrl.set(0);
    }

    pub fn lli(&self) -> Option<&DVec<LliDesc>> {
        self.lli.as_ref()
    }
}
