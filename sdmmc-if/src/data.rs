//! Transfer descriptors shared between the protocol layer and the host.

use alloc::vec::Vec;

use crate::BusAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    /// Card to memory.
    Read,
    /// Memory to card.
    Write,
}

/// One contiguous piece of a transfer buffer.
///
/// `page`, `offset` and `length` describe the CPU side; `dma_address` and
/// `dma_length` are filled in when the host maps the segment.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// CPU address of the page holding the segment.
    pub page: usize,
    pub offset: u32,
    pub length: u32,
    pub dma_address: BusAddr,
    pub dma_length: u32,
}

impl Segment {
    /// The memory at `page + offset` must stay valid and untouched by the
    /// CPU while the segment is mapped.
    pub fn new(page: usize, offset: u32, length: u32) -> Self {
        Self {
            page,
            offset,
            length,
            ..Default::default()
        }
    }

    pub fn cpu_addr(&self) -> usize {
        self.page + self.offset as usize
    }
}

#[derive(Debug, Clone)]
pub struct Data {
    pub sg: Vec<Segment>,
    pub direction: DataDirection,
    /// Correlates this transfer with a speculative `pre_request`, 0 when unset.
    pub host_cookie: u32,
    mapped: bool,
}

impl Data {
    pub fn new(sg: Vec<Segment>, direction: DataDirection) -> Self {
        Self {
            sg,
            direction,
            host_cookie: 0,
            mapped: false,
        }
    }

    pub fn sg_len(&self) -> usize {
        self.sg.len()
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Host side bookkeeping, flipped by the host around map and unmap.
    pub fn set_mapped(&mut self, mapped: bool) {
        self.mapped = mapped;
    }
}
