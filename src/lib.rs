#![no_std]

extern crate alloc;

pub use sdmmc_if::BusAddr;
pub use sdmmc_if::data::*;
pub use sdmmc_if::ios::*;
pub use sdmmc_if::tuning::*;

pub mod err;
pub mod host;
mod osal;

pub use host::*;
pub use osal::Kernel;

/// Base of a memory mapped register block.
pub type Mmio = core::ptr::NonNull<u8>;
