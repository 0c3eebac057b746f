#![no_std]

extern crate alloc;

#[macro_use]
mod _macros;

pub mod data;
pub mod err;
pub mod ios;
pub mod tuning;

define_int_type!(BusAddr, u32);
