pub use sdmmc_if::err::*;

pub type Result<T = ()> = core::result::Result<T, SdmmcError>;
