use crate::err::SdmmcError;

/// One tuning-pattern round trip, provided by the protocol layer.
///
/// The host only cares whether the block sampled at the current delay
/// setting came back intact.
pub trait TuningOp {
    fn send_tuning(&mut self, opcode: u32) -> Result<(), SdmmcError>;
}

impl<F> TuningOp for F
where
    F: FnMut(u32) -> Result<(), SdmmcError>,
{
    fn send_tuning(&mut self, opcode: u32) -> Result<(), SdmmcError> {
        self(opcode)
    }
}

/// CMD19, SD tuning block.
pub const SD_SEND_TUNING_BLOCK: u32 = 19;
/// CMD21, eMMC HS200 tuning block.
pub const MMC_SEND_TUNING_BLOCK_HS200: u32 = 21;
