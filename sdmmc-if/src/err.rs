use core::fmt::Display;

/// Where an offending segment sits inside its scatter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPosition {
    Interior,
    Last,
}

impl Display for SegmentPosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SegmentPosition::Interior => write!(f, "interior"),
            SegmentPosition::Last => write!(f, "last"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unaligned {position} scatterlist [{index}]: ofst:{offset:#x} length:{length}")]
pub struct AlignmentError {
    pub index: usize,
    pub offset: u32,
    pub length: u32,
    pub position: SegmentPosition,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SdmmcError {
    #[error("{0}")]
    Alignment(#[from] AlignmentError),
    #[error("DMA mapping failed")]
    Map,
    #[error("Too many segments: {count} > {max}")]
    TooManySegments { count: usize, max: usize },
    #[error("No memory available")]
    NoMemory,
    #[error("Delay block not available")]
    TuningUnsupported,
    #[error("No delay unit with a valid length")]
    TuningUnitNotFound,
    #[error("Delay line cfg timeout at unit {unit}")]
    TuningStatusTimeout { unit: u8 },
    #[error("No tuning point found")]
    TuningNoStablePhase,
    #[error("Tuning command failed")]
    TuningCommand,
    #[error("Not initialized")]
    NotInitialized,
}

pub const EINVAL: i32 = 22;
pub const ENOMEM: i32 = 12;
pub const ETIMEDOUT: i32 = 110;

impl SdmmcError {
    /// Negative errno class, for hosts that report Linux style codes.
    pub fn errno(&self) -> i32 {
        match self {
            SdmmcError::NoMemory => -ENOMEM,
            SdmmcError::TuningStatusTimeout { .. } => -ETIMEDOUT,
            _ => -EINVAL,
        }
    }
}
