//! Bus settings handed down by the protocol layer.

use num_enum::{FromPrimitive, IntoPrimitive};

/// Data bus width, encoded as the MMC core does.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive)]
#[repr(u8)]
pub enum BusWidth {
    #[default]
    One = 0,
    Four = 2,
    Eight = 3,
}

/// Bus timing mode.
///
/// Variants are declared in ascending speed-class order, so `>=` comparisons
/// such as `timing >= Timing::UhsSdr50` follow the MMC core ordering.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, IntoPrimitive)]
#[repr(u8)]
pub enum Timing {
    #[default]
    Legacy = 0,
    MmcHs = 1,
    SdHs = 2,
    UhsSdr12 = 3,
    UhsSdr25 = 4,
    UhsSdr50 = 5,
    UhsSdr104 = 6,
    UhsDdr50 = 7,
    MmcDdr52 = 8,
    MmcHs200 = 9,
    MmcHs400 = 10,
}

impl Timing {
    /// Double data rate timings, where the clock divider can never be bypassed.
    pub fn is_ddr(&self) -> bool {
        matches!(self, Timing::UhsDdr50 | Timing::MmcDdr52)
    }
}

/// Requested power state. Unknown raw values decode to `Undefined`, which is
/// also the state before the first power request.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum PowerMode {
    Off = 0,
    Up = 1,
    On = 2,
    #[default]
    Undefined = 3,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ios {
    /// Requested card clock, 0 while powering on.
    pub clock: u32,
    pub bus_width: BusWidth,
    pub timing: Timing,
    pub power_mode: PowerMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_order() {
        assert!(Timing::UhsSdr104 >= Timing::UhsSdr50);
        assert!(Timing::MmcHs200 >= Timing::UhsSdr50);
        assert!(Timing::UhsSdr25 < Timing::UhsSdr50);
        assert!(Timing::SdHs < Timing::UhsSdr50);
    }

    #[test]
    fn test_raw_conversion() {
        assert_eq!(u8::from(BusWidth::Four), 2);
        assert_eq!(u8::from(Timing::UhsSdr104), 6);
        assert_eq!(PowerMode::from(2u8), PowerMode::On);
        assert_eq!(PowerMode::from(9u8), PowerMode::Undefined);
        assert_eq!(u8::from(Timing::MmcDdr52), 8);
    }

    #[test]
    fn test_defaults() {
        let ios = Ios::default();
        assert_eq!(ios.bus_width, BusWidth::One);
        assert_eq!(ios.timing, Timing::Legacy);
        assert_eq!(ios.power_mode, PowerMode::Undefined);
    }

    #[test]
    fn test_ddr() {
        assert!(Timing::UhsDdr50.is_ddr());
        assert!(Timing::MmcDdr52.is_ddr());
        assert!(!Timing::MmcHs400.is_ddr());
    }
}
