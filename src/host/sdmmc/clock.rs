use log::debug;
use tock_registers::interfaces::Writeable;

use super::{ClkRegAdd, Sdmmc, reg::*};
use crate::{BusWidth, Ios, Timing};

/// Largest CLKDIV value.
pub const CLKDIV_MAX: u32 = 0x3ff;

/// Returns `(clkdiv, cclk)` for a requested card clock.
///
/// cclk = mclk / (2 * clkdiv), clkdiv 0 bypasses the divider, which DDR
/// cannot use.
pub fn compute_divider(desired_hz: u32, mclk_hz: u32, ddr: bool) -> (u32, u32) {
    if desired_hz == 0 {
        // while powering on the clock can't be stopped, only power-off and
        // power-cycle do that, so run as slow as possible
        return (CLKDIV_MAX, mclk_hz / (2 * CLKDIV_MAX));
    }

    if desired_hz >= mclk_hz && !ddr {
        return (0, mclk_hz);
    }

    let div = (mclk_hz as u64)
        .div_ceil(2 * desired_hz as u64)
        .clamp(1, CLKDIV_MAX as u64) as u32;
    (div, mclk_hz / (2 * div))
}

/// Full CLKCR value for `clkdiv` under the current bus settings.
pub fn clkcr_value(ios: &Ios, clkdiv: u32, add: ClkRegAdd) -> u32 {
    let mut clk = (CLKCR::CLKDIV.val(clkdiv) + CLKCR::HWFC_EN::SET).value;

    match ios.bus_width {
        BusWidth::Four => clk |= CLKCR::WIDBUS::Four.value,
        BusWidth::Eight => clk |= CLKCR::WIDBUS::Eight.value,
        BusWidth::One => {}
    }

    clk |= add.bits();

    if ios.timing.is_ddr() {
        clk |= CLKCR::DDR::SET.value;
    }

    // SDR104 samples on the feedback clock, which goes through the
    // external delay block
    if ios.timing >= Timing::UhsSdr50 {
        clk |= CLKCR::BUSSPEED::SET.value;
        if ios.timing == Timing::UhsSdr104 {
            clk &= !CLKCR::SELCLKRX::Fbck.mask();
            clk |= CLKCR::SELCLKRX::Fbck.value;
        }
    }

    clk
}

impl Sdmmc {
    /// Programs CLKCR for `desired` Hz and returns the resulting card clock.
    pub(crate) fn update_clkreg(&mut self, ios: &Ios, desired: u32) -> u32 {
        let (clkdiv, cclk) = compute_divider(desired, self.param.mclk_hz, ios.timing.is_ddr());
        let clk = clkcr_value(ios, clkdiv, self.param.clk_reg_add);

        debug!(
            "clock: desired {} Hz, clkdiv {}, cclk {} Hz, CLKCR {:#010x}",
            desired, clkdiv, cclk, clk
        );

        self.clk_reg = clk;
        self.reg.regs().clkcr.set(clk);
        cclk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PowerMode;

    const MCLK: u32 = 48_000_000;

    fn ios(bus_width: BusWidth, timing: Timing) -> Ios {
        Ios {
            clock: 0,
            bus_width,
            timing,
            power_mode: PowerMode::On,
        }
    }

    #[test]
    fn test_divider_power_on_phase() {
        let (div, cclk) = compute_divider(0, MCLK, false);
        assert_eq!(div, CLKDIV_MAX);
        assert_eq!(cclk, MCLK / (2 * CLKDIV_MAX));
        assert_ne!(cclk, 0);
    }

    #[test]
    fn test_divider_bypass() {
        assert_eq!(compute_divider(50_000_000, MCLK, false), (0, MCLK));
        assert_eq!(compute_divider(MCLK, MCLK, false), (0, MCLK));
    }

    #[test]
    fn test_divider_ddr_never_bypass() {
        assert_eq!(compute_divider(50_000_000, MCLK, true), (1, MCLK / 2));
    }

    #[test]
    fn test_divider_rounds_up() {
        // 48M / (2 * 400k) = 60
        assert_eq!(compute_divider(400_000, MCLK, false), (60, 400_000));
        // 48M / (2 * 25M) = 0.96 -> 1
        assert_eq!(compute_divider(25_000_000, MCLK, false), (1, 24_000_000));
        // 48M / (2 * 7M) = 3.43 -> 4, never faster than requested
        let (div, cclk) = compute_divider(7_000_000, MCLK, false);
        assert_eq!(div, 4);
        assert!(cclk <= 7_000_000);
    }

    #[test]
    fn test_divider_clamped() {
        assert_eq!(compute_divider(1, MCLK, false), (CLKDIV_MAX, MCLK / (2 * CLKDIV_MAX)));
    }

    #[test]
    fn test_clkcr_bus_width_and_flow_control() {
        let hwfc = 1 << 17;
        assert_eq!(clkcr_value(&ios(BusWidth::One, Timing::Legacy), 60, ClkRegAdd::empty()), 60 | hwfc);
        assert_eq!(
            clkcr_value(&ios(BusWidth::Four, Timing::SdHs), 1, ClkRegAdd::empty()),
            1 | hwfc | (1 << 14)
        );
        assert_eq!(
            clkcr_value(&ios(BusWidth::Eight, Timing::MmcHs), 1, ClkRegAdd::empty()),
            1 | hwfc | (1 << 15)
        );
    }

    #[test]
    fn test_clkcr_ddr_and_bus_speed() {
        let clk = clkcr_value(&ios(BusWidth::Four, Timing::UhsDdr50), 1, ClkRegAdd::empty());
        assert_ne!(clk & (1 << 18), 0);
        assert_ne!(clk & (1 << 19), 0);

        let clk = clkcr_value(&ios(BusWidth::Four, Timing::UhsSdr25), 1, ClkRegAdd::empty());
        assert_eq!(clk & (1 << 19), 0);
        assert_eq!(clk & (1 << 18), 0);

        let clk = clkcr_value(&ios(BusWidth::Four, Timing::UhsSdr50), 0, ClkRegAdd::empty());
        assert_ne!(clk & (1 << 19), 0);
        assert_eq!(clk & (3 << 20), 0);
    }

    #[test]
    fn test_clkcr_sdr104_selects_feedback_clock() {
        let clk = clkcr_value(
            &ios(BusWidth::Four, Timing::UhsSdr104),
            1,
            ClkRegAdd::USE_CKIN | ClkRegAdd::NEG_EDGE,
        );
        assert_eq!(clk & (3 << 20), 2 << 20);
        assert_ne!(clk & (1 << 19), 0);
        assert_ne!(clk & (1 << 16), 0);
    }

    #[test]
    fn test_clkcr_keeps_ckin_below_sdr104() {
        let clk = clkcr_value(&ios(BusWidth::Four, Timing::SdHs), 2, ClkRegAdd::USE_CKIN);
        assert_eq!(clk & (3 << 20), 1 << 20);
    }
}
