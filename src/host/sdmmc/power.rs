use core::time::Duration;

use log::{debug, trace};
use tock_registers::interfaces::Writeable;

use super::{Sdmmc, reg::*};
use crate::{Ios, PowerMode};

/// Reset pulse width.
const RESET_HOLD: Duration = Duration::from_micros(2);
/// Time the lines stay driven high between power-off and power-on.
const POWER_OFF_HOLD: Duration = Duration::from_millis(1);

impl Sdmmc {
    pub(crate) fn update_pwrreg(&mut self, ios: &Ios) {
        let pwr = self.param.pwr_reg_add.bits();

        if let Some(dlyb) = &self.dlyb {
            dlyb.input_ck();
        }

        match ios.power_mode {
            PowerMode::Off => {
                debug!("power: off");
                // only a reset can power off the SDMMC
                self.rst.assert();
                self.kernel.delay(RESET_HOLD);
                self.rst.deassert();

                // power-cycle state drives D[7:0], CMD and CK low so the card
                // is not supplied through the signal lines
                self.write_pwrreg(POWER::PWRCTRL::Cycle.value | pwr);
            }
            PowerMode::On => {
                debug!("power: on");
                // the interrupt mask was lost with the reset
                self.reg.regs().mask.write(
                    MASK::CCRCFAIL::SET
                        + MASK::DCRCFAIL::SET
                        + MASK::CTIMEOUT::SET
                        + MASK::DTIMEOUT::SET
                        + MASK::TXUNDERR::SET
                        + MASK::RXOVERR::SET
                        + MASK::CMDREND::SET
                        + MASK::CMDSENT::SET,
                );

                // leave power-cycle through power-off, lines driven high
                self.write_pwrreg(POWER::PWRCTRL::Off.value | pwr);
                self.kernel.delay(POWER_OFF_HOLD);
                self.write_pwrreg(POWER::PWRCTRL::On.value | pwr);
            }
            mode => trace!("power: {mode:?} ignored"),
        }
    }

    fn write_pwrreg(&mut self, pwr: u32) {
        self.pwr_reg = pwr;
        self.reg.regs().power.set(pwr);
    }
}
