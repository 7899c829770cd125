//! Transmit path: hands the frame at `TPSR` to the backend and latches completion.

use tracing::{debug, warn};

use crate::memory::{wrap_window, PMEM_END, PMEM_START};
use crate::regs::{CR_TXP, ISR_TX, TSR_PTX};
use crate::Ne2kDevice;

impl Ne2kDevice {
    /// Sends `TBCR` bytes starting at page `TPSR` to the backend and signals completion.
    ///
    /// Completion (TSR.PTX, ISR.PTX, clearing CR.TXP) is reported even when the buffer is empty
    /// or out of range; collisions and retries are not modeled.
    pub(crate) fn transmit(&mut self) {
        // Some drivers program TPSR past the end of packet RAM and rely on the address
        // aliasing back into it.
        let start = wrap_window(usize::from(self.tpsr) << 8, PMEM_START, PMEM_END);
        let len = usize::from(self.tcnt);

        if len == 0 {
            debug!(page = self.tpsr, "ne2k tx: zero-length transmit");
        } else if start + len <= PMEM_END {
            match self.mem.slice(start, len) {
                Some(buf) => {
                    let frame = buf.to_vec();
                    debug!(len, page = self.tpsr, "ne2k tx: sending frame");
                    self.backend.transmit(frame);
                }
                None => warn!(start, len, "ne2k tx: buffer outside packet memory"),
            }
        } else {
            warn!(start, len, "ne2k tx: buffer runs past end of packet memory, not sent");
        }

        self.tsr = TSR_PTX;
        self.isr |= ISR_TX;
        self.cmd &= !CR_TXP;
        self.update_irq();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::backend::FrameQueue;
    use crate::regs::{CR_START, EN0_ISR, EN0_TCNTHI, EN0_TCNTLO, EN0_TPSR, EN0_TSR, REG_CMD};
    use crate::{Ne2kCallbacks, Ne2kConfig, Ne2kDevice};

    use super::*;

    fn device_with_queue() -> (Ne2kDevice, Rc<RefCell<FrameQueue>>) {
        let queue = Rc::new(RefCell::new(FrameQueue::new()));
        let callbacks = Ne2kCallbacks {
            backend: Box::new(queue.clone()),
            ..Default::default()
        };
        let dev = Ne2kDevice::new_with_callbacks(Ne2kConfig::default(), callbacks).unwrap();
        (dev, queue)
    }

    #[test]
    fn tpsr_past_packet_ram_aliases_back() {
        let (mut dev, queue) = device_with_queue();
        // Page 0xC0 is PMEM_END; it aliases to page 0x40.
        dev.memory_mut()[PMEM_START..PMEM_START + 4].copy_from_slice(&[1, 2, 3, 4]);
        dev.write_register(EN0_TPSR, 0xC0);
        dev.write_register(EN0_TCNTLO, 4);
        dev.write_register(EN0_TCNTHI, 0);
        dev.write_register(REG_CMD, CR_START | CR_TXP);

        assert_eq!(queue.borrow_mut().pop_frame(), Some(vec![1, 2, 3, 4]));
        assert_eq!(dev.read_register(EN0_TSR), TSR_PTX);
        assert_eq!(dev.read_register(REG_CMD) & CR_TXP, 0);
    }

    #[test]
    fn overlong_transmit_still_completes() {
        let (mut dev, queue) = device_with_queue();
        dev.write_register(EN0_TPSR, 0xBF);
        dev.write_register(EN0_TCNTLO, 0x01);
        dev.write_register(EN0_TCNTHI, 0x01);
        dev.write_register(REG_CMD, CR_START | CR_TXP);

        assert!(queue.borrow().is_empty());
        assert_eq!(dev.read_register(EN0_ISR) & ISR_TX, ISR_TX);
    }
}
