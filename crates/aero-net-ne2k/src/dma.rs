//! Remote DMA: host access to packet memory through the data port.
//!
//! The host programs `RSAR` (address) and `RBCR` (byte count), issues a remote read or write
//! command, then moves bytes through the data port. Each access advances `RSAR` by the access
//! width and decrements `RBCR`; when `RBCR` reaches zero `ISR.RDC` is raised.
//!
//! `RSAR` wraps from `PSTOP` to `PSTART` only when the access started inside the ring. Addresses
//! that are already outside the ring just keep counting up (16-bit) and hit the all-ones
//! out-of-window policy of [`crate::memory`].

use tracing::trace;

use crate::regs::{DCR_WTS, ISR_RDC};
use crate::Ne2kDevice;

impl Ne2kDevice {
    /// Whether narrow data-port accesses move 16 bits (`DCR.WTS`) rather than 8.
    pub fn word_transfers(&self) -> bool {
        self.dcr & DCR_WTS != 0
    }

    /// Narrow data-port read: one byte, or one little-endian word when `DCR.WTS` is set.
    pub fn read_data_port(&mut self) -> u16 {
        let addr = usize::from(self.rsar);
        let (value, width) = if self.word_transfers() {
            (self.mem.read_u16(addr), 2)
        } else {
            (u16::from(self.mem.read_u8(addr)), 1)
        };
        trace!(addr, value, width, rcnt = self.rcnt, "ne2k dma read");
        self.dma_advance(width);
        value
    }

    /// Narrow data-port write. Ignored once the remote byte count is exhausted.
    pub fn write_data_port(&mut self, value: u16) {
        if self.rcnt == 0 {
            return;
        }
        let addr = usize::from(self.rsar);
        trace!(addr, value, rcnt = self.rcnt, "ne2k dma write");
        if self.word_transfers() {
            self.mem.write_u16(addr, value);
            self.dma_advance(2);
        } else {
            self.mem.write_u8(addr, value as u8);
            self.dma_advance(1);
        }
    }

    /// Wide (32-bit) data-port read, independent of `DCR.WTS`.
    pub fn read_data_port32(&mut self) -> u32 {
        let addr = usize::from(self.rsar);
        let value = self.mem.read_u32(addr);
        trace!(addr, value, rcnt = self.rcnt, "ne2k dma read32");
        self.dma_advance(4);
        value
    }

    /// Wide (32-bit) data-port write. Ignored once the remote byte count is exhausted.
    pub fn write_data_port32(&mut self, value: u32) {
        if self.rcnt == 0 {
            return;
        }
        let addr = usize::from(self.rsar);
        trace!(addr, value, rcnt = self.rcnt, "ne2k dma write32");
        self.mem.write_u32(addr, value);
        self.dma_advance(4);
    }

    fn dma_advance(&mut self, width: u16) {
        // Reads with nothing left to transfer do not move the cursor or re-raise RDC.
        if self.rcnt == 0 {
            return;
        }

        let ring = self.ring_bounds();
        let addr = usize::from(self.rsar);
        let next = addr + usize::from(width);
        let next = if ring.is_valid() && ring.contains(addr) {
            ring.wrap(next)
        } else {
            next
        };
        self.rsar = next as u16;

        if self.rcnt <= width {
            self.rcnt = 0;
            self.isr |= ISR_RDC;
            self.update_irq();
        } else {
            self.rcnt -= width;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::regs::{
        CR_RWRITE, CR_START, EN0_DCFG, EN0_RCNTHI, EN0_RCNTLO, EN0_RSARHI, EN0_RSARLO,
        EN0_STARTPG, EN0_STOPPG, REG_CMD,
    };
    use crate::Ne2kDevice;

    use super::*;

    fn start_remote_write(dev: &mut Ne2kDevice, addr: u16, count: u16) {
        dev.write_register(EN0_RSARLO, addr as u8);
        dev.write_register(EN0_RSARHI, (addr >> 8) as u8);
        dev.write_register(EN0_RCNTLO, count as u8);
        dev.write_register(EN0_RCNTHI, (count >> 8) as u8);
        dev.write_register(REG_CMD, CR_START | CR_RWRITE);
    }

    #[test]
    fn rsar_wraps_from_stop_to_start() {
        let mut dev = Ne2kDevice::new([0; 6]);
        dev.write_register(EN0_STARTPG, 0x46);
        dev.write_register(EN0_STOPPG, 0x80);
        dev.write_register(EN0_DCFG, DCR_WTS);
        start_remote_write(&mut dev, 0x7FFE, 4);

        dev.write_data_port(0x1122);
        assert_eq!(dev.remote_address(), 0x4600);
        dev.write_data_port(0x3344);
        assert_eq!(dev.remote_address(), 0x4602);
        assert_eq!(dev.memory()[0x7FFE..0x8000], [0x22, 0x11]);
        assert_eq!(dev.memory()[0x4600..0x4602], [0x44, 0x33]);
    }

    #[test]
    fn writes_stop_once_count_is_exhausted() {
        let mut dev = Ne2kDevice::new([0; 6]);
        start_remote_write(&mut dev, 0x4000, 1);

        dev.write_data_port(0xAA);
        dev.write_data_port(0xBB);
        assert_eq!(dev.memory()[0x4000], 0xAA);
        assert_eq!(dev.memory()[0x4001], 0x00);
        assert_eq!(dev.remote_address(), 0x4001);
        assert_eq!(dev.remote_byte_count(), 0);
    }

    #[test]
    fn wide_access_clamps_count_to_zero() {
        let mut dev = Ne2kDevice::new([0; 6]);
        start_remote_write(&mut dev, 0x4000, 3);

        dev.write_data_port32(0xDDCC_BBAA);
        assert_eq!(dev.remote_byte_count(), 0);
        assert_ne!(dev.isr() & ISR_RDC, 0);
        assert_eq!(dev.memory()[0x4000..0x4004], [0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn out_of_window_reads_float_high() {
        let mut dev = Ne2kDevice::new([0; 6]);
        dev.write_register(EN0_RSARLO, 0x00);
        dev.write_register(EN0_RSARHI, 0x20);
        dev.write_register(EN0_RCNTLO, 8);
        assert_eq!(dev.read_data_port(), 0xFF);
        assert_eq!(dev.read_data_port32(), 0xFFFF_FFFF);
        assert_eq!(dev.remote_address(), 0x2005);
    }
}
