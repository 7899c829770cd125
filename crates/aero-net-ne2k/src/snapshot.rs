use aero_io_snapshot::io::state::codec::{Decoder, Encoder};
use aero_io_snapshot::io::state::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};

use crate::memory::NE2K_MEM_SIZE;
use crate::Ne2kDevice;

const TAG_CMD: u16 = 1;
const TAG_PSTART: u16 = 2;
const TAG_PSTOP: u16 = 3;
const TAG_BOUNDARY: u16 = 4;
const TAG_TSR: u16 = 5;
const TAG_TPSR: u16 = 6;
const TAG_TCNT: u16 = 7;
const TAG_RSAR: u16 = 8;
const TAG_RCNT: u16 = 9;
const TAG_RSR: u16 = 10;
const TAG_RCR: u16 = 11;
const TAG_TCR: u16 = 12;
const TAG_DCR: u16 = 13;
const TAG_ISR: u16 = 14;
const TAG_IMR: u16 = 15;
const TAG_FILTERS: u16 = 16;
const TAG_CURR: u16 = 17;
const TAG_MAC: u16 = 18;
const TAG_MEMORY: u16 = 19;

const PAR_LEN: usize = 6;
const MAR_LEN: usize = 8;

/// Ring bounds are page registers, so a saved bound with a non-zero low byte cannot come from
/// a real device. Aligned bounds outside packet RAM are accepted: a guest can program them and
/// the receive path already treats such a ring as unusable.
fn ring_page(addr: u16) -> SnapshotResult<u16> {
    if addr & 0xFF != 0 {
        return Err(SnapshotError::InvalidFieldEncoding("ne2k ring bound"));
    }
    Ok(addr)
}

impl IoSnapshot for Ne2kDevice {
    const DEVICE_ID: [u8; 4] = *b"NE2K";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(1, 0);

    fn save_state(&self) -> Vec<u8> {
        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        w.field_u8(TAG_CMD, self.cmd);
        w.field_u16(TAG_PSTART, self.pstart);
        w.field_u16(TAG_PSTOP, self.pstop);
        w.field_u8(TAG_BOUNDARY, self.boundary);
        w.field_u8(TAG_TSR, self.tsr);
        w.field_u8(TAG_TPSR, self.tpsr);
        w.field_u16(TAG_TCNT, self.tcnt);
        w.field_u16(TAG_RSAR, self.rsar);
        w.field_u16(TAG_RCNT, self.rcnt);
        w.field_u8(TAG_RSR, self.rsr);
        w.field_u8(TAG_RCR, self.rcr);
        w.field_u8(TAG_TCR, self.tcr);
        w.field_u8(TAG_DCR, self.dcr);
        w.field_u8(TAG_ISR, self.isr);
        w.field_u8(TAG_IMR, self.imr);
        w.field_bytes(
            TAG_FILTERS,
            Encoder::new().bytes(&self.par).bytes(&self.mar).finish(),
        );
        w.field_u8(TAG_CURR, self.curr);
        w.field_bytes(TAG_MAC, self.mac_addr.to_vec());
        w.field_bytes(TAG_MEMORY, self.mem.as_slice().to_vec());
        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = SnapshotReader::parse(bytes, Self::DEVICE_ID)?;
        r.ensure_device_major(Self::DEVICE_VERSION.major)?;

        // Validate everything before touching device state.
        let pstart = ring_page(r.u16(TAG_PSTART)?.unwrap_or(0))?;
        let pstop = ring_page(r.u16(TAG_PSTOP)?.unwrap_or(0))?;

        let (par, mar) = match r.bytes(TAG_FILTERS) {
            Some(buf) => {
                let mut d = Decoder::new(buf);
                let mut par = [0u8; PAR_LEN];
                let mut mar = [0u8; MAR_LEN];
                par.copy_from_slice(d.bytes(PAR_LEN)?);
                mar.copy_from_slice(d.bytes(MAR_LEN)?);
                d.finish()?;
                (par, mar)
            }
            None => ([0; PAR_LEN], [0; MAR_LEN]),
        };

        let mac_addr = match r.bytes(TAG_MAC) {
            Some(buf) => <[u8; 6]>::try_from(buf)
                .map_err(|_| SnapshotError::InvalidFieldEncoding("ne2k mac address"))?,
            None => self.mac_addr,
        };

        let memory = r
            .bytes(TAG_MEMORY)
            .ok_or(SnapshotError::InvalidFieldEncoding("ne2k packet memory missing"))?;
        if memory.len() != NE2K_MEM_SIZE {
            return Err(SnapshotError::InvalidFieldEncoding("ne2k packet memory size"));
        }

        self.cmd = r.u8(TAG_CMD)?.unwrap_or(0);
        self.pstart = pstart;
        self.pstop = pstop;
        self.boundary = r.u8(TAG_BOUNDARY)?.unwrap_or(0);
        self.tsr = r.u8(TAG_TSR)?.unwrap_or(0);
        self.tpsr = r.u8(TAG_TPSR)?.unwrap_or(0);
        self.tcnt = r.u16(TAG_TCNT)?.unwrap_or(0);
        self.rsar = r.u16(TAG_RSAR)?.unwrap_or(0);
        self.rcnt = r.u16(TAG_RCNT)?.unwrap_or(0);
        self.rsr = r.u8(TAG_RSR)?.unwrap_or(0);
        self.rcr = r.u8(TAG_RCR)?.unwrap_or(0);
        self.tcr = r.u8(TAG_TCR)?.unwrap_or(0);
        self.dcr = r.u8(TAG_DCR)?.unwrap_or(0);
        self.isr = r.u8(TAG_ISR)?.unwrap_or(0);
        self.imr = r.u8(TAG_IMR)?.unwrap_or(0);
        self.par = par;
        self.mar = mar;
        self.curr = r.u8(TAG_CURR)?.unwrap_or(0);
        self.mac_addr = mac_addr;
        self.mem.as_mut_slice().copy_from_slice(memory);

        self.update_irq();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::{
        CR_NODMA, CR_START, CR_STOP, EN0_IMR, EN0_STARTPG, EN0_STOPPG, EN1_CURPAG, EN1_MULT,
        EN1_PHYS, ISR_RST, REG_CMD,
    };

    #[test]
    fn rejects_truncated_packet_memory() {
        let dev = Ne2kDevice::new([0x02, 0, 0, 0, 0, 1]);
        let mut w = SnapshotWriter::new(Ne2kDevice::DEVICE_ID, Ne2kDevice::DEVICE_VERSION);
        w.field_bytes(TAG_MEMORY, dev.memory()[..1024].to_vec());
        let bytes = w.finish();

        let mut restored = Ne2kDevice::new([0; 6]);
        assert_eq!(
            restored.load_state(&bytes),
            Err(SnapshotError::InvalidFieldEncoding("ne2k packet memory size"))
        );
        assert_eq!(restored.isr(), ISR_RST);
    }

    #[test]
    fn rejects_unaligned_ring_bounds() {
        let dev = Ne2kDevice::new([0x02, 0, 0, 0, 0, 1]);
        let mut w = SnapshotWriter::new(Ne2kDevice::DEVICE_ID, Ne2kDevice::DEVICE_VERSION);
        w.field_u16(TAG_PSTART, 0x4610);
        w.field_bytes(TAG_MEMORY, dev.memory().to_vec());
        let bytes = w.finish();

        let mut restored = Ne2kDevice::new([0; 6]);
        assert!(matches!(
            restored.load_state(&bytes),
            Err(SnapshotError::InvalidFieldEncoding(_))
        ));
    }

    #[test]
    fn restore_redrives_interrupt_level() {
        let mut dev = Ne2kDevice::new([0x02, 0, 0, 0, 0, 1]);
        dev.write_register(EN0_STARTPG, 0x46);
        dev.write_register(EN0_IMR, 0x01);
        dev.isr = 0x01;
        let bytes = dev.save_state();

        let mut restored = Ne2kDevice::new([0; 6]);
        assert!(!restored.irq_level());
        restored.load_state(&bytes).unwrap();
        assert!(restored.irq_level());
        assert_eq!(restored.mac_addr(), [0x02, 0, 0, 0, 0, 1]);
        assert_eq!(restored.ring_bounds().start, 0x4600);
    }

    #[test]
    fn restores_filter_registers() {
        let mut dev = Ne2kDevice::new([0x02, 0, 0, 0, 0, 1]);
        dev.write_register(REG_CMD, 0x40 | CR_NODMA | CR_STOP);
        for i in 0..6u8 {
            dev.write_register(EN1_PHYS + i, 0xA0 + i);
        }
        for i in 0..8u8 {
            dev.write_register(EN1_MULT + i, 0xB0 + i);
        }
        let bytes = dev.save_state();

        let mut restored = Ne2kDevice::new([0; 6]);
        restored.load_state(&bytes).unwrap();
        assert_eq!(restored.par, [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);
        assert_eq!(restored.mar, [0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7]);
    }

    #[test]
    fn rejects_filter_field_with_trailing_bytes() {
        let dev = Ne2kDevice::new([0x02, 0, 0, 0, 0, 1]);
        let mut w = SnapshotWriter::new(Ne2kDevice::DEVICE_ID, Ne2kDevice::DEVICE_VERSION);
        w.field_bytes(TAG_FILTERS, vec![0; PAR_LEN + MAR_LEN + 1]);
        w.field_bytes(TAG_MEMORY, dev.memory().to_vec());
        let bytes = w.finish();

        let mut restored = Ne2kDevice::new([0; 6]);
        assert!(restored.load_state(&bytes).is_err());
        assert_eq!(restored.isr(), ISR_RST);
    }

    #[test]
    fn ring_outside_packet_ram_restores_as_unusable() {
        let mut dev = Ne2kDevice::new([0x02, 0, 0, 0, 0, 1]);
        dev.write_register(REG_CMD, CR_NODMA | CR_STOP);
        dev.write_register(EN0_STARTPG, 0x80);
        dev.write_register(EN0_STOPPG, 0xFF);
        dev.write_register(REG_CMD, 0x40 | CR_NODMA | CR_STOP);
        dev.write_register(EN1_CURPAG, 0x80);
        dev.write_register(REG_CMD, CR_NODMA | CR_START);
        let bytes = dev.save_state();

        let mut restored = Ne2kDevice::new([0; 6]);
        restored.load_state(&bytes).unwrap();
        assert_eq!(restored.ring_bounds().start, 0x8000);
        assert_eq!(restored.ring_bounds().stop, 0xFF00);
        assert!(!restored.ring_bounds().is_valid());
        assert!(!restored.can_receive());

        let mut frame = vec![0x33; 64];
        frame[..6].fill(0xFF);
        assert!(!restored.receive(&frame));
        assert_eq!(restored.save_state(), bytes);
    }
}
