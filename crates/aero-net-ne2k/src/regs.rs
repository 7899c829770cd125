//! DP8390 register map and the paged register file.
//!
//! The chip exposes 16 port offsets per page and reuses the same offset for different fields
//! depending on the page selected by `CR.PS1:PS0` and on the access direction. Rather than
//! aliasing storage, reads and writes are decoded through explicit `(page, offset)` tables
//! into [`ReadReg`] / [`WriteReg`] and then dispatched against named device fields.

use tracing::trace;

use crate::Ne2kDevice;

/// Command register offset (present on every page).
pub const REG_CMD: u8 = 0x00;

/// `CR.STP`: stop the NIC (software reset state).
pub const CR_STOP: u8 = 0x01;
/// `CR.STA`: start the NIC.
pub const CR_START: u8 = 0x02;
/// `CR.TXP`: transmit the packet described by TPSR/TBCR.
pub const CR_TXP: u8 = 0x04;
/// `CR.RD0`: remote read.
pub const CR_RREAD: u8 = 0x08;
/// `CR.RD1`: remote write.
pub const CR_RWRITE: u8 = 0x10;
/// `CR.RD2`: abort/complete remote DMA.
pub const CR_NODMA: u8 = 0x20;
pub const CR_PAGE_SHIFT: u8 = 6;

/// `ISR.PRX`: packet received without error.
pub const ISR_RX: u8 = 0x01;
/// `ISR.PTX`: packet transmitted without error.
pub const ISR_TX: u8 = 0x02;
pub const ISR_RX_ERR: u8 = 0x04;
pub const ISR_TX_ERR: u8 = 0x08;
/// `ISR.OVW`: receive ring overwrite warning.
pub const ISR_OVW: u8 = 0x10;
pub const ISR_CNT: u8 = 0x20;
/// `ISR.RDC`: remote DMA complete.
pub const ISR_RDC: u8 = 0x40;
/// `ISR.RST`: reset status. Not an interrupt source.
pub const ISR_RST: u8 = 0x80;
/// ISR bits that can drive the interrupt line.
pub const ISR_IRQ_MASK: u8 = 0x7F;

/// Receive status: packet received intact.
pub const RSR_RXOK: u8 = 0x01;
pub const RSR_CRC: u8 = 0x02;
pub const RSR_FAE: u8 = 0x04;
pub const RSR_FO: u8 = 0x08;
pub const RSR_MPA: u8 = 0x10;
pub const RSR_PHY: u8 = 0x20;
pub const RSR_DIS: u8 = 0x40;
pub const RSR_DFR: u8 = 0x80;

/// Transmit status: packet transmitted without error.
pub const TSR_PTX: u8 = 0x01;

/// `RCR.AB`: accept broadcast.
pub const RCR_AB: u8 = 0x04;
/// `RCR.AM`: accept multicast (subject to the hash filter).
pub const RCR_AM: u8 = 0x08;
/// `RCR.PRO`: promiscuous.
pub const RCR_PRO: u8 = 0x10;

/// `DCR.WTS`: word-wide remote DMA transfers.
pub const DCR_WTS: u8 = 0x01;

// Page 0.
pub const EN0_STARTPG: u8 = 0x01;
pub const EN0_STOPPG: u8 = 0x02;
pub const EN0_BOUNDARY: u8 = 0x03;
pub const EN0_TSR: u8 = 0x04;
pub const EN0_TPSR: u8 = 0x04;
pub const EN0_TCNTLO: u8 = 0x05;
pub const EN0_TCNTHI: u8 = 0x06;
pub const EN0_ISR: u8 = 0x07;
pub const EN0_RSARLO: u8 = 0x08;
pub const EN0_RSARHI: u8 = 0x09;
pub const EN0_RCNTLO: u8 = 0x0A;
pub const EN0_ID0: u8 = 0x0A;
pub const EN0_RCNTHI: u8 = 0x0B;
pub const EN0_ID1: u8 = 0x0B;
pub const EN0_RSR: u8 = 0x0C;
pub const EN0_RXCR: u8 = 0x0C;
pub const EN0_TXCR: u8 = 0x0D;
pub const EN0_DCFG: u8 = 0x0E;
pub const EN0_IMR: u8 = 0x0F;

// Page 1.
pub const EN1_PHYS: u8 = 0x11;
pub const EN1_CURPAG: u8 = 0x17;
pub const EN1_MULT: u8 = 0x18;

// Page 2 (read-only mirrors).
pub const EN2_STARTPG: u8 = 0x21;
pub const EN2_STOPPG: u8 = 0x22;
pub const EN2_TPSR: u8 = 0x24;
pub const EN2_RXCR: u8 = 0x2C;
pub const EN2_TXCR: u8 = 0x2D;
pub const EN2_DCFG: u8 = 0x2E;
pub const EN2_IMR: u8 = 0x2F;

// Page 3 (RTL8029 configuration).
pub const EN3_CONFIG0: u8 = 0x33;
pub const EN3_CONFIG1: u8 = 0x34;
pub const EN3_CONFIG2: u8 = 0x35;
pub const EN3_CONFIG3: u8 = 0x36;

/// RTL8029 identification bytes returned at page 0 offsets 0x0A/0x0B.
pub const RTL8029_ID0: u8 = 0x50;
pub const RTL8029_ID1: u8 = 0x43;

/// CONFIG0: 10BaseT media.
pub const CONFIG0_DEFAULT: u8 = 0x00;
pub const CONFIG1_DEFAULT: u8 = 0x00;
/// CONFIG2: 10BaseT link active.
pub const CONFIG2_DEFAULT: u8 = 0x40;
/// CONFIG3: full duplex.
pub const CONFIG3_DEFAULT: u8 = 0x40;

/// A readable register after page decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadReg {
    Tsr,
    Boundary,
    Isr,
    RsarLo,
    RsarHi,
    Rsr,
    Phys(u8),
    CurPage,
    Mult(u8),
    PageStart,
    PageStop,
    Tpsr,
    Rcr,
    Tcr,
    Dcr,
    Imr,
    /// Fixed identification/configuration byte.
    Const(u8),
}

/// A writable register after page decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteReg {
    PageStart,
    PageStop,
    Boundary,
    Tpsr,
    TcntLo,
    TcntHi,
    Isr,
    RsarLo,
    RsarHi,
    RcntLo,
    RcntHi,
    Rcr,
    Tcr,
    Dcr,
    Imr,
    Phys(u8),
    CurPage,
    Mult(u8),
}

/// Page selected by a command register value.
pub fn page_of(cmd: u8) -> u8 {
    cmd >> CR_PAGE_SHIFT
}

/// Combines a 4-bit port offset and a page number into the decode key `offset | page << 4`.
pub fn decode_key(page: u8, offset: u8) -> u8 {
    (offset & 0x0F) | ((page & 0x03) << 4)
}

/// Read decode table. `None` means the offset is unmapped and reads as zero.
pub fn decode_read(page: u8, offset: u8) -> Option<ReadReg> {
    let key = decode_key(page, offset);
    let reg = match key {
        EN0_BOUNDARY => ReadReg::Boundary,
        EN0_TSR => ReadReg::Tsr,
        EN0_ISR => ReadReg::Isr,
        EN0_RSARLO => ReadReg::RsarLo,
        EN0_RSARHI => ReadReg::RsarHi,
        EN0_ID0 => ReadReg::Const(RTL8029_ID0),
        EN0_ID1 => ReadReg::Const(RTL8029_ID1),
        EN0_RSR => ReadReg::Rsr,
        k if (EN1_PHYS..EN1_PHYS + 6).contains(&k) => ReadReg::Phys(k - EN1_PHYS),
        EN1_CURPAG => ReadReg::CurPage,
        k if (EN1_MULT..EN1_MULT + 8).contains(&k) => ReadReg::Mult(k - EN1_MULT),
        EN2_STARTPG => ReadReg::PageStart,
        EN2_STOPPG => ReadReg::PageStop,
        EN2_TPSR => ReadReg::Tpsr,
        EN2_RXCR => ReadReg::Rcr,
        EN2_TXCR => ReadReg::Tcr,
        EN2_DCFG => ReadReg::Dcr,
        EN2_IMR => ReadReg::Imr,
        EN3_CONFIG0 => ReadReg::Const(CONFIG0_DEFAULT),
        EN3_CONFIG1 => ReadReg::Const(CONFIG1_DEFAULT),
        EN3_CONFIG2 => ReadReg::Const(CONFIG2_DEFAULT),
        EN3_CONFIG3 => ReadReg::Const(CONFIG3_DEFAULT),
        _ => return None,
    };
    Some(reg)
}

/// Write decode table. `None` means the write is ignored.
pub fn decode_write(page: u8, offset: u8) -> Option<WriteReg> {
    let key = decode_key(page, offset);
    let reg = match key {
        EN0_STARTPG => WriteReg::PageStart,
        EN0_STOPPG => WriteReg::PageStop,
        EN0_BOUNDARY => WriteReg::Boundary,
        EN0_TPSR => WriteReg::Tpsr,
        EN0_TCNTLO => WriteReg::TcntLo,
        EN0_TCNTHI => WriteReg::TcntHi,
        EN0_ISR => WriteReg::Isr,
        EN0_RSARLO => WriteReg::RsarLo,
        EN0_RSARHI => WriteReg::RsarHi,
        EN0_RCNTLO => WriteReg::RcntLo,
        EN0_RCNTHI => WriteReg::RcntHi,
        EN0_RXCR => WriteReg::Rcr,
        EN0_TXCR => WriteReg::Tcr,
        EN0_DCFG => WriteReg::Dcr,
        EN0_IMR => WriteReg::Imr,
        k if (EN1_PHYS..EN1_PHYS + 6).contains(&k) => WriteReg::Phys(k - EN1_PHYS),
        EN1_CURPAG => WriteReg::CurPage,
        k if (EN1_MULT..EN1_MULT + 8).contains(&k) => WriteReg::Mult(k - EN1_MULT),
        _ => return None,
    };
    Some(reg)
}

fn set_lo(word: u16, value: u8) -> u16 {
    (word & 0xFF00) | u16::from(value)
}

fn set_hi(word: u16, value: u8) -> u16 {
    (word & 0x00FF) | (u16::from(value) << 8)
}

impl Ne2kDevice {
    /// Reads one register-file byte at `offset` (0-15) in the currently selected page.
    pub fn read_register(&self, offset: u8) -> u8 {
        let offset = offset & 0x0F;
        if offset == REG_CMD {
            return self.cmd;
        }

        let page = page_of(self.cmd);
        let value = match decode_read(page, offset) {
            Some(ReadReg::Tsr) => self.tsr,
            Some(ReadReg::Boundary) => self.boundary,
            Some(ReadReg::Isr) => self.isr,
            Some(ReadReg::RsarLo) => self.rsar as u8,
            Some(ReadReg::RsarHi) => (self.rsar >> 8) as u8,
            Some(ReadReg::Rsr) => self.rsr,
            Some(ReadReg::Phys(i)) => self.par[usize::from(i)],
            Some(ReadReg::CurPage) => self.curr,
            Some(ReadReg::Mult(i)) => self.mar[usize::from(i)],
            Some(ReadReg::PageStart) => (self.pstart >> 8) as u8,
            Some(ReadReg::PageStop) => (self.pstop >> 8) as u8,
            Some(ReadReg::Tpsr) => self.tpsr,
            Some(ReadReg::Rcr) => self.rcr,
            Some(ReadReg::Tcr) => self.tcr,
            Some(ReadReg::Dcr) => self.dcr,
            Some(ReadReg::Imr) => self.imr,
            Some(ReadReg::Const(v)) => v,
            None => 0,
        };
        trace!(page, offset, value, "ne2k register read");
        value
    }

    /// Writes one register-file byte at `offset` (0-15) in the currently selected page.
    ///
    /// Offset 0 always addresses the command register and evaluates its start/transmit/DMA
    /// bits immediately.
    pub fn write_register(&mut self, offset: u8, value: u8) {
        let offset = offset & 0x0F;
        if offset == REG_CMD {
            trace!(value, "ne2k command write");
            self.write_command(value);
            return;
        }

        let page = page_of(self.cmd);
        trace!(page, offset, value, "ne2k register write");
        let Some(reg) = decode_write(page, offset) else {
            return;
        };

        match reg {
            WriteReg::PageStart => self.pstart = u16::from(value) << 8,
            WriteReg::PageStop => self.pstop = u16::from(value) << 8,
            WriteReg::Boundary => self.boundary = value,
            WriteReg::Tpsr => self.tpsr = value,
            WriteReg::TcntLo => self.tcnt = set_lo(self.tcnt, value),
            WriteReg::TcntHi => self.tcnt = set_hi(self.tcnt, value),
            WriteReg::Isr => {
                // Write-1-to-clear; RST is read-only.
                self.isr &= !(value & ISR_IRQ_MASK);
                self.update_irq();
            }
            WriteReg::RsarLo => self.rsar = set_lo(self.rsar, value),
            WriteReg::RsarHi => self.rsar = set_hi(self.rsar, value),
            WriteReg::RcntLo => self.rcnt = set_lo(self.rcnt, value),
            WriteReg::RcntHi => self.rcnt = set_hi(self.rcnt, value),
            WriteReg::Rcr => self.rcr = value,
            WriteReg::Tcr => self.tcr = value,
            WriteReg::Dcr => self.dcr = value,
            WriteReg::Imr => {
                self.imr = value;
                self.update_irq();
            }
            WriteReg::Phys(i) => self.par[usize::from(i)] = value,
            WriteReg::CurPage => self.curr = value,
            WriteReg::Mult(i) => self.mar[usize::from(i)] = value,
        }
    }

    fn write_command(&mut self, value: u8) {
        self.cmd = value;
        if value & CR_STOP != 0 {
            return;
        }

        self.isr &= !ISR_RST;

        // A remote read/write started with a zero byte count completes immediately.
        if value & (CR_RREAD | CR_RWRITE) != 0 && self.rcnt == 0 {
            self.isr |= ISR_RDC;
            self.update_irq();
        }

        if value & CR_TXP != 0 {
            self.transmit();
        }
    }
}
