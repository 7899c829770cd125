//! NE2000-compatible (DP8390 core) network controller.
//!
//! The device model covers the chip's internal state machine: the paged register file, the
//! receive ring in on-chip packet memory, remote DMA through the data port, the transmit path
//! and the ISR/IMR interrupt logic. Bus attachment is limited to a port-I/O window adapter
//! ([`Ne2kIoPort`]) and a PCI identification template ([`pci`]); frames leave through a
//! [`NetworkBackend`] and arrive via [`Ne2kDevice::receive`].
//!
//! The model is single-threaded: callers serialize register access and frame delivery.

#![forbid(unsafe_code)]

pub mod backend;
mod crc;
mod dma;
pub mod io;
pub mod irq;
pub mod memory;
pub mod pci;
pub mod regs;
mod rx;
#[cfg(feature = "io-snapshot")]
mod snapshot;
mod tx;

use thiserror::Error;
use tracing::debug;

pub use backend::{FrameQueue, NetworkBackend};
pub use crc::{multicast_accepts, multicast_hash_index};
pub use io::{Ne2kIoPort, PortIoDevice, SharedNe2kDevice, NE2K_IO_SIZE};
pub use irq::{IrqLine, IrqRoute, NoIrq, PicIrqLevelSink};
pub use memory::{RingBounds, NE2K_MEM_SIZE, PMEM_END, PMEM_SIZE, PMEM_START};
pub use rx::{MAX_ETH_FRAME_LEN, MAX_RX_FRAME_LEN, MIN_FRAME_LEN, RX_MIN_FREE_SPACE};

use irq::InterruptController;
use memory::PacketMemory;
use regs::ISR_RST;

/// Locally administered default station address.
pub const DEFAULT_MAC_ADDR: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ne2kError {
    #[error("ISA IRQ {0} is out of range (expected 0-15)")]
    InvalidIsaIrq(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ne2kConfig {
    /// Burned-in station address, mirrored into the PROM on every reset.
    pub mac_addr: [u8; 6],
    /// Which interrupt sink the controller drives.
    pub irq_route: IrqRoute,
}

impl Default for Ne2kConfig {
    fn default() -> Self {
        Self {
            mac_addr: DEFAULT_MAC_ADDR,
            irq_route: IrqRoute::Pci,
        }
    }
}

pub struct Ne2kCallbacks {
    /// Driven when the device is routed to a PCI INTx line.
    pub intx: Box<dyn IrqLine>,
    /// Driven when the device is routed to a legacy ISA IRQ.
    pub pic: Box<dyn PicIrqLevelSink>,
    /// Receives every transmitted frame.
    pub backend: Box<dyn NetworkBackend>,
}

impl Ne2kCallbacks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for Ne2kCallbacks {
    fn default() -> Self {
        Self {
            intx: Box::new(NoIrq),
            pic: Box::new(NoIrq),
            backend: Box::new(()),
        }
    }
}

/// NE2000 device model.
pub struct Ne2kDevice {
    mac_addr: [u8; 6],

    cmd: u8,
    /// Ring start/stop as byte addresses (`page << 8`).
    pstart: u16,
    pstop: u16,
    boundary: u8,
    tsr: u8,
    tpsr: u8,
    tcnt: u16,
    rsar: u16,
    rcnt: u16,
    rsr: u8,
    rcr: u8,
    tcr: u8,
    dcr: u8,
    isr: u8,
    imr: u8,
    par: [u8; 6],
    curr: u8,
    mar: [u8; 8],

    mem: PacketMemory,
    irq: InterruptController,
    backend: Box<dyn NetworkBackend>,
}

impl Ne2kDevice {
    /// Creates a PCI-routed device with no interrupt sink and a discarding backend.
    pub fn new(mac_addr: [u8; 6]) -> Self {
        Self::build(mac_addr, InterruptController::detached(), Box::new(()))
    }

    pub fn new_with_callbacks(
        cfg: Ne2kConfig,
        callbacks: Ne2kCallbacks,
    ) -> Result<Self, Ne2kError> {
        let irq = InterruptController::new(cfg.irq_route, callbacks.intx, callbacks.pic)?;
        Ok(Self::build(cfg.mac_addr, irq, callbacks.backend))
    }

    fn build(
        mac_addr: [u8; 6],
        irq: InterruptController,
        backend: Box<dyn NetworkBackend>,
    ) -> Self {
        let mut mem = PacketMemory::new();
        pci::seed_register_image(mem.as_mut_slice());

        let mut dev = Self {
            mac_addr,
            cmd: 0,
            pstart: 0,
            pstop: 0,
            boundary: 0,
            tsr: 0,
            tpsr: 0,
            tcnt: 0,
            rsar: 0,
            rcnt: 0,
            rsr: 0,
            rcr: 0,
            tcr: 0,
            dcr: 0,
            isr: 0,
            imr: 0,
            par: [0; 6],
            curr: 0,
            mar: [0; 8],
            mem,
            irq,
            backend,
        };
        dev.reset();
        dev
    }

    /// Replaces the network backend frames are transmitted into.
    pub fn set_backend(&mut self, backend: Box<dyn NetworkBackend>) {
        self.backend = backend;
    }

    /// Chip reset: latches `ISR.RST` and rebuilds the PROM mirror.
    ///
    /// Ring bounds, station/multicast filters and the command register are left as the
    /// driver programmed them.
    pub fn reset(&mut self) {
        debug!(mac = ?self.mac_addr, "ne2k reset");
        self.isr = ISR_RST;
        self.mem.load_prom(self.mac_addr);
        self.update_irq();
    }

    pub(crate) fn update_irq(&mut self) {
        self.irq.update(self.isr, self.imr);
    }

    /// Current level of the interrupt output.
    pub fn irq_level(&self) -> bool {
        self.irq.level()
    }

    pub fn irq_route(&self) -> IrqRoute {
        self.irq.route()
    }

    pub fn isr(&self) -> u8 {
        self.isr
    }

    pub fn imr(&self) -> u8 {
        self.imr
    }

    pub fn current_page(&self) -> u8 {
        self.curr
    }

    pub fn boundary_page(&self) -> u8 {
        self.boundary
    }

    /// Receive ring as programmed through `PSTART`/`PSTOP`. May be invalid.
    pub fn ring_bounds(&self) -> RingBounds {
        RingBounds::new(usize::from(self.pstart), usize::from(self.pstop))
    }

    pub fn remote_address(&self) -> u16 {
        self.rsar
    }

    pub fn remote_byte_count(&self) -> u16 {
        self.rcnt
    }

    pub fn mac_addr(&self) -> [u8; 6] {
        self.mac_addr
    }

    /// The full 48 KiB backing store (PROM mirror, scratch region and packet RAM).
    pub fn memory(&self) -> &[u8] {
        self.mem.as_slice()
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        self.mem.as_mut_slice()
    }

    /// Reads PHY register `reg` (0-31) from the PHY register image.
    pub fn phy_read(&self, reg: u8) -> u16 {
        let addr = pci::phy_reg_addr(reg);
        let mem = self.mem.as_slice();
        u16::from_le_bytes([mem[addr], mem[addr + 1]])
    }

    /// Writes PHY register `reg` (0-31). The value is stored as-is; no link state is modeled.
    pub fn phy_write(&mut self, reg: u8, value: u16) {
        let addr = pci::phy_reg_addr(reg);
        self.mem.as_mut_slice()[addr..addr + 2].copy_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct LevelLog(Rc<RefCell<Vec<bool>>>);

    impl IrqLine for LevelLog {
        fn set_level(&self, level: bool) {
            self.0.borrow_mut().push(level);
        }
    }

    #[test]
    fn new_device_holds_prom_and_reset_status() {
        let mac = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
        let dev = Ne2kDevice::new(mac);
        assert_eq!(dev.isr(), ISR_RST);
        assert!(!dev.irq_level());
        assert_eq!(dev.mac_addr(), mac);
        assert_eq!(dev.memory().len(), NE2K_MEM_SIZE);
        assert_eq!(dev.memory()[0], 0x02);
        assert_eq!(dev.memory()[1], 0x02);
        assert_eq!(dev.memory()[10], 0x01);
        assert_eq!(dev.memory()[11], 0x01);
    }

    #[test]
    fn invalid_isa_irq_is_rejected_at_construction() {
        let cfg = Ne2kConfig {
            irq_route: IrqRoute::Isa(16),
            ..Default::default()
        };
        let err = Ne2kDevice::new_with_callbacks(cfg, Ne2kCallbacks::default())
            .err()
            .unwrap();
        assert_eq!(err, Ne2kError::InvalidIsaIrq(16));
        assert_eq!(
            err.to_string(),
            "ISA IRQ 16 is out of range (expected 0-15)"
        );
    }

    #[test]
    fn reset_preserves_driver_programmed_state() {
        let mut dev = Ne2kDevice::new(DEFAULT_MAC_ADDR);
        dev.write_register(regs::EN0_STARTPG, 0x46);
        dev.write_register(regs::EN0_STOPPG, 0x80);
        dev.write_register(regs::EN0_ISR, 0xFF);
        dev.memory_mut()[0] = 0xAA;

        dev.reset();
        assert_eq!(dev.ring_bounds(), RingBounds::new(0x4600, 0x8000));
        assert_eq!(dev.isr(), ISR_RST);
        assert_eq!(dev.memory()[0], DEFAULT_MAC_ADDR[0]);
    }

    #[test]
    fn pci_route_drives_intx_from_isr_and_imr() {
        let intx = LevelLog::default();
        let callbacks = Ne2kCallbacks {
            intx: Box::new(intx.clone()),
            ..Default::default()
        };
        let mut dev = Ne2kDevice::new_with_callbacks(Ne2kConfig::default(), callbacks).unwrap();
        intx.0.borrow_mut().clear();

        dev.write_register(regs::EN0_IMR, regs::ISR_RDC);
        assert!(!dev.irq_level());
        dev.write_register(regs::EN0_RCNTLO, 0);
        dev.write_register(regs::REG_CMD, regs::CR_START | regs::CR_RREAD);
        assert!(dev.irq_level());

        dev.write_register(regs::EN0_ISR, regs::ISR_RDC);
        assert!(!dev.irq_level());
        assert_eq!(intx.0.borrow().last(), Some(&false));
        assert!(intx.0.borrow().contains(&true));
    }

    #[test]
    fn phy_registers_are_plain_storage() {
        let mut dev = Ne2kDevice::new(DEFAULT_MAC_ADDR);
        assert_eq!(dev.phy_read(1), 0x7849);
        dev.phy_write(1, 0x1234);
        assert_eq!(dev.phy_read(1), 0x1234);
        assert_eq!(dev.phy_read(1 + 32), 0x1234);
    }
}
