//! Interrupt output of the NIC.
//!
//! The chip has a single interrupt output whose level is `(ISR & IMR & 0x7F) != 0`. How that
//! level reaches the CPU depends on how the card is attached:
//! - PCI: a shared, level-triggered INTx line ([`IrqLine`]).
//! - ISA: a dedicated legacy IRQ on the PIC ([`PicIrqLevelSink`]).

use tracing::trace;

use crate::regs::ISR_IRQ_MASK;
use crate::Ne2kError;

/// A level-triggered interrupt line (e.g. a PCI INTx pin).
pub trait IrqLine {
    fn set_level(&self, level: bool);
}

/// A sink that accepts level changes for a legacy PIC IRQ input (0-15).
pub trait PicIrqLevelSink {
    fn set_irq_level(&mut self, irq: u8, level: bool);
}

/// Interrupt sink that discards every level change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIrq;

impl IrqLine for NoIrq {
    fn set_level(&self, _level: bool) {}
}

impl PicIrqLevelSink for NoIrq {
    fn set_irq_level(&mut self, _irq: u8, _level: bool) {}
}

/// How the interrupt output is wired. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrqRoute {
    #[default]
    Pci,
    Isa(u8),
}

impl IrqRoute {
    pub fn validate(self) -> Result<Self, Ne2kError> {
        match self {
            IrqRoute::Isa(irq) if irq >= 16 => Err(Ne2kError::InvalidIsaIrq(irq)),
            route => Ok(route),
        }
    }
}

/// Combinational ISR/IMR to line-level logic plus the routed output.
pub(crate) struct InterruptController {
    route: IrqRoute,
    intx: Box<dyn IrqLine>,
    pic: Box<dyn PicIrqLevelSink>,
    level: bool,
}

impl InterruptController {
    pub(crate) fn new(
        route: IrqRoute,
        intx: Box<dyn IrqLine>,
        pic: Box<dyn PicIrqLevelSink>,
    ) -> Result<Self, Ne2kError> {
        Ok(Self {
            route: route.validate()?,
            intx,
            pic,
            level: false,
        })
    }

    /// PCI-routed controller with no sink attached.
    pub(crate) fn detached() -> Self {
        Self {
            route: IrqRoute::Pci,
            intx: Box::new(NoIrq),
            pic: Box::new(NoIrq),
            level: false,
        }
    }

    pub(crate) fn route(&self) -> IrqRoute {
        self.route
    }

    pub(crate) fn level(&self) -> bool {
        self.level
    }

    /// Recomputes the line level and drives it onto the routed output.
    pub(crate) fn update(&mut self, isr: u8, imr: u8) {
        let level = (isr & imr & ISR_IRQ_MASK) != 0;
        if level != self.level {
            trace!(isr, imr, level, route = ?self.route, "ne2k irq level change");
        }
        self.level = level;

        match self.route {
            IrqRoute::Pci => self.intx.set_level(level),
            IrqRoute::Isa(irq) => self.pic.set_irq_level(irq, level),
        }
    }
}
