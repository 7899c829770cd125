//! Port-I/O window of the controller.
//!
//! | offset      | function                                          |
//! |-------------|---------------------------------------------------|
//! | 0x00-0x0F   | paged register file                               |
//! | 0x10-0x17   | remote DMA data port (8/16-bit, or 32-bit wide)   |
//! | 0x18-0x1F   | reset port: a read resets the chip, writes ignored |

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::Ne2kDevice;

/// Number of ports decoded by the controller.
pub const NE2K_IO_SIZE: u16 = 0x20;
pub const NE2K_DATA_PORT: u16 = 0x10;
pub const NE2K_RESET_PORT: u16 = 0x18;

const REGISTER_PORTS_END: u16 = NE2K_DATA_PORT;

/// A device attached to the I/O port bus.
pub trait PortIoDevice {
    fn read(&mut self, port: u16, size: u8) -> u32;
    fn write(&mut self, port: u16, size: u8, value: u32);

    /// Reset the device back to its power-on state.
    fn reset(&mut self) {}
}

fn all_ones(size: u8) -> u32 {
    match size {
        1 => 0xFF,
        2 => 0xFFFF,
        _ => 0xFFFF_FFFF,
    }
}

impl Ne2kDevice {
    /// Reads `size` bytes at window offset `offset`.
    pub fn io_read(&mut self, offset: u16, size: u8) -> u32 {
        match size {
            0 => return 0,
            1 | 2 | 4 => {}
            _ => return all_ones(size),
        }

        match offset {
            0..=0x0F => {
                let mut bytes = [0u8; 4];
                for (i, b) in bytes.iter_mut().take(usize::from(size)).enumerate() {
                    *b = self.io_read_u8(offset + i as u16);
                }
                u32::from_le_bytes(bytes)
            }
            0x10..=0x17 if size == 4 => self.read_data_port32(),
            0x10..=0x17 => {
                let value = self.read_data_port();
                if size == 1 {
                    u32::from(value & 0xFF)
                } else {
                    u32::from(value)
                }
            }
            0x18..=0x1F => {
                self.reset();
                0
            }
            _ => all_ones(size),
        }
    }

    /// Writes `size` bytes at window offset `offset`.
    pub fn io_write(&mut self, offset: u16, size: u8, value: u32) {
        if !matches!(size, 1 | 2 | 4) {
            return;
        }

        match offset {
            0..=0x0F => {
                let bytes = value.to_le_bytes();
                for (i, b) in bytes.iter().take(usize::from(size)).enumerate() {
                    self.io_write_u8(offset + i as u16, *b);
                }
            }
            0x10..=0x17 if size == 4 => self.write_data_port32(value),
            0x10..=0x17 if size == 1 => self.write_data_port(value as u16 & 0xFF),
            0x10..=0x17 => self.write_data_port(value as u16),
            0x18..=0x1F => trace!(offset, "ne2k reset port write ignored"),
            _ => {}
        }
    }

    fn io_read_u8(&mut self, offset: u16) -> u8 {
        if offset < REGISTER_PORTS_END {
            self.read_register(offset as u8)
        } else {
            self.io_read(offset, 1) as u8
        }
    }

    fn io_write_u8(&mut self, offset: u16, value: u8) {
        if offset < REGISTER_PORTS_END {
            self.write_register(offset as u8, value);
        } else {
            self.io_write(offset, 1, u32::from(value));
        }
    }
}

/// The device as a bus client where `port` is already relative to the window.
impl PortIoDevice for Ne2kDevice {
    fn read(&mut self, port: u16, size: u8) -> u32 {
        self.io_read(port, size)
    }

    fn write(&mut self, port: u16, size: u8, value: u32) {
        self.io_write(port, size, value);
    }

    fn reset(&mut self) {
        Ne2kDevice::reset(self);
    }
}

pub type SharedNe2kDevice = Rc<RefCell<Ne2kDevice>>;

/// Bus adapter exposing a shared device at absolute ports `base..base + NE2K_IO_SIZE`.
#[derive(Clone)]
pub struct Ne2kIoPort {
    dev: SharedNe2kDevice,
    base: u16,
}

impl Ne2kIoPort {
    pub fn new(dev: SharedNe2kDevice, base: u16) -> Self {
        Self { dev, base }
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    fn offset(&self, port: u16) -> Option<u16> {
        port.checked_sub(self.base).filter(|offset| *offset < NE2K_IO_SIZE)
    }
}

impl PortIoDevice for Ne2kIoPort {
    fn read(&mut self, port: u16, size: u8) -> u32 {
        if size == 0 {
            return 0;
        }
        match self.offset(port) {
            Some(offset) => self.dev.borrow_mut().io_read(offset, size),
            None => all_ones(size),
        }
    }

    fn write(&mut self, port: u16, size: u8, value: u32) {
        if let Some(offset) = self.offset(port) {
            self.dev.borrow_mut().io_write(offset, size, value);
        }
    }

    fn reset(&mut self) {
        self.dev.borrow_mut().reset();
    }
}
