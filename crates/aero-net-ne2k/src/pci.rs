//! PCI identification template and the operational-register image seeded at construction.
//!
//! Drivers probe the controller by reading these values back, so they are reproduced exactly.

pub const NE2K_PCI_VENDOR_ID: u16 = 0x100B;
pub const NE2K_PCI_DEVICE_ID: u16 = 0x0020;
/// Size of the I/O BAR the controller decodes.
pub const NE2K_PCI_IO_BAR_SIZE: u32 = 0x100;
/// Offset of the power-management capability in configuration space.
pub const NE2K_PCI_PM_CAP_OFFSET: u8 = 0x40;

/// Bytes covered by [`config_header`] (standard header plus the PM capability).
pub const NE2K_PCI_CONFIG_LEN: usize = 0x48;

/// Configuration-space dwords, little-endian at the given offset. Unlisted dwords are zero.
const CONFIG_TEMPLATE: [(usize, u32); 12] = [
    // Device/vendor.
    (0x00, 0x0020_100B),
    // Status (capability list, fast back-to-back, medium DEVSEL) / command.
    (0x04, 0x0290_0000),
    // Class: network controller, Ethernet.
    (0x08, 0x0200_0000),
    (0x0C, 0x0000_0000),
    // BAR0: I/O space.
    (0x10, 0x0000_0001),
    (0x14, 0x0000_0000),
    (0x2C, 0x0000_0000),
    (0x30, 0x0000_0000),
    (0x34, 0x0000_0040),
    // Max_Lat / Min_Gnt / INTA# / line.
    (0x3C, 0x340B_0100),
    // PM capability: PMC / next / id.
    (0x40, 0xFF82_0001),
    (0x44, 0x0000_0000),
];

/// Returns the PCI configuration template.
pub fn config_header() -> [u8; NE2K_PCI_CONFIG_LEN] {
    let mut cfg = [0u8; NE2K_PCI_CONFIG_LEN];
    for (off, value) in CONFIG_TEMPLATE {
        cfg[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }
    cfg
}

/// Operational registers as seen by the controller before the first reset.
const REGISTER_IMAGE: [(usize, u32); 8] = [
    // Command.
    (0x00, 0x0000_0000),
    // EEPROM access.
    (0x08, 0x0000_0002),
    // Interrupt status.
    (0x10, 0x0300_8000),
    // Transmit configuration.
    (0x24, 0x0000_0102),
    // Receive configuration.
    (0x34, 0x0000_0002),
    // Boot ROM address.
    (0x50, 0xFFFF_FFFF),
    // Silicon revision.
    (0x58, 0x0000_0302),
    // MIB control.
    (0x5C, 0x0000_0002),
];

/// Base of the PHY register image; register `n` lives at `PHY_IMAGE_BASE + 4 * n`.
pub const PHY_IMAGE_BASE: usize = 0x80;
pub const PHY_REG_COUNT: u8 = 32;

/// PHY registers with non-zero reset values, by register number.
const PHY_IMAGE: [(u8, u16); 9] = [
    // Basic mode status.
    (0x01, 0x7849),
    // PHY identifier.
    (0x02, 0x2000),
    (0x03, 0x5C21),
    // Auto-negotiation advertisement.
    (0x04, 0x05E1),
    // Auto-negotiation expansion.
    (0x06, 0x0004),
    // Next-page transmit.
    (0x07, 0x2001),
    (0x16, 0x0100),
    (0x19, 0x003F),
    (0x1A, 0x0004),
];

/// Byte address of PHY register `reg` (taken modulo 32).
pub(crate) fn phy_reg_addr(reg: u8) -> usize {
    PHY_IMAGE_BASE + 4 * usize::from(reg % PHY_REG_COUNT)
}

/// Writes the operational-register and PHY images into the scratch region of `mem`.
pub(crate) fn seed_register_image(mem: &mut [u8]) {
    for (off, value) in REGISTER_IMAGE {
        mem[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }
    for (reg, value) in PHY_IMAGE {
        let addr = phy_reg_addr(reg);
        mem[addr..addr + 2].copy_from_slice(&value.to_le_bytes());
    }
}
