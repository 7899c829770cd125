//! On-chip packet memory and ring-buffer address arithmetic.

/// Start of the packet RAM window (page 0x40).
pub const PMEM_START: usize = 16 * 1024;
/// Size of the packet RAM window.
pub const PMEM_SIZE: usize = 32 * 1024;
/// End (exclusive) of the packet RAM window.
pub const PMEM_END: usize = PMEM_START + PMEM_SIZE;
/// Total backing store: PROM/scratch region plus packet RAM.
pub const NE2K_MEM_SIZE: usize = PMEM_END;
/// Length of the station PROM mirror visible through remote DMA.
pub const PROM_LEN: usize = 32;

/// NE2000 word-mode signature stored at PROM bytes 14/15.
const PROM_WORD_MODE_SIGNATURE: u8 = 0x57;

/// Folds `addr` back by the window length once it reaches `hi`.
///
/// This is the single wraparound rule shared by the receive ring, remote DMA and the transmit
/// start address. Callers guarantee `addr < hi + (hi - lo)`.
pub(crate) fn wrap_window(addr: usize, lo: usize, hi: usize) -> usize {
    if addr >= hi {
        addr - (hi - lo)
    } else {
        addr
    }
}

/// Receive ring bounds as byte addresses (`PSTART << 8`, `PSTOP << 8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingBounds {
    pub start: usize,
    pub stop: usize,
}

impl RingBounds {
    pub fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    /// Whether the driver has programmed a usable ring inside packet RAM.
    pub fn is_valid(&self) -> bool {
        PMEM_START <= self.start && self.start < self.stop && self.stop <= PMEM_END
    }

    /// Ring size in bytes. Zero for an invalid ring.
    pub fn size(&self) -> usize {
        if self.is_valid() {
            self.stop - self.start
        } else {
            0
        }
    }

    pub fn contains(&self, addr: usize) -> bool {
        (self.start..self.stop).contains(&addr)
    }

    /// Normalizes an address that may have run past `stop` back into `[start, stop)`.
    pub fn wrap(&self, addr: usize) -> usize {
        wrap_window(addr, self.start, self.stop)
    }

    /// Bytes available between the write cursor and the read cursor, modulo the ring size.
    ///
    /// Equal cursors report zero (ring full).
    pub fn free_space(&self, write: usize, read: usize) -> usize {
        let size = self.size();
        if size == 0 {
            return 0;
        }
        (read as isize - write as isize).rem_euclid(size as isize) as usize
    }
}

/// The chip's packet memory.
///
/// Remote DMA only reaches the PROM mirror (`[0, PROM_LEN)`) and packet RAM
/// (`[PMEM_START, PMEM_END)`); anything else reads as all-ones and drops writes.
#[derive(Clone)]
pub(crate) struct PacketMemory {
    bytes: Vec<u8>,
}

impl PacketMemory {
    pub(crate) fn new() -> Self {
        Self {
            bytes: vec![0; NE2K_MEM_SIZE],
        }
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Whether `[addr, addr + len)` lies entirely inside one of the DMA-visible windows.
    pub(crate) fn dma_window_contains(addr: usize, len: usize) -> bool {
        let Some(end) = addr.checked_add(len) else {
            return false;
        };
        end <= PROM_LEN || (addr >= PMEM_START && end <= PMEM_END)
    }

    pub(crate) fn read_u8(&self, addr: usize) -> u8 {
        if Self::dma_window_contains(addr, 1) {
            self.bytes[addr]
        } else {
            0xFF
        }
    }

    pub(crate) fn read_u16(&self, addr: usize) -> u16 {
        let addr = addr & !1;
        if Self::dma_window_contains(addr, 2) {
            u16::from_le_bytes([self.bytes[addr], self.bytes[addr + 1]])
        } else {
            0xFFFF
        }
    }

    pub(crate) fn read_u32(&self, addr: usize) -> u32 {
        let addr = addr & !1;
        if Self::dma_window_contains(addr, 4) {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&self.bytes[addr..addr + 4]);
            u32::from_le_bytes(buf)
        } else {
            0xFFFF_FFFF
        }
    }

    pub(crate) fn write_u8(&mut self, addr: usize, value: u8) {
        if Self::dma_window_contains(addr, 1) {
            self.bytes[addr] = value;
        }
    }

    pub(crate) fn write_u16(&mut self, addr: usize, value: u16) {
        let addr = addr & !1;
        if Self::dma_window_contains(addr, 2) {
            self.bytes[addr..addr + 2].copy_from_slice(&value.to_le_bytes());
        }
    }

    pub(crate) fn write_u32(&mut self, addr: usize, value: u32) {
        let addr = addr & !1;
        if Self::dma_window_contains(addr, 4) {
            self.bytes[addr..addr + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Returns `len` bytes at `addr`, or `None` if the range leaves the backing store.
    pub(crate) fn slice(&self, addr: usize, len: usize) -> Option<&[u8]> {
        let end = addr.checked_add(len)?;
        self.bytes.get(addr..end)
    }

    /// Copies `data` into the ring starting at `index`, wrapping to `ring.start` whenever the
    /// cursor reaches `ring.stop`. Returns the cursor after the last byte.
    ///
    /// `ring` must be valid and `index` must lie inside it.
    pub(crate) fn write_ring(
        &mut self,
        ring: RingBounds,
        mut index: usize,
        mut data: &[u8],
    ) -> usize {
        debug_assert!(ring.is_valid() && ring.contains(index));
        while !data.is_empty() {
            let chunk = data.len().min(ring.stop - index);
            self.bytes[index..index + chunk].copy_from_slice(&data[..chunk]);
            data = &data[chunk..];
            index = ring.wrap(index + chunk);
        }
        index
    }

    /// Rebuilds the station PROM mirror: MAC, zero padding and the word-mode signature, each
    /// logical byte duplicated into two consecutive bytes.
    pub(crate) fn load_prom(&mut self, mac: [u8; 6]) {
        let mut prom = [0u8; PROM_LEN / 2];
        prom[..6].copy_from_slice(&mac);
        prom[14] = PROM_WORD_MODE_SIGNATURE;
        prom[15] = PROM_WORD_MODE_SIGNATURE;

        for (i, b) in prom.iter().enumerate() {
            self.bytes[2 * i] = *b;
            self.bytes[2 * i + 1] = *b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dma_windows_are_bounded() {
        let mut mem = PacketMemory::new();
        mem.write_u8(PROM_LEN, 0x12);
        assert_eq!(mem.as_slice()[PROM_LEN], 0);
        assert_eq!(mem.read_u8(PROM_LEN), 0xFF);
        assert_eq!(mem.read_u8(PMEM_START - 1), 0xFF);
        assert_eq!(mem.read_u16(PMEM_END), 0xFFFF);
        assert_eq!(mem.read_u32(PMEM_END - 2), 0xFFFF_FFFF);

        mem.write_u32(PMEM_END - 4, 0x0403_0201);
        assert_eq!(mem.read_u32(PMEM_END - 4), 0x0403_0201);
        assert_eq!(mem.read_u8(PMEM_END - 1), 0x04);
    }

    #[test]
    fn word_accesses_ignore_the_low_address_bit() {
        let mut mem = PacketMemory::new();
        mem.write_u16(PMEM_START + 1, 0xBEEF);
        assert_eq!(mem.read_u8(PMEM_START), 0xEF);
        assert_eq!(mem.read_u8(PMEM_START + 1), 0xBE);
        assert_eq!(mem.read_u16(PMEM_START + 1), 0xBEEF);
    }

    #[test]
    fn prom_bytes_are_doubled() {
        let mut mem = PacketMemory::new();
        mem.load_prom([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let prom = &mem.as_slice()[..PROM_LEN];
        assert_eq!(
            &prom[..12],
            &[0x02, 0x02, 0x11, 0x11, 0x22, 0x22, 0x33, 0x33, 0x44, 0x44, 0x55, 0x55]
        );
        assert!(prom[12..28].iter().all(|b| *b == 0));
        assert_eq!(&prom[28..], &[0x57; 4]);
    }

    #[test]
    fn write_ring_wraps_at_stop() {
        let ring = RingBounds::new(0x4600, 0x4800);
        let mut mem = PacketMemory::new();
        let data: Vec<u8> = (0..16).collect();

        let end = mem.write_ring(ring, 0x47F8, &data);
        assert_eq!(end, 0x4608);
        assert_eq!(&mem.as_slice()[0x47F8..0x4800], &data[..8]);
        assert_eq!(&mem.as_slice()[0x4600..0x4608], &data[8..]);
    }

    #[test]
    fn free_space_is_modulo_ring_size() {
        let ring = RingBounds::new(0x4600, 0x8000);
        assert_eq!(ring.free_space(0x4700, 0x4600), ring.size() - 0x100);
        assert_eq!(ring.free_space(0x4600, 0x4700), 0x100);
        assert_eq!(ring.free_space(0x5000, 0x5000), 0);
        assert_eq!(RingBounds::new(0, 0).free_space(0, 0x100), 0);
    }
}
