//! Multicast hash filter.

const POLYNOMIAL: u32 = 0x04C1_1DB6;

/// Computes the 6-bit multicast hash bucket for a destination address.
///
/// This is the DP8390's bit-serial CRC-32 over the six address bytes (LSB first, seeded with
/// all-ones); the bucket is the top six bits of the final CRC.
pub fn multicast_hash_index(addr: &[u8; 6]) -> u8 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in addr {
        let mut b = byte;
        for _ in 0..8 {
            let carry = (crc >> 31) ^ u32::from(b & 0x01);
            crc <<= 1;
            b >>= 1;
            if carry != 0 {
                crc = (crc ^ POLYNOMIAL) | carry;
            }
        }
    }
    (crc >> 26) as u8
}

/// Whether the hash bucket for `addr` is enabled in the multicast address registers.
pub fn multicast_accepts(mar: &[u8; 8], addr: &[u8; 6]) -> bool {
    let index = multicast_hash_index(addr);
    mar[usize::from(index >> 3)] & (1 << (index & 7)) != 0
}
