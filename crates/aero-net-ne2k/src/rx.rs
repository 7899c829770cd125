//! Receive path: admission, address filtering and ring placement.
//!
//! Each stored packet is preceded by a 4-byte header:
//!
//! | byte | contents                                  |
//! |------|-------------------------------------------|
//! | 0    | receive status (`RSR`)                    |
//! | 1    | next packet page                          |
//! | 2-3  | total length including header, little-endian |
//!
//! Packets start on 256-byte page boundaries; payload bytes wrap from `PSTOP` back to `PSTART`.

use tracing::{debug, trace, warn};

use crate::crc::multicast_accepts;
use crate::regs::{CR_STOP, ISR_RX, RCR_AB, RCR_AM, RCR_PRO, RSR_RXOK};
use crate::Ne2kDevice;

/// Shortest frame the chip stores; shorter frames are zero-padded (no FCS).
pub const MIN_FRAME_LEN: usize = 60;
/// Largest untagged Ethernet frame without FCS.
pub const MAX_ETH_FRAME_LEN: usize = 1514;
/// Largest frame accepted from the backend (802.1Q tagged, FCS included).
pub const MAX_RX_FRAME_LEN: usize = 1522;
/// Per-packet header stored ahead of the payload.
pub const RX_HEADER_LEN: usize = 4;
/// Space reserved for the trailing CRC when sizing ring allocations.
const RX_CRC_LEN: usize = 4;
/// Free ring space required before a frame is admitted.
pub const RX_MIN_FREE_SPACE: usize = MAX_ETH_FRAME_LEN + RX_CRC_LEN;

const BROADCAST_MAC: [u8; 6] = [0xFF; 6];
const PAGE_MASK: usize = 0xFF;

impl Ne2kDevice {
    /// Whether the ring can take another maximum-size frame.
    ///
    /// False when the receiver is stopped, when the ring registers are not programmed with a
    /// usable ring, or when fewer than [`RX_MIN_FREE_SPACE`] bytes separate the write pointer
    /// (`CURR`) from the read pointer (`BNRY`).
    pub fn can_receive(&self) -> bool {
        if self.cmd & CR_STOP != 0 {
            return false;
        }

        let ring = self.ring_bounds();
        let write = usize::from(self.curr) << 8;
        if !ring.is_valid() || !ring.contains(write) {
            return false;
        }

        let read = usize::from(self.boundary) << 8;
        ring.free_space(write, read) >= RX_MIN_FREE_SPACE
    }

    /// Delivers an inbound frame. Returns whether the frame was stored.
    ///
    /// Rejected frames are dropped silently: no status bit or counter records them.
    pub fn receive(&mut self, frame: &[u8]) -> bool {
        if !self.can_receive() {
            let ring = self.ring_bounds();
            if self.cmd & CR_STOP == 0 && !ring.is_valid() {
                warn!(?ring, "ne2k rx: receive ring not programmed, dropping frame");
            } else {
                debug!(len = frame.len(), "ne2k rx: ring stopped or full, dropping frame");
            }
            return false;
        }
        if frame.len() > MAX_RX_FRAME_LEN {
            debug!(len = frame.len(), "ne2k rx: oversized frame dropped");
            return false;
        }

        let mut padded = [0u8; MIN_FRAME_LEN];
        let frame = if frame.len() < MIN_FRAME_LEN {
            padded[..frame.len()].copy_from_slice(frame);
            &padded[..]
        } else {
            frame
        };

        let mut dst = [0u8; 6];
        dst.copy_from_slice(&frame[..6]);
        if !self.accepts_destination(&dst) {
            trace!(?dst, rcr = self.rcr, "ne2k rx: destination filtered");
            return false;
        }

        let ring = self.ring_bounds();
        let index = usize::from(self.curr) << 8;
        let total_len = frame.len() + RX_HEADER_LEN;
        let next = ring.wrap(index + ((total_len + RX_CRC_LEN + PAGE_MASK) & !PAGE_MASK));

        self.rsr = RSR_RXOK;
        let len = total_len as u16;
        let header = [self.rsr, (next >> 8) as u8, len as u8, (len >> 8) as u8];
        let payload_start = self.mem.write_ring(ring, index, &header);
        self.mem.write_ring(ring, payload_start, frame);
        self.curr = (next >> 8) as u8;

        trace!(
            len = frame.len(),
            page = index >> 8,
            next_page = self.curr,
            "ne2k rx: stored frame"
        );

        self.isr |= ISR_RX;
        self.update_irq();
        true
    }

    fn accepts_destination(&self, dst: &[u8; 6]) -> bool {
        if self.rcr & RCR_PRO != 0 {
            return true;
        }

        if *dst == BROADCAST_MAC {
            return self.rcr & RCR_AB != 0;
        }

        if dst[0] & 0x01 != 0 {
            return self.rcr & RCR_AM != 0 && multicast_accepts(&self.mar, dst);
        }

        // Unicast frames match against the station address as laid out in the PROM mirror
        // (each byte stored twice).
        let prom = self.mem.as_slice();
        dst.iter().enumerate().all(|(i, b)| prom[2 * i] == *b)
    }
}
