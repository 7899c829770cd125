//! Network sink the NIC transmits into.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Network backend to bridge frames from the emulated NIC to the host network stack.
///
/// Devices only push guest → host frames through this trait. Host → guest frames are delivered
/// by calling [`crate::Ne2kDevice::receive`] after polling [`crate::Ne2kDevice::can_receive`].
pub trait NetworkBackend {
    /// Transmit a guest → host Ethernet frame (no FCS).
    fn transmit(&mut self, frame: Vec<u8>);
}

impl NetworkBackend for () {
    fn transmit(&mut self, _frame: Vec<u8>) {}
}

impl<T: NetworkBackend + ?Sized> NetworkBackend for Box<T> {
    fn transmit(&mut self, frame: Vec<u8>) {
        (**self).transmit(frame);
    }
}

impl<B: NetworkBackend> NetworkBackend for Option<B> {
    fn transmit(&mut self, frame: Vec<u8>) {
        if let Some(backend) = self.as_mut() {
            backend.transmit(frame);
        }
    }
}

impl<T: NetworkBackend + ?Sized> NetworkBackend for Rc<RefCell<T>> {
    fn transmit(&mut self, frame: Vec<u8>) {
        self.borrow_mut().transmit(frame);
    }
}

/// Backend that queues transmitted frames for host glue to drain.
#[derive(Debug, Default, Clone)]
pub struct FrameQueue {
    frames: VecDeque<Vec<u8>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop_frame(&mut self) -> Option<Vec<u8>> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl NetworkBackend for FrameQueue {
    fn transmit(&mut self, frame: Vec<u8>) {
        self.frames.push_back(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_frame_queue_collects_frames_in_order() {
        let queue = Rc::new(RefCell::new(FrameQueue::new()));
        let mut backend: Box<dyn NetworkBackend> = Box::new(queue.clone());

        backend.transmit(vec![1, 2, 3]);
        backend.transmit(vec![4]);

        let mut q = queue.borrow_mut();
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop_frame(), Some(vec![1, 2, 3]));
        assert_eq!(q.pop_frame(), Some(vec![4]));
        assert!(q.is_empty());
    }

    #[test]
    fn none_backend_drops_frames() {
        let mut backend: Option<FrameQueue> = None;
        backend.transmit(vec![0xAA]);
        assert!(backend.is_none());
    }
}
