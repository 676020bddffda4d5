//! Fixed-capacity byte FIFO fed one byte at a time from a receive interrupt.
//!
//! A full buffer rejects new bytes instead of overwriting old ones: the sender gets no
//! backpressure and the dropped byte is lost.

use heapless::Vec;

/// Outcome of [`RingBuffer::push`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Push {
    Accepted,
    Dropped,
}

pub struct RingBuffer<const N: usize> {
    buf: [u8; N],
    write_index: usize,
    read_index: usize,
    count: usize,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            write_index: 0,
            read_index: 0,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Appends `byte`, or drops it when the buffer already holds `N` bytes.
    pub fn push(&mut self, byte: u8) -> Push {
        if self.count == N {
            return Push::Dropped;
        }
        self.buf[self.write_index] = byte;
        self.write_index = (self.write_index + 1) % N;
        self.count += 1;
        Push::Accepted
    }

    /// Removes the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.count == 0 {
            return None;
        }
        let byte = self.buf[self.read_index];
        self.read_index = (self.read_index + 1) % N;
        self.count -= 1;
        Some(byte)
    }

    /// Copies out every buffered byte in arrival order and resets the buffer.
    pub fn drain(&mut self) -> Vec<u8, N> {
        let mut out = Vec::new();
        let (first, second) = self.segments();
        // Both segments together never exceed N bytes.
        let _ = out.extend_from_slice(first);
        let _ = out.extend_from_slice(second);
        self.reset();
        out
    }

    /// Clears all indices and zeroes the storage.
    pub fn reset(&mut self) {
        self.buf = [0; N];
        self.write_index = 0;
        self.read_index = 0;
        self.count = 0;
    }

    fn segments(&self) -> (&[u8], &[u8]) {
        let end = self.read_index + self.count;
        if end <= N {
            (&self.buf[self.read_index..end], &[])
        } else {
            (&self.buf[self.read_index..], &self.buf[..end - N])
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut ring = RingBuffer::<8>::new();
        for byte in b"hello" {
            assert_eq!(ring.push(*byte), Push::Accepted);
        }
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.pop(), Some(b'h'));
        assert_eq!(ring.pop(), Some(b'e'));
        assert_eq!(ring.drain().as_slice(), b"llo");
        assert!(ring.is_empty());
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_overflow_drops_newest() {
        let mut ring = RingBuffer::<4>::new();
        for byte in b"abcd" {
            ring.push(*byte);
        }
        assert_eq!(ring.push(b'e'), Push::Dropped);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.drain().as_slice(), b"abcd");
    }

    #[test]
    fn test_drain_wrapped() {
        let mut ring = RingBuffer::<4>::new();
        for byte in b"abc" {
            ring.push(*byte);
        }
        assert_eq!(ring.pop(), Some(b'a'));
        assert_eq!(ring.pop(), Some(b'b'));
        for byte in b"def" {
            assert_eq!(ring.push(*byte), Push::Accepted);
        }
        assert_eq!(ring.drain().as_slice(), b"cdef");
    }

    #[test]
    fn test_full_capacity_and_empty_drain() {
        let mut ring = RingBuffer::<600>::new();
        assert!(ring.drain().is_empty());
        for i in 0..600 {
            ring.push(i as u8);
        }
        assert_eq!(ring.push(0xff), Push::Dropped);
        assert_eq!(ring.len(), ring.capacity());
        let drained = ring.drain();
        assert_eq!(drained.len(), 600);
        assert!(drained.iter().enumerate().all(|(i, b)| *b == i as u8));
    }

    #[test]
    fn test_reset() {
        let mut ring = RingBuffer::<4>::new();
        ring.push(1);
        ring.push(2);
        ring.reset();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.pop(), None);
        ring.push(3);
        assert_eq!(ring.pop(), Some(3));
    }
}
