/// Transmit ring buffer
///
/// Backs the interrupt-driven send path of a serial port. The producer side
/// appends whole chunks with [`TxRing::push`]; the transmit-ready interrupt
/// drains one byte at a time with [`TxRing::pop`]. A push is a multi-step
/// index update, so when producer and consumer run in different contexts the
/// operation must be bracketed by a critical section (see
/// [`SharedLink`](crate::link::SharedLink)).
///
/// Invariant: `len == (put - pop) mod N` at all times.
pub struct TxRing<const N: usize> {
    buf: [u8; N],
    put_at: usize,
    pop_at: usize,
    used: usize,
}

/// Returned when a chunk does not fit in the remaining buffer space.
///
/// The buffer is left untouched; the caller may retry once the interrupt
/// path has drained some bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOverflow;

impl<const N: usize> TxRing<N> {
    /// Creates an empty ring.
    ///
    /// Declared const so rings can live in `static` contexts.
    pub const fn new() -> Self {
        TxRing {
            buf: [0u8; N],
            put_at: 0,
            pop_at: 0,
            used: 0,
        }
    }

    /// Number of bytes currently queued.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Remaining space in bytes.
    pub fn free(&self) -> usize {
        N - self.used
    }

    /// Appends `bytes` to the ring.
    ///
    /// Fails atomically: if the whole chunk does not fit, nothing is copied
    /// and the indices are unchanged.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), TxOverflow> {
        if bytes.len() > self.free() {
            return Err(TxOverflow);
        }
        for &b in bytes {
            self.buf[self.put_at] = b;
            self.put_at = (self.put_at + 1) % N;
        }
        self.used += bytes.len();
        Ok(())
    }

    /// Removes and returns the oldest byte, if any.
    pub fn pop(&mut self) -> Option<u8> {
        if self.used == 0 {
            return None;
        }
        let b = self.buf[self.pop_at];
        self.pop_at = (self.pop_at + 1) % N;
        self.used -= 1;
        Some(b)
    }

    /// Drops all queued bytes and resets both indices.
    pub fn clear(&mut self) {
        self.put_at = 0;
        self.pop_at = 0;
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_round_trip() {
        let mut ring: TxRing<8> = TxRing::new();
        ring.push(b"abc").unwrap();
        ring.push(b"de").unwrap();
        let out: Vec<u8> = core::iter::from_fn(|| ring.pop()).collect();
        assert_eq!(out, b"abcde");
        assert!(ring.is_empty());
    }

    #[test]
    fn full_push_fails_without_mutation() {
        let mut ring: TxRing<4> = TxRing::new();
        ring.push(b"ab").unwrap();
        assert_eq!(ring.push(b"cde"), Err(TxOverflow));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.pop(), Some(b'a'));
        assert_eq!(ring.pop(), Some(b'b'));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn exact_fill_is_accepted() {
        let mut ring: TxRing<4> = TxRing::new();
        ring.push(b"wxyz").unwrap();
        assert_eq!(ring.free(), 0);
        assert_eq!(ring.push(b"!"), Err(TxOverflow));
    }

    #[test]
    fn wraps_around_the_buffer_end() {
        let mut ring: TxRing<4> = TxRing::new();
        ring.push(b"abc").unwrap();
        assert_eq!(ring.pop(), Some(b'a'));
        assert_eq!(ring.pop(), Some(b'b'));
        ring.push(b"def").unwrap();
        let out: Vec<u8> = core::iter::from_fn(|| ring.pop()).collect();
        assert_eq!(out, b"cdef");
    }

    #[test]
    fn clear_resets_state() {
        let mut ring: TxRing<4> = TxRing::new();
        ring.push(b"ab").unwrap();
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 4);
        assert_eq!(ring.pop(), None);
    }
}
