/// Grow-only byte buffer backing the message paths.
///
/// Capacity never shrinks while the engine runs, so repeated large
/// messages settle into a steady state with no reallocation. Callers
/// address only bytes below the high-water mark; `ensure` first.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    buf: Vec<u8>,
}

impl MessageBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Grow so at least `len` bytes are addressable. New bytes are zero;
    /// existing bytes are untouched.
    pub fn ensure(&mut self, len: usize) {
        if self.buf.len() < len {
            self.buf.resize(len, 0);
        }
    }

    /// Addressable length (the high-water mark, not a message length).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True before the first `ensure`.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View of the addressable bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable view of the addressable bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grows_and_zero_fills() {
        let mut buf = MessageBuffer::new();
        assert!(buf.is_empty());
        buf.ensure(8);
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.as_slice(), &[0u8; 8]);
    }

    #[test]
    fn test_never_shrinks() {
        let mut buf = MessageBuffer::new();
        buf.ensure(16);
        buf.as_mut_slice()[15] = 0xAB;
        buf.ensure(4);
        assert_eq!(buf.len(), 16);
        assert_eq!(buf.as_slice()[15], 0xAB);
    }

    #[test]
    fn test_growth_keeps_existing_bytes() {
        let mut buf = MessageBuffer::new();
        buf.ensure(4);
        buf.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
        buf.ensure(6);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 0, 0]);
    }
}
