use crate::error::Result;

/// A byte-oriented bus endpoint as seen from the host.
///
/// One call is one bus transaction: [`read_chunk`](Bus::read_chunk) clocks
/// in exactly `dst.len()` bytes and [`write_chunk`](Bus::write_chunk) clocks
/// out exactly `src.len()` bytes. Implementations report failures without
/// retrying — retry policy lives in the layers above, which know whether a
/// failed transaction is recoverable.
///
/// The trait never interprets bus-specific addressing; slave selection,
/// register addressing, and clock configuration belong to the implementor.
pub trait Bus: Send {
    /// Perform one read transaction filling all of `dst`.
    fn read_chunk(&mut self, dst: &mut [u8]) -> Result<()>;

    /// Perform one write transaction sending all of `src`.
    fn write_chunk(&mut self, src: &[u8]) -> Result<()>;

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str {
        "bus"
    }
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn read_chunk(&mut self, dst: &mut [u8]) -> Result<()> {
        (**self).read_chunk(dst)
    }

    fn write_chunk(&mut self, src: &[u8]) -> Result<()> {
        (**self).write_chunk(src)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<B: Bus + ?Sized> Bus for Box<B> {
    fn read_chunk(&mut self, dst: &mut [u8]) -> Result<()> {
        (**self).read_chunk(dst)
    }

    fn write_chunk(&mut self, src: &[u8]) -> Result<()> {
        (**self).write_chunk(src)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
