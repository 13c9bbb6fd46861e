/// Number of bus transactions needed to move `remaining` bytes in chunks of
/// `chunk_space` usable bytes each.
///
/// Always at least 1: a logical transfer with nothing left still performs
/// one transaction so the device sees the access. A `chunk_space` of zero
/// means the transport is unbounded and everything fits in one chunk.
pub fn chunk_count(remaining: usize, chunk_space: usize) -> usize {
    if remaining == 0 || chunk_space == 0 {
        return 1;
    }
    remaining.div_ceil(chunk_space)
}
