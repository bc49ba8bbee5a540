//! Record geometry of a FITS stream.

/// Headers and payload groups both end on a multiple of this many bytes.
pub const BLOCK_SIZE: usize = 2880;

/// Length of one header card.
pub const CARD_SIZE: usize = 80;

pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Fill bytes between `content_len` bytes of content and the next block
/// boundary. Zero when the content already ends on a boundary.
pub const fn padding_len(content_len: usize) -> usize {
    match content_len % BLOCK_SIZE {
        0 => 0,
        used => BLOCK_SIZE - used,
    }
}
