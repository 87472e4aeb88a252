//! Feed-side sizing constants.

/// Largest datagram the receive loop will accept (64 KiB).
pub const MAX_PACKET_SIZE: usize = 65536;

/// Smallest frame any known layout can decode.
pub const MIN_FRAME_LEN: usize = 64;

/// Byte offset of the NUL-terminated symbol field, shared by all layouts.
pub const SYMBOL_OFFSET: usize = 56;

/// Longest symbol carried on the wire (15 bytes + NUL terminator).
pub const MAX_SYMBOL_LEN: usize = 15;

/// Receive timeout so the listener notices a stop request promptly.
pub const RECV_POLL_MS: u64 = 100;
