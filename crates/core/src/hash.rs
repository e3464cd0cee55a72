//! Incremental hashing for archive entries and torrent pieces.

use bytes::Bytes;
use sha1::{Digest, Sha1};

/// Length of a single torrent piece digest.
pub const PIECE_DIGEST_LEN: usize = 20;

/// Incremental IEEE CRC-32 over a streamed input.
///
/// Results are independent of how the input is chunked.
pub struct Crc32(crc32fast::Hasher);

impl Crc32 {
    /// Create a fresh CRC state.
    pub fn new() -> Self {
        Self(crc32fast::Hasher::new())
    }

    /// Update the CRC with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the checksum.
    pub fn finalize(self) -> u32 {
        self.0.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Finalized torrent piece digests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PieceDigests {
    /// Concatenated 20-byte SHA-1 digests, in piece order.
    pub pieces: Bytes,
    /// Number of pieces.
    pub count: usize,
}

/// Accumulates a byte stream into fixed-size pieces and hashes each one.
///
/// The pending buffer is strictly shorter than the piece length between
/// calls; `finalize` hashes the remainder as a final short piece. Output is
/// independent of how `feed` is chunked.
pub struct PieceHasher {
    piece_length: usize,
    pending: Vec<u8>,
    digests: Vec<u8>,
    count: usize,
}

impl PieceHasher {
    /// Create a hasher for the given piece length.
    ///
    /// # Panics
    ///
    /// Panics if `piece_length` is zero. Configuration validation rejects
    /// this before a hasher is ever constructed.
    pub fn new(piece_length: usize) -> Self {
        assert!(piece_length > 0, "piece_length must be positive");
        Self {
            piece_length,
            pending: Vec::with_capacity(piece_length),
            digests: Vec::new(),
            count: 0,
        }
    }

    /// Feed bytes into the hasher, emitting a digest per completed piece.
    pub fn feed(&mut self, mut data: &[u8]) {
        if !self.pending.is_empty() {
            let need = self.piece_length - self.pending.len();
            let take = need.min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.pending.len() == self.piece_length {
                let digest: [u8; PIECE_DIGEST_LEN] = Sha1::digest(&self.pending).into();
                self.digests.extend_from_slice(&digest);
                self.count += 1;
                self.pending.clear();
            }
        }

        // Full pieces straight out of the input, no copy through pending.
        while data.len() >= self.piece_length {
            let digest: [u8; PIECE_DIGEST_LEN] = Sha1::digest(&data[..self.piece_length]).into();
            self.digests.extend_from_slice(&digest);
            self.count += 1;
            data = &data[self.piece_length..];
        }

        self.pending.extend_from_slice(data);
    }

    /// Hash any pending remainder as the final short piece and return the
    /// concatenated digests.
    pub fn finalize(mut self) -> PieceDigests {
        if !self.pending.is_empty() {
            let digest: [u8; PIECE_DIGEST_LEN] = Sha1::digest(&self.pending).into();
            self.digests.extend_from_slice(&digest);
            self.count += 1;
        }
        PieceDigests {
            pieces: Bytes::from(self.digests),
            count: self.count,
        }
    }
}
