//! Torrent metainfo assembly.
//!
//! Builds a single-file, web-seeded (BEP-19) metainfo dictionary for a
//! stored archive. The piece digests come from [`crate::hash::PieceHasher`]
//! run over the exact archive byte stream.

use crate::bencode::BencodeValue;
use crate::error::{Error, Result};
use crate::hash::PIECE_DIGEST_LEN;
use bytes::Bytes;

/// The `info` sub-dictionary of a single-file torrent.
#[derive(Clone, Debug)]
pub struct TorrentInfo {
    /// Total archive size in bytes.
    pub length: u64,
    /// Torrent name; also the final segment of the web-seed URL.
    pub name: String,
    /// Piece length in bytes.
    pub piece_length: u64,
    /// Concatenated 20-byte SHA-1 piece digests.
    pub pieces: Bytes,
}

/// A complete metainfo file.
#[derive(Clone, Debug)]
pub struct TorrentMeta {
    /// Tracker announce URL.
    pub announce: String,
    /// Producer identifier.
    pub created_by: String,
    /// Unix timestamp (seconds) at generation time.
    pub creation_date: i64,
    /// Single-file info dictionary.
    pub info: TorrentInfo,
    /// Web-seed URL pointing at the stored archive.
    pub web_seed: String,
}

impl TorrentMeta {
    /// Check the metainfo invariants and bencode the dictionary.
    ///
    /// The checks guard the contract between the pipeline and the hasher: a
    /// piece count that disagrees with the archive length, a digest blob of
    /// the wrong size, or a web-seed URL that does not end in the torrent
    /// name all indicate a bug upstream and are fatal.
    pub fn to_bencode(&self) -> Result<Vec<u8>> {
        if self.info.piece_length == 0 {
            return Err(Error::InvariantViolation(
                "piece length must be positive".to_string(),
            ));
        }

        if self.info.pieces.len() % PIECE_DIGEST_LEN != 0 {
            return Err(Error::InvariantViolation(format!(
                "piece digest blob length {} is not a multiple of {}",
                self.info.pieces.len(),
                PIECE_DIGEST_LEN
            )));
        }

        let piece_count = (self.info.pieces.len() / PIECE_DIGEST_LEN) as u64;
        let expected = self.info.length.div_ceil(self.info.piece_length);
        if piece_count != expected {
            return Err(Error::InvariantViolation(format!(
                "piece count {piece_count} does not cover archive length {} with piece length {} \
                 (expected {expected})",
                self.info.length, self.info.piece_length
            )));
        }

        if !self.web_seed.ends_with(&self.info.name) {
            return Err(Error::InvariantViolation(format!(
                "web seed {:?} does not end with torrent name {:?}",
                self.web_seed, self.info.name
            )));
        }

        let length = i64::try_from(self.info.length).map_err(|_| {
            Error::InvariantViolation(format!("archive length {} overflows i64", self.info.length))
        })?;
        let piece_length = i64::try_from(self.info.piece_length).map_err(|_| {
            Error::InvariantViolation(format!(
                "piece length {} overflows i64",
                self.info.piece_length
            ))
        })?;

        let info = BencodeValue::dict()
            .insert("length", BencodeValue::integer(length))
            .insert("name", BencodeValue::string(&self.info.name))
            .insert("piece length", BencodeValue::integer(piece_length))
            .insert("pieces", BencodeValue::Bytes(self.info.pieces.to_vec()));

        let meta = BencodeValue::dict()
            .insert("announce", BencodeValue::string(&self.announce))
            .insert("created by", BencodeValue::string(&self.created_by))
            .insert("creation date", BencodeValue::integer(self.creation_date))
            .insert("info", info)
            .insert(
                "url-list",
                BencodeValue::list().push(BencodeValue::string(&self.web_seed)),
            );

        Ok(meta.encode())
    }
}
