//! Test-side ZIP and torrent re-parsing.
//!
//! Walks a produced archive back to front (EOCD -> central directory ->
//! local headers) the way a conformant reader does, asserting structural
//! consistency as it goes.
//!
//! Note: each test file compiles common/ separately, so not every helper is
//! used by every binary.
#![allow(dead_code)]

use sha1::{Digest, Sha1};

/// One entry recovered from the central directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedEntry {
    pub name: String,
    pub crc32: u32,
    pub size: u32,
    pub local_header_offset: u32,
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Parse and structurally validate an archive, returning its entries.
///
/// Asserts: EOCD arithmetic covers the whole file, every central-directory
/// entry points at a matching local header, bodies re-hash to the recorded
/// CRC, and each data descriptor repeats the directory values.
pub fn parse_archive(bytes: &[u8]) -> Vec<ParsedEntry> {
    assert!(bytes.len() >= 22, "archive shorter than an EOCD");

    // No archive comment is ever written, so the EOCD is the last 22 bytes.
    let eocd_at = bytes.len() - 22;
    assert_eq!(le_u32(bytes, eocd_at), 0x0605_4b50, "EOCD signature");

    let entry_count = le_u16(bytes, eocd_at + 10) as usize;
    assert_eq!(
        le_u16(bytes, eocd_at + 8) as usize,
        entry_count,
        "per-disk and total entry counts"
    );
    let cd_size = le_u32(bytes, eocd_at + 12) as usize;
    let cd_offset = le_u32(bytes, eocd_at + 16) as usize;
    assert_eq!(le_u16(bytes, eocd_at + 20), 0, "comment length");
    assert_eq!(
        cd_offset + cd_size + 22,
        bytes.len(),
        "EOCD arithmetic covers the archive"
    );

    let mut entries = Vec::new();
    let mut at = cd_offset;
    for _ in 0..entry_count {
        assert_eq!(le_u32(bytes, at), 0x0201_4b50, "central directory signature");
        assert_eq!(le_u16(bytes, at + 8), 0x0008, "data descriptor flag");
        assert_eq!(le_u16(bytes, at + 10), 0, "store method");

        let crc32 = le_u32(bytes, at + 16);
        let compressed = le_u32(bytes, at + 20);
        let uncompressed = le_u32(bytes, at + 24);
        assert_eq!(compressed, uncompressed, "store method sizes match");

        let name_len = le_u16(bytes, at + 28) as usize;
        assert_eq!(le_u16(bytes, at + 30), 0, "extra field length");
        assert_eq!(le_u16(bytes, at + 32), 0, "comment length");
        let local_header_offset = le_u32(bytes, at + 42);
        let name = String::from_utf8(bytes[at + 46..at + 46 + name_len].to_vec())
            .expect("entry name is UTF-8");

        entries.push(ParsedEntry {
            name,
            crc32,
            size: uncompressed,
            local_header_offset,
        });
        at += 46 + name_len;
    }
    assert_eq!(at, cd_offset + cd_size, "central directory size");

    // Cross-check every entry against its local record.
    for entry in &entries {
        let h = entry.local_header_offset as usize;
        assert_eq!(le_u32(bytes, h), 0x0403_4b50, "local header signature");
        assert_eq!(le_u16(bytes, h + 6), 0x0008, "local data descriptor flag");

        let name_len = le_u16(bytes, h + 26) as usize;
        assert_eq!(
            &bytes[h + 30..h + 30 + name_len],
            entry.name.as_bytes(),
            "local and directory names match"
        );

        let body_start = h + 30 + name_len;
        let body = &bytes[body_start..body_start + entry.size as usize];
        assert_eq!(crc32fast::hash(body), entry.crc32, "body CRC matches");

        let descriptor_at = body_start + entry.size as usize;
        assert_eq!(le_u32(bytes, descriptor_at), entry.crc32, "descriptor CRC");
        assert_eq!(le_u32(bytes, descriptor_at + 4), entry.size, "descriptor compressed size");
        assert_eq!(le_u32(bytes, descriptor_at + 8), entry.size, "descriptor uncompressed size");
    }

    entries
}

/// Assert the torrent piece digests are the SHA-1s of successive
/// piece-length windows of the archive.
pub fn verify_pieces(archive: &[u8], piece_length: usize, pieces: &[u8]) {
    let count = archive.len().div_ceil(piece_length);
    assert_eq!(pieces.len(), count * 20, "piece digest blob length");

    for (i, window) in archive.chunks(piece_length).enumerate() {
        let digest = Sha1::digest(window);
        assert_eq!(
            &pieces[i * 20..(i + 1) * 20],
            digest.as_slice(),
            "piece {i} digest"
        );
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Extract a byte-string value from a bencoded dictionary.
pub fn bencode_bytes<'a>(torrent: &'a [u8], key: &str) -> &'a [u8] {
    let marker = format!("{}:{}", key.len(), key);
    let at = find(torrent, marker.as_bytes()).expect("bencode key present") + marker.len();

    let colon = torrent[at..]
        .iter()
        .position(|&b| b == b':')
        .expect("byte-string length prefix");
    let len: usize = std::str::from_utf8(&torrent[at..at + colon])
        .unwrap()
        .parse()
        .unwrap();
    let start = at + colon + 1;
    &torrent[start..start + len]
}

/// Extract an integer value from a bencoded dictionary.
pub fn bencode_int(torrent: &[u8], key: &str) -> i64 {
    let marker = format!("{}:{}i", key.len(), key);
    let at = find(torrent, marker.as_bytes()).expect("bencode key present") + marker.len();

    let end = torrent[at..]
        .iter()
        .position(|&b| b == b'e')
        .expect("integer terminator");
    std::str::from_utf8(&torrent[at..at + end])
        .unwrap()
        .parse()
        .unwrap()
}
