//! ZIP record encoders for single-pass streaming archives.
//!
//! The archive is produced with general-purpose bit 3 set (data-descriptor
//! mode): entry CRCs and sizes are not known when the local header goes out,
//! so the header carries zero placeholders and the real values follow the
//! body in a 12-byte descriptor. Entries use the store method; no
//! compression is applied.
//!
//! All fields are 32-bit (no ZIP64). Rather than wrapping silently, every
//! encoder returns `ArchiveTooLarge` when a value no longer fits its field.

use crate::error::{Error, Result};

const LOCAL_FILE_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_DIRECTORY_SIG: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIG: u32 = 0x0605_4b50;

/// Version made-by / needed-to-extract (2.0, data descriptors + store).
const ZIP_VERSION: u16 = 20;

/// General-purpose flag bit 3: sizes and CRC live in the data descriptor.
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Compression method 0 (store).
const METHOD_STORE: u16 = 0;

/// Fixed length of a local file header, before the name.
pub const LOCAL_HEADER_LEN: usize = 30;

/// Length of a data descriptor (no leading signature).
pub const DATA_DESCRIPTOR_LEN: usize = 12;

/// Fixed length of a central directory entry, before the name.
pub const CENTRAL_ENTRY_LEN: usize = 46;

/// Fixed length of the end-of-central-directory record, before the comment.
pub const EOCD_LEN: usize = 22;

/// Metadata for one archived file, built incrementally by the pipeline and
/// consumed once by the central directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// Entry name: the file's relative path within the repository, UTF-8,
    /// forward slashes.
    pub name: String,
    /// IEEE CRC-32 over the raw file bytes.
    pub crc32: u32,
    /// Byte count; compressed and uncompressed sizes are equal (store).
    pub size: u32,
    /// Archive offset at which this entry's local header begins.
    pub local_header_offset: u32,
}

fn name_len(name: &str) -> Result<u16> {
    u16::try_from(name.len())
        .map_err(|_| Error::ArchiveTooLarge(format!("entry name exceeds 65535 bytes: {name:?}")))
}

fn fit_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::ArchiveTooLarge(format!("{what} {value} exceeds 32-bit ZIP field")))
}

/// Encode a local file header for `name`.
///
/// CRC and both size fields are zero placeholders; the data descriptor
/// emitted after the body carries the real values.
pub fn local_file_header(name: &str) -> Result<Vec<u8>> {
    let name_len = name_len(name)?;

    let mut out = Vec::with_capacity(LOCAL_HEADER_LEN + name.len());
    out.extend_from_slice(&LOCAL_FILE_HEADER_SIG.to_le_bytes());
    out.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version needed to extract
    out.extend_from_slice(&FLAG_DATA_DESCRIPTOR.to_le_bytes());
    out.extend_from_slice(&METHOD_STORE.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // mod time
    out.extend_from_slice(&0u16.to_le_bytes()); // mod date
    out.extend_from_slice(&0u32.to_le_bytes()); // crc-32 placeholder
    out.extend_from_slice(&0u32.to_le_bytes()); // compressed size placeholder
    out.extend_from_slice(&0u32.to_le_bytes()); // uncompressed size placeholder
    out.extend_from_slice(&name_len.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra field length
    out.extend_from_slice(name.as_bytes());
    Ok(out)
}

/// Encode the 12-byte data descriptor trailing a file body.
///
/// The optional `0x08074b50` descriptor signature is not used; readers that
/// scan for it also accept the bare form.
pub fn data_descriptor(crc32: u32, size: u32) -> [u8; DATA_DESCRIPTOR_LEN] {
    let mut out = [0u8; DATA_DESCRIPTOR_LEN];
    out[0..4].copy_from_slice(&crc32.to_le_bytes());
    out[4..8].copy_from_slice(&size.to_le_bytes()); // compressed
    out[8..12].copy_from_slice(&size.to_le_bytes()); // uncompressed
    out
}

/// Append a central directory entry for `entry` to `out`.
///
/// `comment` is accepted for completeness; this revision always passes an
/// empty one.
pub fn central_directory_entry(entry: &FileEntry, comment: &str, out: &mut Vec<u8>) -> Result<()> {
    let name_len = name_len(&entry.name)?;
    let comment_len = u16::try_from(comment.len())
        .map_err(|_| Error::ArchiveTooLarge("entry comment exceeds 65535 bytes".to_string()))?;

    out.reserve(CENTRAL_ENTRY_LEN + entry.name.len() + comment.len());
    out.extend_from_slice(&CENTRAL_DIRECTORY_SIG.to_le_bytes());
    out.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version made by
    out.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version needed to extract
    out.extend_from_slice(&FLAG_DATA_DESCRIPTOR.to_le_bytes());
    out.extend_from_slice(&METHOD_STORE.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // mod time
    out.extend_from_slice(&0u16.to_le_bytes()); // mod date
    out.extend_from_slice(&entry.crc32.to_le_bytes());
    out.extend_from_slice(&entry.size.to_le_bytes()); // compressed
    out.extend_from_slice(&entry.size.to_le_bytes()); // uncompressed
    out.extend_from_slice(&name_len.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra field length
    out.extend_from_slice(&comment_len.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number start
    out.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
    out.extend_from_slice(&0u32.to_le_bytes()); // external attributes
    out.extend_from_slice(&entry.local_header_offset.to_le_bytes());
    out.extend_from_slice(entry.name.as_bytes());
    out.extend_from_slice(comment.as_bytes());
    Ok(())
}

/// Append the end-of-central-directory record to `out`.
pub fn end_of_central_directory(
    entry_count: usize,
    cd_size: u64,
    cd_offset: u64,
    comment: &str,
    out: &mut Vec<u8>,
) -> Result<()> {
    let entry_count = u16::try_from(entry_count).map_err(|_| {
        Error::ArchiveTooLarge(format!("entry count {entry_count} exceeds 16-bit ZIP field"))
    })?;
    let cd_size = fit_u32(cd_size, "central directory size")?;
    let cd_offset = fit_u32(cd_offset, "central directory offset")?;
    let comment_len = u16::try_from(comment.len())
        .map_err(|_| Error::ArchiveTooLarge("archive comment exceeds 65535 bytes".to_string()))?;

    out.reserve(EOCD_LEN + comment.len());
    out.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIG.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number
    out.extend_from_slice(&0u16.to_le_bytes()); // central directory start disk
    out.extend_from_slice(&entry_count.to_le_bytes()); // entries on this disk
    out.extend_from_slice(&entry_count.to_le_bytes()); // total entries
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&comment_len.to_le_bytes());
    out.extend_from_slice(comment.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_header_layout() {
        let header = local_file_header("a.txt").unwrap();
        assert_eq!(header.len(), 35);

        assert_eq!(&header[0..4], &[0x50, 0x4b, 0x03, 0x04]);
        assert_eq!(u16::from_le_bytes([header[4], header[5]]), 20);
        assert_eq!(u16::from_le_bytes([header[6], header[7]]), 0x0008);
        assert_eq!(u16::from_le_bytes([header[8], header[9]]), 0);
        // CRC and size placeholders are zero.
        assert_eq!(&header[14..26], &[0u8; 12]);
        assert_eq!(u16::from_le_bytes([header[26], header[27]]), 5);
        assert_eq!(u16::from_le_bytes([header[28], header[29]]), 0);
        assert_eq!(&header[30..], b"a.txt");
    }

    #[test]
    fn data_descriptor_layout() {
        let descriptor = data_descriptor(0xD893_2AAC, 2);
        assert_eq!(descriptor.len(), 12);
        assert_eq!(&descriptor[0..4], &0xD893_2AACu32.to_le_bytes());
        assert_eq!(&descriptor[4..8], &2u32.to_le_bytes());
        assert_eq!(&descriptor[8..12], &2u32.to_le_bytes());
    }

    #[test]
    fn central_entry_layout() {
        let entry = FileEntry {
            name: "b.bin".to_string(),
            crc32: 0x1234_5678,
            size: 3,
            local_header_offset: 49,
        };
        let mut out = Vec::new();
        central_directory_entry(&entry, "", &mut out).unwrap();

        assert_eq!(out.len(), 51);
        assert_eq!(&out[0..4], &[0x50, 0x4b, 0x01, 0x02]);
        assert_eq!(u16::from_le_bytes([out[8], out[9]]), 0x0008);
        assert_eq!(u32::from_le_bytes(out[16..20].try_into().unwrap()), entry.crc32);
        assert_eq!(u32::from_le_bytes(out[20..24].try_into().unwrap()), 3);
        assert_eq!(u32::from_le_bytes(out[24..28].try_into().unwrap()), 3);
        assert_eq!(u16::from_le_bytes([out[28], out[29]]), 5);
        assert_eq!(u32::from_le_bytes(out[42..46].try_into().unwrap()), 49);
        assert_eq!(&out[46..], b"b.bin");
    }

    #[test]
    fn eocd_layout() {
        let mut out = Vec::new();
        end_of_central_directory(2, 102, 99, "", &mut out).unwrap();

        assert_eq!(out.len(), 22);
        assert_eq!(&out[0..4], &[0x50, 0x4b, 0x05, 0x06]);
        assert_eq!(u16::from_le_bytes([out[8], out[9]]), 2);
        assert_eq!(u16::from_le_bytes([out[10], out[11]]), 2);
        assert_eq!(u32::from_le_bytes(out[12..16].try_into().unwrap()), 102);
        assert_eq!(u32::from_le_bytes(out[16..20].try_into().unwrap()), 99);
        assert_eq!(u16::from_le_bytes([out[20], out[21]]), 0);
    }

    #[test]
    fn eocd_rejects_overflowing_offset() {
        let mut out = Vec::new();
        let err =
            end_of_central_directory(1, 100, u64::from(u32::MAX) + 1, "", &mut out).unwrap_err();
        assert!(matches!(err, Error::ArchiveTooLarge(_)));
    }

    #[test]
    fn oversized_name_is_rejected() {
        let name = "x".repeat(usize::from(u16::MAX) + 1);
        assert!(matches!(
            local_file_header(&name),
            Err(Error::ArchiveTooLarge(_))
        ));
    }
}
