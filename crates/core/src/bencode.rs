//! Bencode encoding for torrent metainfo.
//!
//! Implements the encoding subset needed to produce `.torrent` files.
//! Dictionary keys are held in a `BTreeMap` keyed by raw bytes, so they
//! serialize in the byte order the format requires.

use std::collections::BTreeMap;

/// A bencoded value.
#[derive(Debug, Clone)]
pub enum BencodeValue {
    Integer(i64),
    Bytes(Vec<u8>),
    List(Vec<BencodeValue>),
    Dict(BTreeMap<Vec<u8>, BencodeValue>),
}

impl BencodeValue {
    /// Create a string value from a &str.
    #[inline]
    pub fn string(s: &str) -> Self {
        Self::Bytes(s.as_bytes().to_vec())
    }

    /// Create an integer value.
    #[inline]
    pub fn integer(i: i64) -> Self {
        Self::Integer(i)
    }

    /// Create an empty list.
    #[inline]
    pub fn list() -> Self {
        Self::List(Vec::new())
    }

    /// Create an empty dict.
    #[inline]
    pub fn dict() -> Self {
        Self::Dict(BTreeMap::new())
    }

    /// Add an item to a list (builder pattern).
    #[inline]
    pub fn push(mut self, value: BencodeValue) -> Self {
        if let Self::List(ref mut list) = self {
            list.push(value);
        }
        self
    }

    /// Insert a key-value pair into a dict (builder pattern).
    #[inline]
    pub fn insert(mut self, key: &str, value: BencodeValue) -> Self {
        if let Self::Dict(ref mut dict) = self {
            dict.insert(key.as_bytes().to_vec(), value);
        }
        self
    }

    /// Encode to bencoded bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encode into an existing buffer.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Integer(i) => {
                buf.push(b'i');
                buf.extend_from_slice(i.to_string().as_bytes());
                buf.push(b'e');
            }
            Self::Bytes(bytes) => {
                buf.extend_from_slice(bytes.len().to_string().as_bytes());
                buf.push(b':');
                buf.extend_from_slice(bytes);
            }
            Self::List(list) => {
                buf.push(b'l');
                for item in list {
                    item.encode_into(buf);
                }
                buf.push(b'e');
            }
            Self::Dict(dict) => {
                buf.push(b'd');
                // BTreeMap keeps keys in raw byte order.
                for (key, value) in dict {
                    buf.extend_from_slice(key.len().to_string().as_bytes());
                    buf.push(b':');
                    buf.extend_from_slice(key);
                    value.encode_into(buf);
                }
                buf.push(b'e');
            }
        }
    }
}
