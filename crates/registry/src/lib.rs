//! Hugging Face-style registry client for zipseed.
//!
//! Two operations back the archive pipeline: listing the files of a
//! repository revision (tree endpoint) and opening a file's body as a byte
//! stream (resolve endpoint).

pub mod client;
pub mod error;

pub use client::{FileStream, RegistryClient, RepoFile, RepoId};
pub use error::{RegistryError, RegistryResult};
