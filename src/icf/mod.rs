//! Installation Configuration File (ICF) container.
//!
//! # Layout
//! A 64-byte [`IcfHeader`] followed by `entry_count` 64-byte [`IcfEntry`]
//! records.  On disk the whole file is usually passed through
//! [`crate::crypto`] with an externally supplied key and IV.
//!
//! # Integrity
//! - `file_checksum` = CRC-32 of every byte after the field itself.
//! - `entry_checksum` = XOR of the CRC-32 of each entry that has both
//!   enable bits set.
//! - `total_size` = `64 + entry_count * 64` = file length.
//!
//! Parsing checks all three and fails on the first mismatch.  Nothing is
//! ever repaired.

mod records;

pub use records::{
    EntryType, IcfEntry, IcfHeader, ENTRY_ENABLED, ENTRY_ENABLED_1, ENTRY_ENABLED_2, ENTRY_SIZE,
    HEADER_SIZE,
};

use std::fmt;
use thiserror::Error;

use crate::checksum::{body_checksum, checksum, stamp_checksum, stored_checksum};
use crate::crypto::{self, CryptoError, KEY_LEN};
use crate::layout::{decode, encode, FixedStr, LayoutError};

/// Which checksum of the file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumScope {
    File,
    Entries,
}

impl fmt::Display for ChecksumScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumScope::File    => f.write_str("file"),
            ChecksumScope::Entries => f.write_str("entry set"),
        }
    }
}

#[derive(Error, Debug)]
pub enum IcfError {
    #[error("ICF data is {len} bytes, at least 64 expected")]
    TooShort { len: usize },
    #[error("ICF {scope} checksum mismatch: stored {stored:08X}, computed {computed:08X}")]
    ChecksumMismatch { scope: ChecksumScope, stored: u32, computed: u32 },
    #[error("ICF size mismatch: {expected} bytes expected from entry count, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("ICF header declares {declared} bytes, {expected} expected")]
    DeclaredSizeMismatch { declared: u32, expected: u64 },
    #[error("Invalid app id '{0}': expected 4 uppercase ASCII letters")]
    InvalidAppId(String),
    #[error("Invalid platform id '{0}': expected 3 ASCII characters and a generation digit")]
    InvalidPlatformId(String),
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// An ICF header plus its entry list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icf {
    pub header: IcfHeader,
    entries:    Vec<IcfEntry>,
}

impl Icf {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// A blank container: zeroed header, no entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse decrypted ICF bytes.
    pub fn parse(data: &[u8]) -> Result<Self, IcfError> {
        if data.len() < HEADER_SIZE {
            return Err(IcfError::TooShort { len: data.len() });
        }

        let stored = stored_checksum(data).unwrap_or_default();
        let computed = body_checksum(data);
        tracing::debug!(len = data.len(), "checking ICF file checksum");
        if stored != computed {
            tracing::error!(stored, computed, "ICF file checksum mismatch");
            return Err(IcfError::ChecksumMismatch { scope: ChecksumScope::File, stored, computed });
        }
        tracing::trace!("ICF passed file checksum");

        let header: IcfHeader = decode(&data[..HEADER_SIZE])?;

        let expected = header.expected_size();
        if expected != data.len() as u64 {
            tracing::error!(expected, actual = data.len(), "ICF size mismatch");
            return Err(IcfError::SizeMismatch { expected, actual: data.len() as u64 });
        }
        if u64::from(header.total_size) != expected {
            tracing::error!(declared = header.total_size, expected, "ICF declared size mismatch");
            return Err(IcfError::DeclaredSizeMismatch { declared: header.total_size, expected });
        }

        let mut entries = Vec::with_capacity(header.entry_count() as usize);
        let mut entry_checksum = 0u32;
        for raw in data[HEADER_SIZE..].chunks_exact(ENTRY_SIZE) {
            let entry: IcfEntry = decode(raw)?;
            if entry.is_enabled() {
                entry_checksum ^= checksum(raw);
            }
            entries.push(entry);
        }

        if entry_checksum != header.entry_checksum {
            tracing::error!(stored = header.entry_checksum, computed = entry_checksum, "ICF entry checksum mismatch");
            return Err(IcfError::ChecksumMismatch {
                scope:    ChecksumScope::Entries,
                stored:   header.entry_checksum,
                computed: entry_checksum,
            });
        }
        tracing::trace!(entries = entries.len(), "ICF passed entry checksum");

        Ok(Self { header, entries })
    }

    /// Decrypt with `key`/`iv`, then [`parse`](Self::parse).
    pub fn parse_encrypted(data: &[u8], key: &[u8; KEY_LEN], iv: &[u8; KEY_LEN]) -> Result<Self, IcfError> {
        let plain = crypto::decrypt(data, key, iv)?;
        Self::parse(&plain)
    }

    // ── Header fields ────────────────────────────────────────────────────────

    /// Set the app id after checking it is 4 uppercase ASCII letters.
    pub fn set_app_id(&mut self, app_id: &str) -> Result<(), IcfError> {
        validate_app_id(app_id)?;
        self.header.app_id = FixedStr::new(app_id);
        Ok(())
    }

    /// Set platform id and generation from a combined id such as `AAV1`.
    pub fn set_platform(&mut self, platform: &str) -> Result<(), IcfError> {
        let bytes = platform.as_bytes();
        let valid = bytes.len() == 4
            && bytes[..3].iter().all(|b| b.is_ascii_graphic())
            && bytes[3].is_ascii_digit();
        if !valid {
            return Err(IcfError::InvalidPlatformId(platform.to_owned()));
        }
        self.header.platform_id = FixedStr::new(&platform[..3]);
        self.header.platform_generation = bytes[3] - b'0';
        Ok(())
    }

    // ── Entries ──────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IcfEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&IcfEntry> {
        self.entries.get(index)
    }

    /// First fully enabled entry of `entry_type`.
    pub fn find(&self, entry_type: EntryType) -> Option<&IcfEntry> {
        self.entries.iter().find(|e| e.is_enabled() && e.entry_type == entry_type)
    }

    /// Every fully enabled entry of `entry_type`, in file order.
    pub fn find_all(&self, entry_type: EntryType) -> Vec<&IcfEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_enabled() && e.entry_type == entry_type)
            .collect()
    }

    pub fn system_entry(&self) -> Option<&IcfEntry> {
        self.find(EntryType::System)
    }

    pub fn app_entry(&self) -> Option<&IcfEntry> {
        self.find(EntryType::App)
    }

    pub fn add_entry(&mut self, entry: IcfEntry) {
        self.entries.push(entry);
        self.sync_header_size();
    }

    pub fn clear_entries(&mut self) {
        self.entries.clear();
        self.sync_header_size();
    }

    fn sync_header_size(&mut self) {
        self.header.entry_count = self.entries.len() as u64;
        self.header.total_size = (HEADER_SIZE + self.entries.len() * ENTRY_SIZE) as u32;
    }

    // ── Serialization ────────────────────────────────────────────────────────

    /// Serialize to decrypted bytes, refreshing the header's size fields and
    /// both checksums.
    pub fn save(&mut self) -> Result<Vec<u8>, IcfError> {
        self.sync_header_size();

        let mut out = Vec::with_capacity(self.header.total_size as usize);
        let mut body = Vec::with_capacity(self.entries.len() * ENTRY_SIZE);
        let mut entry_checksum = 0u32;
        for entry in &self.entries {
            let raw = encode(entry)?;
            if entry.is_enabled() {
                entry_checksum ^= checksum(&raw);
            }
            body.extend_from_slice(&raw);
        }

        self.header.entry_checksum = entry_checksum;
        self.header.file_checksum = 0;
        out.extend_from_slice(&encode(&self.header)?);
        out.extend_from_slice(&body);

        self.header.file_checksum = stamp_checksum(&mut out);
        tracing::debug!(
            file_checksum = %format!("{:08X}", self.header.file_checksum),
            entry_checksum = %format!("{entry_checksum:08X}"),
            "ICF saved"
        );
        Ok(out)
    }

    /// [`save`](Self::save), then encrypt with `key`/`iv`.
    pub fn save_encrypted(&mut self, key: &[u8; KEY_LEN], iv: &[u8; KEY_LEN]) -> Result<Vec<u8>, IcfError> {
        let plain = self.save()?;
        Ok(crypto::encrypt(&plain, key, iv)?)
    }
}

/// App ids are exactly four uppercase ASCII letters (e.g. `SDEZ`).
pub fn validate_app_id(app_id: &str) -> Result<(), IcfError> {
    if app_id.len() == 4 && app_id.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(IcfError::InvalidAppId(app_id.to_owned()))
    }
}
