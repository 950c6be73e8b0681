//! Sysfile backup blob.
//!
//! # Layout
//! A fixed 0x6000-byte image holding 14 record kinds, each stored twice:
//! a primary copy in the first half and a mirror in the second.  Offsets
//! and sizes come from [`RECORDS`].
//!
//! Every record starts with an 8-byte header:
//! ```text
//! [ checksum u32 LE | tag or reserved u32 ]
//! ```
//! The checksum covers every record byte after itself.  Tagged kinds carry
//! [`RECORD_TAG`] in the second word; for the others it is preserved as-is.
//!
//! # Integrity
//! A stored checksum of zero marks a record that was never written: it
//! decodes with [`RecordStatus::Uninitialized`] and its tag is not checked.
//! Any other mismatch is an error.  The two copies are never compared or
//! repaired automatically.

mod records;
mod table;

pub use records::*;
pub use table::{RecordDescriptor, RecordKind, Slot, RECORDS, RECORD_TAG};

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::checksum::{body_checksum, stamp_checksum, stored_checksum, CHECKSUM_LEN};
use crate::layout::{decode, encode, FixedLayout, LayoutError};

/// Exact length of a sysfile image.
pub const FILE_LENGTH: usize = 0x6000;
/// Offset of the tag word inside a record.
pub const TAG_OFFSET: usize = CHECKSUM_LEN;

#[derive(Error, Debug)]
pub enum SysfileError {
    #[error("Sysfile is {actual} bytes, expected {expected}")]
    FileLength { expected: usize, actual: usize },
    #[error("{kind} record at 0x{offset:04X}: checksum mismatch (stored {stored:08X}, computed {computed:08X})")]
    ChecksumMismatch { kind: RecordKind, offset: usize, stored: u32, computed: u32 },
    #[error("{kind} record at 0x{offset:04X}: tag mismatch (expected {expected:08X}, found {actual:08X})")]
    TagMismatch { kind: RecordKind, offset: usize, expected: u32, actual: u32 },
    #[error("Unknown record kind '{0}'")]
    UnknownRecord(String),
    #[error("Invalid slot {0}: expected 0 (primary) or 1 (mirror)")]
    InvalidSlot(usize),
    #[error("{field} index {index} out of range (0..{len})")]
    IndexOutOfRange { field: &'static str, index: usize, len: usize },
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
}

/// A typed record bound to its entry in the descriptor table.
pub trait SysRecord: FixedLayout {
    const KIND: RecordKind;

    fn descriptor() -> &'static RecordDescriptor {
        Self::KIND.descriptor()
    }
}

/// Whether a decoded record had ever been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Initialized,
    /// Stored checksum was zero; the fields are whatever the bytes held.
    Uninitialized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub record: T,
    pub status: RecordStatus,
}

impl<T> Loaded<T> {
    pub fn is_initialized(&self) -> bool {
        self.status == RecordStatus::Initialized
    }
}

// ── Codec ─────────────────────────────────────────────────────────────────────

pub fn check_length(data: &[u8]) -> Result<(), SysfileError> {
    if data.len() != FILE_LENGTH {
        tracing::error!(len = data.len(), expected = FILE_LENGTH, "sysfile has wrong length");
        return Err(SysfileError::FileLength { expected: FILE_LENGTH, actual: data.len() });
    }
    Ok(())
}

/// Validate the checksum and tag of one stored record.
fn verify(desc: &RecordDescriptor, slot: Slot, raw: &[u8]) -> Result<RecordStatus, SysfileError> {
    let offset = desc.offset(slot);
    if desc.has_checksum {
        // Descriptors are always wider than the checksum field.
        let stored = stored_checksum(raw).unwrap_or_default();
        if stored == 0 {
            tracing::warn!(kind = %desc.kind, %slot, offset, "record checksum is zero, treating as uninitialized");
            return Ok(RecordStatus::Uninitialized);
        }
        let computed = body_checksum(raw);
        if stored != computed {
            tracing::error!(kind = %desc.kind, %slot, offset, stored, computed, "record checksum mismatch");
            return Err(SysfileError::ChecksumMismatch { kind: desc.kind, offset, stored, computed });
        }
    }
    if let Some(expected) = desc.tag {
        let actual = LittleEndian::read_u32(&raw[TAG_OFFSET..]);
        if actual != expected {
            tracing::error!(kind = %desc.kind, %slot, offset, actual, "record tag mismatch");
            return Err(SysfileError::TagMismatch { kind: desc.kind, offset, expected, actual });
        }
    }
    tracing::trace!(kind = %desc.kind, %slot, offset, "record verified");
    Ok(RecordStatus::Initialized)
}

/// Decode the `slot` copy of record `T` from a full sysfile image.
pub fn get_record<T: SysRecord>(data: &[u8], slot: Slot) -> Result<Loaded<T>, SysfileError> {
    check_length(data)?;
    let desc = T::descriptor();
    let raw = &data[desc.range(slot)];
    let status = verify(desc, slot, raw)?;
    let record = decode(raw)?;
    tracing::debug!(kind = %desc.kind, %slot, ?status, "record loaded");
    Ok(Loaded { record, status })
}

/// Return a copy of `data` with the `slot` copy of `T` replaced by `record`.
///
/// The checksum is recomputed and the tag stamped; for untagged kinds the
/// reserved word already in `data` is kept.  The other slot is untouched.
pub fn update_record<T: SysRecord>(data: &[u8], record: &T, slot: Slot) -> Result<Vec<u8>, SysfileError> {
    check_length(data)?;
    let desc = T::descriptor();
    let range = desc.range(slot);

    let mut raw = encode(record)?;
    if raw.len() != desc.size {
        return Err(LayoutError::SizeMismatch { expected: desc.size, actual: raw.len() }.into());
    }
    match desc.tag {
        Some(tag) => LittleEndian::write_u32(&mut raw[TAG_OFFSET..], tag),
        None => raw[TAG_OFFSET..TAG_OFFSET + 4].copy_from_slice(&data[range.start + TAG_OFFSET..][..4]),
    }
    if desc.has_checksum {
        let crc = stamp_checksum(&mut raw);
        tracing::debug!(kind = %desc.kind, %slot, checksum = %format!("{crc:08X}"), "record encoded");
    }

    let mut out = data.to_vec();
    out[range].copy_from_slice(&raw);
    Ok(out)
}

/// [`update_record`] applied to both slots.
pub fn update_both<T: SysRecord>(data: &[u8], record: &T) -> Result<Vec<u8>, SysfileError> {
    let primary = update_record(data, record, Slot::Primary)?;
    update_record(&primary, record, Slot::Mirror)
}

// ── Whole-file views ──────────────────────────────────────────────────────────

/// Every record of one slot, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysData {
    pub slot:          Slot,
    pub credit:        CreditRecord,
    pub network0:      Network0Record,
    pub network1:      Network1Record,
    pub backup:        BackupRecord,
    pub timezone:      TimezoneRecord,
    pub error_log:     ErrorLogRecord,
    pub localize:      LocalizeRecord,
    pub wlan:          WlanRecord,
    pub display:       DisplayRecord,
    pub aime:          AimeRecord,
    pub emoney:        EmoneyRecord,
    pub dipsw:         DipswRecord,
    pub credit_clear:  CreditClearRecord,
    pub aimepay:       AimePayRecord,
    /// Kinds whose stored checksum was zero.
    pub uninitialized: Vec<RecordKind>,
}

impl SysData {
    /// Decode the primary copy of every record.
    pub fn parse(data: &[u8]) -> Result<Self, SysfileError> {
        Self::parse_slot(data, Slot::Primary)
    }

    pub fn parse_slot(data: &[u8], slot: Slot) -> Result<Self, SysfileError> {
        check_length(data)?;
        let mut uninitialized = Vec::new();

        macro_rules! field {
            ($ty:ty) => {{
                let loaded = get_record::<$ty>(data, slot)?;
                if !loaded.is_initialized() {
                    uninitialized.push(<$ty as SysRecord>::KIND);
                }
                loaded.record
            }};
        }

        Ok(Self {
            slot,
            credit:        field!(CreditRecord),
            network0:      field!(Network0Record),
            network1:      field!(Network1Record),
            backup:        field!(BackupRecord),
            timezone:      field!(TimezoneRecord),
            error_log:     field!(ErrorLogRecord),
            localize:      field!(LocalizeRecord),
            wlan:          field!(WlanRecord),
            display:       field!(DisplayRecord),
            aime:          field!(AimeRecord),
            emoney:        field!(EmoneyRecord),
            dipsw:         field!(DipswRecord),
            credit_clear:  field!(CreditClearRecord),
            aimepay:       field!(AimePayRecord),
            uninitialized,
        })
    }

    pub fn is_initialized(&self, kind: RecordKind) -> bool {
        !self.uninitialized.contains(&kind)
    }
}

/// Any one record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyRecord {
    Credit(CreditRecord),
    Network0(Network0Record),
    Network1(Network1Record),
    Backup(BackupRecord),
    Timezone(TimezoneRecord),
    ErrorLog(ErrorLogRecord),
    Localize(LocalizeRecord),
    Wlan(WlanRecord),
    Display(DisplayRecord),
    Aime(AimeRecord),
    Emoney(Box<EmoneyRecord>),
    Dipsw(DipswRecord),
    CreditClear(CreditClearRecord),
    AimePay(Box<AimePayRecord>),
}

impl AnyRecord {
    /// Decode the record of `kind` chosen at run time.
    pub fn load(data: &[u8], kind: RecordKind, slot: Slot) -> Result<Loaded<Self>, SysfileError> {
        fn wrap<T: SysRecord>(
            data: &[u8],
            slot: Slot,
            f: impl FnOnce(T) -> AnyRecord,
        ) -> Result<Loaded<AnyRecord>, SysfileError> {
            let Loaded { record, status } = get_record::<T>(data, slot)?;
            Ok(Loaded { record: f(record), status })
        }

        match kind {
            RecordKind::Credit      => wrap(data, slot, AnyRecord::Credit),
            RecordKind::Network0    => wrap(data, slot, AnyRecord::Network0),
            RecordKind::Network1    => wrap(data, slot, AnyRecord::Network1),
            RecordKind::Backup      => wrap(data, slot, AnyRecord::Backup),
            RecordKind::Timezone    => wrap(data, slot, AnyRecord::Timezone),
            RecordKind::ErrorLog    => wrap(data, slot, AnyRecord::ErrorLog),
            RecordKind::Localize    => wrap(data, slot, AnyRecord::Localize),
            RecordKind::Wlan        => wrap(data, slot, AnyRecord::Wlan),
            RecordKind::Display     => wrap(data, slot, AnyRecord::Display),
            RecordKind::Aime        => wrap(data, slot, AnyRecord::Aime),
            RecordKind::Emoney      => wrap(data, slot, |r| AnyRecord::Emoney(Box::new(r))),
            RecordKind::Dipsw       => wrap(data, slot, AnyRecord::Dipsw),
            RecordKind::CreditClear => wrap(data, slot, AnyRecord::CreditClear),
            RecordKind::AimePay     => wrap(data, slot, |r| AnyRecord::AimePay(Box::new(r))),
        }
    }
}

/// Outcome of checking one stored record.
#[derive(Debug)]
pub struct SlotReport {
    pub kind:   RecordKind,
    pub slot:   Slot,
    pub offset: usize,
    pub status: Result<RecordStatus, SysfileError>,
}

/// Verify all 28 stored records without stopping at the first failure.
pub fn inspect(data: &[u8]) -> Result<Vec<SlotReport>, SysfileError> {
    check_length(data)?;
    let mut reports = Vec::with_capacity(RECORDS.len() * 2);
    for desc in RECORDS.iter() {
        for slot in Slot::BOTH {
            reports.push(SlotReport {
                kind: desc.kind,
                slot,
                offset: desc.offset(slot),
                status: verify(desc, slot, &data[desc.range(slot)]),
            });
        }
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_record_types() {
        fn size_of<T: SysRecord>() -> (RecordKind, usize) {
            (T::KIND, T::SIZE)
        }
        let typed = [
            size_of::<CreditRecord>(),
            size_of::<Network0Record>(),
            size_of::<Network1Record>(),
            size_of::<BackupRecord>(),
            size_of::<TimezoneRecord>(),
            size_of::<ErrorLogRecord>(),
            size_of::<LocalizeRecord>(),
            size_of::<WlanRecord>(),
            size_of::<DisplayRecord>(),
            size_of::<AimeRecord>(),
            size_of::<EmoneyRecord>(),
            size_of::<DipswRecord>(),
            size_of::<CreditClearRecord>(),
            size_of::<AimePayRecord>(),
        ];
        for (kind, size) in typed {
            let desc = kind.descriptor();
            assert_eq!(desc.kind, kind);
            assert_eq!(desc.size, size, "{kind}");
        }
    }

    #[test]
    fn records_do_not_overlap() {
        let mut spans: Vec<_> = RECORDS
            .iter()
            .flat_map(|d| Slot::BOTH.map(|s| d.range(s)))
            .collect();
        spans.sort_by_key(|r| r.start);
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
        assert!(spans.last().map_or(false, |r| r.end <= FILE_LENGTH));
        for d in RECORDS.iter() {
            assert_eq!(d.mirror_offset, d.primary_offset + 0x3000);
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_name(kind.name()).unwrap(), kind);
        }
        assert!(matches!(RecordKind::from_name("bogus"), Err(SysfileError::UnknownRecord(_))));
        assert!(matches!(Slot::try_from(2), Err(SysfileError::InvalidSlot(2))));
    }

    #[test]
    fn untagged_update_keeps_reserved_word() {
        let mut data = vec![0u8; FILE_LENGTH];
        let off = RecordKind::Dipsw.descriptor().primary_offset;
        data[off + 4..off + 8].copy_from_slice(&[1, 2, 3, 4]);
        let out = update_record(&data, &DipswRecord { value: 5 }, Slot::Primary).unwrap();
        assert_eq!(&out[off + 4..off + 8], &[1, 2, 3, 4]);
        assert_eq!(out[off + 8], 5);
    }
}
