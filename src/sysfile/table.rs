use std::fmt;

use super::SysfileError;

/// Magic stored at offset 4 of tagged records (ASCII `----`).
pub const RECORD_TAG: u32 = 0x2D2D_2D2D;

/// The 14 logical record kinds of a sysfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Credit,
    Network0,
    Network1,
    Backup,
    Timezone,
    ErrorLog,
    Localize,
    Wlan,
    Display,
    Aime,
    Emoney,
    Dipsw,
    CreditClear,
    AimePay,
}

impl RecordKind {
    pub const ALL: [RecordKind; 14] = [
        RecordKind::Credit,
        RecordKind::Network0,
        RecordKind::Network1,
        RecordKind::Backup,
        RecordKind::Timezone,
        RecordKind::ErrorLog,
        RecordKind::Localize,
        RecordKind::Wlan,
        RecordKind::Display,
        RecordKind::Aime,
        RecordKind::Emoney,
        RecordKind::Dipsw,
        RecordKind::CreditClear,
        RecordKind::AimePay,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RecordKind::Credit      => "credit",
            RecordKind::Network0    => "network0",
            RecordKind::Network1    => "network1",
            RecordKind::Backup      => "backup",
            RecordKind::Timezone    => "timezone",
            RecordKind::ErrorLog    => "error-log",
            RecordKind::Localize    => "localize",
            RecordKind::Wlan        => "wlan",
            RecordKind::Display     => "display",
            RecordKind::Aime        => "aime",
            RecordKind::Emoney      => "emoney",
            RecordKind::Dipsw       => "dipsw",
            RecordKind::CreditClear => "credit-clear",
            RecordKind::AimePay     => "aimepay",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SysfileError> {
        RecordKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| SysfileError::UnknownRecord(name.to_owned()))
    }

    pub fn descriptor(self) -> &'static RecordDescriptor {
        // RECORDS is ordered like the enum.
        &RECORDS[self as usize]
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the two redundant copies of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Copy in `0x0000..0x3000`.
    Primary,
    /// Copy in `0x3000..0x6000`.
    Mirror,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::Primary, Slot::Mirror];

    pub fn index(self) -> usize {
        match self {
            Slot::Primary => 0,
            Slot::Mirror  => 1,
        }
    }
}

impl TryFrom<usize> for Slot {
    type Error = SysfileError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Slot::Primary),
            1 => Ok(Slot::Mirror),
            n => Err(SysfileError::InvalidSlot(n)),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Where and how one record kind is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub kind:           RecordKind,
    pub primary_offset: usize,
    pub mirror_offset:  usize,
    pub size:           usize,
    pub has_checksum:   bool,
    /// Magic expected at offset 4 once the record is initialized.
    pub tag:            Option<u32>,
}

impl RecordDescriptor {
    pub fn offset(&self, slot: Slot) -> usize {
        match slot {
            Slot::Primary => self.primary_offset,
            Slot::Mirror  => self.mirror_offset,
        }
    }

    pub fn range(&self, slot: Slot) -> std::ops::Range<usize> {
        let start = self.offset(slot);
        start..start + self.size
    }
}

const fn plain(kind: RecordKind, primary_offset: usize, mirror_offset: usize, size: usize) -> RecordDescriptor {
    RecordDescriptor { kind, primary_offset, mirror_offset, size, has_checksum: true, tag: None }
}

const fn tagged(kind: RecordKind, primary_offset: usize, mirror_offset: usize, size: usize) -> RecordDescriptor {
    RecordDescriptor { kind, primary_offset, mirror_offset, size, has_checksum: true, tag: Some(RECORD_TAG) }
}

/// Descriptor table, indexed by `RecordKind as usize`.
pub static RECORDS: [RecordDescriptor; 14] = [
    plain(RecordKind::Credit,       0x0000, 0x3000, 0x0200),
    plain(RecordKind::Network0,     0x0200, 0x3200, 0x0200),
    plain(RecordKind::Network1,     0x0400, 0x3400, 0x0200),
    plain(RecordKind::Backup,       0x1000, 0x4000, 0x0200),
    plain(RecordKind::Timezone,     0x1400, 0x4400, 0x0200),
    plain(RecordKind::ErrorLog,     0x1600, 0x4600, 0x0200),
    plain(RecordKind::Localize,     0x0C00, 0x3C00, 0x0200),
    plain(RecordKind::Wlan,         0x0E00, 0x3E00, 0x0200),
    plain(RecordKind::Display,      0x1800, 0x4800, 0x0200),
    tagged(RecordKind::Aime,        0x2000, 0x5000, 0x0200),
    tagged(RecordKind::Emoney,      0x2200, 0x5200, 0x0600),
    plain(RecordKind::Dipsw,        0x2800, 0x5800, 0x0200),
    tagged(RecordKind::CreditClear, 0x2A00, 0x5A00, 0x0200),
    tagged(RecordKind::AimePay,     0x2C00, 0x5C00, 0x0400),
];
