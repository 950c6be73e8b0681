use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Read, Write};

use crate::layout::{pad, skip, FixedLayout, FixedStr};
use crate::types::{Timestamp, Version};

pub const HEADER_SIZE: usize = 0x40;
pub const ENTRY_SIZE:  usize = 0x40;

/// First enable bit of [`IcfEntry::flags`].
pub const ENTRY_ENABLED_1: u32 = 0x0002;
/// Second enable bit of [`IcfEntry::flags`].
pub const ENTRY_ENABLED_2: u32 = 0x0100;
/// An entry is live only when both enable bits are set.
pub const ENTRY_ENABLED:   u32 = ENTRY_ENABLED_1 | ENTRY_ENABLED_2;

// ── Header ────────────────────────────────────────────────────────────────────

/// ICF header, 64 bytes.
///
/// | Off | Len | Field |
/// |-----|-----|-------|
/// | 0   | 4   | whole-file CRC (over bytes 4..) |
/// | 4   | 4   | total byte size |
/// | 8   | 8   | reserved |
/// | 16  | 8   | entry count (low 32 bits used) |
/// | 24  | 4   | app id |
/// | 28  | 3   | platform id |
/// | 31  | 1   | platform generation |
/// | 32  | 4   | entry-set CRC |
/// | 36  | 28  | reserved |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcfHeader {
    pub file_checksum:       u32,
    pub total_size:          u32,
    pub entry_count:         u64,
    pub app_id:              FixedStr<4>,
    pub platform_id:         FixedStr<3>,
    pub platform_generation: u8,
    pub entry_checksum:      u32,
}

impl IcfHeader {
    pub fn entry_count(&self) -> u32 {
        self.entry_count as u32
    }

    /// Size the file must have for the current entry count.
    pub fn expected_size(&self) -> u64 {
        HEADER_SIZE as u64 + u64::from(self.entry_count()) * ENTRY_SIZE as u64
    }
}

impl FixedLayout for IcfHeader {
    const SIZE: usize = HEADER_SIZE;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.file_checksum)?;
        writer.write_u32::<LittleEndian>(self.total_size)?;
        pad(writer, 8)?;
        writer.write_u64::<LittleEndian>(self.entry_count)?;
        self.app_id.write(writer)?;
        self.platform_id.write(writer)?;
        writer.write_u8(self.platform_generation)?;
        writer.write_u32::<LittleEndian>(self.entry_checksum)?;
        pad(writer, 28)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let file_checksum = reader.read_u32::<LittleEndian>()?;
        let total_size = reader.read_u32::<LittleEndian>()?;
        skip(reader, 8)?;
        let entry_count = reader.read_u64::<LittleEndian>()?;
        let app_id = FixedStr::read(reader)?;
        let platform_id = FixedStr::read(reader)?;
        let platform_generation = reader.read_u8()?;
        let entry_checksum = reader.read_u32::<LittleEndian>()?;
        skip(reader, 28)?;
        Ok(Self {
            file_checksum,
            total_size,
            entry_count,
            app_id,
            platform_id,
            platform_generation,
            entry_checksum,
        })
    }
}

// ── Entry ─────────────────────────────────────────────────────────────────────

/// What an [`IcfEntry`] describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EntryType {
    #[default]
    System,
    App,
    Option,
    Patch,
    Other(u32),
}

impl EntryType {
    pub fn as_raw(self) -> u32 {
        match self {
            EntryType::System   => 0x0000,
            EntryType::App      => 0x0001,
            EntryType::Option   => 0x0002,
            EntryType::Patch    => 0x0101,
            EntryType::Other(v) => v,
        }
    }
}

impl From<u32> for EntryType {
    fn from(v: u32) -> Self {
        match v {
            0x0000 => EntryType::System,
            0x0001 => EntryType::App,
            0x0002 => EntryType::Option,
            0x0101 => EntryType::Patch,
            other  => EntryType::Other(other),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Other(v) => write!(f, "Unknown(0x{v:04X})"),
            known               => write!(f, "{known:?}"),
        }
    }
}

/// ICF entry, 64 bytes.
///
/// | Off | Len | Field |
/// |-----|-----|-------|
/// | 0   | 4   | enable flags |
/// | 4   | 4   | entry type |
/// | 8   | 24  | reserved |
/// | 32  | 4   | version |
/// | 36  | 8   | timestamp |
/// | 44  | 4   | required version |
/// | 48  | 4   | patch version |
/// | 52  | 8   | patch timestamp |
/// | 60  | 4   | patch required version |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IcfEntry {
    pub flags:                  u32,
    pub entry_type:             EntryType,
    pub version:                Version,
    pub timestamp:              Timestamp,
    pub required_version:       Version,
    pub patch_version:          Version,
    pub patch_timestamp:        Timestamp,
    pub patch_required_version: Version,
}

impl IcfEntry {
    /// A fully enabled entry whose required version equals its version.
    pub fn enabled(entry_type: EntryType, version: Version, timestamp: Timestamp) -> Self {
        Self {
            flags: ENTRY_ENABLED,
            entry_type,
            version,
            timestamp,
            required_version: version,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.flags & ENTRY_ENABLED == ENTRY_ENABLED
    }
}

impl FixedLayout for IcfEntry {
    const SIZE: usize = ENTRY_SIZE;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.entry_type.as_raw())?;
        pad(writer, 24)?;
        self.version.write(writer)?;
        self.timestamp.write(writer)?;
        self.required_version.write(writer)?;
        self.patch_version.write(writer)?;
        self.patch_timestamp.write(writer)?;
        self.patch_required_version.write(writer)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let flags = reader.read_u32::<LittleEndian>()?;
        let entry_type = EntryType::from(reader.read_u32::<LittleEndian>()?);
        skip(reader, 24)?;
        Ok(Self {
            flags,
            entry_type,
            version:                Version::read(reader)?,
            timestamp:              Timestamp::read(reader)?,
            required_version:       Version::read(reader)?,
            patch_version:          Version::read(reader)?,
            patch_timestamp:        Timestamp::read(reader)?,
            patch_required_version: Version::read(reader)?,
        })
    }
}
