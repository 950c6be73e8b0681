use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use crate::layout::{pad, skip, FixedLayout};

/// Three-part version number.  On disk: `build`, `minor`, then `major` as a
/// little-endian `u16`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u16,
    pub minor: u8,
    pub build: u8,
}

impl Version {
    pub const fn new(major: u16, minor: u8, build: u8) -> Self {
        Self { major, minor, build }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:02}", self.major, self.minor, self.build)
    }
}

impl FromStr for Version {
    type Err = String;

    /// Parses `X.Y.Z`, e.g. `1.66.14`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(format!("expected MAJOR.MINOR.BUILD, got '{s}'"));
        }
        let bad = |p: &str| format!("invalid version component '{p}' in '{s}'");
        Ok(Self {
            major: parts[0].parse().map_err(|_| bad(parts[0]))?,
            minor: parts[1].parse().map_err(|_| bad(parts[1]))?,
            build: parts[2].parse().map_err(|_| bad(parts[2]))?,
        })
    }
}

impl FixedLayout for Version {
    const SIZE: usize = 4;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.build)?;
        writer.write_u8(self.minor)?;
        writer.write_u16::<LittleEndian>(self.major)?;
        Ok(())
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let build = reader.read_u8()?;
        let minor = reader.read_u8()?;
        let major = reader.read_u16::<LittleEndian>()?;
        Ok(Self { major, minor, build })
    }
}

/// Calendar timestamp, second resolution.  8 bytes on disk including one
/// trailing pad byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub year:   u16,
    pub month:  u8,
    pub day:    u8,
    pub hour:   u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    pub fn now() -> Self {
        Self::from(Local::now().naive_local())
    }

    /// `None` for the all-zero timestamp and any other impossible date.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))?
            .and_hms_opt(u32::from(self.hour), u32::from(self.minute), u32::from(self.second))
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year:   dt.year().clamp(0, i32::from(u16::MAX)) as u16,
            month:  dt.month() as u8,
            day:    dt.day() as u8,
            hour:   dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl FixedLayout for Timestamp {
    const SIZE: usize = 8;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.year)?;
        writer.write_all(&[self.month, self.day, self.hour, self.minute, self.second])?;
        pad(writer, 1)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let year = reader.read_u16::<LittleEndian>()?;
        let mut rest = [0u8; 5];
        reader.read_exact(&mut rest)?;
        skip(reader, 1)?;
        let [month, day, hour, minute, second] = rest;
        Ok(Self { year, month, day, hour, minute, second })
    }
}
