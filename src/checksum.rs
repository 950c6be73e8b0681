//! CRC-32 as stored in both formats.
//!
//! Reflected polynomial `0xEDB88320`, register seeded with `0xFFFFFFFF`,
//! result complemented.  That is the IEEE CRC-32 computed by `crc32fast`.
//!
//! Records that carry their own checksum keep it as a little-endian `u32`
//! at offset 0, computed over every byte after it.

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher;

/// Width of the checksum field at the start of a self-checksummed record.
pub const CHECKSUM_LEN: usize = 4;

pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Checksum of `record[4..]`, i.e. everything except the checksum field.
pub fn body_checksum(record: &[u8]) -> u32 {
    checksum(record.get(CHECKSUM_LEN..).unwrap_or(&[]))
}

/// The value currently stored in `record[0..4]`, or `None` when `record`
/// is too short to hold the checksum field.
pub fn stored_checksum(record: &[u8]) -> Option<u32> {
    record.get(..CHECKSUM_LEN).map(LittleEndian::read_u32)
}

/// Compute the body checksum and write it over `record[0..4]`.
pub fn stamp_checksum(record: &mut [u8]) -> u32 {
    let crc = body_checksum(record);
    LittleEndian::write_u32(&mut record[..CHECKSUM_LEN], crc);
    crc
}

/// True when `record[0..4]` matches the checksum of the rest.
pub fn verify_checksum(record: &[u8]) -> bool {
    stored_checksum(record) == Some(body_checksum(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_vectors() {
        assert_eq!(checksum(b""), 0x0000_0000);
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn stamp_excludes_own_field() {
        let mut rec = vec![0xAAu8; 4];
        rec.extend_from_slice(b"123456789");
        let crc = stamp_checksum(&mut rec);
        assert_eq!(crc, 0xCBF4_3926);
        assert_eq!(&rec[..4], &[0x26, 0x39, 0xF4, 0xCB]);
        assert!(verify_checksum(&rec));
        rec[6] ^= 1;
        assert!(!verify_checksum(&rec));
        assert!(!verify_checksum(&[1, 2]));
    }

    #[test]
    fn stored_checksum_short_input() {
        assert_eq!(stored_checksum(&[1, 2, 3]), None);
        assert_eq!(stored_checksum(&[]), None);
        assert_eq!(stored_checksum(&[0x26, 0x39, 0xF4, 0xCB, 0]), Some(0xCBF4_3926));
    }
}
