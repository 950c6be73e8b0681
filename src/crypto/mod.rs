//! Chunked AES-128-CBC transform used for encrypted ICF payloads.
//!
//! The payload is cut into 4096-byte chunks starting at offset 0 (the last
//! chunk may be shorter).  Every chunk is run through CBC independently
//! with the *same* key and IV.  After the cipher, the first 16 output bytes
//! of a chunk are read as two little-endian `u64`s, each XOR-ed with the
//! chunk's starting offset, and written back.  Both directions apply that
//! tweak to the cipher output.
//!
//! Layout on disk: `[ chunk 0 | chunk 1 | ... ]`, same length as the input,
//! no padding, no header.
//!
//! The tweak is a no-op for chunk 0, so payloads of up to one chunk round
//! trip exactly.  Longer payloads are transformed the same way but their
//! round trip is not known to hold; a warning is logged for them.

use aes::Aes128;
use byteorder::{ByteOrder, LittleEndian};
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Byte length of the key and of the IV.
pub const KEY_LEN: usize = 16;
/// AES block length; payloads must be a multiple of it.
pub const BLOCK_LEN: usize = 16;
/// Chunk length; each chunk restarts CBC from the original IV.
pub const CHUNK_SIZE: usize = 4096;
/// Leading bytes of each chunk that receive the offset tweak.
const TWEAK_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Payload length {len} is not a multiple of the 16-byte AES block")]
    Unaligned { len: usize },
    #[error("Cipher rejected chunk at offset {offset}")]
    Cipher { offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Encrypt `plaintext`; the result has the same length.
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_LEN], iv: &[u8; KEY_LEN]) -> Result<Vec<u8>, CryptoError> {
    transform(plaintext, key, iv, Direction::Encrypt)
}

/// Decrypt a payload produced by [`encrypt`]; the result has the same length.
pub fn decrypt(ciphertext: &[u8], key: &[u8; KEY_LEN], iv: &[u8; KEY_LEN]) -> Result<Vec<u8>, CryptoError> {
    transform(ciphertext, key, iv, Direction::Decrypt)
}

fn transform(
    data:      &[u8],
    key:       &[u8; KEY_LEN],
    iv:        &[u8; KEY_LEN],
    direction: Direction,
) -> Result<Vec<u8>, CryptoError> {
    if data.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::Unaligned { len: data.len() });
    }
    if data.len() > CHUNK_SIZE {
        tracing::warn!(
            len = data.len(),
            "payload spans more than one cipher chunk; round trip is unverified"
        );
    }

    let mut out = data.to_vec();
    for (index, chunk) in out.chunks_mut(CHUNK_SIZE).enumerate() {
        let offset = index * CHUNK_SIZE;
        let len = chunk.len();
        let done = match direction {
            Direction::Encrypt => Aes128CbcEnc::new(key.into(), iv.into())
                .encrypt_padded_mut::<NoPadding>(chunk, len)
                .is_ok(),
            Direction::Decrypt => Aes128CbcDec::new(key.into(), iv.into())
                .decrypt_padded_mut::<NoPadding>(chunk)
                .is_ok(),
        };
        if !done {
            return Err(CryptoError::Cipher { offset });
        }
        tweak(chunk, offset as u64);
    }
    Ok(out)
}

/// XOR both leading little-endian `u64`s of a chunk with its offset.
fn tweak(chunk: &mut [u8], offset: u64) {
    for word in chunk[..TWEAK_LEN].chunks_exact_mut(8) {
        let v = LittleEndian::read_u64(word) ^ offset;
        LittleEndian::write_u64(word, v);
    }
}
