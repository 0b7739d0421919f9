//! The word cipher protecting CMF entry tables.
//!
//! Encrypted data is handled as a stream of little-endian 32-bit words processed three at a
//! time. Each position in a group uses its own key from [`ENTRY_KEYS`].

use byteorder::{ByteOrder, LittleEndian};

/// Keys applied to the first, second and third word of every 12 byte group
pub const ENTRY_KEYS: [u32; 3] = [0xAC93_72DE, 0x8469_AF01, 0xDC39_628F];

const GROUP_SIZE: usize = 12;

/// Exchanges the most and least significant bytes of a word, keeping the two middle bytes.
#[inline]
pub const fn swap_high_low(value: u32) -> u32 {
    (value & 0x00FF_FF00) | (value << 24) | (value >> 24)
}

/// Decrypts a single word.
#[inline]
pub const fn decrypt_word(word: u32, key: u32) -> u32 {
    swap_high_low(word) ^ key
}

/// Encrypts a single word so that [`decrypt_word`] with the same key restores it.
#[inline]
pub const fn encrypt_word(word: u32, key: u32) -> u32 {
    swap_high_low(word ^ key)
}

/// Decrypts `data` in place.
///
/// Only whole 12 byte groups are transformed, trailing bytes are left untouched.
pub fn decrypt_in_place(data: &mut [u8]) {
    transform(data, decrypt_word);
}

/// Encrypts `data` in place, the inverse of [`decrypt_in_place`].
pub fn encrypt_in_place(data: &mut [u8]) {
    transform(data, encrypt_word);
}

fn transform(data: &mut [u8], op: impl Fn(u32, u32) -> u32) {
    let len = data.len() - data.len() % GROUP_SIZE;
    for (i, word) in data[..len].chunks_exact_mut(4).enumerate() {
        let value = LittleEndian::read_u32(word);
        LittleEndian::write_u32(word, op(value, ENTRY_KEYS[i % ENTRY_KEYS.len()]));
    }
}
