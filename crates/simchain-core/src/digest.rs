//! Fixed-length digest used for transaction ids, Merkle nodes and block hashes.
//!
//! The compression function borrows the shape of SHA-256 (message schedule,
//! choice/majority mixing, eight words of state) but uses its own rotation
//! amounts and round constants. It is a fast deterministic fingerprint and
//! offers no preimage or collision resistance.

use crate::constants::{
    BLOCK_WORDS, HASH_HEX_SIZE, HASH_SIZE, SCHEDULE_WORDS, STATE_WORDS, WORD_BYTES,
};
use crate::Error;
use once_cell::sync::Lazy;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// `floor(sqrt(p) * 2^32) mod 2^32` for the first eight primes.
const INITIAL_STATE: [u32; STATE_WORDS] = [
    0x6a09_e667,
    0xbb67_ae85,
    0x3c6e_f372,
    0xa54f_f53a,
    0x510e_527f,
    0x9b05_688c,
    0x1f83_d9ab,
    0x5be0_cd19,
];

/// `floor(sqrt(p) / ceil(sqrt(p)) * u32::MAX)` for the first eight primes.
const ROUND_CONSTANTS: [u32; STATE_WORDS] = [
    0xb504_f333,
    0xddb3_d741,
    0xbecf_a67a,
    0xe1c5_51bd,
    0xd443_949f,
    0xe6c1_5a22,
    0xd31a_5ebb,
    0xdf2c_f5d0,
];

static EMPTY: Lazy<Digest> = Lazy::new(|| hash(&[]));

/// 256-bit digest. Renders as 64 lowercase hex characters.
///
/// Byte order follows the rendered hex, so `Ord` agrees with lexicographic
/// comparison of the hex strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Digest([u8; HASH_SIZE]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Digest of the empty input. Used as the genesis `prev_hash` sentinel
    /// and as the Merkle root of an empty block.
    pub fn empty() -> Self {
        *EMPTY
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Number of leading `'0'` characters in the hex rendering.
    pub fn leading_zero_nibbles(&self) -> u32 {
        let mut total = 0u32;
        for b in &self.0 {
            if *b == 0 {
                total += 2;
            } else {
                if *b < 0x10 {
                    total += 1;
                }
                break;
            }
        }
        total
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only the lowercase rendering is canonical.
        if s.len() != HASH_HEX_SIZE || s.bytes().any(|c| c.is_ascii_uppercase()) {
            return Err(Error::MalformedDigest(s.to_string()));
        }
        let mut out = [0u8; HASH_SIZE];
        hex::decode_to_slice(s, &mut out).map_err(|_| Error::MalformedDigest(s.to_string()))?;
        Ok(Self(out))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Hash an arbitrary byte string. Total and deterministic.
pub fn hash(input: &[u8]) -> Digest {
    let mut state = INITIAL_STATE;
    for block in word_blocks(input) {
        compress(&mut state, &block);
    }

    let mut out = [0u8; HASH_SIZE];
    for (chunk, word) in out.chunks_exact_mut(WORD_BYTES).zip(state) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    Digest(out)
}

/// Packs the input into little-endian words and pads it into 16-word blocks.
///
/// A final block shorter than 15 words gets a `1` marker followed by zeros;
/// any final block shorter than 16 words carries the input length in bytes
/// as its last word. Empty input maps to the single block `[0, 1, 0, ..]`.
fn word_blocks(input: &[u8]) -> Vec<[u32; BLOCK_WORDS]> {
    if input.is_empty() {
        let mut block = [0u32; BLOCK_WORDS];
        block[1] = 1;
        return vec![block];
    }

    let words: Vec<u32> = input
        .chunks(WORD_BYTES)
        .map(|chunk| {
            let mut bytes = [0u8; WORD_BYTES];
            bytes[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(bytes)
        })
        .collect();

    // Truncation mirrors a 32-bit length field.
    let length = input.len() as u32;

    words
        .chunks(BLOCK_WORDS)
        .map(|chunk| {
            let mut block = [0u32; BLOCK_WORDS];
            block[..chunk.len()].copy_from_slice(chunk);
            if chunk.len() < BLOCK_WORDS - 1 {
                block[chunk.len()] = 1;
            }
            if chunk.len() < BLOCK_WORDS {
                block[BLOCK_WORDS - 1] = length;
            }
            block
        })
        .collect()
}

fn message_schedule(block: &[u32; BLOCK_WORDS]) -> [u32; SCHEDULE_WORDS] {
    let mut ms = [0u32; SCHEDULE_WORDS];
    ms[..BLOCK_WORDS].copy_from_slice(block);
    for i in BLOCK_WORDS..SCHEDULE_WORDS {
        ms[i] = op1(ms[i - 16])
            .wrapping_add(ms[i - 12])
            .wrapping_add(op2(ms[i - 7]))
            .wrapping_add(ms[i - 3]);
    }
    ms
}

fn compress(state: &mut [u32; STATE_WORDS], block: &[u32; BLOCK_WORDS]) {
    let ms = message_schedule(block);

    for (j, word) in ms.iter().enumerate() {
        let t1 = op3(state[4])
            .wrapping_add(choice(state[4], state[5], state[6]))
            .wrapping_add(state[7])
            .wrapping_add(*word)
            .wrapping_add(ROUND_CONSTANTS[j % STATE_WORDS]);
        let t2 = op4(state[0]).wrapping_add(majority(state[0], state[1], state[2]));

        state.copy_within(0..STATE_WORDS - 1, 1);
        state[0] = t1.wrapping_add(t2);
        state[4] = state[4].wrapping_add(t1);
    }

    // whitening
    for (j, word) in ms.iter().enumerate() {
        state[j % STATE_WORDS] ^= word ^ ROUND_CONSTANTS[j % STATE_WORDS];
    }
}

fn op1(w: u32) -> u32 {
    w.rotate_right(14) ^ (w >> 3) ^ w.rotate_right(7)
}

fn op2(w: u32) -> u32 {
    (w >> 7) ^ w.rotate_right(20) ^ w.rotate_right(17)
}

fn op3(w: u32) -> u32 {
    w.rotate_right(2) ^ w.rotate_right(7) ^ w.rotate_right(21)
}

fn op4(w: u32) -> u32 {
    w.rotate_right(15) ^ w.rotate_right(13) ^ w.rotate_right(2)
}

fn choice(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (!x & z)
}

fn majority(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (x & z) | (y & z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_lower_hex_64(s: &str) -> bool {
        s.len() == 64 && s.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f'))
    }

    #[test]
    fn empty_input_digest_is_fixed() {
        assert_eq!(
            hash(b"").to_hex(),
            "0aca7a7e128abc22f58beeff935df4fa94b58dff7d5a585bddd58d7f73ce8345"
        );
        assert_eq!(Digest::empty(), hash(&[]));
    }

    #[test]
    fn known_digests() {
        assert_eq!(
            hash(b"abc").to_hex(),
            "f8044ac99fc4a6c71c02f6d6596ab650d893d5eaa32b2da55791c35dac1aff8d"
        );
        assert_eq!(
            hash(b"The quick brown fox jumps over the lazy dog").to_hex(),
            "d9e9290749aa618a3038d804ebeed6605cf12a07e41a69cedc812da232a0e0b1"
        );
    }

    #[test]
    fn padding_boundaries() {
        // 14 words: marker and length both fit.
        assert_eq!(
            hash(&[b'a'; 56]).to_hex(),
            "5d721fac8da5551732d0f1cfe51c2b987de7abc8a842d5caec9d09654b4e8598"
        );
        // 15 words: no marker, length only.
        assert_eq!(
            hash(&[b'a'; 60]).to_hex(),
            "9ccb7f3edcbaf203b6440b4879d8b4da7b88962cdae48a01739698c9b6a7212f"
        );
        // 16 words: full block, no padding.
        assert_eq!(
            hash(&[b'a'; 64]).to_hex(),
            "1e96806c43d1793041ce502a05d397b82876efa0dd23f3cf694f6007b76c16fd"
        );
    }

    #[test]
    fn word_blocks_layout() {
        assert_eq!(word_blocks(b""), vec![{
            let mut b = [0u32; 16];
            b[1] = 1;
            b
        }]);

        let blocks = word_blocks(b"abcde");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0][0], u32::from_le_bytes(*b"abcd"));
        assert_eq!(blocks[0][1], u32::from(b'e'));
        assert_eq!(blocks[0][2], 1);
        assert_eq!(blocks[0][15], 5);

        let blocks = word_blocks(&[7u8; 68]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], [u32::from_le_bytes([7; 4]); 16]);
        assert_eq!(blocks[1][1], 1);
        assert_eq!(blocks[1][15], 68);
    }

    #[test]
    fn output_is_lowercase_hex() {
        for input in [&b""[..], b"x", b"hello world", &[0xffu8; 200]] {
            assert!(is_lower_hex_64(&hash(input).to_hex()));
        }
    }

    #[test]
    fn deterministic_and_sensitive() {
        assert_eq!(hash(b"block"), hash(b"block"));
        assert_ne!(hash(b"block"), hash(b"Block"));
        assert_ne!(hash(b"a"), hash(b"a\0"));
    }

    #[test]
    fn mixing_primitives() {
        assert_eq!(choice(0xffff_0000, 0x1234_5678, 0x9abc_def0), 0x1234_def0);
        assert_eq!(majority(0b1100, 0b1010, 0b0110), 0b1110);
    }

    #[test]
    fn leading_zero_nibbles_examples() {
        let mut b = [0xffu8; HASH_SIZE];
        assert_eq!(Digest::from_bytes(b).leading_zero_nibbles(), 0);
        b[0] = 0x0f;
        assert_eq!(Digest::from_bytes(b).leading_zero_nibbles(), 1);
        b[0] = 0x00;
        b[1] = 0x10;
        assert_eq!(Digest::from_bytes(b).leading_zero_nibbles(), 2);
        b[1] = 0x01;
        assert_eq!(Digest::from_bytes(b).leading_zero_nibbles(), 3);
        assert_eq!(Digest::from_bytes([0u8; HASH_SIZE]).leading_zero_nibbles(), 64);
    }

    #[test]
    fn parse_round_trip_and_rejects() {
        let d = hash(b"parse me");
        assert_eq!(d.to_hex().parse::<Digest>().unwrap(), d);
        assert!("abc".parse::<Digest>().is_err());
        assert!(d.to_hex().to_uppercase().parse::<Digest>().is_err());
        assert!("z".repeat(64).parse::<Digest>().is_err());
    }

    #[test]
    fn ordering_matches_hex_ordering() {
        let a = hash(b"one");
        let b = hash(b"two");
        assert_eq!(a.cmp(&b), a.to_hex().cmp(&b.to_hex()));
    }

    #[test]
    fn serde_uses_hex_string() {
        let d = hash(b"serde");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", d.to_hex()));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
