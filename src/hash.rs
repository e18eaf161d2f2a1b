//! SipHash-2-4 keyed hashing (runtime component C3).
//!
//! Strings and bytes objects cache a SipHash-2-4 digest of their raw
//! bytes, keyed by a 128-bit key drawn once from the OS CSPRNG at
//! startup (so hash values are not predictable across runs, matching
//! the common guest-language guard against hash-flooding attacks).
//!
//! Ported from `original_source/nagini/compiler/c/builtin.h`'s
//! `siphash_random_key` / `rotl` / `SIPROUND` / `siphash24` reference
//! implementation; the round structure and magic constants (`"somepseu"`
//! / `"dorandom"` / `"lygenera"` / `"tedbytes"`) are carried over
//! unchanged since they are the algorithm, not incidental style.

use std::io::Read;

/// 128-bit SipHash key, generated once per process.
#[derive(Clone, Copy)]
pub struct SipKey {
    pub k0: u64,
    pub k1: u64,
}

impl SipKey {
    /// Draw a fresh key from the OS CSPRNG, mirroring the original's
    /// `getrandom`/`BCryptGenRandom` call.
    pub fn from_os_random() -> SipKey {
        let mut buf = [0u8; 16];
        std::fs::File::open("/dev/urandom")
            .and_then(|mut f| f.read_exact(&mut buf))
            .expect("failed to seed SipHash key from OS CSPRNG");
        SipKey {
            k0: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            k1: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
        }
    }

    #[cfg(test)]
    pub fn fixed(k0: u64, k1: u64) -> SipKey {
        SipKey { k0, k1 }
    }
}

#[inline(always)]
fn rotl(x: u64, b: u32) -> u64 {
    x.rotate_left(b)
}

struct SipState {
    v0: u64,
    v1: u64,
    v2: u64,
    v3: u64,
}

impl SipState {
    fn new(key: SipKey) -> SipState {
        SipState {
            v0: key.k0 ^ 0x736f6d6570736575, // "somepseu"
            v1: key.k1 ^ 0x646f72616e646f6d, // "dorandom"
            v2: key.k0 ^ 0x6c7967656e657261, // "lygenera"
            v3: key.k1 ^ 0x7465646279746573, // "tedbytes"
        }
    }

    #[inline(always)]
    fn round(&mut self) {
        self.v0 = self.v0.wrapping_add(self.v1);
        self.v1 = rotl(self.v1, 13);
        self.v1 ^= self.v0;
        self.v0 = rotl(self.v0, 32);
        self.v2 = self.v2.wrapping_add(self.v3);
        self.v3 = rotl(self.v3, 16);
        self.v3 ^= self.v2;
        self.v0 = self.v0.wrapping_add(self.v3);
        self.v3 = rotl(self.v3, 21);
        self.v3 ^= self.v0;
        self.v2 = self.v2.wrapping_add(self.v1);
        self.v1 = rotl(self.v1, 17);
        self.v1 ^= self.v2;
        self.v2 = rotl(self.v2, 32);
    }

    fn finish(mut self) -> u64 {
        self.v0 ^ self.v1 ^ self.v2 ^ self.v3
    }
}

/// SipHash-2-4 (2 compression rounds per block, 4 finalization rounds)
/// over an arbitrary byte slice.
pub fn siphash24(key: SipKey, data: &[u8]) -> u64 {
    let mut state = SipState::new(key);
    let len = data.len();
    let end = len - (len % 8);

    let mut i = 0;
    while i < end {
        let mi = u64::from_le_bytes(data[i..i + 8].try_into().unwrap());
        state.v3 ^= mi;
        state.round();
        state.round();
        state.v0 ^= mi;
        i += 8;
    }

    let mut last = [0u8; 8];
    last[..len - end].copy_from_slice(&data[end..]);
    last[7] = (len & 0xff) as u8;
    let last_block = u64::from_le_bytes(last);

    state.v3 ^= last_block;
    state.round();
    state.round();
    state.v0 ^= last_block;

    state.v2 ^= 0xff;
    state.round();
    state.round();
    state.round();
    state.round();

    state.finish()
}

/// Hash a NUL-terminated C-style name the same way `siphash_cstr` does
/// (`strlen` first, then `siphash24` over those bytes). `get_symbol_id`
/// in component C2 keys the process-wide symbol table with this value.
pub fn siphash_cstr(key: SipKey, name: &str) -> u64 {
    siphash24(key, name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_and_key_hash_identically() {
        let key = SipKey::fixed(1, 2);
        assert_eq!(siphash24(key, b"hello"), siphash24(key, b"hello"));
    }

    #[test]
    fn different_keys_hash_differently() {
        let a = siphash24(SipKey::fixed(1, 2), b"hello");
        let b = siphash24(SipKey::fixed(3, 4), b"hello");
        assert_ne!(a, b);
    }

    #[test]
    fn handles_lengths_across_block_boundary() {
        let key = SipKey::fixed(7, 9);
        for len in 0..32 {
            let data: Vec<u8> = (0..len as u8).collect();
            // must not panic for any length, including 0 and non-multiples of 8
            let _ = siphash24(key, &data);
        }
    }

    #[test]
    fn cstr_matches_raw_bytes() {
        let key = SipKey::fixed(5, 5);
        assert_eq!(siphash_cstr(key, "__init__"), siphash24(key, b"__init__"));
    }
}
