//! Unicode string variant (runtime component C9).
//!
//! Strings store their code points packed at the narrowest uniform
//! width that fits every character: 1 byte (Latin-1 range, with a
//! further all-ASCII fast-path bit), 2 bytes, or 4 bytes. Construction
//! is a two-pass algorithm over the incoming UTF-8 — first pass finds
//! the maximum code point and whether every byte is ASCII, second pass
//! decodes into the chosen width — ported from
//! `original_source/nagini/compiler/c/builtin.h`'s `alloc_str` and its
//! hand-rolled `utf8_decode`.

use std::alloc::{self, Layout};
use std::ptr;

use crate::hash::{siphash24, SipKey};
use crate::object::{Header, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Width {
    One = 0,
    Two = 1,
    Four = 2,
}

impl Width {
    fn bytes(self) -> usize {
        match self {
            Width::One => 1,
            Width::Two => 2,
            Width::Four => 4,
        }
    }
}

#[repr(C)]
pub struct UnicodeObject {
    pub header: Header,
    pub hash: i64,
    /// number of code points, not bytes.
    pub length: usize,
    pub kind: u8,
    pub is_ascii: bool,
    pub data: *mut u8,
}

/// Decode one UTF-8 code point starting at `bytes[i]`. Returns the code
/// point and the number of bytes consumed (1-4). Mirrors the original's
/// manual `utf8_decode` rather than relying on `str`'s built-in
/// iteration, since the runtime works over raw untrusted byte buffers
/// before they are known to be valid UTF-8 `str`s.
pub fn decode_utf8(bytes: &[u8], i: usize) -> (u32, usize) {
    let b0 = bytes[i];
    if b0 & 0x80 == 0 {
        (b0 as u32, 1)
    } else if b0 & 0xE0 == 0xC0 {
        let b1 = bytes[i + 1];
        (((b0 as u32 & 0x1F) << 6) | (b1 as u32 & 0x3F), 2)
    } else if b0 & 0xF0 == 0xE0 {
        let b1 = bytes[i + 1];
        let b2 = bytes[i + 2];
        (
            ((b0 as u32 & 0x0F) << 12) | ((b1 as u32 & 0x3F) << 6) | (b2 as u32 & 0x3F),
            3,
        )
    } else {
        let b1 = bytes[i + 1];
        let b2 = bytes[i + 2];
        let b3 = bytes[i + 3];
        (
            ((b0 as u32 & 0x07) << 18)
                | ((b1 as u32 & 0x3F) << 12)
                | ((b2 as u32 & 0x3F) << 6)
                | (b3 as u32 & 0x3F),
            4,
        )
    }
}

struct Scan {
    max_cp: u32,
    is_ascii: bool,
    char_count: usize,
}

fn scan(bytes: &[u8]) -> Scan {
    let mut max_cp = 0u32;
    let mut is_ascii = true;
    let mut char_count = 0;
    let mut i = 0;
    while i < bytes.len() {
        let (cp, width) = decode_utf8(bytes, i);
        if cp > max_cp {
            max_cp = cp;
        }
        if cp > 0x7F {
            is_ascii = false;
        }
        char_count += 1;
        i += width;
    }
    Scan {
        max_cp,
        is_ascii,
        char_count,
    }
}

fn width_for(max_cp: u32) -> Width {
    if max_cp <= 0xFF {
        Width::One
    } else if max_cp <= 0xFFFF {
        Width::Two
    } else {
        Width::Four
    }
}

impl UnicodeObject {
    /// Two-pass construction from UTF-8 bytes: determine width and
    /// length, then decode each code point into the chosen storage
    /// width. The cached hash is taken over the original UTF-8 bytes,
    /// not the repacked storage, so equal strings hash equal regardless
    /// of how they were produced.
    pub unsafe fn alloc(utf8: &str, key: SipKey, type_name: i32) -> *mut UnicodeObject {
        let bytes = utf8.as_bytes();
        let scanned = scan(bytes);
        let width = width_for(scanned.max_cp);

        let data = if scanned.char_count == 0 {
            ptr::null_mut()
        } else {
            let layout = Layout::array::<u8>(scanned.char_count * width.bytes()).unwrap();
            let data = alloc::alloc(layout);
            assert!(!data.is_null(), "string payload allocation failed");

            let mut i = 0;
            let mut out = 0;
            while i < bytes.len() {
                let (cp, consumed) = decode_utf8(bytes, i);
                match width {
                    Width::One => *data.add(out) = cp as u8,
                    Width::Two => {
                        let slot = data.add(out * 2) as *mut u16;
                        ptr::write_unaligned(slot, cp as u16);
                    }
                    Width::Four => {
                        let slot = data.add(out * 4) as *mut u32;
                        ptr::write_unaligned(slot, cp);
                    }
                }
                i += consumed;
                out += 1;
            }
            data
        };

        let layout = Layout::new::<UnicodeObject>();
        let raw = alloc::alloc(layout) as *mut UnicodeObject;
        assert!(!raw.is_null(), "string header allocation failed");
        (*raw).header = Header::new(Tag::String, true, 0, type_name);
        (*raw).hash = siphash24(key, bytes) as i64;
        (*raw).length = scanned.char_count;
        (*raw).kind = width as u8;
        (*raw).is_ascii = scanned.is_ascii;
        (*raw).data = data;
        raw
    }

    pub unsafe fn code_point_at(obj: *const UnicodeObject, index: usize) -> u32 {
        debug_assert!(index < (*obj).length);
        match (*obj).kind {
            0 => *(*obj).data.add(index) as u32,
            1 => ptr::read_unaligned(((*obj).data.add(index * 2)) as *const u16) as u32,
            _ => ptr::read_unaligned(((*obj).data.add(index * 4)) as *const u32),
        }
    }

    /// Reconstruct an owned Rust `String`, used by `repr`/`str`
    /// formatting and by the external interface when handing a value
    /// back to embedding code.
    pub unsafe fn to_string(obj: *const UnicodeObject) -> String {
        let mut s = String::with_capacity((*obj).length);
        for i in 0..(*obj).length {
            let cp = UnicodeObject::code_point_at(obj, i);
            s.push(char::from_u32(cp).unwrap_or('\u{FFFD}'));
        }
        s
    }

    pub unsafe fn destroy(obj: *mut UnicodeObject) {
        let length = (*obj).length;
        if length > 0 {
            let width = match (*obj).kind {
                0 => 1,
                1 => 2,
                _ => 4,
            };
            alloc::dealloc((*obj).data, Layout::array::<u8>(length * width).unwrap());
        }
        alloc::dealloc(obj as *mut u8, Layout::new::<UnicodeObject>());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_string_uses_one_byte_width() {
        let key = SipKey::fixed(1, 2);
        unsafe {
            let s = UnicodeObject::alloc("hello", key, 0);
            assert_eq!((*s).kind, 0);
            assert!((*s).is_ascii);
            assert_eq!((*s).length, 5);
            assert_eq!(UnicodeObject::to_string(s), "hello");
            UnicodeObject::destroy(s);
        }
    }

    #[test]
    fn latin1_non_ascii_uses_one_byte_width() {
        let key = SipKey::fixed(1, 2);
        unsafe {
            let s = UnicodeObject::alloc("caf\u{e9}", key, 0);
            assert_eq!((*s).kind, 0);
            assert!(!(*s).is_ascii);
            assert_eq!(UnicodeObject::to_string(s), "caf\u{e9}");
            UnicodeObject::destroy(s);
        }
    }

    #[test]
    fn bmp_string_uses_two_byte_width() {
        let key = SipKey::fixed(1, 2);
        unsafe {
            let s = UnicodeObject::alloc("\u{4e2d}\u{6587}", key, 0);
            assert_eq!((*s).kind, 1);
            assert_eq!((*s).length, 2);
            assert_eq!(UnicodeObject::to_string(s), "\u{4e2d}\u{6587}");
            UnicodeObject::destroy(s);
        }
    }

    #[test]
    fn astral_string_uses_four_byte_width() {
        let key = SipKey::fixed(1, 2);
        unsafe {
            let s = UnicodeObject::alloc("\u{1F600}", key, 0);
            assert_eq!((*s).kind, 2);
            assert_eq!(UnicodeObject::to_string(s), "\u{1F600}");
            UnicodeObject::destroy(s);
        }
    }

    #[test]
    fn empty_string_has_null_data_and_zero_length() {
        let key = SipKey::fixed(1, 2);
        unsafe {
            let s = UnicodeObject::alloc("", key, 0);
            assert_eq!((*s).length, 0);
            assert_eq!(UnicodeObject::to_string(s), "");
            UnicodeObject::destroy(s);
        }
    }

    #[test]
    fn decode_utf8_handles_all_sequence_lengths() {
        assert_eq!(decode_utf8(b"A", 0), (0x41, 1));
        assert_eq!(decode_utf8("\u{e9}".as_bytes(), 0), (0xe9, 2));
        assert_eq!(decode_utf8("\u{4e2d}".as_bytes(), 0), (0x4e2d, 3));
        assert_eq!(decode_utf8("\u{1F600}".as_bytes(), 0), (0x1F600, 4));
    }
}
