//! Immutable byte-string variant (runtime component C5).
//!
//! Raw bytes with a cached SipHash digest, mirroring `StringObject`'s
//! hash-caching discipline but without any Unicode width selection.

use std::alloc::{self, Layout};
use std::ptr;

use crate::hash::{siphash24, SipKey};
use crate::object::{Header, Tag};

#[repr(C)]
pub struct BytesObject {
    pub header: Header,
    pub hash: i64,
    pub length: usize,
    pub data: *mut u8,
}

impl BytesObject {
    pub unsafe fn alloc(bytes: &[u8], key: SipKey, type_name: i32) -> *mut BytesObject {
        let layout = Layout::new::<BytesObject>();
        let raw = alloc::alloc(layout) as *mut BytesObject;
        assert!(!raw.is_null(), "bytes header allocation failed");

        let data = if bytes.is_empty() {
            ptr::null_mut()
        } else {
            let data_layout = Layout::array::<u8>(bytes.len()).unwrap();
            let data = alloc::alloc(data_layout);
            assert!(!data.is_null(), "bytes payload allocation failed");
            ptr::copy_nonoverlapping(bytes.as_ptr(), data, bytes.len());
            data
        };

        (*raw).header = Header::new(Tag::Bytes, true, 0, type_name);
        (*raw).hash = siphash24(key, bytes) as i64;
        (*raw).length = bytes.len();
        (*raw).data = data;
        raw
    }

    pub unsafe fn as_slice<'a>(obj: *const BytesObject) -> &'a [u8] {
        if (*obj).length == 0 {
            &[]
        } else {
            std::slice::from_raw_parts((*obj).data, (*obj).length)
        }
    }

    pub unsafe fn destroy(obj: *mut BytesObject) {
        let length = (*obj).length;
        if length > 0 {
            alloc::dealloc((*obj).data, Layout::array::<u8>(length).unwrap());
        }
        alloc::dealloc(obj as *mut u8, Layout::new::<BytesObject>());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_caches_hash_and_preserves_bytes() {
        let key = SipKey::fixed(1, 2);
        unsafe {
            let b = BytesObject::alloc(b"hello", key, 0);
            assert_eq!(BytesObject::as_slice(b), b"hello");
            assert_eq!((*b).hash, siphash24(key, b"hello") as i64);
            BytesObject::destroy(b);
        }
    }

    #[test]
    fn empty_bytes_has_null_data() {
        let key = SipKey::fixed(1, 2);
        unsafe {
            let b = BytesObject::alloc(b"", key, 0);
            assert_eq!((*b).length, 0);
            assert_eq!(BytesObject::as_slice(b), &[] as &[u8]);
            BytesObject::destroy(b);
        }
    }
}
