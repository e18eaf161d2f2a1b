//! Object-keyed Robin Hood dictionary (runtime component C7).
//!
//! Same probing discipline as the integer-keyed symbol table in
//! [`crate::symtab`], but keyed by arbitrary guest values: each slot
//! caches the key's hash so most comparisons during probing short-
//! circuit on a hash mismatch before falling back to full equality
//! (`ObjectsEqual` in the original). Ported from
//! `original_source/nagini/compiler/c/builtin.h`'s `dict_set` /
//! `dict_get` / `dict_del` / `_dict_resize`.

use std::alloc::{self, Layout};
use std::ptr;

use crate::arith::{hash_value, values_equal};
use crate::object::{Header, Tag, Value};
use crate::refcount::{decref, incref};
use crate::runtime::Runtime;

const INITIAL_CAPACITY: usize = 2;
const LOAD_FACTOR_PERCENT: usize = 85;

#[derive(Clone, Copy)]
struct DictEntry {
    key: Value,
    value: Value,
    hash: i64,
    psl: i32,
}

impl DictEntry {
    fn empty() -> DictEntry {
        DictEntry {
            key: ptr::null_mut(),
            value: ptr::null_mut(),
            hash: 0,
            psl: -1,
        }
    }

    fn is_occupied(&self) -> bool {
        self.psl >= 0
    }
}

#[repr(C)]
pub struct Dict {
    pub header: Header,
    entries: *mut DictEntry,
    capacity: usize,
    count: usize,
    mask: usize,
    threshold: usize,
}

fn entries_layout(capacity: usize) -> Layout {
    Layout::array::<DictEntry>(capacity).expect("dict capacity overflow")
}

unsafe fn alloc_entries(capacity: usize) -> *mut DictEntry {
    let ptr = alloc::alloc(entries_layout(capacity)) as *mut DictEntry;
    assert!(!ptr.is_null(), "dict entries allocation failed");
    for i in 0..capacity {
        ptr::write(ptr.add(i), DictEntry::empty());
    }
    ptr
}

fn threshold_for(capacity: usize) -> usize {
    capacity * LOAD_FACTOR_PERCENT / 100
}

impl Dict {
    pub fn init(dict: &mut Dict, type_name: i32) {
        dict.header = Header::new(Tag::Dict, false, 0, type_name);
        dict.capacity = INITIAL_CAPACITY;
        dict.mask = INITIAL_CAPACITY - 1;
        dict.count = 0;
        dict.threshold = threshold_for(INITIAL_CAPACITY);
        unsafe {
            dict.entries = alloc_entries(INITIAL_CAPACITY);
        }
    }

    /// Decref every live key and value, then free the entries buffer.
    pub fn destroy(dict: &mut Dict, runtime: &mut Runtime) {
        unsafe {
            for i in 0..dict.capacity {
                let e = &*dict.entries.add(i);
                if e.is_occupied() {
                    decref(runtime, e.key);
                    decref(runtime, e.value);
                }
            }
            alloc::dealloc(dict.entries as *mut u8, entries_layout(dict.capacity));
        }
        dict.entries = ptr::null_mut();
        dict.capacity = 0;
        dict.count = 0;
    }

    fn bucket(&self, hash: i64) -> usize {
        (hash as u64 as usize) & self.mask
    }

    fn resize(dict: &mut Dict, new_capacity: usize) {
        let old_entries = dict.entries;
        let old_capacity = dict.capacity;

        unsafe {
            dict.entries = alloc_entries(new_capacity);
            dict.capacity = new_capacity;
            dict.mask = new_capacity - 1;
            dict.threshold = threshold_for(new_capacity);
            dict.count = 0;

            for i in 0..old_capacity {
                let e = *old_entries.add(i);
                if e.is_occupied() {
                    Dict::insert_inner(dict, e.key, e.value, e.hash, None);
                }
            }
            alloc::dealloc(old_entries as *mut u8, entries_layout(old_capacity));
        }
    }

    /// `runtime` is only consulted to decref a value displaced by an
    /// overwrite; pass `None` from contexts (like `resize`) that are
    /// only re-threading existing entries and never overwrite a key.
    unsafe fn insert_inner(
        dict: &mut Dict,
        key: Value,
        value: Value,
        hash: i64,
        runtime: Option<&mut Runtime>,
    ) {
        let mut idx = dict.bucket(hash);
        let mut incoming = DictEntry {
            key,
            value,
            hash,
            psl: 0,
        };

        loop {
            let slot = &mut *dict.entries.add(idx);
            if !slot.is_occupied() {
                *slot = incoming;
                dict.count += 1;
                return;
            }
            if slot.hash == incoming.hash && values_equal(slot.key, incoming.key) {
                let old_value = slot.value;
                slot.value = incoming.value;
                if let Some(runtime) = runtime {
                    decref(runtime, old_value);
                }
                return;
            }
            if slot.psl < incoming.psl {
                std::mem::swap(slot, &mut incoming);
            }
            incoming.psl += 1;
            idx = (idx + 1) & dict.mask;
        }
    }

    /// `key`'s reference is retained by the dict on success; callers
    /// must not decref `key`/`value` after a successful `set`.
    pub fn set(dict: &mut Dict, runtime: &mut Runtime, key: Value, value: Value) {
        if dict.count >= dict.threshold {
            Dict::resize(dict, dict.capacity * 2);
        }
        unsafe {
            incref(key);
            incref(value);
            let hash = hash_value(key);
            Dict::insert_inner(dict, key, value, hash, Some(runtime));
        }
    }

    pub fn get(dict: &Dict, key: Value) -> Option<Value> {
        let hash = hash_value(key);
        let mut idx = dict.bucket(hash);
        let mut probe_len = 0i32;

        unsafe {
            loop {
                let e = &*dict.entries.add(idx);
                if !e.is_occupied() || probe_len > e.psl {
                    return None;
                }
                if e.hash == hash && values_equal(e.key, key) {
                    return Some(e.value);
                }
                probe_len += 1;
                idx = (idx + 1) & dict.mask;
            }
        }
    }

    pub fn contains(dict: &Dict, key: Value) -> bool {
        Dict::get(dict, key).is_some()
    }

    /// Remove `key`, backward-shifting the probe chain and decref'ing
    /// the removed key/value pair. Returns whether a key was removed.
    pub fn remove(dict: &mut Dict, runtime: &mut Runtime, key: Value) -> bool {
        let hash = hash_value(key);
        let mut idx = dict.bucket(hash);
        let mut probe_len = 0i32;

        unsafe {
            loop {
                let e = &*dict.entries.add(idx);
                if !e.is_occupied() || probe_len > e.psl {
                    return false;
                }
                if e.hash == hash && values_equal(e.key, key) {
                    break;
                }
                probe_len += 1;
                idx = (idx + 1) & dict.mask;
            }

            let removed = std::mem::replace(&mut *dict.entries.add(idx), DictEntry::empty());
            dict.count -= 1;
            decref(runtime, removed.key);
            decref(runtime, removed.value);

            let mut cur = idx;
            loop {
                let next = (cur + 1) & dict.mask;
                let next_entry = &*dict.entries.add(next);
                if !next_entry.is_occupied() || next_entry.psl == 0 {
                    break;
                }
                (*dict.entries.add(next)).psl -= 1;
                let tmp = *dict.entries.add(cur);
                *dict.entries.add(cur) = *dict.entries.add(next);
                *dict.entries.add(next) = tmp;
                cur = next;
            }
        }
        true
    }

    pub fn len(dict: &Dict) -> usize {
        dict.count
    }

    pub fn is_empty(dict: &Dict) -> bool {
        dict.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Tag;

    fn make_int(v: i64) -> Value {
        use crate::numeric::IntObject;
        let boxed = Box::new(IntObject {
            header: Header::new(Tag::Int, true, 0, 0),
            value: v,
        });
        Box::into_raw(boxed) as *mut Header
    }

    fn new_dict() -> Dict {
        let mut dict = Dict {
            header: Header::new(Tag::Dict, false, 0, 0),
            entries: ptr::null_mut(),
            capacity: 0,
            count: 0,
            mask: 0,
            threshold: 0,
        };
        Dict::init(&mut dict, 0);
        dict
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut runtime = crate::runtime::init_runtime();
        let mut dict = new_dict();
        let k = make_int(10);
        let v = make_int(100);
        Dict::set(&mut dict, &mut runtime, k, v);
        assert_eq!(Dict::get(&dict, k), Some(v));
        Dict::destroy(&mut dict, &mut runtime);
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let mut runtime = crate::runtime::init_runtime();
        let mut dict = new_dict();
        let k = make_int(1);
        let v1 = make_int(11);
        let v2 = make_int(22);
        Dict::set(&mut dict, &mut runtime, k, v1);
        Dict::set(&mut dict, &mut runtime, k, v2);
        assert_eq!(Dict::len(&dict), 1);
        assert_eq!(Dict::get(&dict, k), Some(v2));
        Dict::destroy(&mut dict, &mut runtime);
    }

    #[test]
    fn remove_then_other_keys_still_found() {
        let mut runtime = crate::runtime::init_runtime();
        let mut dict = new_dict();
        let keys: Vec<Value> = (0..40).map(make_int).collect();
        let vals: Vec<Value> = (0..40).map(|i| make_int(i * 10)).collect();
        for i in 0..40usize {
            Dict::set(&mut dict, &mut runtime, keys[i], vals[i]);
        }
        for i in (0..40usize).step_by(2) {
            assert!(Dict::remove(&mut dict, &mut runtime, keys[i]));
        }
        for i in 0..40usize {
            if i % 2 == 0 {
                assert_eq!(Dict::get(&dict, keys[i]), None);
            } else {
                assert_eq!(Dict::get(&dict, keys[i]), Some(vals[i]));
            }
        }
        Dict::destroy(&mut dict, &mut runtime);
    }
}
