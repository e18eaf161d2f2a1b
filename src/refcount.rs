//! Reference-count engine (runtime component C6).
//!
//! `incref` is a plain bump; `decref` is the one place that knows how
//! to tear down every variant once its count reaches zero — recursing
//! into children that themselves hold references (dict entries, tuple
//! elements, an instance's `__dict__`) before releasing the object's
//! own storage back to its pool or the system allocator. Ported from
//! `original_source/nagini/compiler/c/builtin.h`'s `INCREF`/`DECREF`
//! macros and their per-type teardown switch.

use crate::bytes::BytesObject;
use crate::dict::Dict;
use crate::function::Function;
use crate::instance::Instance;
use crate::list::List;
use crate::object::{Tag, Value};
use crate::runtime::Runtime;
use crate::strings::UnicodeObject;
use crate::tuple::Tuple;

/// Bump the reference count. Never frees, so it never needs the
/// runtime handle.
pub unsafe fn incref(value: Value) {
    if value.is_null() {
        return;
    }
    (*value).refcount += 1;
}

/// Drop the reference count; once it reaches zero, recursively release
/// anything the value itself still holds a reference to, then free the
/// value's own storage.
pub unsafe fn decref(runtime: &mut Runtime, value: Value) {
    if value.is_null() {
        return;
    }
    (*value).refcount -= 1;
    if (*value).refcount > 0 {
        return;
    }
    debug_assert_eq!((*value).refcount, 0, "refcount underflow");

    match (*value).tag() {
        Tag::Base => {
            runtime.pools.base.free(value as *mut u8);
        }
        Tag::Instance => {
            let instance = value as *mut Instance;
            Instance::destroy(&mut *instance, runtime);
            runtime.pools.instance.free(value as *mut u8);
        }
        Tag::Int => {
            runtime.pools.ints.free(value as *mut u8);
        }
        Tag::Float => {
            runtime.pools.floats.free(value as *mut u8);
        }
        Tag::Bytes => {
            BytesObject::destroy(value as *mut BytesObject);
        }
        Tag::String => {
            UnicodeObject::destroy(value as *mut UnicodeObject);
        }
        Tag::Tuple => {
            let tuple = value as *mut Tuple;
            for &element in Tuple::as_slice(tuple) {
                decref(runtime, element);
            }
            Tuple::destroy(tuple);
        }
        Tag::List => {
            let list = value as *mut List;
            for i in 0..(*list).size {
                if let Some(element) = List::get(&*list, i) {
                    decref(runtime, element);
                }
            }
            if !(*list).methods.is_null() {
                Dict::destroy(&mut *(*list).methods, runtime);
                runtime.pools.dict.free((*list).methods as *mut u8);
            }
            List::destroy(&mut *list);
            runtime.pools.list.free(value as *mut u8);
        }
        Tag::Dict => {
            let dict = value as *mut Dict;
            Dict::destroy(&mut *dict, runtime);
            runtime.pools.dict.free(value as *mut u8);
        }
        Tag::Set => {
            let set = value as *mut crate::set::Set;
            if !(*set).backing.is_null() {
                Dict::destroy(&mut *(*set).backing, runtime);
                runtime.pools.dict.free((*set).backing as *mut u8);
            }
            runtime.pools.set.free(value as *mut u8);
        }
        Tag::Function => {
            let func = value as *mut Function;
            Function::destroy(&mut *func, runtime);
            runtime.pools.functions.free(value as *mut u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Header;

    #[test]
    fn incref_is_noop_on_null() {
        unsafe {
            incref(std::ptr::null_mut());
        }
    }

    #[test]
    fn incref_increments_refcount_field() {
        let mut header = Header::new(Tag::Int, true, 0, 0);
        let ptr: Value = &mut header;
        unsafe {
            incref(ptr);
        }
        assert_eq!(header.refcount, 2);
    }
}
