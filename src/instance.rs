//! Generic instance variant and the attribute protocol it backs
//! (runtime components C5/C11).
//!
//! An instance carries no fields of its own beyond a lazily-created
//! `__dict__`: every attribute set on it is just a `Dict` entry keyed by
//! the interned attribute-name string. Grounded on
//! `original_source/nagini/compiler/c/builtin.h`'s `InstanceObject` /
//! `NgGetMember` / `NgSetMember` / `NgDelMember`.

use std::ptr;

use crate::dict::Dict;
use crate::object::{Header, Tag, Value};
use crate::runtime::Runtime;

#[repr(C)]
pub struct Instance {
    pub header: Header,
    /// Null until the first attribute is set on this instance.
    pub dict: *mut Dict,
}

impl Instance {
    pub fn init(instance: &mut Instance, type_name: i32) {
        instance.header = Header::new(Tag::Instance, false, 0, type_name);
        instance.dict = ptr::null_mut();
    }

    fn ensure_dict<'a>(instance: &'a mut Instance, runtime: &mut Runtime) -> &'a mut Dict {
        if instance.dict.is_null() {
            unsafe {
                let raw = runtime
                    .pools
                    .dict
                    .alloc()
                    .expect("out of memory allocating dict");
                let dict = raw as *mut Dict;
                Dict::init(&mut *dict, instance.header.type_name);
                instance.dict = dict;
            }
        }
        unsafe { &mut *instance.dict }
    }

    /// `NgGetMember`: look up `name` in `__dict__`, returning `None`
    /// when the dict does not exist yet or lacks the attribute.
    pub fn get_attr(instance: &Instance, name: Value) -> Option<Value> {
        if instance.dict.is_null() {
            return None;
        }
        unsafe { Dict::get(&*instance.dict, name) }
    }

    /// `NgSetMember`: lazily create `__dict__` on first use, then set
    /// the attribute.
    pub fn set_attr(instance: &mut Instance, runtime: &mut Runtime, name: Value, value: Value) {
        let dict = Instance::ensure_dict(instance, runtime) as *mut Dict;
        unsafe {
            Dict::set(&mut *dict, runtime, name, value);
        }
    }

    /// `NgDelMember`: remove `name` from `__dict__`. Returns whether an
    /// attribute was actually removed.
    pub fn del_attr(instance: &mut Instance, runtime: &mut Runtime, name: Value) -> bool {
        if instance.dict.is_null() {
            return false;
        }
        unsafe { Dict::remove(&mut *instance.dict, runtime, name) }
    }

    pub fn destroy(instance: &mut Instance, runtime: &mut Runtime) {
        if !instance.dict.is_null() {
            unsafe {
                Dict::destroy(&mut *instance.dict, runtime);
                runtime.pools.dict.free(instance.dict as *mut u8);
            }
            instance.dict = ptr::null_mut();
        }
    }
}
