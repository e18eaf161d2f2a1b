//! Integer and float value variants (runtime component C5).
//!
//! Both are fixed-size and drawn from their own dedicated pools (see
//! [`crate::pages::PoolSet`]) rather than the general size-classed
//! pools, matching `alloc_int`/`alloc_double` in
//! `original_source/nagini/compiler/c/builtin.h`.

use crate::object::{Header, Tag, Value};
use crate::runtime::Runtime;

#[repr(C)]
pub struct IntObject {
    pub header: Header,
    pub value: i64,
}

impl IntObject {
    /// `alloc_int`.
    pub unsafe fn alloc(runtime: &mut Runtime, value: i64) -> Value {
        let slot = runtime
            .pools
            .ints
            .alloc()
            .expect("out of memory allocating int") as *mut IntObject;
        let type_name = runtime.get_symbol_id("int");
        (*slot).header = Header::new(Tag::Int, false, 0, type_name);
        (*slot).value = value;
        slot as Value
    }

    /// `alloc_bool`: a boolean is an `int`-shaped object with the
    /// header's boolean flag set, matching `Header::is_truthy_bool`.
    pub unsafe fn alloc_bool(runtime: &mut Runtime, value: bool) -> Value {
        let slot = IntObject::alloc(runtime, value as i64) as *mut IntObject;
        (*slot).header.set_boolean_flag(value);
        slot as Value
    }
}

#[repr(C)]
pub struct FloatObject {
    pub header: Header,
    pub value: f64,
}

impl FloatObject {
    /// `alloc_float`.
    pub unsafe fn alloc(runtime: &mut Runtime, value: f64) -> Value {
        let slot = runtime
            .pools
            .floats
            .alloc()
            .expect("out of memory allocating float") as *mut FloatObject;
        let type_name = runtime.get_symbol_id("float");
        (*slot).header = Header::new(Tag::Float, false, 0, type_name);
        (*slot).value = value;
        slot as Value
    }
}
