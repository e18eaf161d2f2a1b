//! External interface (spec §6): the `extern "C"` surface
//! compiler-generated native code links against directly. Every
//! function here takes the opaque `*mut Runtime` handle the embedding
//! binary obtained from [`nagini_init_runtime`] as its first argument,
//! mirroring the original C runtime's pervasive `Runtime*` parameter.
//!
//! Grounded on the teacher's `c_interface.rs` module seam (the dedicated
//! file owning the `#[no_mangle] extern "C" fn neptune_*` boundary) and
//! on `original_source/nagini/compiler/c/builtin.h`'s own external
//! surface (`alloc_*`, `NgGetMember`/`NgSetMember`/`NgCall`, `hash`,
//! `INCREF`/`DECREF`).

use std::ffi::CString;

use libc::{c_char, size_t};

use crate::arith::{self, BinOp};
use crate::bytes::BytesObject;
use crate::dict::Dict;
use crate::error::{fail, Kind};
use crate::function::{Function, NativeFn};
use crate::instance::Instance;
use crate::list::List;
use crate::numeric::{FloatObject, IntObject};
use crate::object::{Tag, Value};
use crate::protocol;
use crate::refcount::{decref, incref};
use crate::runtime::{self, Runtime};
use crate::strings::UnicodeObject;
use crate::tuple::Tuple;

unsafe fn c_str_to_rust<'a>(ptr: *const c_char, len: size_t) -> &'a str {
    let bytes = std::slice::from_raw_parts(ptr as *const u8, len);
    std::str::from_utf8(bytes)
        .unwrap_or_else(|_| fail(Kind::ValueError, "invalid UTF-8 passed across the external interface"))
}

/// Bring up a fresh runtime (allocates the pool set, seeds the SipHash
/// key, interns the built-in name table) and hand the embedding binary
/// an owning pointer. Exactly one of these should exist per process
/// (spec §5: single-threaded, one runtime).
#[no_mangle]
pub unsafe extern "C" fn nagini_init_runtime() -> *mut Runtime {
    Box::into_raw(runtime::init_runtime())
}

#[no_mangle]
pub unsafe extern "C" fn nagini_shutdown_runtime(runtime: *mut Runtime) {
    if !runtime.is_null() {
        drop(Box::from_raw(runtime));
    }
}

// --- construction -----------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_int(runtime: *mut Runtime, value: i64) -> Value {
    IntObject::alloc(&mut *runtime, value)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_float(runtime: *mut Runtime, value: f64) -> Value {
    FloatObject::alloc(&mut *runtime, value)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_bool(runtime: *mut Runtime, value: bool) -> Value {
    IntObject::alloc_bool(&mut *runtime, value)
}

/// `utf8` must point at `len` bytes of valid UTF-8; compiler-generated
/// code is responsible for that invariant, the same contract
/// `alloc_str` has in the original.
#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_string(
    runtime: *mut Runtime,
    utf8: *const c_char,
    len: size_t,
) -> Value {
    let bytes = std::slice::from_raw_parts(utf8 as *const u8, len);
    let text = std::str::from_utf8(bytes)
        .unwrap_or_else(|_| fail(Kind::ValueError, "invalid UTF-8 passed to nagini_alloc_string"));
    let type_name = (*runtime).get_symbol_id("str");
    UnicodeObject::alloc(text, (*runtime).siphash_key, type_name) as Value
}

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_bytes(
    runtime: *mut Runtime,
    data: *const u8,
    len: size_t,
) -> Value {
    let bytes = std::slice::from_raw_parts(data, len);
    let type_name = (*runtime).get_symbol_id("bytes");
    BytesObject::alloc(bytes, (*runtime).siphash_key, type_name) as Value
}

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_list(runtime: *mut Runtime) -> Value {
    let slot = (*runtime).pools.list.alloc().unwrap_or_else(|| {
        fail(Kind::MemoryError, "out of memory allocating list")
    }) as *mut List;
    let type_name = (*runtime).get_symbol_id("list");
    List::init(&mut *slot, type_name);
    slot as Value
}

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_list_empty(runtime: *mut Runtime, capacity: size_t) -> Value {
    let slot = (*runtime).pools.list.alloc().unwrap_or_else(|| {
        fail(Kind::MemoryError, "out of memory allocating list")
    }) as *mut List;
    let type_name = (*runtime).get_symbol_id("list");
    List::init_with_capacity(&mut *slot, type_name, capacity);
    slot as Value
}

/// Ownership of each element in `elements` transfers into the list
/// without an incref, matching `nagini_tuple_set`'s contract.
#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_list_prefill(
    runtime: *mut Runtime,
    elements: *const Value,
    len: size_t,
) -> Value {
    let slot = (*runtime).pools.list.alloc().unwrap_or_else(|| {
        fail(Kind::MemoryError, "out of memory allocating list")
    }) as *mut List;
    let type_name = (*runtime).get_symbol_id("list");
    List::init_with_capacity(&mut *slot, type_name, len.max(1));
    let items = std::slice::from_raw_parts(elements, len);
    for &item in items {
        List::append(&mut *slot, item);
    }
    slot as Value
}

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_dict(runtime: *mut Runtime) -> Value {
    let slot = (*runtime).pools.dict.alloc().unwrap_or_else(|| {
        fail(Kind::MemoryError, "out of memory allocating dict")
    }) as *mut Dict;
    let type_name = (*runtime).get_symbol_id("dict");
    Dict::init(&mut *slot, type_name);
    slot as Value
}

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_tuple(runtime: *mut Runtime, length: size_t) -> Value {
    let type_name = (*runtime).get_symbol_id("tuple");
    Tuple::alloc(length, type_name) as Value
}

/// Ownership of `element` transfers into the tuple without an incref,
/// matching `alloc_tuple`'s contract: the caller built up each element's
/// reference count for exactly this purpose.
#[no_mangle]
pub unsafe extern "C" fn nagini_tuple_set(tuple: Value, index: size_t, element: Value) {
    Tuple::set(tuple as *mut Tuple, index, element);
}

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_instance(runtime: *mut Runtime, type_name: i32) -> Value {
    let slot = (*runtime).pools.instance.alloc().unwrap_or_else(|| {
        fail(Kind::MemoryError, "out of memory allocating instance")
    }) as *mut Instance;
    Instance::init(&mut *slot, type_name);
    slot as Value
}

#[no_mangle]
pub unsafe extern "C" fn nagini_alloc_function(
    runtime: *mut Runtime,
    name: *const c_char,
    name_len: size_t,
    line: i32,
    argc: i32,
    native_ptr: NativeFn,
) -> Value {
    let text = c_str_to_rust(name, name_len);
    Function::alloc(&mut *runtime, text, line, argc, native_ptr) as Value
}

// --- reference counting ------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn nagini_incref(value: Value) {
    incref(value);
}

#[no_mangle]
pub unsafe extern "C" fn nagini_decref(runtime: *mut Runtime, value: Value) {
    decref(&mut *runtime, value);
}

// --- attribute protocol --------------------------------------------------

/// Returns an owned reference (`NgGetMember` bumps the refcount on the
/// caller's behalf, per the generic-dict-get-doesn't-but-this-does note
/// in the design notes); the caller must `nagini_decref` it eventually.
#[no_mangle]
pub unsafe extern "C" fn nagini_get_attr(runtime: *mut Runtime, target: Value, name: Value) -> Value {
    protocol::get_attr(&mut *runtime, target, name).unwrap_or(std::ptr::null_mut())
}

#[no_mangle]
pub unsafe extern "C" fn nagini_set_attr(runtime: *mut Runtime, target: Value, name: Value, value: Value) {
    protocol::set_attr(&mut *runtime, target, name, value);
}

#[no_mangle]
pub unsafe extern "C" fn nagini_del_attr(runtime: *mut Runtime, target: Value, name: Value) -> bool {
    protocol::del_attr(&mut *runtime, target, name)
}

// --- item / container protocol ------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn nagini_len(target: Value) -> size_t {
    protocol::len(target)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_get_item(target: Value, key: Value) -> Value {
    protocol::get_item(target, key).unwrap_or(std::ptr::null_mut())
}

#[no_mangle]
pub unsafe extern "C" fn nagini_set_item(runtime: *mut Runtime, target: Value, key: Value, value: Value) {
    protocol::set_item(&mut *runtime, target, key, value);
}

#[no_mangle]
pub unsafe extern "C" fn nagini_del_item(runtime: *mut Runtime, target: Value, key: Value) -> bool {
    protocol::del_item(&mut *runtime, target, key)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_contains(target: Value, needle: Value) -> bool {
    protocol::contains(target, needle)
}

/// Splice `value` onto the front of `tuple`'s elements into a freshly
/// allocated tuple; the receiver convention bound methods rely on
/// (spec §6: "`args.items[0]` is the receiver").
#[no_mangle]
pub unsafe extern "C" fn nagini_prepend_tuple(runtime: *mut Runtime, value: Value, tuple: Value) -> Value {
    protocol::prepend_tuple(&mut *runtime, value, tuple)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_cat_tuple(runtime: *mut Runtime, a: Value, b: Value) -> Value {
    protocol::cat_tuple(&mut *runtime, a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_cat_str(runtime: *mut Runtime, a: Value, b: Value) -> Value {
    protocol::cat_str(&mut *runtime, a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_joined_str(runtime: *mut Runtime, values: *const Value, len: size_t) -> Value {
    let slice = std::slice::from_raw_parts(values, len);
    protocol::joined_str(&mut *runtime, slice)
}

/// `fmt_spec` is read as `len` bytes of UTF-8, matching
/// `nagini_alloc_string`'s own contract.
#[no_mangle]
pub unsafe extern "C" fn nagini_format_value(
    runtime: *mut Runtime,
    value: Value,
    fmt_spec: *const c_char,
    fmt_spec_len: size_t,
) -> Value {
    let spec = c_str_to_rust(fmt_spec, fmt_spec_len);
    protocol::format_value(&mut *runtime, value, spec)
}

// --- call protocol --------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn nagini_call(runtime: *mut Runtime, target: Value, args: Value, kwargs: Value) -> Value {
    protocol::call(&mut *runtime, target, args, kwargs)
}

// --- arithmetic / comparison / hashing -------------------------------------

#[no_mangle]
pub unsafe extern "C" fn nagini_hash(value: Value) -> i64 {
    arith::hash_value(value)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_equals(a: Value, b: Value) -> bool {
    arith::values_equal(a, b)
}

/// Returns -1/0/1, matching the common `<=>`-style C comparison
/// convention since a richer `Ordering` type has no stable C ABI.
#[no_mangle]
pub unsafe extern "C" fn nagini_compare(a: Value, b: Value) -> i32 {
    match protocol::compare(a, b) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub enum NaginiBinOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    TrueDiv = 3,
    FloorDiv = 4,
    Mod = 5,
    Pow = 6,
}

impl From<NaginiBinOp> for BinOp {
    fn from(op: NaginiBinOp) -> BinOp {
        match op {
            NaginiBinOp::Add => BinOp::Add,
            NaginiBinOp::Sub => BinOp::Sub,
            NaginiBinOp::Mul => BinOp::Mul,
            NaginiBinOp::TrueDiv => BinOp::TrueDiv,
            NaginiBinOp::FloorDiv => BinOp::FloorDiv,
            NaginiBinOp::Mod => BinOp::Mod,
            NaginiBinOp::Pow => BinOp::Pow,
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn nagini_binop(runtime: *mut Runtime, op: NaginiBinOp, a: Value, b: Value) -> Value {
    match protocol::binary_op(op.into(), a, b) {
        arith::Number::Int(v) => nagini_alloc_int(runtime, v),
        arith::Number::Float(v) => nagini_alloc_float(runtime, v),
    }
}

// Named arithmetic/comparison entry points (spec §6's `add`, `sub`,
// `mul`, `true_div`, `floor_div`, `mod`, `pow`, `eq`, `neq`, `lt`,
// `leq`, `gt`, `geq`), each a thin wrapper over the same dispatch
// `nagini_binop`/`nagini_compare` already perform.

#[no_mangle]
pub unsafe extern "C" fn nagini_add(runtime: *mut Runtime, a: Value, b: Value) -> Value {
    nagini_binop(runtime, NaginiBinOp::Add, a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_sub(runtime: *mut Runtime, a: Value, b: Value) -> Value {
    nagini_binop(runtime, NaginiBinOp::Sub, a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_mul(runtime: *mut Runtime, a: Value, b: Value) -> Value {
    nagini_binop(runtime, NaginiBinOp::Mul, a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_true_div(runtime: *mut Runtime, a: Value, b: Value) -> Value {
    nagini_binop(runtime, NaginiBinOp::TrueDiv, a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_floor_div(runtime: *mut Runtime, a: Value, b: Value) -> Value {
    nagini_binop(runtime, NaginiBinOp::FloorDiv, a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_mod(runtime: *mut Runtime, a: Value, b: Value) -> Value {
    nagini_binop(runtime, NaginiBinOp::Mod, a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_pow(runtime: *mut Runtime, a: Value, b: Value) -> Value {
    nagini_binop(runtime, NaginiBinOp::Pow, a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_eq(a: Value, b: Value) -> bool {
    arith::values_equal(a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_neq(a: Value, b: Value) -> bool {
    !arith::values_equal(a, b)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_lt(a: Value, b: Value) -> bool {
    protocol::compare(a, b) == std::cmp::Ordering::Less
}

#[no_mangle]
pub unsafe extern "C" fn nagini_leq(a: Value, b: Value) -> bool {
    protocol::compare(a, b) != std::cmp::Ordering::Greater
}

#[no_mangle]
pub unsafe extern "C" fn nagini_gt(a: Value, b: Value) -> bool {
    protocol::compare(a, b) == std::cmp::Ordering::Greater
}

#[no_mangle]
pub unsafe extern "C" fn nagini_geq(a: Value, b: Value) -> bool {
    protocol::compare(a, b) != std::cmp::Ordering::Less
}

// --- casts ------------------------------------------------------------------

/// `cast_to_int`: truncating numeric conversion. Non-numeric operands
/// are a `TypeError`, matching the rest of the arithmetic surface.
#[no_mangle]
pub unsafe extern "C" fn nagini_cast_to_int(runtime: *mut Runtime, value: Value) -> Value {
    let result = match (*value).tag() {
        Tag::Int => (*(value as *const IntObject)).value,
        Tag::Float => (*(value as *const FloatObject)).value as i64,
        other => fail(Kind::TypeError, &format!("cannot cast '{other}' to int")),
    };
    IntObject::alloc(&mut *runtime, result)
}

#[no_mangle]
pub unsafe extern "C" fn nagini_cast_to_float(runtime: *mut Runtime, value: Value) -> Value {
    let result = match (*value).tag() {
        Tag::Int => (*(value as *const IntObject)).value as f64,
        Tag::Float => (*(value as *const FloatObject)).value,
        other => fail(Kind::TypeError, &format!("cannot cast '{other}' to float")),
    };
    FloatObject::alloc(&mut *runtime, result)
}

// --- type name ---------------------------------------------------------------

/// Returns a heap-allocated, NUL-terminated C string naming `value`'s
/// type; ownership transfers to the caller (release with the platform
/// `free`, matching `CString::into_raw`'s contract).
#[no_mangle]
pub unsafe extern "C" fn nagini_type_name(runtime: *mut Runtime, value: Value) -> *mut c_char {
    let name = (*runtime).symbol_name((*value).type_name).unwrap_or("?");
    CString::new(name).unwrap().into_raw()
}

/// Writes `value`'s type name into `buffer` (truncated to `size - 1`
/// bytes plus a NUL terminator); returns the untruncated length.
#[no_mangle]
pub unsafe extern "C" fn nagini_get_type_name(
    runtime: *mut Runtime,
    value: Value,
    buffer: *mut c_char,
    size: size_t,
) -> size_t {
    let name = (*runtime).symbol_name((*value).type_name).unwrap_or("?");
    write_truncated(name, buffer, size)
}

unsafe fn write_truncated(text: &str, buffer: *mut c_char, size: size_t) -> size_t {
    if size > 0 {
        let bytes = text.as_bytes();
        let copy_len = bytes.len().min(size - 1);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer as *mut u8, copy_len);
        *buffer.add(copy_len) = 0;
    }
    text.len()
}

// --- stringification -------------------------------------------------------

/// Returns a freshly allocated `StringObject` holding `repr(value)` /
/// `str(value)`; the caller owns the returned reference.
#[no_mangle]
pub unsafe extern "C" fn nagini_str(runtime: *mut Runtime, value: Value) -> Value {
    let text = protocol::stringify(&mut *runtime, value);
    let type_name = (*runtime).get_symbol_id("str");
    UnicodeObject::alloc(&text, (*runtime).siphash_key, type_name) as Value
}

/// `to_cstring`: same text as `nagini_str`, but handed back as a
/// heap-allocated, NUL-terminated C string rather than a guest string
/// object. Ownership transfers to the caller, same as `nagini_type_name`.
#[no_mangle]
pub unsafe extern "C" fn nagini_to_cstring(runtime: *mut Runtime, value: Value) -> *mut c_char {
    let text = protocol::stringify(&mut *runtime, value);
    CString::new(text).unwrap_or_else(|_| CString::new("<string contains NUL>").unwrap()).into_raw()
}

// --- symbol table -----------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn nagini_get_symbol_id(
    runtime: *mut Runtime,
    name: *const c_char,
    len: size_t,
) -> i32 {
    let bytes = std::slice::from_raw_parts(name as *const u8, len);
    let text = std::str::from_utf8(bytes)
        .unwrap_or_else(|_| fail(Kind::ValueError, "invalid UTF-8 symbol name"));
    (*runtime).get_symbol_id(text)
}
