//! Callable variant (runtime component C5/C11 call protocol).
//!
//! A function object wraps a native function pointer with the calling
//! convention compiler-generated code and the runtime agree on: a
//! `Runtime*`, the positional-argument tuple and the keyword-argument
//! dict. Grounded on `original_source/nagini/compiler/c/builtin.h`'s
//! `Function` struct and `NgCall`.
//!
//! A bound method (spec §6: "`args.items[0]` is the receiver") is the
//! same struct with a non-null, unowned `receiver` — unowned because
//! the receiver is what owns the bound method in the first place (its
//! attribute dict), and an owning back-reference would be a retain
//! cycle neither object's teardown ever breaks.

use crate::object::{Header, Tag, Value};
use crate::runtime::Runtime;
use crate::strings::UnicodeObject;

pub type NativeFn =
    unsafe extern "C" fn(runtime: *mut Runtime, args: Value, kwargs: Value) -> Value;

#[repr(C)]
pub struct Function {
    pub header: Header,
    pub native_ptr: NativeFn,
    /// owned reference to the function's declared name string.
    pub name: Value,
    pub line: i32,
    pub argc: i32,
    /// non-null for a bound method; borrowed, not refcounted.
    pub receiver: Value,
}

impl Function {
    /// `alloc_function(name, line, argc, native_ptr)`.
    pub unsafe fn alloc(
        runtime: &mut Runtime,
        name: &str,
        line: i32,
        argc: i32,
        native_ptr: NativeFn,
    ) -> *mut Function {
        let slot = runtime
            .pools
            .functions
            .alloc()
            .expect("out of memory allocating function") as *mut Function;
        let type_name = runtime.get_symbol_id("function");
        let str_type = runtime.get_symbol_id("str");
        let name_obj = UnicodeObject::alloc(name, runtime.siphash_key, str_type) as Value;
        (*slot).header = Header::new(Tag::Function, false, 0, type_name);
        (*slot).native_ptr = native_ptr;
        (*slot).name = name_obj;
        (*slot).line = line;
        (*slot).argc = argc;
        (*slot).receiver = std::ptr::null_mut();
        slot
    }

    /// Build a bound method: the same native pointer, scoped to
    /// `receiver`. `receiver` is a borrowed back-pointer into whatever
    /// attribute dict will own the returned `Function`.
    pub unsafe fn alloc_bound(
        runtime: &mut Runtime,
        receiver: Value,
        name: &str,
        argc: i32,
        native_ptr: NativeFn,
    ) -> *mut Function {
        let func = Function::alloc(runtime, name, 0, argc, native_ptr);
        (*func).receiver = receiver;
        func
    }

    pub unsafe fn destroy(func: &mut Function, runtime: &mut Runtime) {
        crate::refcount::decref(runtime, func.name);
    }
}

/// `NgCall`: invoke the native function pointer with the runtime handle
/// plus the already-constructed argument tuple/keyword dict. For a
/// bound method, `receiver` is spliced onto the front of `args` first,
/// per the `args.items[0]` receiver convention.
pub unsafe fn call(func: &Function, runtime: &mut Runtime, args: Value, kwargs: Value) -> Value {
    if func.receiver.is_null() {
        (func.native_ptr)(runtime, args, kwargs)
    } else {
        let bound_args = crate::protocol::prepend_tuple(runtime, func.receiver, args);
        let result = (func.native_ptr)(runtime, bound_args, kwargs);
        crate::refcount::decref(runtime, bound_args);
        result
    }
}
