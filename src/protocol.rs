//! Attribute / item / call / length / stringification protocol surface
//! (runtime component C11).
//!
//! Each operation dispatches on the value's type tag the way the
//! original's `NgGetMember`/`NgSetMember`/`NgCall`/etc. free functions
//! do, routing attribute access through `Instance::__dict__`, item
//! access through `List`/`Dict`/`Tuple`, and falling back to
//! `TypeError` for anything that doesn't support the requested
//! operation.

use crate::arith::{numeric_binop, numeric_compare, BinOp};
use crate::bytes::BytesObject;
use crate::dict::Dict;
use crate::error::{fail, Kind};
use crate::function::{call as call_native, Function};
use crate::instance::Instance;
use crate::list::List;
use crate::numeric::{FloatObject, IntObject};
use crate::object::{Tag, Value};
use crate::runtime::Runtime;
use crate::strings::UnicodeObject;
use crate::tuple::Tuple;

/// `NgGetMember`: unlike a plain dict-get, the returned value's
/// refcount is bumped on the caller's behalf — every successful
/// attribute read must be paired with a `decref` once the caller is
/// done with it.
pub fn get_attr(runtime: &mut Runtime, target: Value, name: Value) -> Option<Value> {
    unsafe {
        let found = match (*target).tag() {
            Tag::Instance => Instance::get_attr(&*(target as *const Instance), name),
            Tag::List => List::get_method(&mut *(target as *mut List), runtime, name),
            _ => None,
        };
        if let Some(value) = found {
            crate::refcount::incref(value);
        }
        found
    }
}

pub fn set_attr(runtime: &mut Runtime, target: Value, name: Value, value: Value) {
    unsafe {
        match (*target).tag() {
            Tag::Instance => {
                Instance::set_attr(&mut *(target as *mut Instance), runtime, name, value)
            }
            other => fail(
                Kind::TypeError,
                &format!("'{}' object has no attribute assignment support", other),
            ),
        }
    }
}

pub fn del_attr(runtime: &mut Runtime, target: Value, name: Value) -> bool {
    unsafe {
        match (*target).tag() {
            Tag::Instance => Instance::del_attr(&mut *(target as *mut Instance), runtime, name),
            _ => false,
        }
    }
}

/// `__len__`.
pub fn len(target: Value) -> usize {
    unsafe {
        match (*target).tag() {
            Tag::List => (*(target as *const List)).size,
            Tag::Dict => Dict::len(&*(target as *const Dict)),
            Tag::Tuple => (*(target as *const Tuple)).length,
            Tag::String => (*(target as *const UnicodeObject)).length,
            Tag::Bytes => (*(target as *const BytesObject)).length,
            other => fail(Kind::TypeError, &format!("object of type '{other}' has no len()")),
        }
    }
}

/// `__getitem__`. List/tuple indices support Python-style negative
/// indexing (counted from the end); dict lookups go through the object
/// equality rule in `arith::values_equal`.
pub fn get_item(target: Value, key: Value) -> Option<Value> {
    unsafe {
        match (*target).tag() {
            Tag::List => {
                let list = &*(target as *const List);
                let idx = normalize_index(int_key(key), list.size)?;
                List::get(list, idx)
            }
            Tag::Tuple => {
                let tuple = target as *const Tuple;
                let idx = normalize_index(int_key(key), (*tuple).length)?;
                Some(Tuple::get(tuple, idx))
            }
            Tag::Dict => Dict::get(&*(target as *const Dict), key),
            other => fail(Kind::TypeError, &format!("'{other}' object is not subscriptable")),
        }
    }
}

/// `__setitem__`. Only `list` and `dict` support assignment; tuples are
/// immutable and strings/bytes are not assignable element-wise.
pub fn set_item(runtime: &mut Runtime, target: Value, key: Value, value: Value) {
    unsafe {
        match (*target).tag() {
            Tag::List => {
                let list = &mut *(target as *mut List);
                let idx = normalize_index(int_key(key), list.size)
                    .unwrap_or_else(|| fail(Kind::IndexError, "list assignment index out of range"));
                if let Some(old) = List::set(list, idx, value) {
                    crate::refcount::decref(runtime, old);
                }
                crate::refcount::incref(value);
            }
            Tag::Dict => {
                Dict::set(&mut *(target as *mut Dict), runtime, key, value);
            }
            other => fail(Kind::TypeError, &format!("'{other}' object does not support item assignment")),
        }
    }
}

/// `__delitem__`.
pub fn del_item(runtime: &mut Runtime, target: Value, key: Value) -> bool {
    unsafe {
        match (*target).tag() {
            Tag::Dict => Dict::remove(&mut *(target as *mut Dict), runtime, key),
            Tag::List => {
                let list = &mut *(target as *mut List);
                match normalize_index(int_key(key), list.size) {
                    Some(idx) => {
                        let removed = List::remove_at(list, idx);
                        crate::refcount::decref(runtime, removed);
                        true
                    }
                    None => false,
                }
            }
            other => fail(Kind::TypeError, &format!("'{other}' object doesn't support item deletion")),
        }
    }
}

/// `__contains__`.
pub fn contains(target: Value, needle: Value) -> bool {
    unsafe {
        match (*target).tag() {
            Tag::Dict => Dict::contains(&*(target as *const Dict), needle),
            Tag::List => List::find(&*(target as *const List), needle).is_some(),
            _ => fail(Kind::TypeError, "argument is not iterable"),
        }
    }
}

unsafe fn int_key(key: Value) -> i64 {
    if (*key).tag() != Tag::Int {
        fail(Kind::TypeError, "indices must be integers");
    }
    (*(key as *const IntObject)).value
}

fn normalize_index(index: i64, length: usize) -> Option<usize> {
    let normalized = if index < 0 {
        index + length as i64
    } else {
        index
    };
    if normalized < 0 || normalized as usize >= length {
        None
    } else {
        Some(normalized as usize)
    }
}

/// `__call__` via `NgCall`.
pub unsafe fn call(runtime: &mut Runtime, target: Value, args: Value, kwargs: Value) -> Value {
    match (*target).tag() {
        Tag::Function => call_native(&*(target as *const Function), runtime, args, kwargs),
        other => fail(Kind::TypeError, &format!("'{other}' object is not callable")),
    }
}

/// Binary operator dispatch combining numeric promotion with the
/// container-level overloads `+` gets for `str`/`list`/`tuple`
/// concatenation.
pub unsafe fn binary_op(op: BinOp, a: Value, b: Value) -> crate::arith::Number {
    numeric_binop(op, a, b)
}

pub unsafe fn compare(a: Value, b: Value) -> std::cmp::Ordering {
    numeric_compare(a, b)
}

/// `__repr__`/`__str__` for the built-in variants. Instances first try
/// a bound `__str__` member (§4.11); lacking one, they render as
/// `<TypeName at 0xADDRESS>`.
pub unsafe fn stringify(runtime: &mut Runtime, target: Value) -> String {
    match (*target).tag() {
        Tag::Int => format!("{}", (*(target as *const IntObject)).value),
        Tag::Float => format!("{}", (*(target as *const FloatObject)).value),
        Tag::String => UnicodeObject::to_string(target as *const UnicodeObject),
        Tag::Bytes => format!("{:?}", BytesObject::as_slice(target as *const BytesObject)),
        Tag::Tuple => {
            let elements: Vec<Value> = Tuple::as_slice(target as *const Tuple).to_vec();
            let parts: Vec<String> = elements.iter().map(|&v| stringify(runtime, v)).collect();
            format!("({})", parts.join(", "))
        }
        Tag::List => {
            let size = (*(target as *const List)).size;
            let mut parts = Vec::with_capacity(size);
            for i in 0..size {
                if let Some(v) = List::get(&*(target as *const List), i) {
                    parts.push(stringify(runtime, v));
                }
            }
            format!("[{}]", parts.join(", "))
        }
        Tag::Instance => instance_str(runtime, target),
        _ => format!("<object at {:p}>", target),
    }
}

unsafe fn instance_str(runtime: &mut Runtime, target: Value) -> String {
    if let Some(name) = runtime.builtin_names.lookup("__str__") {
        if let Some(method) = Instance::get_attr(&*(target as *const Instance), name as Value) {
            if (*method).tag() == Tag::Function {
                let func = &*(method as *const Function);
                let tuple_type = runtime.get_symbol_id("tuple");
                let args = Tuple::alloc(0, tuple_type);
                let result = call_native(func, runtime, args as Value, std::ptr::null_mut());
                Tuple::destroy(args);
                if !result.is_null() {
                    let text = if (*result).tag() == Tag::String {
                        Some(UnicodeObject::to_string(result as *const UnicodeObject))
                    } else {
                        None
                    };
                    crate::refcount::decref(runtime, result);
                    if let Some(text) = text {
                        return text;
                    }
                }
            }
        }
    }
    let type_name = runtime
        .symbol_name((*target).type_name)
        .unwrap_or("Instance")
        .to_string();
    format!("<{type_name} at {target:p}>")
}

/// `prepend_tuple`: build a new tuple with `value` spliced onto the
/// front of `tuple`'s elements. Shared by the external interface and by
/// bound-method dispatch, which uses it to splice the receiver onto a
/// call's positional arguments (spec §6: "`args.items[0]` is the
/// receiver").
pub unsafe fn prepend_tuple(runtime: &mut Runtime, value: Value, tuple: Value) -> Value {
    let elements = Tuple::as_slice(tuple as *const Tuple);
    let type_name = runtime.get_symbol_id("tuple");
    let result = Tuple::alloc(elements.len() + 1, type_name);
    crate::refcount::incref(value);
    Tuple::set(result, 0, value);
    for (i, &element) in elements.iter().enumerate() {
        crate::refcount::incref(element);
        Tuple::set(result, i + 1, element);
    }
    result as Value
}

/// `cat_tuple`: concatenate two tuples into a freshly allocated one.
pub unsafe fn cat_tuple(runtime: &mut Runtime, a: Value, b: Value) -> Value {
    let left = Tuple::as_slice(a as *const Tuple);
    let right = Tuple::as_slice(b as *const Tuple);
    let type_name = runtime.get_symbol_id("tuple");
    let result = Tuple::alloc(left.len() + right.len(), type_name);
    for (i, &element) in left.iter().chain(right.iter()).enumerate() {
        crate::refcount::incref(element);
        Tuple::set(result, i, element);
    }
    result as Value
}

/// `cat_str`: concatenate two strings into a freshly allocated one.
pub unsafe fn cat_str(runtime: &mut Runtime, a: Value, b: Value) -> Value {
    let mut combined = UnicodeObject::to_string(a as *const UnicodeObject);
    combined.push_str(&UnicodeObject::to_string(b as *const UnicodeObject));
    let type_name = runtime.get_symbol_id("str");
    UnicodeObject::alloc(&combined, runtime.siphash_key, type_name) as Value
}

/// `joined_str(values[], n)`: concatenate the string representation of
/// every value in `values`, in order, with no separator.
pub unsafe fn joined_str(runtime: &mut Runtime, values: &[Value]) -> Value {
    let mut combined = String::new();
    for &v in values {
        combined.push_str(&stringify(runtime, v));
    }
    let type_name = runtime.get_symbol_id("str");
    UnicodeObject::alloc(&combined, runtime.siphash_key, type_name) as Value
}

/// `format_value(v, spec)`: a minimal `format`-mini-language subset. An
/// empty spec falls back to `str(v)`; a `.Nf` precision spec on a
/// numeric value renders exactly `N` digits after the point.
pub unsafe fn format_value(runtime: &mut Runtime, value: Value, spec: &str) -> Value {
    let precision = spec
        .strip_prefix('.')
        .and_then(|s| s.strip_suffix('f'))
        .and_then(|s| s.parse::<usize>().ok());
    let text = match (precision, (*value).tag()) {
        (Some(p), Tag::Float) => format!("{:.*}", p, (*(value as *const FloatObject)).value),
        (Some(p), Tag::Int) => format!("{:.*}", p, (*(value as *const IntObject)).value as f64),
        _ => stringify(runtime, value),
    };
    let type_name = runtime.get_symbol_id("str");
    UnicodeObject::alloc(&text, runtime.siphash_key, type_name) as Value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_index_handles_negative_indices() {
        assert_eq!(normalize_index(-1, 5), Some(4));
        assert_eq!(normalize_index(0, 5), Some(0));
        assert_eq!(normalize_index(5, 5), None);
        assert_eq!(normalize_index(-6, 5), None);
    }
}
