//! Mutable, growable list variant (runtime component C8).
//!
//! `items` is a manually managed buffer sized independently of the
//! fixed-size `List` header struct (the header itself comes from the
//! dedicated list pool; the backing array grows geometrically like any
//! other manually allocated payload). Ported from
//! `original_source/nagini/compiler/c/list.h`'s `list_t` (create, append
//! with doubling growth, linear find, remove with memmove and
//! shrink-at-quarter-capacity, bulk concat) with the elements themselves
//! being `Value` pointers instead of raw `void*`.

use std::alloc::{self, Layout};
use std::ptr;

use crate::dict::Dict;
use crate::function::{Function, NativeFn};
use crate::hash::siphash24;
use crate::numeric::IntObject;
use crate::object::{Header, Tag, Value};
use crate::runtime::Runtime;
use crate::strings::UnicodeObject;
use crate::tuple::Tuple;

const DEFAULT_CAPACITY: usize = 1;

#[repr(C)]
pub struct List {
    pub header: Header,
    pub size: usize,
    pub capacity: usize,
    pub items: *mut Value,
    /// Lazily-built attribute dict holding bound `append`/`pop`/...
    /// method objects, the same `__dict__`-on-demand pattern
    /// `Instance` uses for its own attributes. Null until the first
    /// attribute lookup.
    pub methods: *mut Dict,
}

fn items_layout(capacity: usize) -> Layout {
    Layout::array::<Value>(capacity.max(1)).expect("list capacity overflow")
}

/// Name, declared argument count, and native entry point for every
/// method a list's attribute dict can produce a bound `Function` for.
/// `argc` is descriptive (carried on the `Function`, per spec §3) and
/// not enforced here; `pop`'s native accepts zero or one argument.
const LIST_METHODS: &[(&str, i32, NativeFn)] = &[
    ("append", 1, native_append),
    ("pop", 0, native_pop),
    ("remove", 1, native_remove),
    ("clear", 0, native_clear),
    ("index", 1, native_index),
    ("extend", 1, native_extend),
];

impl List {
    /// Initialize a freshly pool-allocated `List` header in place,
    /// matching `alloc_list`'s default capacity of one slot.
    pub fn init(list: &mut List, type_name: i32) {
        List::init_with_capacity(list, type_name, DEFAULT_CAPACITY);
    }

    /// `alloc_list_empty(cap)`: same as `init`, but with a caller-chosen
    /// starting capacity instead of the default single slot.
    pub fn init_with_capacity(list: &mut List, type_name: i32, capacity: usize) {
        list.header = Header::new(Tag::List, false, 0, type_name);
        list.size = 0;
        list.capacity = capacity.max(1);
        list.methods = ptr::null_mut();
        unsafe {
            list.items = alloc::alloc(items_layout(list.capacity)) as *mut Value;
        }
    }

    /// Tear down the backing buffer; callers are responsible for
    /// decref'ing each element and tearing down `methods` before
    /// calling this (the refcount engine owns that ordering, not the
    /// container itself).
    pub fn destroy(list: &mut List) {
        unsafe {
            alloc::dealloc(list.items as *mut u8, items_layout(list.capacity));
        }
        list.items = ptr::null_mut();
        list.size = 0;
        list.capacity = 0;
    }

    fn grow(list: &mut List, min_capacity: usize) {
        let mut new_capacity = list.capacity.max(1);
        while new_capacity < min_capacity {
            new_capacity *= 2;
        }
        if new_capacity == list.capacity {
            return;
        }
        unsafe {
            let new_ptr = alloc::realloc(
                list.items as *mut u8,
                items_layout(list.capacity),
                items_layout(new_capacity).size(),
            ) as *mut Value;
            assert!(!new_ptr.is_null(), "list buffer reallocation failed");
            list.items = new_ptr;
        }
        list.capacity = new_capacity;
    }

    fn shrink_if_sparse(list: &mut List) {
        if list.capacity > DEFAULT_CAPACITY && list.size <= list.capacity / 4 {
            let new_capacity = (list.capacity / 2).max(DEFAULT_CAPACITY);
            unsafe {
                let new_ptr = alloc::realloc(
                    list.items as *mut u8,
                    items_layout(list.capacity),
                    items_layout(new_capacity).size(),
                ) as *mut Value;
                if !new_ptr.is_null() {
                    list.items = new_ptr;
                    list.capacity = new_capacity;
                }
            }
        }
    }

    /// Append `value` to the end, doubling capacity when full. Does not
    /// incref `value` — ownership transfer is the caller's
    /// responsibility, matching the original's contract for container
    /// insertion primitives.
    pub fn append(list: &mut List, value: Value) {
        if list.size == list.capacity {
            List::grow(list, list.capacity + 1);
        }
        unsafe {
            *list.items.add(list.size) = value;
        }
        list.size += 1;
    }

    /// Linear scan for `needle` by pointer identity. Richer
    /// element-equality search (recursive `==`) belongs to the
    /// container protocol layer, which can call this after normalizing
    /// `needle` itself, or do its own scan with `ObjectsEqual`.
    pub fn find(list: &List, needle: Value) -> Option<usize> {
        unsafe {
            for i in 0..list.size {
                if *list.items.add(i) == needle {
                    return Some(i);
                }
            }
        }
        None
    }

    /// Remove the element at `index`, shifting later elements down by
    /// one and shrinking the backing buffer once occupancy drops to a
    /// quarter of capacity. Returns the removed value (still owning its
    /// reference) so the caller can decref it.
    pub fn remove_at(list: &mut List, index: usize) -> Value {
        assert!(index < list.size, "list index out of bounds");
        unsafe {
            let removed = *list.items.add(index);
            let tail = list.size - index - 1;
            if tail > 0 {
                ptr::copy(
                    list.items.add(index + 1),
                    list.items.add(index),
                    tail,
                );
            }
            list.size -= 1;
            List::shrink_if_sparse(list);
            removed
        }
    }

    /// Bulk-append every element of `other` onto `list`, in order.
    pub fn extend_from(list: &mut List, other: &List) {
        List::grow(list, list.size + other.size);
        unsafe {
            ptr::copy_nonoverlapping(
                other.items,
                list.items.add(list.size),
                other.size,
            );
        }
        list.size += other.size;
    }

    pub fn get(list: &List, index: usize) -> Option<Value> {
        if index < list.size {
            unsafe { Some(*list.items.add(index)) }
        } else {
            None
        }
    }

    pub fn set(list: &mut List, index: usize, value: Value) -> Option<Value> {
        if index >= list.size {
            return None;
        }
        unsafe {
            let old = *list.items.add(index);
            *list.items.add(index) = value;
            Some(old)
        }
    }

    fn ensure_methods<'a>(list: &'a mut List, runtime: &mut Runtime) -> &'a mut Dict {
        if list.methods.is_null() {
            unsafe {
                let raw = runtime
                    .pools
                    .dict
                    .alloc()
                    .expect("out of memory allocating dict");
                let dict = raw as *mut Dict;
                Dict::init(&mut *dict, list.header.type_name);
                list.methods = dict;
            }
        }
        unsafe { &mut *list.methods }
    }

    /// `get_member(list, name)`: look up an already-bound method first,
    /// then bind `name` against the known method table on first use —
    /// comparing by cached hash alone, matching the string equality
    /// rule elsewhere in the runtime (§4.7) rather than a fresh content
    /// comparison. The bound `Function` is cached in `methods` so
    /// repeated lookups of the same name return the same object.
    pub fn get_method(list: &mut List, runtime: &mut Runtime, name: Value) -> Option<Value> {
        unsafe {
            if (*name).tag() != Tag::String {
                return None;
            }
            let list_ptr = list as *mut List as Value;
            let methods = List::ensure_methods(list, runtime);
            if let Some(bound) = Dict::get(methods, name) {
                return Some(bound);
            }
            let incoming_hash = (*(name as *const UnicodeObject)).hash;
            for &(method_name, argc, native) in LIST_METHODS {
                if siphash24(runtime.siphash_key, method_name.as_bytes()) as i64 == incoming_hash {
                    let bound = Function::alloc_bound(runtime, list_ptr, method_name, argc, native);
                    Dict::set(methods, runtime, name, bound as Value);
                    // `alloc_bound` hands back the object's sole initial
                    // reference; `Dict::set` just took its own, so drop
                    // the original and let the dict be the sole owner
                    // (the value returned here is borrowed, like `Dict::get`).
                    crate::refcount::decref(runtime, bound as Value);
                    return Some(bound as Value);
                }
            }
            None
        }
    }
}

/// Every native below is reached only through a bound `Function`, so
/// `args.items[0]` is always the receiving list (spec §6: "bound-method
/// natives ... `args.items[0]` is the receiver").

unsafe extern "C" fn native_append(_runtime: *mut Runtime, args: Value, _kwargs: Value) -> Value {
    let argv = Tuple::as_slice(args as *const Tuple);
    let list = &mut *(argv[0] as *mut List);
    let value = argv[1];
    crate::refcount::incref(value);
    List::append(list, value);
    ptr::null_mut()
}

unsafe extern "C" fn native_pop(_runtime: *mut Runtime, args: Value, _kwargs: Value) -> Value {
    let argv = Tuple::as_slice(args as *const Tuple);
    let list = &mut *(argv[0] as *mut List);
    let requested = if argv.len() > 1 {
        (*(argv[1] as *const IntObject)).value
    } else {
        list.size as i64 - 1
    };
    let index = if requested < 0 { requested + list.size as i64 } else { requested };
    if index < 0 || index as usize >= list.size {
        crate::error::fail(crate::error::Kind::IndexError, "pop from empty list");
    }
    List::remove_at(list, index as usize)
}

unsafe extern "C" fn native_remove(runtime: *mut Runtime, args: Value, _kwargs: Value) -> Value {
    let argv = Tuple::as_slice(args as *const Tuple);
    let list = &mut *(argv[0] as *mut List);
    let needle = argv[1];
    match List::find(list, needle) {
        Some(index) => {
            let removed = List::remove_at(list, index);
            crate::refcount::decref(&mut *runtime, removed);
            ptr::null_mut()
        }
        None => crate::error::fail(crate::error::Kind::ValueError, "list.remove(x): x not in list"),
    }
}

unsafe extern "C" fn native_clear(runtime: *mut Runtime, args: Value, _kwargs: Value) -> Value {
    let argv = Tuple::as_slice(args as *const Tuple);
    let list = &mut *(argv[0] as *mut List);
    let rt = &mut *runtime;
    while list.size > 0 {
        let removed = List::remove_at(list, list.size - 1);
        crate::refcount::decref(rt, removed);
    }
    ptr::null_mut()
}

unsafe extern "C" fn native_index(runtime: *mut Runtime, args: Value, _kwargs: Value) -> Value {
    let argv = Tuple::as_slice(args as *const Tuple);
    let list = &*(argv[0] as *const List);
    let needle = argv[1];
    match List::find(list, needle) {
        Some(index) => IntObject::alloc(&mut *runtime, index as i64),
        None => crate::error::fail(crate::error::Kind::ValueError, "value not in list"),
    }
}

unsafe extern "C" fn native_extend(_runtime: *mut Runtime, args: Value, _kwargs: Value) -> Value {
    let argv = Tuple::as_slice(args as *const Tuple);
    let list = &mut *(argv[0] as *mut List);
    let other = &*(argv[1] as *const List);
    for i in 0..other.size {
        if let Some(v) = List::get(other, i) {
            crate::refcount::incref(v);
        }
    }
    List::extend_from(list, other);
    ptr::null_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    fn fake_value(tag_byte: usize) -> Value {
        (tag_byte * 8) as *mut Header
    }

    #[test]
    fn append_grows_geometrically() {
        let mut list = List {
            header: Header::new(Tag::List, false, 0, 0),
            size: 0,
            capacity: 0,
            items: ptr::null_mut(),
            methods: ptr::null_mut(),
        };
        List::init(&mut list, 0);
        for i in 1..=10 {
            List::append(&mut list, fake_value(i));
        }
        assert_eq!(list.size, 10);
        assert!(list.capacity >= 10);
        List::destroy(&mut list);
    }

    #[test]
    fn find_locates_by_pointer_identity() {
        let mut list = List {
            header: Header::new(Tag::List, false, 0, 0),
            size: 0,
            capacity: 0,
            items: ptr::null_mut(),
            methods: ptr::null_mut(),
        };
        List::init(&mut list, 0);
        let a = fake_value(1);
        let b = fake_value(2);
        List::append(&mut list, a);
        List::append(&mut list, b);
        assert_eq!(List::find(&list, a), Some(0));
        assert_eq!(List::find(&list, b), Some(1));
        assert_eq!(List::find(&list, fake_value(99)), None);
        List::destroy(&mut list);
    }

    #[test]
    fn remove_at_shifts_tail_and_shrinks() {
        let mut list = List {
            header: Header::new(Tag::List, false, 0, 0),
            size: 0,
            capacity: 0,
            items: ptr::null_mut(),
            methods: ptr::null_mut(),
        };
        List::init(&mut list, 0);
        for i in 1..=8 {
            List::append(&mut list, fake_value(i));
        }
        let removed = List::remove_at(&mut list, 0);
        assert_eq!(removed, fake_value(1));
        assert_eq!(list.size, 7);
        assert_eq!(List::get(&list, 0), Some(fake_value(2)));
        List::destroy(&mut list);
    }

    #[test]
    fn extend_from_concatenates_in_order() {
        let mut a = List {
            header: Header::new(Tag::List, false, 0, 0),
            size: 0,
            capacity: 0,
            items: ptr::null_mut(),
            methods: ptr::null_mut(),
        };
        List::init(&mut a, 0);
        List::append(&mut a, fake_value(1));

        let mut b = List {
            header: Header::new(Tag::List, false, 0, 0),
            size: 0,
            capacity: 0,
            items: ptr::null_mut(),
            methods: ptr::null_mut(),
        };
        List::init(&mut b, 0);
        List::append(&mut b, fake_value(2));
        List::append(&mut b, fake_value(3));

        List::extend_from(&mut a, &b);
        assert_eq!(a.size, 3);
        assert_eq!(List::get(&a, 1), Some(fake_value(2)));
        assert_eq!(List::get(&a, 2), Some(fake_value(3)));

        List::destroy(&mut a);
        List::destroy(&mut b);
    }
}
