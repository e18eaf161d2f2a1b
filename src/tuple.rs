//! Fixed-length immutable tuple variant (runtime component C5).
//!
//! Laid out as a header followed immediately by `length` `Value`
//! pointers — the Rust equivalent of the original's flexible array
//! member (`struct Tuple { ...; Object *items[]; }`). The whole object,
//! header plus trailing elements, is one allocation sized at
//! construction time and freed as a single manual block.

use std::alloc::{self, Layout};
use std::ptr;

use crate::object::{Header, Tag, Value};

#[repr(C)]
pub struct Tuple {
    pub header: Header,
    pub length: usize,
    // elements follow immediately in memory; accessed via `items()`/`items_mut()`.
}

fn tuple_layout(length: usize) -> Layout {
    let header_part = Layout::new::<Tuple>();
    let items_part = Layout::array::<Value>(length).expect("tuple length overflow");
    header_part.extend(items_part).expect("tuple layout overflow").0
}

impl Tuple {
    fn items_offset() -> usize {
        let header_part = Layout::new::<Tuple>();
        let items_part = Layout::array::<Value>(1).expect("layout");
        header_part.extend(items_part).expect("layout").1
    }

    /// Allocate a tuple of `length` slots. Elements are left
    /// uninitialized; the caller must fill every slot (each element's
    /// ownership transfers in without an incref, matching `alloc_tuple`)
    /// before the tuple becomes reachable.
    pub unsafe fn alloc(length: usize, type_name: i32) -> *mut Tuple {
        let layout = tuple_layout(length);
        let raw = alloc::alloc(layout);
        assert!(!raw.is_null(), "tuple allocation failed");
        let tuple = raw as *mut Tuple;
        (*tuple).header = Header::new(Tag::Tuple, true, 0, type_name);
        (*tuple).length = length;
        tuple
    }

    pub unsafe fn destroy(tuple: *mut Tuple) {
        let length = (*tuple).length;
        alloc::dealloc(tuple as *mut u8, tuple_layout(length));
    }

    unsafe fn items_ptr(tuple: *const Tuple) -> *mut Value {
        (tuple as *mut u8).add(Tuple::items_offset()) as *mut Value
    }

    pub unsafe fn set(tuple: *mut Tuple, index: usize, value: Value) {
        debug_assert!(index < (*tuple).length);
        ptr::write(Tuple::items_ptr(tuple).add(index), value);
    }

    pub unsafe fn get(tuple: *const Tuple, index: usize) -> Value {
        debug_assert!(index < (*tuple).length);
        ptr::read(Tuple::items_ptr(tuple).add(index))
    }

    pub unsafe fn as_slice<'a>(tuple: *const Tuple) -> &'a [Value] {
        std::slice::from_raw_parts(Tuple::items_ptr(tuple), (*tuple).length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Tag;

    fn fake_value(n: usize) -> Value {
        (n * 8) as *mut Header
    }

    #[test]
    fn alloc_set_get_round_trips() {
        unsafe {
            let t = Tuple::alloc(3, 0);
            Tuple::set(t, 0, fake_value(1));
            Tuple::set(t, 1, fake_value(2));
            Tuple::set(t, 2, fake_value(3));
            assert_eq!(Tuple::get(t, 0), fake_value(1));
            assert_eq!(Tuple::get(t, 2), fake_value(3));
            assert_eq!(Tuple::as_slice(t).len(), 3);
            assert_eq!((*t).header.tag(), Tag::Tuple);
            Tuple::destroy(t);
        }
    }
}
