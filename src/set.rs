//! Set variant (thin stub — no operations wired up).
//!
//! `original_source/nagini/compiler/c/builtin.h` declares `OBJ_TYPE_SET`
//! and a `Set` struct but never implements any set operation on it; it
//! is carried here only so the type tag space and reference-count
//! teardown routing stay total over all ten tags. No arithmetic,
//! container, or protocol dispatch targets this variant.

use crate::dict::Dict;
use crate::object::Header;

#[repr(C)]
pub struct Set {
    pub header: Header,
    /// Reuses `Dict`'s storage (keys only, values unused) the same way
    /// the original backs `Set` with an `InstanceObject`-shaped dict.
    pub backing: *mut Dict,
}
