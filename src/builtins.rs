//! Built-in dunder/protocol name catalogue (runtime component C12).
//!
//! `spec.md`'s own C12 calls out only a handful of names by example
//! (`__init__`, `__add__`, `__hash__`, ...); the original runtime's
//! `BuiltinNames` enumerates the full set generated code may probe, and
//! this module keeps that complete table so a lookup against any of
//! them resolves to the exact interned `StringObject` instance the
//! compiler's own references expect, rather than a fresh allocation
//! that would compare unequal by pointer.
//!
//! Ported from `original_source/nagini/compiler/c/builtin.h`'s
//! `BuiltinNames` struct, grouped into the same fourteen categories.

use crate::strings::UnicodeObject;

macro_rules! builtin_table {
    ($($name:literal),+ $(,)?) => {
        pub const BUILTIN_NAME_TABLE: &[&str] = &[$($name),+];
    };
}

builtin_table!(
    // lifecycle
    "__init__", "__new__", "__del__",
    // representation / str
    "__repr__", "__str__", "__format__", "__bytes__",
    // comparison / hash
    "__eq__", "__ne__", "__lt__", "__le__", "__gt__", "__ge__", "__hash__", "__bool__",
    // attribute / descriptor
    "__getattr__", "__setattr__", "__delattr__", "__getattribute__",
    "__get__", "__set__", "__delete__",
    // class structure / imports
    "__class__", "__bases__", "__mro__", "__subclasses__", "__import__",
    // containers
    "__len__", "__getitem__", "__setitem__", "__delitem__", "__iter__", "__next__",
    "__contains__", "__reversed__",
    // callable / context-manager
    "__call__", "__enter__", "__exit__",
    // async
    "__await__", "__aiter__", "__anext__", "__aenter__", "__aexit__",
    // numeric coercion
    "__int__", "__float__", "__index__", "__round__", "__trunc__", "__floor__", "__ceil__",
    // binary arithmetic
    "__add__", "__sub__", "__mul__", "__truediv__", "__floordiv__", "__mod__", "__divmod__",
    "__pow__", "__lshift__", "__rshift__", "__and__", "__or__", "__xor__", "__matmul__",
    // reflected arithmetic
    "__radd__", "__rsub__", "__rmul__", "__rtruediv__", "__rfloordiv__", "__rmod__",
    "__rdivmod__", "__rpow__", "__rlshift__", "__rrshift__", "__rand__", "__ror__", "__rxor__",
    // in-place arithmetic
    "__iadd__", "__isub__", "__imul__", "__itruediv__", "__ifloordiv__", "__imod__",
    "__ipow__", "__ilshift__", "__irshift__", "__iand__", "__ior__", "__ixor__",
    // unary
    "__neg__", "__pos__", "__invert__", "__abs__",
    // pickling / copy
    "__reduce__", "__reduce_ex__", "__getstate__", "__setstate__", "__copy__", "__deepcopy__",
);

/// Interned `StringObject` pointers, index-aligned with
/// [`BUILTIN_NAME_TABLE`]; populated once by `init_runtime` via
/// `Runtime::intern_builtin_names`.
pub struct BuiltinNames {
    interned: Vec<*mut UnicodeObject>,
}

impl BuiltinNames {
    pub fn new() -> BuiltinNames {
        BuiltinNames {
            interned: Vec::new(),
        }
    }

    pub fn bind(&mut self, interned: Vec<*mut UnicodeObject>) {
        debug_assert_eq!(interned.len(), BUILTIN_NAME_TABLE.len());
        self.interned = interned;
    }

    pub fn lookup(&self, name: &str) -> Option<*mut UnicodeObject> {
        BUILTIN_NAME_TABLE
            .iter()
            .position(|&n| n == name)
            .map(|idx| self.interned[idx])
    }
}

impl Default for BuiltinNames {
    fn default() -> BuiltinNames {
        BuiltinNames::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_no_duplicate_names() {
        let mut seen = std::collections::HashSet::new();
        for name in BUILTIN_NAME_TABLE {
            assert!(seen.insert(*name), "duplicate builtin name {name}");
        }
    }

    #[test]
    fn covers_core_dunder_names_from_spec() {
        for must_have in ["__init__", "__add__", "__hash__", "__eq__", "__repr__"] {
            assert!(BUILTIN_NAME_TABLE.contains(&must_have));
        }
    }
}
