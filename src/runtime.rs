//! The process-wide runtime handle threaded through every mutating
//! operation (pools, the symbol table, the SipHash key, and the
//! interned built-in name table), plus bootstrap (`init_runtime`).
//!
//! Grounded on `original_source/nagini/compiler/c/builtin.h`'s
//! `Runtime` struct and `init_runtime`: one process owns exactly one
//! `Runtime`, created once and handed by pointer to every external
//! interface entry point (spec §5, single-threaded, no global mutable
//! statics shared across threads because there is only ever one).

use crate::builtins::{BuiltinNames, BUILTIN_NAME_TABLE};
use crate::hash::{siphash_cstr, SipKey};
use crate::pages::PoolSet;
use crate::strings::UnicodeObject;
use crate::symtab::SymbolTable;

/// Bounded call trace used for diagnostics, sized the same as the
/// original's `function_trace[4096]`.
const TRACE_CAPACITY: usize = 4096;

pub struct Runtime {
    pub pools: PoolSet,
    /// symbol id (SipHash of a name) -> printable name.
    pub symbols: SymbolTable,
    pub siphash_key: SipKey,
    pub builtin_names: BuiltinNames,
    pub trace: Vec<i32>,
}

impl Runtime {
    /// `get_symbol_id`: symbol ids are the SipHash of the name itself,
    /// not a sequential counter, so that two independently interned
    /// occurrences of the same name collapse to one symbol table entry.
    pub fn get_symbol_id(&mut self, name: &str) -> i32 {
        let full_hash = siphash_cstr(self.siphash_key, name);
        let id = full_hash as i32;
        if self.symbols.get(id as i64).is_none() {
            self.symbols.put(id as i64, name.to_string());
        }
        id
    }

    pub fn symbol_name(&self, id: i32) -> Option<&str> {
        self.symbols.get(id as i64)
    }

    pub fn push_trace(&mut self, symbol_id: i32) {
        if self.trace.len() < TRACE_CAPACITY {
            self.trace.push(symbol_id);
        } else {
            log::warn!("function trace capacity ({TRACE_CAPACITY}) exceeded, dropping frame");
        }
    }

    pub fn pop_trace(&mut self) {
        self.trace.pop();
    }

    /// Intern every built-in dunder/protocol name as a `StringObject`
    /// up front, so the compiler's own symbol references resolve to
    /// the exact interned instance the runtime will compare against.
    unsafe fn intern_builtin_names(&mut self) -> Vec<*mut UnicodeObject> {
        BUILTIN_NAME_TABLE
            .iter()
            .map(|name| {
                self.get_symbol_id(name);
                UnicodeObject::alloc(name, self.siphash_key, self.get_symbol_id("str"))
            })
            .collect()
    }
}

/// `init_runtime`: allocate the pool set, seed the SipHash key from the
/// OS CSPRNG, and intern every built-in name.
pub fn init_runtime() -> Box<Runtime> {
    let mut runtime = Box::new(Runtime {
        pools: PoolSet::new(),
        symbols: SymbolTable::new(),
        siphash_key: SipKey::from_os_random(),
        builtin_names: BuiltinNames::new(),
        trace: Vec::with_capacity(TRACE_CAPACITY),
    });
    let interned = unsafe { runtime.intern_builtin_names() };
    runtime.builtin_names.bind(interned);
    runtime
}
