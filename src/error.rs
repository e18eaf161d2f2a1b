//! Abort-on-error policy (runtime component, spec §7).
//!
//! Generated code and the external interface never see a `Result`: once
//! a guest-visible error condition is detected, the runtime logs it and
//! aborts the process. Internal helpers that can fail before that point
//! (out-of-memory from the pool allocator, primarily) still thread
//! `Option`/`Result` up to the call site that ultimately invokes
//! `fail`, the same shape as the teacher's `GcInitError` surfacing
//! allocation/config failure before the process gives up.

use log::error;

/// Mirrors the Kind table: the guest-visible exception classes the
/// runtime can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    TypeError,
    IndexError,
    KeyError,
    ValueError,
    ZeroDivisionError,
    MemoryError,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::TypeError => "TypeError",
            Kind::IndexError => "IndexError",
            Kind::KeyError => "KeyError",
            Kind::ValueError => "ValueError",
            Kind::ZeroDivisionError => "ZeroDivisionError",
            Kind::MemoryError => "MemoryError",
        }
    }
}

/// Log the failure at `error` level and abort the process. Never
/// returns; the abort policy is the runtime's sole error-reporting
/// surface for guest-visible faults.
pub fn fail(kind: Kind, msg: &str) -> ! {
    error!("{}: {}", kind.name(), msg);
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_table() {
        assert_eq!(Kind::TypeError.name(), "TypeError");
        assert_eq!(Kind::ZeroDivisionError.name(), "ZeroDivisionError");
        assert_eq!(Kind::MemoryError.name(), "MemoryError");
    }
}
