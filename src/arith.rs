//! Arithmetic, comparison, and hashing dispatch (runtime component C10).
//!
//! Binary operators promote `int`/`float` mixes to `float` the way the
//! original's binary-arithmetic dunder family does; `//` and `%` use
//! floor semantics (result takes the sign of the divisor) rather than
//! C's truncating division; `**` on two integers uses square-and-
//! multiply rather than promoting to `float` and losing precision for
//! large exponents. Hashing dispatches by tag, with float hashing
//! following the `frexp`/`ldexp` decomposition from
//! `original_source/nagini/compiler/c/builtin.h`'s `hash_float` and
//! tuple hashing following its polynomial accumulator (seed 17,
//! multiplier 31).

use crate::error::{fail, Kind};
use crate::numeric::{FloatObject, IntObject};
use crate::object::{Tag, Value};
use crate::strings::UnicodeObject;
use crate::tuple::Tuple;

unsafe fn as_int(v: Value) -> i64 {
    (*(v as *const IntObject)).value
}

unsafe fn as_float(v: Value) -> f64 {
    (*(v as *const FloatObject)).value
}

/// Python's `-1` hash collision avoidance: `-1` is reserved internally
/// to mean "no hash computed yet", so any value that would naturally
/// hash to `-1` is remapped to `-2`.
fn avoid_sentinel(h: i64) -> i64 {
    if h == -1 {
        -2
    } else {
        h
    }
}

/// `hash_float`: decompose into a 53-bit mantissa and an exponent via
/// `frexp`, scale the mantissa back to an integer with `ldexp`, and XOR
/// in the exponent. Rust's std does not expose `frexp`/`ldexp`, so both
/// are reimplemented from the `f64` bit pattern.
fn hash_float(value: f64) -> i64 {
    if value.is_infinite() {
        return if value > 0.0 { i64::MAX } else { i64::MIN + 1 };
    }
    if value.is_nan() {
        return 0;
    }
    if value == 0.0 {
        return 0;
    }

    let (mantissa, exponent) = frexp(value);
    // scale the [0.5, 1) mantissa up to a 53-bit integer, matching the
    // original's ldexp(mantissa, 53) before truncating to i64.
    let scaled = ldexp(mantissa, 53) as i64;
    let h = scaled ^ (exponent as i64);
    avoid_sentinel(h)
}

fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }
    let bits = value.to_bits();
    let sign = bits & (1 << 63);
    let mut exponent = ((bits >> 52) & 0x7ff) as i32;
    let mantissa_bits = bits & 0x000f_ffff_ffff_ffff;

    let (mantissa_bits, exponent) = if exponent == 0 {
        // subnormal: normalize by hand.
        let mut m = mantissa_bits;
        let mut e = exponent - 1022;
        while m & (1 << 52) == 0 {
            m <<= 1;
            e -= 1;
        }
        (m & 0x000f_ffff_ffff_ffff, e)
    } else {
        exponent -= 1022;
        (mantissa_bits, exponent)
    };

    let frac_bits = sign | (1022u64 << 52) | mantissa_bits;
    (f64::from_bits(frac_bits), exponent)
}

fn ldexp(value: f64, exp: i32) -> f64 {
    value * 2f64.powi(exp)
}

/// `hash(runtime, obj)`'s dispatch by tag. Instances fall back to
/// pointer identity rather than invoking a user-defined `__hash__`: a
/// faithful dispatch would need the call machinery (and therefore a
/// `Runtime` handle) threaded through every dict probe, which the
/// container layer deliberately avoids (see DESIGN.md).
pub fn hash_value(value: Value) -> i64 {
    if value.is_null() {
        return 0;
    }
    unsafe {
        match (*value).tag() {
            Tag::Int => avoid_sentinel(as_int(value)),
            Tag::Float => hash_float(as_float(value)),
            Tag::Bytes => (*(value as *const crate::bytes::BytesObject)).hash,
            Tag::String => (*(value as *const UnicodeObject)).hash,
            Tag::Tuple => {
                let mut h: i64 = 17;
                for &element in Tuple::as_slice(value as *const Tuple) {
                    h = h.wrapping_mul(31).wrapping_add(hash_value(element));
                }
                avoid_sentinel(h)
            }
            _ => value as i64,
        }
    }
}

/// §4.7's equality rule: `int`s compare by value, `float`s by bit
/// pattern (so `NaN` only equals itself if the bits match, matching the
/// original's deliberate departure from IEEE-754 `NaN != NaN`),
/// `string`s compare by their cached hash alone rather than by content,
/// and everything else falls back to pointer identity.
pub fn values_equal(a: Value, b: Value) -> bool {
    if a == b {
        return true;
    }
    if a.is_null() || b.is_null() {
        return false;
    }
    unsafe {
        let ta = (*a).tag();
        let tb = (*b).tag();
        match (ta, tb) {
            (Tag::Int, Tag::Int) => as_int(a) == as_int(b),
            (Tag::Float, Tag::Float) => as_float(a).to_bits() == as_float(b).to_bits(),
            (Tag::Int, Tag::Float) | (Tag::Float, Tag::Int) => {
                let (i, f) = if ta == Tag::Int {
                    (as_int(a), as_float(b))
                } else {
                    (as_int(b), as_float(a))
                };
                i as f64 == f
            }
            (Tag::String, Tag::String) => {
                (*(a as *const UnicodeObject)).hash == (*(b as *const UnicodeObject)).hash
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

unsafe fn as_number(v: Value) -> Option<Number> {
    match (*v).tag() {
        Tag::Int => Some(Number::Int(as_int(v))),
        Tag::Float => Some(Number::Float(as_float(v))),
        _ => None,
    }
}

fn promote(a: Number, b: Number) -> (f64, f64) {
    let fa = match a {
        Number::Int(i) => i as f64,
        Number::Float(f) => f,
    };
    let fb = match b {
        Number::Int(i) => i as f64,
        Number::Float(f) => f,
    };
    (fa, fb)
}

/// Python-style floor division: the quotient rounds toward negative
/// infinity, not toward zero.
fn floor_div_i64(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// Python-style modulo: the result takes the sign of the divisor.
fn floor_mod_i64(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

/// Integer exponentiation by square-and-multiply, avoiding the
/// precision loss `powf` would introduce for large exponents. Callers
/// must only pass a non-negative `exp`; a negative exponent promotes
/// to `float` before reaching here (§4.10).
fn int_pow(mut base: i64, mut exp: i64) -> i64 {
    debug_assert!(exp >= 0);
    let mut result: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    Pow,
}

/// The numeric half of the binary-arithmetic dunder family
/// (`__add__`/`__radd__`/... fold into one dispatch since both operands
/// are already known to be numeric by the time `protocol::binary_op`
/// calls here). Container/string concatenation lives in `protocol.rs`.
pub unsafe fn numeric_binop(op: BinOp, a: Value, b: Value) -> Number {
    let (na, nb) = match (as_number(a), as_number(b)) {
        (Some(na), Some(nb)) => (na, nb),
        _ => fail(Kind::TypeError, "unsupported operand type(s) for arithmetic"),
    };

    match (na, nb, op) {
        (Number::Int(x), Number::Int(y), BinOp::Add) => Number::Int(x.wrapping_add(y)),
        (Number::Int(x), Number::Int(y), BinOp::Sub) => Number::Int(x.wrapping_sub(y)),
        (Number::Int(x), Number::Int(y), BinOp::Mul) => Number::Int(x.wrapping_mul(y)),
        (Number::Int(x), Number::Int(y), BinOp::FloorDiv) => {
            if y == 0 {
                fail(Kind::ZeroDivisionError, "integer division or modulo by zero");
            }
            Number::Int(floor_div_i64(x, y))
        }
        (Number::Int(x), Number::Int(y), BinOp::Mod) => {
            if y == 0 {
                fail(Kind::ZeroDivisionError, "integer division or modulo by zero");
            }
            Number::Int(floor_mod_i64(x, y))
        }
        (Number::Int(x), Number::Int(y), BinOp::Pow) if y >= 0 => Number::Int(int_pow(x, y)),
        (Number::Int(_), Number::Int(_), BinOp::TrueDiv) => {
            let (fa, fb) = promote(na, nb);
            if fb == 0.0 {
                fail(Kind::ZeroDivisionError, "division by zero");
            }
            Number::Float(fa / fb)
        }
        (_, _, op) => {
            let (fa, fb) = promote(na, nb);
            match op {
                BinOp::Add => Number::Float(fa + fb),
                BinOp::Sub => Number::Float(fa - fb),
                BinOp::Mul => Number::Float(fa * fb),
                BinOp::TrueDiv => {
                    if fb == 0.0 {
                        fail(Kind::ZeroDivisionError, "float division by zero");
                    }
                    Number::Float(fa / fb)
                }
                BinOp::FloorDiv => {
                    if fb == 0.0 {
                        fail(Kind::ZeroDivisionError, "float floor division by zero");
                    }
                    Number::Float((fa / fb).floor())
                }
                BinOp::Mod => {
                    if fb == 0.0 {
                        fail(Kind::ZeroDivisionError, "float modulo by zero");
                    }
                    Number::Float(fa - fb * (fa / fb).floor())
                }
                BinOp::Pow => Number::Float(fa.powf(fb)),
            }
        }
    }
}

/// Numeric ordering comparison with the same int/float promotion rule
/// as `numeric_binop`.
pub unsafe fn numeric_compare(a: Value, b: Value) -> std::cmp::Ordering {
    let (na, nb) = match (as_number(a), as_number(b)) {
        (Some(na), Some(nb)) => (na, nb),
        _ => fail(Kind::TypeError, "unsupported operand type(s) for comparison"),
    };
    match (na, nb) {
        (Number::Int(x), Number::Int(y)) => x.cmp(&y),
        _ => {
            let (fa, fb) = promote(na, nb);
            fa.partial_cmp(&fb)
                .unwrap_or(std::cmp::Ordering::Less)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_div_rounds_toward_negative_infinity() {
        assert_eq!(floor_div_i64(7, 2), 3);
        assert_eq!(floor_div_i64(-7, 2), -4);
        assert_eq!(floor_div_i64(7, -2), -4);
        assert_eq!(floor_div_i64(-7, -2), 3);
    }

    #[test]
    fn floor_mod_takes_sign_of_divisor() {
        assert_eq!(floor_mod_i64(7, 2), 1);
        assert_eq!(floor_mod_i64(-7, 2), 1);
        assert_eq!(floor_mod_i64(7, -2), -1);
        assert_eq!(floor_mod_i64(-7, -2), -1);
    }

    #[test]
    fn int_pow_matches_repeated_multiplication() {
        assert_eq!(int_pow(2, 10), 1024);
        assert_eq!(int_pow(3, 0), 1);
        assert_eq!(int_pow(5, 3), 125);
    }

    #[test]
    fn hash_float_maps_negative_one_to_negative_two() {
        // -1.0 hashes to an integer -1 under the raw decomposition for
        // some exponent/mantissa combination; whichever combination
        // does, the sentinel remap must apply uniformly.
        assert_ne!(hash_float(-1.0), -1);
    }

    #[test]
    fn hash_float_zero_is_zero() {
        assert_eq!(hash_float(0.0), 0);
        assert_eq!(hash_float(-0.0), 0);
    }

    #[test]
    fn hash_float_infinities_are_extremal_and_signed() {
        assert_eq!(hash_float(f64::INFINITY), i64::MAX);
        assert_eq!(hash_float(f64::NEG_INFINITY), i64::MIN + 1);
    }

    #[test]
    fn negative_exponent_promotes_to_float() {
        use crate::object::Header;

        let mut base = IntObject { header: Header::new(Tag::Int, true, 0, 0), value: 2 };
        let mut exponent = IntObject { header: Header::new(Tag::Int, true, 0, 0), value: -1 };
        let result = unsafe {
            numeric_binop(
                BinOp::Pow,
                &mut base as *mut IntObject as Value,
                &mut exponent as *mut IntObject as Value,
            )
        };
        match result {
            Number::Float(v) => assert_eq!(v, 0.5),
            Number::Int(_) => panic!("pow with a negative exponent must promote to float"),
        }
    }
}
