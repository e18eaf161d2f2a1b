//! Crate-level end-to-end scenarios, exercised through the same
//! `extern "C"` surface compiler-generated code would call, the way the
//! teacher's top-level `tests` module smoke-tests its GC through its
//! own public entry points rather than internal helpers.

use libc::c_char;

use crate::c_interface::*;
use crate::object::Tag;
use crate::protocol;
use crate::runtime::Runtime;

unsafe fn new_runtime() -> *mut Runtime {
    let _ = env_logger::try_init();
    nagini_init_runtime()
}

#[test]
fn int_arithmetic_round_trips_through_the_c_surface() {
    unsafe {
        let rt = new_runtime();
        let a = nagini_alloc_int(rt, 6);
        let b = nagini_alloc_int(rt, 7);
        let product = nagini_binop(rt, NaginiBinOp::Mul, a, b);
        assert_eq!((*(product as *const crate::numeric::IntObject)).value, 42);
        nagini_decref(rt, a);
        nagini_decref(rt, b);
        nagini_decref(rt, product);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn int_float_promotion_produces_a_float() {
    unsafe {
        let rt = new_runtime();
        let a = nagini_alloc_int(rt, 3);
        let b = nagini_alloc_float(rt, 0.5);
        let sum = nagini_binop(rt, NaginiBinOp::Add, a, b);
        assert_eq!((*sum).tag(), Tag::Float);
        assert_eq!((*(sum as *const crate::numeric::FloatObject)).value, 3.5);
        nagini_decref(rt, a);
        nagini_decref(rt, b);
        nagini_decref(rt, sum);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn floor_division_and_modulo_use_python_sign_rules() {
    unsafe {
        let rt = new_runtime();
        let a = nagini_alloc_int(rt, -7);
        let b = nagini_alloc_int(rt, 2);
        let q = nagini_binop(rt, NaginiBinOp::FloorDiv, a, b);
        let r = nagini_binop(rt, NaginiBinOp::Mod, a, b);
        assert_eq!((*(q as *const crate::numeric::IntObject)).value, -4);
        assert_eq!((*(r as *const crate::numeric::IntObject)).value, 1);
        nagini_decref(rt, a);
        nagini_decref(rt, b);
        nagini_decref(rt, q);
        nagini_decref(rt, r);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn dict_set_get_del_round_trips_with_string_keys() {
    unsafe {
        let rt = new_runtime();
        let dict = nagini_alloc_dict(rt);
        let key = nagini_alloc_string(rt, b"answer".as_ptr() as *const c_char, 6);
        let value = nagini_alloc_int(rt, 42);

        nagini_set_item(rt, dict, key, value);
        assert!(nagini_contains(dict, key));
        let fetched = nagini_get_item(dict, key);
        assert_eq!((*(fetched as *const crate::numeric::IntObject)).value, 42);

        assert!(nagini_del_item(rt, dict, key));
        assert!(!nagini_contains(dict, key));

        nagini_decref(rt, key);
        nagini_decref(rt, value);
        nagini_decref(rt, dict);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn list_append_index_and_remove() {
    unsafe {
        let rt = new_runtime();
        let list = nagini_alloc_list(rt);
        let items: Vec<_> = (0..5).map(|i| nagini_alloc_int(rt, i)).collect();
        for &item in &items {
            crate::list::List::append(&mut *(list as *mut crate::list::List), item);
            nagini_incref(item);
        }
        assert_eq!(nagini_len(list), 5);

        let idx = nagini_alloc_int(rt, -1);
        let last = nagini_get_item(list, idx);
        assert_eq!((*(last as *const crate::numeric::IntObject)).value, 4);

        let zero = nagini_alloc_int(rt, 0);
        assert!(nagini_del_item(rt, list, zero));
        assert_eq!(nagini_len(list), 4);

        nagini_decref(rt, idx);
        nagini_decref(rt, zero);
        for item in items {
            nagini_decref(rt, item);
        }
        nagini_decref(rt, list);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn instance_attribute_lifecycle() {
    unsafe {
        let rt = new_runtime();
        let type_name = nagini_get_symbol_id(rt, b"Point".as_ptr() as *const c_char, 5);
        let instance = nagini_alloc_instance(rt, type_name);
        let attr_name = nagini_alloc_string(rt, b"x".as_ptr() as *const c_char, 1);
        let attr_value = nagini_alloc_int(rt, 10);

        nagini_set_attr(rt, instance, attr_name, attr_value);
        let fetched = nagini_get_attr(rt, instance, attr_name);
        assert!(!fetched.is_null());
        assert_eq!((*(fetched as *const crate::numeric::IntObject)).value, 10);
        // `nagini_get_attr` hands back an owned reference (NgGetMember semantics).
        nagini_decref(rt, fetched);

        assert!(nagini_del_attr(rt, instance, attr_name));
        assert!(nagini_get_attr(rt, instance, attr_name).is_null());

        nagini_decref(rt, attr_name);
        nagini_decref(rt, attr_value);
        nagini_decref(rt, instance);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn tuple_construction_and_stringify() {
    unsafe {
        let rt = new_runtime();
        let tuple = nagini_alloc_tuple(rt, 2);
        nagini_tuple_set(tuple, 0, nagini_alloc_int(rt, 1));
        nagini_tuple_set(tuple, 1, nagini_alloc_int(rt, 2));

        assert_eq!(nagini_len(tuple), 2);
        assert_eq!(protocol::stringify(&mut *rt, tuple), "(1, 2)");

        nagini_decref(rt, tuple);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn string_hash_is_stable_and_repr_round_trips() {
    unsafe {
        let rt = new_runtime();
        let s1 = nagini_alloc_string(rt, b"hello".as_ptr() as *const c_char, 5);
        let s2 = nagini_alloc_string(rt, b"hello".as_ptr() as *const c_char, 5);
        assert_eq!(nagini_hash(s1), nagini_hash(s2));
        assert!(nagini_equals(s1, s2));
        assert_eq!(protocol::stringify(&mut *rt, s1), "hello");
        nagini_decref(rt, s1);
        nagini_decref(rt, s2);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn list_append_method_is_bound_and_callable() {
    unsafe {
        let rt = new_runtime();
        let list = nagini_alloc_list(rt);
        let method_name = nagini_alloc_string(rt, b"append".as_ptr() as *const c_char, 6);

        let method = nagini_get_attr(rt, list, method_name);
        assert!(!method.is_null());
        assert_eq!((*method).tag(), Tag::Function);

        let value = nagini_alloc_int(rt, 42);
        let call_args = nagini_alloc_tuple(rt, 1);
        nagini_incref(value);
        nagini_tuple_set(call_args, 0, value);
        let result = nagini_call(rt, method, call_args, std::ptr::null_mut());
        assert!(result.is_null());

        assert_eq!(nagini_len(list), 1);
        let zero = nagini_alloc_int(rt, 0);
        let stored = nagini_get_item(list, zero);
        assert_eq!((*(stored as *const crate::numeric::IntObject)).value, 42);

        // repeated lookups return the same cached bound method.
        let method_again = nagini_get_attr(rt, list, method_name);
        assert_eq!(method, method_again);

        nagini_decref(rt, method);
        nagini_decref(rt, method_again);
        nagini_decref(rt, zero);
        nagini_decref(rt, call_args);
        nagini_decref(rt, value);
        nagini_decref(rt, method_name);
        nagini_decref(rt, list);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn alloc_bool_sets_the_boolean_header_flag() {
    unsafe {
        let rt = new_runtime();
        let t = nagini_alloc_bool(rt, true);
        let f = nagini_alloc_bool(rt, false);
        assert!((*t).is_truthy_bool());
        assert!(!(*f).is_truthy_bool());
        assert_eq!((*(t as *const crate::numeric::IntObject)).value, 1);
        nagini_decref(rt, t);
        nagini_decref(rt, f);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn negative_exponent_binop_promotes_to_float_through_the_c_surface() {
    unsafe {
        let rt = new_runtime();
        let base = nagini_alloc_int(rt, 2);
        let exp = nagini_alloc_int(rt, -1);
        let result = nagini_pow(rt, base, exp);
        assert_eq!((*result).tag(), Tag::Float);
        assert_eq!((*(result as *const crate::numeric::FloatObject)).value, 0.5);
        nagini_decref(rt, base);
        nagini_decref(rt, exp);
        nagini_decref(rt, result);
        nagini_shutdown_runtime(rt);
    }
}

#[test]
fn refcounting_frees_pooled_storage_on_last_decref() {
    unsafe {
        let rt = new_runtime();
        let v = nagini_alloc_int(rt, 123);
        assert_eq!((*v).refcount, 1);
        nagini_incref(v);
        assert_eq!((*v).refcount, 2);
        nagini_decref(rt, v);
        // one reference remains; the header must still be valid to read.
        assert_eq!((*v).refcount, 1);
        nagini_decref(rt, v);
        // the final decref returned the block to its pool; we don't
        // dereference `v` again since it is no longer live.
        nagini_shutdown_runtime(rt);
    }
}
