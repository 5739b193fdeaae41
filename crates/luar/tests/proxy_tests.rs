//! Integration tests for the map, slice, struct, pointer and type proxies

use std::sync::Arc;

use luar::sdk::{HostError, MapRef, PtrRef, SliceRef, StructType, StructValue};
use luar::{
    convert, to_host, type_constructor, type_constructor_for, BridgeError, ErrorCategory, HostFunc,
    HostType, HostValue, ScriptValue, State,
};

fn places() -> MapRef {
    MapRef::from_pairs(
        HostType::STRING,
        HostType::STRING,
        [("NA", "North America"), ("EU", "European Union")],
    )
    .unwrap()
}

fn letters() -> SliceRef {
    SliceRef::from_values(HostType::STRING, vec!["a".into(), "e".into(), "i".into()]).unwrap()
}

fn person_type() -> Arc<StructType> {
    let greet = HostFunc::wrap(|p: HostValue| -> Result<String, HostError> {
        match p {
            HostValue::Struct(s) => Ok(format!(
                "Hello {}, age {}",
                s.field("Name").cloned().unwrap_or(HostValue::Nil),
                s.field("Age").cloned().unwrap_or(HostValue::Nil)
            )),
            other => Err(HostError::mismatch("Person", other.type_name())),
        }
    });
    let set_name = HostFunc::wrap(|p: HostValue, name: String| -> Result<(), HostError> {
        match p {
            HostValue::Ptr(ptr) => ptr.with(|cell| match cell {
                HostValue::Struct(s) => s.set_field("Name", name.into()),
                other => Err(HostError::mismatch("Person", other.type_name())),
            })?,
            other => Err(HostError::mismatch("*Person", other.type_name())),
        }
    });
    StructType::builder("Person")
        .field("Name", HostType::STRING)
        .field("Age", HostType::UINT)
        .private_field("secret", HostType::STRING)
        .method("Greet", greet)
        .pointer_method("SetName", set_name)
        .build()
}

fn tim(ty: &Arc<StructType>) -> StructValue {
    StructValue::zero(ty.clone())
        .with("Name", "Tim")
        .unwrap()
        .with("Age", 5usize)
        .unwrap()
        .with("secret", "hunter2")
        .unwrap()
}

fn key(s: &str) -> ScriptValue {
    ScriptValue::from(s)
}

fn num(n: f64) -> ScriptValue {
    ScriptValue::Number(n)
}

// ============================================================================
// Maps
// ============================================================================

#[test]
fn test_map_index_and_len() {
    let state = State::new();
    let m = convert(&state, places().into()).unwrap();

    assert_eq!(state.len(&m).unwrap(), num(2.0));
    assert_eq!(state.index(&m, &key("NA")).unwrap(), key("North America"));
    assert_eq!(state.index(&m, &key("SA")).unwrap(), ScriptValue::Nil);
}

#[test]
fn test_map_identity_across_handles() {
    let state = State::new();
    let map = places();
    let first = convert(&state, map.clone().into()).unwrap();
    let second = convert(&state, map.clone().into()).unwrap();

    state.set_index(&first, key("AS"), key("Asia")).unwrap();
    assert_eq!(state.index(&second, &key("AS")).unwrap(), key("Asia"));
    assert_eq!(map.get(&"AS".into()).unwrap(), Some(HostValue::from("Asia")));

    // Distinct handles, equal by map identity
    assert!(!first.raw_equal(&second));
    assert!(state.equals(&first, &second));
    let other = convert(&state, places().into()).unwrap();
    assert!(!state.equals(&first, &other));
}

#[test]
fn test_map_nil_write_stores_zero_value() {
    let state = State::new();
    let counts = MapRef::new(HostType::STRING, HostType::INT64);
    let m = convert(&state, counts.clone().into()).unwrap();
    state.set_index(&m, key("x"), ScriptValue::Nil).unwrap();
    assert_eq!(counts.get(&"x".into()).unwrap(), Some(HostValue::from(0i64)));
    assert_eq!(state.len(&m).unwrap(), num(1.0));
}

#[test]
fn test_map_write_type_mismatch() {
    let state = State::new();
    let m = convert(&state, places().into()).unwrap();
    let err = state.set_index(&m, num(1.0), key("one")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
    let err = state.set_index(&m, key("one"), num(1.0)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
}

#[test]
fn test_map_iteration_snapshot() {
    let state = State::new();
    let map = places();
    let m = convert(&state, map.clone().into()).unwrap();
    let iter = state.call(&m, vec![]).unwrap().remove(0);

    map.insert("AF".into(), "Africa".into()).unwrap();

    let mut seen = Vec::new();
    loop {
        let pair = state.call(&iter, vec![]).unwrap();
        if pair.is_empty() {
            break;
        }
        seen.push((
            pair[0].as_str().unwrap().to_string(),
            pair[1].as_str().unwrap().to_string(),
        ));
    }
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("EU".to_string(), "European Union".to_string()),
            ("NA".to_string(), "North America".to_string()),
        ]
    );
    // Stays exhausted
    assert!(state.call(&iter, vec![]).unwrap().is_empty());
}

#[test]
fn test_map_iteration_reads_current_values() {
    let state = State::new();
    let map = MapRef::from_pairs(HostType::STRING, HostType::INT64, [("only", 1i64)]).unwrap();
    let m = convert(&state, map.clone().into()).unwrap();
    let iter = state.call(&m, vec![]).unwrap().remove(0);

    map.insert("only".into(), 2i64.into()).unwrap();
    assert_eq!(state.call(&iter, vec![]).unwrap(), vec![key("only"), num(2.0)]);
}

#[test]
fn test_map_iteration_deleted_key_yields_nil() {
    let state = State::new();
    let map = MapRef::from_pairs(HostType::STRING, HostType::STRING, [("gone", "soon")]).unwrap();
    let m = convert(&state, map.clone().into()).unwrap();
    let iter = state.call(&m, vec![]).unwrap().remove(0);

    map.remove(&"gone".into()).unwrap();
    assert_eq!(state.call(&iter, vec![]).unwrap(), vec![key("gone"), ScriptValue::Nil]);
}

#[test]
fn test_map_tostring() {
    let state = State::new();
    let m = convert(&state, places().into()).unwrap();
    let s = state.to_string(&m).unwrap();
    assert!(s.starts_with("userdata: luar: map[string]string map[EU:European Union NA:North America] (0x"));
}

// ============================================================================
// Slices
// ============================================================================

#[test]
fn test_slice_one_based_indexing() {
    let state = State::new();
    let s = convert(&state, letters().into()).unwrap();

    assert_eq!(state.index(&s, &num(1.0)).unwrap(), key("a"));
    assert_eq!(state.index(&s, &num(3.0)).unwrap(), key("i"));
    assert_eq!(
        state.index(&s, &num(0.0)).unwrap_err(),
        BridgeError::IndexOutOfRange { index: 0, len: 3 }
    );
    assert_eq!(
        state.index(&s, &num(4.0)).unwrap_err(),
        BridgeError::IndexOutOfRange { index: 4, len: 3 }
    );
    assert_eq!(state.len(&s).unwrap(), num(3.0));
}

#[test]
fn test_slice_write_is_shared() {
    let state = State::new();
    let backing = letters();
    let s = convert(&state, backing.clone().into()).unwrap();

    state.set_index(&s, num(2.0), key("E")).unwrap();
    assert_eq!(backing.get(1), Some(HostValue::from("E")));

    let err = state.set_index(&s, num(5.0), key("x")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Protocol);
    let err = state.set_index(&s, num(1.0), num(7.0)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
}

#[test]
fn test_slice_non_integral_index() {
    let state = State::new();
    let s = convert(&state, letters().into()).unwrap();
    let err = state.index(&s, &num(1.5)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
}

#[test]
fn test_slice_append_rebinding() {
    let state = State::new();
    let original = letters();
    let s = convert(&state, original.clone().into()).unwrap();

    let grown = state
        .call_method(&s, "append", vec![key("o"), key("u")])
        .unwrap()
        .remove(0);

    assert_eq!(state.len(&grown).unwrap(), num(5.0));
    let cap = state.call_method(&grown, "capacity", vec![]).unwrap();
    assert!(cap[0].as_number().unwrap() >= 5.0);
    assert_eq!(state.index(&grown, &num(5.0)).unwrap(), key("u"));

    // The original had no spare capacity, so it was left alone
    assert_eq!(state.len(&s).unwrap(), num(3.0));
    assert_eq!(original.len(), 3);
    assert!(!state.equals(&s, &grown));
}

#[test]
fn test_slice_append_converts_items() {
    let state = State::new();
    let s = convert(&state, letters().into()).unwrap();
    let err = state.call_method(&s, "append", vec![num(1.0)]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
}

#[test]
fn test_slice_identity() {
    let state = State::new();
    let backing = letters();
    let a = convert(&state, backing.clone().into()).unwrap();
    let b = convert(&state, backing.into()).unwrap();
    assert!(state.equals(&a, &b));
}

// ============================================================================
// Structs and pointers
// ============================================================================

#[test]
fn test_struct_field_read() {
    let state = State::new();
    let ty = person_type();
    let p = convert(&state, tim(&ty).into()).unwrap();

    assert_eq!(state.index(&p, &key("Name")).unwrap(), key("Tim"));
    assert_eq!(state.index(&p, &key("Age")).unwrap(), num(5.0));
    assert_eq!(state.index(&p, &key("secret")).unwrap(), ScriptValue::Nil);
    assert_eq!(state.index(&p, &key("Missing")).unwrap(), ScriptValue::Nil);
}

#[test]
fn test_struct_value_method() {
    let state = State::new();
    let ty = person_type();
    let p = convert(&state, tim(&ty).into()).unwrap();

    let out = state.call_method(&p, "Greet", vec![]).unwrap();
    assert_eq!(out, vec![key("Hello Tim, age 5")]);

    // Pointer-receiver methods are not in the value method set
    assert_eq!(state.index(&p, &key("SetName")).unwrap(), ScriptValue::Nil);
}

#[test]
fn test_struct_write_through_copy_fails() {
    let state = State::new();
    let ty = person_type();
    let p = convert(&state, tim(&ty).into()).unwrap();

    let err = state.set_index(&p, key("Name"), key("Bob")).unwrap_err();
    assert!(matches!(err, BridgeError::NotAddressable { .. }));
    assert_eq!(err.category(), ErrorCategory::Addressability);

    let err = state.set_index(&p, key("secret"), key("x")).unwrap_err();
    assert!(matches!(err, BridgeError::UnknownField { .. }));
}

#[test]
fn test_struct_write_through_pointer() {
    let state = State::new();
    let ty = person_type();
    let ptr = PtrRef::new(tim(&ty).into());
    let p = convert(&state, ptr.clone().into()).unwrap();

    state.set_index(&p, key("Name"), key("Bob")).unwrap();
    assert_eq!(state.index(&p, &key("Name")).unwrap(), key("Bob"));
    match ptr.load().unwrap() {
        HostValue::Struct(s) => assert_eq!(s.field("Name"), Some(&HostValue::from("Bob"))),
        other => panic!("expected struct, got {:?}", other),
    }

    let err = state.set_index(&p, key("Age"), key("old")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
    let err = state.set_index(&p, key("secret"), key("x")).unwrap_err();
    assert!(matches!(err, BridgeError::UnknownField { .. }));
}

#[test]
fn test_nested_struct_field_through_pointer_is_a_copy() {
    let state = State::new();
    let inner = StructType::builder("Inner").field("X", HostType::INT64).build();
    let outer = StructType::builder("Outer")
        .field("Inner", HostType::Struct(inner.clone()))
        .build();
    let ptr = PtrRef::new(StructValue::zero(outer).into());
    let p = convert(&state, ptr.clone().into()).unwrap();

    let field = state.index(&p, &key("Inner")).unwrap();
    let err = state.set_index(&field, key("X"), num(7.0)).unwrap_err();
    assert!(matches!(err, BridgeError::NotAddressable { .. }));

    // Replacing the whole field through the pointer is the way to write it
    let replacement = StructValue::zero(inner).with("X", 7i64).unwrap();
    let replacement = convert(&state, replacement.into()).unwrap();
    state.set_index(&p, key("Inner"), replacement).unwrap();
    let field = state.index(&p, &key("Inner")).unwrap();
    assert_eq!(state.index(&field, &key("X")).unwrap(), num(7.0));
}

#[test]
fn test_struct_copy_sees_no_host_mutation() {
    let state = State::new();
    let ty = person_type();
    let ptr = PtrRef::new(tim(&ty).into());
    let copy = convert(&state, ptr.load().unwrap()).unwrap();

    ptr.with(|cell| {
        if let HostValue::Struct(s) = cell {
            s.set_field("Name", "Changed".into()).unwrap();
        }
    })
    .unwrap();
    assert_eq!(state.index(&copy, &key("Name")).unwrap(), key("Tim"));
}

#[test]
fn test_pointer_method_sets() {
    let state = State::new();
    let ty = person_type();
    let ptr = PtrRef::new(tim(&ty).into());
    let p = convert(&state, ptr.clone().into()).unwrap();

    state.call_method(&p, "SetName", vec![key("Ann")]).unwrap();
    let out = state.call_method(&p, "Greet", vec![]).unwrap();
    assert_eq!(out, vec![key("Hello Ann, age 5")]);

    let err = state.call_method(&p, "SetName", vec![]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Arity);
}

#[test]
fn test_nil_pointer_dereference() {
    let state = State::new();
    let ty = person_type();
    let p = convert(&state, PtrRef::nil(HostType::Struct(ty)).into()).unwrap();

    assert_eq!(state.index(&p, &key("Name")).unwrap_err(), BridgeError::NilDereference);
    assert_eq!(
        state.set_index(&p, key("Name"), key("x")).unwrap_err(),
        BridgeError::NilDereference
    );
    assert!(state.to_string(&p).unwrap().contains("<nil>"));
}

#[test]
fn test_pointer_to_map_and_slice_delegates() {
    let state = State::new();
    let map = places();
    let pm = convert(&state, PtrRef::new(map.clone().into()).into()).unwrap();
    assert_eq!(state.index(&pm, &key("EU")).unwrap(), key("European Union"));
    state.set_index(&pm, key("OC"), key("Oceania")).unwrap();
    assert_eq!(map.len(), 3);

    let ps = convert(&state, PtrRef::new(letters().into()).into()).unwrap();
    assert_eq!(state.index(&ps, &num(2.0)).unwrap(), key("e"));
}

#[test]
fn test_pointer_to_scalar_is_rejected() {
    let state = State::new();
    let p = convert(&state, PtrRef::new(5i64.into()).into()).unwrap();
    let err = state.index(&p, &key("x")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
}

#[test]
fn test_pointer_identity_and_tostring() {
    let state = State::new();
    let ty = person_type();
    let ptr = PtrRef::new(tim(&ty).into());
    let a = convert(&state, ptr.clone().into()).unwrap();
    let b = convert(&state, ptr.into()).unwrap();
    assert!(state.equals(&a, &b));

    let s = state.to_string(&a).unwrap();
    assert!(s.starts_with("userdata: luar: *Person &{Name:Tim Age:5 secret:hunter2} (0x"));
}

#[test]
fn test_pointer_cycle_tostring() {
    let state = State::new();
    let node = StructType::builder("Node").field("Next", HostType::ANY).build();
    let a = PtrRef::new(StructValue::zero(node.clone()).into());
    let b = PtrRef::new(StructValue::zero(node).into());
    let link = |from: &PtrRef, to: &PtrRef| {
        from.with(|cell| match cell {
            HostValue::Struct(s) => s.set_field("Next", to.clone().into()),
            other => panic!("expected struct, got {:?}", other),
        })
        .unwrap()
        .unwrap();
    };
    link(&a, &b);
    link(&b, &a);

    let handle = convert(&state, a.clone().into()).unwrap();
    assert_eq!(
        state.to_string(&handle).unwrap(),
        format!("userdata: luar: *Node &{{Next:{:#x}}} ({:#x})", b.addr(), a.addr())
    );
}

// ============================================================================
// Type constructors
// ============================================================================

#[test]
fn test_type_constructor_struct() {
    let state = State::new();
    let ty = person_type();
    let person = type_constructor(&state, &HostValue::from(tim(&ty))).unwrap();
    assert_eq!(state.to_string(&person).unwrap(), "userdata: luar: type Person");

    let a = state.call(&person, vec![]).unwrap().remove(0);
    let b = state.call(&person, vec![key("ignored")]).unwrap().remove(0);

    assert_eq!(state.index(&a, &key("Name")).unwrap(), key(""));
    state.set_index(&a, key("Name"), key("John")).unwrap();
    assert_eq!(state.index(&a, &key("Name")).unwrap(), key("John"));
    assert_eq!(state.index(&b, &key("Name")).unwrap(), key(""));
    assert!(!state.equals(&a, &b));
}

#[test]
fn test_type_constructor_map_and_slice() {
    let state = State::new();
    let map_ty = type_constructor_for(&state, HostType::map(HostType::STRING, HostType::INT64)).unwrap();
    let m = state.call(&map_ty, vec![]).unwrap().remove(0);
    state.set_index(&m, key("a"), num(1.0)).unwrap();
    assert_eq!(state.len(&m).unwrap(), num(1.0));

    let slice_ty = type_constructor(&state, &HostValue::from(letters())).unwrap();
    let s = state.call(&slice_ty, vec![]).unwrap().remove(0);
    assert_eq!(state.len(&s).unwrap(), num(0.0));
    let s = state.call_method(&s, "append", vec![key("z")]).unwrap().remove(0);
    assert_eq!(state.index(&s, &num(1.0)).unwrap(), key("z"));
}

#[test]
fn test_type_handle_round_trips_as_type() {
    let state = State::new();
    let ctor = type_constructor_for(&state, HostType::STRING).unwrap();
    let host = to_host(&ctor, &HostType::ANY).unwrap();
    let back = convert(&state, host).unwrap();
    assert_eq!(
        back.as_handle().unwrap().reified_type(),
        Some(&HostType::STRING)
    );
}

#[test]
fn test_type_handle_has_no_index() {
    let state = State::new();
    let ctor = type_constructor_for(&state, HostType::STRING).unwrap();
    assert!(matches!(
        state.index(&ctor, &key("x")),
        Err(BridgeError::BadOperand { op: "__index", .. })
    ));
}
