//! Integration tests for the public value tree API.

use enbt_core::value::Value;
use enbt_core::{alias, LenClass, TypeClass};

#[test]
fn nested_tree_construction_and_lookup() {
    let mut root = Value::compound();
    root.insert("greet", Value::from("hi")).unwrap();
    root.insert("n", Value::from(7i32)).unwrap();

    let mut players = Value::darray(vec![]);
    let mut player = Value::compound();
    player.insert("name", Value::from("alice")).unwrap();
    player.insert("score", Value::from(1200u32)).unwrap();
    players.push(player).unwrap();
    root.insert("players", players).unwrap();

    assert_eq!(root["greet"].to_str().unwrap(), "hi");
    assert_eq!(root["n"].to_int::<i64>().unwrap(), 7);
    assert_eq!(
        root["players"][0]["score"].to_int::<u32>().unwrap(),
        1200
    );
    assert_eq!(root.len(), 3);
}

#[test]
fn deep_copies_are_independent() {
    let mut original = Value::compound();
    original.insert("xs", Value::from(vec![1u8, 2, 3])).unwrap();

    let copied = original.clone();
    original.get_named_mut("xs").unwrap().resize(5).unwrap();

    assert_eq!(original["xs"].len(), 5);
    assert_eq!(copied["xs"].len(), 3);
}

#[test]
fn equality_is_structural_and_descriptor_aware() {
    let a = Value::from(1u8);
    let b = Value::from(1u8);
    assert_eq!(a, b);

    // same numeric value, different width
    assert_ne!(Value::from(1u8), Value::from(1u16));
    // same bits, different sign
    assert_ne!(Value::from(1u8), Value::from(1i8));

    let arr1 = Value::array(vec![Value::from(1u8), Value::from(2u8)]).unwrap();
    let arr2 = Value::array(vec![Value::from(1u8), Value::from(2u8)]).unwrap();
    assert_eq!(arr1, arr2);
}

#[test]
fn aliased_compounds_resolve_through_the_table() {
    alias::set_alias_strings(vec!["health".into(), "mana".into()]).unwrap();

    let mut v = Value::aliased_compound();
    v.insert("health", Value::from(20u8)).unwrap();
    v.insert_alias(1, Value::from(50u8)).unwrap();

    assert_eq!(v.descriptor().class, TypeClass::Compound);
    assert!(v.descriptor().signed);
    assert_eq!(v["mana"].to_int::<u8>().unwrap(), 50);
    assert!(v.contains_key("health"));
    assert!(!v.contains_key("stamina"));

    let mut names: Vec<String> = v
        .iter()
        .map(|entry| entry.unwrap().0.into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["health", "mana"]);
}

#[test]
fn length_class_grows_with_insertions() {
    let mut arr = Value::darray(vec![]);
    for i in 0..=256u32 {
        arr.push(Value::from(i)).unwrap();
    }
    assert_eq!(arr.descriptor().len, LenClass::Short);
}
