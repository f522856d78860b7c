#![forbid(unsafe_code)]

//! Property tests for attribute coercion and default elision.
//!
//! Run: `cargo test -p proxel-props --test codec_properties`

use std::collections::BTreeMap;

use proptest::prelude::*;
use proxel_props::{
    AttributeHost, FnObserver, Overrides, PropKind, PropSpec, PropSync, PropValue, SetOutcome, decode,
    encode,
};
use serde_json::Value;

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 {}\\[\\]\":,]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn synced() -> (PropSync, proxel_props::PropertyState, BTreeMap<String, String>) {
    let sync = PropSync::new(
        PropSpec::builder()
            .prop("enabled", true)
            .prop("count", 0)
            .prop("title", "untitled")
            .build()
            .expect("valid spec"),
    );
    let mut state = sync.new_state();
    let mut host = BTreeMap::new();
    sync.init(&mut state, &mut host, &mut (), &Overrides::default());
    (sync, state, host)
}

proptest! {
    #[test]
    fn flag_encoding_is_idempotent(b in any::<bool>()) {
        let encoded = encode(PropKind::Flag, &PropValue::Flag(b));
        prop_assert_eq!(decode(PropKind::Flag, &encoded), PropValue::Flag(b));
        let again = encode(PropKind::Flag, &decode(PropKind::Flag, &encoded));
        prop_assert_eq!(again, encoded);
    }

    #[test]
    fn flag_decoding_rule(raw in ".{0,8}") {
        let expected = raw != "0" && raw != "false";
        prop_assert_eq!(decode(PropKind::Flag, &raw), PropValue::Flag(expected));
    }

    #[test]
    fn data_round_trips(v in json_value()) {
        let value = PropValue::Data(v);
        prop_assert_eq!(decode(PropKind::Data, &encode(PropKind::Data, &value)), value);
    }

    #[test]
    fn data_garbage_passes_through(raw in "x[a-z {]{0,10}") {
        prop_assert_eq!(decode(PropKind::Data, &raw), PropValue::Data(Value::String(raw.clone())));
    }

    #[test]
    fn text_passes_through(raw in ".{0,16}") {
        let value = decode(PropKind::Text, &raw);
        prop_assert_eq!(encode(PropKind::Text, &value), raw);
    }

    #[test]
    fn writing_default_over_a_changed_value_removes_the_attribute(n in any::<i64>(), preset in any::<bool>()) {
        let (sync, mut state, mut host) = synced();
        sync.set(&mut state, &mut host, &mut (), "count", n, true);
        if preset {
            host.set_attribute("count", "junk");
            sync.attribute_changed(&mut state, &mut host, &mut (), "count", Some("junk"));
        }
        sync.set(&mut state, &mut host, &mut (), "count", 0, true);
        prop_assert!(!host.has_attribute("count"));
    }

    #[test]
    fn integral_float_writes_match_integer_writes(n in -1_000_000i64..1_000_000) {
        let (sync, mut state, mut host) = synced();
        sync.set(&mut state, &mut host, &mut (), "count", n, true);
        let before = host.clone();
        let mut calls = 0usize;
        let mut observer = FnObserver(|_: &str, _: Option<&PropValue>, _: &PropValue| calls += 1);
        #[allow(clippy::cast_precision_loss)]
        let outcome = sync.set(&mut state, &mut host, &mut observer, "count", n as f64, true);
        drop(observer);
        prop_assert_eq!(outcome, SetOutcome::Unchanged);
        prop_assert_eq!(calls, 0);
        prop_assert_eq!(host, before);
    }

    #[test]
    fn same_value_twice_notifies_at_most_once(title in "[a-z]{0,8}") {
        let (sync, mut state, mut host) = synced();
        let mut calls = 0usize;
        let mut observer = FnObserver(|_: &str, _: Option<&PropValue>, _: &PropValue| calls += 1);
        sync.set(&mut state, &mut host, &mut observer, "title", title.as_str(), true);
        sync.set(&mut state, &mut host, &mut observer, "title", title.as_str(), true);
        drop(observer);
        prop_assert!(calls <= 1);
    }

    #[test]
    fn attribute_present_iff_value_differs_from_default(title in "[a-z]{0,8}") {
        let (sync, mut state, mut host) = synced();
        sync.set(&mut state, &mut host, &mut (), "title", title.as_str(), true);
        prop_assert_eq!(host.has_attribute("title"), title != "untitled");
    }
}

#[test]
fn enabled_example() {
    let (sync, mut state, mut host) = synced();
    sync.set(&mut state, &mut host, &mut (), "enabled", false, true);
    assert_eq!(host.attribute("enabled"), Some("false"));
    sync.set(&mut state, &mut host, &mut (), "enabled", true, true);
    assert!(!host.has_attribute("enabled"));
}

#[test]
fn default_write_over_a_default_literal_keeps_the_attribute() {
    let (sync, mut state, mut host) = synced();
    host.set_attribute("count", "0");
    assert!(sync.attribute_changed(&mut state, &mut host, &mut (), "count", Some("0")));
    // The value never moved off the default, so the write is a no-op and the
    // literal stays as authored.
    assert_eq!(sync.set(&mut state, &mut host, &mut (), "count", 0, true), SetOutcome::Unchanged);
    assert_eq!(host.attribute("count"), Some("0"));

    sync.set(&mut state, &mut host, &mut (), "count", 4, true);
    sync.set(&mut state, &mut host, &mut (), "count", 0, true);
    assert!(!host.has_attribute("count"));
}

#[test]
fn bootstrap_example() {
    let sync = PropSync::new(PropSpec::builder().prop("count", 0).build().expect("valid spec"));
    let mut state = sync.new_state();
    let mut host = BTreeMap::from([("data-props".to_owned(), r#"{"count": 5}"#.to_owned())]);
    sync.init(&mut state, &mut host, &mut (), &Overrides::default());
    assert_eq!(state.value(sync.spec(), "count"), Some(&PropValue::from(5)));
    assert_eq!(host.attribute("count"), Some("5"));
    assert!(!host.has_attribute("data-props"));
}

#[test]
fn malformed_bootstrap_is_ignored() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let sync = PropSync::new(PropSpec::builder().prop("count", 0).build().expect("valid spec"));
    for payload in ["{count: 5", "5", r#"["count"]"#] {
        let mut state = sync.new_state();
        let mut host = BTreeMap::from([("data-props".to_owned(), payload.to_owned())]);
        sync.init(&mut state, &mut host, &mut (), &Overrides::default());
        assert_eq!(state.value(sync.spec(), "count"), Some(&PropValue::from(0)));
        assert!(host.is_empty(), "{payload}");
    }
}
