//! Fuzz harness for attribute decoding and encoding.
//!
//! Arbitrary attribute text must decode without panicking for every kind.
//! Text and flag values must survive an encode/decode cycle unchanged.

#![no_main]
use libfuzzer_sys::fuzz_target;
use proxel_props::{PropKind, PropValue, decode, encode};

fuzz_target!(|raw: &str| {
    for kind in [PropKind::Text, PropKind::Flag] {
        let value = decode(kind, raw);
        assert_eq!(decode(kind, &encode(kind, &value)), value, "{kind:?} {raw:?}");
    }
    // Floats may shift by an ulp through JSON, so only the kind is checked.
    let data = decode(PropKind::Data, raw);
    assert!(matches!(
        decode(PropKind::Data, &encode(PropKind::Data, &data)),
        PropValue::Data(_)
    ));
});
