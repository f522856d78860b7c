//! Fuzz harness for session lifecycle dispatch.
//!
//! Drives a session through arbitrary tree and attribute mutations and checks
//! that no marker ends up both bound and parked.

#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use proxel_runtime::{ControllerDef, Session};

const TAGS: [&str; 6] = ["div", "tabs-proxy", "tabs-element", "tabs-ref", "proxy-ref", "li"];
const ATTRS: [&str; 5] = ["as", "proxy", "for", "id", "index"];
const VALUES: [&str; 5] = ["tab", "tabs", "main", "", "1"];

#[derive(Debug, Arbitrary)]
enum Op {
    Create { tag: u8 },
    Append { parent: u8, child: u8 },
    Remove { node: u8 },
    SetAttribute { node: u8, name: u8, value: u8 },
    RemoveAttribute { node: u8, name: u8 },
    Tick,
}

fn pick<T: Copy>(items: &[T], i: u8) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[usize::from(i) % items.len()])
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let mut session = Session::new();
    let def = ControllerDef::builder("tabs").prop("index", 0).refs("tab").build();
    let Ok(def) = def else { return };
    if session.register(def).is_err() {
        return;
    }
    let mut nodes = vec![session.root()];

    for op in ops.into_iter().take(256) {
        match op {
            Op::Create { tag } => {
                let tag = TAGS[usize::from(tag) % TAGS.len()];
                nodes.push(session.create_element(tag, [("as", "tab")]));
            }
            Op::Append { parent, child } => {
                if let (Some(p), Some(c)) = (pick(&nodes, parent), pick(&nodes, child)) {
                    let _ = session.append_child(p, c);
                }
            }
            Op::Remove { node } => {
                if let Some(n) = pick(&nodes, node) {
                    let _ = session.remove(n);
                }
            }
            Op::SetAttribute { node, name, value } => {
                if let Some(n) = pick(&nodes, node) {
                    let name = ATTRS[usize::from(name) % ATTRS.len()];
                    let value = VALUES[usize::from(value) % VALUES.len()];
                    let _ = session.set_attribute(n, name, value);
                }
            }
            Op::RemoveAttribute { node, name } => {
                if let Some(n) = pick(&nodes, node) {
                    let _ = session.remove_attribute(n, ATTRS[usize::from(name) % ATTRS.len()]);
                }
            }
            Op::Tick => {
                session.run_tick();
            }
        }
    }
    let _ = session.settle();

    for node in &nodes {
        assert!(!(session.is_bound(*node) && session.pending_markers().is_parked(*node)));
    }
});
