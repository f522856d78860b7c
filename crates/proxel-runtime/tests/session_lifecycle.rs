#![forbid(unsafe_code)]

//! End-to-end lifecycle scenarios: resolution, parking, flush and rebind.
//!
//! Run: `cargo test -p proxel-runtime --test session_lifecycle`

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use proxel_dom::NodeId;
use proxel_props::PropValue;
use proxel_runtime::{ControllerDef, Session, SessionConfig};

type Log = Rc<RefCell<Vec<String>>>;

const NO_ATTRS: [(&str, &str); 0] = [];

fn logged_tabs(log: &Log) -> ControllerDef {
    let connected = Rc::clone(log);
    let disconnected = Rc::clone(log);
    ControllerDef::builder("tabs")
        .prop("index", 0)
        .refs("tab")
        .refs("panel")
        .on_ref_connected("tab", move |e| {
            connected.borrow_mut().push(format!("+tab {:?}", e.target));
        })
        .on_ref_disconnected("tab", move |e| {
            disconnected.borrow_mut().push(format!("-tab {:?}", e.target));
        })
        .build()
        .expect("valid definition")
}

fn session(log: &Log) -> Session {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut s = Session::new();
    s.register(logged_tabs(log)).expect("registered");
    s
}

fn refs(s: &Session, controller: NodeId, kind: &str) -> Vec<NodeId> {
    s.refs(controller, kind)
        .expect("declared kind")
        .iter()
        .copied()
        .collect()
}

#[test]
fn same_turn_marker_then_controller_binds_after_one_tick() {
    let log = Log::default();
    let mut s = session(&log);
    let host = s.create_element("section", NO_ATTRS);
    let item = s.create_element("li", NO_ATTRS);
    let marker = s.create_element("tabs-ref", [("as", "tab")]);
    let proxy = s.create_element("tabs-proxy", NO_ATTRS);
    s.append_child(s.root(), host).unwrap();
    s.append_child(host, item).unwrap();
    // Marker connects before the controller within the same turn.
    s.append_child(item, marker).unwrap();
    s.append_child(host, proxy).unwrap();

    assert_eq!(s.run_tick(), 1);
    assert!(s.is_bound(marker));
    assert!(s.pending_markers().is_empty());
    assert_eq!(refs(&s, proxy, "tab"), vec![item]);
    assert_eq!(*log.borrow(), vec![format!("+tab {item:?}")]);
}

#[test]
fn explicit_id_parks_then_flushes_on_controller_attach() {
    let log = Log::default();
    let mut s = session(&log);
    let item = s.create_element("li", NO_ATTRS);
    let marker = s.create_element("proxy-ref", [("as", "tab"), ("proxy", "tabs"), ("for", "main")]);
    s.append_child(s.root(), item).unwrap();
    s.append_child(item, marker).unwrap();
    s.settle().unwrap();

    assert!(!s.is_bound(marker));
    assert_eq!(s.pending_markers().key_of(marker), Some("main"));

    let host = s.create_element("div", [("id", "main")]);
    let proxy = s.create_element("tabs-proxy", NO_ATTRS);
    s.append_child(host, proxy).unwrap();
    s.append_child(s.root(), host).unwrap();

    // The flush empties the bucket at once; the binding lands next tick.
    assert!(s.pending_markers().bucket("main").is_none());
    assert!(!s.is_bound(marker));
    s.run_tick();
    assert!(s.is_bound(marker));
    assert_eq!(refs(&s, proxy, "tab"), vec![item]);
}

#[test]
fn self_hosting_controller_by_id() {
    let log = Log::default();
    let mut s = session(&log);
    let host = s.create_element("tabs-element", [("id", "nav")]);
    let stray = s.create_element("p", NO_ATTRS);
    let marker = s.create_element("tabs-ref", [("as", "panel"), ("for", "nav")]);
    s.append_child(s.root(), host).unwrap();
    s.append_child(s.root(), stray).unwrap();
    s.append_child(stray, marker).unwrap();
    s.settle().unwrap();
    assert_eq!(refs(&s, host, "panel"), vec![stray]);
    assert_eq!(s.first_ref(host, "panel").unwrap(), Some(stray));
}

#[test]
fn unscoped_markers_bind_only_inside_the_attaching_subtree() {
    let log = Log::default();
    let mut s = session(&log);
    let inside = s.create_element("li", NO_ATTRS);
    let outside = s.create_element("li", NO_ATTRS);
    let m_in = s.create_element("tabs-ref", [("as", "tab")]);
    let m_out = s.create_element("tabs-ref", [("as", "tab")]);
    let host = s.create_element("ul", NO_ATTRS);
    s.append_child(s.root(), host).unwrap();
    s.append_child(host, inside).unwrap();
    s.append_child(inside, m_in).unwrap();
    s.append_child(s.root(), outside).unwrap();
    s.append_child(outside, m_out).unwrap();
    s.settle().unwrap();
    assert_eq!(s.pending_markers().len(), 2);

    let proxy = s.create_element("tabs-proxy", NO_ATTRS);
    s.append_child(host, proxy).unwrap();
    s.settle().unwrap();

    assert!(s.is_bound(m_in));
    assert!(!s.is_bound(m_out));
    assert!(s.pending_markers().is_parked(m_out));
    assert_eq!(refs(&s, proxy, "tab"), vec![inside]);
}

#[test]
fn changing_the_token_unbinds_before_rebinding() {
    let log = Log::default();
    let mut s = session(&log);
    let accordion = ControllerDef::builder("accordion")
        .refs("tab")
        .build()
        .unwrap();
    s.register(accordion).unwrap();

    let host = s.create_element("div", NO_ATTRS);
    let tabs = s.create_element("tabs-proxy", NO_ATTRS);
    let acc = s.create_element("accordion-proxy", NO_ATTRS);
    let item = s.create_element("li", NO_ATTRS);
    let marker = s.create_element("proxy-ref", [("as", "tab"), ("proxy", "tabs")]);
    for child in [tabs, acc, item] {
        s.append_child(host, child).unwrap();
    }
    s.append_child(item, marker).unwrap();
    s.append_child(s.root(), host).unwrap();
    s.settle().unwrap();
    assert_eq!(refs(&s, tabs, "tab"), vec![item]);

    s.set_attribute(marker, "proxy", "accordion").unwrap();
    // Unbinding is immediate; the new resolution waits for the tick.
    assert_eq!(refs(&s, tabs, "tab"), Vec::<NodeId>::new());
    assert_eq!(
        *log.borrow(),
        vec![format!("+tab {item:?}"), format!("-tab {item:?}")]
    );
    assert!(!s.is_bound(marker));

    s.run_tick();
    assert_eq!(refs(&s, acc, "tab"), vec![item]);
    assert_eq!(s.binding(marker).map(|b| b.controller), Some(acc));
}

#[test]
fn changing_the_kind_moves_between_collections() {
    let log = Log::default();
    let mut s = session(&log);
    let host = s.create_element("tabs-element", NO_ATTRS);
    let item = s.create_element("li", NO_ATTRS);
    let marker = s.create_element("tabs-ref", [("as", "tab")]);
    s.append_child(s.root(), host).unwrap();
    s.append_child(host, item).unwrap();
    s.append_child(item, marker).unwrap();
    s.settle().unwrap();

    s.set_attribute(marker, "as", "panel").unwrap();
    s.settle().unwrap();
    assert_eq!(refs(&s, host, "tab"), Vec::<NodeId>::new());
    assert_eq!(refs(&s, host, "panel"), vec![item]);
}

#[test]
fn marker_detach_unbinds_and_forgets() {
    let log = Log::default();
    let mut s = session(&log);
    let host = s.create_element("tabs-element", NO_ATTRS);
    let item = s.create_element("li", NO_ATTRS);
    let marker = s.create_element("tabs-ref", [("as", "tab")]);
    s.append_child(s.root(), host).unwrap();
    s.append_child(host, item).unwrap();
    s.append_child(item, marker).unwrap();
    s.settle().unwrap();

    s.remove(marker).unwrap();
    assert!(!s.is_bound(marker));
    assert_eq!(refs(&s, host, "tab"), Vec::<NodeId>::new());
    assert_eq!(log.borrow().len(), 2);

    // A parked marker that leaves the tree is dropped from the table.
    let orphan = s.create_element("tabs-ref", [("as", "tab"), ("for", "nowhere")]);
    s.append_child(s.root(), orphan).unwrap();
    s.settle().unwrap();
    assert!(s.pending_markers().is_parked(orphan));
    s.remove(orphan).unwrap();
    assert!(s.pending_markers().is_empty());
}

#[test]
fn controller_detach_leaves_bindings_stale() {
    let log = Log::default();
    let mut s = session(&log);
    let host = s.create_element("div", NO_ATTRS);
    let proxy = s.create_element("tabs-proxy", NO_ATTRS);
    let item = s.create_element("li", NO_ATTRS);
    let marker = s.create_element("tabs-ref", [("as", "tab")]);
    s.append_child(host, proxy).unwrap();
    s.append_child(host, item).unwrap();
    s.append_child(item, marker).unwrap();
    s.append_child(s.root(), host).unwrap();
    s.settle().unwrap();

    s.remove(proxy).unwrap();
    assert!(!s.document().has_attribute(host, "data-scope"));
    assert!(s.is_bound(marker));
    assert_eq!(s.controller(proxy).map(|c| c.refs("tab").map(|r| r.len())), Some(Some(1)));
    assert!(s.pending_markers().is_empty());
}

#[test]
fn explicit_host_without_matching_child_is_parked() {
    let log = Log::default();
    let mut s = session(&log);
    // `outer` has id `main`; the tabs proxy sits under `inner`.
    let outer = s.create_element("div", [("id", "main")]);
    let inner = s.create_element("div", NO_ATTRS);
    let proxy = s.create_element("tabs-proxy", NO_ATTRS);
    let marker = s.create_element("tabs-ref", [("as", "tab")]);
    s.append_child(s.root(), outer).unwrap();
    s.append_child(outer, inner).unwrap();
    s.append_child(inner, proxy).unwrap();
    // Scope of `marker` is `inner` (the proxy's target), so this resolves.
    s.append_child(inner, marker).unwrap();
    s.settle().unwrap();
    assert_eq!(s.binding(marker).map(|b| b.controller), Some(proxy));

    // Pointing at `main` finds no tabs controller targeting `outer`.
    s.set_attribute(marker, "for", "main").unwrap();
    s.settle().unwrap();
    assert!(!s.is_bound(marker));
    assert_eq!(s.pending_markers().key_of(marker), Some("main"));
}

#[test]
fn undeclared_kind_is_parked() {
    let log = Log::default();
    let mut s = session(&log);
    let host = s.create_element("tabs-element", NO_ATTRS);
    let marker = s.create_element("tabs-ref", [("as", "slide")]);
    let bare = s.create_element("tabs-ref", NO_ATTRS);
    s.append_child(s.root(), host).unwrap();
    s.append_child(host, marker).unwrap();
    s.append_child(host, bare).unwrap();
    s.settle().unwrap();
    assert!(s.pending_markers().is_parked(marker));
    assert!(s.pending_markers().is_parked(bare));
}

#[test]
fn kebab_kind_maps_to_member_name() {
    let mut s = Session::new();
    s.register(
        ControllerDef::builder("list")
            .refs("listItem")
            .build()
            .unwrap(),
    )
    .unwrap();
    let host = s.create_element("list-element", NO_ATTRS);
    let marker = s.create_element("list-ref", [("as", "list-item")]);
    s.append_child(s.root(), host).unwrap();
    s.append_child(host, marker).unwrap();
    s.settle().unwrap();
    assert_eq!(s.first_ref(host, "list-item").unwrap(), Some(host));
    assert_eq!(s.first_ref(host, "listItem").unwrap(), Some(host));
}

#[test]
fn moving_a_controller_moves_its_scope() {
    let log = Log::default();
    let mut s = session(&log);
    let a = s.create_element("div", NO_ATTRS);
    let b = s.create_element("div", NO_ATTRS);
    let proxy = s.create_element("tabs-proxy", NO_ATTRS);
    s.append_child(s.root(), a).unwrap();
    s.append_child(s.root(), b).unwrap();
    s.append_child(a, proxy).unwrap();
    assert_eq!(s.document().attribute(a, "data-scope"), Some(" tabs "));
    s.append_child(b, proxy).unwrap();
    assert!(!s.document().has_attribute(a, "data-scope"));
    assert_eq!(s.document().attribute(b, "data-scope"), Some(" tabs "));
}

#[test]
fn enabled_flag_example() {
    let mut s = Session::new();
    s.register(
        ControllerDef::builder("toggle")
            .prop("enabled", true)
            .build()
            .unwrap(),
    )
    .unwrap();
    let node = s.create_element("toggle-element", NO_ATTRS);
    s.set_property(node, "enabled", false).unwrap();
    assert_eq!(s.document().attribute(node, "enabled"), Some("false"));
    s.set_property(node, "enabled", true).unwrap();
    assert!(!s.document().has_attribute(node, "enabled"));
}

#[test]
fn bootstrap_example() {
    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    let mut s = Session::new();
    s.register(
        ControllerDef::builder("counter")
            .prop("count", 0)
            .on_initialized(move |view| {
                *sink.borrow_mut() = view.value("count").cloned();
            })
            .build()
            .unwrap(),
    )
    .unwrap();
    let node = s.create_element("counter-proxy", [("data-props", r#"{"count": 5}"#)]);
    assert_eq!(s.property(node, "count"), Some(&PropValue::from(5)));
    assert_eq!(s.document().attribute(node, "count"), Some("5"));
    assert!(!s.document().has_attribute(node, "data-props"));
    assert_eq!(*seen.borrow(), Some(PropValue::from(5)));

    // A later bootstrap payload reseeds keys without a literal attribute.
    s.remove_attribute(node, "count").unwrap();
    assert_eq!(s.property(node, "count"), Some(&PropValue::from(0)));
    s.set_attribute(node, "data-props", r#"{"count": 9}"#).unwrap();
    assert_eq!(s.property(node, "count"), Some(&PropValue::from(9)));
    assert!(!s.document().has_attribute(node, "data-props"));
}

#[test]
fn configured_names_are_honoured() {
    let config = SessionConfig::from_toml_str(
        r#"
        proxy_suffix = "ctl"
        scope_attribute = "data-owner"
        bootstrap_attribute = "data-init"
        generic_ref_tag = "x-ref"
        "#,
    )
    .unwrap();
    let mut s = Session::with_config(config).unwrap();
    s.register(
        ControllerDef::builder("tabs")
            .prop("index", 0)
            .refs("tab")
            .build()
            .unwrap(),
    )
    .unwrap();
    let host = s.create_element("div", NO_ATTRS);
    let ctl = s.create_element("tabs-ctl", [("data-init", r#"{"index": 2}"#)]);
    let marker = s.create_element("x-ref", [("as", "tab"), ("proxy", "tabs")]);
    s.append_child(s.root(), host).unwrap();
    s.append_child(host, ctl).unwrap();
    s.append_child(host, marker).unwrap();
    s.settle().unwrap();
    assert_eq!(s.document().attribute(host, "data-owner"), Some(" tabs "));
    assert_eq!(s.property(ctl, "index"), Some(&PropValue::from(2)));
    assert_eq!(s.first_ref(ctl, "tab").unwrap(), Some(host));
}
