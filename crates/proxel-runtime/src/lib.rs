#![forbid(unsafe_code)]

//! Host lifecycle for proxel controllers.
//!
//! [`Session`] owns an element tree and dispatches its mutations:
//!
//! - [`Session::register`] wires a [`ControllerDef`] to its tag family.
//! - Tree mutations connect and disconnect controllers and reference markers.
//! - Attribute mutations reach property synchronisation and marker rebinding.
//! - [`Session::run_tick`] runs deferred marker resolution.
//!
//! Configuration lives in [`SessionConfig`], loadable from TOML or JSON.

pub mod config;
pub mod controller;
pub mod error;
pub mod marker;
pub mod session;
pub mod tick;
mod tree;

pub use config::SessionConfig;
pub use controller::{
    ChangeHook, ControllerDef, ControllerDefBuilder, ControllerHooks, ControllerInstance,
    ControllerRole, ControllerView, InitHook, PropertyChange, RefEvent, RefHook,
};
pub use error::{ConfigError, SessionError};
pub use marker::{Binding, HOST_ATTRIBUTE, KIND_ATTRIBUTE, RefMarker, TOKEN_ATTRIBUTE};
pub use session::Session;
pub use tick::TaskQueue;
