//! Plugin configuration rendering for reactorconf.
//!
//! This crate turns a plugins template plus a build spec into the plugin
//! configuration the container build executor runs (see [`renderer`]).

pub mod manipulate;
pub mod renderer;
pub mod rules;

pub use manipulate::{PluginStore, shallow_union};
pub use renderer::{PluginsRenderer, phase_rules, render};
pub use rules::{RenderContext, Rule};
