//! Signal Graph Module - named reactive values (v0.1)
//!
//! The binder only ever talks to a graph through the [`SignalGraph`] trait:
//! - `output(name)`: observable for a primary or derived signal
//! - `input(name)`: writable channel for a primary signal
//! - `signal_names()` / `input_names()`: name registries used to validate
//!   table mappings at bind time
//!
//! A reference implementation ([`Graph`], built with [`SignalGraphBuilder`])
//! lives alongside it:
//! - `observable`: [`Observable`] and its operators
//! - `subject`: [`Subject`], the hot replay-latest channel
//! - `builder`: graph definition, validation and cross-graph links

mod builder;
mod observable;
mod subject;

use std::sync::Arc;

pub use builder::{Deps, Graph, SignalGraphBuilder};
pub use observable::{boxed, Observable};
pub use subject::{InputChannel, Subject};

use crate::error::ConnectError;

/// Read/write access to a named signal graph
pub trait SignalGraph: Send + Sync {
    /// Observable for a primary or derived signal
    fn output(&self, name: &str) -> Result<Observable, ConnectError>;

    /// Writable channel for a primary signal
    fn input(&self, name: &str) -> Result<InputChannel, ConnectError>;

    /// Every readable name (primary and derived)
    fn signal_names(&self) -> Vec<Arc<str>>;

    /// Every writable name (primary only)
    fn input_names(&self) -> Vec<Arc<str>>;
}

/// Output-only view of a graph, handed to output mapping functions
#[derive(Clone, Copy)]
pub struct Outputs<'a> {
    graph: &'a dyn SignalGraph,
}

impl<'a> Outputs<'a> {
    pub fn new(graph: &'a dyn SignalGraph) -> Self {
        Self { graph }
    }

    /// Observable for `name`
    pub fn get(&self, name: &str) -> Result<Observable, ConnectError> {
        self.graph.output(name)
    }
}

/// Input-only view of a graph, handed to input mapping functions
#[derive(Clone, Copy)]
pub struct Inputs<'a> {
    graph: &'a dyn SignalGraph,
}

impl<'a> Inputs<'a> {
    pub fn new(graph: &'a dyn SignalGraph) -> Self {
        Self { graph }
    }

    /// Writable channel for `name`
    pub fn get(&self, name: &str) -> Result<InputChannel, ConnectError> {
        self.graph.input(name)
    }
}
