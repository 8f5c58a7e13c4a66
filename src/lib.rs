//! signal-connect - bind named reactive signal graphs to components
//!
//! Graph outputs become props, component callbacks become graph inputs. Each
//! side is described by a [`Mapping`]: a function, a name table, or absent.
//! All shapes funnel through one path:
//!
//! ```text
//! connect(graph, outputs, inputs)
//!        ↓ resolve      classify shapes, validate tables against the graph
//!        ↓ adapt        tables → functions over graph accessors
//!  ViewModelFactory     invoked once per mounted instance with its own props
//!        ↓
//!    Enhancer → Connected<C> → Mounted<C>
//! ```

pub mod adapt;
pub mod binding_file;
pub mod component;
pub mod connect;
pub mod demo;
pub mod error;
pub mod graph;
pub mod mapping;
pub mod resolve;
pub mod view_model;

pub use binding_file::BindingFile;
pub use component::{
    with_static_view_model, with_view_model, Callback, Component, Connected, Enhancer, Mounted,
    Props,
};
pub use connect::{connect, view_model_factory};
pub use error::{ConnectError, FixSuggestion, Side};
pub use graph::{
    Graph, InputChannel, Inputs, Observable, Outputs, SignalGraph, SignalGraphBuilder, Subject,
};
pub use mapping::{
    BindingTable, InputFn, InputMapping, Mapping, ObservableMap, OutputFn, OutputMapping,
    SubjectMap,
};
pub use resolve::{Shape, Strategy};
pub use view_model::{ViewModel, ViewModelFactory};
