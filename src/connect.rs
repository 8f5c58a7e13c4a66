//! Binding entry point (v0.1)
//!
//! ```rust,ignore
//! use signal_connect::{connect, InputMapping, OutputMapping};
//!
//! // Table / table
//! let enhancer = connect(
//!     &graph,
//!     OutputMapping::table([("username", "username$")]),
//!     InputMapping::table([("usernameChanged", "username$")]),
//! )?;
//!
//! // Function / absent
//! let enhancer = connect(
//!     &graph,
//!     OutputMapping::function(|outputs, _own_props| {
//!         Ok([("username".to_string(), outputs.get("username$")?)].into_iter().collect())
//!     }),
//!     (),
//! )?;
//!
//! let mounted = enhancer.wrap(LoginForm).mount(serde_json::json!({}))?;
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::component::{with_view_model, Enhancer};
use crate::error::ConnectError;
use crate::graph::SignalGraph;
use crate::mapping::{InputMapping, OutputMapping};
use crate::resolve::resolve;
use crate::view_model::ViewModelFactory;

/// Resolve both mappings against `graph` into a view-model factory
pub fn view_model_factory<G>(
    graph: &G,
    outputs: impl Into<OutputMapping>,
    inputs: impl Into<InputMapping>,
) -> Result<ViewModelFactory, ConnectError>
where
    G: SignalGraph + Clone + 'static,
{
    let resolved = resolve(graph, outputs.into(), inputs.into())?;
    debug!(strategy = %resolved.strategy, "Binding resolved");
    Ok(ViewModelFactory::new(Arc::new(graph.clone()), resolved))
}

/// Bind graph outputs to props and callbacks to graph inputs.
///
/// Either mapping may be a function, a name table, or absent. Table names are
/// checked against the graph here, before any component is mounted.
pub fn connect<G>(
    graph: &G,
    outputs: impl Into<OutputMapping>,
    inputs: impl Into<InputMapping>,
) -> Result<Enhancer, ConnectError>
where
    G: SignalGraph + Clone + 'static,
{
    view_model_factory(graph, outputs, inputs).map(with_view_model)
}
