//! View models and the per-instance factory (v0.1)
//!
//! A [`ViewModelFactory`] is created once per `connect(..)` call and invoked
//! once per mounted component instance. Each invocation hands the mapping
//! functions that instance's own-props stream and returns fresh maps; nothing
//! is cached across invocations.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::ConnectError;
use crate::graph::{Inputs, Observable, Outputs, SignalGraph};
use crate::mapping::{InputFn, ObservableMap, OutputFn, SubjectMap};
use crate::resolve::{Resolved, Strategy};

/// Observables for props and channels for callbacks of one instance.
///
/// A side is `None` when its mapping was absent.
#[derive(Clone, Debug, Default)]
pub struct ViewModel {
    pub outputs: Option<ObservableMap>,
    pub inputs: Option<SubjectMap>,
}

impl ViewModel {
    /// Sorted prop names fed by the graph
    pub fn output_names(&self) -> Vec<&str> {
        sorted_keys(self.outputs.as_ref())
    }

    /// Sorted callback prop names writing to the graph
    pub fn input_names(&self) -> Vec<&str> {
        sorted_keys(self.inputs.as_ref())
    }
}

fn sorted_keys<V>(map: Option<&rustc_hash::FxHashMap<String, V>>) -> Vec<&str> {
    let mut keys: Vec<&str> = map
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default();
    keys.sort_unstable();
    keys
}

/// Closes over a graph and both normalized mappings
#[derive(Clone)]
pub struct ViewModelFactory {
    graph: Arc<dyn SignalGraph>,
    strategy: Strategy,
    outputs: Option<OutputFn>,
    inputs: Option<InputFn>,
}

impl ViewModelFactory {
    pub fn new(graph: Arc<dyn SignalGraph>, resolved: Resolved) -> Self {
        Self {
            graph,
            strategy: resolved.strategy,
            outputs: resolved.outputs,
            inputs: resolved.inputs,
        }
    }

    /// How the mappings were normalized
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Build the view model for one component instance
    #[instrument(skip_all, fields(strategy = %self.strategy))]
    pub fn create(&self, own_props: &Observable) -> Result<ViewModel, ConnectError> {
        let graph = self.graph.as_ref();

        let outputs = match &self.outputs {
            Some(map_outputs) => Some(map_outputs(&Outputs::new(graph), own_props)?),
            None => None,
        };
        let inputs = match &self.inputs {
            Some(map_inputs) => Some(map_inputs(&Inputs::new(graph), own_props)?),
            None => None,
        };

        debug!(
            outputs = outputs.as_ref().map_or(0, |m| m.len()),
            inputs = inputs.as_ref().map_or(0, |m| m.len()),
            "View model created"
        );
        Ok(ViewModel { outputs, inputs })
    }
}

impl std::fmt::Debug for ViewModelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModelFactory")
            .field("strategy", &self.strategy)
            .field("outputs", &self.outputs.is_some())
            .field("inputs", &self.inputs.is_some())
            .finish()
    }
}
