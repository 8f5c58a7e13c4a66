//! Shape resolution (v0.1)
//!
//! Classifies the two mappings of a binding and normalizes them into plain
//! functions, so the view-model factory has exactly one code path:
//!
//! | outputs  | inputs   | strategy      |
//! |----------|----------|---------------|
//! | function | function | `PassThrough` |
//! | table    | function | `AdaptOutputs`|
//! | function | table    | `AdaptInputs` |
//! | table    | table    | `AdaptBoth`   |
//!
//! An absent side is carried through as absent and counts as pass-through.
//! Tables are checked against the graph's name registries before anything is
//! adapted; every unknown name is reported at once.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::adapt::{adapt_input_table, adapt_output_table};
use crate::error::{ConnectError, Side};
use crate::graph::SignalGraph;
use crate::mapping::{BindingTable, InputFn, InputMapping, Mapping, OutputFn, OutputMapping};

/// Runtime shape of one mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Absent,
    Function,
    Table,
}

impl Shape {
    pub fn of<F>(mapping: &Mapping<F>) -> Self {
        match mapping {
            Mapping::Absent => Shape::Absent,
            Mapping::Function(_) => Shape::Function,
            Mapping::Table(_) => Shape::Table,
        }
    }
}

/// Which sides need table adaptation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    PassThrough,
    AdaptOutputs,
    AdaptInputs,
    AdaptBoth,
}

impl Strategy {
    pub fn select(outputs: Shape, inputs: Shape) -> Self {
        match (outputs == Shape::Table, inputs == Shape::Table) {
            (false, false) => Strategy::PassThrough,
            (true, false) => Strategy::AdaptOutputs,
            (false, true) => Strategy::AdaptInputs,
            (true, true) => Strategy::AdaptBoth,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strategy::PassThrough => "pass-through",
            Strategy::AdaptOutputs => "adapt outputs",
            Strategy::AdaptInputs => "adapt inputs",
            Strategy::AdaptBoth => "adapt outputs and inputs",
        };
        f.write_str(s)
    }
}

/// Both sides normalized to functions (or absent)
#[derive(Clone)]
pub struct Resolved {
    pub strategy: Strategy,
    pub outputs: Option<OutputFn>,
    pub inputs: Option<InputFn>,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("strategy", &self.strategy)
            .field("outputs", &self.outputs.is_some())
            .field("inputs", &self.inputs.is_some())
            .finish()
    }
}

/// Names in `table` that `known` does not contain, sorted
pub fn unknown_names(table: &BindingTable, known: &[Arc<str>]) -> Vec<String> {
    let known: HashSet<&str> = known.iter().map(|n| n.as_ref()).collect();
    let mut missing: Vec<String> = table
        .iter()
        .filter(|(_, source)| !known.contains(source))
        .map(|(_, source)| source.to_string())
        .collect();
    missing.sort_unstable();
    missing.dedup();
    missing
}

/// Reject a table that references names outside `known`
pub fn validate_table(
    side: Side,
    table: &BindingTable,
    known: &[Arc<str>],
) -> Result<(), ConnectError> {
    let names = unknown_names(table, known);
    if names.is_empty() {
        Ok(())
    } else {
        Err(ConnectError::UnknownNames { side, names })
    }
}

/// Classify, validate and normalize both mappings against `graph`
pub fn resolve(
    graph: &dyn SignalGraph,
    outputs: OutputMapping,
    inputs: InputMapping,
) -> Result<Resolved, ConnectError> {
    let strategy = Strategy::select(Shape::of(&outputs), Shape::of(&inputs));
    debug!(
        %strategy,
        outputs = ?Shape::of(&outputs),
        inputs = ?Shape::of(&inputs),
        "Resolving mapping shapes"
    );

    let outputs = match outputs {
        Mapping::Absent => None,
        Mapping::Function(f) => Some(f),
        Mapping::Table(table) => {
            validate_table(Side::Outputs, &table, &graph.signal_names())?;
            Some(adapt_output_table(table))
        }
    };

    let inputs = match inputs {
        Mapping::Absent => None,
        Mapping::Function(f) => Some(f),
        Mapping::Table(table) => {
            validate_table(Side::Inputs, &table, &graph.input_names())?;
            Some(adapt_input_table(table))
        }
    };

    Ok(Resolved {
        strategy,
        outputs,
        inputs,
    })
}
