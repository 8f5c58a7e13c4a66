//! Table adaptation (v0.1)
//!
//! Turns a declarative `destination → graph name` table into the same kind of
//! function a caller could have written by hand. Table mappings never see the
//! own-props stream.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::ConnectError;
use crate::graph::{Inputs, Observable, Outputs};
use crate::mapping::{BindingTable, InputFn, OutputFn};

/// Look up every table entry with `accessor`, keyed by destination.
///
/// Each call allocates a fresh map; the first failing lookup is returned as is.
pub fn adapt<T, A>(
    table: &BindingTable,
    mut accessor: A,
) -> Result<FxHashMap<String, T>, ConnectError>
where
    A: FnMut(&str) -> Result<T, ConnectError>,
{
    table.iter().try_fold(
        FxHashMap::with_capacity_and_hasher(table.len(), Default::default()),
        |mut acc, (destination, source)| {
            acc.insert(destination.to_string(), accessor(source)?);
            Ok(acc)
        },
    )
}

/// Output table as an output function (`output(name)` per entry)
pub fn adapt_output_table(table: BindingTable) -> OutputFn {
    debug!(entries = table.len(), "Adapting output table");
    Arc::new(move |outputs: &Outputs<'_>, _own_props: &Observable| {
        adapt(&table, |name| outputs.get(name))
    })
}

/// Input table as an input function (`input(name)` per entry)
pub fn adapt_input_table(table: BindingTable) -> InputFn {
    debug!(entries = table.len(), "Adapting input table");
    Arc::new(move |inputs: &Inputs<'_>, _own_props: &Observable| {
        adapt(&table, |name| inputs.get(name))
    })
}
