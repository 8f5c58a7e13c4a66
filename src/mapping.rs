//! Mapping specifications (v0.1)
//!
//! Each side of a binding is described by one [`Mapping`]:
//! - `Absent`: the side is not bound at all (no map is produced)
//! - `Function`: computes the map from a graph accessor and the own-props stream
//! - `Table`: declarative `prop name → signal name` associations
//!
//! Tables can also come from configuration (`outputs:` / `inputs:` blocks in
//! a binding file):
//! ```yaml
//! outputs:
//!   loginInProgress: loginInProgress$
//!   username: username$
//! inputs:
//!   usernameChanged: username$
//! ```

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{ConnectError, Side};
use crate::graph::{InputChannel, Inputs, Observable, Outputs};

/// Prop name → observable feeding it
pub type ObservableMap = FxHashMap<String, Observable>;

/// Callback prop name → channel it writes to
pub type SubjectMap = FxHashMap<String, InputChannel>;

/// Output-side mapping function
pub type OutputFn =
    Arc<dyn Fn(&Outputs<'_>, &Observable) -> Result<ObservableMap, ConnectError> + Send + Sync>;

/// Input-side mapping function (sees only writable channels)
pub type InputFn =
    Arc<dyn Fn(&Inputs<'_>, &Observable) -> Result<SubjectMap, ConnectError> + Send + Sync>;

/// Declarative destination → graph name table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct BindingTable {
    entries: FxHashMap<String, String>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind prop `destination` to graph name `source`
    pub fn insert(&mut self, destination: impl Into<String>, source: impl Into<String>) {
        self.entries.insert(destination.into(), source.into());
    }

    /// Graph name bound to `destination`
    pub fn get(&self, destination: &str) -> Option<&str> {
        self.entries.get(destination).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(destination, source)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(d, s)| (d.as_str(), s.as_str()))
    }

    /// Destination names, sorted
    pub fn destinations(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl<D, S> FromIterator<(D, S)> for BindingTable
where
    D: Into<String>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (D, S)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (destination, source) in iter {
            table.insert(destination, source);
        }
        table
    }
}

/// One side of a binding: absent, a function, or a name table
pub enum Mapping<F> {
    Absent,
    Function(F),
    Table(BindingTable),
}

/// Mapping from graph outputs to props
pub type OutputMapping = Mapping<OutputFn>;

/// Mapping from callbacks to graph inputs
pub type InputMapping = Mapping<InputFn>;

impl<F> Mapping<F> {
    pub fn absent() -> Self {
        Mapping::Absent
    }

    /// Table mapping from `(destination, source)` pairs
    pub fn table<I, D, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (D, S)>,
        D: Into<String>,
        S: Into<String>,
    {
        Mapping::Table(entries.into_iter().collect())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Mapping::Absent)
    }
}

impl OutputMapping {
    /// Function mapping over graph outputs and own props
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Outputs<'_>, &Observable) -> Result<ObservableMap, ConnectError>
            + Send
            + Sync
            + 'static,
    {
        Mapping::Function(Arc::new(f))
    }
}

impl InputMapping {
    /// Function mapping over graph inputs and own props
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Inputs<'_>, &Observable) -> Result<SubjectMap, ConnectError>
            + Send
            + Sync
            + 'static,
    {
        Mapping::Function(Arc::new(f))
    }
}

impl<F> Clone for Mapping<F>
where
    F: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Mapping::Absent => Mapping::Absent,
            Mapping::Function(f) => Mapping::Function(f.clone()),
            Mapping::Table(t) => Mapping::Table(t.clone()),
        }
    }
}

impl<F> fmt::Debug for Mapping<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mapping::Absent => f.write_str("Absent"),
            Mapping::Function(_) => f.write_str("Function(..)"),
            Mapping::Table(t) => f.debug_tuple("Table").field(t).finish(),
        }
    }
}

impl<F> From<BindingTable> for Mapping<F> {
    fn from(table: BindingTable) -> Self {
        Mapping::Table(table)
    }
}

impl<F> From<Option<BindingTable>> for Mapping<F> {
    fn from(table: Option<BindingTable>) -> Self {
        table.map_or(Mapping::Absent, Mapping::Table)
    }
}

impl<F> From<()> for Mapping<F> {
    fn from(_: ()) -> Self {
        Mapping::Absent
    }
}

/// Classify a configuration value as a mapping.
///
/// `null` means absent, a map of strings is a table, anything else is rejected.
pub fn mapping_from_yaml<F>(side: Side, value: &serde_yaml::Value) -> Result<Mapping<F>, ConnectError> {
    use serde_yaml::Value as Yaml;

    let found = match value {
        Yaml::Null => return Ok(Mapping::Absent),
        Yaml::Mapping(map) => {
            let mut table = BindingTable::new();
            for (key, source) in map {
                match (key, source) {
                    (Yaml::String(d), Yaml::String(s)) => table.insert(d.as_str(), s.as_str()),
                    _ => {
                        return Err(ConnectError::InvalidMappingShape {
                            side,
                            found: "a map with non-string entries".to_string(),
                        })
                    }
                }
            }
            return Ok(Mapping::Table(table));
        }
        Yaml::Bool(_) => "a boolean",
        Yaml::Number(_) => "a number",
        Yaml::String(_) => "a string",
        Yaml::Sequence(_) => "a sequence",
        Yaml::Tagged(_) => "a tagged value",
    };

    Err(ConnectError::InvalidMappingShape {
        side,
        found: found.to_string(),
    })
}
