//! Graph builder and the reference [`SignalGraph`] implementation
//!
//! Signals are declared in order. A derived signal may only depend on
//! signals and dependencies declared before it, which keeps the graph acyclic
//! without a separate sort.

use std::any::Any;
use std::sync::Arc;

use futures::StreamExt;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{InputChannel, Observable, SignalGraph, Subject};
use crate::error::ConnectError;

/// Signal names: identifier, optionally suffixed with `$`
static SIGNAL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\$?$").unwrap());

type DeriveFn = Box<dyn FnOnce(&Deps<'_>) -> Result<Observable, ConnectError> + Send>;
type Dependency = Arc<dyn Any + Send + Sync>;

enum Definition {
    Primary,
    Derived { deps: Vec<String>, derive: DeriveFn },
}

struct SignalEntry {
    subject: Subject,
    writable: bool,
}

/// Declared inputs of a derived signal
pub struct Deps<'a> {
    name: &'a str,
    declared: &'a [String],
    signals: &'a FxHashMap<Arc<str>, SignalEntry>,
    dependencies: &'a FxHashMap<String, Dependency>,
}

impl Deps<'_> {
    fn check_declared(&self, dependency: &str) -> Result<(), ConnectError> {
        if self.declared.iter().any(|d| d == dependency) {
            Ok(())
        } else {
            Err(ConnectError::MissingDependency {
                name: self.name.to_string(),
                dependency: dependency.to_string(),
            })
        }
    }

    /// Observable for a declared upstream signal
    pub fn signal(&self, name: &str) -> Result<Observable, ConnectError> {
        self.check_declared(name)?;
        self.signals
            .get(name)
            .map(|entry| entry.subject.observable())
            .ok_or_else(|| ConnectError::MissingDependency {
                name: self.name.to_string(),
                dependency: name.to_string(),
            })
    }

    /// Clone of a declared non-signal dependency
    pub fn dependency<T>(&self, name: &str) -> Result<T, ConnectError>
    where
        T: Any + Send + Sync + Clone,
    {
        self.check_declared(name)?;
        let value = self
            .dependencies
            .get(name)
            .ok_or_else(|| ConnectError::MissingDependency {
                name: self.name.to_string(),
                dependency: name.to_string(),
            })?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ConnectError::DependencyType {
                name: name.to_string(),
            })
    }
}

/// Fluent builder for signal graphs
pub struct SignalGraphBuilder {
    definitions: Vec<(String, Definition)>,
    dependencies: FxHashMap<String, Dependency>,
    initial: Vec<(String, Value)>,
}

impl SignalGraphBuilder {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            dependencies: FxHashMap::default(),
            initial: Vec::new(),
        }
    }

    /// Declare a writable signal
    pub fn add_primary(mut self, name: impl Into<String>) -> Self {
        self.definitions.push((name.into(), Definition::Primary));
        self
    }

    /// Declare a signal computed from earlier signals and dependencies
    pub fn add_derived<F>(mut self, name: impl Into<String>, deps: &[&str], derive: F) -> Self
    where
        F: FnOnce(&Deps<'_>) -> Result<Observable, ConnectError> + Send + 'static,
    {
        self.definitions.push((
            name.into(),
            Definition::Derived {
                deps: deps.iter().map(|d| d.to_string()).collect(),
                derive: Box::new(derive),
            },
        ));
        self
    }

    /// Register a non-signal value (an API client, a clock, ...)
    pub fn add_dependency<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.dependencies.insert(name.into(), Arc::new(value));
        self
    }

    /// Seed signals with a current value
    pub fn initialize_with<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.initial
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Validate definitions and start the derived signals.
    ///
    /// Must run inside a tokio runtime: every derived signal gets a task that
    /// keeps its hot copy up to date for as long as the graph is alive.
    pub fn build(self) -> Result<Graph, ConnectError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ConnectError::NoRuntime)?;

        let mut initial: FxHashMap<String, Value> = FxHashMap::default();
        for (name, value) in self.initial {
            if !self.definitions.iter().any(|(n, _)| *n == name) {
                return Err(ConnectError::UnknownInitialValue { name });
            }
            initial.insert(name, value);
        }

        let mut signals: FxHashMap<Arc<str>, SignalEntry> = FxHashMap::default();
        let mut order: Vec<Arc<str>> = Vec::with_capacity(self.definitions.len());
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        for (name, definition) in self.definitions {
            if !SIGNAL_NAME.is_match(&name) {
                return Err(ConnectError::InvalidSignalName { name });
            }
            if signals.contains_key(name.as_str()) || self.dependencies.contains_key(&name) {
                return Err(ConnectError::DuplicateSignal { name });
            }

            let subject = match initial.remove(&name) {
                Some(value) => Subject::with_initial(value),
                None => Subject::new(),
            };

            let writable = match definition {
                Definition::Primary => true,
                Definition::Derived { deps, derive } => {
                    if let Some(missing) = deps.iter().find(|d| {
                        !signals.contains_key(d.as_str()) && !self.dependencies.contains_key(*d)
                    }) {
                        return Err(ConnectError::MissingDependency {
                            name,
                            dependency: missing.clone(),
                        });
                    }

                    let observable = derive(&Deps {
                        name: &name,
                        declared: &deps,
                        signals: &signals,
                        dependencies: &self.dependencies,
                    })?;

                    // Subscribe now so upstream writes are buffered before the task runs
                    let mut upstream = observable.subscribe();
                    let hot = subject.clone();
                    tasks.push(runtime.spawn(async move {
                        while let Some(value) = upstream.next().await {
                            hot.next(value);
                        }
                    }));
                    false
                }
            };

            let key: Arc<str> = Arc::from(name.as_str());
            order.push(Arc::clone(&key));
            signals.insert(key, SignalEntry { subject, writable });
        }

        debug!(
            signals = order.len(),
            derived = tasks.len(),
            dependencies = self.dependencies.len(),
            "Signal graph built"
        );

        Ok(Graph {
            inner: Arc::new(GraphInner {
                signals,
                order,
                tasks: Mutex::new(tasks),
                runtime,
            }),
        })
    }
}

impl Default for SignalGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct GraphInner {
    signals: FxHashMap<Arc<str>, SignalEntry>,
    /// Declaration order, for stable name listings
    order: Vec<Arc<str>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    runtime: tokio::runtime::Handle,
}

impl Drop for GraphInner {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Built signal graph; cheap to clone, tasks stop when the last clone drops
#[derive(Clone)]
pub struct Graph {
    inner: Arc<GraphInner>,
}

impl Graph {
    /// Feed primary signal `input` of this graph from `source`'s `output`.
    ///
    /// The source's current value (if any) is forwarded immediately.
    pub fn connect(
        &self,
        input: &str,
        source: &dyn SignalGraph,
        output: &str,
    ) -> Result<(), ConnectError> {
        let link_error = |err: ConnectError| ConnectError::LinkFailed {
            input: input.to_string(),
            output: output.to_string(),
            reason: err.to_string(),
        };
        let target = self.input(input).map_err(link_error)?;
        let mut upstream = source.output(output).map_err(link_error)?.subscribe();

        let task = self.inner.runtime.spawn(async move {
            while let Some(value) = upstream.next().await {
                target.next(value);
            }
        });
        self.inner.tasks.lock().push(task);

        debug!(input, output, "Linked graphs");
        Ok(())
    }

    /// Whether `name` is a derived (read-only) signal
    pub fn is_derived(&self, name: &str) -> bool {
        self.inner
            .signals
            .get(name)
            .map(|entry| !entry.writable)
            .unwrap_or(false)
    }

    /// Current value of a signal, if it has one
    pub fn latest(&self, name: &str) -> Option<Value> {
        self.inner.signals.get(name)?.subject.latest()
    }
}

impl SignalGraph for Graph {
    fn output(&self, name: &str) -> Result<Observable, ConnectError> {
        self.inner
            .signals
            .get(name)
            .map(|entry| entry.subject.observable())
            .ok_or_else(|| ConnectError::UnknownSignal {
                name: name.to_string(),
            })
    }

    fn input(&self, name: &str) -> Result<InputChannel, ConnectError> {
        match self.inner.signals.get(name) {
            Some(entry) if entry.writable => Ok(entry.subject.clone()),
            _ => Err(ConnectError::UnknownInput {
                name: name.to_string(),
            }),
        }
    }

    fn signal_names(&self) -> Vec<Arc<str>> {
        self.inner.order.clone()
    }

    fn input_names(&self) -> Vec<Arc<str>> {
        self.inner
            .order
            .iter()
            .filter(|name| !self.is_derived(name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn counter_graph() -> Result<Graph, ConnectError> {
        SignalGraphBuilder::new()
            .add_primary("count$")
            .add_dependency("step", 10_i64)
            .add_derived("scaled$", &["count$", "step"], |deps| {
                let step: i64 = deps.dependency("step")?;
                Ok(deps
                    .signal("count$")?
                    .map(move |v| json!(v.as_i64().unwrap_or(0) * step)))
            })
            .initialize_with([("count$", json!(1))])
            .build()
    }

    #[test]
    fn build_requires_runtime() {
        let result = SignalGraphBuilder::new().add_primary("a$").build();
        assert!(matches!(result, Err(ConnectError::NoRuntime)));
    }

    #[tokio::test]
    async fn derived_follows_primary() {
        let graph = counter_graph().unwrap();
        let mut scaled = graph.output("scaled$").unwrap().subscribe();
        assert_eq!(
            tokio::time::timeout(Duration::from_secs(1), scaled.next()).await.unwrap(),
            Some(json!(10))
        );

        graph.input("count$").unwrap().next(json!(3));
        assert_eq!(
            tokio::time::timeout(Duration::from_secs(1), scaled.next()).await.unwrap(),
            Some(json!(30))
        );
    }

    #[tokio::test]
    async fn name_registries() {
        let graph = counter_graph().unwrap();
        let signals: Vec<String> = graph.signal_names().iter().map(|n| n.to_string()).collect();
        let inputs: Vec<String> = graph.input_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(signals, ["count$", "scaled$"]);
        assert_eq!(inputs, ["count$"]);
        assert!(graph.is_derived("scaled$"));
    }

    #[tokio::test]
    async fn derived_signals_have_no_input() {
        let graph = counter_graph().unwrap();
        let err = graph.input("scaled$").unwrap_err();
        assert!(err.to_string().contains("SC-011"));
        let err = graph.output("missing$").unwrap_err();
        assert!(err.to_string().contains("SC-010"));
    }

    #[tokio::test]
    async fn rejects_bad_definitions() {
        let dup = SignalGraphBuilder::new()
            .add_primary("a$")
            .add_primary("a$")
            .build();
        assert!(matches!(dup, Err(ConnectError::DuplicateSignal { .. })));

        let forward_ref = SignalGraphBuilder::new()
            .add_derived("b$", &["a$"], |deps| deps.signal("a$"))
            .add_primary("a$")
            .build();
        assert!(matches!(
            forward_ref,
            Err(ConnectError::MissingDependency { .. })
        ));

        let unknown_init = SignalGraphBuilder::new()
            .add_primary("a$")
            .initialize_with([("z$", json!(0))])
            .build();
        assert!(matches!(
            unknown_init,
            Err(ConnectError::UnknownInitialValue { .. })
        ));

        let bad_name = SignalGraphBuilder::new().add_primary("not a name").build();
        assert!(matches!(bad_name, Err(ConnectError::InvalidSignalName { .. })));
    }

    #[tokio::test]
    async fn undeclared_access_is_rejected() {
        let result = SignalGraphBuilder::new()
            .add_primary("a$")
            .add_primary("b$")
            .add_derived("c$", &["a$"], |deps| deps.signal("b$"))
            .build();
        assert!(matches!(result, Err(ConnectError::MissingDependency { .. })));
    }

    #[tokio::test]
    async fn dependency_type_mismatch() {
        let result = SignalGraphBuilder::new()
            .add_dependency("step", 10_i64)
            .add_derived("x$", &["step"], |deps| {
                let _: String = deps.dependency("step")?;
                Ok(Observable::never())
            })
            .build();
        assert!(matches!(result, Err(ConnectError::DependencyType { .. })));
    }

    #[tokio::test]
    async fn connect_links_graphs() {
        let source = counter_graph().unwrap();
        let target = SignalGraphBuilder::new()
            .add_primary("incoming$")
            .build()
            .unwrap();

        target.connect("incoming$", &source, "scaled$").unwrap();
        let mut incoming = target.output("incoming$").unwrap().subscribe();
        source.input("count$").unwrap().next(json!(5));

        let mut seen = Vec::new();
        while let Ok(Some(v)) =
            tokio::time::timeout(Duration::from_secs(1), incoming.next()).await
        {
            seen.push(v.clone());
            if v == json!(50) {
                break;
            }
        }
        assert_eq!(seen.last(), Some(&json!(50)));
    }

    #[tokio::test]
    async fn connect_rejects_unknown_names() {
        let source = counter_graph().unwrap();
        let target = counter_graph().unwrap();
        let err = target.connect("scaled$", &source, "count$").unwrap_err();
        assert!(err.to_string().contains("SC-012"));
    }
}
