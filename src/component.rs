//! Component wrapper (v0.1)
//!
//! Owns everything that happens after a view model exists: subscribing to the
//! output observables, exposing callbacks that push into input channels, and
//! tearing the subscriptions down when the instance goes away.
//!
//! ```text
//! with_view_model(factory) → Enhancer
//!                               ↓ wrap(component)
//!                           Connected<C>
//!                               ↓ mount(own_props)      (factory runs once here)
//!                           Mounted<C>  → props() / render() / callback(..)
//! ```

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::StreamExt;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::error::ConnectError;
use crate::graph::{InputChannel, Subject};
use crate::view_model::{ViewModel, ViewModelFactory};

/// Callback prop bound to a graph input
#[derive(Clone, Debug)]
pub struct Callback {
    name: Arc<str>,
    channel: InputChannel,
}

impl Callback {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Push a value into the bound input
    pub fn call(&self, value: Value) {
        debug!(callback = %self.name, "Callback invoked");
        self.channel.next(value);
    }
}

/// Props as seen by a presentation component
#[derive(Clone, Debug, Default)]
pub struct Props {
    values: FxHashMap<String, Value>,
    callbacks: FxHashMap<String, Callback>,
}

impl Props {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn callback(&self, name: &str) -> Option<&Callback> {
        self.callbacks.get(name)
    }

    /// Sorted value prop names
    pub fn value_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sorted callback prop names
    pub fn callback_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Presentation component: pure function of its props
pub trait Component: Send + Sync + 'static {
    type View;

    fn render(&self, props: &Props) -> Self::View;
}

#[derive(Clone, Debug)]
enum Source {
    Factory(ViewModelFactory),
    Static(ViewModel),
}

/// Turns a component into a graph-connected component
#[derive(Clone, Debug)]
pub struct Enhancer {
    source: Source,
}

/// Enhancer that builds a fresh view model per mounted instance
pub fn with_view_model(factory: ViewModelFactory) -> Enhancer {
    Enhancer {
        source: Source::Factory(factory),
    }
}

/// Enhancer sharing one view model that ignores own props
pub fn with_static_view_model(view_model: ViewModel) -> Enhancer {
    Enhancer {
        source: Source::Static(view_model),
    }
}

impl Enhancer {
    pub fn wrap<C: Component>(&self, component: C) -> Connected<C> {
        Connected {
            source: self.source.clone(),
            component: Arc::new(component),
        }
    }

    /// Underlying factory, if this enhancer was built from one
    pub fn factory(&self) -> Option<&ViewModelFactory> {
        match &self.source {
            Source::Factory(factory) => Some(factory),
            Source::Static(_) => None,
        }
    }
}

/// Component type with its view-model source attached
pub struct Connected<C> {
    source: Source,
    component: Arc<C>,
}

impl<C: Component> Connected<C> {
    /// Create an instance: runs the factory once and subscribes every output.
    ///
    /// `own_props` must be a JSON object (use `{}` for none).
    #[instrument(skip_all)]
    pub fn mount(&self, own_props: Value) -> Result<Mounted<C>, ConnectError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ConnectError::NoRuntime)?;
        if !own_props.is_object() {
            return Err(ConnectError::InvalidOwnProps {
                found: own_props.to_string(),
            });
        }

        let own_subject = Subject::with_initial(own_props);
        let view_model = match &self.source {
            Source::Factory(factory) => factory.create(&own_subject.observable())?,
            Source::Static(view_model) => view_model.clone(),
        };

        let values: Arc<DashMap<String, Value>> = Arc::new(DashMap::new());
        let (version_tx, version_rx) = watch::channel(0_u64);
        let version_tx = Arc::new(version_tx);

        let mut tasks = Vec::new();
        for (name, observable) in view_model.outputs.into_iter().flatten() {
            let mut stream = observable.subscribe();
            let values = Arc::clone(&values);
            let version = Arc::clone(&version_tx);
            tasks.push(runtime.spawn(async move {
                while let Some(value) = stream.next().await {
                    values.insert(name.clone(), value);
                    version.send_modify(|v| *v += 1);
                }
            }));
        }

        let callbacks: FxHashMap<String, Callback> = view_model
            .inputs
            .into_iter()
            .flatten()
            .map(|(name, channel)| {
                let callback = Callback {
                    name: Arc::from(name.as_str()),
                    channel,
                };
                (name, callback)
            })
            .collect();

        debug!(
            outputs = tasks.len(),
            callbacks = callbacks.len(),
            "Component mounted"
        );

        Ok(Mounted {
            component: Arc::clone(&self.component),
            own_props: own_subject,
            values,
            callbacks,
            version_tx,
            version_rx,
            tasks,
        })
    }
}

/// Live component instance; dropping it unsubscribes everything
pub struct Mounted<C> {
    component: Arc<C>,
    own_props: Subject,
    values: Arc<DashMap<String, Value>>,
    callbacks: FxHashMap<String, Callback>,
    version_tx: Arc<watch::Sender<u64>>,
    version_rx: watch::Receiver<u64>,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: Component> Mounted<C> {
    /// Own props overlaid with the latest graph values, plus callbacks
    pub fn props(&self) -> Props {
        let mut values: FxHashMap<String, Value> = FxHashMap::default();
        if let Some(Value::Object(own)) = self.own_props.latest() {
            values.extend(own);
        }
        for entry in self.values.iter() {
            values.insert(entry.key().clone(), entry.value().clone());
        }
        Props {
            values,
            callbacks: self.callbacks.clone(),
        }
    }

    pub fn render(&self) -> C::View {
        self.component.render(&self.props())
    }

    pub fn callback(&self, name: &str) -> Option<&Callback> {
        self.callbacks.get(name)
    }

    /// Replace the instance's own props (fed to function mappings)
    pub fn set_own_props(&self, own_props: Map<String, Value>) {
        self.own_props.next(Value::Object(own_props));
        self.version_tx.send_modify(|v| *v += 1);
    }

    /// Wait for the next prop change
    pub async fn changed(&mut self) {
        // The sender lives in `self`, so this cannot fail while we are alive
        let _ = self.version_rx.changed().await;
    }

    /// Wait until `predicate` holds for the current props
    pub async fn wait_for<P>(&mut self, predicate: P, timeout: Duration) -> Result<Props, ConnectError>
    where
        P: Fn(&Props) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let props = self.props();
            if predicate(&props) {
                return Ok(props);
            }
            tokio::time::timeout_at(deadline, self.version_rx.changed())
                .await
                .map_err(|_| ConnectError::Timeout(timeout))?
                .map_err(|_| ConnectError::Timeout(timeout))?;
        }
    }
}

impl<C> Drop for Mounted<C> {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Observable, SignalGraph, SignalGraphBuilder};
    use crate::mapping::{ObservableMap, SubjectMap};
    use serde_json::json;

    struct Echo;

    impl Component for Echo {
        type View = String;

        fn render(&self, props: &Props) -> String {
            props.str("text").unwrap_or("-").to_string()
        }
    }

    const WAIT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn static_view_model_feeds_props_and_callbacks() {
        let text = Subject::with_initial(json!("hi"));
        let mut outputs = ObservableMap::default();
        outputs.insert("text".to_string(), text.observable());
        let mut inputs = SubjectMap::default();
        inputs.insert("onText".to_string(), text.clone());

        let connected = with_static_view_model(ViewModel {
            outputs: Some(outputs),
            inputs: Some(inputs),
        })
        .wrap(Echo);
        let mut mounted = connected.mount(json!({})).unwrap();

        mounted
            .wait_for(|p| p.str("text") == Some("hi"), WAIT)
            .await
            .unwrap();
        assert_eq!(mounted.render(), "hi");

        mounted.callback("onText").unwrap().call(json!("bye"));
        mounted
            .wait_for(|p| p.str("text") == Some("bye"), WAIT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn graph_values_override_own_props() {
        let connected = with_static_view_model(ViewModel {
            outputs: Some(
                [("text".to_string(), Observable::just(json!("graph")))]
                    .into_iter()
                    .collect(),
            ),
            inputs: None,
        })
        .wrap(Echo);
        let mut mounted = connected
            .mount(json!({"text": "own", "extra": 1}))
            .unwrap();

        let props = mounted
            .wait_for(|p| p.str("text") == Some("graph"), WAIT)
            .await
            .unwrap();
        assert_eq!(props.get("extra"), Some(&json!(1)));
        assert!(props.callback_names().is_empty());
    }

    #[tokio::test]
    async fn own_props_must_be_an_object() {
        let connected = with_static_view_model(ViewModel::default()).wrap(Echo);
        let err = connected.mount(json!("nope")).err().unwrap();
        assert!(matches!(err, ConnectError::InvalidOwnProps { .. }));
    }

    #[tokio::test]
    async fn wait_for_times_out() {
        let connected = with_static_view_model(ViewModel::default()).wrap(Echo);
        let mut mounted = connected.mount(json!({})).unwrap();
        let err = mounted
            .wait_for(|p| p.get("never").is_some(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectError::Timeout(_)));
    }

    #[tokio::test]
    async fn unmount_releases_subscriptions() {
        let graph = SignalGraphBuilder::new().add_primary("x$").build().unwrap();
        let source = graph.input("x$").unwrap();
        let connected = with_static_view_model(ViewModel {
            outputs: Some(
                [("x".to_string(), graph.output("x$").unwrap())]
                    .into_iter()
                    .collect(),
            ),
            inputs: None,
        })
        .wrap(Echo);

        let mounted = connected.mount(json!({})).unwrap();
        assert_eq!(source.subscriber_count(), 1);

        drop(mounted);
        // Aborted tasks drop their receivers once the runtime reaps them
        for _ in 0..10 {
            if source.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn mount_requires_runtime() {
        let connected = with_static_view_model(ViewModel::default()).wrap(Echo);
        assert!(matches!(
            connected.mount(json!({})).err(),
            Some(ConnectError::NoRuntime)
        ));
    }
}
