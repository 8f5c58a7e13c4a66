//! Integration tests for connect (v0.1)
//!
//! Exercises the public binding path end to end:
//! - every output/input shape combination yields the same props
//! - absent mappings contribute nothing
//! - tables expose exactly their destination names
//! - function mappings react to own-props changes of a mounted instance

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use signal_connect::demo::{self, MockApi, ProtectedArea};
use signal_connect::{
    connect, view_model_factory, Component, ConnectError, Graph, InputMapping, Observable,
    ObservableMap, OutputMapping, Props, Side, SignalGraph, SignalGraphBuilder, Strategy,
    SubjectMap,
};

const WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// TEST HELPERS
// ============================================================================

/// `x$` and `y$` writable, `sum$` derived
fn xy_graph() -> Graph {
    SignalGraphBuilder::new()
        .add_primary("x$")
        .add_primary("y$")
        .add_derived("sum$", &["x$", "y$"], |deps| {
            Ok(deps.signal("x$")?.combine_latest(&deps.signal("y$")?, |x, y| {
                json!(x.as_i64().unwrap_or(0) + y.as_i64().unwrap_or(0))
            }))
        })
        .initialize_with([("x$", json!(1)), ("y$", json!(2))])
        .build()
        .unwrap()
}

/// Renders every value prop as `name=value`, sorted
struct Dump;

impl Component for Dump {
    type View = String;

    fn render(&self, props: &Props) -> String {
        props
            .value_names()
            .iter()
            .map(|name| format!("{name}={}", props.get(name).unwrap_or(&Value::Null)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn output_table() -> OutputMapping {
    OutputMapping::table([("a", "x$"), ("b", "sum$")])
}

fn output_function() -> OutputMapping {
    OutputMapping::function(|outputs, _own_props| {
        let mut map = ObservableMap::default();
        map.insert("a".to_string(), outputs.get("x$")?);
        map.insert("b".to_string(), outputs.get("sum$")?);
        Ok(map)
    })
}

fn input_table() -> InputMapping {
    InputMapping::table([("setX", "x$")])
}

fn input_function() -> InputMapping {
    InputMapping::function(|inputs, _own_props| {
        let mut map = SubjectMap::default();
        map.insert("setX".to_string(), inputs.get("x$")?);
        Ok(map)
    })
}

async fn first_value(observable: &Observable) -> Value {
    use futures::StreamExt;
    tokio::time::timeout(WAIT, observable.subscribe().next())
        .await
        .unwrap()
        .unwrap()
}

// ============================================================================
// SHAPE COMBINATIONS
// ============================================================================

#[tokio::test]
async fn test_every_shape_combination_yields_same_props() {
    let combinations = [
        (output_function(), input_function(), Strategy::PassThrough),
        (output_table(), input_function(), Strategy::AdaptOutputs),
        (output_function(), input_table(), Strategy::AdaptInputs),
        (output_table(), input_table(), Strategy::AdaptBoth),
    ];

    for (outputs, inputs, expected) in combinations {
        let graph = xy_graph();
        let factory = view_model_factory(&graph, outputs, inputs).unwrap();
        assert_eq!(factory.strategy(), expected);

        let view_model = factory.create(&Observable::just(json!({}))).unwrap();
        assert_eq!(view_model.output_names(), ["a", "b"]);
        assert_eq!(view_model.input_names(), ["setX"]);

        let props = view_model.outputs.as_ref().unwrap();
        assert_eq!(first_value(&props["a"]).await, json!(1));
        assert_eq!(first_value(&props["b"]).await, json!(3));

        // The callback channel is the graph's own input
        let set_x = &view_model.inputs.as_ref().unwrap()["setX"];
        set_x.next(json!(10));
        assert_eq!(graph.latest("x$"), Some(json!(10)));
    }
}

#[tokio::test]
async fn test_mounted_instances_render_identically_across_shapes() {
    let mut views = Vec::new();
    for (outputs, inputs) in [
        (output_function(), input_function()),
        (output_table(), input_table()),
    ] {
        let graph = xy_graph();
        let mut mounted = connect(&graph, outputs, inputs)
            .unwrap()
            .wrap(Dump)
            .mount(json!({}))
            .unwrap();

        mounted.callback("setX").unwrap().call(json!(5));
        mounted
            .wait_for(
                |p| p.get("a") == Some(&json!(5)) && p.get("b") == Some(&json!(7)),
                WAIT,
            )
            .await
            .unwrap();
        views.push(mounted.render());
    }
    assert_eq!(views[0], "a=5 b=7");
    assert_eq!(views[0], views[1]);
}

// ============================================================================
// ABSENT AND TABLE MAPPINGS
// ============================================================================

#[tokio::test]
async fn test_omitted_input_mapping_gives_no_callbacks() {
    let graph = xy_graph();
    let factory = view_model_factory(&graph, output_table(), ()).unwrap();
    assert_eq!(factory.strategy(), Strategy::PassThrough);

    let view_model = factory.create(&Observable::just(json!({}))).unwrap();
    assert!(view_model.inputs.is_none());

    let mut mounted = connect(&graph, output_table(), ())
        .unwrap()
        .wrap(Dump)
        .mount(json!({}))
        .unwrap();
    let props = mounted
        .wait_for(|p| p.get("a").is_some() && p.get("b").is_some(), WAIT)
        .await
        .unwrap();
    assert!(props.callback_names().is_empty());
    assert!(mounted.callback("setX").is_none());
}

#[tokio::test]
async fn test_both_mappings_absent() {
    let graph = xy_graph();
    let mut mounted = connect(&graph, (), ())
        .unwrap()
        .wrap(Dump)
        .mount(json!({"title": "own"}))
        .unwrap();

    let props = mounted.wait_for(|_| true, WAIT).await.unwrap();
    assert_eq!(props.value_names(), ["title"]);
    assert!(props.callback_names().is_empty());
}

#[tokio::test]
async fn test_table_exposes_exactly_its_destinations() {
    let graph = xy_graph();
    let factory = view_model_factory(
        &graph,
        OutputMapping::table([("a", "x$"), ("b", "y$")]),
        (),
    )
    .unwrap();
    let view_model = factory.create(&Observable::just(json!({}))).unwrap();
    assert_eq!(view_model.output_names(), ["a", "b"]);

    let props = view_model.outputs.unwrap();
    assert_eq!(first_value(&props["a"]).await, json!(1));
    assert_eq!(first_value(&props["b"]).await, json!(2));
}

#[tokio::test]
async fn test_unknown_table_names_fail_at_connect() {
    let graph = xy_graph();
    let err = connect(
        &graph,
        OutputMapping::table([("a", "x$"), ("b", "nope$"), ("c", "alsoNope$")]),
        (),
    )
    .err()
    .unwrap();

    match &err {
        ConnectError::UnknownNames { side, names } => {
            assert_eq!(*side, Side::Outputs);
            assert_eq!(names, &["alsoNope$".to_string(), "nope$".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("SC-020"));
}

#[tokio::test]
async fn test_input_table_rejects_derived_signal() {
    let graph = xy_graph();
    let err = connect(&graph, (), InputMapping::table([("setSum", "sum$")]))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ConnectError::UnknownNames {
            side: Side::Inputs,
            ..
        }
    ));
}

#[tokio::test]
async fn test_function_mapping_errors_surface_at_mount() {
    let graph = xy_graph();
    let enhancer = connect(
        &graph,
        OutputMapping::function(|outputs, _own_props| {
            let mut map = ObservableMap::default();
            map.insert("z".to_string(), outputs.get("missing$")?);
            Ok(map)
        }),
        (),
    )
    .unwrap();

    let err = enhancer.wrap(Dump).mount(json!({})).err().unwrap();
    assert!(matches!(err, ConnectError::UnknownSignal { .. }));
}

// ============================================================================
// OWN PROPS
// ============================================================================

#[tokio::test]
async fn test_own_props_override_reaches_function_mapping() {
    let api = Arc::new(MockApi::new());
    let resource = demo::auth_resource_graph(api).unwrap();
    resource
        .input("authStatus$")
        .unwrap()
        .next(json!({"status": "unauthorized"}));

    let mut area = connect(&resource, demo::protected_area_outputs(), ())
        .unwrap()
        .wrap(ProtectedArea)
        .mount(json!({}))
        .unwrap();
    area.wait_for(|p| p.get("authStatus").is_some(), WAIT)
        .await
        .unwrap();
    assert_eq!(area.render(), "Not authorized");

    let mut own = Map::new();
    own.insert("override".to_string(), json!(true));
    area.set_own_props(own);

    let props = area
        .wait_for(
            |p| p.get("authStatus") == Some(&json!({"status": "authorized", "token": "override"})),
            WAIT,
        )
        .await
        .unwrap();
    assert_eq!(props.get("override"), Some(&json!(true)));
}

#[tokio::test]
async fn test_each_instance_gets_its_own_view_model() {
    let api = Arc::new(MockApi::new());
    let resource = demo::auth_resource_graph(api).unwrap();
    resource
        .input("authStatus$")
        .unwrap()
        .next(json!({"status": "unauthorized"}));

    let enhancer = connect(&resource, demo::protected_area_outputs(), ()).unwrap();
    let mut overridden = enhancer
        .wrap(ProtectedArea)
        .mount(json!({"override": true}))
        .unwrap();
    let mut plain = enhancer.wrap(ProtectedArea).mount(json!({})).unwrap();

    overridden
        .wait_for(
            |p| p.get("authStatus").and_then(|s| s.get("token")) == Some(&json!("override")),
            WAIT,
        )
        .await
        .unwrap();
    plain
        .wait_for(|p| p.get("authStatus") == Some(&json!({"status": "unauthorized"})), WAIT)
        .await
        .unwrap();
}
