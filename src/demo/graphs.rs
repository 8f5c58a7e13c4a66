//! Login and protected-resource graphs

use std::sync::Arc;

use futures::{future, stream, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use super::api::{AuthStatus, LoginApi, LoginResponse};
use crate::error::ConnectError;
use crate::graph::{boxed, Graph, SignalGraphBuilder};

/// Names accepted by [`demo_graph`]
pub const DEMO_GRAPHS: &[&str] = &["login", "auth-resource"];

fn status_is(value: &Value, status: &str) -> bool {
    value.get("status").and_then(Value::as_str) == Some(status)
}

/// `loginEvents$` item for a finished request
fn finished_event<T: Serialize>(response: &T) -> Result<Value, ConnectError> {
    Ok(json!({"event": "finished", "response": serde_json::to_value(response)?}))
}

/// Login form graph.
///
/// Primary: `username$`, `password$`, `submitButton$`.
/// Derived: `loginAttempts$`, `loginEvents$`, `loginResponses$`,
/// `loginInProgress$`, `loginSuccesses$`, `loginFailures$`,
/// `loginFailureMessage$`, `authStatus$`.
///
/// `loginEvents$` emits `started` then `finished` for every attempt, with
/// requests running concurrently. Progress and failure message are both read
/// from it, so each reflects its events in order.
pub fn login_graph(api: Arc<dyn LoginApi>) -> Result<Graph, ConnectError> {
    SignalGraphBuilder::new()
        .add_primary("username$")
        .add_primary("password$")
        .add_primary("submitButton$")
        .add_dependency("api", api)
        .add_derived(
            "loginAttempts$",
            &["submitButton$", "username$", "password$"],
            |deps| {
                Ok(deps
                    .signal("submitButton$")?
                    .with_latest_from(&[deps.signal("username$")?, deps.signal("password$")?]))
            },
        )
        .add_derived("loginEvents$", &["loginAttempts$", "api"], |deps| {
            let api: Arc<dyn LoginApi> = deps.dependency("api")?;
            Ok(deps.signal("loginAttempts$")?.flat_map(move |attempt| {
                let api = Arc::clone(&api);
                let started = stream::once(future::ready(json!({"event": "started"})));
                let finished = stream::once(async move {
                    let username = attempt[1].as_str().unwrap_or_default().to_string();
                    let password = attempt[2].as_str().unwrap_or_default().to_string();
                    let response: LoginResponse = api.login(&username, &password).await;
                    finished_event(&response).unwrap_or_else(|err| {
                        warn!(error = %err, "Dropping login response");
                        json!({"event": "finished", "response": null})
                    })
                });
                started.chain(finished).boxed()
            }))
        })
        .add_derived("loginResponses$", &["loginEvents$"], |deps| {
            Ok(deps.signal("loginEvents$")?.filter_map(|event| {
                let response = event.get("response")?;
                response.is_object().then(|| response.clone())
            }))
        })
        .add_derived("loginInProgress$", &["loginEvents$"], |deps| {
            Ok(deps
                .signal("loginEvents$")?
                .map(|event| json!(event["event"] == "started")))
        })
        .add_derived("loginSuccesses$", &["loginResponses$"], |deps| {
            Ok(deps
                .signal("loginResponses$")?
                .filter_map(|r| status_is(&r, "success").then_some(r)))
        })
        .add_derived("loginFailures$", &["loginResponses$"], |deps| {
            Ok(deps
                .signal("loginResponses$")?
                .filter_map(|r| status_is(&r, "failure").then_some(r)))
        })
        .add_derived("loginFailureMessage$", &["loginEvents$"], |deps| {
            // Cleared when an attempt starts, set when it fails
            Ok(deps.signal("loginEvents$")?.filter_map(|event| {
                if event["event"] == "started" {
                    return Some(json!(""));
                }
                let response = &event["response"];
                status_is(response, "failure").then(|| response["error"]["message"].clone())
            }))
        })
        .add_derived("authStatus$", &["loginSuccesses$"], |deps| {
            Ok(deps.signal("loginSuccesses$")?.filter_map(|success| {
                let token = success["data"]["userToken"].as_str()?.to_string();
                serde_json::to_value(AuthStatus::Authorized { token }).ok()
            }))
        })
        .initialize_with([
            ("loginInProgress$", json!(false)),
            ("loginFailureMessage$", json!("")),
            ("username$", json!("")),
            ("password$", json!("")),
            ("authStatus$", json!({"status": "unauthorized"})),
        ])
        .build()
}

/// Protected-resource graph.
///
/// Primary: `authStatus$` (normally fed from the login graph).
/// Derived: `userToken$`, `protected$`.
pub fn auth_resource_graph(api: Arc<dyn LoginApi>) -> Result<Graph, ConnectError> {
    SignalGraphBuilder::new()
        .add_primary("authStatus$")
        .add_derived("userToken$", &["authStatus$"], |deps| {
            Ok(deps.signal("authStatus$")?.filter_map(|status| {
                if status_is(&status, "authorized") {
                    Some(status["token"].clone())
                } else {
                    None
                }
            }))
        })
        .add_dependency("api", api)
        .add_derived("protected$", &["userToken$", "api"], |deps| {
            let api: Arc<dyn LoginApi> = deps.dependency("api")?;
            Ok(deps.signal("userToken$")?.then(move |token| {
                let api = Arc::clone(&api);
                boxed(async move {
                    let token = token.as_str().unwrap_or_default().to_string();
                    Value::String(api.protected_resource(&token).await)
                })
            }))
        })
        .initialize_with([("protected$", json!(""))])
        .build()
}

/// Build a demo graph by name (see [`DEMO_GRAPHS`]).
///
/// `auth-resource` is linked to a private login graph, so its `authStatus$`
/// starts out unauthorized.
pub fn demo_graph(name: &str, api: Arc<dyn LoginApi>) -> Result<Graph, ConnectError> {
    match name {
        "login" => login_graph(api),
        "auth-resource" => {
            let login = login_graph(Arc::clone(&api))?;
            let resource = auth_resource_graph(api)?;
            resource.connect("authStatus$", &login, "authStatus$")?;
            Ok(resource)
        }
        other => Err(ConnectError::UnknownGraph {
            name: other.to_string(),
        }),
    }
}
