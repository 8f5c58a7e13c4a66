//! Presentation components and their bindings

use serde_json::{json, Value};

use crate::component::{Component, Props};
use crate::mapping::{InputMapping, ObservableMap, OutputMapping};

/// Username/password form with a submit button
pub struct LoginForm;

impl Component for LoginForm {
    type View = String;

    fn render(&self, props: &Props) -> String {
        let disabled = if props.bool("loginInProgress").unwrap_or(false) {
            " (disabled)"
        } else {
            ""
        };
        format!(
            "User name: [{}]{disabled}\nPassword: [{}]{disabled}\n{}\n<Submit>{disabled}",
            props.str("username").unwrap_or_default(),
            props.str("password").unwrap_or_default(),
            props.str("loginFailureMessage").unwrap_or_default(),
        )
    }
}

/// Shows the protected resource once authorized
pub struct ProtectedArea;

impl Component for ProtectedArea {
    type View = String;

    fn render(&self, props: &Props) -> String {
        let authorized = props
            .get("authStatus")
            .and_then(|s| s.get("status"))
            .and_then(Value::as_str)
            == Some("authorized");
        if authorized {
            props.str("protectedResource").unwrap_or_default().to_string()
        } else {
            "Not authorized".to_string()
        }
    }
}

/// Login graph outputs used by [`LoginForm`]
pub fn login_form_outputs() -> OutputMapping {
    OutputMapping::table([
        ("loginInProgress", "loginInProgress$"),
        ("loginFailureMessage", "loginFailureMessage$"),
        ("username", "username$"),
        ("password", "password$"),
    ])
}

/// Login graph inputs driven by [`LoginForm`]
pub fn login_form_inputs() -> InputMapping {
    InputMapping::table([
        ("usernameChanged", "username$"),
        ("passwordChanged", "password$"),
        ("submitButton", "submitButton$"),
    ])
}

/// Auth-resource outputs for [`ProtectedArea`].
///
/// Setting the own prop `override: true` shows the area as authorized
/// regardless of the graph's `authStatus$`.
pub fn protected_area_outputs() -> OutputMapping {
    OutputMapping::function(|outputs, own_props| {
        let auth_status = own_props.combine_latest(&outputs.get("authStatus$")?, |own, status| {
            if own.get("override").and_then(Value::as_bool) == Some(true) {
                json!({"status": "authorized", "token": "override"})
            } else {
                status.clone()
            }
        });

        let mut map = ObservableMap::default();
        map.insert("authStatus".to_string(), auth_status);
        map.insert("protectedResource".to_string(), outputs.get("protected$")?);
        Ok(map)
    })
}
