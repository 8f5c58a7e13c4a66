//! Demo login system
//!
//! Ships the login and protected-resource graphs, a mock API and two
//! presentation components. Used by the `sigconn demo` command and by the
//! integration tests.
//!
//! ```text
//! login:          username$, password$, submitButton$
//!                   → loginAttempts$ → loginResponses$
//!                   → loginSuccesses$ → authStatus$ ──┐
//!                   → loginFailures$ → loginFailureMessage$
//!                                                     │ Graph::connect
//! auth-resource:  authStatus$ ◄───────────────────────┘
//!                   → userToken$ → protected$
//! ```

mod api;
mod graphs;
mod views;

pub use api::{
    AuthStatus, LoginApi, LoginResponse, MockApi, AUTH_RESOURCE, CORRECT_PASSWORD,
    CORRECT_USERNAME, LOGIN_FAILURE, NOT_AUTHORIZED, USER_TOKEN,
};
pub use graphs::{auth_resource_graph, demo_graph, login_graph, DEMO_GRAPHS};
pub use views::{
    login_form_inputs, login_form_outputs, protected_area_outputs, LoginForm, ProtectedArea,
};
