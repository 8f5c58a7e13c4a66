//! sigconn CLI - check binding files and run the login demo

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use futures::StreamExt;
use serde_json::{json, Value};

use signal_connect::demo::{
    self, LoginApi, LoginForm, MockApi, ProtectedArea, CORRECT_PASSWORD, CORRECT_USERNAME,
    DEMO_GRAPHS,
};
use signal_connect::{
    connect, view_model_factory, BindingFile, ConnectError, FixSuggestion, InputMapping,
    Observable, OutputMapping, SignalGraph,
};

#[derive(Parser)]
#[command(name = "sigconn")]
#[command(about = "Bind named reactive signal graphs to component props")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a binding file against its demo graph
    Check {
        /// Path to a bindings .yaml file
        file: String,
    },

    /// Run the login demo end to end
    Demo {
        #[arg(short, long, default_value = CORRECT_USERNAME)]
        username: String,

        #[arg(short, long, default_value = CORRECT_PASSWORD)]
        password: String,

        /// Bindings file for the login form (graph: login)
        #[arg(short, long)]
        bindings: Option<String>,

        /// How long to wait for the login to settle
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { file } => check_bindings(&file),
        Commands::Demo {
            username,
            password,
            bindings,
            timeout_ms,
        } => run_demo(&username, &password, bindings.as_deref(), timeout_ms).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn list(names: &[&str]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

fn check_bindings(file: &str) -> Result<(), ConnectError> {
    let bindings = BindingFile::from_path(file)?;
    if !DEMO_GRAPHS.contains(&bindings.graph.as_str()) {
        return Err(ConnectError::UnknownGraph {
            name: bindings.graph.clone(),
        });
    }

    // Runs inside the tokio runtime: graph building spawns the derived signals
    let api: Arc<dyn LoginApi> = Arc::new(MockApi::new());
    let graph = demo::demo_graph(&bindings.graph, api)?;

    let factory = view_model_factory(
        &graph,
        bindings.output_mapping()?,
        bindings.input_mapping()?,
    )?;
    let view_model = factory.create(&Observable::just(json!({})))?;

    println!("{} Bindings '{}' are valid", "✓".green(), file);
    println!("  Graph: {}", bindings.graph);
    println!("  Strategy: {}", factory.strategy());
    println!("  Props: {}", list(&view_model.output_names()));
    println!("  Callbacks: {}", list(&view_model.input_names()));
    Ok(())
}

async fn run_demo(
    username: &str,
    password: &str,
    bindings: Option<&str>,
    timeout_ms: u64,
) -> Result<(), ConnectError> {
    let timeout = Duration::from_millis(timeout_ms);
    let api: Arc<dyn LoginApi> = Arc::new(MockApi::new());

    let login = demo::login_graph(Arc::clone(&api))?;
    let resource = demo::auth_resource_graph(api)?;
    resource.connect("authStatus$", &login, "authStatus$")?;

    let (outputs, inputs): (OutputMapping, InputMapping) = match bindings {
        Some(path) => {
            let file = BindingFile::from_path(path)?;
            if file.graph != "login" {
                return Err(ConnectError::UnknownGraph { name: file.graph });
            }
            (file.output_mapping()?, file.input_mapping()?)
        }
        None => (demo::login_form_outputs(), demo::login_form_inputs()),
    };

    let mut form = connect(&login, outputs, inputs)?
        .wrap(LoginForm)
        .mount(json!({}))?;
    let mut area = connect(&resource, demo::protected_area_outputs(), ())?
        .wrap(ProtectedArea)
        .mount(json!({}))?;

    println!("{}", "Before login:".cyan().bold());
    println!("{}", area.render());

    // Subscribe before submitting so the response cannot be missed
    let mut responses = login.output("loginResponses$")?.subscribe();
    for (callback, value) in [
        ("usernameChanged", json!(username)),
        ("passwordChanged", json!(password)),
        ("submitButton", Value::Null),
    ] {
        if let Some(cb) = form.callback(callback) {
            cb.call(value);
        }
    }

    let response = tokio::time::timeout(timeout, responses.next())
        .await
        .map_err(|_| ConnectError::Timeout(timeout))?
        .unwrap_or(Value::Null);
    let authorized = response["status"] == "success";

    form.wait_for(
        |p| {
            p.bool("loginInProgress") == Some(false)
                && p.str("username") == Some(username)
                && (authorized || p.str("loginFailureMessage").is_some_and(|m| !m.is_empty()))
        },
        timeout,
    )
    .await?;

    println!("{}", "Login form:".cyan().bold());
    println!("{}", form.render());

    if authorized {
        area.wait_for(
            |p| {
                p.get("authStatus").is_some_and(|s| s["status"] == "authorized")
                    && p.str("protectedResource").is_some_and(|r| !r.is_empty())
            },
            timeout,
        )
        .await?;
    }

    println!("{}", "Protected area:".cyan().bold());
    println!("{}", area.render());
    Ok(())
}
