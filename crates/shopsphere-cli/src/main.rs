//! Shop Sphere CLI - a command-line page layer over the storefront session core.
//!
//! Logs in, shows the session, and issues authenticated requests against the
//! storefront backend. The session persists between invocations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shopsphere_core::{
    AlertEvent, ClientContext, Config, Credentials, RegistrationForm, Severity,
};

#[derive(Parser)]
#[command(name = "shopsphere", version, about = "Shop Sphere storefront client")]
struct Cli {
    /// Backend base URL (overrides config and SHOPSPHERE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Revoke the current token and clear the session
    Logout,
    /// Show the current session
    Status,
    /// Fetch and cache the current user's profile
    Profile,
    /// Authenticated GET request, printing the JSON response
    Get { path: String },
    /// Authenticated POST request with a JSON body
    Post { path: String, body: String },
    /// Create a new account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

fn load_config(api_url: Option<String>) -> Config {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if let Some(url) = api_url.or_else(|| std::env::var("SHOPSPHERE_API_URL").ok()) {
        config.api_base_url = url;
    }
    config
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;

    let config = load_config(cli.api_url);
    let ctx = ClientContext::open(config).context("Failed to initialize session")?;

    // Alerts are the page layer's concern; here they go to stderr as they are raised.
    let _alerts = ctx.notifications().subscribe(|event| {
        if let AlertEvent::Raised(alert) = event {
            let tag = match alert.severity {
                Severity::Info => "info",
                Severity::Success => "ok",
                Severity::Error => "error",
            };
            eprintln!("[{}] {}", tag, alert.message);
        }
    });

    match cli.command {
        Command::Login { email } => login(&ctx, email).await,
        Command::Logout => {
            ctx.logout().await;
            Ok(())
        }
        Command::Status => {
            status(&ctx);
            Ok(())
        }
        Command::Profile => {
            let profile = ctx.load_profile().await?;
            println!("{} <{}>", profile.display_name(), profile.email);
            if let Some(image) = profile.image {
                println!("image: {}", image);
            }
            Ok(())
        }
        Command::Get { path } => {
            let gateway = ctx.gateway();
            match gateway.get(&path).await {
                Ok(value) => print_json(&value),
                Err(e) => {
                    ctx.handle_api_error(&gateway, &e);
                    Err(e.into())
                }
            }
        }
        Command::Post { path, body } => {
            let body: Value = serde_json::from_str(&body).context("Request body is not valid JSON")?;
            let gateway = ctx.gateway();
            match gateway.post(&path, &body).await {
                Ok(value) => print_json(&value),
                Err(e) => {
                    ctx.handle_api_error(&gateway, &e);
                    Err(e.into())
                }
            }
        }
        Command::Signup {
            email,
            name,
            surname,
        } => {
            let password = rpassword::prompt_password("Password: ")?;
            ctx.auth()
                .register(RegistrationForm::new(email, name, surname, password))
                .await?;
            Ok(())
        }
    }
}

async fn login(ctx: &ClientContext, email: Option<String>) -> Result<()> {
    let email = match email
        .or_else(|| std::env::var("SHOPSPHERE_EMAIL").ok())
        .or_else(|| ctx.config().last_email.clone())
    {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match std::env::var("SHOPSPHERE_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    if email.is_empty() || password.is_empty() {
        return Err(anyhow::anyhow!("Email and password required"));
    }

    match ctx.auth().login(Credentials::new(email.clone(), password)).await {
        Ok(_) => {
            if let Err(e) = Config::remember_email(&email) {
                warn!(error = %e, "Failed to save config");
            }
            info!("Login successful");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn status(ctx: &ClientContext) {
    let state = ctx.store().state();
    println!("backend: {}", ctx.gateway().base_url());
    println!("status:  {}", state.status);
    if state.is_authenticated() {
        println!("token:   present");
    } else {
        println!("token:   none");
    }
    if let Some(profile) = state.trusted_profile() {
        println!("user:    {} <{}>", profile.display_name(), profile.email);
    }
}
