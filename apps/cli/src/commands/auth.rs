//! Authentication commands.

use crate::app::App;
use crate::output::{self, OutputFormat};
use crate::prompt::run_login;
use anyhow::{bail, Result};
use serde_json::json;
use swift_auth::LoginForm;

/// Log in without waiting for a storage call to need it.
pub async fn login(app: &App, format: &OutputFormat) -> Result<()> {
    if let Some(session) = app.coordinator.session() {
        output::print_success(
            &format!("Already logged in to {}", session.storage_endpoint),
            format,
        );
        return Ok(());
    }

    let form = LoginForm {
        auth_url: app.auth_url.clone(),
        pending_requests: 0,
    };
    if !run_login(&app.coordinator, &app.credentials, form).await {
        bail!("Login failed");
    }

    match app.coordinator.session() {
        Some(session) => output::print_success(
            &format!("Logged in, storage endpoint {}", session.storage_endpoint),
            format,
        ),
        None => output::print_success("Logged in", format),
    }
    Ok(())
}

/// Drop the in-memory session.
pub fn logout(app: &App, format: &OutputFormat) -> Result<()> {
    app.coordinator.logout()?;
    output::print_success("Logged out", format);
    Ok(())
}

/// Show the auth state and session endpoint.
pub fn status(app: &App, format: &OutputFormat) -> Result<()> {
    let state = app.coordinator.state();
    let session = app.coordinator.session();
    let pending = app.coordinator.pending_requests();

    match format {
        OutputFormat::Json => output::print_json(&json!({
            "state": state,
            "auth_url": app.auth_url,
            "protocol": app.credentials.protocol,
            "storage_endpoint": session.as_ref().map(|s| s.storage_endpoint.to_string()),
            "pending_requests": pending,
        }))?,
        OutputFormat::Text => {
            output::print_heading("Auth status");
            output::print_row("State", &format!("{state:?}"));
            output::print_row("Auth URL", &app.auth_url);
            output::print_row("Protocol", &format!("{:?}", app.credentials.protocol));
            output::print_row(
                "Storage endpoint",
                &session
                    .map(|s| s.storage_endpoint.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
            output::print_row("Pending requests", &pending.to_string());
        }
    }
    Ok(())
}
