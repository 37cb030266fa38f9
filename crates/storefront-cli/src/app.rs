//! Application state: configuration, credential store, API client and the
//! session gate shared by every command.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use storefront_core::auth::{LoginFlow, SessionGate};
use storefront_core::routes;
use storefront_core::{Admission, ApiClient, Config, TokenStore, Verdict};
use tracing::{debug, info, warn};

/// Environment variables consulted before prompting
const USERNAME_ENV: &str = "STOREFRONT_USERNAME";
const PASSWORD_ENV: &str = "STOREFRONT_PASSWORD";

pub struct App {
    pub config: Config,
    pub api: ApiClient,
    gate: Arc<SessionGate>,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let store: Arc<dyn TokenStore> = config
            .open_token_store()
            .context("Failed to open token store")?;
        let base_url = config.api_base_url();
        debug!(%base_url, backend = ?config.token_backend, "App configured");

        let api = ApiClient::new(&base_url, Arc::clone(&store))?;
        let gate = SessionGate::new(store, Arc::new(api.clone()))
            .with_refresh_timeout(config.refresh_timeout());

        Ok(Self {
            config,
            api,
            gate: Arc::new(gate),
        })
    }

    fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(self.api.clone())
            .clear_on_failure(self.config.clear_credentials_on_failed_login)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Navigate to `route`. Public routes are admitted immediately;
    /// protected ones go through the session gate, and a denial sends the
    /// user to the login view. Returns whether the route may be shown.
    pub async fn navigate(&mut self, route: &str) -> Result<bool> {
        if !routes::is_protected(route) {
            return Ok(true);
        }

        let mut activation = self.gate.activate();
        debug!(route, admission = ?activation.admission(), "Checking session");
        activation.resolved().await;

        match activation.admission() {
            Admission::Content => Ok(true),
            Admission::Redirect(nav) => {
                debug!(route, to = %nav.path, replace = nav.replace, "Redirecting");
                eprintln!("Please log in to continue.");
                self.show_login(None).await
            }
            // resolved() never leaves the verdict unknown
            Admission::Loading => Ok(false),
        }
    }

    /// The login view: prompt for credentials and submit them once.
    /// Returns whether the user ended up logged in.
    pub async fn show_login(&mut self, username: Option<String>) -> Result<bool> {
        let username = match username.or_else(|| std::env::var(USERNAME_ENV).ok()) {
            Some(u) => u,
            None => self.prompt_username()?,
        };
        let password = match std::env::var(PASSWORD_ENV) {
            Ok(p) => p,
            Err(_) => rpassword::prompt_password("Password: ")?,
        };

        match self.login_flow().login(&username, &password).await {
            Ok(nav) => {
                self.remember_username(&username);
                info!(to = %nav.path, "Login navigated");
                eprintln!("Login successful.");
                Ok(true)
            }
            Err(e) => {
                eprintln!("{}", e.user_message());
                Ok(false)
            }
        }
    }

    pub fn logout(&self) {
        self.login_flow().logout();
    }

    /// Evaluate the session without prompting
    pub async fn session_status(&self) -> (bool, Verdict) {
        let logged_in = self.login_flow().is_logged_in();
        let verdict = self.gate.activate().resolved().await;
        (logged_in, verdict)
    }

    fn prompt_username(&self) -> Result<String> {
        match self.config.last_username {
            Some(ref last) => print!("Username [{}]: ", last),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        match (&self.config.last_username, input.is_empty()) {
            (Some(last), true) => Ok(last.clone()),
            _ => Ok(input.to_string()),
        }
    }

    fn remember_username(&mut self, username: &str) {
        self.config.last_username = Some(username.trim().to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}
