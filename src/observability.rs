//! Subscriber setup and the structured events the dashboard emits.
//!
//! Every event carries `component` and `event` fields so JSON output can be
//! filtered per page. Controllers and routes log through the helpers here
//! instead of spelling event names inline.

use std::fmt::Display;
use std::net::SocketAddr;

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_ansi(config.format == LogFormat::Pretty);

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }
    Ok(())
}

pub fn log_app_start(config: &LoggingConfig) {
    info!(
        component = "dashboard_server",
        event = "app.start",
        log_level = %config.level,
        log_format = ?config.format,
        include_target = config.include_target
    );
}

pub fn log_app_bind(bound_addr: SocketAddr) {
    info!(
        component = "dashboard_server",
        event = "app.bind",
        bind_addr = %bound_addr,
        route = "/dashboard"
    );
}

pub fn log_upstream_selected(base_url: &str, retries: u32, timeout_ms: u64) {
    info!(
        component = "dashboard_server",
        event = "upstream.selected",
        base_url,
        retries,
        timeout_ms
    );
}

pub fn log_dashboard_request(route: &'static str) {
    info!(component = "dashboard", event = "http.dashboard.request", route);
}

/// A page section that could not be loaded. The rest of the page still renders.
pub fn log_section_failure(component: &'static str, section: &'static str, err: &dyn Display) {
    warn!(
        component,
        event = "section.load.failed",
        section,
        error = %err
    );
}

pub fn log_export_failed(err: &dyn Display) {
    warn!(component = "dashboard", event = "export.failed", error = %err);
}

/// Operator actions that change data upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    Submit,
    Approve,
    Reject,
    CreateUser,
    ChangeProfile,
    UpdateEmails,
    SaveRule,
    DeleteRule,
    Sync,
}

impl DashboardAction {
    pub fn component(self) -> &'static str {
        match self {
            Self::Submit => "board",
            Self::Approve | Self::Reject => "approval",
            _ => "settings",
        }
    }

    pub fn event(self) -> &'static str {
        match self {
            Self::Submit => "board.submit",
            Self::Approve => "approval.approve",
            Self::Reject => "approval.reject",
            Self::CreateUser => "settings.user.create",
            Self::ChangeProfile => "settings.user.profile",
            Self::UpdateEmails => "settings.emails.update",
            Self::SaveRule => "settings.rule.save",
            Self::DeleteRule => "settings.rule.delete",
            Self::Sync => "settings.sync",
        }
    }

    pub fn failed_event(self) -> &'static str {
        match self {
            Self::Submit => "board.submit.failed",
            Self::Approve => "approval.approve.failed",
            Self::Reject => "approval.reject.failed",
            Self::CreateUser => "settings.user.create.failed",
            Self::ChangeProfile => "settings.user.profile.failed",
            Self::UpdateEmails => "settings.emails.update.failed",
            Self::SaveRule => "settings.rule.save.failed",
            Self::DeleteRule => "settings.rule.delete.failed",
            Self::Sync => "settings.sync.failed",
        }
    }
}

/// `items` is the number of records the action touched.
pub fn log_action(action: DashboardAction, items: usize) {
    info!(
        component = action.component(),
        event = action.event(),
        items
    );
}

pub fn log_action_failed(action: DashboardAction, items: usize, err: &dyn Display) {
    warn!(
        component = action.component(),
        event = action.failed_event(),
        items,
        error = %err
    );
}
