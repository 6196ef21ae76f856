//! Client and server-rendered dashboard for real-estate commission
//! approval.
//!
//! The library holds the typed client of the commission REST API, the
//! retrying fetch helper, pt-BR formatting and status translation, the
//! page controllers and an escaped HTML view tree. The `dashboard_server`
//! binary serves the manager and direção pages.

mod api;
mod approval;
mod board;
mod config;
mod dashboard;
mod export;
mod fetch;
mod filters;
mod format;
mod lookup;
mod lote;
mod models;
mod observability;
mod render;
mod report;
mod selection;
mod settings;
mod status;
mod ui;
mod view;

pub use api::{ApiError, ComissoesApi, MutationOutcome};
pub use approval::{ApprovalQueue, QueueStats};
pub use board::CommissionBoard;
pub use config::{
    api_config_from_env, dashboard_addr_from_env, logging_config_from_env, parse_base_url,
    ApiConfig, ConfigError,
};
pub use dashboard::dashboard_router;
pub use export::{commissions_csv, export_filename, ExportError};
pub use fetch::{
    fetch_with_retry, ApiRequest, ApiResponse, FetchError, Method, ReqwestTransport, RetryPolicy,
    SleepFuture, Sleeper, TokioSleeper, Transport, TransportError, TransportFuture,
};
pub use filters::{
    approval_options, commission_filter_panel, installment_options, report_filter_panel,
    split_values, trigger_options, CommissionQuery, DateRange, FilterOption, FilterPanel,
    MultiSelect, ReportQuery, APPROVAL_FILTER, AUDIT_FILTER, BROKER_FILTER, ENTERPRISE_FILTER,
    INSTALLMENT_FILTER, RULE_FILTER, TRIGGER_FILTER,
};
pub use format::{
    fix_name_spacing, format_currency, format_currency_or_zero, format_date, format_decimal,
    yes_no, yes_no_upper, PLACEHOLDER,
};
pub use lookup::{
    BrokerLookup, ContractOption, EnterpriseLookup, LotSearch, LotSearchOutcome, LotSuggestion,
    LOT_SEARCH_DEBOUNCE, LOT_SEARCH_MIN_CHARS,
};
pub use lote::{extract_lot_label, extract_lot_label_str, lot_or_contract};
pub use models::{
    validate_email_list, validate_email_list_kind, ApprovalRequest, Broker, BrokerAccount,
    BrokerContract, Commission, CommissionRule, Contract, ContractInfo, EmailConfig, Enterprise,
    EnterpriseRef, NewUser, RejectionRequest, RuleDraft, RuleKind, SubmissionRequest, SyncLog,
    User, ValidationError,
};
pub use observability::{
    init_logging, log_action, log_action_failed, log_app_bind, log_app_start,
    log_dashboard_request, log_section_failure, log_upstream_selected, DashboardAction, LogFormat,
    LoggingConfig, LoggingInitError,
};
pub use render::Nav;
pub use report::CommissionReport;
pub use selection::Selection;
pub use settings::{split_email_input, SettingsPage, SettingsSnapshot};
pub use status::{
    translate_installment_status, ApprovalStatus, Badge, InstallmentKind, InstallmentStatus,
    APPROVAL_STATUSES,
};
pub use ui::{ActionError, ActionMessages, Confirm, Notice, NoticeLevel};
pub use view::{el, escape_html, text, Element, Node};
