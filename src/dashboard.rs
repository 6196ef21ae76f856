//! HTTP routes of the dashboard. Every page builds a fresh controller per
//! request and proxies its data calls to the commission API.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::api::{ApiError, ComissoesApi};
use crate::approval::ApprovalQueue;
use crate::board::CommissionBoard;
use crate::export::{export_filename, ExportError};
use crate::filters::{split_values, DateRange, FilterPanel};
use crate::lookup::{BrokerLookup, EnterpriseLookup, LotSearch, LotSearchOutcome};
use crate::models::{NewUser, RuleDraft, RuleKind, ValidationError};
use crate::observability::{self, log_dashboard_request, log_export_failed};
use crate::render;
use crate::report::CommissionReport;
use crate::settings::{split_email_input, SettingsPage};
use crate::ui::{ActionError, Notice};
use crate::view::el;

type Params = Vec<(String, String)>;

#[derive(Clone)]
struct DashboardAppState {
    api: Arc<ComissoesApi>,
}

pub fn dashboard_router(api: Arc<ComissoesApi>) -> Router {
    Router::new()
        .route("/dashboard", get(get_commissions_html))
        .route("/dashboard/comissoes.csv", get(get_commissions_csv))
        .route("/dashboard/comissoes/enviar", post(post_submit))
        .route("/dashboard/relatorio", get(get_report_html))
        .route("/dashboard/relatorio.csv", get(get_report_csv))
        .route("/dashboard/direcao", get(get_approval_html))
        .route("/dashboard/direcao/aprovar", post(post_approve))
        .route("/dashboard/direcao/rejeitar", post(post_reject))
        .route("/dashboard/lotes", get(get_lot_suggestions))
        .route("/dashboard/contratos", get(get_contracts_html))
        .route("/dashboard/corretores", get(get_brokers_html))
        .route("/dashboard/configuracoes", get(get_settings_html))
        .route("/dashboard/usuarios", post(post_user))
        .route("/dashboard/usuarios/{id}/perfil", put(put_user_profile))
        .route("/dashboard/emails/{tipo}", put(put_email_list))
        .route("/dashboard/regras", post(post_rule))
        .route("/dashboard/regras/{id}", put(put_rule).delete(delete_rule))
        .route("/dashboard/sincronizar", post(post_sync))
        .with_state(DashboardAppState { api })
}

/// Confirmation already happened in the browser before the POST.
fn confirmed(_: &str) -> bool {
    true
}

fn log_section_failure(section: &'static str, err: &ApiError) {
    observability::log_section_failure("dashboard", section, err);
}

fn first<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// Selects repeated or comma-joined params in every group of the panel
/// and parses the period.
fn apply_filter_params(panel: &mut FilterPanel, params: &Params) -> Result<DateRange, ValidationError> {
    for group in panel.groups_mut() {
        let values = split_values(
            params
                .iter()
                .filter(|(key, _)| key == group.name())
                .map(|(_, value)| value.as_str()),
        );
        for value in &values {
            group.select(value);
        }
    }

    DateRange::parse(first(params, "data_inicio"), first(params, "data_fim"))
}

/// Board with options loaded and the request filters applied.
async fn filtered_board(api: Arc<ComissoesApi>, params: &Params) -> (CommissionBoard, Option<Notice>) {
    let mut board = CommissionBoard::new(api);
    if let Err(err) = board.load_installment_options().await {
        log_section_failure("status_parcela", &err);
    }

    let notice = match apply_filter_params(board.filters_mut(), params) {
        Ok(period) => {
            board.set_period(period);
            None
        }
        Err(err) => Some(Notice::error(err.to_string())),
    };
    (board, notice)
}

async fn filtered_report(api: Arc<ComissoesApi>, params: &Params) -> (CommissionReport, Option<Notice>) {
    let mut report = CommissionReport::new(api);
    report.load_options().await;

    let notice = match apply_filter_params(report.filters_mut(), params) {
        Ok(period) => {
            report.set_period(period);
            None
        }
        Err(err) => Some(Notice::error(err.to_string())),
    };
    (report, notice)
}

fn load_failure_notice(what: &str, err: &ApiError) -> Notice {
    let message = match err {
        ApiError::Fetch(_) => format!("Erro de conexão ao carregar {what}"),
        _ => err
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Erro ao carregar {what}")),
    };
    Notice::error(message)
}

async fn get_commissions_html(
    State(state): State<DashboardAppState>,
    Query(params): Query<Params>,
) -> impl IntoResponse {
    log_dashboard_request("comissoes");
    let (mut board, mut notice) = filtered_board(state.api, &params).await;
    if notice.is_none() {
        if let Err(err) = board.search().await {
            log_section_failure("comissoes", &err);
            notice = Some(load_failure_notice("comissões", &err));
        }
    }
    Html(render::commission_page(&board, notice.as_ref()))
}

async fn get_commissions_csv(
    State(state): State<DashboardAppState>,
    Query(params): Query<Params>,
) -> Response {
    log_dashboard_request("comissoes_csv");
    let (mut board, notice) = filtered_board(state.api, &params).await;
    if let Some(notice) = notice {
        return error_json(StatusCode::BAD_REQUEST, &notice.message);
    }
    if let Err(err) = board.search().await {
        log_section_failure("comissoes", &err);
        return api_error_response(&err, &load_failure_notice("comissões", &err).message);
    }

    csv_response(board.export_csv())
}

fn csv_response(export: Result<Vec<u8>, ExportError>) -> Response {
    match export {
        Ok(bytes) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                export_filename(Utc::now().date_naive())
            );
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(ExportError::Empty) => {
            error_json(StatusCode::UNPROCESSABLE_ENTITY, &ExportError::Empty.to_string())
        }
        Err(err) => {
            log_export_failed(&err);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Erro ao exportar")
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    comissoes_ids: Vec<i64>,
    #[serde(default)]
    observacoes: BTreeMap<i64, String>,
}

async fn post_submit(
    State(state): State<DashboardAppState>,
    Json(body): Json<SubmitBody>,
) -> Response {
    log_dashboard_request("comissoes_enviar");
    let mut board = CommissionBoard::new(state.api);
    if let Err(err) = board.search().await {
        log_section_failure("comissoes", &err);
        return api_error_response(&err, "Erro ao carregar comissões");
    }

    for id in &body.comissoes_ids {
        if board.select(*id) {
            if let Some(text) = body.observacoes.get(id) {
                board.attach_observation(*id, text);
            }
        }
    }

    action_response(board.submit_for_approval(&confirmed).await)
}

async fn get_report_html(
    State(state): State<DashboardAppState>,
    Query(params): Query<Params>,
) -> impl IntoResponse {
    log_dashboard_request("relatorio");
    let (mut report, mut notice) = filtered_report(state.api, &params).await;
    if notice.is_none() {
        if let Err(err) = report.search().await {
            log_section_failure("relatorio", &err);
            notice = Some(load_failure_notice("relatório", &err));
        }
    }
    Html(render::report_page(&report, notice.as_ref()))
}

async fn get_report_csv(
    State(state): State<DashboardAppState>,
    Query(params): Query<Params>,
) -> Response {
    log_dashboard_request("relatorio_csv");
    let (mut report, notice) = filtered_report(state.api, &params).await;
    if let Some(notice) = notice {
        return error_json(StatusCode::BAD_REQUEST, &notice.message);
    }
    if let Err(err) = report.search().await {
        log_section_failure("relatorio", &err);
        return api_error_response(&err, &load_failure_notice("relatório", &err).message);
    }
    csv_response(report.export_csv())
}

async fn get_approval_html(State(state): State<DashboardAppState>) -> impl IntoResponse {
    log_dashboard_request("direcao");
    let mut queue = ApprovalQueue::new(state.api);
    let notice = match queue.load().await {
        Ok(_) => None,
        Err(err) => {
            log_section_failure("pendentes_aprovacao", &err);
            Some(load_failure_notice("comissões pendentes", &err))
        }
    };
    Html(render::approval_page(&queue, notice.as_ref()))
}

#[derive(Debug, Deserialize)]
struct ApproveBody {
    comissoes_ids: Vec<i64>,
    #[serde(default)]
    observacoes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RejectBody {
    comissoes_ids: Vec<i64>,
    #[serde(default)]
    motivo: String,
}

async fn loaded_queue(api: Arc<ComissoesApi>, ids: &[i64]) -> Result<ApprovalQueue, Response> {
    let mut queue = ApprovalQueue::new(api);
    if let Err(err) = queue.load().await {
        log_section_failure("pendentes_aprovacao", &err);
        return Err(api_error_response(&err, "Erro ao carregar comissões pendentes"));
    }
    for id in ids {
        queue.select(*id);
    }
    Ok(queue)
}

async fn post_approve(
    State(state): State<DashboardAppState>,
    Json(body): Json<ApproveBody>,
) -> Response {
    log_dashboard_request("direcao_aprovar");
    let mut queue = match loaded_queue(state.api, &body.comissoes_ids).await {
        Ok(queue) => queue,
        Err(response) => return response,
    };
    action_response(
        queue
            .approve(&confirmed, body.observacoes.as_deref())
            .await,
    )
}

async fn post_reject(
    State(state): State<DashboardAppState>,
    Json(body): Json<RejectBody>,
) -> Response {
    log_dashboard_request("direcao_rejeitar");
    let mut queue = match loaded_queue(state.api, &body.comissoes_ids).await {
        Ok(queue) => queue,
        Err(response) => return response,
    };
    if let Err(err) = queue.open_reject_dialog() {
        return action_response(Err(err.into()));
    }
    action_response(queue.reject(&body.motivo).await)
}

#[derive(Debug, Deserialize)]
struct LotQuery {
    #[serde(default)]
    lote: String,
}

async fn get_lot_suggestions(
    State(state): State<DashboardAppState>,
    Query(query): Query<LotQuery>,
) -> Response {
    log_dashboard_request("lotes");
    // The browser debounces keystrokes and drops stale responses itself.
    let search = LotSearch::with_debounce(state.api, Duration::ZERO);
    match search.search(&query.lote).await {
        Ok(LotSearchOutcome::Results(suggestions)) => {
            Html(render::lot_suggestions(&suggestions).render()).into_response()
        }
        Ok(LotSearchOutcome::TooShort | LotSearchOutcome::Superseded) => {
            Html(String::new()).into_response()
        }
        Err(err) => {
            log_section_failure("busca_lote", &err);
            let fragment = el("div").class("autocomplete-item").text("Erro na busca");
            (StatusCode::BAD_GATEWAY, Html(fragment.render())).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContractsQuery {
    #[serde(default)]
    building_id: Option<String>,
    #[serde(default)]
    numero_contrato: Option<String>,
}

async fn get_contracts_html(
    State(state): State<DashboardAppState>,
    Query(query): Query<ContractsQuery>,
) -> impl IntoResponse {
    log_dashboard_request("contratos");
    let mut lookup = EnterpriseLookup::new(state.api);
    let mut notice = None;

    if let Err(err) = lookup.load_enterprises().await {
        log_section_failure("empreendimentos", &err);
        notice = Some(load_failure_notice("empreendimentos", &err));
    }

    let building_id = query
        .building_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    if let Some(building_id) = building_id {
        if let Err(err) = lookup.select_enterprise(building_id).await {
            log_section_failure("contratos", &err);
            notice = Some(load_failure_notice("contratos", &err));
        } else if let Some(numero) = query.numero_contrato.as_deref() {
            if let Err(err) = lookup.select_contract(numero).await {
                log_section_failure("contrato_info", &err);
                notice = Some(load_failure_notice("informações do contrato", &err));
            }
        }
    }

    Html(render::contracts_page(
        lookup.enterprises(),
        building_id,
        lookup.contracts(),
        query.numero_contrato.as_deref(),
        lookup.info(),
        notice.as_ref(),
    ))
}

#[derive(Debug, Default, Deserialize)]
struct BrokersQuery {
    #[serde(default)]
    corretor_id: Option<String>,
}

async fn get_brokers_html(
    State(state): State<DashboardAppState>,
    Query(query): Query<BrokersQuery>,
) -> impl IntoResponse {
    log_dashboard_request("corretores");
    let mut lookup = BrokerLookup::new(state.api);
    let mut notice = None;
    let mut loaded_contracts = false;

    match lookup.load_brokers().await {
        Err(err) => {
            log_section_failure("corretores", &err);
            notice = Some(load_failure_notice("corretores", &err));
        }
        Ok(_) => {
            if let Some(id) = query.corretor_id.as_deref().filter(|id| !id.trim().is_empty()) {
                match lookup.select_broker(id).await {
                    Ok(_) => loaded_contracts = true,
                    Err(err) => {
                        log_section_failure("contratos_corretor", &err);
                        notice = Some(load_failure_notice("contratos do corretor", &err));
                    }
                }
            }
        }
    }

    let contracts = loaded_contracts.then(|| lookup.contracts());
    Html(render::brokers_page(
        lookup.brokers(),
        lookup.selected(),
        contracts,
        notice.as_ref(),
    ))
}

async fn get_settings_html(State(state): State<DashboardAppState>) -> impl IntoResponse {
    log_dashboard_request("configuracoes");
    let mut settings = SettingsPage::new(state.api);
    settings.load_all().await;
    Html(render::settings_page(settings.snapshot(), None))
}

#[derive(Debug, Deserialize)]
struct NewUserBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    senha: String,
    #[serde(default)]
    nome_completo: String,
    #[serde(default)]
    perfil: Option<String>,
    #[serde(default)]
    is_admin: bool,
}

async fn post_user(
    State(state): State<DashboardAppState>,
    Json(body): Json<NewUserBody>,
) -> Response {
    log_dashboard_request("usuarios_criar");
    let user = match NewUser::new(
        &body.username,
        &body.senha,
        &body.nome_completo,
        body.perfil.as_deref(),
        body.is_admin,
    ) {
        Ok(user) => user,
        Err(err) => return action_response(Err(err.into())),
    };
    let mut settings = SettingsPage::new(state.api);
    action_response(settings.create_user(&user).await)
}

#[derive(Debug, Deserialize)]
struct ProfileBody {
    #[serde(default)]
    perfil: String,
}

async fn put_user_profile(
    State(state): State<DashboardAppState>,
    Path(id): Path<i64>,
    Json(body): Json<ProfileBody>,
) -> Response {
    log_dashboard_request("usuarios_perfil");
    let mut settings = SettingsPage::new(state.api);
    action_response(settings.change_profile(id, &body.perfil).await)
}

/// Recipients as typed in the textarea, or already split.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmailInput {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct EmailListBody {
    emails: EmailInput,
}

async fn put_email_list(
    State(state): State<DashboardAppState>,
    Path(tipo): Path<String>,
    Json(body): Json<EmailListBody>,
) -> Response {
    log_dashboard_request("emails");
    let emails = match body.emails {
        EmailInput::Text(raw) => split_email_input(&raw),
        EmailInput::List(list) => list,
    };
    let mut settings = SettingsPage::new(state.api);
    action_response(settings.update_email_list(&tipo, &emails).await)
}

/// A blank percentage arrives as `null` and fails validation as zero.
#[derive(Debug, Deserialize)]
struct RuleBody {
    #[serde(default)]
    nome: String,
    #[serde(default)]
    descricao: Option<String>,
    #[serde(default)]
    tipo: RuleKind,
    #[serde(default)]
    percentual: Option<f64>,
    #[serde(default)]
    percentual_auditoria: Option<f64>,
    #[serde(default)]
    inclui_itbi: bool,
}

impl RuleBody {
    fn into_draft(self) -> RuleDraft {
        RuleDraft {
            nome: self.nome.trim().to_string(),
            descricao: self
                .descricao
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            tipo: self.tipo,
            percentual: self.percentual.unwrap_or(0.0),
            percentual_auditoria: self.percentual_auditoria.unwrap_or(0.0),
            inclui_itbi: self.inclui_itbi,
        }
    }
}

async fn post_rule(
    State(state): State<DashboardAppState>,
    Json(body): Json<RuleBody>,
) -> Response {
    log_dashboard_request("regras_criar");
    let mut settings = SettingsPage::new(state.api);
    action_response(settings.save_rule(None, &body.into_draft()).await)
}

async fn put_rule(
    State(state): State<DashboardAppState>,
    Path(id): Path<i64>,
    Json(body): Json<RuleBody>,
) -> Response {
    log_dashboard_request("regras_atualizar");
    let mut settings = SettingsPage::new(state.api);
    action_response(settings.save_rule(Some(id), &body.into_draft()).await)
}

async fn delete_rule(State(state): State<DashboardAppState>, Path(id): Path<i64>) -> Response {
    log_dashboard_request("regras_excluir");
    let mut settings = SettingsPage::new(state.api);
    action_response(settings.delete_rule(&confirmed, id).await)
}

async fn post_sync(State(state): State<DashboardAppState>) -> Response {
    log_dashboard_request("sincronizar");
    let mut settings = SettingsPage::new(state.api);
    action_response(settings.sync_now(&confirmed).await)
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "sucesso": false, "erro": message }))).into_response()
}

/// Upstream client errors keep their status; anything else is a bad gateway.
fn upstream_status(err: &ApiError) -> StatusCode {
    match err {
        ApiError::Rejected { status, .. } if (400..500).contains(status) => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn api_error_response(err: &ApiError, fallback: &str) -> Response {
    error_json(upstream_status(err), err.server_message().unwrap_or(fallback))
}

fn action_response(result: Result<Notice, ActionError>) -> Response {
    match result {
        Ok(notice) => Json(json!({ "sucesso": true, "mensagem": notice.message })).into_response(),
        Err(err) => {
            let message = err
                .notice()
                .map(|notice| notice.message)
                .unwrap_or_else(|| "Ação cancelada".to_string());
            let status = match &err {
                ActionError::Validation(_) | ActionError::Cancelled => StatusCode::BAD_REQUEST,
                ActionError::Api { source, .. } => upstream_status(source),
            };
            error_json(status, &message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::scripted_api;
    use crate::fetch::test_support::ScriptedTransport;
    use crate::fetch::FetchError;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn filter_params_accept_repeated_and_comma_joined_values() {
        let transport = ScriptedTransport::new();
        let mut board = CommissionBoard::new(Arc::new(scripted_api(&transport)));

        let period = apply_filter_params(
            board.filters_mut(),
            &params(&[
                ("status_aprovacao", "Pendente,Aprovada"),
                ("status_aprovacao", "Paga"),
                ("gatilho_atingido", "true"),
                ("data_inicio", "2025-01-01"),
            ]),
        )
        .unwrap();
        board.set_period(period);

        let query = board.query();
        assert_eq!(query.approval_statuses, vec!["Pendente", "Aprovada", "Paga"]);
        assert_eq!(query.trigger_reached, vec!["true"]);
        assert!(query.period.start.is_some());
    }

    #[test]
    fn inverted_period_is_a_validation_error() {
        let transport = ScriptedTransport::new();
        let mut board = CommissionBoard::new(Arc::new(scripted_api(&transport)));

        let err = apply_filter_params(
            board.filters_mut(),
            &params(&[("data_inicio", "2025-02-01"), ("data_fim", "2025-01-01")]),
        )
        .unwrap_err();

        assert_eq!(err, ValidationError::InvertedDateRange);
    }

    #[test]
    fn report_params_select_only_known_options() {
        let transport = ScriptedTransport::new();
        let mut report = CommissionReport::new(Arc::new(scripted_api(&transport)));

        apply_filter_params(
            report.filters_mut(),
            &params(&[("auditoria", "true,talvez"), ("corretor", "31")]),
        )
        .unwrap();

        let query = report.query();
        assert_eq!(query.audit, vec!["true"]);
        assert!(query.brokers.is_empty());
    }

    #[test]
    fn blank_rule_percentages_fail_validation() {
        let body: RuleBody = serde_json::from_value(serde_json::json!({
            "nome": " Padrão ",
            "descricao": "  ",
            "tipo": "faturamento",
            "percentual": null,
            "inclui_itbi": true
        }))
        .unwrap();

        let draft = body.into_draft();

        assert_eq!(draft.nome, "Padrão");
        assert_eq!(draft.descricao, None);
        assert_eq!(draft.tipo, RuleKind::Faturamento);
        assert_eq!(
            draft.validate(),
            Err(ValidationError::PercentageOutOfRange { field: "Percentual" })
        );
    }

    #[test]
    fn upstream_client_errors_keep_status() {
        let rejected = ApiError::Rejected {
            status: 403,
            message: Some("Acesso negado".to_string()),
        };
        assert_eq!(upstream_status(&rejected), StatusCode::FORBIDDEN);

        let unreachable = ApiError::Fetch(FetchError::ServerError {
            status: 503,
            attempts: 3,
        });
        assert_eq!(upstream_status(&unreachable), StatusCode::BAD_GATEWAY);
    }
}
