//! Typed client for the commission REST API.
//!
//! Reads go through [`fetch_with_retry`] with the configured policy. Writes
//! are sent once: none of them is idempotent on the server side.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::{ApiConfig, ConfigError};
use crate::fetch::{
    fetch_with_retry, ApiRequest, ApiResponse, FetchError, ReqwestTransport, RetryPolicy, Sleeper,
    TokioSleeper, Transport,
};
use crate::filters::{CommissionQuery, ReportQuery};
use crate::models::{
    ApprovalRequest, Broker, BrokerAccount, BrokerContract, Commission, CommissionRule, Contract,
    ContractInfo, EmailConfig, Enterprise, NewUser, RejectionRequest, RuleDraft,
    SubmissionRequest, SyncLog, User,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("request rejected with status {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("unexpected payload from {path}: {message}")]
    Decode { path: String, message: String },
}

impl ApiError {
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationOutcome {
    pub message: Option<String>,
}

impl MutationOutcome {
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.message.as_deref().unwrap_or(fallback)
    }
}

pub struct ComissoesApi {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    read_policy: RetryPolicy,
}

impl ComissoesApi {
    pub fn new(
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        read_policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            read_policy,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(TokioSleeper),
            config.retry,
        ))
    }

    pub async fn enterprises(&self) -> Result<Vec<Enterprise>, ApiError> {
        self.read_list(ApiRequest::get("/api/empreendimentos"), None)
            .await
    }

    pub async fn contracts(&self, building_id: &str) -> Result<Vec<Contract>, ApiError> {
        let request = ApiRequest::get("/api/contratos").with_query("building_id", building_id);
        self.read_list(request, None).await
    }

    pub async fn contract_info(
        &self,
        numero_contrato: &str,
        building_id: &str,
    ) -> Result<ContractInfo, ApiError> {
        let request = ApiRequest::get("/api/contrato-info")
            .with_query("numero_contrato", numero_contrato)
            .with_query("building_id", building_id);
        let body = self.read(&request).await?;
        decode_value(&request.path, body)
    }

    /// Lots whose label contains `lote`. Queries shorter than two characters
    /// never hit the server.
    pub async fn search_lots(&self, lote: &str) -> Result<Vec<Contract>, ApiError> {
        if lote.trim().chars().count() < 2 {
            return Ok(Vec::new());
        }
        let request = ApiRequest::get("/api/buscar-por-lote").with_query("lote", lote.trim());
        self.read_list(request, None).await
    }

    pub async fn brokers(&self) -> Result<Vec<Broker>, ApiError> {
        self.read_list(ApiRequest::get("/api/corretores"), None)
            .await
    }

    pub async fn broker_contracts(
        &self,
        corretor_id: Option<&str>,
        corretor_nome: Option<&str>,
    ) -> Result<Vec<BrokerContract>, ApiError> {
        let mut request = ApiRequest::get("/api/contratos-por-corretor");
        if let Some(id) = corretor_id {
            request = request.with_query("corretor_id", id);
        }
        if let Some(nome) = corretor_nome {
            request = request.with_query("corretor_nome", nome);
        }
        let rows: Vec<Value> = self.read_list(request, None).await?;
        Ok(rows.iter().map(BrokerContract::from_value).collect())
    }

    /// Distinct raw installment-status tokens present in the data.
    pub async fn installment_statuses(&self) -> Result<Vec<String>, ApiError> {
        self.read_list(ApiRequest::get("/api/comissoes/status-parcela"), Some("status"))
            .await
    }

    pub async fn commissions(&self, query: &CommissionQuery) -> Result<Vec<Commission>, ApiError> {
        let request = ApiRequest::get("/api/comissoes/listar").with_query_pairs(query.to_pairs());
        self.read_list(request, Some("comissoes")).await
    }

    pub async fn commission_report(&self, query: &ReportQuery) -> Result<Vec<Commission>, ApiError> {
        let request = ApiRequest::get("/api/comissoes/listar").with_query_pairs(query.to_pairs());
        self.read_list(request, Some("comissoes")).await
    }

    pub async fn submit_for_approval(
        &self,
        submission: &SubmissionRequest,
    ) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::post(
            "/api/comissoes/enviar-aprovacao",
            to_body(submission),
        ))
        .await
    }

    pub async fn pending_approval(&self) -> Result<Vec<Commission>, ApiError> {
        self.read_list(
            ApiRequest::get("/api/comissoes/pendentes-aprovacao"),
            Some("comissoes"),
        )
        .await
    }

    pub async fn approve(&self, approval: &ApprovalRequest) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::post("/api/comissoes/aprovar", to_body(approval)))
            .await
    }

    pub async fn reject(&self, rejection: &RejectionRequest) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::post("/api/comissoes/rejeitar", to_body(rejection)))
            .await
    }

    pub async fn rules(&self) -> Result<Vec<CommissionRule>, ApiError> {
        self.read_list(ApiRequest::get("/api/regras-gatilho"), None)
            .await
    }

    pub async fn create_rule(&self, draft: &RuleDraft) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::post("/api/regras-gatilho", to_body(draft)))
            .await
    }

    pub async fn update_rule(&self, id: i64, draft: &RuleDraft) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::put(
            format!("/api/regras-gatilho/{id}"),
            to_body(draft),
        ))
        .await
    }

    pub async fn delete_rule(&self, id: i64) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::delete(format!("/api/regras-gatilho/{id}")))
            .await
    }

    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.read_list(ApiRequest::get("/api/usuarios"), None).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::post("/api/usuarios/criar", to_body(user)))
            .await
    }

    pub async fn update_user_profile(&self, id: i64, perfil: &str) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::put(
            format!("/api/usuarios/{id}/perfil"),
            serde_json::json!({ "perfil": perfil }),
        ))
        .await
    }

    pub async fn broker_accounts(&self) -> Result<Vec<BrokerAccount>, ApiError> {
        self.read_list(ApiRequest::get("/api/corretores-usuarios"), Some("corretores"))
            .await
    }

    pub async fn email_configs(&self) -> Result<Vec<EmailConfig>, ApiError> {
        self.read_list(
            ApiRequest::get("/api/configuracoes-emails"),
            Some("configuracoes"),
        )
        .await
    }

    /// `tipo` must already be validated; it becomes a path segment.
    pub async fn update_email_config(
        &self,
        tipo: &str,
        emails: &[String],
    ) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::put(
            format!("/api/configuracoes-emails/{tipo}"),
            serde_json::json!({ "emails": emails }),
        ))
        .await
    }

    pub async fn sync_now(&self) -> Result<MutationOutcome, ApiError> {
        self.write(ApiRequest::post("/api/sincronizar", serde_json::json!({})))
            .await
    }

    pub async fn last_sync(&self) -> Result<Option<SyncLog>, ApiError> {
        let request = ApiRequest::get("/api/ultima-sincronizacao");
        let body = self.read(&request).await?;
        if body.is_null() {
            return Ok(None);
        }
        decode_value(&request.path, body).map(Some)
    }

    async fn read(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let response = fetch_with_retry(
            self.transport.as_ref(),
            self.sleeper.as_ref(),
            &self.read_policy,
            request,
        )
        .await?;
        open_envelope(&request.path, &response)
    }

    async fn read_list<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        key: Option<&str>,
    ) -> Result<Vec<T>, ApiError> {
        let body = self.read(&request).await?;
        let list = match (body, key) {
            (Value::Array(items), _) => Value::Array(items),
            (Value::Null, _) => Value::Array(Vec::new()),
            (Value::Object(mut fields), Some(key)) => {
                fields.remove(key).unwrap_or(Value::Array(Vec::new()))
            }
            (other, _) => {
                return Err(ApiError::Decode {
                    path: request.path,
                    message: format!("expected a list, got {}", kind_of(&other)),
                })
            }
        };
        decode_value(&request.path, list)
    }

    async fn write(&self, request: ApiRequest) -> Result<MutationOutcome, ApiError> {
        let response = fetch_with_retry(
            self.transport.as_ref(),
            self.sleeper.as_ref(),
            &RetryPolicy::single_attempt(),
            &request,
        )
        .await?;
        let body = open_envelope(&request.path, &response)?;
        Ok(MutationOutcome {
            message: text_field(&body, "mensagem"),
        })
    }
}

/// Unwraps the server's success/failure conventions.
///
/// Failures are signalled by an `erro` field, `sucesso: false`,
/// `status: "erro"` or a non-2xx status; the message travels in `erro` or
/// `mensagem`.
fn open_envelope(path: &str, response: &ApiResponse) -> Result<Value, ApiError> {
    let body = if response.body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match response.decode::<Value>() {
            Ok(body) => body,
            Err(_) if !response.is_success() => {
                return Err(ApiError::Rejected {
                    status: response.status,
                    message: None,
                })
            }
            Err(err) => {
                return Err(ApiError::Decode {
                    path: path.to_string(),
                    message: err.to_string(),
                })
            }
        }
    };

    let flagged = body.get("erro").is_some_and(|erro| !erro.is_null())
        || body.get("sucesso") == Some(&Value::Bool(false))
        || body.get("status").and_then(Value::as_str) == Some("erro");

    if flagged || !response.is_success() {
        let message = text_field(&body, "erro").or_else(|| text_field(&body, "mensagem"));
        debug!(
            component = "api",
            event = "api.rejected",
            path,
            status = response.status,
            message = message.as_deref().unwrap_or("")
        );
        return Err(ApiError::Rejected {
            status: response.status,
            message,
        });
    }

    Ok(body)
}

fn text_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn decode_value<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| ApiError::Decode {
        path: path.to_string(),
        message: err.to_string(),
    })
}

fn to_body<T: Serialize>(payload: &T) -> Value {
    // Request types are plain structs with string keys; this cannot fail.
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}


#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::test_support::scripted_api;
    use super::*;
    use crate::fetch::test_support::ScriptedTransport;
    use crate::fetch::Method;

    #[tokio::test]
    async fn bare_list_and_enveloped_list_both_decode() {
        let transport = ScriptedTransport::new()
            .respond(200, json!([{"id": 1, "sienge_id": 2001, "nome": "Residencial Sol"}]))
            .respond(
                200,
                json!({"sucesso": true, "comissoes": [{"id": 7, "status_aprovacao": "Pendente"}], "total": 1}),
            );
        let api = scripted_api(&transport);

        let enterprises = api.enterprises().await.unwrap();
        let commissions = api.commissions(&CommissionQuery::default()).await.unwrap();

        assert_eq!(enterprises[0].nome, "Residencial Sol");
        assert_eq!(commissions.len(), 1);
        assert_eq!(commissions[0].id, 7);
    }

    #[tokio::test]
    async fn erro_field_is_a_rejection_even_with_200() {
        let transport = ScriptedTransport::new().respond(200, json!({"erro": "Acesso negado"}));
        let api = scripted_api(&transport);

        let err = api.users().await.unwrap_err();

        assert_eq!(err.server_message(), Some("Acesso negado"));
    }

    #[tokio::test]
    async fn status_erro_envelope_carries_mensagem() {
        let transport = ScriptedTransport::new().respond(
            404,
            json!({"status": "erro", "mensagem": "Regra não encontrada"}),
        );
        let api = scripted_api(&transport);

        let err = api
            .delete_rule(12)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Rejected {
                status: 404,
                message: Some("Regra não encontrada".to_string())
            }
        );
        assert_eq!(transport.requests()[0].method, Method::Delete);
        assert_eq!(transport.requests()[0].path, "/api/regras-gatilho/12");
    }

    #[tokio::test]
    async fn writes_are_not_retried_on_server_errors() {
        let transport = ScriptedTransport::new()
            .respond(500, json!({"sucesso": false, "erro": "timeout"}))
            .respond(200, json!({"sucesso": true}));
        let api = scripted_api(&transport);
        let submission = SubmissionRequest::new(vec![1], &BTreeMap::new()).unwrap();

        let err = api.submit_for_approval(&submission).await.unwrap_err();

        assert!(matches!(err, ApiError::Fetch(FetchError::ServerError { status: 500, attempts: 1 })));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn reads_are_retried_on_server_errors() {
        let transport = ScriptedTransport::new()
            .respond(502, json!({}))
            .respond(200, json!({"sucesso": true, "status": ["paid", "pending"]}));
        let api = scripted_api(&transport);

        let statuses = api.installment_statuses().await.unwrap();

        assert_eq!(statuses, vec!["paid", "pending"]);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn sucesso_false_with_mensagem_is_rejected() {
        let transport = ScriptedTransport::new().respond(
            400,
            json!({"sucesso": false, "mensagem": "Nenhuma comissão válida para aprovar"}),
        );
        let api = scripted_api(&transport);
        let approval = ApprovalRequest::new(vec![5], None).unwrap();

        let err = api.approve(&approval).await.unwrap_err();

        assert_eq!(err.server_message(), Some("Nenhuma comissão válida para aprovar"));
        let sent = &transport.requests()[0];
        assert_eq!(sent.body, Some(json!({"comissoes_ids": [5]})));
    }

    #[tokio::test]
    async fn successful_write_returns_server_message() {
        let transport = ScriptedTransport::new().respond(
            200,
            json!({"sucesso": true, "mensagem": "2 comissões rejeitadas"}),
        );
        let api = scripted_api(&transport);
        let rejection = RejectionRequest::new(vec![1, 2], "valor divergente").unwrap();

        let outcome = api.reject(&rejection).await.unwrap();

        assert_eq!(outcome.message.as_deref(), Some("2 comissões rejeitadas"));
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({"comissoes_ids": [1, 2], "motivo": "valor divergente"}))
        );
    }

    #[tokio::test]
    async fn short_lot_queries_skip_the_network() {
        let transport = ScriptedTransport::new();
        let api = scripted_api(&transport);

        assert!(api.search_lots(" 1 ").await.unwrap().is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn last_sync_may_be_null() {
        let transport = ScriptedTransport::new()
            .respond(200, Value::Null)
            .respond(200, json!({"data_sincronizacao": "2025-03-09T10:00:00", "status": "ok"}));
        let api = scripted_api(&transport);

        assert_eq!(api.last_sync().await.unwrap(), None);
        let log = api.last_sync().await.unwrap().unwrap();
        assert_eq!(log.data_sincronizacao.as_deref(), Some("2025-03-09T10:00:00"));
    }

    #[tokio::test]
    async fn broker_contracts_sends_both_identifiers() {
        let transport = ScriptedTransport::new().respond(
            200,
            json!([{"contract_number": "C-1", "commission_value": 1500}]),
        );
        let api = scripted_api(&transport);

        let rows = api
            .broker_contracts(Some("31"), Some("Ana Lima"))
            .await
            .unwrap();

        assert_eq!(rows[0].numero_contrato.as_deref(), Some("C-1"));
        let sent = &transport.requests()[0];
        assert_eq!(sent.query_value("corretor_id"), Some("31"));
        assert_eq!(sent.query_value("corretor_nome"), Some("Ana Lima"));
    }

    #[tokio::test]
    async fn non_json_error_page_is_a_rejection() {
        let transport = ScriptedTransport::new();
        transport.push(Ok(ApiResponse::new(403, "<html>Forbidden</html>")));
        let api = scripted_api(&transport);

        let err = api.rules().await.unwrap_err();

        assert_eq!(
            err,
            ApiError::Rejected {
                status: 403,
                message: None
            }
        );
    }
}
