//! Payload types returned by the commission API.
//!
//! The upstream rows come straight from ERP-synchronized tables, so ids and
//! amounts show up as numbers or as numeric strings depending on the source.
//! The `lenient` helpers accept both.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::status::{ApprovalStatus, InstallmentStatus};

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(crate) fn opt_f64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) => parse_amount(&text),
            _ => None,
        })
    }

    pub(crate) fn opt_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::String(text)) if !text.is_empty() => Some(text),
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => None,
        })
    }

    pub(crate) fn string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
        opt_string(de).map(Option::unwrap_or_default)
    }

    pub(crate) fn bool_flag<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::Bool(flag)) => flag,
            Some(Value::Number(number)) => number.as_i64().is_some_and(|n| n != 0),
            Some(Value::String(text)) => matches!(text.trim().to_lowercase().as_str(), "true" | "1" | "sim"),
            _ => false,
        })
    }

    pub(crate) fn id<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
        match Value::deserialize(de)? {
            Value::Number(number) => number
                .as_i64()
                .ok_or_else(|| serde::de::Error::custom(format!("id {number} is not an integer"))),
            Value::String(text) => text
                .trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("id '{text}' is not an integer"))),
            other => Err(serde::de::Error::custom(format!("unexpected id value {other}"))),
        }
    }

    /// Accepts `1234.56`, `1234,56` and `1.234,56`.
    pub(crate) fn parse_amount(text: &str) -> Option<f64> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Some(value);
        }
        trimmed.replace('.', "").replace(',', ".").parse().ok()
    }
}

pub(crate) use lenient::parse_amount;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enterprise {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub sienge_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nome: String,
}

impl Enterprise {
    /// Id the contract endpoints expect: the ERP id when present.
    pub fn lookup_id(&self) -> Option<&str> {
        self.sienge_id.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseRef {
    #[serde(default, deserialize_with = "lenient::string")]
    pub nome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(default, deserialize_with = "lenient::string")]
    pub numero_contrato: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub building_id: Option<String>,
    #[serde(default)]
    pub nome_cliente: Option<String>,
    #[serde(default)]
    pub unidade: Option<Value>,
    #[serde(default)]
    pub unidades: Option<Value>,
    #[serde(default)]
    pub sienge_empreendimentos: Option<EnterpriseRef>,
}

impl Contract {
    pub fn unit(&self) -> Option<&Value> {
        self.unidade
            .as_ref()
            .filter(|value| !is_blank(value))
            .or(self.unidades.as_ref())
    }

    pub fn enterprise_name(&self) -> Option<&str> {
        self.sienge_empreendimentos
            .as_ref()
            .map(|enterprise| enterprise.nome.as_str())
            .filter(|name| !name.is_empty())
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub numero_contrato: String,
    #[serde(default)]
    pub nome_cliente: Option<String>,
    #[serde(default)]
    pub data_contrato: Option<String>,
    #[serde(default)]
    pub corretor_principal: Option<String>,
    #[serde(default)]
    pub empreendimento_nome: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub valor_comissao: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub valor_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub valor_a_vista: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub valor_itbi: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub valor_pago: Option<f64>,
    #[serde(default)]
    pub status_parcela: Option<String>,
    #[serde(default)]
    pub regra_gatilho: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub valor_gatilho: Option<f64>,
    #[serde(default, deserialize_with = "lenient::bool_flag")]
    pub atingiu_gatilho: bool,
}

impl ContractInfo {
    pub const DEFAULT_TRIGGER_RULE: &'static str = "10% + ITBI";

    pub fn trigger_rule(&self) -> &str {
        self.regra_gatilho
            .as_deref()
            .filter(|rule| !rule.is_empty())
            .unwrap_or(Self::DEFAULT_TRIGGER_RULE)
    }

    pub fn cash_value(&self) -> Option<f64> {
        self.valor_a_vista.or(self.valor_total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broker {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub sienge_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nome: String,
}

impl Broker {
    pub fn lookup_id(&self) -> Option<&str> {
        self.sienge_id.as_deref().or(self.id.as_deref())
    }
}

/// One contract line in the broker lookup.
///
/// The broker endpoint mixes the ERP spelling (`contract_number`,
/// `unit_name`, ...) with the local one (`numero_contrato`, `unidade`, ...),
/// sometimes both on the same row, so it is read field by field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerContract {
    pub numero_contrato: Option<String>,
    pub unidade: Option<String>,
    pub empreendimento: Option<String>,
    pub cliente: Option<String>,
    pub valor_comissao: Option<f64>,
    pub status_parcela: Option<String>,
    pub atingiu_gatilho: bool,
}

impl BrokerContract {
    pub fn from_value(row: &Value) -> Self {
        Self {
            numero_contrato: pick_text(row, &["numero_contrato", "contract_number"]),
            unidade: pick_text(row, &["unit_name", "unidade"]),
            empreendimento: pick_text(row, &["enterprise_name", "empreendimento"]),
            cliente: pick_text(row, &["customer_name", "nome_cliente"]),
            valor_comissao: pick_amount(row, &["commission_value", "valor_comissao"]),
            status_parcela: pick_text(row, &["installment_status", "status_parcela"]),
            atingiu_gatilho: row
                .get("atingiu_gatilho")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

fn pick_text(row: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

fn pick_amount(row: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match row.get(*key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_amount(text),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    #[serde(default)]
    pub broker_nome: Option<String>,
    #[serde(default)]
    pub enterprise_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub numero_contrato: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub commission_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub valor_pago: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub valor_gatilho: Option<f64>,
    #[serde(default, deserialize_with = "lenient::bool_flag")]
    pub atingiu_gatilho: bool,
    #[serde(default)]
    pub installment_status: Option<String>,
    #[serde(default)]
    pub status_aprovacao: Option<String>,
    #[serde(default)]
    pub commission_date: Option<String>,
    #[serde(default)]
    pub data_envio_aprovacao: Option<String>,
}

impl Commission {
    pub fn approval_status(&self) -> ApprovalStatus {
        ApprovalStatus::canonicalize(self.status_aprovacao.as_deref())
    }

    pub fn installment_status(&self) -> InstallmentStatus {
        InstallmentStatus::canonicalize(self.installment_status.as_deref())
    }

    pub fn is_submittable(&self) -> bool {
        self.approval_status().is_submittable()
    }

    /// Pending rows whose trigger was reached are the ones waiting on a manager.
    pub fn needs_attention(&self) -> bool {
        self.is_submittable() && self.atingiu_gatilho
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    #[default]
    Gatilho,
    Faturamento,
}

impl RuleKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Gatilho => "Gatilho",
            Self::Faturamento => "Faturamento",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRule {
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nome: String,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub tipo: RuleKind,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub percentual: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub percentual_auditoria: Option<f64>,
    #[serde(default, deserialize_with = "lenient::bool_flag")]
    pub inclui_itbi: bool,
    #[serde(default = "default_true", deserialize_with = "lenient::bool_flag")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub username: String,
    #[serde(default)]
    pub nome_completo: Option<String>,
    #[serde(default)]
    pub perfil: Option<String>,
    #[serde(default, deserialize_with = "lenient::bool_flag")]
    pub is_admin: bool,
    #[serde(default)]
    pub ultimo_login: Option<String>,
}

impl User {
    pub const DEFAULT_PROFILE: &'static str = "Gestor";
    pub const PROFILES: [&'static str; 2] = ["Gestor", "Direção"];

    pub fn parse_profile(raw: &str) -> Result<&'static str, ValidationError> {
        let raw = raw.trim();
        Self::PROFILES
            .into_iter()
            .find(|profile| profile.to_lowercase() == raw.to_lowercase())
            .ok_or_else(|| ValidationError::UnknownProfile(raw.to_string()))
    }

    pub fn profile(&self) -> &str {
        self.perfil
            .as_deref()
            .filter(|perfil| !perfil.is_empty())
            .unwrap_or(Self::DEFAULT_PROFILE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerAccount {
    #[serde(default, deserialize_with = "lenient::string")]
    pub nome: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub cpf: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub ultimo_login: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default, deserialize_with = "lenient::string")]
    pub tipo: String,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
}

impl EmailConfig {
    pub fn title(&self) -> &str {
        self.descricao
            .as_deref()
            .filter(|text| !text.is_empty())
            .unwrap_or(&self.tipo)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLog {
    #[serde(default)]
    pub data_sincronizacao: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub detalhes: Option<Value>,
}

/// Rejected before any request is sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Selecione ao menos uma comissão")]
    EmptySelection,
    #[error("Informe o motivo da rejeição")]
    MissingRejectionReason,
    #[error("Preencha todos os campos obrigatórios")]
    MissingRequiredFields,
    #[error("Perfil inválido: {0}")]
    UnknownProfile(String),
    #[error("{field} deve estar entre 0 e 100")]
    PercentageOutOfRange { field: &'static str },
    #[error("E-mail inválido: {0}")]
    InvalidEmail(String),
    #[error("Tipo de lista inválido: {0}")]
    InvalidEmailListKind(String),
    #[error("Data inválida: {0}")]
    InvalidDate(String),
    #[error("A data inicial deve ser anterior à data final")]
    InvertedDateRange,
}

/// Body of `POST /api/comissoes/enviar-aprovacao`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequest {
    pub comissoes_ids: Vec<i64>,
    pub observacoes: BTreeMap<String, String>,
}

impl SubmissionRequest {
    /// Observations are keyed by the id's decimal text, as JSON object keys
    /// must be strings. Blank observations are dropped.
    pub fn new(
        ids: Vec<i64>,
        observacoes: &BTreeMap<i64, String>,
    ) -> Result<Self, ValidationError> {
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection);
        }

        let observacoes = observacoes
            .iter()
            .filter(|(id, text)| ids.contains(id) && !text.trim().is_empty())
            .map(|(id, text)| (id.to_string(), text.trim().to_string()))
            .collect();

        Ok(Self {
            comissoes_ids: ids,
            observacoes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalRequest {
    pub comissoes_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacoes: Option<String>,
}

impl ApprovalRequest {
    pub fn new(ids: Vec<i64>, observacoes: Option<&str>) -> Result<Self, ValidationError> {
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(Self {
            comissoes_ids: ids,
            observacoes: observacoes
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionRequest {
    pub comissoes_ids: Vec<i64>,
    pub motivo: String,
}

impl RejectionRequest {
    pub fn new(ids: Vec<i64>, motivo: &str) -> Result<Self, ValidationError> {
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        let motivo = motivo.trim();
        if motivo.is_empty() {
            return Err(ValidationError::MissingRejectionReason);
        }
        Ok(Self {
            comissoes_ids: ids,
            motivo: motivo.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUser {
    pub username: String,
    pub senha: String,
    pub nome_completo: String,
    pub perfil: String,
    pub is_admin: bool,
}

impl NewUser {
    /// Username is stored lower-cased; an empty profile becomes the default.
    pub fn new(
        username: &str,
        senha: &str,
        nome_completo: &str,
        perfil: Option<&str>,
        is_admin: bool,
    ) -> Result<Self, ValidationError> {
        let username = username.trim().to_lowercase();
        let nome_completo = nome_completo.trim();
        if username.is_empty() || senha.is_empty() || nome_completo.is_empty() {
            return Err(ValidationError::MissingRequiredFields);
        }

        let perfil = match perfil.map(str::trim).filter(|perfil| !perfil.is_empty()) {
            Some(raw) => User::parse_profile(raw)?,
            None => User::DEFAULT_PROFILE,
        };

        Ok(Self {
            username,
            senha: senha.to_string(),
            nome_completo: nome_completo.to_string(),
            perfil: perfil.to_string(),
            is_admin,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDraft {
    pub nome: String,
    pub descricao: Option<String>,
    pub tipo: RuleKind,
    pub percentual: f64,
    pub percentual_auditoria: f64,
    pub inclui_itbi: bool,
}

impl RuleDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nome.trim().is_empty() {
            return Err(ValidationError::MissingRequiredFields);
        }
        if !(self.percentual > 0.0 && self.percentual <= 100.0) {
            return Err(ValidationError::PercentageOutOfRange {
                field: "Percentual",
            });
        }
        if !(0.0..=100.0).contains(&self.percentual_auditoria) {
            return Err(ValidationError::PercentageOutOfRange {
                field: "Percentual de auditoria",
            });
        }
        Ok(())
    }
}

pub fn validate_email_list(emails: &[String]) -> Result<Vec<String>, ValidationError> {
    emails
        .iter()
        .map(|email| email.trim())
        .filter(|email| !email.is_empty())
        .map(|email| {
            if looks_like_email(email) {
                Ok(email.to_string())
            } else {
                Err(ValidationError::InvalidEmail(email.to_string()))
            }
        })
        .collect()
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Email list kinds travel in the URL path, so they are limited to
/// identifier characters.
pub fn validate_email_list_kind(tipo: &str) -> Result<&str, ValidationError> {
    let tipo = tipo.trim();
    let valid = !tipo.is_empty()
        && tipo
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(tipo)
    } else {
        Err(ValidationError::InvalidEmailListKind(tipo.to_string()))
    }
}
