//! Installment and approval status canonicalization.
//!
//! Raw tokens from the ERP (English or Portuguese, any case, `_` or spaces)
//! collapse into enumerated statuses through one function per family. Labels
//! and badges are derived from the enum, so display never re-scans strings.
//!
//! Containment matching is substring based: the longest known key found in
//! the normalized token wins, and among equally long keys the one that starts
//! first. Table order never decides the outcome.

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Badge {
    Success,
    Danger,
    Warning,
    Info,
    Secondary,
}

impl Badge {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Success => "badge-success",
            Self::Danger => "badge-danger",
            Self::Warning => "badge-warning",
            Self::Info => "badge-info",
            Self::Secondary => "badge-secondary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallmentKind {
    AwaitingAuthorization,
    AwaitingRelease,
    Released,
    Paid,
    Pending,
    Overdue,
    Cancelled,
    Active,
    Open,
    Partial,
    Processing,
    Approved,
    Rejected,
    Waiting,
    Completed,
    Due,
    Scheduled,
}

impl InstallmentKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::AwaitingAuthorization => "Aguardando Autorização",
            Self::AwaitingRelease => "Aguardando Liberação",
            Self::Released => "Liberado",
            Self::Paid => "Pago",
            Self::Pending => "Pendente",
            Self::Overdue => "Vencido",
            Self::Cancelled => "Cancelado",
            Self::Active => "Ativo",
            Self::Open => "Aberto",
            Self::Partial => "Parcial",
            Self::Processing => "Processando",
            Self::Approved => "Aprovado",
            Self::Rejected => "Rejeitado",
            Self::Waiting => "Aguardando",
            Self::Completed => "Concluído",
            Self::Due => "A Vencer",
            Self::Scheduled => "Agendado",
        }
    }

    pub fn badge(self) -> Badge {
        match self {
            Self::Paid | Self::Completed => Badge::Success,
            Self::Overdue | Self::Cancelled | Self::Rejected => Badge::Danger,
            Self::AwaitingAuthorization
            | Self::AwaitingRelease
            | Self::Pending
            | Self::Waiting
            | Self::Partial
            | Self::Processing => Badge::Warning,
            Self::Open | Self::Active | Self::Due | Self::Scheduled => Badge::Info,
            Self::Released | Self::Approved => Badge::Secondary,
        }
    }
}

const INSTALLMENT_KEYS: &[(&str, InstallmentKind)] = &[
    ("awaiting authorization", InstallmentKind::AwaitingAuthorization),
    ("awaiting release", InstallmentKind::AwaitingRelease),
    ("released", InstallmentKind::Released),
    ("paidout", InstallmentKind::Paid),
    ("paid out", InstallmentKind::Paid),
    ("paid", InstallmentKind::Paid),
    ("pago", InstallmentKind::Paid),
    ("settled", InstallmentKind::Paid),
    ("liquidado", InstallmentKind::Paid),
    ("pending", InstallmentKind::Pending),
    ("pendente", InstallmentKind::Pending),
    ("overdue", InstallmentKind::Overdue),
    ("vencido", InstallmentKind::Overdue),
    ("expired", InstallmentKind::Overdue),
    ("late", InstallmentKind::Overdue),
    ("atrasado", InstallmentKind::Overdue),
    ("cancelled", InstallmentKind::Cancelled),
    ("canceled", InstallmentKind::Cancelled),
    ("cancelado", InstallmentKind::Cancelled),
    ("active", InstallmentKind::Active),
    ("ativo", InstallmentKind::Active),
    ("open", InstallmentKind::Open),
    ("aberto", InstallmentKind::Open),
    ("opened", InstallmentKind::Open),
    ("partial", InstallmentKind::Partial),
    ("parcial", InstallmentKind::Partial),
    ("partially", InstallmentKind::Partial),
    ("partially paid", InstallmentKind::Partial),
    ("processing", InstallmentKind::Processing),
    ("processando", InstallmentKind::Processing),
    ("in progress", InstallmentKind::Processing),
    ("em andamento", InstallmentKind::Processing),
    ("approved", InstallmentKind::Approved),
    ("aprovado", InstallmentKind::Approved),
    ("rejected", InstallmentKind::Rejected),
    ("rejeitado", InstallmentKind::Rejected),
    ("denied", InstallmentKind::Rejected),
    ("negado", InstallmentKind::Rejected),
    ("waiting", InstallmentKind::Waiting),
    ("aguardando", InstallmentKind::Waiting),
    ("on hold", InstallmentKind::Waiting),
    ("completed", InstallmentKind::Completed),
    ("concluido", InstallmentKind::Completed),
    ("concluído", InstallmentKind::Completed),
    ("complete", InstallmentKind::Completed),
    ("done", InstallmentKind::Completed),
    ("finalizado", InstallmentKind::Completed),
    ("due", InstallmentKind::Due),
    ("a vencer", InstallmentKind::Due),
    ("not due", InstallmentKind::Due),
    ("scheduled", InstallmentKind::Scheduled),
    ("agendado", InstallmentKind::Scheduled),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstallmentStatus {
    Missing,
    Known(InstallmentKind),
    Unrecognized(String),
}

impl InstallmentStatus {
    pub fn canonicalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Missing;
        };

        let normalized = normalize(raw);
        if normalized.is_empty() {
            return Self::Missing;
        }

        let exact = INSTALLMENT_KEYS.iter().find(|(key, _)| *key == normalized);
        match exact.map(|(_, kind)| *kind).or_else(|| longest_contained(&normalized, INSTALLMENT_KEYS)) {
            Some(kind) => Self::Known(kind),
            None => Self::Unrecognized(raw.trim().to_string()),
        }
    }

    pub fn label(&self) -> Cow<'static, str> {
        match self {
            Self::Missing => Cow::Borrowed("Não informado"),
            Self::Known(kind) => Cow::Borrowed(kind.label()),
            Self::Unrecognized(raw) => Cow::Owned(title_case(raw)),
        }
    }

    pub fn badge(&self) -> Badge {
        match self {
            Self::Missing => Badge::Info,
            Self::Known(kind) => kind.badge(),
            Self::Unrecognized(_) => Badge::Secondary,
        }
    }
}

/// Display label for a raw installment token. Never empty.
pub fn translate_installment_status(raw: Option<&str>) -> String {
    InstallmentStatus::canonicalize(raw).label().into_owned()
}

fn normalize(raw: &str) -> String {
    raw.to_lowercase().replace('_', " ").trim().to_string()
}

fn longest_contained<K: Copy>(haystack: &str, keys: &[(&str, K)]) -> Option<K> {
    // (key length, start position, value)
    let mut best: Option<(usize, usize, K)> = None;
    for (key, value) in keys {
        let Some(start) = haystack.find(key) else {
            continue;
        };
        let len = key.chars().count();
        let better = match best {
            None => true,
            Some((best_len, best_start, _)) => len > best_len || (len == best_len && start < best_start),
        };
        if better {
            best = Some((len, start, *value));
        }
    }

    best.map(|(_, _, value)| value)
}

fn title_case(raw: &str) -> String {
    raw.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut out: String = first.to_uppercase().collect();
                    out.push_str(&chars.as_str().to_lowercase());
                    out
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApprovalStatus {
    Pending,
    AwaitingApproval,
    Approved,
    Rejected,
    Paid,
    Other(String),
}

#[derive(Debug, Clone, Copy)]
enum ApprovalKey {
    Pending,
    AwaitingApproval,
    Approved,
    Rejected,
    Paid,
}

const APPROVAL_KEYS: &[(&str, ApprovalKey)] = &[
    ("pendente de aprovação", ApprovalKey::AwaitingApproval),
    ("pendente de aprovacao", ApprovalKey::AwaitingApproval),
    ("pendente", ApprovalKey::Pending),
    ("aprovad", ApprovalKey::Approved),
    ("rejeitad", ApprovalKey::Rejected),
    ("pag", ApprovalKey::Paid),
];

pub const APPROVAL_STATUSES: [ApprovalStatus; 5] = [
    ApprovalStatus::Pending,
    ApprovalStatus::AwaitingApproval,
    ApprovalStatus::Approved,
    ApprovalStatus::Rejected,
    ApprovalStatus::Paid,
];

impl ApprovalStatus {
    /// A missing status means the commission was never submitted.
    pub fn canonicalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Self::Pending;
        };

        match longest_contained(&raw.to_lowercase(), APPROVAL_KEYS) {
            Some(ApprovalKey::Pending) => Self::Pending,
            Some(ApprovalKey::AwaitingApproval) => Self::AwaitingApproval,
            Some(ApprovalKey::Approved) => Self::Approved,
            Some(ApprovalKey::Rejected) => Self::Rejected,
            Some(ApprovalKey::Paid) => Self::Paid,
            None => Self::Other(raw.to_string()),
        }
    }

    /// Token the API stores and filters on.
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "Pendente",
            Self::AwaitingApproval => "Pendente de Aprovação",
            Self::Approved => "Aprovada",
            Self::Rejected => "Rejeitada",
            Self::Paid => "Paga",
            Self::Other(raw) => raw,
        }
    }

    pub fn badge(&self) -> Badge {
        match self {
            Self::Approved => Badge::Success,
            Self::AwaitingApproval => Badge::Warning,
            Self::Rejected => Badge::Danger,
            Self::Paid => Badge::Info,
            Self::Pending | Self::Other(_) => Badge::Secondary,
        }
    }

    pub fn is_submittable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_awaiting_approval(&self) -> bool {
        matches!(self, Self::AwaitingApproval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_is_case_and_underscore_insensitive() {
        assert_eq!(translate_installment_status(Some("PAID_OUT")), "Pago");
        assert_eq!(translate_installment_status(Some("Awaiting_Authorization")), "Aguardando Autorização");
        assert_eq!(translate_installment_status(Some("  pending ")), "Pendente");
    }

    #[test]
    fn unknown_tokens_are_title_cased() {
        assert_eq!(translate_installment_status(Some("unknown_status")), "Unknown Status");
        assert_eq!(translate_installment_status(Some("REFINANCED")), "Refinanced");
    }

    #[test]
    fn missing_or_blank_is_never_empty() {
        assert_eq!(translate_installment_status(None), "Não informado");
        assert_eq!(translate_installment_status(Some("   ")), "Não informado");
        assert_eq!(translate_installment_status(Some("__")), "Não informado");
    }

    #[test]
    fn containment_prefers_longest_key() {
        assert_eq!(translate_installment_status(Some("partially paid")), "Parcial");
        assert_eq!(translate_installment_status(Some("installment partially paid today")), "Parcial");
        assert_eq!(translate_installment_status(Some("status: not due yet")), "A Vencer");
    }

    #[test]
    fn containment_ties_go_to_earliest_word() {
        assert_eq!(translate_installment_status(Some("late but paid")), "Vencido");
        assert_eq!(translate_installment_status(Some("paid but late")), "Pago");
    }

    #[test]
    fn keys_match_inside_camel_case_tokens() {
        assert_eq!(translate_installment_status(Some("LatePayment")), "Vencido");
        assert_eq!(translate_installment_status(Some("overdue30")), "Vencido");
        assert_eq!(translate_installment_status(Some("PartiallyPaid")), "Parcial");
        assert_eq!(translate_installment_status(Some("ProcessingRefund")), "Processando");

        let badge = |raw: &str| InstallmentStatus::canonicalize(Some(raw)).badge();
        assert_eq!(badge("LatePayment"), Badge::Danger);
        assert_eq!(badge("overdue30"), Badge::Danger);
        assert_eq!(badge("PartiallyPaid"), Badge::Warning);
    }

    #[test]
    fn installment_badges_follow_canonical_kind() {
        let badge = |raw: &str| InstallmentStatus::canonicalize(Some(raw)).badge();
        assert_eq!(badge("PaidOut"), Badge::Success);
        assert_eq!(badge("concluído"), Badge::Success);
        assert_eq!(badge("overdue"), Badge::Danger);
        assert_eq!(badge("canceled"), Badge::Danger);
        assert_eq!(badge("awaiting_release"), Badge::Warning);
        assert_eq!(badge("partial"), Badge::Warning);
        assert_eq!(badge("open"), Badge::Info);
        assert_eq!(badge("scheduled"), Badge::Info);
        assert_eq!(badge("released"), Badge::Secondary);
        assert_eq!(badge("whatever"), Badge::Secondary);
        assert_eq!(InstallmentStatus::canonicalize(None).badge(), Badge::Info);
    }

    #[test]
    fn approval_status_canonicalization() {
        assert_eq!(ApprovalStatus::canonicalize(None), ApprovalStatus::Pending);
        assert_eq!(ApprovalStatus::canonicalize(Some("")), ApprovalStatus::Pending);
        assert_eq!(
            ApprovalStatus::canonicalize(Some("Pendente de aprovação")),
            ApprovalStatus::AwaitingApproval
        );
        assert_eq!(
            ApprovalStatus::canonicalize(Some("Pendente de Aprovação")),
            ApprovalStatus::AwaitingApproval
        );
        assert_eq!(ApprovalStatus::canonicalize(Some("APROVADA")), ApprovalStatus::Approved);
        assert_eq!(ApprovalStatus::canonicalize(Some("Paga")), ApprovalStatus::Paid);
        assert_eq!(
            ApprovalStatus::canonicalize(Some("Aprovada pela direção")),
            ApprovalStatus::Approved
        );
        assert_eq!(
            ApprovalStatus::canonicalize(Some("rejeitado pelo gestor")),
            ApprovalStatus::Rejected
        );
        assert_eq!(ApprovalStatus::canonicalize(Some("pago")), ApprovalStatus::Paid);
        assert_eq!(ApprovalStatus::canonicalize(Some("Pendente")), ApprovalStatus::Pending);
        assert_eq!(
            ApprovalStatus::canonicalize(Some("Em revisão")),
            ApprovalStatus::Other("Em revisão".to_string())
        );
    }

    #[test]
    fn only_pending_is_submittable() {
        for status in APPROVAL_STATUSES {
            assert_eq!(status.is_submittable(), status == ApprovalStatus::Pending);
        }
    }

    #[test]
    fn approval_badges() {
        assert_eq!(ApprovalStatus::Approved.badge(), Badge::Success);
        assert_eq!(ApprovalStatus::AwaitingApproval.badge(), Badge::Warning);
        assert_eq!(ApprovalStatus::Rejected.badge(), Badge::Danger);
        assert_eq!(ApprovalStatus::Paid.badge(), Badge::Info);
        assert_eq!(ApprovalStatus::Pending.badge(), Badge::Secondary);
        assert_eq!(Badge::Warning.css_class(), "badge-warning");
    }
}
