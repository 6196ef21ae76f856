//! User-facing outcomes of controller actions.

use thiserror::Error;

use crate::api::{ApiError, MutationOutcome};
use crate::models::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Success => "alert-success",
            Self::Info => "alert-info",
            Self::Warning => "alert-warning",
            Self::Error => "alert-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Asks the operator to confirm a destructive action.
pub trait Confirm: Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Fixed texts shown for one kind of action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionMessages {
    pub success: &'static str,
    pub rejected: &'static str,
    pub unreachable: &'static str,
}

pub const SUBMIT_MESSAGES: ActionMessages = ActionMessages {
    success: "Comissões enviadas para aprovação!",
    rejected: "Erro ao enviar para aprovação",
    unreachable: "Erro de conexão ao enviar para aprovação",
};

pub const APPROVE_MESSAGES: ActionMessages = ActionMessages {
    success: "Comissões aprovadas com sucesso!",
    rejected: "Erro ao aprovar",
    unreachable: "Erro ao aprovar comissões",
};

pub const REJECT_MESSAGES: ActionMessages = ActionMessages {
    success: "Comissões rejeitadas",
    rejected: "Erro ao rejeitar",
    unreachable: "Erro ao rejeitar comissões",
};

pub const SETTINGS_MESSAGES: ActionMessages = ActionMessages {
    success: "Configuração salva",
    rejected: "Erro ao salvar configuração",
    unreachable: "Erro de conexão ao salvar configuração",
};

pub const SYNC_MESSAGES: ActionMessages = ActionMessages {
    success: "Dados sincronizados com sucesso!",
    rejected: "Erro na sincronização",
    unreachable: "Erro na sincronização",
};

impl ActionMessages {
    pub fn success_notice(&self, outcome: &MutationOutcome) -> Notice {
        Notice::success(outcome.message_or(self.success))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("action cancelled by the operator")]
    Cancelled,
    #[error("{}: {source}", .messages.rejected)]
    Api {
        #[source]
        source: ApiError,
        messages: ActionMessages,
    },
}

impl ActionError {
    pub fn api(source: ApiError, messages: ActionMessages) -> Self {
        Self::Api { source, messages }
    }

    /// What to show the operator; a cancelled action shows nothing.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::Validation(err) => Some(Notice::error(err.to_string())),
            Self::Cancelled => None,
            Self::Api { source, messages } => Some(Notice::error(match source {
                ApiError::Fetch(_) => messages.unreachable,
                _ => source.server_message().unwrap_or(messages.rejected),
            })),
        }
    }
}
