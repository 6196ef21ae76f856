//! Management queue: commissions awaiting approval, batch approve and
//! batch reject with a mandatory reason.

use std::sync::Arc;

use tracing::warn;

use crate::api::{ApiError, ComissoesApi};
use crate::models::{ApprovalRequest, Commission, RejectionRequest, ValidationError};
use crate::observability::{log_action, log_action_failed, log_section_failure, DashboardAction};
use crate::selection::Selection;
use crate::ui::{ActionError, Confirm, Notice, APPROVE_MESSAGES, REJECT_MESSAGES};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QueueStats {
    pub pending: usize,
    pub total_value: f64,
}

pub struct ApprovalQueue {
    api: Arc<ComissoesApi>,
    rows: Vec<Commission>,
    selection: Selection,
    reject_dialog_open: bool,
}

impl ApprovalQueue {
    pub fn new(api: Arc<ComissoesApi>) -> Self {
        Self {
            api,
            rows: Vec::new(),
            selection: Selection::new(),
            reject_dialog_open: false,
        }
    }

    pub fn rows(&self) -> &[Commission] {
        &self.rows
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Loads the queue. Rows the server sends in any other state are dropped.
    pub async fn load(&mut self) -> Result<usize, ApiError> {
        let rows = self.api.pending_approval().await?;
        let received = rows.len();
        self.rows = rows
            .into_iter()
            .filter(|row| row.approval_status().is_awaiting_approval())
            .collect();
        if self.rows.len() != received {
            warn!(
                component = "approval",
                event = "approval.rows.discarded",
                discarded = received - self.rows.len()
            );
        }
        self.selection.reset();
        Ok(self.rows.len())
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.rows.len(),
            total_value: self
                .rows
                .iter()
                .filter_map(|row| row.commission_value)
                .sum(),
        }
    }

    /// Sum of the commission values currently selected.
    pub fn selected_value(&self) -> f64 {
        self.rows
            .iter()
            .filter(|row| self.selection.contains(row.id))
            .filter_map(|row| row.commission_value)
            .sum()
    }

    pub fn toggle(&mut self, id: i64) -> bool {
        if !self.rows.iter().any(|row| row.id == id) {
            return false;
        }
        self.selection.toggle(id)
    }

    pub fn select(&mut self, id: i64) -> bool {
        if !self.rows.iter().any(|row| row.id == id) {
            return false;
        }
        self.selection.select(id);
        true
    }

    pub fn select_all(&mut self, on: bool) {
        if on {
            let ids: Vec<i64> = self.rows.iter().map(|row| row.id).collect();
            self.selection.select_only(ids);
        } else {
            self.selection.clear();
        }
    }

    pub async fn approve(
        &mut self,
        confirm: &dyn Confirm,
        observacoes: Option<&str>,
    ) -> Result<Notice, ActionError> {
        if self.selection.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        let prompt = format!(
            "Confirma a aprovação de {} comissão(ões)?",
            self.selection.len()
        );
        if !confirm.confirm(&prompt) {
            return Err(ActionError::Cancelled);
        }

        let request = ApprovalRequest::new(self.selection.ids().to_vec(), observacoes)?;
        let outcome = self.api.approve(&request).await.map_err(|err| {
            log_action_failed(DashboardAction::Approve, request.comissoes_ids.len(), &err);
            ActionError::api(err, APPROVE_MESSAGES)
        })?;

        log_action(DashboardAction::Approve, request.comissoes_ids.len());
        self.after_decision().await;
        Ok(APPROVE_MESSAGES.success_notice(&outcome))
    }

    pub fn open_reject_dialog(&mut self) -> Result<(), ValidationError> {
        if self.selection.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        self.reject_dialog_open = true;
        Ok(())
    }

    pub fn close_reject_dialog(&mut self) {
        self.reject_dialog_open = false;
    }

    pub fn is_reject_dialog_open(&self) -> bool {
        self.reject_dialog_open
    }

    /// A blank reason is refused before anything is sent.
    pub async fn reject(&mut self, reason: &str) -> Result<Notice, ActionError> {
        let request = RejectionRequest::new(self.selection.ids().to_vec(), reason)?;
        let outcome = self.api.reject(&request).await.map_err(|err| {
            log_action_failed(DashboardAction::Reject, request.comissoes_ids.len(), &err);
            ActionError::api(err, REJECT_MESSAGES)
        })?;

        log_action(DashboardAction::Reject, request.comissoes_ids.len());
        self.after_decision().await;
        Ok(REJECT_MESSAGES.success_notice(&outcome))
    }

    async fn after_decision(&mut self) {
        self.selection.reset();
        self.reject_dialog_open = false;
        if let Err(err) = self.load().await {
            log_section_failure("approval", "pendentes_aprovacao", &err);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::test_support::scripted_api;
    use crate::fetch::test_support::ScriptedTransport;

    fn queue_body() -> serde_json::Value {
        json!({
            "sucesso": true,
            "comissoes": [
                {"id": 10, "status_aprovacao": "Pendente de Aprovação", "commission_value": 1500.5},
                {"id": 11, "status_aprovacao": "Pendente de Aprovação", "commission_value": "2.000,00"},
                {"id": 12, "status_aprovacao": "Aprovada", "commission_value": 999}
            ],
            "total": 3
        })
    }

    async fn loaded_queue(transport: &ScriptedTransport) -> ApprovalQueue {
        let mut queue = ApprovalQueue::new(Arc::new(scripted_api(transport)));
        queue.load().await.unwrap();
        queue
    }

    #[tokio::test]
    async fn load_keeps_only_awaiting_rows_and_computes_stats() {
        let transport = ScriptedTransport::new().respond(200, queue_body());
        let queue = loaded_queue(&transport).await;

        assert_eq!(queue.rows().len(), 2);
        assert_eq!(
            queue.stats(),
            QueueStats {
                pending: 2,
                total_value: 3500.5
            }
        );
    }

    #[tokio::test]
    async fn approve_needs_selection_and_confirmation() {
        let transport = ScriptedTransport::new().respond(200, queue_body());
        let mut queue = loaded_queue(&transport).await;

        let err = queue.approve(&|_: &str| true, None).await.unwrap_err();
        assert_eq!(err, ActionError::Validation(ValidationError::EmptySelection));

        queue.toggle(10);
        let err = queue.approve(&|_: &str| false, None).await.unwrap_err();
        assert_eq!(err, ActionError::Cancelled);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn approve_posts_ids_and_reloads() {
        let transport = ScriptedTransport::new()
            .respond(200, queue_body())
            .respond(200, json!({"sucesso": true, "mensagem": "2 comissões aprovadas"}))
            .respond(200, json!({"sucesso": true, "comissoes": []}));
        let mut queue = loaded_queue(&transport).await;
        queue.select_all(true);
        assert_eq!(queue.selected_value(), 3500.5);

        let notice = queue
            .approve(&|_: &str| true, Some("liberado pela diretoria"))
            .await
            .unwrap();

        assert_eq!(notice.message, "2 comissões aprovadas");
        let requests = transport.requests();
        assert_eq!(
            requests[1].body,
            Some(json!({"comissoes_ids": [10, 11], "observacoes": "liberado pela diretoria"}))
        );
        assert_eq!(requests[2].path, "/api/comissoes/pendentes-aprovacao");
        assert!(queue.selection().is_empty());
        assert_eq!(queue.stats().pending, 0);
    }

    #[tokio::test]
    async fn reject_dialog_requires_selection() {
        let transport = ScriptedTransport::new().respond(200, queue_body());
        let mut queue = loaded_queue(&transport).await;

        assert_eq!(queue.open_reject_dialog(), Err(ValidationError::EmptySelection));
        assert!(!queue.is_reject_dialog_open());

        queue.toggle(11);
        queue.open_reject_dialog().unwrap();
        assert!(queue.is_reject_dialog_open());
    }

    #[tokio::test]
    async fn blank_reason_is_blocked_client_side() {
        let transport = ScriptedTransport::new().respond(200, queue_body());
        let mut queue = loaded_queue(&transport).await;
        queue.toggle(11);
        queue.open_reject_dialog().unwrap();

        let err = queue.reject("   ").await.unwrap_err();

        assert_eq!(
            err,
            ActionError::Validation(ValidationError::MissingRejectionReason)
        );
        assert_eq!(transport.requests().len(), 1);
        assert!(queue.is_reject_dialog_open());
    }

    #[tokio::test]
    async fn failed_reject_keeps_selection_and_dialog() {
        let transport = ScriptedTransport::new()
            .respond(200, queue_body())
            .respond(400, json!({"sucesso": false, "mensagem": "Erro: timeout"}));
        let mut queue = loaded_queue(&transport).await;
        queue.toggle(10);
        queue.open_reject_dialog().unwrap();

        let err = queue.reject("valor incorreto").await.unwrap_err();

        assert_eq!(err.notice().unwrap().message, "Erro: timeout");
        assert_eq!(queue.selection().ids(), &[10]);
        assert!(queue.is_reject_dialog_open());
    }

    #[tokio::test]
    async fn successful_reject_closes_dialog() {
        let transport = ScriptedTransport::new()
            .respond(200, queue_body())
            .respond(200, json!({"sucesso": true}))
            .respond(200, queue_body());
        let mut queue = loaded_queue(&transport).await;
        queue.toggle(10);
        queue.open_reject_dialog().unwrap();

        let notice = queue.reject("valor incorreto").await.unwrap();

        assert_eq!(notice, Notice::success("Comissões rejeitadas"));
        assert!(!queue.is_reject_dialog_open());
        assert!(queue.selection().is_empty());
    }
}
