//! Manager view of the commission list: filters, selection and batch
//! submission for approval.

use std::sync::Arc;

use tracing::info;

use crate::api::{ApiError, ComissoesApi};
use crate::export::{commissions_csv, ExportError};
use crate::filters::{
    commission_filter_panel, installment_options, CommissionQuery, DateRange, FilterPanel,
    INSTALLMENT_FILTER,
};
use crate::models::{Commission, SubmissionRequest, ValidationError};
use crate::observability::{log_action, log_action_failed, log_section_failure, DashboardAction};
use crate::selection::Selection;
use crate::ui::{ActionError, Confirm, Notice, SUBMIT_MESSAGES};

pub struct CommissionBoard {
    api: Arc<ComissoesApi>,
    filters: FilterPanel,
    period: DateRange,
    rows: Vec<Commission>,
    selection: Selection,
}

impl CommissionBoard {
    pub fn new(api: Arc<ComissoesApi>) -> Self {
        Self {
            api,
            filters: commission_filter_panel(),
            period: DateRange::default(),
            rows: Vec::new(),
            selection: Selection::new(),
        }
    }

    pub fn filters(&self) -> &FilterPanel {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterPanel {
        &mut self.filters
    }

    pub fn period(&self) -> DateRange {
        self.period
    }

    pub fn set_period(&mut self, period: DateRange) {
        self.period = period;
    }

    pub fn rows(&self) -> &[Commission] {
        &self.rows
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn query(&self) -> CommissionQuery {
        CommissionQuery::from_panel(&self.filters, self.period)
    }

    /// Fills the installment-status group from the tokens present in the data.
    pub async fn load_installment_options(&mut self) -> Result<usize, ApiError> {
        let tokens = self.api.installment_statuses().await?;
        let options = installment_options(&tokens);
        let count = options.len();
        if let Some(group) = self.filters.group_mut(INSTALLMENT_FILTER) {
            group.set_options(options);
        }
        Ok(count)
    }

    /// Fetches with the current filters. Selection and observations refer
    /// to the previous rows, so both are dropped.
    pub async fn search(&mut self) -> Result<usize, ApiError> {
        let rows = self.api.commissions(&self.query()).await?;
        self.rows = rows;
        self.selection.reset();
        info!(
            component = "board",
            event = "board.search",
            rows = self.rows.len()
        );
        Ok(self.rows.len())
    }

    /// Only pending rows can be picked. Returns whether `id` is now selected.
    pub fn toggle(&mut self, id: i64) -> bool {
        if !self.is_selectable(id) {
            return false;
        }
        self.selection.toggle(id)
    }

    pub fn select(&mut self, id: i64) -> bool {
        if !self.is_selectable(id) {
            return false;
        }
        self.selection.select(id);
        true
    }

    /// Selects every pending row, or clears the selection.
    pub fn select_all(&mut self, on: bool) {
        if on {
            let ids: Vec<i64> = self
                .rows
                .iter()
                .filter(|row| row.is_submittable())
                .map(|row| row.id)
                .collect();
            self.selection.select_only(ids);
        } else {
            self.selection.clear();
        }
    }

    pub fn attach_observation(&mut self, id: i64, text: &str) {
        self.selection.observe(id, text);
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.period = DateRange::default();
    }

    /// Rows highlighted for the manager: pending with the trigger reached.
    pub fn attention_count(&self) -> usize {
        self.rows.iter().filter(|row| row.needs_attention()).count()
    }

    pub async fn submit_for_approval(&mut self, confirm: &dyn Confirm) -> Result<Notice, ActionError> {
        if self.selection.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        let prompt = format!(
            "Enviar {} comissão(ões) para aprovação da direção?",
            self.selection.len()
        );
        if !confirm.confirm(&prompt) {
            return Err(ActionError::Cancelled);
        }

        let request = SubmissionRequest::new(
            self.selection.ids().to_vec(),
            self.selection.observations(),
        )?;

        let outcome = self
            .api
            .submit_for_approval(&request)
            .await
            .map_err(|err| {
                log_action_failed(DashboardAction::Submit, request.comissoes_ids.len(), &err);
                ActionError::api(err, SUBMIT_MESSAGES)
            })?;

        log_action(DashboardAction::Submit, request.comissoes_ids.len());
        self.selection.reset();
        if let Err(err) = self.search().await {
            log_section_failure("board", "comissoes", &err);
        }

        Ok(SUBMIT_MESSAGES.success_notice(&outcome))
    }

    pub fn export_csv(&self) -> Result<Vec<u8>, ExportError> {
        commissions_csv(&self.rows)
    }

    fn is_selectable(&self, id: i64) -> bool {
        self.rows
            .iter()
            .any(|row| row.id == id && row.is_submittable())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::test_support::scripted_api;
    use crate::fetch::test_support::ScriptedTransport;
    use crate::filters::APPROVAL_FILTER;

    fn listing() -> serde_json::Value {
        json!({
            "sucesso": true,
            "comissoes": [
                {"id": 1, "status_aprovacao": "Pendente", "atingiu_gatilho": true, "commission_value": 1000},
                {"id": 2, "status_aprovacao": null, "atingiu_gatilho": false},
                {"id": 3, "status_aprovacao": "Aprovada", "atingiu_gatilho": true}
            ]
        })
    }

    async fn loaded_board(transport: &ScriptedTransport) -> CommissionBoard {
        let mut board = CommissionBoard::new(Arc::new(scripted_api(transport)));
        board.search().await.unwrap();
        board
    }

    #[tokio::test]
    async fn only_pending_rows_are_selectable() {
        let transport = ScriptedTransport::new().respond(200, listing());
        let mut board = loaded_board(&transport).await;

        assert!(board.toggle(1));
        assert!(board.toggle(2));
        assert!(!board.toggle(3));
        assert!(!board.toggle(99));
        assert_eq!(board.selection().ids(), &[1, 2]);
        assert_eq!(board.attention_count(), 1);

        board.select_all(false);
        assert!(board.selection().is_empty());
        board.select_all(true);
        assert_eq!(board.selection().ids(), &[1, 2]);
    }

    #[tokio::test]
    async fn search_sends_filters_and_resets_selection() {
        let transport = ScriptedTransport::new()
            .respond(200, listing())
            .respond(200, listing());
        let mut board = loaded_board(&transport).await;
        board.toggle(1);
        board.attach_observation(1, "ok");

        board
            .filters_mut()
            .group_mut(APPROVAL_FILTER)
            .unwrap()
            .select("Pendente");
        board.search().await.unwrap();

        assert!(board.selection().is_empty());
        assert!(board.selection().observations().is_empty());
        let sent = &transport.requests()[1];
        assert_eq!(sent.query_value("status_aprovacao"), Some("Pendente"));
    }

    #[tokio::test]
    async fn empty_selection_sends_nothing() {
        let transport = ScriptedTransport::new().respond(200, listing());
        let mut board = loaded_board(&transport).await;

        let err = board.submit_for_approval(&|_: &str| true).await.unwrap_err();

        assert_eq!(err, ActionError::Validation(ValidationError::EmptySelection));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn declined_confirmation_sends_nothing() {
        let transport = ScriptedTransport::new().respond(200, listing());
        let mut board = loaded_board(&transport).await;
        board.toggle(1);

        let err = board.submit_for_approval(&|_: &str| false).await.unwrap_err();

        assert_eq!(err, ActionError::Cancelled);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(board.selection().ids(), &[1]);
    }

    #[tokio::test]
    async fn successful_submission_posts_batch_clears_and_refetches() {
        let transport = ScriptedTransport::new()
            .respond(200, listing())
            .respond(200, json!({"sucesso": true, "mensagem": "2 comissões enviadas para aprovação"}))
            .respond(200, json!({"sucesso": true, "comissoes": []}));
        let mut board = loaded_board(&transport).await;
        board.toggle(1);
        board.toggle(2);
        board.attach_observation(2, "conferir unidade");

        let notice = board
            .submit_for_approval(&|prompt: &str| {
                assert!(prompt.contains("Enviar 2 comissão(ões)"));
                true
            })
            .await
            .unwrap();

        assert_eq!(notice, Notice::success("2 comissões enviadas para aprovação"));
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].path, "/api/comissoes/enviar-aprovacao");
        assert_eq!(
            requests[1].body,
            Some(json!({"comissoes_ids": [1, 2], "observacoes": {"2": "conferir unidade"}}))
        );
        assert_eq!(requests[2].path, "/api/comissoes/listar");
        assert!(board.selection().is_empty());
        assert!(board.rows().is_empty());
    }

    #[tokio::test]
    async fn rejected_submission_keeps_selection() {
        let transport = ScriptedTransport::new()
            .respond(200, listing())
            .respond(403, json!({"erro": "Apenas gestores podem enviar para aprovação"}));
        let mut board = loaded_board(&transport).await;
        board.toggle(2);

        let err = board.submit_for_approval(&|_: &str| true).await.unwrap_err();

        assert_eq!(
            err.notice().unwrap().message,
            "Apenas gestores podem enviar para aprovação"
        );
        assert_eq!(board.selection().ids(), &[2]);
    }

    #[tokio::test]
    async fn installment_options_load_from_api() {
        let transport = ScriptedTransport::new().respond(
            200,
            json!({"sucesso": true, "status": ["paid", "PaidOut", "overdue"]}),
        );
        let mut board = CommissionBoard::new(Arc::new(scripted_api(&transport)));

        assert_eq!(board.load_installment_options().await.unwrap(), 2);
        let group = board.filters().group(INSTALLMENT_FILTER).unwrap();
        assert_eq!(group.options()[0].value, "paid");
    }

    #[tokio::test]
    async fn clear_filters_resets_groups_and_period() {
        let transport = ScriptedTransport::new();
        let mut board = CommissionBoard::new(Arc::new(scripted_api(&transport)));
        board
            .filters_mut()
            .group_mut(APPROVAL_FILTER)
            .unwrap()
            .select("Aprovada");
        board.set_period(DateRange::parse(Some("2025-01-01"), None).unwrap());

        board.clear_filters();

        assert_eq!(board.query(), CommissionQuery::default());
    }
}
