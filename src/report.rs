//! Commission report: listing filtered by enterprise, broker, rule, audit
//! flag and period, with its total and CSV export. Read-only.

use std::sync::Arc;

use tracing::info;

use crate::api::{ApiError, ComissoesApi};
use crate::export::{commissions_csv, ExportError};
use crate::filters::{
    report_filter_panel, DateRange, FilterOption, FilterPanel, ReportQuery, BROKER_FILTER,
    ENTERPRISE_FILTER, RULE_FILTER,
};
use crate::models::Commission;
use crate::observability::log_section_failure;

pub struct CommissionReport {
    api: Arc<ComissoesApi>,
    filters: FilterPanel,
    period: DateRange,
    rows: Vec<Commission>,
}

impl CommissionReport {
    pub fn new(api: Arc<ComissoesApi>) -> Self {
        Self {
            api,
            filters: report_filter_panel(),
            period: DateRange::default(),
            rows: Vec::new(),
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

    pub fn query(&self) -> ReportQuery {
        ReportQuery::from_panel(&self.filters, self.period)
    }

    /// Loads the three option lists concurrently. A failed list leaves its
    /// group empty and is logged; the others are still filled. Returns how
    /// many lists loaded.
    pub async fn load_options(&mut self) -> usize {
        let api = &self.api;
        let (enterprises, brokers, rules) =
            tokio::join!(api.enterprises(), api.brokers(), api.rules());

        let enterprises = options("empreendimentos", enterprises, |items| {
            items
                .iter()
                .filter_map(|item| {
                    item.lookup_id()
                        .map(|id| FilterOption::new(id, item.nome.clone()))
                })
                .collect()
        });
        let brokers = options("corretores", brokers, |items| {
            items
                .iter()
                .filter_map(|item| {
                    item.lookup_id()
                        .map(|id| FilterOption::new(id, item.nome.clone()))
                })
                .collect()
        });
        let rules = options("regras", rules, |items| {
            items
                .iter()
                .map(|rule| FilterOption::new(rule.id.to_string(), rule.nome.clone()))
                .collect()
        });

        let mut loaded = 0;
        for (name, list) in [
            (ENTERPRISE_FILTER, enterprises),
            (BROKER_FILTER, brokers),
            (RULE_FILTER, rules),
        ] {
            if let (Some(list), Some(group)) = (list, self.filters.group_mut(name)) {
                group.set_options(list);
                loaded += 1;
            }
        }
        loaded
    }

    pub async fn search(&mut self) -> Result<usize, ApiError> {
        self.rows = self.api.commission_report(&self.query()).await?;
        info!(
            component = "report",
            event = "report.search",
            rows = self.rows.len()
        );
        Ok(self.rows.len())
    }

    /// Sum of the commission values; rows without a value count as zero.
    pub fn total_value(&self) -> f64 {
        self.rows
            .iter()
            .filter_map(|row| row.commission_value)
            .sum()
    }

    pub fn export_csv(&self) -> Result<Vec<u8>, ExportError> {
        commissions_csv(&self.rows)
    }
}

fn options<T>(
    section: &'static str,
    result: Result<Vec<T>, ApiError>,
    build: impl FnOnce(&[T]) -> Vec<FilterOption>,
) -> Option<Vec<FilterOption>> {
    match result {
        Ok(items) => Some(build(&items)),
        Err(err) => {
            log_section_failure("report", section, &err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fetch::test_support::{RecordingSleeper, RoutedTransport};
    use crate::fetch::RetryPolicy;
    use crate::filters::AUDIT_FILTER;

    fn report(transport: Arc<RoutedTransport>) -> CommissionReport {
        let api = ComissoesApi::new(
            transport,
            Arc::new(RecordingSleeper::default()),
            RetryPolicy::single_attempt(),
        );
        CommissionReport::new(Arc::new(api))
    }

    fn option_values(report: &CommissionReport, name: &str) -> Vec<String> {
        report
            .filters()
            .group(name)
            .unwrap()
            .options()
            .iter()
            .map(|option| option.value.clone())
            .collect()
    }

    #[tokio::test]
    async fn failed_option_list_leaves_the_others_loaded() {
        let transport = Arc::new(
            RoutedTransport::default()
                .route(
                    "/api/empreendimentos",
                    200,
                    json!([{"id": 1, "sienge_id": 2001, "nome": "Residencial Sol"}, {"nome": "Sem id"}]),
                )
                .route(
                    "/api/regras-gatilho",
                    200,
                    json!([{"id": 7, "nome": "Padrão", "tipo": "gatilho"}]),
                ),
        );
        let mut report = report(transport);

        assert_eq!(report.load_options().await, 2);

        assert_eq!(option_values(&report, ENTERPRISE_FILTER), vec!["2001"]);
        assert!(option_values(&report, BROKER_FILTER).is_empty());
        assert_eq!(option_values(&report, RULE_FILTER), vec!["7"]);
        assert_eq!(option_values(&report, AUDIT_FILTER), vec!["true", "false"]);
    }

    #[tokio::test]
    async fn search_sends_report_filters_and_sums_values() {
        let transport = Arc::new(
            RoutedTransport::default()
                .route("/api/regras-gatilho", 200, json!([{"id": 7, "nome": "Padrão"}]))
                .route(
                    "/api/comissoes/listar",
                    200,
                    json!({"sucesso": true, "comissoes": [
                        {"id": 1, "commission_value": 1500.5},
                        {"id": 2, "commission_value": "250,25"},
                        {"id": 3}
                    ]}),
                ),
        );
        let mut report = report(transport.clone());
        report.load_options().await;
        report.filters_mut().group_mut(RULE_FILTER).unwrap().select("7");
        report.filters_mut().group_mut(AUDIT_FILTER).unwrap().select("true");

        assert_eq!(report.search().await.unwrap(), 3);

        let sent = transport
            .seen()
            .into_iter()
            .find(|request| request.path == "/api/comissoes/listar")
            .unwrap();
        assert_eq!(sent.query_value("regra"), Some("7"));
        assert_eq!(sent.query_value("auditoria"), Some("true"));
        assert!((report.total_value() - 1750.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_report_has_nothing_to_export() {
        let transport = Arc::new(RoutedTransport::default().route(
            "/api/comissoes/listar",
            200,
            json!({"sucesso": true, "comissoes": []}),
        ));
        let mut report = report(transport);

        report.search().await.unwrap();

        assert!(matches!(report.export_csv(), Err(ExportError::Empty)));
        assert_eq!(report.total_value(), 0.0);
    }
}
