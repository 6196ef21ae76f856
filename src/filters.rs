//! Multi-select filter groups and the query strings built from them.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::models::ValidationError;
use crate::status::{translate_installment_status, APPROVAL_STATUSES};

pub const INSTALLMENT_FILTER: &str = "status_parcela";
pub const TRIGGER_FILTER: &str = "gatilho_atingido";
pub const APPROVAL_FILTER: &str = "status_aprovacao";
pub const ENTERPRISE_FILTER: &str = "empreendimento";
pub const BROKER_FILTER: &str = "corretor";
pub const RULE_FILTER: &str = "regra";
pub const AUDIT_FILTER: &str = "auditoria";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// A named checkbox group. Selection is kept as a set of option values and
/// always reported in option order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelect {
    name: String,
    label: String,
    options: Vec<FilterOption>,
    selected: HashSet<String>,
}

impl MultiSelect {
    pub fn new(name: impl Into<String>, label: impl Into<String>, options: Vec<FilterOption>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            options,
            selected: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn options(&self) -> &[FilterOption] {
        &self.options
    }

    /// Replaces the options, dropping selected values that no longer exist.
    pub fn set_options(&mut self, options: Vec<FilterOption>) {
        self.selected
            .retain(|value| options.iter().any(|option| &option.value == value));
        self.options = options;
    }

    pub fn select(&mut self, value: &str) -> bool {
        if !self.has_option(value) {
            return false;
        }
        self.selected.insert(value.to_string());
        true
    }

    pub fn deselect(&mut self, value: &str) {
        self.selected.remove(value);
    }

    pub fn toggle(&mut self, value: &str) -> bool {
        if self.selected.remove(value) {
            false
        } else {
            self.select(value)
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.selected.contains(value)
    }

    pub fn selected_values(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter(|option| self.selected.contains(&option.value))
            .map(|option| option.value.as_str())
            .collect()
    }

    /// Button caption: `Todos`, the single label, or `<n> selecionados`.
    pub fn summary(&self) -> String {
        let chosen: Vec<&FilterOption> = self
            .options
            .iter()
            .filter(|option| self.selected.contains(&option.value))
            .collect();

        match chosen.as_slice() {
            [] => "Todos".to_string(),
            [only] => only.label.clone(),
            many => format!("{} selecionados", many.len()),
        }
    }

    fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }
}

/// Several groups where at most one dropdown is open at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterPanel {
    groups: Vec<MultiSelect>,
    open: Option<usize>,
}

impl FilterPanel {
    pub fn new(groups: Vec<MultiSelect>) -> Self {
        Self { groups, open: None }
    }

    pub fn groups(&self) -> &[MultiSelect] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut [MultiSelect] {
        &mut self.groups
    }

    pub fn group(&self, name: &str) -> Option<&MultiSelect> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut MultiSelect> {
        self.groups.iter_mut().find(|group| group.name == name)
    }

    pub fn toggle_open(&mut self, name: &str) {
        let idx = self.groups.iter().position(|group| group.name == name);
        self.open = if idx == self.open { None } else { idx };
    }

    pub fn open_group(&self) -> Option<&str> {
        self.open
            .and_then(|idx| self.groups.get(idx))
            .map(|group| group.name.as_str())
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.open_group() == Some(name)
    }

    pub fn clear(&mut self) {
        for group in &mut self.groups {
            group.clear();
        }
        self.open = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, ValidationError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ValidationError::InvertedDateRange);
            }
        }
        Ok(Self { start, end })
    }

    /// Parses `YYYY-MM-DD` form inputs; blank inputs are open ends.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ValidationError> {
        Self::new(parse_form_date(start)?, parse_form_date(end)?)
    }

    fn push_pairs(&self, pairs: &mut Vec<(String, String)>) {
        if let Some(start) = self.start {
            pairs.push(("data_inicio".to_string(), start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end {
            pairs.push(("data_fim".to_string(), end.format("%Y-%m-%d").to_string()));
        }
    }
}

fn parse_form_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ValidationError::InvalidDate(value.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommissionQuery {
    pub installment_statuses: Vec<String>,
    pub trigger_reached: Vec<String>,
    pub approval_statuses: Vec<String>,
    pub period: DateRange,
}

impl CommissionQuery {
    pub fn from_panel(panel: &FilterPanel, period: DateRange) -> Self {
        Self {
            installment_statuses: selected(panel, INSTALLMENT_FILTER),
            trigger_reached: selected(panel, TRIGGER_FILTER),
            approval_statuses: selected(panel, APPROVAL_FILTER),
            period,
        }
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_list(&mut pairs, INSTALLMENT_FILTER, &self.installment_statuses);
        push_list(&mut pairs, TRIGGER_FILTER, &self.trigger_reached);
        push_list(&mut pairs, APPROVAL_FILTER, &self.approval_statuses);
        self.period.push_pairs(&mut pairs);
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportQuery {
    pub enterprises: Vec<String>,
    pub brokers: Vec<String>,
    pub rules: Vec<String>,
    pub audit: Vec<String>,
    pub period: DateRange,
}

impl ReportQuery {
    pub fn from_panel(panel: &FilterPanel, period: DateRange) -> Self {
        Self {
            enterprises: selected(panel, ENTERPRISE_FILTER),
            brokers: selected(panel, BROKER_FILTER),
            rules: selected(panel, RULE_FILTER),
            audit: selected(panel, AUDIT_FILTER),
            period,
        }
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_list(&mut pairs, ENTERPRISE_FILTER, &self.enterprises);
        push_list(&mut pairs, BROKER_FILTER, &self.brokers);
        push_list(&mut pairs, RULE_FILTER, &self.rules);
        push_list(&mut pairs, AUDIT_FILTER, &self.audit);
        self.period.push_pairs(&mut pairs);
        pairs
    }
}

fn selected(panel: &FilterPanel, name: &str) -> Vec<String> {
    panel
        .group(name)
        .map(|group| {
            group
                .selected_values()
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn push_list(pairs: &mut Vec<(String, String)>, key: &str, values: &[String]) {
    let joined = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    if !joined.is_empty() {
        pairs.push((key.to_string(), joined));
    }
}

/// Options for the installment-status group from the raw tokens the API
/// reports: one option per translated label (first token wins), sorted by
/// label. Option values stay untranslated.
pub fn installment_options(tokens: &[String]) -> Vec<FilterOption> {
    let mut seen = HashSet::new();
    let mut options: Vec<FilterOption> = tokens
        .iter()
        .filter(|token| !token.trim().is_empty())
        .filter_map(|token| {
            let label = translate_installment_status(Some(token));
            seen.insert(label.clone())
                .then(|| FilterOption::new(token.clone(), label))
        })
        .collect();

    options.sort_by_cached_key(|option| collation_key(&option.label));
    options
}

pub fn trigger_options() -> Vec<FilterOption> {
    vec![FilterOption::new("true", "Sim"), FilterOption::new("false", "Não")]
}

pub fn approval_options() -> Vec<FilterOption> {
    APPROVAL_STATUSES
        .iter()
        .map(|status| FilterOption::new(status.label(), status.label()))
        .collect()
}

pub fn commission_filter_panel() -> FilterPanel {
    FilterPanel::new(vec![
        MultiSelect::new(INSTALLMENT_FILTER, "Status da parcela", Vec::new()),
        MultiSelect::new(TRIGGER_FILTER, "Gatilho atingido", trigger_options()),
        MultiSelect::new(APPROVAL_FILTER, "Status de aprovação", approval_options()),
    ])
}

/// Report groups. Enterprise, broker and rule options come from the API.
pub fn report_filter_panel() -> FilterPanel {
    FilterPanel::new(vec![
        MultiSelect::new(ENTERPRISE_FILTER, "Empreendimento", Vec::new()),
        MultiSelect::new(BROKER_FILTER, "Corretor", Vec::new()),
        MultiSelect::new(RULE_FILTER, "Regra", Vec::new()),
        MultiSelect::new(AUDIT_FILTER, "Auditoria", trigger_options()),
    ])
}

fn collation_key(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

pub fn split_values<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    raw.into_iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
