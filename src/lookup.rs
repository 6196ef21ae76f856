//! Read-only lookups: by enterprise, by lot (search-as-you-type) and by broker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::api::{ApiError, ComissoesApi};
use crate::format::fix_name_spacing;
use crate::lote::lot_or_contract;
use crate::models::{Broker, BrokerContract, Contract, ContractInfo, Enterprise};

pub const LOT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const LOT_SEARCH_MIN_CHARS: usize = 2;

/// Entry of the contract selector: `Lote X - Cliente`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractOption {
    pub value: String,
    pub label: String,
    pub building_id: Option<String>,
}

impl ContractOption {
    pub fn from_contract(contract: &Contract, building_id: Option<&str>) -> Self {
        let lot = lot_or_contract(contract.unit(), &contract.numero_contrato);
        Self {
            value: contract.numero_contrato.clone(),
            label: format!(
                "{lot} - {}",
                fix_name_spacing(contract.nome_cliente.as_deref())
            ),
            building_id: building_id
                .map(str::to_string)
                .or_else(|| contract.building_id.clone()),
        }
    }
}

pub struct EnterpriseLookup {
    api: Arc<ComissoesApi>,
    enterprises: Vec<Enterprise>,
    building_id: Option<String>,
    contracts: Vec<ContractOption>,
    info: Option<ContractInfo>,
}

impl EnterpriseLookup {
    pub fn new(api: Arc<ComissoesApi>) -> Self {
        Self {
            api,
            enterprises: Vec::new(),
            building_id: None,
            contracts: Vec::new(),
            info: None,
        }
    }

    pub fn enterprises(&self) -> &[Enterprise] {
        &self.enterprises
    }

    pub fn contracts(&self) -> &[ContractOption] {
        &self.contracts
    }

    pub fn info(&self) -> Option<&ContractInfo> {
        self.info.as_ref()
    }

    pub async fn load_enterprises(&mut self) -> Result<usize, ApiError> {
        self.enterprises = self.api.enterprises().await?;
        Ok(self.enterprises.len())
    }

    /// Picks an enterprise and loads its contracts; an empty id clears both
    /// the contract list and the shown contract.
    pub async fn select_enterprise(&mut self, building_id: &str) -> Result<usize, ApiError> {
        self.contracts.clear();
        self.info = None;
        let building_id = building_id.trim();
        if building_id.is_empty() {
            self.building_id = None;
            return Ok(0);
        }

        self.building_id = Some(building_id.to_string());
        let contracts = self.api.contracts(building_id).await?;
        self.contracts = contracts
            .iter()
            .map(|contract| ContractOption::from_contract(contract, Some(building_id)))
            .collect();
        Ok(self.contracts.len())
    }

    /// Loads the detail card. Without an enterprise or contract nothing is shown.
    pub async fn select_contract(
        &mut self,
        numero_contrato: &str,
    ) -> Result<Option<&ContractInfo>, ApiError> {
        self.info = None;
        let numero_contrato = numero_contrato.trim();
        let Some(building_id) = self.building_id.as_deref() else {
            return Ok(None);
        };
        if numero_contrato.is_empty() {
            return Ok(None);
        }

        let info = self.api.contract_info(numero_contrato, building_id).await?;
        Ok(Some(&*self.info.insert(info)))
    }
}

/// One autocomplete entry of the lot search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotSuggestion {
    pub numero_contrato: String,
    pub building_id: Option<String>,
    pub lot_label: String,
    pub customer: String,
    pub enterprise: Option<String>,
}

impl LotSuggestion {
    pub fn from_contract(contract: &Contract) -> Self {
        Self {
            numero_contrato: contract.numero_contrato.clone(),
            building_id: contract.building_id.clone(),
            lot_label: lot_or_contract(contract.unit(), &contract.numero_contrato),
            customer: fix_name_spacing(contract.nome_cliente.as_deref()),
            enterprise: contract.enterprise_name().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LotSearchOutcome {
    /// Query shorter than the minimum; the result list should be hidden.
    TooShort,
    /// A newer search started; this result must not be shown.
    Superseded,
    Results(Vec<LotSuggestion>),
}

/// Debounced search-as-you-type. Every call takes a generation number and
/// only the newest generation may publish results.
pub struct LotSearch {
    api: Arc<ComissoesApi>,
    debounce: Duration,
    generation: AtomicU64,
}

impl LotSearch {
    pub fn new(api: Arc<ComissoesApi>) -> Self {
        Self::with_debounce(api, LOT_SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(api: Arc<ComissoesApi>, debounce: Duration) -> Self {
        Self {
            api,
            debounce,
            generation: AtomicU64::new(0),
        }
    }

    pub async fn search(&self, query: &str) -> Result<LotSearchOutcome, ApiError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();
        if query.chars().count() < LOT_SEARCH_MIN_CHARS {
            return Ok(LotSearchOutcome::TooShort);
        }

        tokio::time::sleep(self.debounce).await;
        if self.is_stale(generation) {
            debug!(component = "lookup", event = "lot_search.debounced", generation);
            return Ok(LotSearchOutcome::Superseded);
        }

        let contracts = self.api.search_lots(query).await?;
        if self.is_stale(generation) {
            debug!(component = "lookup", event = "lot_search.stale", generation);
            return Ok(LotSearchOutcome::Superseded);
        }

        Ok(LotSearchOutcome::Results(
            contracts.iter().map(LotSuggestion::from_contract).collect(),
        ))
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}

pub struct BrokerLookup {
    api: Arc<ComissoesApi>,
    brokers: Vec<Broker>,
    selected: Option<Broker>,
    contracts: Vec<BrokerContract>,
}

impl BrokerLookup {
    pub fn new(api: Arc<ComissoesApi>) -> Self {
        Self {
            api,
            brokers: Vec::new(),
            selected: None,
            contracts: Vec::new(),
        }
    }

    pub fn brokers(&self) -> &[Broker] {
        &self.brokers
    }

    pub fn selected(&self) -> Option<&Broker> {
        self.selected.as_ref()
    }

    pub fn contracts(&self) -> &[BrokerContract] {
        &self.contracts
    }

    pub async fn load_brokers(&mut self) -> Result<usize, ApiError> {
        self.brokers = self.api.brokers().await?;
        Ok(self.brokers.len())
    }

    /// Loads the contracts of the broker whose lookup id is `id`. The
    /// endpoint matches on id or name, so both are sent.
    pub async fn select_broker(&mut self, id: &str) -> Result<usize, ApiError> {
        self.contracts.clear();
        self.selected = self
            .brokers
            .iter()
            .find(|broker| broker.lookup_id() == Some(id.trim()))
            .cloned();
        let Some(broker) = &self.selected else {
            return Ok(0);
        };

        let nome = Some(broker.nome.as_str()).filter(|nome| !nome.is_empty());
        self.contracts = self.api.broker_contracts(broker.lookup_id(), nome).await?;
        Ok(self.contracts.len())
    }
}
