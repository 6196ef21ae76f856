//! Configuration section: users, broker accounts, email notification lists,
//! commission rules and the manual data sync.

use std::sync::Arc;

use crate::api::{ApiError, ComissoesApi};
use crate::models::{
    validate_email_list, validate_email_list_kind, BrokerAccount, CommissionRule, EmailConfig,
    NewUser, RuleDraft, SyncLog, User,
};
use crate::observability::{log_action, log_action_failed, log_section_failure, DashboardAction};
use crate::ui::{ActionError, Confirm, Notice, SETTINGS_MESSAGES, SYNC_MESSAGES};

/// Tables shown on the settings page. `None` marks a section whose load
/// failed; the other sections are unaffected.
#[derive(Debug, Clone, Default)]
pub struct SettingsSnapshot {
    pub users: Option<Vec<User>>,
    pub broker_accounts: Option<Vec<BrokerAccount>>,
    pub email_configs: Option<Vec<EmailConfig>>,
    pub rules: Option<Vec<CommissionRule>>,
    pub last_sync: Option<SyncLog>,
}

pub struct SettingsPage {
    api: Arc<ComissoesApi>,
    snapshot: SettingsSnapshot,
}

impl SettingsPage {
    pub fn new(api: Arc<ComissoesApi>) -> Self {
        Self {
            api,
            snapshot: SettingsSnapshot::default(),
        }
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> SettingsSnapshot {
        self.snapshot
    }

    pub async fn load_all(&mut self) -> &SettingsSnapshot {
        let api = &self.api;
        let (users, broker_accounts, email_configs, rules, last_sync) = tokio::join!(
            api.users(),
            api.broker_accounts(),
            api.email_configs(),
            api.rules(),
            api.last_sync(),
        );

        self.snapshot = SettingsSnapshot {
            users: section("usuarios", users),
            broker_accounts: section("corretores_usuarios", broker_accounts),
            email_configs: section("configuracoes_emails", email_configs),
            rules: section("regras", rules),
            last_sync: section("ultima_sincronizacao", last_sync).flatten(),
        };
        &self.snapshot
    }

    pub async fn create_user(&mut self, user: &NewUser) -> Result<Notice, ActionError> {
        let outcome = self
            .api
            .create_user(user)
            .await
            .map_err(|err| failed(DashboardAction::CreateUser, 1, err))?;
        log_action(DashboardAction::CreateUser, 1);
        self.snapshot.users = section("usuarios", self.api.users().await);
        Ok(SETTINGS_MESSAGES.success_notice(&outcome))
    }

    pub async fn change_profile(&mut self, id: i64, perfil: &str) -> Result<Notice, ActionError> {
        let perfil = User::parse_profile(perfil)?;
        let outcome = self
            .api
            .update_user_profile(id, perfil)
            .await
            .map_err(|err| failed(DashboardAction::ChangeProfile, 1, err))?;
        log_action(DashboardAction::ChangeProfile, 1);
        if let Some(user) = self
            .snapshot
            .users
            .as_mut()
            .and_then(|users| users.iter_mut().find(|user| user.id == id))
        {
            user.perfil = Some(perfil.to_string());
        }
        Ok(SETTINGS_MESSAGES.success_notice(&outcome))
    }

    /// Replaces the recipients of one notification list.
    pub async fn update_email_list(
        &mut self,
        tipo: &str,
        emails: &[String],
    ) -> Result<Notice, ActionError> {
        let tipo = validate_email_list_kind(tipo)?;
        let emails = validate_email_list(emails)?;
        let outcome = self
            .api
            .update_email_config(tipo, &emails)
            .await
            .map_err(|err| failed(DashboardAction::UpdateEmails, emails.len(), err))?;
        log_action(DashboardAction::UpdateEmails, emails.len());
        if let Some(config) = self
            .snapshot
            .email_configs
            .as_mut()
            .and_then(|configs| configs.iter_mut().find(|config| config.tipo == tipo))
        {
            config.emails = emails;
        }
        Ok(SETTINGS_MESSAGES.success_notice(&outcome))
    }

    /// Creates the rule when `id` is `None`, otherwise updates it.
    pub async fn save_rule(
        &mut self,
        id: Option<i64>,
        draft: &RuleDraft,
    ) -> Result<Notice, ActionError> {
        draft.validate()?;
        let result = match id {
            Some(id) => self.api.update_rule(id, draft).await,
            None => self.api.create_rule(draft).await,
        };
        let outcome = result.map_err(|err| failed(DashboardAction::SaveRule, 1, err))?;
        log_action(DashboardAction::SaveRule, 1);
        self.reload_rules().await;
        Ok(SETTINGS_MESSAGES.success_notice(&outcome))
    }

    pub async fn delete_rule(&mut self, confirm: &dyn Confirm, id: i64) -> Result<Notice, ActionError> {
        if !confirm.confirm("Deseja realmente excluir esta regra?") {
            return Err(ActionError::Cancelled);
        }
        let outcome = self
            .api
            .delete_rule(id)
            .await
            .map_err(|err| failed(DashboardAction::DeleteRule, 1, err))?;
        log_action(DashboardAction::DeleteRule, 1);
        self.reload_rules().await;
        Ok(SETTINGS_MESSAGES.success_notice(&outcome))
    }

    pub async fn sync_now(&mut self, confirm: &dyn Confirm) -> Result<Notice, ActionError> {
        if !confirm.confirm("Deseja sincronizar os dados agora?") {
            return Err(ActionError::Cancelled);
        }
        let outcome = self
            .api
            .sync_now()
            .await
            .map_err(|err| failed(DashboardAction::Sync, 0, err))?;
        log_action(DashboardAction::Sync, 0);
        self.snapshot.last_sync =
            section("ultima_sincronizacao", self.api.last_sync().await).flatten();
        Ok(SYNC_MESSAGES.success_notice(&outcome))
    }

    async fn reload_rules(&mut self) {
        self.snapshot.rules = section("regras", self.api.rules().await);
    }
}

/// Splits a free-text recipient field on commas, semicolons and line breaks.
pub fn split_email_input(raw: &str) -> Vec<String> {
    raw.split([',', ';', '\n', '\r'])
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .collect()
}

fn section<T>(name: &'static str, result: Result<T, ApiError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log_section_failure("settings", name, &err);
            None
        }
    }
}

fn failed(action: DashboardAction, items: usize, err: ApiError) -> ActionError {
    log_action_failed(action, items, &err);
    let messages = match action {
        DashboardAction::Sync => SYNC_MESSAGES,
        _ => SETTINGS_MESSAGES,
    };
    ActionError::api(err, messages)
}
