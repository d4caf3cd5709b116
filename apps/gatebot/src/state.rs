use std::sync::Arc;

use gatebot_db::LedgerStore;

use crate::config::BotConfig;
use crate::services::admin_service::AdminService;
use crate::services::gate_service::{GateService, MembershipProbe};
use crate::services::referral_service::ReferralService;
use crate::services::wizard_service::WizardService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BotConfig>,
    pub bot_username: Arc<str>,
    pub ledger: Arc<dyn LedgerStore>,
    pub gate: GateService,
    pub referrals: ReferralService,
    pub wizard: WizardService,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(
        config: BotConfig,
        bot_username: &str,
        ledger: Arc<dyn LedgerStore>,
        probe: Arc<dyn MembershipProbe>,
    ) -> Self {
        let referrals = ReferralService::new(ledger.clone());
        let gate_channel = config
            .gate_channel()
            .map(|c| c.chat.clone())
            .unwrap_or_default();
        let gate = GateService::new(referrals.clone(), probe, gate_channel);
        let wizard = WizardService::new(ledger.clone());
        let admin = AdminService::new(ledger.clone(), &config.admin_ids);

        Self {
            config: Arc::new(config),
            bot_username: Arc::from(bot_username),
            ledger,
            gate,
            referrals,
            wizard,
            admin,
        }
    }
}
