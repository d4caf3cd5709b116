use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use gatebot_db::LedgerStore;
use tokio::sync::RwLock;

/// Points charged to start a wizard run.
pub const ENTRY_FEE: i64 = 2;
/// Text a user sends to accept a field's fallback value.
pub const SKIP_TOKEN: &str = "/skip";
pub const SKIPPED: &str = "Skipped";
pub const DEFAULT_COUNT: i64 = 10_000;
pub const MAX_COUNT: i64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardStep {
    Username,
    Name,
    Age,
    Email,
    Phone,
    Count,
    Vpn,
}

impl WizardStep {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Username => Some(Self::Name),
            Self::Name => Some(Self::Age),
            Self::Age => Some(Self::Email),
            Self::Email => Some(Self::Phone),
            Self::Phone => Some(Self::Count),
            Self::Count => Some(Self::Vpn),
            Self::Vpn => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers {
    pub username: Option<String>,
    pub name: Option<String>,
    pub age: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub count: Option<i64>,
    pub vpn: Option<bool>,
}

impl Answers {
    /// One line for the logs. Contact details only show whether they were given.
    pub fn summary(&self) -> String {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        let contact = |v: &Option<String>| match v.as_deref() {
            None => "-",
            Some(SKIPPED) => SKIPPED,
            Some(_) => "<given>",
        };
        format!(
            "username={} name={} age={} email={} phone={} count={} vpn={}",
            field(&self.username),
            field(&self.name),
            field(&self.age),
            contact(&self.email),
            contact(&self.phone),
            self.count.unwrap_or(DEFAULT_COUNT),
            self.vpn.unwrap_or(false)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct WizardSession {
    pub step: Option<WizardStep>,
    pub answers: Answers,
}

impl WizardSession {
    fn fresh() -> Self {
        Self {
            step: Some(WizardStep::Username),
            answers: Answers::default(),
        }
    }

    /// Applies one free-text reply to the pending step.
    pub fn apply_text(&mut self, text: &str) -> Advance {
        let Some(step) = self.step else {
            return Advance::Ignored;
        };

        let a = &mut self.answers;
        match step {
            WizardStep::Username => {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed == SKIP_TOKEN {
                    return Advance::Reprompt(WizardStep::Username);
                }
                a.username = Some(text.to_string());
            }
            WizardStep::Name => a.name = Some(or_skipped(text)),
            WizardStep::Age => a.age = Some(or_skipped(text)),
            WizardStep::Email => a.email = Some(or_skipped(text)),
            WizardStep::Phone => a.phone = Some(or_skipped(text)),
            WizardStep::Count => a.count = Some(parse_count(text)),
            // Only the inline buttons answer this one.
            WizardStep::Vpn => return Advance::Reprompt(WizardStep::Vpn),
        }

        self.step = step.next();
        match self.step {
            Some(next) => Advance::Prompt(next),
            None => Advance::Ignored,
        }
    }

    pub fn apply_vpn(&mut self, use_vpn: bool) -> Option<Answers> {
        if self.step != Some(WizardStep::Vpn) {
            return None;
        }
        self.answers.vpn = Some(use_vpn);
        self.step = None;
        Some(self.answers.clone())
    }
}

fn or_skipped(text: &str) -> String {
    if text == SKIP_TOKEN {
        SKIPPED.to_string()
    } else {
        text.to_string()
    }
}

/// Integers are kept as typed, capped at [`MAX_COUNT`]. Anything else
/// becomes the default.
pub fn parse_count(text: &str) -> i64 {
    text.trim()
        .parse::<i64>()
        .map(|n| n.min(MAX_COUNT))
        .unwrap_or(DEFAULT_COUNT)
}

/// What the dispatcher should say after a reply was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved on; ask for this step.
    Prompt(WizardStep),
    /// Stayed put; ask for this step again.
    Reprompt(WizardStep),
    /// No pending step for this user.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Started { balance: i64 },
    Insufficient { balance: i64 },
}

/// Entry fee plus the per-user in-memory sessions.
///
/// Sessions never expire; a new run replaces whatever was there.
#[derive(Clone)]
pub struct WizardService {
    ledger: Arc<dyn LedgerStore>,
    sessions: Arc<RwLock<HashMap<i64, WizardSession>>>,
}

impl WizardService {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn begin(&self, user_id: i64) -> Result<EntryOutcome> {
        match self.ledger.debit_points(user_id, ENTRY_FEE).await? {
            Some(balance) => {
                self.sessions.write().await.insert(user_id, WizardSession::fresh());
                tracing::info!("User {} started the wizard, {} points left", user_id, balance);
                Ok(EntryOutcome::Started { balance })
            }
            None => {
                let balance = self
                    .ledger
                    .find_user(user_id)
                    .await?
                    .map(|u| u.points)
                    .unwrap_or(0);
                tracing::debug!("User {} cannot afford the wizard ({} points)", user_id, balance);
                Ok(EntryOutcome::Insufficient { balance })
            }
        }
    }

    pub async fn submit_text(&self, user_id: i64, text: &str) -> Advance {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&user_id) {
            Some(session) => session.apply_text(text),
            None => Advance::Ignored,
        }
    }

    pub async fn choose_vpn(&self, user_id: i64, use_vpn: bool) -> Option<Answers> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(&user_id)?.apply_vpn(use_vpn)
    }

    #[cfg(test)]
    pub async fn current_step(&self, user_id: i64) -> Option<WizardStep> {
        self.sessions.read().await.get(&user_id)?.step
    }

    #[cfg(test)]
    pub async fn answers(&self, user_id: i64) -> Option<Answers> {
        self.sessions
            .read()
            .await
            .get(&user_id)
            .map(|s| s.answers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatebot_db::MemoryLedger;

    async fn service_with_points(user_id: i64, points: i64) -> (WizardService, MemoryLedger) {
        let ledger = MemoryLedger::new();
        ledger.add_points(user_id, points).await.unwrap();
        (WizardService::new(Arc::new(ledger.clone())), ledger)
    }

    #[tokio::test]
    async fn entry_below_fee_changes_nothing() {
        for points in [0, 1] {
            let (wizard, ledger) = service_with_points(1, points).await;
            let outcome = wizard.begin(1).await.unwrap();
            assert_eq!(outcome, EntryOutcome::Insufficient { balance: points });
            assert_eq!(ledger.find_user(1).await.unwrap().unwrap().points, points);
            assert_eq!(wizard.current_step(1).await, None);
        }
    }

    #[tokio::test]
    async fn entry_for_unknown_user_is_insufficient() {
        let wizard = WizardService::new(Arc::new(MemoryLedger::new()));
        assert_eq!(
            wizard.begin(404).await.unwrap(),
            EntryOutcome::Insufficient { balance: 0 }
        );
    }

    #[tokio::test]
    async fn entry_debits_exactly_the_fee() {
        for points in [2, 3, 50] {
            let (wizard, ledger) = service_with_points(1, points).await;
            let outcome = wizard.begin(1).await.unwrap();
            assert_eq!(outcome, EntryOutcome::Started { balance: points - 2 });
            assert_eq!(ledger.find_user(1).await.unwrap().unwrap().points, points - 2);
            assert_eq!(wizard.current_step(1).await, Some(WizardStep::Username));
        }
    }

    #[tokio::test]
    async fn new_run_replaces_old_session() {
        let (wizard, _) = service_with_points(1, 4).await;
        wizard.begin(1).await.unwrap();
        wizard.submit_text(1, "target").await;
        assert_eq!(wizard.current_step(1).await, Some(WizardStep::Name));

        wizard.begin(1).await.unwrap();
        assert_eq!(wizard.current_step(1).await, Some(WizardStep::Username));
        assert_eq!(wizard.answers(1).await.unwrap(), Answers::default());
    }

    #[test]
    fn username_cannot_be_skipped() {
        let mut session = WizardSession::fresh();
        for input in [SKIP_TOKEN, "", "   ", " /skip "] {
            assert_eq!(session.apply_text(input), Advance::Reprompt(WizardStep::Username));
            assert_eq!(session.step, Some(WizardStep::Username));
        }
        assert_eq!(session.answers.username, None);

        assert_eq!(session.apply_text("target"), Advance::Prompt(WizardStep::Name));
        assert_eq!(session.answers.username.as_deref(), Some("target"));
    }

    #[test]
    fn optional_fields_take_fallback_on_skip() {
        let mut session = WizardSession::fresh();
        session.apply_text("target");

        let expected = [
            WizardStep::Age,
            WizardStep::Email,
            WizardStep::Phone,
            WizardStep::Count,
        ];
        for next in expected {
            assert_eq!(session.apply_text(SKIP_TOKEN), Advance::Prompt(next));
        }

        let a = &session.answers;
        for field in [&a.name, &a.age, &a.email, &a.phone] {
            assert_eq!(field.as_deref(), Some(SKIPPED));
        }
    }

    #[test]
    fn optional_fields_keep_given_text() {
        let mut session = WizardSession::fresh();
        session.apply_text("target");
        session.apply_text("Alice");
        session.apply_text("31");
        assert_eq!(session.answers.name.as_deref(), Some("Alice"));
        assert_eq!(session.answers.age.as_deref(), Some("31"));
        assert_eq!(session.step, Some(WizardStep::Email));
    }

    #[test]
    fn count_is_capped_or_defaulted() {
        assert_eq!(parse_count("150000"), 100_000);
        assert_eq!(parse_count("99999999"), 100_000);
        assert_eq!(parse_count("abc"), 10_000);
        assert_eq!(parse_count("5"), 5);
        assert_eq!(parse_count(" 42 "), 42);
        assert_eq!(parse_count(SKIP_TOKEN), 10_000);
        assert_eq!(parse_count("1.5"), 10_000);
        assert_eq!(parse_count("-3"), -3);
        assert_eq!(parse_count("0"), 0);
    }

    #[test]
    fn negative_count_is_stored_as_typed() {
        let mut session = WizardSession::fresh();
        for input in ["target", SKIP_TOKEN, SKIP_TOKEN, SKIP_TOKEN, SKIP_TOKEN, "-3"] {
            session.apply_text(input);
        }
        assert_eq!(session.answers.count, Some(-3));
        assert_eq!(session.step, Some(WizardStep::Vpn));
    }

    #[test]
    fn vpn_step_only_accepts_buttons() {
        let mut session = WizardSession::fresh();
        for input in ["target", SKIP_TOKEN, SKIP_TOKEN, SKIP_TOKEN, SKIP_TOKEN, "7"] {
            session.apply_text(input);
        }
        assert_eq!(session.step, Some(WizardStep::Vpn));
        assert_eq!(session.apply_text("yes"), Advance::Reprompt(WizardStep::Vpn));

        let answers = session.apply_vpn(true).unwrap();
        assert_eq!(answers.vpn, Some(true));
        assert_eq!(answers.count, Some(7));
        assert_eq!(session.step, None);

        // Second press after completion does nothing.
        assert_eq!(session.apply_vpn(false), None);
        assert_eq!(session.apply_text("hello"), Advance::Ignored);
    }

    #[test]
    fn summary_lists_every_field() {
        let answers = Answers {
            username: Some("target".into()),
            count: Some(5),
            vpn: Some(true),
            ..Answers::default()
        };
        assert_eq!(
            answers.summary(),
            "username=target name=- age=- email=- phone=- count=5 vpn=true"
        );
    }

    #[test]
    fn summary_hides_contact_details() {
        let answers = Answers {
            username: Some("target".into()),
            email: Some("someone@mail.test".into()),
            phone: Some(SKIPPED.into()),
            ..Answers::default()
        };
        let line = answers.summary();
        assert!(!line.contains("someone@mail.test"));
        assert!(line.contains("email=<given> phone=Skipped"));
    }

    #[test]
    fn vpn_press_before_vpn_step_is_ignored() {
        let mut session = WizardSession::fresh();
        assert_eq!(session.apply_vpn(true), None);
        assert_eq!(session.step, Some(WizardStep::Username));
    }

    #[tokio::test]
    async fn text_without_session_is_ignored() {
        let wizard = WizardService::new(Arc::new(MemoryLedger::new()));
        assert_eq!(wizard.submit_text(9, "hello").await, Advance::Ignored);
        assert_eq!(wizard.choose_vpn(9, true).await, None);
    }
}
