use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;
use teloxide::utils::html;

use super::wizard_service::{Answers, DEFAULT_COUNT};

pub const VPN_SERVERS: [&str; 7] = [
    "🇺🇸 USA-1",
    "🇬🇧 UK-2",
    "🇩🇪 DE-3",
    "🇸🇬 SG-4",
    "🇫🇷 FR-5",
    "🇮🇳 IN-6",
    "🇯🇵 JP-7",
];

fn status_lines(answers: &Answers) -> Vec<String> {
    vec![
        "🧰 Initializing tools...".to_string(),
        format!(
            "🔍 Scanning profile <b>{}</b>...",
            html::escape(answers.username.as_deref().unwrap_or("unknown"))
        ),
        "🛡 Bypassing security...".to_string(),
        format!(
            "🔑 Generating wordlist of {} entries... This may take a moment...",
            answers.count.unwrap_or(DEFAULT_COUNT)
        ),
    ]
}

const STATUS_PAUSE: Duration = Duration::from_secs(4);
const PROGRESS_STAGES: usize = 10;
const STAGE_PAUSE: Duration = Duration::from_secs(3);
const BAR_WIDTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a new status message and start tracking it.
    Post(String),
    /// Rewrite the tracked status message.
    Edit(String),
    /// Delete the tracked status message.
    Remove,
    /// Send the final, untracked result message.
    Deliver(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub action: Action,
    pub pause: Duration,
}

impl Frame {
    fn new(action: Action, pause: Duration) -> Self {
        Self { action, pause }
    }
}

/// Fixed, branch-free sequence of status updates for one finished wizard run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub frames: Vec<Frame>,
}

impl Script {
    pub fn build<R: Rng>(answers: &Answers, rng: &mut R) -> Self {
        let mut frames = Vec::new();

        if answers.vpn == Some(true) {
            let server = VPN_SERVERS.choose(&mut *rng).copied().unwrap_or(VPN_SERVERS[0]);
            frames.push(Frame::new(
                Action::Post("🔌 Connecting to VPN... Please wait...".to_string()),
                Duration::from_secs(4),
            ));
            frames.push(Frame::new(
                Action::Edit(format!("🔌 Connected to {}", server)),
                Duration::from_secs(2),
            ));
        }

        for line in status_lines(answers) {
            let action = if frames.is_empty() {
                Action::Post(line)
            } else {
                Action::Edit(line)
            };
            frames.push(Frame::new(action, STATUS_PAUSE));
        }
        frames.push(Frame::new(Action::Remove, Duration::ZERO));

        frames.push(Frame::new(Action::Post(progress_bar(0)), STAGE_PAUSE));
        for stage in 1..=PROGRESS_STAGES {
            let pause = if stage == PROGRESS_STAGES {
                Duration::ZERO
            } else {
                STAGE_PAUSE
            };
            frames.push(Frame::new(Action::Edit(progress_bar(stage)), pause));
        }
        frames.push(Frame::new(Action::Remove, Duration::ZERO));

        let result = synthetic_result(answers, rng.random_range(1000..=9999));
        frames.push(Frame::new(
            Action::Deliver(format!(
                "✅ <b>Done!</b>\n🔑 <b>Result:</b> <code>{}</code>",
                html::escape(&result)
            )),
            Duration::ZERO,
        ));

        Self { frames }
    }

    pub fn total_pause(&self) -> Duration {
        self.frames.iter().map(|f| f.pause).sum()
    }
}

fn progress_bar(stage: usize) -> String {
    let filled = stage * BAR_WIDTH / PROGRESS_STAGES;
    format!(
        "⚡️ <b>Running...</b>\n[{}{}] {}%",
        "▓".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        stage * 100 / PROGRESS_STAGES
    )
}

/// `<name><suffix>_<age>`. Pure formatting of the collected answers.
pub fn synthetic_result(answers: &Answers, suffix: u32) -> String {
    format!(
        "{}{}_{}",
        answers.name.as_deref().unwrap_or("user"),
        suffix,
        answers.age.as_deref().unwrap_or("00")
    )
}

#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Where the animation is rendered. Implementations track the one status
/// message that `edit`/`remove` act on.
#[async_trait]
pub trait StatusSurface: Send {
    async fn post(&mut self, text: &str) -> Result<()>;
    async fn edit(&mut self, text: &str) -> Result<()>;
    async fn remove(&mut self) -> Result<()>;
    async fn deliver(&mut self, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub frames: usize,
    pub failures: usize,
}

/// Runs every frame in order. A failed frame is logged and skipped; the
/// sequence always reaches the end.
pub async fn play<S, C>(script: &Script, surface: &mut S, clock: &C) -> PlaybackReport
where
    S: StatusSurface + ?Sized,
    C: Clock + ?Sized,
{
    let mut report = PlaybackReport::default();

    for frame in &script.frames {
        let outcome = match &frame.action {
            Action::Post(text) => surface.post(text).await,
            Action::Edit(text) => surface.edit(text).await,
            Action::Remove => surface.remove().await,
            Action::Deliver(text) => surface.deliver(text).await,
        };
        report.frames += 1;
        if let Err(e) = outcome {
            report.failures += 1;
            tracing::debug!("Animation frame failed, continuing: {}", e);
        }
        clock.sleep(frame.pause).await;
    }

    report
}
