use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    command::{Keyboard, MessageFormat},
    config::Config,
    domain::{ChatId, MessageRef},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

/// Minimum spacing between outbound platform calls.
#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Across every chat (Telegram allows roughly 30 calls per second).
    pub global_min_interval: Duration,
    /// Within one chat (roughly one message per second).
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),
            per_chat_min_interval: Duration::from_millis(1050),
        }
    }
}

impl From<&Config> for ThrottleConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            global_min_interval: cfg.throttle_global,
            per_chat_min_interval: cfg.throttle_per_chat,
        }
    }
}

/// Hands out evenly spaced time slots.
#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next_free: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_free: Instant::now(),
        }
    }

    /// No slot is reserved past `now`, so the limiter is as good as new.
    fn is_idle(&self, now: Instant) -> bool {
        self.next_free <= now
    }

    /// Claim the next free slot. Returns how long the caller must wait for it.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let slot = self.next_free.max(now);
        self.next_free = slot + self.interval;
        slot - now
    }
}

/// Idle per-chat limiters are dropped once this many are tracked.
const PRUNE_THRESHOLD: usize = 256;

/// MessagingPort decorator that spaces out outbound calls.
///
/// Users paging quickly through race lists can otherwise trip the platform's
/// flood limits. Spacing is best-effort: 429s remain possible.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    chats: Mutex<HashMap<ChatId, IntervalLimiter>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            chats: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for a global slot and, when the call targets a chat, a slot in that chat.
    async fn wait_turn(&self, chat_id: Option<ChatId>) {
        let mut wait = self.global.lock().await.reserve();

        if let Some(chat_id) = chat_id {
            let mut chats = self.chats.lock().await;
            if chats.len() >= PRUNE_THRESHOLD {
                let now = Instant::now();
                chats.retain(|_, limiter| !limiter.is_idle(now));
            }
            let limiter = chats
                .entry(chat_id)
                .or_insert_with(|| IntervalLimiter::new(self.cfg.per_chat_min_interval));
            wait = wait.max(limiter.reserve());
        }

        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        format: MessageFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef> {
        self.wait_turn(Some(chat_id)).await;
        self.inner.send_text(chat_id, text, format, keyboard).await
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        format: MessageFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        self.wait_turn(Some(msg.chat_id)).await;
        self.inner.edit_text(msg, text, format, keyboard).await
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        // Callback answers are not chat messages; only the global budget applies.
        self.wait_turn(None).await;
        self.inner.answer_callback_query(callback_id, text).await
    }
}
