//! In-memory fakes for the ports, shared by unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicI32, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    callback::CallbackData,
    command::{ButtonAction, CommandInput, CommandOutput, Keyboard, MessageFormat},
    dispatch::DistanceFilterHandler,
    domain::{ChatId, MessageId, MessageRef, UserRef},
    errors::Error,
    intercept::MessageInterceptor,
    messaging::{
        port::{callback_payload, MessagingPort},
        types::MessagingCapabilities,
    },
    ports::{
        Favorite, FavoriteService, MessageHistory, MessageRecord, Race, RaceService,
        UserPreferences, UserService,
    },
    registry::{CallbackHandler, CallbackModule},
    Result,
};

// ============== Messaging ==============

#[derive(Clone, Debug)]
pub enum FakeOp {
    Send {
        chat_id: ChatId,
        text: String,
        format: MessageFormat,
        keyboard: Option<Keyboard>,
    },
    Edit {
        msg: MessageRef,
        text: String,
        format: MessageFormat,
        keyboard: Option<Keyboard>,
    },
}

pub struct FakeMessenger {
    ops: Mutex<Vec<FakeOp>>,
    answered: Mutex<Vec<String>>,
    next_id: AtomicI32,
    fail_formatted: AtomicBool,
    reject_keyboards: AtomicBool,
    supports_edit: AtomicBool,
}

impl Default for FakeMessenger {
    fn default() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            answered: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(100),
            fail_formatted: AtomicBool::new(false),
            reject_keyboards: AtomicBool::new(false),
            supports_edit: AtomicBool::new(true),
        }
    }
}

impl FakeMessenger {
    /// Reject every non-plain send/edit (after recording it).
    pub fn fail_formatted(&self, fail: bool) {
        self.fail_formatted.store(fail, Ordering::SeqCst);
    }

    /// Reject any send/edit carrying a keyboard, before recording it.
    pub fn reject_keyboards(&self, reject: bool) {
        self.reject_keyboards.store(reject, Ordering::SeqCst);
    }

    pub fn set_supports_edit(&self, supported: bool) {
        self.supports_edit.store(supported, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<FakeOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                FakeOp::Send { text, .. } => Some(text),
                FakeOp::Edit { .. } => None,
            })
            .collect()
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }

    /// Encode callback buttons like a real binding would, before anything is sent.
    fn check_keyboard(&self, keyboard: Option<&Keyboard>) -> Result<()> {
        if keyboard.is_some() && self.reject_keyboards.load(Ordering::SeqCst) {
            return Err(Error::External("invalid button url".to_string()));
        }
        for button in keyboard.iter().flat_map(|k| k.buttons()) {
            if let ButtonAction::Callback(data) = &button.action {
                callback_payload(data)?;
            }
        }
        Ok(())
    }

    fn maybe_fail(&self, format: MessageFormat) -> Result<()> {
        if format != MessageFormat::Plain && self.fail_formatted.load(Ordering::SeqCst) {
            return Err(Error::External("can't parse entities".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_markdown: true,
            supports_edit: self.supports_edit.load(Ordering::SeqCst),
            supports_inline_keyboards: true,
            max_message_len: 4096,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        format: MessageFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef> {
        self.check_keyboard(keyboard)?;
        self.ops.lock().unwrap().push(FakeOp::Send {
            chat_id,
            text: text.to_string(),
            format,
            keyboard: keyboard.cloned(),
        });
        self.maybe_fail(format)?;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
        })
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        format: MessageFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        self.check_keyboard(keyboard)?;
        self.ops.lock().unwrap().push(FakeOp::Edit {
            msg,
            text: text.to_string(),
            format,
            keyboard: keyboard.cloned(),
        });
        self.maybe_fail(format)
    }

    async fn answer_callback_query(&self, callback_id: &str, _text: Option<&str>) -> Result<()> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}

// ============== Interception ==============

#[derive(Default)]
pub struct RecordingHistory {
    records: Mutex<Vec<MessageRecord>>,
}

impl RecordingHistory {
    pub fn records(&self) -> Vec<MessageRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageHistory for RecordingHistory {
    async fn record(&self, record: MessageRecord) -> Result<()> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

pub struct FailingInterceptor;

#[async_trait]
impl MessageInterceptor for FailingInterceptor {
    async fn intercept_incoming(&self, _command: &str, _input: &CommandInput) -> Result<()> {
        Err(Error::Backend("history store unavailable".to_string()))
    }

    async fn intercept_outgoing(
        &self,
        _command: &str,
        _input: &CommandInput,
        _output: &CommandOutput,
    ) -> Result<()> {
        Err(Error::Backend("history store unavailable".to_string()))
    }
}

// ============== Routing stubs ==============

pub struct StaticDistanceFilter;

#[async_trait]
impl DistanceFilterHandler for StaticDistanceFilter {
    async fn handle(&self, distances: Vec<u32>, _input: CommandInput) -> Result<CommandOutput> {
        Ok(CommandOutput::html(format!("distances {distances:?}")))
    }
}

/// `rf` → editing output, `ls` → `None`. Nothing else is claimed.
pub struct StaticCallbacks;

struct FilterEcho;

#[async_trait]
impl CallbackHandler for FilterEcho {
    fn name(&self) -> &str {
        "filter_echo"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::RacesFilter { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::RacesFilter { distance }) = input.callback_data else {
            return Ok(None);
        };
        Ok(Some(
            CommandOutput::html(format!("filter {distance}")).editing(),
        ))
    }
}

struct SilentList;

#[async_trait]
impl CallbackHandler for SilentList {
    fn name(&self) -> &str {
        "silent_list"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::RacesList { .. })
    }

    async fn handle(&self, _input: CommandInput) -> Result<Option<CommandOutput>> {
        Ok(None)
    }
}

impl CallbackModule for StaticCallbacks {
    fn name(&self) -> &str {
        "static"
    }

    fn handlers(&self) -> Result<Vec<Arc<dyn CallbackHandler>>> {
        let handlers: Vec<Arc<dyn CallbackHandler>> = vec![Arc::new(FilterEcho), Arc::new(SilentList)];
        Ok(handlers)
    }
}

// ============== Backend ==============

pub fn race(id: &str, title: &str, date: (i32, u32, u32), distances: &[u32]) -> Race {
    Race {
        id: id.to_string(),
        title: title.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid test date"),
        time: Some("07:00".to_string()),
        location: Some("Parque da Redenção".to_string()),
        city: Some("Porto Alegre".to_string()),
        distances: distances.to_vec(),
        organization: None,
        link: Some(format!("https://corridas.example/{id}")),
        latitude: None,
        longitude: None,
    }
}

pub fn sample_races() -> Vec<Race> {
    vec![
        race("r1", "Corrida do Parque", (2026, 11, 2), &[5, 10]),
        race("r2", "Meia de Porto Alegre", (2026, 11, 9), &[5, 21]),
        race("r3", "Maratona Internacional", (2026, 11, 16), &[10, 21, 42]),
        race("r4", "Night Run", (2026, 11, 23), &[5]),
        race("r5", "Desafio das Pontes", (2026, 11, 30), &[10, 15]),
        race("r6", "Corrida de Natal", (2026, 12, 20), &[5, 10]),
        race("r7", "São Silvestre Gaúcha", (2026, 12, 31), &[15]),
    ]
}

/// In-memory backend implementing every service port.
#[derive(Default)]
pub struct FakeBackend {
    pub races: Vec<Race>,
    users: Mutex<Vec<UserRef>>,
    prefs: Mutex<HashMap<String, UserPreferences>>,
    favorites: Mutex<HashMap<String, Vec<(String, bool)>>>,
    fail: AtomicBool,
}

impl FakeBackend {
    pub fn with_races(races: Vec<Race>) -> Self {
        Self {
            races,
            ..Self::default()
        }
    }

    /// Make every call fail like a transport error.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn users(&self) -> Vec<UserRef> {
        self.users.lock().unwrap().clone()
    }

    pub fn favorite_ids(&self, user: &UserRef) -> Vec<(String, bool)> {
        self.favorites
            .lock()
            .unwrap()
            .get(&user.id.0)
            .cloned()
            .unwrap_or_default()
    }

    pub fn stored_preferences(&self, user: &UserRef) -> Option<UserPreferences> {
        self.prefs.lock().unwrap().get(&user.id.0).cloned()
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Backend("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RaceService for FakeBackend {
    async fn list_upcoming(&self) -> Result<Vec<Race>> {
        self.check()?;
        Ok(self.races.clone())
    }

    async fn by_distances(&self, distances: &[u32]) -> Result<Vec<Race>> {
        self.check()?;
        Ok(self
            .races
            .iter()
            .filter(|r| r.distances.iter().any(|d| distances.contains(d)))
            .cloned()
            .collect())
    }

    async fn by_range(&self, start: u32, end: u32) -> Result<Vec<Race>> {
        self.check()?;
        Ok(self
            .races
            .iter()
            .filter(|r| r.distances.iter().any(|d| (start..=end).contains(d)))
            .cloned()
            .collect())
    }

    async fn next_race(&self) -> Result<Option<Race>> {
        self.check()?;
        Ok(self.races.first().cloned())
    }

    async fn get(&self, race_id: &str) -> Result<Option<Race>> {
        self.check()?;
        Ok(self.races.iter().find(|r| r.id == race_id).cloned())
    }
}

#[async_trait]
impl UserService for FakeBackend {
    async fn upsert(&self, user: &UserRef) -> Result<()> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        users.retain(|u| u.id != user.id);
        users.push(user.clone());
        Ok(())
    }

    async fn preferences(&self, user: &UserRef) -> Result<Option<UserPreferences>> {
        self.check()?;
        Ok(self.stored_preferences(user))
    }

    async fn update_preferences(&self, user: &UserRef, prefs: &UserPreferences) -> Result<()> {
        self.check()?;
        self.prefs
            .lock()
            .unwrap()
            .insert(user.id.0.clone(), prefs.clone());
        Ok(())
    }
}

#[async_trait]
impl FavoriteService for FakeBackend {
    async fn list(&self, user: &UserRef) -> Result<Vec<Favorite>> {
        self.check()?;
        Ok(self
            .favorite_ids(user)
            .into_iter()
            .filter_map(|(id, reminder)| {
                self.races
                    .iter()
                    .find(|r| r.id == id)
                    .map(|race| Favorite {
                        race: race.clone(),
                        reminder,
                    })
            })
            .collect())
    }

    async fn save(&self, user: &UserRef, race_id: &str, reminder: bool) -> Result<()> {
        self.check()?;
        let mut favs = self.favorites.lock().unwrap();
        let list = favs.entry(user.id.0.clone()).or_default();
        match list.iter_mut().find(|(id, _)| id == race_id) {
            Some(entry) => entry.1 = reminder,
            None => list.push((race_id.to_string(), reminder)),
        }
        Ok(())
    }

    async fn remove(&self, user: &UserRef, race_id: &str) -> Result<bool> {
        self.check()?;
        let mut favs = self.favorites.lock().unwrap();
        let Some(list) = favs.get_mut(&user.id.0) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|(id, _)| id != race_id);
        Ok(list.len() != before)
    }
}
