use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    callback::{CallbackData, ConfigAction},
    command::{CommandInput, CommandOutput},
    domain::UserRef,
    ports::UserPreferences,
    registry::{CallbackHandler, CallbackModule, CommandHandler, CommandModule, CommandSet},
    Result,
};

use super::{
    views::{distance_settings, reminder_settings, settings_menu, UNKNOWN_USER_TEXT},
    Services,
};

const MAX_REMINDER_DAYS: u32 = 30;

async fn load_preferences(services: &Services, user: &UserRef) -> Result<UserPreferences> {
    Ok(services.users.preferences(user).await?.unwrap_or_default())
}

/// `/config`.
pub struct SettingsCommands {
    services: Services,
}

impl SettingsCommands {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl CommandModule for SettingsCommands {
    fn name(&self) -> &str {
        "settings"
    }

    fn commands(&self) -> Result<CommandSet> {
        Ok(vec![(
            "config".to_string(),
            Arc::new(ShowSettings(self.services.clone())) as Arc<dyn CommandHandler>,
        )])
    }
}

struct ShowSettings(Services);

#[async_trait]
impl CommandHandler for ShowSettings {
    async fn handle(&self, input: CommandInput) -> Result<CommandOutput> {
        settings_screen(&self.0, input.user.as_ref()).await
    }
}

/// The settings menu for `user`, with defaults when nothing is stored yet.
pub(crate) async fn settings_screen(
    services: &Services,
    user: Option<&UserRef>,
) -> Result<CommandOutput> {
    let Some(user) = user else {
        return Ok(CommandOutput::html(UNKNOWN_USER_TEXT));
    };
    let prefs = load_preferences(services, user).await?;
    Ok(settings_menu(&prefs))
}

/// The `uc` settings screens.
pub struct SettingsCallbacks {
    services: Services,
}

impl SettingsCallbacks {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl CallbackModule for SettingsCallbacks {
    fn name(&self) -> &str {
        "settings"
    }

    fn handlers(&self) -> Result<Vec<Arc<dyn CallbackHandler>>> {
        let handlers: Vec<Arc<dyn CallbackHandler>> =
            vec![Arc::new(UserConfig(self.services.clone()))];
        Ok(handlers)
    }
}

struct UserConfig(Services);

impl UserConfig {
    async fn save(&self, user: &UserRef, prefs: &UserPreferences) -> Result<()> {
        self.0.users.update_preferences(user, prefs).await?;
        info!(user_id = %user.id, ?prefs, "preferences updated");
        Ok(())
    }
}

#[async_trait]
impl CallbackHandler for UserConfig {
    fn name(&self) -> &str {
        "user_config"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::UserConfig { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::UserConfig { action, value }) = input.callback_data else {
            return Ok(None);
        };
        let Some(user) = input.user else {
            return Ok(Some(CommandOutput::html(UNKNOWN_USER_TEXT)));
        };
        let mut prefs = load_preferences(&self.0, &user).await?;
        let number = value.as_deref().and_then(|v| v.parse::<u32>().ok());

        let out = match (action, value.as_deref()) {
            (ConfigAction::Menu, _) => settings_menu(&prefs),
            (ConfigAction::Distances, _) => distance_settings(&prefs),
            (ConfigAction::ToggleDistance, _) => {
                let Some(distance) = number else {
                    debug!(?value, "invalid distance toggle");
                    return Ok(Some(CommandOutput::action_not_found()));
                };
                match prefs.preferred_distances.iter().position(|d| *d == distance) {
                    Some(i) => {
                        prefs.preferred_distances.remove(i);
                    }
                    None => {
                        prefs.preferred_distances.push(distance);
                        prefs.preferred_distances.sort_unstable();
                    }
                }
                self.save(&user, &prefs).await?;
                distance_settings(&prefs)
            }
            (ConfigAction::Notifications, _) => {
                prefs.notifications_enabled = !prefs.notifications_enabled;
                self.save(&user, &prefs).await?;
                settings_menu(&prefs)
            }
            (ConfigAction::ReminderTime, None) => reminder_settings(&prefs),
            (ConfigAction::ReminderTime, Some(_)) => {
                let Some(days) = number.filter(|d| (1..=MAX_REMINDER_DAYS).contains(d)) else {
                    debug!(?value, "invalid reminder days");
                    return Ok(Some(CommandOutput::action_not_found()));
                };
                prefs.reminder_days = days;
                self.save(&user, &prefs).await?;
                settings_menu(&prefs)
            }
        };
        Ok(Some(out.editing()))
    }
}
