use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    callback::{CallbackData, ReminderAction},
    command::{CommandInput, CommandOutput},
    registry::{CallbackHandler, CallbackModule, CommandHandler, CommandModule, CommandSet},
    Result,
};

use super::{
    races::race_not_found,
    render_list,
    views::{race_details_output, ListTarget, UNKNOWN_USER_TEXT},
    Services,
};

/// `/favoritos`.
pub struct FavoriteCommands {
    services: Services,
}

impl FavoriteCommands {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl CommandModule for FavoriteCommands {
    fn name(&self) -> &str {
        "favorites"
    }

    fn commands(&self) -> Result<CommandSet> {
        Ok(vec![(
            "favoritos".to_string(),
            Arc::new(ListFavorites(self.services.clone())) as Arc<dyn CommandHandler>,
        )])
    }
}

struct ListFavorites(Services);

#[async_trait]
impl CommandHandler for ListFavorites {
    async fn handle(&self, input: CommandInput) -> Result<CommandOutput> {
        render_list(&self.0, &ListTarget::Favorites, 0, input.user.as_ref()).await
    }
}

/// The reminder toggle (`rr`) on race and favorite screens.
pub struct FavoriteCallbacks {
    services: Services,
}

impl FavoriteCallbacks {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl CallbackModule for FavoriteCallbacks {
    fn name(&self) -> &str {
        "favorites"
    }

    fn handlers(&self) -> Result<Vec<Arc<dyn CallbackHandler>>> {
        let handlers: Vec<Arc<dyn CallbackHandler>> =
            vec![Arc::new(RaceReminder(self.services.clone()))];
        Ok(handlers)
    }
}

struct RaceReminder(Services);

#[async_trait]
impl CallbackHandler for RaceReminder {
    fn name(&self) -> &str {
        "race_reminder"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::RaceReminder { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::RaceReminder { race_id, action }) = input.callback_data else {
            return Ok(None);
        };
        let Some(user) = input.user else {
            return Ok(Some(CommandOutput::html(UNKNOWN_USER_TEXT)));
        };
        let Some(race) = self.0.races.get(&race_id).await? else {
            return Ok(Some(race_not_found()));
        };

        let (notice, reminder) = match action {
            ReminderAction::Set => {
                self.0.favorites.save(&user, &race.id, true).await?;
                ("✅ Lembrete ativado!", Some(true))
            }
            ReminderAction::Cancel => {
                self.0.favorites.remove(&user, &race.id).await?;
                ("🔕 Lembrete cancelado.", None)
            }
        };
        info!(user_id = %user.id, race_id = %race.id, action = %action, "reminder updated");

        let mut out = race_details_output(&race, reminder);
        out.text = format!("{notice}\n\n{}", out.text);
        Ok(Some(out.editing()))
    }
}
