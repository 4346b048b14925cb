//! Bot features: slash commands and button handlers, grouped by area.
//!
//! Each area exports a [`CommandModule`] and/or a [`CallbackModule`]. The
//! composition root hands [`command_modules`] and [`callback_modules`] to the
//! registries; nothing registers itself.

pub mod basic;
pub mod favorites;
pub mod races;
pub mod settings;
pub mod views;

use std::sync::Arc;

use tracing::warn;

use crate::{
    command::CommandOutput,
    dispatch::DistanceFilterHandler,
    domain::UserRef,
    ports::{FavoriteService, RaceService, UserService},
    registry::{CallbackModule, CommandModule},
    Result,
};

use self::views::{favorites_page, format_distances, races_page, ListTarget, UNKNOWN_USER_TEXT};

pub use self::basic::BOT_COMMANDS;

/// Backend collaborators shared by every handler.
#[derive(Clone)]
pub struct Services {
    pub races: Arc<dyn RaceService>,
    pub users: Arc<dyn UserService>,
    pub favorites: Arc<dyn FavoriteService>,
    pub page_size: usize,
}

pub fn command_modules(services: &Services) -> Vec<Arc<dyn CommandModule>> {
    vec![
        Arc::new(basic::BasicCommands::new(services.clone())),
        Arc::new(races::RaceCommands::new(services.clone())),
        Arc::new(favorites::FavoriteCommands::new(services.clone())),
        Arc::new(settings::SettingsCommands::new(services.clone())),
    ]
}

/// Callback modules in dispatch order.
pub fn callback_modules(services: &Services) -> Vec<Arc<dyn CallbackModule>> {
    vec![
        Arc::new(races::RaceCallbacks::new(services.clone())),
        Arc::new(favorites::FavoriteCallbacks::new(services.clone())),
        Arc::new(settings::SettingsCallbacks::new(services.clone())),
        Arc::new(basic::NavigationCallbacks::new(services.clone())),
    ]
}

pub fn distance_filter(services: &Services) -> Arc<dyn DistanceFilterHandler> {
    Arc::new(races::RaceDistanceFilter::new(services.clone()))
}

/// Render one page of any list target.
pub(crate) async fn render_list(
    services: &Services,
    target: &ListTarget,
    page: usize,
    user: Option<&UserRef>,
) -> Result<CommandOutput> {
    let (heading, races) = match target {
        ListTarget::Races => (
            "📅 <b>Próximas corridas</b>".to_string(),
            services.races.list_upcoming().await?,
        ),
        ListTarget::Distances(distances) => (
            format!("📏 <b>Corridas de {}</b>", format_distances(distances)),
            services.races.by_distances(distances).await?,
        ),
        ListTarget::Range(start, end) => (
            format!("🔎 <b>Corridas entre {start}km e {end}km</b>"),
            services.races.by_range(*start, *end).await?,
        ),
        ListTarget::Favorites => {
            let Some(user) = user else {
                return Ok(CommandOutput::html(UNKNOWN_USER_TEXT));
            };
            let favorites = services.favorites.list(user).await?;
            return Ok(favorites_page(&favorites, page, services.page_size));
        }
    };
    Ok(races_page(&heading, &races, target, page, services.page_size))
}

/// The user's favorite state for one race: `Some(reminder)` when favorited.
///
/// Lookup failures only cost the marker, never the screen.
pub(crate) async fn reminder_state(
    services: &Services,
    user: Option<&UserRef>,
    race_id: &str,
) -> Option<bool> {
    let user = user?;
    match services.favorites.list(user).await {
        Ok(favorites) => favorites
            .iter()
            .find(|f| f.race.id == race_id)
            .map(|f| f.reminder),
        Err(e) => {
            warn!(user_id = %user.id, race_id, error = %e, "favorite lookup failed");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::Services;
    use crate::{
        callback::CallbackData,
        command::{CommandInput, Platform},
        domain::UserRef,
        testing::{sample_races, FakeBackend},
    };

    pub fn services() -> (Arc<FakeBackend>, Services) {
        let backend = Arc::new(FakeBackend::with_races(sample_races()));
        let services = Services {
            races: backend.clone(),
            users: backend.clone(),
            favorites: backend.clone(),
            page_size: 5,
        };
        (backend, services)
    }

    pub fn ana() -> UserRef {
        UserRef::new(42_i64, Some("Ana".to_string()))
    }

    pub fn input() -> CommandInput {
        CommandInput::new(Platform::Telegram).with_user(ana())
    }

    pub fn callback_input(data: CallbackData) -> CommandInput {
        input().with_callback_data(data)
    }
}
