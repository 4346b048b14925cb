use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    callback::{CallbackData, PageAction},
    command::{Button, CommandInput, CommandOutput, Keyboard},
    dispatch::DistanceFilterHandler,
    formatting::escape_html,
    registry::{CallbackHandler, CallbackModule, CommandHandler, CommandModule, CommandSet},
    Result,
};

use super::{
    reminder_state, render_list,
    views::{self, home_button, race_details_output, search_menu, ListTarget, RACE_NOT_FOUND_TEXT},
    Services,
};

/// `/corridas`, `/proxima_corrida` and `/buscar_corridas`.
pub struct RaceCommands {
    services: Services,
}

impl RaceCommands {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl CommandModule for RaceCommands {
    fn name(&self) -> &str {
        "races"
    }

    fn commands(&self) -> Result<CommandSet> {
        let s = &self.services;
        Ok(vec![
            (
                "corridas".to_string(),
                Arc::new(ListRaces(s.clone())) as Arc<dyn CommandHandler>,
            ),
            (
                "proxima_corrida".to_string(),
                Arc::new(NextRace(s.clone())) as Arc<dyn CommandHandler>,
            ),
            (
                "buscar_corridas".to_string(),
                Arc::new(SearchRaces(s.clone())) as Arc<dyn CommandHandler>,
            ),
        ])
    }
}

fn numeric_args(args: &[String]) -> Vec<u32> {
    args.iter()
        .filter_map(|a| a.trim().trim_end_matches("km").parse().ok())
        .collect()
}

struct ListRaces(Services);

#[async_trait]
impl CommandHandler for ListRaces {
    async fn handle(&self, input: CommandInput) -> Result<CommandOutput> {
        // `/corridas 5 10` behaves like `/corridas_5,10`.
        let distances = numeric_args(&input.args);
        let target = if distances.is_empty() {
            ListTarget::Races
        } else {
            ListTarget::Distances(distances)
        };
        render_list(&self.0, &target, 0, input.user.as_ref()).await
    }
}

struct NextRace(Services);

#[async_trait]
impl CommandHandler for NextRace {
    async fn handle(&self, input: CommandInput) -> Result<CommandOutput> {
        let Some(race) = self.0.races.next_race().await? else {
            return Ok(CommandOutput::html("😕 Nenhuma corrida agendada no momento.")
                .with_keyboard(Keyboard::new(vec![vec![home_button()]])));
        };
        let reminder = reminder_state(&self.0, input.user.as_ref(), &race.id).await;
        Ok(race_details_output(&race, reminder))
    }
}

struct SearchRaces(Services);

#[async_trait]
impl CommandHandler for SearchRaces {
    async fn handle(&self, input: CommandInput) -> Result<CommandOutput> {
        match numeric_args(&input.args)[..] {
            [a, b] if input.args.len() == 2 => {
                let target = ListTarget::Range(a.min(b), a.max(b));
                render_list(&self.0, &target, 0, input.user.as_ref()).await
            }
            _ => Ok(search_menu()),
        }
    }
}

/// Handles `/corridas_<d>[,<d>...]`.
pub struct RaceDistanceFilter {
    services: Services,
}

impl RaceDistanceFilter {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl DistanceFilterHandler for RaceDistanceFilter {
    async fn handle(&self, distances: Vec<u32>, input: CommandInput) -> Result<CommandOutput> {
        render_list(
            &self.services,
            &ListTarget::Distances(distances),
            0,
            input.user.as_ref(),
        )
        .await
    }
}

/// Buttons on race lists and race detail screens.
pub struct RaceCallbacks {
    services: Services,
}

impl RaceCallbacks {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl CallbackModule for RaceCallbacks {
    fn name(&self) -> &str {
        "races"
    }

    fn handlers(&self) -> Result<Vec<Arc<dyn CallbackHandler>>> {
        let s = &self.services;
        let handlers: Vec<Arc<dyn CallbackHandler>> = vec![
            Arc::new(RaceDetails(s.clone())),
            Arc::new(RaceLocation(s.clone())),
            Arc::new(RacesList(s.clone())),
            Arc::new(RacesFilter(s.clone())),
            Arc::new(RacesSearch(s.clone())),
            Arc::new(Pagination(s.clone())),
        ];
        Ok(handlers)
    }
}

struct RaceDetails(Services);

#[async_trait]
impl CallbackHandler for RaceDetails {
    fn name(&self) -> &str {
        "race_details"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::RaceDetails { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::RaceDetails { race_id }) = input.callback_data else {
            return Ok(None);
        };
        let Some(race) = self.0.races.get(&race_id).await? else {
            debug!(race_id = %race_id, "race details requested for unknown race");
            return Ok(Some(race_not_found()));
        };
        let reminder = reminder_state(&self.0, input.user.as_ref(), &race.id).await;
        Ok(Some(race_details_output(&race, reminder).editing()))
    }
}

pub(crate) fn race_not_found() -> CommandOutput {
    CommandOutput::html(RACE_NOT_FOUND_TEXT)
        .with_keyboard(Keyboard::new(vec![vec![home_button()]]))
        .editing()
}

struct RaceLocation(Services);

#[async_trait]
impl CallbackHandler for RaceLocation {
    fn name(&self) -> &str {
        "race_location"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::RaceLocation { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::RaceLocation { race_id }) = input.callback_data else {
            return Ok(None);
        };
        let Some(race) = self.0.races.get(&race_id).await? else {
            return Ok(Some(race_not_found()));
        };

        let title = escape_html(&race.title);
        let Some(url) = views::maps_url(&race) else {
            return Ok(Some(CommandOutput::html(format!(
                "📍 <b>{title}</b>\n\nO local desta corrida ainda não foi informado."
            ))));
        };
        let place = [race.location.as_deref(), race.city.as_deref()]
            .into_iter()
            .flatten()
            .map(escape_html)
            .collect::<Vec<_>>()
            .join("\n");
        // Sent as a new message so the details screen stays in place.
        Ok(Some(
            CommandOutput::html(format!("📍 <b>{title}</b>\n\n{place}"))
                .with_keyboard(Keyboard::new(vec![vec![Button::url("🗺️ Abrir no mapa", url)]])),
        ))
    }
}

struct RacesList(Services);

#[async_trait]
impl CallbackHandler for RacesList {
    fn name(&self) -> &str {
        "races_list"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::RacesList { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::RacesList { distance }) = input.callback_data else {
            return Ok(None);
        };
        let target = match distance {
            Some(d) => ListTarget::Distances(vec![d]),
            None => ListTarget::Races,
        };
        let out = render_list(&self.0, &target, 0, input.user.as_ref()).await?;
        Ok(Some(out.editing()))
    }
}

struct RacesFilter(Services);

#[async_trait]
impl CallbackHandler for RacesFilter {
    fn name(&self) -> &str {
        "races_filter"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::RacesFilter { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::RacesFilter { distance }) = input.callback_data else {
            return Ok(None);
        };
        let target = ListTarget::Distances(vec![distance]);
        let out = render_list(&self.0, &target, 0, input.user.as_ref()).await?;
        Ok(Some(out.editing()))
    }
}

struct RacesSearch(Services);

#[async_trait]
impl CallbackHandler for RacesSearch {
    fn name(&self) -> &str {
        "races_search"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::RacesSearch { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::RacesSearch {
            start_distance,
            end_distance,
        }) = input.callback_data
        else {
            return Ok(None);
        };
        let target = ListTarget::Range(
            start_distance.min(end_distance),
            start_distance.max(end_distance),
        );
        let out = render_list(&self.0, &target, 0, input.user.as_ref()).await?;
        Ok(Some(out.editing()))
    }
}

struct Pagination(Services);

#[async_trait]
impl CallbackHandler for Pagination {
    fn name(&self) -> &str {
        "pagination"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::Pagination { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::Pagination {
            action,
            page,
            target,
        }) = input.callback_data
        else {
            return Ok(None);
        };
        let Some(target) = ListTarget::parse(&target) else {
            debug!(target = %target, "unknown pagination target");
            return Ok(Some(CommandOutput::action_not_found()));
        };

        let page = page as usize;
        let page = match action {
            PageAction::Next => page + 1,
            PageAction::Prev => page.saturating_sub(1),
            PageAction::Page => page,
        };
        let out = render_list(&self.0, &target, page, input.user.as_ref()).await?;
        Ok(Some(out.editing()))
    }
}
