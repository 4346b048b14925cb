//! Rendering helpers shared by the bot handlers.

use tracing::warn;

use crate::{
    callback::{get_size, validate_size, CallbackData, ConfigAction, NavAction, PageAction},
    command::{Button, CommandOutput, Keyboard},
    formatting::{escape_html, truncate_chars},
    ports::{Favorite, Race, UserPreferences},
};

pub const RACE_NOT_FOUND_TEXT: &str = "❌ Corrida não encontrada. Ela pode ter sido removida.";
pub const NO_RACES_TEXT: &str = "😕 Nenhuma corrida encontrada.";
pub const UNKNOWN_USER_TEXT: &str = "⚠️ Não foi possível identificar o usuário.";

/// Distances offered as quick filters and preference toggles.
pub const DISTANCE_OPTIONS: [u32; 5] = [5, 10, 15, 21, 42];

/// Preset ranges for `/buscar_corridas` without arguments.
pub const SEARCH_PRESETS: [(u32, u32, &str); 5] = [
    (0, 5, "Até 5km"),
    (6, 10, "6 a 10km"),
    (11, 21, "11 a 21km"),
    (22, 42, "22 a 42km"),
    (43, 200, "Ultra (43km+)"),
];

pub const REMINDER_DAY_OPTIONS: [u32; 4] = [1, 2, 3, 7];

const BUTTON_TITLE_CHARS: usize = 40;

/// Pagination targets understood by the `pag` handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListTarget {
    /// All upcoming races.
    Races,
    /// Upcoming races offering any of these distances.
    Distances(Vec<u32>),
    /// Races with a distance inside `start..=end`.
    Range(u32, u32),
    Favorites,
}

impl ListTarget {
    pub fn parse(target: &str) -> Option<Self> {
        match target {
            "races" => return Some(Self::Races),
            "favorites" => return Some(Self::Favorites),
            _ => {}
        }
        if let Some(csv) = target.strip_prefix("races_") {
            let distances = csv
                .split(',')
                .map(|d| d.parse().ok())
                .collect::<Option<Vec<u32>>>()?;
            return (!distances.is_empty()).then_some(Self::Distances(distances));
        }
        let (start, end) = target.strip_prefix("range_")?.split_once('_')?;
        Some(Self::Range(start.parse().ok()?, end.parse().ok()?))
    }

    pub fn as_target(&self) -> String {
        match self {
            Self::Races => "races".to_string(),
            Self::Favorites => "favorites".to_string(),
            Self::Distances(distances) => format!("races_{}", join_numbers(distances, ",")),
            Self::Range(start, end) => format!("range_{start}_{end}"),
        }
    }
}

fn join_numbers(values: &[u32], sep: &str) -> String {
    values
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

pub fn format_distances(distances: &[u32]) -> String {
    if distances.is_empty() {
        return "-".to_string();
    }
    distances
        .iter()
        .map(|d| format!("{d}km"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_when(race: &Race) -> String {
    let date = race.date.format("%d/%m/%Y");
    match race.time.as_deref() {
        Some(time) if !time.trim().is_empty() => format!("{date} às {}", escape_html(time)),
        _ => date.to_string(),
    }
}

fn format_place(race: &Race) -> Option<String> {
    let parts: Vec<&str> = [race.location.as_deref(), race.city.as_deref()]
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect();
    (!parts.is_empty()).then(|| escape_html(&parts.join(", ")))
}

/// Short multi-line block used in lists.
pub fn race_summary(race: &Race) -> String {
    let mut out = format!(
        "<b>{}</b>\n📅 {}",
        escape_html(&race.title),
        format_when(race)
    );
    if let Some(place) = format_place(race) {
        out.push_str(&format!("\n📍 {place}"));
    }
    out.push_str(&format!("\n🏃 {}", format_distances(&race.distances)));
    out
}

pub fn race_details(race: &Race, reminder: Option<bool>) -> String {
    let mut out = format!("🏁 {}", race_summary(race));
    if let Some(org) = race.organization.as_deref() {
        out.push_str(&format!("\n🏢 {}", escape_html(org)));
    }
    match reminder {
        Some(true) => out.push_str("\n\n⏰ Lembrete ativado"),
        Some(false) => out.push_str("\n\n⭐ Nos seus favoritos"),
        None => {}
    }
    out
}

pub fn details_button(race: &Race) -> Button {
    Button::callback(
        format!("🏃 {}", truncate_chars(&race.title, BUTTON_TITLE_CHARS)),
        CallbackData::RaceDetails {
            race_id: race.id.clone(),
        },
    )
}

pub fn home_button() -> Button {
    Button::callback(
        "🏠 Menu",
        CallbackData::Navigation {
            action: NavAction::Home,
            target: "home".to_string(),
        },
    )
}

pub fn back_button(target: &str) -> Button {
    Button::callback(
        "⬅️ Voltar",
        CallbackData::Navigation {
            action: NavAction::Back,
            target: target.to_string(),
        },
    )
}

pub fn main_menu_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![Button::callback(
            "📅 Próximas corridas",
            CallbackData::RacesList { distance: None },
        )],
        vec![
            Button::callback(
                "🔎 Buscar por distância",
                CallbackData::Navigation {
                    action: NavAction::Back,
                    target: "search".to_string(),
                },
            ),
            Button::callback(
                "⭐ Favoritos",
                CallbackData::Navigation {
                    action: NavAction::Back,
                    target: "favorites".to_string(),
                },
            ),
        ],
        vec![Button::callback(
            "⚙️ Configurações",
            CallbackData::UserConfig {
                action: ConfigAction::Menu,
                value: None,
            },
        )],
    ])
}

pub fn main_menu(name: &str) -> CommandOutput {
    CommandOutput::html(format!(
        "🏃 Olá, <b>{}</b>! O que você quer ver?",
        escape_html(name)
    ))
    .with_keyboard(main_menu_keyboard())
}

pub fn quick_filter_row() -> Vec<Button> {
    [5, 10, 21, 42]
        .into_iter()
        .map(|d| Button::callback(format!("{d}km"), CallbackData::RacesFilter { distance: d }))
        .collect()
}

pub fn search_menu() -> CommandOutput {
    let mut keyboard = Keyboard::one_per_row(SEARCH_PRESETS.iter().map(|&(start, end, label)| {
        Button::callback(
            format!("📏 {label}"),
            CallbackData::RacesSearch {
                start_distance: start,
                end_distance: end,
            },
        )
    }));
    keyboard.push_row(vec![home_button()]);
    CommandOutput::html(
        "🔎 <b>Buscar corridas por distância</b>\n\nEscolha uma faixa ou use \
         <code>/buscar_corridas 5 10</code>.",
    )
    .with_keyboard(keyboard)
}

/// Slice `len` items into pages. Returns the clamped page and the page count.
pub fn clamp_page(len: usize, page: usize, page_size: usize) -> (usize, usize) {
    let page_size = page_size.max(1);
    let pages = len.div_ceil(page_size).max(1);
    (page.min(pages - 1), pages)
}

fn pagination_row(target: &ListTarget, page: usize, pages: usize) -> Vec<Button> {
    let target = target.as_target();
    let mut actions = Vec::new();
    if page > 0 {
        actions.push(("◀️ Anterior", PageAction::Prev));
    }
    if page + 1 < pages {
        actions.push(("Próxima ▶️", PageAction::Next));
    }

    let mut row = Vec::new();
    for (label, action) in actions {
        let data = CallbackData::Pagination {
            action,
            page: page as u32,
            target: target.clone(),
        };
        // Long distance lists can push the target past the payload limit.
        if !validate_size(&data) {
            warn!(%target, size = get_size(&data), "pagination target too long; button omitted");
            continue;
        }
        row.push(Button::callback(label, data));
    }
    row
}

/// One page of races with a details button per race and prev/next controls.
pub fn races_page(
    heading: &str,
    races: &[Race],
    target: &ListTarget,
    page: usize,
    page_size: usize,
) -> CommandOutput {
    if races.is_empty() {
        return CommandOutput::html(format!("{heading}\n\n{NO_RACES_TEXT}"))
            .with_keyboard(Keyboard::new(vec![vec![home_button()]]));
    }

    let (page, pages) = clamp_page(races.len(), page, page_size);
    let start = page * page_size.max(1);
    let shown = races.iter().skip(start).take(page_size.max(1));

    let mut text = heading.to_string();
    for race in shown.clone() {
        text.push_str("\n\n");
        text.push_str(&race_summary(race));
    }
    if pages > 1 {
        text.push_str(&format!("\n\n📄 Página {} de {pages}", page + 1));
    }

    let mut keyboard = Keyboard::one_per_row(shown.map(details_button));
    keyboard.push_row(pagination_row(target, page, pages));
    if *target == ListTarget::Races {
        keyboard.push_row(quick_filter_row());
    }
    keyboard.push_row(vec![home_button()]);
    CommandOutput::html(text).with_keyboard(keyboard)
}

pub fn favorites_page(favorites: &[Favorite], page: usize, page_size: usize) -> CommandOutput {
    if favorites.is_empty() {
        return CommandOutput::html(
            "⭐ Você ainda não tem corridas favoritas.\n\nAbra uma corrida e toque em \
             <b>Lembrar-me</b> para salvá-la.",
        )
        .with_keyboard(Keyboard::new(vec![vec![home_button()]]));
    }

    let (page, pages) = clamp_page(favorites.len(), page, page_size);
    let shown: Vec<&Favorite> = favorites
        .iter()
        .skip(page * page_size.max(1))
        .take(page_size.max(1))
        .collect();

    let mut text = "⭐ <b>Suas corridas favoritas</b>".to_string();
    for fav in &shown {
        let bell = if fav.reminder { "⏰" } else { "🔕" };
        text.push_str(&format!("\n\n{bell} {}", race_summary(&fav.race)));
    }
    if pages > 1 {
        text.push_str(&format!("\n\n📄 Página {} de {pages}", page + 1));
    }

    let mut keyboard = Keyboard::default();
    for fav in shown {
        let toggle = if fav.reminder {
            ReminderButton::Cancel
        } else {
            ReminderButton::Set
        };
        keyboard.push_row(vec![details_button(&fav.race), toggle.button(&fav.race.id)]);
    }
    keyboard.push_row(pagination_row(&ListTarget::Favorites, page, pages));
    keyboard.push_row(vec![home_button()]);
    CommandOutput::html(text).with_keyboard(keyboard)
}

#[derive(Clone, Copy)]
pub enum ReminderButton {
    Set,
    Cancel,
}

impl ReminderButton {
    pub fn button(self, race_id: &str) -> Button {
        let (label, action) = match self {
            Self::Set => ("⏰ Lembrar-me", crate::callback::ReminderAction::Set),
            Self::Cancel => ("🔕 Cancelar lembrete", crate::callback::ReminderAction::Cancel),
        };
        Button::callback(
            label,
            CallbackData::RaceReminder {
                race_id: race_id.to_string(),
                action,
            },
        )
    }
}

/// Details screen. `reminder` is the user's favorite state, if known.
pub fn race_details_output(race: &Race, reminder: Option<bool>) -> CommandOutput {
    let toggle = if reminder == Some(true) {
        ReminderButton::Cancel
    } else {
        ReminderButton::Set
    };
    let mut keyboard = Keyboard::default();
    keyboard.push_row(vec![
        toggle.button(&race.id),
        Button::callback(
            "📍 Localização",
            CallbackData::RaceLocation {
                race_id: race.id.clone(),
            },
        ),
    ]);
    if let Some(link) = race.link.as_deref().filter(|l| !l.trim().is_empty()) {
        keyboard.push_row(vec![Button::url("🔗 Inscrições", link)]);
    }
    keyboard.push_row(vec![back_button("races"), home_button()]);
    CommandOutput::html(race_details(race, reminder)).with_keyboard(keyboard)
}

/// Google Maps search URL for a race: coordinates when known, else the address.
pub fn maps_url(race: &Race) -> Option<String> {
    if let (Some(lat), Some(lon)) = (race.latitude, race.longitude) {
        return Some(format!(
            "https://www.google.com/maps/search/?api=1&query={lat},{lon}"
        ));
    }
    let query: Vec<&str> = [race.location.as_deref(), race.city.as_deref()]
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect();
    if query.is_empty() {
        return None;
    }
    Some(format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        urlencoding::encode(&query.join(", "))
    ))
}

pub fn settings_menu(prefs: &UserPreferences) -> CommandOutput {
    let notifications = if prefs.notifications_enabled {
        "ativadas"
    } else {
        "desativadas"
    };
    let text = format!(
        "⚙️ <b>Configurações</b>\n\n📏 Distâncias preferidas: {}\n🔔 Notificações: {notifications}\n⏰ Lembrete: {}",
        format_distances(&prefs.preferred_distances),
        reminder_label(prefs.reminder_days),
    );
    let uc = |label: String, action| {
        Button::callback(
            label,
            CallbackData::UserConfig {
                action,
                value: None,
            },
        )
    };
    let keyboard = Keyboard::new(vec![
        vec![uc("📏 Distâncias".to_string(), ConfigAction::Distances)],
        vec![uc(
            format!(
                "🔔 {} notificações",
                if prefs.notifications_enabled {
                    "Desativar"
                } else {
                    "Ativar"
                }
            ),
            ConfigAction::Notifications,
        )],
        vec![uc("⏰ Antecedência do lembrete".to_string(), ConfigAction::ReminderTime)],
        vec![home_button()],
    ]);
    CommandOutput::html(text).with_keyboard(keyboard)
}

fn reminder_label(days: u32) -> String {
    match days {
        1 => "1 dia antes".to_string(),
        n => format!("{n} dias antes"),
    }
}

fn settings_back_button() -> Button {
    Button::callback(
        "⬅️ Voltar",
        CallbackData::UserConfig {
            action: ConfigAction::Menu,
            value: None,
        },
    )
}

pub fn distance_settings(prefs: &UserPreferences) -> CommandOutput {
    let row = DISTANCE_OPTIONS
        .iter()
        .map(|&d| {
            let mark = if prefs.preferred_distances.contains(&d) {
                "✅"
            } else {
                "▫️"
            };
            Button::callback(
                format!("{mark} {d}km"),
                CallbackData::UserConfig {
                    action: ConfigAction::ToggleDistance,
                    value: Some(d.to_string()),
                },
            )
        })
        .collect();
    CommandOutput::html("📏 <b>Distâncias preferidas</b>\n\nToque para marcar ou desmarcar.")
        .with_keyboard(Keyboard::new(vec![row, vec![settings_back_button()]]))
}

pub fn reminder_settings(prefs: &UserPreferences) -> CommandOutput {
    let row = REMINDER_DAY_OPTIONS
        .iter()
        .map(|&days| {
            let mark = if prefs.reminder_days == days { "✅ " } else { "" };
            Button::callback(
                format!("{mark}{days}d"),
                CallbackData::UserConfig {
                    action: ConfigAction::ReminderTime,
                    value: Some(days.to_string()),
                },
            )
        })
        .collect();
    CommandOutput::html("⏰ <b>Quantos dias antes da corrida devo lembrar você?</b>")
        .with_keyboard(Keyboard::new(vec![row, vec![settings_back_button()]]))
}
