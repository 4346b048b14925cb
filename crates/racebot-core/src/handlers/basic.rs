use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::{
    callback::{CallbackData, NavAction},
    command::{CommandInput, CommandOutput},
    formatting::escape_html,
    registry::{
        handler_fn, CallbackHandler, CallbackModule, CommandHandler, CommandModule, CommandSet,
    },
    Result,
};

use super::{
    render_list,
    settings::settings_screen,
    views::{main_menu, main_menu_keyboard, search_menu, ListTarget},
    Services,
};

/// Commands advertised to the platform, in menu order.
pub const BOT_COMMANDS: [(&str, &str); 8] = [
    ("start", "Começar"),
    ("corridas", "Próximas corridas"),
    ("proxima_corrida", "A próxima corrida"),
    ("buscar_corridas", "Buscar por distância"),
    ("favoritos", "Suas corridas favoritas"),
    ("config", "Preferências"),
    ("menu", "Menu principal"),
    ("ajuda", "Lista de comandos"),
];

pub fn help_text() -> String {
    let mut text = "ℹ️ <b>Comandos disponíveis</b>\n".to_string();
    for (name, description) in BOT_COMMANDS {
        text.push_str(&format!("\n/{name} - {description}"));
    }
    text.push_str(
        "\n\n💡 Filtre por distância direto pelo comando, por exemplo \
         <code>/corridas_5km,10km</code> ou <code>/buscar_corridas 5 10</code>.",
    );
    text
}

/// `/start`, `/menu` and `/ajuda`.
pub struct BasicCommands {
    services: Services,
}

impl BasicCommands {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl CommandModule for BasicCommands {
    fn name(&self) -> &str {
        "basic"
    }

    fn commands(&self) -> Result<CommandSet> {
        Ok(vec![
            (
                "start".to_string(),
                Arc::new(Start(self.services.clone())) as Arc<dyn CommandHandler>,
            ),
            (
                "menu".to_string(),
                handler_fn(|input: CommandInput| async move {
                    let name = input.user.as_ref().map(|u| u.display_name()).unwrap_or("corredor");
                    Ok(main_menu(name))
                }),
            ),
            (
                "ajuda".to_string(),
                handler_fn(|_| async { Ok(CommandOutput::html(help_text())) }),
            ),
        ])
    }
}

struct Start(Services);

#[async_trait]
impl CommandHandler for Start {
    async fn handle(&self, input: CommandInput) -> Result<CommandOutput> {
        let name = match input.user.as_ref() {
            Some(user) => {
                // Registration failures must not block the greeting.
                if let Err(e) = self.0.users.upsert(user).await {
                    warn!(user_id = %user.id, error = %e, "failed to register user");
                }
                user.display_name().to_string()
            }
            None => "corredor".to_string(),
        };

        Ok(CommandOutput::html(format!(
            "🏃 Olá, <b>{}</b>! Bem-vindo ao <b>Bot de Corridas</b>.\n\n\
             Aqui você encontra as próximas corridas de rua, filtra por distância \
             e recebe lembretes das suas favoritas.\n\n\
             Use os botões abaixo ou digite /ajuda.",
            escape_html(&name)
        ))
        .with_keyboard(main_menu_keyboard()))
    }
}

/// Back/home buttons (`nav`).
pub struct NavigationCallbacks {
    services: Services,
}

impl NavigationCallbacks {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl CallbackModule for NavigationCallbacks {
    fn name(&self) -> &str {
        "navigation"
    }

    fn handlers(&self) -> Result<Vec<Arc<dyn CallbackHandler>>> {
        let handlers: Vec<Arc<dyn CallbackHandler>> =
            vec![Arc::new(Navigation(self.services.clone()))];
        Ok(handlers)
    }
}

struct Navigation(Services);

#[async_trait]
impl CallbackHandler for Navigation {
    fn name(&self) -> &str {
        "navigation"
    }

    fn can_handle(&self, data: &CallbackData) -> bool {
        matches!(data, CallbackData::Navigation { .. })
    }

    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
        let Some(CallbackData::Navigation { action, target }) = input.callback_data else {
            return Ok(None);
        };
        let name = input
            .user
            .as_ref()
            .map(|u| u.display_name().to_string())
            .unwrap_or_else(|| "corredor".to_string());

        let out = match (action, target.as_str()) {
            (NavAction::Home, _) | (NavAction::Back, "home" | "menu") => main_menu(&name),
            (NavAction::Back, "search") => search_menu(),
            (NavAction::Back, "config") => settings_screen(&self.0, input.user.as_ref()).await?,
            (NavAction::Back, other) => match ListTarget::parse(other) {
                Some(list) => render_list(&self.0, &list, 0, input.user.as_ref()).await?,
                None => main_menu(&name),
            },
        };
        Ok(Some(out.editing()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::ButtonAction,
        handlers::test_support::{ana, callback_input, input, services},
    };

    fn nav(action: NavAction, target: &str) -> CallbackData {
        CallbackData::Navigation {
            action,
            target: target.to_string(),
        }
    }

    #[tokio::test]
    async fn start_registers_user_and_shows_menu() {
        let (backend, services) = services();
        let out = Start(services).handle(input()).await.unwrap();

        assert_eq!(backend.users(), vec![ana()]);
        assert!(out.text.contains("Olá, <b>Ana</b>"));
        assert!(out.keyboard.unwrap().buttons().any(|b| b.action
            == ButtonAction::Callback(CallbackData::RacesList { distance: None })));
    }

    #[tokio::test]
    async fn start_survives_backend_failure() {
        let (backend, services) = services();
        backend.fail(true);
        let out = Start(services).handle(input()).await.unwrap();
        assert!(out.text.contains("Bem-vindo"));
    }

    #[test]
    fn help_lists_every_command() {
        let text = help_text();
        for (name, _) in BOT_COMMANDS {
            assert!(text.contains(&format!("/{name} ")), "missing /{name}");
        }
    }

    #[tokio::test]
    async fn home_returns_to_main_menu() {
        let (_, services) = services();
        let out = Navigation(services)
            .handle(callback_input(nav(NavAction::Home, "races")))
            .await
            .unwrap()
            .unwrap();
        assert!(out.edit_message);
        assert!(out.text.contains("O que você quer ver?"));
    }

    #[tokio::test]
    async fn back_renders_the_target_screen() {
        let (_, services) = services();
        let handler = Navigation(services);

        let races = handler
            .handle(callback_input(nav(NavAction::Back, "races")))
            .await
            .unwrap()
            .unwrap();
        assert!(races.text.contains("Próximas corridas"));

        let search = handler
            .handle(callback_input(nav(NavAction::Back, "search")))
            .await
            .unwrap()
            .unwrap();
        assert!(search.text.contains("Buscar corridas por distância"));

        let config = handler
            .handle(callback_input(nav(NavAction::Back, "config")))
            .await
            .unwrap()
            .unwrap();
        assert!(config.text.contains("Configurações"));

        let unknown = handler
            .handle(callback_input(nav(NavAction::Back, "elsewhere")))
            .await
            .unwrap()
            .unwrap();
        assert!(unknown.text.contains("O que você quer ver?"));
    }
}
