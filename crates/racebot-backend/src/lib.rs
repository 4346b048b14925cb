//! HTTP client for the races backend.
//!
//! Implements every service port from `racebot_core::ports` over a small JSON
//! API. A 404 on a lookup means "not found" and is never an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use racebot_core::{
    config::Config,
    domain::UserRef,
    errors::Error,
    ports::{
        Favorite, FavoriteService, MessageHistory, MessageRecord, Race, RaceService,
        UserPreferences, UserService,
    },
    Result,
};

const USER_AGENT: &str = "racebot/0.1";

#[derive(Clone, Debug)]
pub struct BackendClient {
    base: Url,
    api_key: Option<String>,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct NewUser<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct FavoriteBody {
    reminder: bool,
}

impl BackendClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid BACKEND_URL {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "BACKEND_URL {base_url:?} cannot be used as a base URL"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            base,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.backend_url,
            config.backend_api_key.clone(),
            config.backend_timeout,
        )
    }

    /// Base URL plus escaped path segments.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.http.request(method, url);
        match self.api_key.as_deref() {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        req.send()
            .await
            .map_err(|e| Error::Backend(format!("request error: {e}")))
    }

    /// Fail on any non-success status, keeping a short body excerpt.
    async fn check(resp: Response) -> Result<Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let url = resp.url().path().to_string();
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Backend(format!(
            "{url} returned {status}: {}",
            body.chars().take(200).collect::<String>()
        )))
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> Result<T> {
        resp.json()
            .await
            .map_err(|e| Error::Backend(format!("invalid response body: {e}")))
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "backend GET");
        let resp = self.send(self.request(Method::GET, url)).await?;
        Self::json(Self::check(resp).await?).await
    }

    /// GET where 404 means `None`.
    async fn find<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        debug!(url = %url, "backend GET");
        let resp = self.send(self.request(Method::GET, url)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::json(Self::check(resp).await?).await?))
    }

    async fn write<B: Serialize + ?Sized>(&self, method: Method, url: Url, body: &B) -> Result<()> {
        debug!(method = %method, url = %url, "backend write");
        let resp = self.send(self.request(method, url).json(body)).await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl RaceService for BackendClient {
    async fn list_upcoming(&self) -> Result<Vec<Race>> {
        self.fetch(self.url(&["races"])).await
    }

    async fn by_distances(&self, distances: &[u32]) -> Result<Vec<Race>> {
        let csv = distances
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.url(&["races"]);
        url.query_pairs_mut().append_pair("distances", &csv);
        self.fetch(url).await
    }

    async fn by_range(&self, start: u32, end: u32) -> Result<Vec<Race>> {
        let mut url = self.url(&["races", "search"]);
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("end", &end.to_string());
        self.fetch(url).await
    }

    async fn next_race(&self) -> Result<Option<Race>> {
        self.find(self.url(&["races", "next"])).await
    }

    async fn get(&self, race_id: &str) -> Result<Option<Race>> {
        self.find(self.url(&["races", race_id])).await
    }
}

#[async_trait]
impl UserService for BackendClient {
    async fn upsert(&self, user: &UserRef) -> Result<()> {
        let body = NewUser {
            id: &user.id.0,
            name: user.name.as_deref(),
        };
        self.write(Method::POST, self.url(&["users"]), &body).await
    }

    async fn preferences(&self, user: &UserRef) -> Result<Option<UserPreferences>> {
        self.find(self.url(&["users", &user.id.0, "preferences"]))
            .await
    }

    async fn update_preferences(&self, user: &UserRef, prefs: &UserPreferences) -> Result<()> {
        self.write(
            Method::PUT,
            self.url(&["users", &user.id.0, "preferences"]),
            prefs,
        )
        .await
    }
}

#[async_trait]
impl FavoriteService for BackendClient {
    async fn list(&self, user: &UserRef) -> Result<Vec<Favorite>> {
        let favorites = self
            .find(self.url(&["users", &user.id.0, "favorites"]))
            .await?;
        Ok(favorites.unwrap_or_default())
    }

    async fn save(&self, user: &UserRef, race_id: &str, reminder: bool) -> Result<()> {
        self.write(
            Method::PUT,
            self.url(&["users", &user.id.0, "favorites", race_id]),
            &FavoriteBody { reminder },
        )
        .await
    }

    async fn remove(&self, user: &UserRef, race_id: &str) -> Result<bool> {
        let url = self.url(&["users", &user.id.0, "favorites", race_id]);
        let resp = self.send(self.request(Method::DELETE, url)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(resp).await?;
        Ok(true)
    }
}

#[async_trait]
impl MessageHistory for BackendClient {
    async fn record(&self, record: MessageRecord) -> Result<()> {
        self.write(Method::POST, self.url(&["messages"]), &record)
            .await
    }
}
