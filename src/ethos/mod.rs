mod de;
mod error;
pub mod model;

#[cfg(test)]
pub(crate) mod mock;

pub use error::Error;
pub use model::{
    Activity, ActivityKind, ActivityPage, Actor, DirectoryProfile, Party, ProfileInfo, UserRecord,
};

use crate::config::ApiConfig;
use futures::future::{FutureExt, LocalBoxFuture};
use reqwest::Client as RClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_derive::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

pub type Result<T> = std::result::Result<T, Error>;

/// The read-only subset of the Ethos API used by the jobs.
///
/// Implementations return boxed local futures so callers can drive them one at
/// a time or join a bounded batch of them.
pub trait Api {
    /// Lists the members of a category.
    fn category_users(
        &self,
        category_id: u64,
        limit: usize,
    ) -> LocalBoxFuture<'_, Result<Vec<UserRecord>>>;

    /// Looks up users by X username or account id.
    fn users_by_x<'a>(&'a self, usernames: &'a [String])
        -> LocalBoxFuture<'a, Result<Vec<UserRecord>>>;

    fn profile_activities(
        &self,
        profile_id: u64,
        limit: usize,
        offset: usize,
    ) -> LocalBoxFuture<'_, Result<ActivityPage>>;

    /// One page of the profile directory, sorted by available invites.
    fn profile_directory(
        &self,
        limit: usize,
        offset: usize,
    ) -> LocalBoxFuture<'_, Result<Vec<DirectoryProfile>>>;

    fn profiles_by_id<'a>(
        &'a self,
        ids: &'a [u64],
        limit: usize,
    ) -> LocalBoxFuture<'a, Result<Vec<ProfileInfo>>>;
}

#[derive(Deserialize)]
struct CategoryUsers {
    #[serde(default, deserialize_with = "de::lenient_list")]
    users: Option<Vec<UserRecord>>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    data: Option<Values<T>>,
}

#[derive(Deserialize)]
struct Values<T> {
    #[serde(default)]
    values: Vec<T>,
}

pub struct Client {
    underlying: RClient,
    base: Url,
}

impl Client {
    const CATEGORY_USERS_PATH: &'static str = "api/v2/categories";
    const USERS_BY_X_PATH: &'static str = "api/v2/users/by/x";
    const ACTIVITIES_PATH: &'static str = "api/v2/activities/profile/all";
    const DIRECTORY_PATH: &'static str = "api/v1/profiles/directory";
    const PROFILES_PATH: &'static str = "api/v1/profiles";

    pub fn new(config: &ApiConfig) -> Result<Client> {
        let underlying = RClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .tcp_keepalive(Some(Duration::from_secs(20)))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Client {
            underlying,
            base: Url::parse(&config.base_url)?,
        })
    }

    /// The URL of the member listing, as recorded in snapshot metadata.
    pub fn category_users_url(&self, category_id: u64, limit: usize) -> Result<Url> {
        let mut url = self.endpoint(&format!(
            "{}/{}/users",
            Self::CATEGORY_USERS_PATH,
            category_id
        ))?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        log::debug!("GET {}", url);
        let response = self.underlying.get(url.clone()).send().await?;

        Self::check_status(&url, response)?.json::<T>().await.map_err(From::from)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: Url, body: &B) -> Result<T> {
        log::debug!("POST {}", url);
        let response = self.underlying.post(url.clone()).json(body).send().await?;

        Self::check_status(&url, response)?.json::<T>().await.map_err(From::from)
    }

    fn check_status(url: &Url, response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Error::UnexpectedStatus {
                status: response.status(),
                url: url.to_string(),
            })
        }
    }

    fn unwrap_envelope<T>(url: &Url, envelope: Envelope<T>) -> Result<Vec<T>> {
        match envelope.data {
            Some(data) if envelope.ok => Ok(data.values),
            _ => Err(Error::MalformedResponse {
                url: url.to_string(),
                reason: "missing ok/data.values envelope",
            }),
        }
    }

    async fn fetch_category_users(&self, category_id: u64, limit: usize) -> Result<Vec<UserRecord>> {
        let url = self.category_users_url(category_id, limit)?;
        let response = self.get_json::<CategoryUsers>(url.clone()).await?;

        response.users.ok_or_else(|| Error::MalformedResponse {
            url: url.to_string(),
            reason: "missing users field",
        })
    }

    async fn fetch_users_by_x(&self, usernames: &[String]) -> Result<Vec<UserRecord>> {
        let url = self.endpoint(Self::USERS_BY_X_PATH)?;

        self.post_json(url, &json!({ "accountIdsOrUsernames": usernames }))
            .await
    }

    async fn fetch_profile_activities(
        &self,
        profile_id: u64,
        limit: usize,
        offset: usize,
    ) -> Result<ActivityPage> {
        let url = self.endpoint(Self::ACTIVITIES_PATH)?;
        let body = json!({
            "userkey": format!("profileId:{}", profile_id),
            "excludeHistorical": false,
            "limit": limit,
            "offset": offset,
        });

        self.post_json(url, &body).await
    }

    async fn fetch_profile_directory(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DirectoryProfile>> {
        let mut url = self.endpoint(Self::DIRECTORY_PATH)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("sortField", "invitesAvailable");

        let envelope = self.get_json::<Envelope<DirectoryProfile>>(url.clone()).await?;

        Self::unwrap_envelope(&url, envelope)
    }

    async fn fetch_profiles_by_id(&self, ids: &[u64], limit: usize) -> Result<Vec<ProfileInfo>> {
        let url = self.endpoint(Self::PROFILES_PATH)?;
        let body = json!({
            "ids": ids,
            "limit": limit,
            "offset": 0,
            "useCache": true,
        });
        let envelope = self.post_json::<_, Envelope<ProfileInfo>>(url.clone(), &body).await?;

        Self::unwrap_envelope(&url, envelope)
    }
}

impl Api for Client {
    fn category_users(
        &self,
        category_id: u64,
        limit: usize,
    ) -> LocalBoxFuture<'_, Result<Vec<UserRecord>>> {
        self.fetch_category_users(category_id, limit).boxed_local()
    }

    fn users_by_x<'a>(
        &'a self,
        usernames: &'a [String],
    ) -> LocalBoxFuture<'a, Result<Vec<UserRecord>>> {
        self.fetch_users_by_x(usernames).boxed_local()
    }

    fn profile_activities(
        &self,
        profile_id: u64,
        limit: usize,
        offset: usize,
    ) -> LocalBoxFuture<'_, Result<ActivityPage>> {
        self.fetch_profile_activities(profile_id, limit, offset)
            .boxed_local()
    }

    fn profile_directory(
        &self,
        limit: usize,
        offset: usize,
    ) -> LocalBoxFuture<'_, Result<Vec<DirectoryProfile>>> {
        self.fetch_profile_directory(limit, offset).boxed_local()
    }

    fn profiles_by_id<'a>(
        &'a self,
        ids: &'a [u64],
        limit: usize,
    ) -> LocalBoxFuture<'a, Result<Vec<ProfileInfo>>> {
        self.fetch_profiles_by_id(ids, limit).boxed_local()
    }
}
