//! The most recently created member profiles.

use crate::config::NewcomersConfig;
use crate::ethos::{model::non_empty, Api, ProfileInfo, UserRecord};
use crate::util::format::{age, iso_timestamp, local_timestamp, profile_url};
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub invited_by: Option<u64>,
    pub invites_available: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Newcomer {
    pub profile_id: u64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub invited_by: Option<u64>,
    pub score: Option<i64>,
    /// Creation time in unix milliseconds.
    pub real_created_at: i64,
    pub time_ago: String,
    pub profile_url: String,
    pub is_new: bool,
    pub profile_data: ProfileData,
}

impl Newcomer {
    fn new(user: &UserRecord, profile_id: u64, info: &ProfileInfo, created_at: i64, now: DateTime<Utc>) -> Self {
        let username = non_empty(&user.username)
            .or_else(|| non_empty(&user.display_name))
            .unwrap_or("Unknown");

        Newcomer {
            profile_id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            invited_by: info.invited_by,
            score: user.score,
            real_created_at: created_at.saturating_mul(1000),
            time_ago: age(created_at, now),
            profile_url: profile_url(username),
            is_new: true,
            profile_data: ProfileData {
                created_at,
                updated_at: info.updated_at,
                invited_by: info.invited_by,
                invites_available: info.invites_available,
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Newcomers {
    pub success: bool,
    pub total_processed: usize,
    pub api_profiles_fetched: usize,
    pub final_results: usize,
    pub generated_at: String,
    pub last_updated: String,
    pub data: Vec<Newcomer>,
}

/// Members with the highest profile ids, which are the likeliest to be new.
pub fn candidates(users: &[UserRecord], count: usize) -> Vec<(&UserRecord, u64)> {
    let mut candidates = users
        .iter()
        .filter_map(|user| user.profile_id.map(|id| (user, id)))
        .collect::<Vec<_>>();

    candidates.sort_by(|(_, a), (_, b)| b.cmp(a));
    candidates.truncate(count);
    candidates
}

pub async fn collect<A: Api + ?Sized>(
    api: &A,
    users: &[UserRecord],
    config: &NewcomersConfig,
    now: DateTime<Utc>,
) -> crate::Result<Newcomers> {
    let candidates = candidates(users, config.candidates);

    if candidates.is_empty() {
        return Err(crate::Error::NoData("no members with profile ids"));
    }

    let ids = candidates.iter().map(|(_, id)| *id).collect::<Vec<_>>();
    let profiles = api.profiles_by_id(&ids, config.candidates).await?;
    log::info!("Fetched {} of {} profiles", profiles.len(), ids.len());

    let mut newcomers = candidates
        .iter()
        .filter_map(|(user, profile_id)| {
            let info = profiles
                .iter()
                .find(|profile| profile.id == Some(*profile_id))?;
            let created_at = info.created_at?;

            Some(Newcomer::new(user, *profile_id, info, created_at, now))
        })
        .collect::<Vec<_>>();

    newcomers.sort_by(|a, b| b.real_created_at.cmp(&a.real_created_at));
    newcomers.truncate(config.keep);

    if newcomers.is_empty() {
        return Err(crate::Error::NoData("no profiles with creation dates"));
    }

    Ok(Newcomers {
        success: true,
        total_processed: candidates.len(),
        api_profiles_fetched: profiles.len(),
        final_results: newcomers.len(),
        generated_at: iso_timestamp(now),
        last_updated: local_timestamp(now),
        data: newcomers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethos::mock::{user, MockApi};
    use chrono::TimeZone;

    const NOW: i64 = 1_700_000_000;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(NOW, 0).unwrap()
    }

    fn info(id: u64, created_at: Option<i64>) -> ProfileInfo {
        ProfileInfo {
            id: Some(id),
            created_at,
            invited_by: Some(1),
            ..ProfileInfo::default()
        }
    }

    #[test]
    fn candidates_are_highest_profile_ids() {
        let users = vec![
            user(1, Some(5), "a"),
            user(2, None, "b"),
            user(3, Some(9), "c"),
            user(4, Some(7), "d"),
        ];

        let picked = candidates(&users, 2)
            .into_iter()
            .map(|(_, id)| id)
            .collect::<Vec<_>>();

        assert_eq!(picked, vec![9, 7]);
    }

    #[tokio::test]
    async fn newest_profiles_first() {
        let users = vec![user(1, Some(5), "a"), user(3, Some(9), "c"), user(4, Some(7), "d")];
        let api = MockApi {
            profiles: Some(vec![
                info(9, Some(NOW - 7_200)),
                info(7, Some(NOW - 30)),
                info(5, None),
            ]),
            ..MockApi::default()
        };

        let newcomers = collect(&api, &users, &NewcomersConfig::default(), now())
            .await
            .unwrap();

        assert_eq!(newcomers.total_processed, 3);
        assert_eq!(newcomers.api_profiles_fetched, 3);
        assert_eq!(newcomers.final_results, 2);
        assert_eq!(newcomers.data[0].profile_id, 7);
        assert_eq!(newcomers.data[0].time_ago, "Just now");
        assert_eq!(newcomers.data[0].real_created_at, (NOW - 30) * 1000);
        assert_eq!(newcomers.data[1].time_ago, "2h ago");
        assert_eq!(newcomers.data[1].profile_url, "https://app.ethos.network/profile/x/c");
        assert!(newcomers.data[1].is_new);
        assert_eq!(api.calls(), vec!["profiles_by_id:3:15".to_string()]);
    }

    #[tokio::test]
    async fn out_of_range_creation_dates_are_skipped() {
        let users = vec![user(1, Some(5), "a"), user(3, Some(9), "c")];
        let broken: ProfileInfo = serde_json::from_value(serde_json::json!({
            "id": 9,
            "createdAt": "-9999999999999999999999"
        }))
        .unwrap();
        assert_eq!(broken.created_at, None);

        let api = MockApi {
            profiles: Some(vec![broken, info(5, Some(NOW - 30))]),
            ..MockApi::default()
        };

        let newcomers = collect(&api, &users, &NewcomersConfig::default(), now())
            .await
            .unwrap();

        assert_eq!(newcomers.final_results, 1);
        assert_eq!(newcomers.data[0].profile_id, 5);
    }

    #[test]
    fn extreme_creation_date_saturates() {
        let newcomer = Newcomer::new(&user(1, Some(5), "a"), 5, &info(5, None), i64::MIN, now());

        assert_eq!(newcomer.real_created_at, i64::MIN);
        assert_eq!(newcomer.time_ago, format!("{}d ago", i64::MAX / 86_400));
    }

    #[tokio::test]
    async fn failed_lookup_is_fatal() {
        let api = MockApi::default();

        let result = collect(&api, &[user(1, Some(5), "a")], &NewcomersConfig::default(), now()).await;

        assert!(matches!(result, Err(crate::Error::Api(_))));
    }

    #[tokio::test]
    async fn no_dates_is_no_data() {
        let api = MockApi {
            profiles: Some(vec![info(5, None)]),
            ..MockApi::default()
        };

        let result = collect(&api, &[user(1, Some(5), "a")], &NewcomersConfig::default(), now()).await;

        assert!(matches!(result, Err(crate::Error::NoData(_))));
    }
}
