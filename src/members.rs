//! The member snapshot: fetch, deduplicate, recover profile ids, summarize.

use crate::config::Config;
use crate::dedup;
use crate::ethos::{Api, UserRecord};
use crate::recover::recover_missing;
use crate::stats::Statistics;
use crate::util::format::iso_timestamp;
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

const FETCH_METHOD: &str = "category-users+users-by-x";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MembersMetadata {
    pub total_count: usize,
    pub fetched_at: String,
    pub fetch_method: String,
    pub recovered_profiles_count: usize,
    pub duplicates_found: bool,
    pub duplicates_removed: usize,
    pub api_url: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MembersSnapshot {
    pub metadata: MembersMetadata,
    pub statistics: Statistics,
    pub users: Vec<UserRecord>,
}

impl MembersSnapshot {
    /// Profile ids of every member that has one, in snapshot order.
    pub fn profile_ids(&self) -> Vec<u64> {
        self.users.iter().filter_map(|user| user.profile_id).collect()
    }
}

/// Builds the member snapshot. Only the initial category listing is fatal.
pub async fn collect<A: Api + ?Sized>(
    api: &A,
    config: &Config,
    api_url: String,
    now: DateTime<Utc>,
) -> crate::Result<MembersSnapshot> {
    let users = api
        .category_users(config.api.category_id, config.api.member_limit)
        .await?;
    log::info!("Fetched {} members", users.len());

    let (users, first_audit, first_removed) = dedup::dedup(users);

    let missing = users.iter().filter(|user| user.profile_id.is_none()).count();
    if missing > 0 {
        log::info!("{} members have no profile id", missing);
    }

    let recovery = recover_missing(api, users, &config.recovery).await;

    // A recovered profile id may collide with one that was already present.
    let (users, second_audit, second_removed) = dedup::dedup(recovery.users);

    let statistics = Statistics::collect(&users);
    statistics.log_summary();

    Ok(MembersSnapshot {
        metadata: MembersMetadata {
            total_count: users.len(),
            fetched_at: iso_timestamp(now),
            fetch_method: FETCH_METHOD.to_string(),
            recovered_profiles_count: recovery.resolved,
            duplicates_found: first_audit.has_duplicates() || second_audit.has_duplicates(),
            duplicates_removed: first_removed + second_removed,
            api_url,
        },
        statistics,
        users,
    })
}
