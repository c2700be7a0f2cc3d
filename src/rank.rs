//! Point-based ranking of members by their interactions with other members.

use crate::config::RankingConfig;
use crate::ethos::{Activity, ActivityKind, Api, UserRecord};
use crate::util::format::{iso_timestamp, profile_url, x_url};
use chrono::{DateTime, TimeZone, Utc};
use csv::WriterBuilder;
use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use tokio::time::sleep;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    pub review_received: u64,
    pub review_given: u64,
    pub vouch_received: u64,
    pub vouch_given: u64,
}

pub const WEIGHTS: Weights = Weights {
    review_received: 1,
    review_given: 2,
    vouch_received: 5,
    vouch_given: 10,
};

impl Default for Weights {
    fn default() -> Self {
        WEIGHTS
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AvatarRef {
    pub avatar: Option<String>,
}

/// Interaction counters for one member. Only interactions with other members
/// are counted.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreStats {
    pub reviews_received: u64,
    pub reviews_given: u64,
    pub vouches_received: u64,
    pub vouches_given: u64,
    pub attestations_received: u64,
    pub attestations_given: u64,
    pub total_score: u64,
    pub reviews_given_avatars: Vec<AvatarRef>,
    pub reviews_received_avatars: Vec<AvatarRef>,
    pub vouches_given_avatars: Vec<AvatarRef>,
    pub vouches_received_avatars: Vec<AvatarRef>,
}

impl ScoreStats {
    pub fn score(&self, weights: &Weights) -> u64 {
        self.reviews_received * weights.review_received
            + self.reviews_given * weights.review_given
            + self.vouches_received * weights.vouch_received
            + self.vouches_given * weights.vouch_given
    }

    /// The number of scored interactions.
    pub fn interactions(&self) -> u64 {
        self.reviews_received + self.reviews_given + self.vouches_received + self.vouches_given
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreEntry {
    pub stats: ScoreStats,
    /// Unix seconds of the most recent activity of any kind.
    pub last_activity: Option<i64>,
}

/// Members indexed by profile id.
pub struct Membership<'a> {
    by_profile_id: HashMap<u64, &'a UserRecord>,
}

impl<'a> Membership<'a> {
    pub fn new(users: &'a [UserRecord]) -> Membership<'a> {
        let mut by_profile_id = HashMap::new();
        for user in users {
            if let Some(profile_id) = user.profile_id {
                by_profile_id.entry(profile_id).or_insert(user);
            }
        }

        Membership { by_profile_id }
    }

    pub fn contains(&self, profile_id: u64) -> bool {
        self.by_profile_id.contains_key(&profile_id)
    }

    pub fn get(&self, profile_id: u64) -> Option<&'a UserRecord> {
        self.by_profile_id.get(&profile_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_profile_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_profile_id.is_empty()
    }
}

/// Adds one member's activity history to their counters.
pub fn tally(entry: &mut ScoreEntry, profile_id: u64, activities: &[Activity], members: &Membership) {
    for activity in activities {
        if let Some(time) = activity.time() {
            if entry.last_activity.map_or(true, |last| time > last) {
                entry.last_activity = Some(time);
            }
        }

        let kind = activity.kind();
        let stats = &mut entry.stats;

        if activity.author_id() == Some(profile_id) {
            if let Some(other) = activity.subject_id().and_then(|id| members.get(id)) {
                let avatar = AvatarRef {
                    avatar: other.avatar_url.clone(),
                };
                match kind {
                    ActivityKind::Review => {
                        stats.reviews_given += 1;
                        stats.reviews_given_avatars.push(avatar);
                    }
                    ActivityKind::Vouch => {
                        stats.vouches_given += 1;
                        stats.vouches_given_avatars.push(avatar);
                    }
                    ActivityKind::Attestation => stats.attestations_given += 1,
                    ActivityKind::Other => {}
                }
            }
        }

        if activity.subject_id() == Some(profile_id) {
            if let Some(other) = activity.author_id().and_then(|id| members.get(id)) {
                let avatar = AvatarRef {
                    avatar: other.avatar_url.clone(),
                };
                match kind {
                    ActivityKind::Review => {
                        stats.reviews_received += 1;
                        stats.reviews_received_avatars.push(avatar);
                    }
                    ActivityKind::Vouch => {
                        stats.vouches_received += 1;
                        stats.vouches_received_avatars.push(avatar);
                    }
                    ActivityKind::Attestation => stats.attestations_received += 1,
                    ActivityKind::Other => {}
                }
            }
        }
    }

    entry.stats.total_score = entry.stats.score(&WEIGHTS);
}

async fn fetch_history<A: Api + ?Sized>(
    api: &A,
    profile_id: u64,
    config: &RankingConfig,
) -> crate::ethos::Result<Vec<Activity>> {
    let limit = config.page_limit.max(1);
    let mut activities = vec![];

    for page in 0..config.pages.max(1) {
        let offset = page * limit;
        let response = api.profile_activities(profile_id, limit, offset).await?;
        let fetched = response.values.len();
        activities.extend(response.values);

        let exhausted = response
            .total
            .map_or(false, |total| (offset + fetched) as u64 >= total);
        if fetched < limit || exhausted {
            break;
        }
    }

    Ok(activities)
}

/// Fetches and tallies the history of every member with a profile id, in
/// order. A member whose history cannot be fetched keeps zero counters.
pub async fn score_members<'a, A: Api + ?Sized>(
    api: &A,
    users: &'a [UserRecord],
    config: &RankingConfig,
) -> Vec<(&'a UserRecord, ScoreEntry)> {
    let members = Membership::new(users);
    let active = users
        .iter()
        .filter_map(|user| user.profile_id.map(|id| (user, id)))
        .collect::<Vec<_>>();

    log::info!(
        "Scoring {} members with profile ids ({} without)",
        active.len(),
        users.len() - active.len()
    );

    let mut scored = Vec::with_capacity(active.len());

    for (index, (user, profile_id)) in active.iter().enumerate() {
        if index > 0 && !config.pause().is_zero() {
            sleep(config.pause()).await;
        }
        if (index + 1) % 10 == 0 {
            log::info!("Scored {}/{}", index + 1, active.len());
        }

        let mut entry = ScoreEntry::default();

        match fetch_history(api, *profile_id, config).await {
            Ok(activities) => tally(&mut entry, *profile_id, &activities, &members),
            Err(error) => log::warn!("Activity fetch failed for {}: {}", user.handle(), error),
        }

        scored.push((*user, entry));
    }

    scored
}

/// Public fields of a ranked member.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserCard {
    pub id: Option<u64>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_id: Option<u64>,
    pub primary_address: Option<String>,
    pub profile_url: String,
    pub twitter_url: String,
}

impl From<&UserRecord> for UserCard {
    fn from(user: &UserRecord) -> Self {
        UserCard {
            id: user.id,
            username: user.username.clone(),
            display_name: crate::ethos::model::non_empty(&user.display_name)
                .map(str::to_string)
                .or_else(|| user.username.clone()),
            avatar_url: user.avatar_url.clone(),
            profile_id: user.profile_id,
            primary_address: user.primary_address.clone(),
            profile_url: profile_url(user.handle()),
            twitter_url: x_url(user.handle()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingEntry {
    pub rank: usize,
    pub user: UserCard,
    pub stats: ScoreStats,
    pub last_activity: Option<String>,
}

/// Orders entries by total score, highest first, keeping input order on ties.
pub fn rank(scored: Vec<(&UserRecord, ScoreEntry)>) -> Vec<RankingEntry> {
    scored
        .into_iter()
        .sorted_by(|(_, a), (_, b)| b.stats.total_score.cmp(&a.stats.total_score))
        .enumerate()
        .map(|(index, (user, entry))| RankingEntry {
            rank: index + 1,
            user: UserCard::from(user),
            stats: entry.stats,
            last_activity: entry
                .last_activity
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
                .map(iso_timestamp),
        })
        .collect()
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingMetadata {
    pub generated_at: String,
    pub total_gigachads: usize,
    pub active_users: usize,
    pub users_with_activity: usize,
    pub total_interactions: u64,
    pub scoring: Weights,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingSnapshot {
    pub metadata: RankingMetadata,
    pub ranking: Vec<RankingEntry>,
}

impl RankingSnapshot {
    pub fn new(total_gigachads: usize, ranking: Vec<RankingEntry>, now: DateTime<Utc>) -> Self {
        RankingSnapshot {
            metadata: RankingMetadata {
                generated_at: iso_timestamp(now),
                total_gigachads,
                active_users: ranking.len(),
                users_with_activity: ranking
                    .iter()
                    .filter(|entry| entry.stats.total_score > 0)
                    .count(),
                total_interactions: ranking.iter().map(|entry| entry.stats.interactions()).sum(),
                scoring: WEIGHTS,
            },
            ranking,
        }
    }

    /// Profile ids of every ranked member.
    pub fn profile_ids(&self) -> Vec<u64> {
        self.ranking
            .iter()
            .filter_map(|entry| entry.user.profile_id)
            .collect()
    }

    pub fn log_summary(&self) {
        log::info!(
            "{} members, {} with profile ids, {} with member activity, {} interactions",
            self.metadata.total_gigachads,
            self.metadata.active_users,
            self.metadata.users_with_activity,
            self.metadata.total_interactions
        );
    }
}

/// Writes the ranking as CSV, one row per member.
pub fn write_csv<W: Write>(ranking: &[RankingEntry], writer: W) -> Result<(), csv::Error> {
    let mut csv = WriterBuilder::new().from_writer(writer);
    csv.write_record(&[
        "rank",
        "username",
        "displayName",
        "reviewsReceived",
        "reviewsGiven",
        "vouchesReceived",
        "vouchesGiven",
        "totalScore",
        "profileUrl",
        "twitterUrl",
    ])?;

    for entry in ranking {
        csv.write_record(&[
            entry.rank.to_string(),
            entry.user.username.clone().unwrap_or_default(),
            entry.user.display_name.clone().unwrap_or_default(),
            entry.stats.reviews_received.to_string(),
            entry.stats.reviews_given.to_string(),
            entry.stats.vouches_received.to_string(),
            entry.stats.vouches_given.to_string(),
            entry.stats.total_score.to_string(),
            entry.user.profile_url.clone(),
            entry.user.twitter_url.clone(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethos::mock::{activity, user, MockApi};
    use std::collections::HashMap;

    fn no_pause() -> RankingConfig {
        RankingConfig {
            pause_ms: 0,
            ..RankingConfig::default()
        }
    }

    #[test]
    fn weighted_total() {
        let stats = ScoreStats {
            reviews_received: 3,
            reviews_given: 2,
            vouches_received: 1,
            vouches_given: 0,
            ..ScoreStats::default()
        };

        assert_eq!(stats.score(&WEIGHTS), 12);
    }

    #[test]
    fn counts_member_interactions_only() {
        let users = vec![user(1, Some(10), "a"), user(2, Some(20), "b")];
        let members = Membership::new(&users);
        let activities = vec![
            activity("review", 20, 10, 100),
            activity("review", 20, 10, 101),
            activity("review", 20, 10, 102),
            activity("review", 10, 20, 103),
            activity("review", 10, 20, 104),
            activity("vouch", 20, 10, 105),
            activity("vouch", 10, 99, 300),
            activity("review", 99, 10, 200),
            activity("attestation", 10, 20, 106),
        ];

        let mut entry = ScoreEntry::default();
        tally(&mut entry, 10, &activities, &members);

        assert_eq!(entry.stats.reviews_received, 3);
        assert_eq!(entry.stats.reviews_given, 2);
        assert_eq!(entry.stats.vouches_received, 1);
        assert_eq!(entry.stats.vouches_given, 0);
        assert_eq!(entry.stats.attestations_given, 1);
        assert_eq!(entry.stats.total_score, 12);
        assert_eq!(entry.stats.reviews_received_avatars.len(), 3);
        assert_eq!(entry.last_activity, Some(300));
    }

    #[tokio::test]
    async fn failed_fetch_leaves_zero_counters() {
        let users = vec![user(1, Some(10), "a"), user(2, Some(20), "b"), user(3, None, "c")];
        let mut activities = HashMap::new();
        activities.insert(20, vec![activity("vouch", 20, 10, 100)]);
        let api = MockApi {
            activities,
            ..MockApi::default()
        };

        let scored = score_members(&api, &users, &no_pause()).await;

        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].1, ScoreEntry::default());
        assert_eq!(scored[1].1.stats.vouches_given, 1);
        assert_eq!(scored[1].1.stats.total_score, 10);
        assert_eq!(
            api.calls(),
            vec![
                "profile_activities:10:500:0".to_string(),
                "profile_activities:20:500:0".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn reads_further_pages_when_configured() {
        let users = vec![user(1, Some(10), "a"), user(2, Some(20), "b")];
        let mut activities = HashMap::new();
        activities.insert(
            10,
            vec![
                activity("vouch", 10, 20, 1),
                activity("vouch", 10, 20, 2),
                activity("vouch", 10, 20, 3),
            ],
        );
        activities.insert(20, vec![]);
        let api = MockApi {
            activities,
            ..MockApi::default()
        };
        let config = RankingConfig {
            page_limit: 2,
            pages: 5,
            pause_ms: 0,
        };

        let scored = score_members(&api, &users, &config).await;

        assert_eq!(scored[0].1.stats.vouches_given, 3);
        assert_eq!(
            api.calls(),
            vec![
                "profile_activities:10:2:0".to_string(),
                "profile_activities:10:2:2".to_string(),
                "profile_activities:20:2:0".to_string()
            ]
        );
    }

    #[test]
    fn ranking_is_stable_and_descending() {
        let users = vec![user(1, Some(10), "a"), user(2, Some(20), "b"), user(3, Some(30), "c")];
        let entry = |score: u64| ScoreEntry {
            stats: ScoreStats {
                total_score: score,
                ..ScoreStats::default()
            },
            last_activity: None,
        };
        let scored = vec![(&users[0], entry(5)), (&users[1], entry(10)), (&users[2], entry(5))];

        let ranking = rank(scored);

        assert_eq!(
            ranking
                .iter()
                .map(|e| (e.rank, e.user.username.clone().unwrap()))
                .collect::<Vec<_>>(),
            vec![(1, "b".to_string()), (2, "a".to_string()), (3, "c".to_string())]
        );
        assert_eq!(ranking[0].user.display_name.as_deref(), Some("b"));
        assert_eq!(
            ranking[0].user.profile_url,
            "https://app.ethos.network/profile/x/b"
        );
    }

    #[test]
    fn snapshot_metadata_and_csv() {
        let users = vec![user(1, Some(10), "a"), user(2, Some(20), "b")];
        let scored = vec![
            (
                &users[0],
                ScoreEntry {
                    stats: ScoreStats {
                        vouches_given: 1,
                        total_score: 10,
                        ..ScoreStats::default()
                    },
                    last_activity: Some(1_700_000_000),
                },
            ),
            (&users[1], ScoreEntry::default()),
        ];
        let now = Utc.timestamp_opt(1_700_000_100, 0).unwrap();

        let snapshot = RankingSnapshot::new(3, rank(scored), now);

        assert_eq!(snapshot.metadata.total_gigachads, 3);
        assert_eq!(snapshot.metadata.active_users, 2);
        assert_eq!(snapshot.metadata.users_with_activity, 1);
        assert_eq!(snapshot.metadata.total_interactions, 1);
        assert_eq!(
            snapshot.ranking[0].last_activity.as_deref(),
            Some("2023-11-14T22:13:20.000Z")
        );

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["metadata"]["scoring"]["vouchGiven"], 10);
        assert_eq!(value["ranking"][0]["stats"]["vouchesGiven"], 1);

        let mut out = vec![];
        write_csv(&snapshot.ranking, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,a,a,0,0,0,1,10,"));
    }
}
