//! Recent vouches and reviews between members, enriched for display.

use crate::config::FeedConfig;
use crate::ethos::{Activity, ActivityKind, Api, Party};
use crate::rank::{RankingSnapshot, UserCard};
use crate::util::format::{
    activity_url, capitalize, eth, iso_timestamp, local_timestamp, profile_url, time_ago,
    wei_to_eth,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tokio::time::sleep;

const AVATAR_PLACEHOLDER: &str = "https://via.placeholder.com/32";
const UNKNOWN: &str = "Unknown";

/// Display fields added to each activity.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub author_name: String,
    pub subject_name: String,
    pub author_avatar: String,
    pub subject_avatar: String,
    pub time_ago: String,
    pub click_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vouch_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_id: Option<Value>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub activity: Activity,
    pub enriched: Enrichment,
}

impl FeedItem {
    fn time(&self) -> i64 {
        self.activity.time().unwrap_or(0)
    }
}

fn name(party: &Option<Party>) -> String {
    party
        .as_ref()
        .and_then(Party::label)
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn avatar(party: &Option<Party>) -> String {
    party
        .as_ref()
        .and_then(|party| party.avatar.as_deref())
        .filter(|avatar| !avatar.is_empty())
        .unwrap_or(AVATAR_PLACEHOLDER)
        .to_string()
}

/// Whether a payload value counts as present: not null, false, zero, or empty.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => number.as_f64().map_or(false, |n| n != 0.0),
        Value::String(value) => !value.is_empty(),
        _ => true,
    }
}

/// The staked amount of a vouch in ETH, from the first populated field.
pub fn stake_amount(activity: &Activity) -> String {
    let candidates: [(&Value, fn(&Value) -> String); 5] = [
        (&activity.data["deposited"], wei_to_eth),
        (&activity.content["deposited"], wei_to_eth),
        (&activity.data["staked"], wei_to_eth),
        (&activity.content["stakeAmount"], eth),
        (&activity.content["staked"], wei_to_eth),
    ];

    candidates
        .iter()
        .find(|(value, _)| is_set(value))
        .map(|(value, convert)| (*convert)(*value))
        .unwrap_or_else(|| "0.000".to_string())
}

fn click_url(kind: &str, id: &Option<Value>, subject: &Option<Party>) -> String {
    match id {
        Some(id) => activity_url(kind, id),
        None => profile_url(
            subject
                .as_ref()
                .and_then(|party| party.username.as_deref())
                .unwrap_or("undefined"),
        ),
    }
}

pub fn enrich(activity: Activity, now: DateTime<Utc>) -> Option<FeedItem> {
    let id = Some(activity.data["id"].clone()).filter(is_set);
    let mut enriched = Enrichment {
        author_name: name(&activity.author),
        subject_name: name(&activity.subject),
        author_avatar: avatar(&activity.author),
        subject_avatar: avatar(&activity.subject),
        time_ago: time_ago(activity.time().unwrap_or(0), now),
        ..Enrichment::default()
    };

    match activity.kind() {
        ActivityKind::Vouch => {
            enriched.stake_amount = Some(stake_amount(&activity));
            enriched.click_url = click_url("vouch", &id, &activity.subject);
            enriched.vouch_id = id;
        }
        ActivityKind::Review => {
            let score = activity.data["score"]
                .as_str()
                .filter(|score| !score.is_empty())
                .unwrap_or("neutral")
                .to_string();
            let class = match score.as_str() {
                "positive" | "negative" => score.clone(),
                _ => "neutral".to_string(),
            };

            enriched.score_text = Some(capitalize(&score));
            enriched.score = Some(score);
            enriched.score_class = Some(class);
            enriched.click_url = click_url("review", &id, &activity.subject);
            enriched.review_id = id;
        }
        _ => return None,
    }

    Some(FeedItem { activity, enriched })
}

/// Member-to-member vouches and reviews, deduplicated across histories.
pub struct Collector {
    members: HashSet<u64>,
    seen: HashSet<String>,
    pub vouches: Vec<FeedItem>,
    pub reviews: Vec<FeedItem>,
}

impl Collector {
    pub fn new(members: HashSet<u64>) -> Self {
        Collector {
            members,
            seen: HashSet::new(),
            vouches: vec![],
            reviews: vec![],
        }
    }

    fn key(activity: &Activity) -> String {
        let part = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();

        format!(
            "{}-{}-{}-{}",
            activity.kind.as_deref().unwrap_or_default(),
            activity.author_id().map(|v| v.to_string()).unwrap_or_default(),
            activity.subject_id().map(|v| v.to_string()).unwrap_or_default(),
            part(activity.created_at.or(activity.timestamp))
        )
    }

    pub fn add(&mut self, activities: Vec<Activity>, now: DateTime<Utc>) {
        for activity in activities {
            let (author, subject) = match (activity.author_id(), activity.subject_id()) {
                (Some(author), Some(subject)) => (author, subject),
                _ => continue,
            };

            if author == subject || !self.members.contains(&author) || !self.members.contains(&subject) {
                continue;
            }

            let kind = activity.kind();
            if kind != ActivityKind::Vouch && kind != ActivityKind::Review {
                continue;
            }

            if !self.seen.insert(Self::key(&activity)) {
                continue;
            }

            if let Some(item) = enrich(activity, now) {
                match kind {
                    ActivityKind::Vouch => self.vouches.push(item),
                    _ => self.reviews.push(item),
                }
            }
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct FeedData {
    pub vouches: Vec<FeedItem>,
    pub reviews: Vec<FeedItem>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub success: bool,
    pub total_vouches: usize,
    pub total_reviews: usize,
    pub recent_vouches: usize,
    pub recent_reviews: usize,
    pub users_processed: usize,
    pub generated_at: String,
    pub last_updated: String,
    pub data: FeedData,
}

fn newest(mut items: Vec<FeedItem>, keep: usize) -> Vec<FeedItem> {
    items.sort_by_key(|item| std::cmp::Reverse(item.time()));
    items.truncate(keep);
    items
}

async fn history<A: Api + ?Sized>(api: &A, user: &UserCard, limit: usize) -> Vec<Activity> {
    let profile_id = match user.profile_id {
        Some(profile_id) => profile_id,
        None => {
            log::warn!("Skipping {:?}: no profile id", user.username);
            return vec![];
        }
    };

    match api.profile_activities(profile_id, limit, 0).await {
        Ok(page) => page.values,
        Err(error) => {
            log::warn!("Activity fetch failed for profile {}: {}", profile_id, error);
            vec![]
        }
    }
}

/// Builds the feed from the histories of the top ranked members.
pub async fn collect<A: Api + ?Sized>(
    api: &A,
    ranking: &RankingSnapshot,
    config: &FeedConfig,
    now: DateTime<Utc>,
) -> crate::Result<Feed> {
    if ranking.ranking.is_empty() {
        return Err(crate::Error::NoData("no ranking data"));
    }

    let users = ranking
        .ranking
        .iter()
        .take(config.users)
        .map(|entry| &entry.user)
        .collect::<Vec<_>>();
    let mut collector = Collector::new(ranking.profile_ids().into_iter().collect());
    let batch_size = config.batch_size.max(1);
    let batch_count = (users.len() + batch_size - 1) / batch_size;

    for (index, batch) in users.chunks(batch_size).enumerate() {
        log::info!("Fetching batch {}/{} ({} users)", index + 1, batch_count, batch.len());

        let histories = join_all(
            batch
                .iter()
                .map(|user| history(api, user, config.page_limit)),
        )
        .await;

        for activities in histories {
            collector.add(activities, now);
        }

        if index + 1 < batch_count && !config.pause().is_zero() {
            sleep(config.pause()).await;
        }
    }

    let total_vouches = collector.vouches.len();
    let total_reviews = collector.reviews.len();
    let vouches = newest(collector.vouches, config.keep);
    let reviews = newest(collector.reviews, config.keep);

    log::info!(
        "Found {} vouches and {} reviews between members",
        total_vouches,
        total_reviews
    );

    Ok(Feed {
        success: true,
        total_vouches,
        total_reviews,
        recent_vouches: vouches.len(),
        recent_reviews: reviews.len(),
        users_processed: users.len(),
        generated_at: iso_timestamp(now),
        last_updated: local_timestamp(now),
        data: FeedData { vouches, reviews },
    })
}
