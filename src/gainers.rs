//! Points gained today by the participants of recent vouches and reviews.

use crate::ethos::{Activity, Party};
use crate::util::format::iso_timestamp;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;

const AVATAR_PLACEHOLDER: &str = "https://via.placeholder.com/35";

/// The subset of the activity feed snapshot read by this job.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedInput {
    pub data: FeedLists,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedLists {
    pub vouches: Vec<Activity>,
    pub reviews: Vec<Activity>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Window {
    /// Activities on the current local calendar day.
    Today,
    /// Activities in the trailing 24 hours.
    Recent,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gainer {
    pub display_name: String,
    pub avatar_url: String,
    pub points: u64,
    pub activities: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GainerStats {
    pub total_gainers: usize,
    pub total_points_gained: u64,
    pub today_vouches: usize,
    pub today_reviews: usize,
    pub recent_vouches: usize,
    pub recent_reviews: usize,
    pub data_source: Window,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankChanges {
    pub success: bool,
    pub data: Vec<Gainer>,
    pub stats: GainerStats,
    pub last_updated: String,
}

#[derive(Default)]
struct Points {
    order: Vec<String>,
    by_name: HashMap<String, Gainer>,
}

impl Points {
    fn add(&mut self, party: &Party, points: u64, reason: &str) {
        let name = match party.label() {
            Some(name) => name.to_string(),
            None => return,
        };

        let order = &mut self.order;
        let gainer = self.by_name.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            Gainer {
                display_name: name,
                avatar_url: party
                    .avatar
                    .clone()
                    .filter(|avatar| !avatar.is_empty())
                    .unwrap_or_else(|| AVATAR_PLACEHOLDER.to_string()),
                points: 0,
                activities: vec![],
            }
        });

        gainer.points += points;
        gainer.activities.push(reason.to_string());
    }

    fn add_all(&mut self, activities: &[&Activity], given: (u64, &str), received: (u64, &str)) {
        for activity in activities {
            if let (Some(author), Some(subject)) = (&activity.author, &activity.subject) {
                self.add(author, given.0, given.1);
                self.add(subject, received.0, received.1);
            }
        }
    }

    /// Gainers with positive points, highest first, encounter order on ties.
    fn top(mut self, count: usize) -> Vec<Gainer> {
        let mut gainers = self
            .order
            .iter()
            .filter_map(|name| self.by_name.remove(name))
            .filter(|gainer| gainer.points > 0)
            .collect::<Vec<_>>();

        gainers.sort_by(|a, b| b.points.cmp(&a.points));
        gainers.truncate(count);
        gainers
    }
}

pub fn compute<Tz: TimeZone>(
    vouches: &[Activity],
    reviews: &[Activity],
    now: DateTime<Tz>,
    top: usize,
) -> RankChanges {
    let today = now.date_naive();
    let on_today = |activity: &&Activity| {
        activity
            .time()
            .and_then(|ts| now.timezone().timestamp_opt(ts, 0).single())
            .map_or(false, |time| time.date_naive() == today)
    };

    let today_vouches = vouches.iter().filter(on_today).collect::<Vec<_>>();
    let today_reviews = reviews.iter().filter(on_today).collect::<Vec<_>>();

    let (window, final_vouches, final_reviews) =
        if today_vouches.is_empty() && today_reviews.is_empty() {
            let cutoff = now.timestamp() - Duration::hours(24).num_seconds();
            let recent = |activity: &&Activity| activity.time().map_or(false, |ts| ts >= cutoff);

            log::info!("No activity today, using the last 24 hours");
            (
                Window::Recent,
                vouches.iter().filter(recent).collect::<Vec<_>>(),
                reviews.iter().filter(recent).collect::<Vec<_>>(),
            )
        } else {
            (Window::Today, today_vouches.clone(), today_reviews.clone())
        };

    let mut points = Points::default();
    points.add_all(&final_vouches, (10, "Vouch given (+10pts)"), (5, "Vouch received (+5pts)"));
    points.add_all(&final_reviews, (2, "Review given (+2pts)"), (1, "Review received (+1pt)"));

    let gainers = points.top(top);

    RankChanges {
        success: true,
        stats: GainerStats {
            total_gainers: gainers.len(),
            total_points_gained: gainers.iter().map(|gainer| gainer.points).sum(),
            today_vouches: today_vouches.len(),
            today_reviews: today_reviews.len(),
            recent_vouches: final_vouches.len(),
            recent_reviews: final_reviews.len(),
            data_source: window,
        },
        data: gainers,
        last_updated: iso_timestamp(now.with_timezone(&Utc)),
    }
}
