use crate::ethos::{model::non_empty, UserRecord};
use serde_derive::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScoreTier {
    Untrusted,
    Questionable,
    Neutral,
    Known,
    Established,
    Reputable,
    Exemplary,
    Distinguished,
    Revered,
}

impl ScoreTier {
    pub fn for_score(score: i64) -> ScoreTier {
        match score {
            s if s < 800 => ScoreTier::Untrusted,
            s if s < 1200 => ScoreTier::Questionable,
            s if s < 1400 => ScoreTier::Neutral,
            s if s < 1600 => ScoreTier::Known,
            s if s < 1800 => ScoreTier::Established,
            s if s < 2000 => ScoreTier::Reputable,
            s if s < 2200 => ScoreTier::Exemplary,
            s if s < 2400 => ScoreTier::Distinguished,
            _ => ScoreTier::Revered,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDistribution {
    pub untrusted: usize,
    pub questionable: usize,
    pub neutral: usize,
    pub known: usize,
    pub established: usize,
    pub reputable: usize,
    pub exemplary: usize,
    pub distinguished: usize,
    pub revered: usize,
}

impl ScoreDistribution {
    fn add(&mut self, tier: ScoreTier) {
        let count = match tier {
            ScoreTier::Untrusted => &mut self.untrusted,
            ScoreTier::Questionable => &mut self.questionable,
            ScoreTier::Neutral => &mut self.neutral,
            ScoreTier::Known => &mut self.known,
            ScoreTier::Established => &mut self.established,
            ScoreTier::Reputable => &mut self.reputable,
            ScoreTier::Exemplary => &mut self.exemplary,
            ScoreTier::Distinguished => &mut self.distinguished,
            ScoreTier::Revered => &mut self.revered,
        };
        *count += 1;
    }
}

/// Field coverage and score summary for a member list.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    pub total: usize,
    pub with_profile_id: usize,
    pub without_profile_id: usize,
    pub with_username: usize,
    pub with_display_name: usize,
    pub with_description: usize,
    pub with_avatar: usize,
    pub with_score: usize,
    pub with_address: usize,
    pub average_score: f64,
    pub score_distribution: ScoreDistribution,
}

impl Statistics {
    pub fn collect(users: &[UserRecord]) -> Statistics {
        let count = |f: fn(&UserRecord) -> bool| users.iter().filter(|u| f(u)).count();
        let scores = users.iter().filter_map(|u| u.score).collect::<Vec<_>>();

        let mut score_distribution = ScoreDistribution::default();
        for score in &scores {
            score_distribution.add(ScoreTier::for_score(*score));
        }

        let average_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<i64>() as f64 / scores.len() as f64
        };

        Statistics {
            total: users.len(),
            with_profile_id: count(|u| u.profile_id.is_some()),
            without_profile_id: count(|u| u.profile_id.is_none()),
            with_username: count(|u| non_empty(&u.username).is_some()),
            with_display_name: count(|u| non_empty(&u.display_name).is_some()),
            with_description: count(|u| non_empty(&u.description).is_some()),
            with_avatar: count(|u| non_empty(&u.avatar_url).is_some()),
            with_score: scores.len(),
            with_address: count(|u| non_empty(&u.primary_address).is_some()),
            average_score,
            score_distribution,
        }
    }

    pub fn log_summary(&self) {
        let pct = |n: usize| {
            if self.total == 0 {
                0.0
            } else {
                n as f64 * 100.0 / self.total as f64
            }
        };

        log::info!("Members: {}", self.total);
        log::info!(
            "With profile id: {} ({:.1}%), without: {} ({:.1}%)",
            self.with_profile_id,
            pct(self.with_profile_id),
            self.without_profile_id,
            pct(self.without_profile_id)
        );
        log::info!(
            "With username: {} ({:.1}%), display name: {} ({:.1}%), address: {} ({:.1}%)",
            self.with_username,
            pct(self.with_username),
            self.with_display_name,
            pct(self.with_display_name),
            self.with_address,
            pct(self.with_address)
        );
        if self.with_score > 0 {
            log::info!(
                "Average score: {:.2} over {} members; distribution: {:?}",
                self.average_score,
                self.with_score,
                self.score_distribution
            );
        }
    }
}
