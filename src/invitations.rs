//! Members with the most invitations available.

use crate::config::InvitationsConfig;
use crate::ethos::{model::non_empty, Api, DirectoryProfile, UserRecord};
use crate::members::MembersSnapshot;
use crate::snapshot::Source;
use crate::util::format::{iso_timestamp, x_url};
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::time::sleep;

const AVATAR_PLACEHOLDER: &str = "https://via.placeholder.com/35";

/// Pages through the directory and returns the profiles that have at least
/// one invite.
///
/// Paging stops once enough profiles were read, on a short page, or on a page
/// without any invites. A failure on the first page is returned; a later one
/// ends paging with what was collected so far.
pub async fn fetch_directory<A: Api + ?Sized>(
    api: &A,
    config: &InvitationsConfig,
) -> crate::ethos::Result<Vec<DirectoryProfile>> {
    let limit = config.page_limit.max(1);
    let mut offset = 0;
    let mut fetched = 0;
    let mut with_invites = vec![];

    while fetched < config.max_profiles {
        let page = match api.profile_directory(limit, offset).await {
            Ok(page) => page,
            Err(error) if offset == 0 => return Err(error),
            Err(error) => {
                log::warn!("Directory page at offset {} failed: {}", offset, error);
                break;
            }
        };

        let page_len = page.len();
        let before = with_invites.len();
        with_invites.extend(page.into_iter().filter(|profile| profile.invites() >= 1));
        let found = with_invites.len() - before;
        fetched += page_len;

        log::debug!(
            "Directory offset {}: {} profiles, {} with invites",
            offset,
            page_len,
            found
        );

        if page_len < limit || found == 0 {
            break;
        }

        offset += limit;

        if fetched < config.max_profiles && !config.pause().is_zero() {
            sleep(config.pause()).await;
        }
    }

    log::info!(
        "Read {} directory profiles, {} with invites",
        fetched,
        with_invites.len()
    );

    Ok(with_invites)
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationEntry {
    pub profile_id: u64,
    pub display_name: String,
    pub username: String,
    pub avatar_url: String,
    pub invites_available: i64,
    pub invite_text: String,
    pub x_url: String,
}

impl InvitationEntry {
    fn new(profile_id: u64, profile: &DirectoryProfile, member: Option<&UserRecord>) -> Self {
        let actor_name = profile.actor.as_ref().and_then(|actor| non_empty(&actor.name));
        let actor_avatar = profile
            .actor
            .as_ref()
            .and_then(|actor| non_empty(&actor.avatar));

        let display_name = member
            .and_then(|user| non_empty(&user.display_name))
            .or(actor_name)
            .unwrap_or("Unknown")
            .to_string();
        let avatar_url = member
            .and_then(|user| non_empty(&user.avatar_url))
            .or(actor_avatar)
            .unwrap_or(AVATAR_PLACEHOLDER)
            .to_string();
        let username = member
            .and_then(|user| non_empty(&user.username))
            .or(actor_name)
            .map(str::to_string)
            .unwrap_or_else(|| display_name.clone());
        let invites = profile.invites();

        InvitationEntry {
            profile_id,
            x_url: x_url(&username),
            display_name,
            username,
            avatar_url,
            invites_available: invites,
            invite_text: format!("{} invite{}", invites, if invites > 1 { "s" } else { "" }),
        }
    }
}

/// Keeps member profiles only, first occurrence per profile id and per
/// case-folded name, and returns the `top` with the most invites.
pub fn select(users: &[UserRecord], profiles: &[DirectoryProfile], top: usize) -> Vec<InvitationEntry> {
    let member_ids = users
        .iter()
        .filter_map(|user| user.profile_id)
        .collect::<HashSet<_>>();
    let mut seen_ids = HashSet::new();
    let mut seen_names = HashSet::new();

    let mut selected = profiles
        .iter()
        .filter_map(|profile| {
            let profile_id = profile.profile_id()?;
            if !member_ids.contains(&profile_id) || profile.invites() < 1 {
                return None;
            }

            let name = profile
                .actor
                .as_ref()
                .and_then(|actor| non_empty(&actor.name))
                .map(str::to_lowercase);

            if seen_ids.contains(&profile_id) || name.as_ref().map_or(false, |n| seen_names.contains(n)) {
                log::debug!("Skipping repeated directory entry for profile {}", profile_id);
                return None;
            }

            seen_ids.insert(profile_id);
            if let Some(name) = name {
                seen_names.insert(name);
            }

            Some((profile_id, profile))
        })
        .collect::<Vec<_>>();

    selected.sort_by(|(_, a), (_, b)| b.invites().cmp(&a.invites()));
    selected.truncate(top);

    selected
        .into_iter()
        .map(|(profile_id, profile)| {
            let member = users.iter().find(|user| user.profile_id == Some(profile_id));
            InvitationEntry::new(profile_id, profile, member)
        })
        .collect()
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitations {
    pub last_updated: String,
    pub total_gigachads: usize,
    pub gigachads_with_invites: usize,
    pub total_invites: i64,
    pub data: Vec<InvitationEntry>,
}

impl Invitations {
    pub fn new(users: &[UserRecord], profiles: &[DirectoryProfile], top: usize, now: DateTime<Utc>) -> Self {
        let data = select(users, profiles, top);

        Invitations {
            last_updated: iso_timestamp(now),
            total_gigachads: users
                .iter()
                .filter_map(|user| user.profile_id)
                .collect::<HashSet<_>>()
                .len(),
            gigachads_with_invites: data.len(),
            total_invites: data.iter().map(|entry| entry.invites_available).sum(),
            data,
        }
    }
}

/// Loads the member snapshot and reads the directory concurrently.
pub async fn collect<A: Api + ?Sized>(
    api: &A,
    members: &Source,
    config: &InvitationsConfig,
    now: DateTime<Utc>,
) -> crate::Result<Invitations> {
    let (snapshot, profiles) = futures::join!(
        members.load::<MembersSnapshot>(),
        fetch_directory(api, config)
    );
    let snapshot = snapshot?;
    let profiles = profiles?;

    if snapshot.users.is_empty() || profiles.is_empty() {
        return Err(crate::Error::NoData("no members or no profiles with invites"));
    }

    let invitations = Invitations::new(&snapshot.users, &profiles, config.top, now);
    log::info!(
        "{} members with {} invites in total",
        invitations.gigachads_with_invites,
        invitations.total_invites
    );

    Ok(invitations)
}
