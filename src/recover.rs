//! Backfills missing profile ids by looking members up by username.

use crate::config::RecoveryConfig;
use crate::ethos::{model::non_empty, Api, UserRecord};
use std::collections::HashMap;
use tokio::time::sleep;

#[derive(Debug, Default, PartialEq)]
pub struct Recovery {
    pub users: Vec<UserRecord>,
    pub resolved: usize,
}

/// Attempts to resolve the profile id of every given record, in batches.
///
/// Records come back in input order. A batch whose lookup fails is returned
/// exactly as it was passed in.
pub async fn recover<A: Api + ?Sized>(
    api: &A,
    users: Vec<UserRecord>,
    config: &RecoveryConfig,
) -> Recovery {
    let batch_size = config.batch_size.max(1);
    let batch_count = (users.len() + batch_size - 1) / batch_size;
    let mut result = Recovery::default();
    let mut called = false;

    for (index, batch) in users.chunks(batch_size).enumerate() {
        let usernames = batch
            .iter()
            .filter_map(|user| non_empty(&user.username))
            .map(str::to_string)
            .collect::<Vec<_>>();

        if usernames.is_empty() {
            result.users.extend_from_slice(batch);
            continue;
        }

        if called && !config.pause().is_zero() {
            sleep(config.pause()).await;
        }
        called = true;

        log::info!(
            "Looking up batch {}/{} ({} usernames)",
            index + 1,
            batch_count,
            usernames.len()
        );

        match api.users_by_x(&usernames).await {
            Ok(found) => {
                let (merged, resolved) = merge_batch(batch, &found);
                result.users.extend(merged);
                result.resolved += resolved;
            }
            Err(error) => {
                log::warn!("Lookup failed for batch {}: {}", index + 1, error);
                result.users.extend_from_slice(batch);
            }
        }
    }

    log::info!(
        "Resolved {} of {} missing profile ids",
        result.resolved,
        result.users.len()
    );

    result
}

/// Runs [`recover`] over the records of `users` that lack a profile id and
/// writes the results back in place.
pub async fn recover_missing<A: Api + ?Sized>(
    api: &A,
    mut users: Vec<UserRecord>,
    config: &RecoveryConfig,
) -> Recovery {
    let missing = users
        .iter()
        .enumerate()
        .filter(|(_, user)| user.profile_id.is_none())
        .map(|(index, _)| index)
        .collect::<Vec<_>>();

    if missing.is_empty() {
        return Recovery { users, resolved: 0 };
    }

    let candidates = missing.iter().map(|index| users[*index].clone()).collect();
    let recovery = recover(api, candidates, config).await;

    for (index, user) in missing.into_iter().zip(recovery.users) {
        users[index] = user;
    }

    Recovery {
        users,
        resolved: recovery.resolved,
    }
}

fn merge_batch(batch: &[UserRecord], found: &[UserRecord]) -> (Vec<UserRecord>, usize) {
    let by_username = found
        .iter()
        .filter_map(|remote| non_empty(&remote.username).map(|name| (name.to_lowercase(), remote)))
        .fold(HashMap::new(), |mut acc, (name, remote)| {
            acc.entry(name).or_insert(remote);
            acc
        });

    let mut resolved = 0;
    let merged = batch
        .iter()
        .map(|user| {
            let remote = non_empty(&user.username)
                .and_then(|name| by_username.get(&name.to_lowercase()))
                .filter(|remote| remote.profile_id.is_some());

            match remote {
                Some(remote) => {
                    resolved += 1;
                    log::debug!(
                        "Resolved profile id {:?} for {}",
                        remote.profile_id,
                        user.handle()
                    );
                    merge(user, remote)
                }
                None => user.clone(),
            }
        })
        .collect();

    (merged, resolved)
}

/// Remote values override local ones when they are present.
fn merge(local: &UserRecord, remote: &UserRecord) -> UserRecord {
    let pick = |remote: &Option<String>, local: &Option<String>| {
        non_empty(remote)
            .map(str::to_string)
            .or_else(|| local.clone())
    };

    UserRecord {
        profile_id: remote.profile_id,
        display_name: pick(&remote.display_name, &local.display_name),
        avatar_url: pick(&remote.avatar_url, &local.avatar_url),
        description: pick(&remote.description, &local.description),
        score: remote.score.or(local.score),
        ..local.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethos::mock::{user, MockApi};

    fn no_pause(batch_size: usize) -> RecoveryConfig {
        RecoveryConfig {
            batch_size,
            pause_ms: 0,
        }
    }

    #[tokio::test]
    async fn resolves_case_insensitively_and_merges_richer_fields() {
        let mut remote = user(900, Some(42), "alice");
        remote.display_name = Some("Alice A.".to_string());
        remote.avatar_url = Some(String::new());
        remote.score = Some(1750);
        let api = MockApi {
            lookup: vec![remote],
            ..MockApi::default()
        };

        let mut local = user(1, None, "ALICE");
        local.avatar_url = Some("https://img/alice.png".to_string());
        local.description = Some("gm".to_string());

        let recovery = recover(&api, vec![local, user(2, None, "bob")], &no_pause(10)).await;

        assert_eq!(recovery.resolved, 1);
        let alice = &recovery.users[0];
        assert_eq!(alice.id, Some(1));
        assert_eq!(alice.profile_id, Some(42));
        assert_eq!(alice.username.as_deref(), Some("ALICE"));
        assert_eq!(alice.display_name.as_deref(), Some("Alice A."));
        assert_eq!(alice.avatar_url.as_deref(), Some("https://img/alice.png"));
        assert_eq!(alice.description.as_deref(), Some("gm"));
        assert_eq!(alice.score, Some(1750));
        assert_eq!(recovery.users[1], user(2, None, "bob"));
    }

    #[tokio::test]
    async fn failed_batch_is_passed_through_unchanged() {
        let api = MockApi {
            lookup: vec![user(900, Some(1), "a"), user(901, Some(4), "d")],
            failing_usernames: vec!["b".to_string()].into_iter().collect(),
            ..MockApi::default()
        };
        let input = vec![
            user(1, None, "a"),
            user(2, None, "b"),
            user(3, None, "c"),
            user(4, None, "d"),
        ];

        let recovery = recover(&api, input.clone(), &no_pause(2)).await;

        assert_eq!(recovery.resolved, 1);
        assert_eq!(&recovery.users[0..2], &input[0..2]);
        assert_eq!(recovery.users[3].profile_id, Some(4));
        assert_eq!(
            api.calls(),
            vec!["users_by_x:a,b".to_string(), "users_by_x:c,d".to_string()]
        );
    }

    #[tokio::test]
    async fn batch_without_usernames_skips_the_lookup() {
        let api = MockApi::default();
        let mut nameless = user(1, None, "");
        nameless.username = None;
        let input = vec![nameless, user(2, None, "  ")];

        let recovery = recover(&api, input.clone(), &no_pause(10)).await;

        assert_eq!(recovery.users, input);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn remote_without_profile_id_does_not_resolve() {
        let api = MockApi {
            lookup: vec![user(900, None, "a")],
            ..MockApi::default()
        };

        let recovery = recover(&api, vec![user(1, None, "a")], &no_pause(10)).await;

        assert_eq!(recovery.resolved, 0);
        assert_eq!(recovery.users, vec![user(1, None, "a")]);
    }

    #[tokio::test]
    async fn recover_missing_keeps_positions() {
        let api = MockApi {
            lookup: vec![user(900, Some(77), "b")],
            ..MockApi::default()
        };
        let input = vec![user(1, Some(5), "a"), user(2, None, "b"), user(3, Some(6), "c")];

        let recovery = recover_missing(&api, input, &no_pause(10)).await;

        assert_eq!(recovery.resolved, 1);
        assert_eq!(
            recovery
                .users
                .iter()
                .map(|u| (u.id, u.profile_id))
                .collect::<Vec<_>>(),
            vec![(Some(1), Some(5)), (Some(2), Some(77)), (Some(3), Some(6))]
        );
        assert_eq!(api.calls(), vec!["users_by_x:b".to_string()]);
    }
}
