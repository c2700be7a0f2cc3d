//! Duplicate detection over member records.
//!
//! Records are compared along five independent keys. For each key the first
//! record to carry a value wins and every later record with the same value is
//! reported; the cleanup drops the union of all reported records.

use crate::ethos::UserRecord;
use serde_derive::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Id,
    ProfileId,
    Username,
    Address,
    DisplayName,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Id,
        Dimension::ProfileId,
        Dimension::Username,
        Dimension::Address,
        Dimension::DisplayName,
    ];

    /// The comparison key of a record along this dimension. Strings are
    /// case-folded; empty values never produce a key.
    fn key(&self, user: &UserRecord) -> Option<String> {
        match self {
            Dimension::Id => user.id.map(|id| id.to_string()),
            Dimension::ProfileId => user.profile_id.map(|id| id.to_string()),
            Dimension::Username => folded(&user.username),
            Dimension::Address => folded(&user.primary_address),
            Dimension::DisplayName => folded(&user.display_name),
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        let name = match self {
            Dimension::Id => "id",
            Dimension::ProfileId => "profileId",
            Dimension::Username => "username",
            Dimension::Address => "address",
            Dimension::DisplayName => "displayName",
        };
        f.write_str(name)
    }
}

fn folded(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

/// A later record that repeats the key of an earlier one.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Duplicate {
    pub dimension: Dimension,
    pub key: String,
    pub first: usize,
    pub later: usize,
    pub usernames: (Option<String>, Option<String>),
    pub ids: (Option<u64>, Option<u64>),
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub by_id: Vec<Duplicate>,
    pub by_profile_id: Vec<Duplicate>,
    pub by_username: Vec<Duplicate>,
    pub by_address: Vec<Duplicate>,
    pub by_display_name: Vec<Duplicate>,
}

impl Audit {
    pub fn get(&self, dimension: Dimension) -> &[Duplicate] {
        match dimension {
            Dimension::Id => &self.by_id,
            Dimension::ProfileId => &self.by_profile_id,
            Dimension::Username => &self.by_username,
            Dimension::Address => &self.by_address,
            Dimension::DisplayName => &self.by_display_name,
        }
    }

    fn get_mut(&mut self, dimension: Dimension) -> &mut Vec<Duplicate> {
        match dimension {
            Dimension::Id => &mut self.by_id,
            Dimension::ProfileId => &mut self.by_profile_id,
            Dimension::Username => &mut self.by_username,
            Dimension::Address => &mut self.by_address,
            Dimension::DisplayName => &mut self.by_display_name,
        }
    }

    pub fn has_duplicates(&self) -> bool {
        Dimension::ALL
            .iter()
            .any(|dimension| !self.get(*dimension).is_empty())
    }

    /// Indices of every record reported as a later duplicate on any dimension.
    pub fn removal_set(&self) -> BTreeSet<usize> {
        Dimension::ALL
            .iter()
            .flat_map(|dimension| self.get(*dimension).iter().map(|dup| dup.later))
            .collect()
    }
}

pub fn audit(users: &[UserRecord]) -> Audit {
    let mut first_seen: HashMap<Dimension, HashMap<String, usize>> = HashMap::new();
    let mut report = Audit::default();

    for (index, user) in users.iter().enumerate() {
        for dimension in Dimension::ALL {
            if let Some(key) = dimension.key(user) {
                let seen = first_seen.entry(dimension).or_default();

                match seen.entry(key) {
                    Entry::Occupied(entry) => {
                        let first = *entry.get();
                        let original = &users[first];

                        report.get_mut(dimension).push(Duplicate {
                            dimension,
                            key: entry.key().clone(),
                            first,
                            later: index,
                            usernames: (original.username.clone(), user.username.clone()),
                            ids: (original.id, user.id),
                        });
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(index);
                    }
                }
            }
        }
    }

    report
}

/// Drops every record in the audit's removal set, keeping input order.
pub fn cleanup(users: Vec<UserRecord>, report: &Audit) -> (Vec<UserRecord>, usize) {
    let removals = report.removal_set();
    let cleaned = users
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !removals.contains(index))
        .map(|(_, user)| user)
        .collect();

    (cleaned, removals.len())
}

/// Audits and cleans in one pass, logging a summary of what was found.
pub fn dedup(users: Vec<UserRecord>) -> (Vec<UserRecord>, Audit, usize) {
    let report = audit(&users);

    if !report.has_duplicates() {
        return (users, report, 0);
    }

    for dimension in Dimension::ALL {
        for duplicate in report.get(dimension) {
            log::warn!(
                "Duplicate {} {:?} at {} (first seen at {})",
                dimension,
                duplicate.key,
                duplicate.later,
                duplicate.first
            );
        }
    }

    let (cleaned, removed) = cleanup(users, &report);
    log::info!("Removed {} duplicate records", removed);

    (cleaned, report, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethos::mock::user;
    use std::collections::HashSet;

    fn keyed(id: Option<u64>, username: Option<&str>, address: Option<&str>) -> UserRecord {
        UserRecord {
            id,
            username: username.map(str::to_string),
            primary_address: address.map(str::to_string),
            ..UserRecord::default()
        }
    }

    fn assert_unique(users: &[UserRecord]) {
        for dimension in Dimension::ALL {
            let keys = users.iter().filter_map(|u| dimension.key(u)).collect::<Vec<_>>();
            let distinct = keys.iter().collect::<HashSet<_>>();
            assert_eq!(keys.len(), distinct.len(), "duplicate {}", dimension);
        }
    }

    #[test]
    fn first_seen_wins_across_dimensions() {
        let users = vec![
            keyed(Some(1), Some("a"), None),
            keyed(Some(1), Some("a2"), None),
            keyed(Some(2), Some("a"), None),
        ];

        let (cleaned, report, removed) = dedup(users);

        assert_eq!(removed, 2);
        assert_eq!(cleaned, vec![keyed(Some(1), Some("a"), None)]);
        assert_eq!(report.by_id.len(), 1);
        assert_eq!(report.by_id[0].first, 0);
        assert_eq!(report.by_id[0].later, 1);
        assert_eq!(report.by_username.len(), 1);
        assert_eq!(report.by_username[0].later, 2);
    }

    #[test]
    fn missing_and_empty_keys_never_collide() {
        let users = vec![
            keyed(None, None, None),
            keyed(None, Some(""), None),
            keyed(None, None, Some("")),
            keyed(Some(3), None, None),
        ];

        let report = audit(&users);

        assert!(!report.has_duplicates());
    }

    #[test]
    fn string_keys_are_case_folded() {
        let mut first = user(1, Some(10), "Alice");
        first.primary_address = Some("0xABC".to_string());
        first.display_name = Some("Big Chad".to_string());
        let mut second = user(2, Some(11), "bob");
        second.primary_address = Some("0xabc".to_string());
        let mut third = user(3, Some(12), "carol");
        third.display_name = Some("BIG CHAD".to_string());
        let fourth = user(4, Some(13), "ALICE");

        let report = audit(&[first, second, third, fourth]);

        assert_eq!(report.by_address.len(), 1);
        assert_eq!(report.by_address[0].later, 1);
        assert_eq!(report.by_display_name.len(), 1);
        assert_eq!(report.by_display_name[0].later, 2);
        assert_eq!(report.by_username.len(), 1);
        assert_eq!(report.by_username[0].key, "alice");
        assert_eq!(
            report.removal_set().into_iter().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn record_flagged_on_several_dimensions_is_removed_once() {
        let users = vec![user(1, Some(10), "a"), user(1, Some(10), "a")];

        let report = audit(&users);
        let (cleaned, removed) = cleanup(users, &report);

        assert_eq!(report.by_id.len(), 1);
        assert_eq!(report.by_profile_id.len(), 1);
        assert_eq!(report.by_username.len(), 1);
        assert_eq!(removed, 1);
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn later_duplicates_compare_against_first_occurrence() {
        let users = vec![user(1, None, "a"), user(2, None, "a"), user(3, None, "A")];

        let report = audit(&users);

        assert_eq!(
            report
                .by_username
                .iter()
                .map(|dup| (dup.first, dup.later))
                .collect::<Vec<_>>(),
            vec![(0, 1), (0, 2)]
        );
        assert_eq!(report.by_username[1].ids, (Some(1), Some(3)));
    }

    #[test]
    fn cleaned_output_is_unique_and_stable_under_reapplication() {
        let mut users = vec![];
        for i in 0..40u64 {
            let mut record = user(i % 13, Some(100 + i % 7), &format!("User{}", i % 11));
            record.primary_address = Some(format!("0x{:X}", i % 5));
            record.display_name = if i % 3 == 0 {
                None
            } else {
                Some(format!("Name {}", i % 9))
            };
            users.push(record);
        }
        let original = users.clone();

        let report = audit(&users);
        let removals = report.removal_set();
        let (cleaned, removed) = cleanup(users, &report);

        assert_unique(&cleaned);
        assert_eq!(removed, removals.len());
        assert_eq!(cleaned.len(), original.len() - removed);
        assert_eq!(cleaned[0], original[0]);

        let flagged = Dimension::ALL
            .iter()
            .flat_map(|dimension| report.get(*dimension).iter().map(|dup| dup.later))
            .collect::<BTreeSet<_>>();
        assert_eq!(flagged, removals);

        let (again, _, removed_again) = dedup(cleaned.clone());
        assert_eq!(removed_again, 0);
        assert_eq!(again, cleaned);
    }
}
