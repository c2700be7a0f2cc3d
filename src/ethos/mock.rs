use super::{
    Activity, ActivityPage, Api, DirectoryProfile, Error, ProfileInfo, Result, UserRecord,
};
use futures::future::{ready, FutureExt, LocalBoxFuture};
use reqwest::StatusCode;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// In-memory API used by unit tests. Every call is recorded.
#[derive(Default)]
pub(crate) struct MockApi {
    pub(crate) members: Option<Vec<UserRecord>>,
    /// Users returned by the username lookup.
    pub(crate) lookup: Vec<UserRecord>,
    /// Any lookup batch containing one of these (lower-cased) usernames fails.
    pub(crate) failing_usernames: HashSet<String>,
    /// Activity history by profile id; missing ids fail.
    pub(crate) activities: HashMap<u64, Vec<Activity>>,
    /// Directory pages by page index; missing pages fail.
    pub(crate) directory: Vec<Vec<DirectoryProfile>>,
    pub(crate) profiles: Option<Vec<ProfileInfo>>,
    pub(crate) calls: RefCell<Vec<String>>,
}

impl MockApi {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn failure<T>(call: &str) -> Result<T> {
        Err(Error::UnexpectedStatus {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            url: call.to_string(),
        })
    }
}

impl Api for MockApi {
    fn category_users(
        &self,
        category_id: u64,
        limit: usize,
    ) -> LocalBoxFuture<'_, Result<Vec<UserRecord>>> {
        let call = format!("category_users:{}:{}", category_id, limit);
        self.record(call.clone());
        let result = match &self.members {
            Some(members) => Ok(members.iter().take(limit).cloned().collect()),
            None => Self::failure(&call),
        };

        ready(result).boxed_local()
    }

    fn users_by_x<'a>(
        &'a self,
        usernames: &'a [String],
    ) -> LocalBoxFuture<'a, Result<Vec<UserRecord>>> {
        let call = format!("users_by_x:{}", usernames.join(","));
        self.record(call.clone());

        let requested = usernames
            .iter()
            .map(|name| name.to_lowercase())
            .collect::<HashSet<_>>();

        let result = if requested
            .iter()
            .any(|name| self.failing_usernames.contains(name))
        {
            Self::failure(&call)
        } else {
            Ok(self
                .lookup
                .iter()
                .filter(|user| requested.contains(&user.handle().to_lowercase()))
                .cloned()
                .collect())
        };

        ready(result).boxed_local()
    }

    fn profile_activities(
        &self,
        profile_id: u64,
        limit: usize,
        offset: usize,
    ) -> LocalBoxFuture<'_, Result<ActivityPage>> {
        let call = format!("profile_activities:{}:{}:{}", profile_id, limit, offset);
        self.record(call.clone());
        let result = match self.activities.get(&profile_id) {
            Some(activities) => Ok(ActivityPage {
                values: activities.iter().skip(offset).take(limit).cloned().collect(),
                total: Some(activities.len() as u64),
            }),
            None => Self::failure(&call),
        };

        ready(result).boxed_local()
    }

    fn profile_directory(
        &self,
        limit: usize,
        offset: usize,
    ) -> LocalBoxFuture<'_, Result<Vec<DirectoryProfile>>> {
        let call = format!("profile_directory:{}:{}", limit, offset);
        self.record(call.clone());
        let page = if limit == 0 { 0 } else { offset / limit };
        let result = match self.directory.get(page) {
            Some(profiles) => Ok(profiles.clone()),
            None => Self::failure(&call),
        };

        ready(result).boxed_local()
    }

    fn profiles_by_id<'a>(
        &'a self,
        ids: &'a [u64],
        limit: usize,
    ) -> LocalBoxFuture<'a, Result<Vec<ProfileInfo>>> {
        let call = format!("profiles_by_id:{}:{}", ids.len(), limit);
        self.record(call.clone());
        let result = match &self.profiles {
            Some(profiles) => Ok(profiles
                .iter()
                .filter(|profile| profile.id.map_or(false, |id| ids.contains(&id)))
                .cloned()
                .collect()),
            None => Self::failure(&call),
        };

        ready(result).boxed_local()
    }
}

pub(crate) fn user(id: u64, profile_id: Option<u64>, username: &str) -> UserRecord {
    UserRecord {
        id: Some(id),
        profile_id,
        username: Some(username.to_string()),
        ..UserRecord::default()
    }
}

pub(crate) fn activity(kind: &str, author: u64, subject: u64, timestamp: i64) -> Activity {
    serde_json::from_value(serde_json::json!({
        "type": kind,
        "timestamp": timestamp,
        "author": { "profileId": author, "name": format!("user{}", author) },
        "subject": { "profileId": subject, "name": format!("user{}", subject) },
    }))
    .unwrap()
}
