use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::json_file;
use super::{LoadError, Request};
use crate::auth::{hash_password, SessionId};
use crate::user::{CustomSet, MissedTense, TensePractice, User, VerbPractice, DEFAULT_PIC};

pub struct UserDb {
    location: PathBuf,
    users: Vec<User>,
    logged_in: HashMap<String, SessionId>,
    modified: bool,
}

impl UserDb {
    pub fn load(location: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let location = location.into();
        let users = json_file::read(&location)?;

        Ok(Self {
            location,
            users,
            logged_in: HashMap::new(),
            modified: false,
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    #[cfg(test)]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn find(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    fn find_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.username == username)
    }

    pub fn has_user(&self, username: &str) -> bool {
        self.find(username).is_some()
    }

    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.users
            .iter()
            .filter(|u| u.username == username)
            .any(|u| u.password_hash == hash_password(password, &u.salt))
    }

    pub fn add_user(&mut self, username: &str, password: &str, salt: &str) -> &mut Self {
        self.modified = true;

        let pwhash = hash_password(password, salt);
        self.users
            .push(User::new(username.into(), pwhash, salt.into()));

        info!("{username} registered");
        self
    }

    pub fn is_logged_in(&self, username: &str) -> bool {
        self.logged_in.contains_key(username)
    }

    /// Starts a session if the credentials match. A user who is already
    /// logged in keeps their existing session.
    pub fn login(&mut self, username: &str, password: &str) -> &mut Self {
        self.modified = true;

        if self.matches(username, password) && !self.is_logged_in(username) {
            let session_id = loop {
                let id = SessionId::new();
                if !self.is_valid_id(&id) {
                    break id;
                }
            };

            info!("{username} login: new session created");
            self.logged_in.insert(username.into(), session_id);
        }

        self
    }

    pub fn session_id(&self, username: &str) -> Option<SessionId> {
        self.logged_in.get(username).copied()
    }

    pub fn is_valid_id(&self, id: &SessionId) -> bool {
        self.logged_in.values().any(|s| s == id)
    }

    pub fn username_by_id(&self, id: &SessionId) -> Option<&str> {
        self.logged_in
            .iter()
            .find(|(_, s)| *s == id)
            .map(|(username, _)| username.as_str())
    }

    pub fn logout(&mut self, username: &str) -> &mut Self {
        self.modified = true;

        if self.logged_in.remove(username).is_some() {
            info!("{username} logout");
        }
        self
    }

    pub fn profile_pic(&self, username: &str) -> &str {
        self.find(username)
            .map(|u| u.profile_pic.as_str())
            .unwrap_or(DEFAULT_PIC)
    }

    /// Counts one practice attempt. Returns false if the user doesn't exist.
    pub fn record_practice(
        &mut self,
        username: &str,
        infinitive: &str,
        tense: &str,
        correct: bool,
    ) -> bool {
        let Some(user) = self.find_mut(username) else {
            return false;
        };

        let verb = match user
            .verb_practice
            .iter()
            .position(|v| v.infinitive == infinitive)
        {
            Some(i) => &mut user.verb_practice[i],
            None => {
                user.verb_practice.push(VerbPractice {
                    infinitive: infinitive.into(),
                    tenses: vec![],
                });
                let last = user.verb_practice.len() - 1;
                &mut user.verb_practice[last]
            }
        };

        let stats = match verb.tenses.iter().position(|t| t.tense == tense) {
            Some(i) => &mut verb.tenses[i],
            None => {
                verb.tenses.push(TensePractice {
                    tense: tense.into(),
                    correct: 0,
                    incorrect: 0,
                });
                let last = verb.tenses.len() - 1;
                &mut verb.tenses[last]
            }
        };

        if correct {
            stats.correct += 1;
        } else {
            stats.incorrect += 1;
        }

        debug!(
            "{username} practised {infinitive} ({tense}): {}/{}",
            stats.correct,
            stats.correct + stats.incorrect,
        );

        self.modified = true;
        true
    }

    /// Every practised verb/tense, most missed first. Ties on the number of
    /// misses go to the higher miss ratio.
    pub fn freq_missed(&self, username: &str, max: Option<usize>) -> Option<Vec<MissedTense>> {
        let user = self.find(username)?;

        let mut missed = user
            .verb_practice
            .iter()
            .flat_map(|verb| {
                verb.tenses.iter().map(|t| MissedTense {
                    infinitive: verb.infinitive.clone(),
                    tense: t.tense.clone(),
                    correct: t.correct,
                    incorrect: t.incorrect,
                })
            })
            .collect::<Vec<_>>();

        missed.sort_by(|a, b| {
            b.incorrect
                .cmp(&a.incorrect)
                .then_with(|| b.ratio().total_cmp(&a.ratio()))
        });

        if let Some(max) = max {
            missed.truncate(max);
        }

        Some(missed)
    }

    pub fn custom_sets(&self, username: &str) -> Option<&[CustomSet]> {
        self.find(username).map(|u| u.custom_sets.as_slice())
    }

    /// Adds a set, replacing any existing set with the same name.
    pub fn add_custom_set(&mut self, username: &str, set: CustomSet) -> bool {
        let Some(user) = self.find_mut(username) else {
            return false;
        };

        match user.custom_sets.iter().position(|s| s.name == set.name) {
            Some(i) => user.custom_sets[i] = set,
            None => user.custom_sets.push(set),
        }

        self.modified = true;
        true
    }

    /// Writes the store out if anything changed since the last save.
    pub fn save(&mut self) -> Result<bool, io::Error> {
        if !self.modified {
            return Ok(false);
        }

        json_file::write(&self.location, &self.users)?;
        self.modified = false;

        info!("saved {} users to {:?}", self.users.len(), self.location);
        Ok(true)
    }

    pub fn request<I>(&mut self, input: I) -> Request<'_, I, Self> {
        Request::new(input, self)
    }
}
