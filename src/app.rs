use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::result;
use std::sync::{Mutex, MutexGuard};

use log::{debug, error, warn};
use serde::Deserialize;
use serde_json::Value;
use warp::http;

use crate::auth::{generate_salt, Credentials, SessionId};
use crate::db::{Request, UserDb, VerbDb};
use crate::template::{Bindings, TemplateFile};
use crate::user::CustomSet;
use crate::verb::{Attempt, FormError, Verb};

const USERNAME_MAX: usize = 32;
const DASHBOARD_MISSED: usize = 10;

pub struct App {
    users: Mutex<UserDb>,
    verbs: Mutex<VerbDb>,
    public: PathBuf,
}

/// Both stores, locked together for requests that span them.
pub struct Stores<'a> {
    pub users: &'a mut UserDb,
    pub verbs: &'a mut VerbDb,
}

/// A request body along with whatever session the client presented.
pub struct Authed<T> {
    pub session: Option<SessionId>,
    pub body: T,
}

/// The JSON answer to a login or registration, plus the session to hand
/// back as a cookie when it succeeded.
pub struct LoginReply {
    pub body: Value,
    pub session: Option<SessionId>,
}

#[derive(Debug, Deserialize, Default)]
pub struct QueryPractice {
    pub set: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct QueryMissed {
    pub max: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Internal,
    BadRequest,
}

pub type Result<T> = result::Result<T, Error>;

impl From<Error> for http::StatusCode {
    fn from(e: Error) -> Self {
        match e {
            Error::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
            Error::BadRequest => http::StatusCode::BAD_REQUEST,
        }
    }
}

impl warp::reject::Reject for Error {}

impl<T> Authed<T> {
    pub fn new(session: Option<SessionId>, body: T) -> Self {
        Self { session, body }
    }

    fn username<'d>(&self, users: &'d UserDb) -> Option<&'d str> {
        users.username_by_id(self.session.as_ref()?)
    }

    fn owned_username(&self, users: &UserDb) -> result::Result<String, &'static str> {
        self.username(users)
            .map(str::to_owned)
            .ok_or("session ended mid-request")
    }
}

/// Usernames end up inside rendered pages, so keep them plain.
pub fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= USERNAME_MAX
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

impl App {
    pub fn new(users: UserDb, verbs: VerbDb, public: PathBuf) -> Self {
        Self {
            users: Mutex::new(users),
            verbs: Mutex::new(verbs),
            public,
        }
    }

    fn users(&self) -> Result<MutexGuard<'_, UserDb>> {
        self.users.lock().map_err(|e| {
            error!("user store poisoned: {e}");
            Error::Internal
        })
    }

    fn verbs(&self) -> Result<MutexGuard<'_, VerbDb>> {
        self.verbs.lock().map_err(|e| {
            error!("verb store poisoned: {e}");
            Error::Internal
        })
    }

    fn with_stores<T>(&self, f: impl FnOnce(&mut Stores<'_>) -> T) -> Result<T> {
        // always users before verbs
        let mut users = self.users()?;
        let mut verbs = self.verbs()?;

        let mut stores = Stores {
            users: &mut *users,
            verbs: &mut *verbs,
        };
        Ok(f(&mut stores))
    }

    fn page(&self, name: &str) -> Result<TemplateFile> {
        let path = self.public.join(name);
        TemplateFile::open(&path).map_err(|e| {
            error!("couldn't open template {path:?}: {e}");
            Error::Internal
        })
    }

    pub fn public(&self) -> &Path {
        &self.public
    }

    pub fn login(&self, creds: Credentials) -> Result<LoginReply> {
        let mut users = self.users()?;
        debug!("{} login attempt", creds.username);

        let request = users
            .request(creds)
            .validate(|c, db| db.has_user(&c.username))
            .validate(|c, db| db.matches(&c.username, &c.password))
            .modify(|c, db| {
                db.login(&c.username, &c.password);
                Ok::<_, Infallible>(())
            })
            .check_server(|c, db| db.is_logged_in(&c.username))
            .then(|c, mut output, db| {
                let id = db.session_id(&c.username).ok_or("no session after login")?;
                output.insert("user_id".into(), id.to_string().into());
                Ok::<_, &str>(output)
            });

        Ok(login_reply(&request))
    }

    pub fn register(&self, creds: Credentials) -> Result<LoginReply> {
        let mut users = self.users()?;
        debug!("{} registration attempt", creds.username);

        let request = users
            .request(creds)
            .validate(|c, _| valid_username(&c.username) && !c.password.is_empty())
            .validate(|c, db| !db.has_user(&c.username))
            .modify(|c, db| {
                let salt = generate_salt();
                db.add_user(&c.username, &c.password, &salt)
                    .login(&c.username, &c.password);
                Ok::<_, Infallible>(())
            })
            .check_server(|c, db| db.is_logged_in(&c.username))
            .then(|c, mut output, db| {
                let id = db.session_id(&c.username).ok_or("no session after register")?;
                output.insert("user_id".into(), id.to_string().into());
                Ok::<_, &str>(output)
            });

        Ok(login_reply(&request))
    }

    pub fn logout(&self, session: Option<SessionId>) -> Result<Value> {
        let mut users = self.users()?;

        let request = users
            .request(Authed::new(session, ()))
            .validate(|a, db| a.username(db).is_some())
            .modify(|a, db| {
                let username = a.owned_username(db)?;
                db.logout(&username);
                Ok::<_, &str>(())
            });

        Ok(request.to_json())
    }

    pub fn add_verb(
        &self,
        session: Option<SessionId>,
        verb: result::Result<Verb, FormError>,
    ) -> Result<Value> {
        if let Err(ref e) = verb {
            warn!("rejecting verb form: {e:?}");
        }
        let verb = verb.map(Verb::trimmed);

        self.with_stores(|stores| {
            Request::new(Authed::new(session, verb), stores)
                .validate(|a, db| a.username(db.users).is_some())
                .validate(|a, db| match a.body {
                    Ok(ref verb) => {
                        verb.is_well_formed() && !db.verbs.has(&verb.infinitive, None)
                    }
                    Err(_) => false,
                })
                .modify(|a, db| {
                    let verb = a.body.as_ref().map_err(|_| "verb vanished")?;
                    db.verbs.add_verb(verb.clone());
                    Ok::<_, &str>(())
                })
                .check_server(|a, db| match a.body {
                    Ok(ref verb) => db.verbs.has(&verb.infinitive, None),
                    Err(_) => false,
                })
                .to_json()
        })
    }

    pub fn remove_verb(&self, session: Option<SessionId>, infinitive: String) -> Result<Value> {
        self.with_stores(|stores| {
            Request::new(Authed::new(session, infinitive), stores)
                .validate(|a, db| a.username(db.users).is_some())
                .validate(|a, db| db.verbs.has(&a.body, None))
                .modify(|a, db| {
                    db.verbs.remove_verb(&a.body);
                    Ok::<_, Infallible>(())
                })
                .check_server(|a, db| !db.verbs.has(&a.body, None))
                .to_json()
        })
    }

    pub fn random_verb(&self, session: Option<SessionId>, query: QueryPractice) -> Result<Value> {
        let seed = rand::random::<f64>();

        self.with_stores(|stores| {
            Request::new(Authed::new(session, query), stores)
                .validate(|a, db| a.username(db.users).is_some())
                .validate(|a, db| match a.body.set {
                    Some(ref name) => a
                        .username(db.users)
                        .and_then(|u| db.users.custom_sets(u))
                        .map_or(false, |sets| sets.iter().any(|s| &s.name == name)),
                    None => true,
                })
                .then(|a, mut output, db| {
                    let within = match a.body.set {
                        Some(ref name) => a
                            .username(db.users)
                            .and_then(|u| db.users.custom_sets(u))
                            .and_then(|sets| sets.iter().find(|s| &s.name == name))
                            .map(|s| s.verbs.as_slice()),
                        None => None,
                    };

                    let picked = db.verbs.get_random(seed, within).ok_or("no verbs to practise")?;
                    output.insert("verb".into(), picked.verb.into());
                    output.insert("tense".into(), picked.tense.into());
                    Ok::<_, &str>(output)
                })
                .to_json()
        })
    }

    pub fn check_attempt(&self, session: Option<SessionId>, attempt: Attempt) -> Result<Value> {
        self.with_stores(|stores| {
            Request::new(Authed::new(session, attempt), stores)
                .validate(|a, db| a.username(db.users).is_some())
                .validate(|a, db| db.verbs.has(&a.body.verb, Some(&a.body.tense)))
                .modify(|a, db| {
                    let username = a.owned_username(db.users)?;
                    let correct = db
                        .verbs
                        .get_conj(&a.body.verb, &a.body.tense)
                        .map(|expected| expected.matches(&a.body.answer))
                        .ok_or("conjugation vanished")?;

                    db.users
                        .record_practice(&username, &a.body.verb, &a.body.tense, correct)
                        .then_some(())
                        .ok_or("user vanished")
                })
                .then(|a, mut output, db| {
                    let expected = db
                        .verbs
                        .get_conj(&a.body.verb, &a.body.tense)
                        .ok_or("conjugation vanished")?;

                    output.insert("correct".into(), expected.matches(&a.body.answer).into());
                    output.insert(
                        "expected".into(),
                        serde_json::to_value(expected).map_err(|_| "couldn't serialise")?,
                    );
                    Ok::<_, &str>(output)
                })
                .to_json()
        })
    }

    pub fn missed(&self, session: Option<SessionId>, query: QueryMissed) -> Result<Value> {
        let mut users = self.users()?;

        let request = users
            .request(Authed::new(session, query))
            .validate(|a, db| a.username(db).is_some())
            .then(|a, mut output, db| {
                let missed = a
                    .username(db)
                    .and_then(|u| db.freq_missed(u, a.body.max))
                    .ok_or("user vanished")?;

                output.insert(
                    "missed".into(),
                    serde_json::to_value(missed).map_err(|_| "couldn't serialise")?,
                );
                Ok::<_, &str>(output)
            });

        Ok(request.to_json())
    }

    pub fn sets(&self, session: Option<SessionId>) -> Result<Value> {
        let mut users = self.users()?;

        let request = users
            .request(Authed::new(session, ()))
            .validate(|a, db| a.username(db).is_some())
            .then(|a, mut output, db| {
                let sets = a
                    .username(db)
                    .and_then(|u| db.custom_sets(u))
                    .ok_or("user vanished")?;

                output.insert(
                    "sets".into(),
                    serde_json::to_value(sets).map_err(|_| "couldn't serialise")?,
                );
                Ok::<_, &str>(output)
            });

        Ok(request.to_json())
    }

    pub fn add_set(&self, session: Option<SessionId>, set: CustomSet) -> Result<Value> {
        self.with_stores(|stores| {
            Request::new(Authed::new(session, set), stores)
                .validate(|a, db| a.username(db.users).is_some())
                .validate(|a, _| !a.body.name.trim().is_empty() && !a.body.verbs.is_empty())
                .validate(|a, db| a.body.verbs.iter().all(|v| db.verbs.has(v, None)))
                .modify(|a, db| {
                    let username = a.owned_username(db.users)?;
                    db.users
                        .add_custom_set(&username, a.body.clone())
                        .then_some(())
                        .ok_or("user vanished")
                })
                .to_json()
        })
    }

    /// `None` when the session isn't logged in.
    pub fn dashboard(&self, session: Option<SessionId>) -> Result<Option<String>> {
        let users = self.users()?;

        let Some(username) = session.as_ref().and_then(|id| users.username_by_id(id)) else {
            return Ok(None);
        };

        let page = self.page("dashboard.html")?;

        let missed = users
            .freq_missed(username, Some(DASHBOARD_MISSED))
            .unwrap_or_default()
            .into_iter()
            .filter(|m| m.incorrect > 0)
            .map(|m| {
                format!(
                    "{} ({}): {}/{} missed",
                    html_escape::encode_text(&m.infinitive),
                    html_escape::encode_text(&m.tense),
                    m.incorrect,
                    m.total()
                )
            })
            .collect();

        let bindings = Bindings::new()
            .variable("username", username)
            .variable("profile_pic", html_escape::encode_safe(users.profile_pic(username)))
            .list("missed", missed);

        Ok(Some(page.render(&bindings).into_string()))
    }

    pub fn verbs_page(&self) -> Result<String> {
        let page = self.page("verbs.html")?;
        let verbs = self.verbs()?;

        // infinitives land in both element text and attribute values
        let list = verbs
            .verb_list()
            .into_iter()
            .map(|v| html_escape::encode_safe(v).into_owned())
            .collect::<Vec<_>>();

        let bindings = Bindings::new()
            .variable("verb_count", list.len().to_string())
            .list("verbs", list.clone())
            .checklist("verbs", list);

        Ok(page.render(&bindings).into_string())
    }

    /// Writes out whichever stores have changed.
    pub fn save(&self) -> Result<()> {
        let mut failed = false;

        let mut users = self.users()?;
        match users.save() {
            Ok(true) => debug!("user store written"),
            Ok(false) => debug!("user store unchanged"),
            Err(e) => {
                error!("couldn't save user store to {:?}: {e}", users.location());
                failed = true;
            }
        }
        drop(users);

        let mut verbs = self.verbs()?;
        match verbs.save() {
            Ok(true) => debug!("verb store written"),
            Ok(false) => debug!("verb store unchanged"),
            Err(e) => {
                error!("couldn't save verb store to {:?}: {e}", verbs.location());
                failed = true;
            }
        }

        if failed {
            Err(Error::Internal)
        } else {
            Ok(())
        }
    }
}

fn login_reply(request: &Request<'_, Credentials, UserDb>) -> LoginReply {
    let session = match request.is_ok() {
        true => request.db().session_id(&request.input().username),
        false => None,
    };

    LoginReply {
        body: request.to_json(),
        session,
    }
}
