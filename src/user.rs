use serde::{Deserialize, Serialize};

pub const DEFAULT_PIC: &str = "default.png";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    #[serde(default = "default_pic")]
    pub profile_pic: String,
    #[serde(default)]
    pub verb_practice: Vec<VerbPractice>,
    #[serde(default)]
    pub custom_sets: Vec<CustomSet>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct VerbPractice {
    pub infinitive: String,
    pub tenses: Vec<TensePractice>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct TensePractice {
    pub tense: String,
    pub correct: u32,
    pub incorrect: u32,
}

/// A user-defined group of verbs to practise together.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CustomSet {
    pub name: String,
    pub verbs: Vec<String>,
}

/// One verb/tense pair from a user's practice record, flattened.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MissedTense {
    pub infinitive: String,
    pub tense: String,
    pub correct: u32,
    pub incorrect: u32,
}

fn default_pic() -> String {
    DEFAULT_PIC.into()
}

impl User {
    pub fn new(username: String, password_hash: String, salt: String) -> Self {
        Self {
            username,
            password_hash,
            salt,
            profile_pic: default_pic(),
            verb_practice: vec![],
            custom_sets: vec![],
        }
    }
}

impl MissedTense {
    pub fn total(&self) -> u32 {
        self.correct + self.incorrect
    }

    pub fn ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.incorrect as f64 / total as f64,
        }
    }
}
