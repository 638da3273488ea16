use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Verb {
    pub infinitive: String,
    pub tenses: Vec<VerbTense>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct VerbTense {
    pub tense: String,
    #[serde(flatten)]
    pub conjugation: Conjugation,
}

/// The six pronoun forms of one tense.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Conjugation {
    pub je: String,
    pub tu: String,
    pub il: String,
    pub nous: String,
    pub vous: String,
    pub ils: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RandomVerb {
    pub verb: String,
    pub tense: String,
}

/// A practice answer: one tense of one verb, as typed by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct Attempt {
    pub verb: String,
    pub tense: String,
    #[serde(flatten)]
    pub answer: Conjugation,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FormError {
    MissingInfinitive,
    MissingField(String),
    NoTenses,
}

impl Verb {
    /// Builds a verb from the add-verb form, where each tense `N` arrives as
    /// `tense-N`, `je-N`, ... `ils-N` next to a single `infinitive` field.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, FormError> {
        let infinitive = form
            .get("infinitive")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or(FormError::MissingInfinitive)?
            .to_string();

        let indices = form
            .keys()
            .filter_map(|k| k.strip_prefix("tense-"))
            .filter_map(|n| n.parse::<u32>().ok())
            .collect::<BTreeSet<_>>();

        if indices.is_empty() {
            return Err(FormError::NoTenses);
        }

        let field = |name: &str, i: u32| {
            let key = format!("{name}-{i}");
            form.get(&key)
                .map(|v| v.trim().to_string())
                .ok_or(FormError::MissingField(key))
        };

        let tenses = indices
            .into_iter()
            .map(|i| {
                Ok(VerbTense {
                    tense: field("tense", i)?,
                    conjugation: Conjugation {
                        je: field("je", i)?,
                        tu: field("tu", i)?,
                        il: field("il", i)?,
                        nous: field("nous", i)?,
                        vous: field("vous", i)?,
                        ils: field("ils", i)?,
                    },
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { infinitive, tenses })
    }

    /// Strips surrounding whitespace from every name and form.
    pub fn trimmed(self) -> Self {
        let trim = |s: String| s.trim().to_string();

        Self {
            infinitive: trim(self.infinitive),
            tenses: self
                .tenses
                .into_iter()
                .map(|t| VerbTense {
                    tense: trim(t.tense),
                    conjugation: Conjugation {
                        je: trim(t.conjugation.je),
                        tu: trim(t.conjugation.tu),
                        il: trim(t.conjugation.il),
                        nous: trim(t.conjugation.nous),
                        vous: trim(t.conjugation.vous),
                        ils: trim(t.conjugation.ils),
                    },
                })
                .collect(),
        }
    }

    /// A named infinitive with at least one tense, every tense named once.
    pub fn is_well_formed(&self) -> bool {
        let mut seen = HashSet::new();

        !self.infinitive.is_empty()
            && !self.tenses.is_empty()
            && self
                .tenses
                .iter()
                .all(|t| !t.tense.is_empty() && seen.insert(t.tense.as_str()))
    }

    pub fn tense(&self, tense: &str) -> Option<&VerbTense> {
        self.tenses.iter().find(|t| t.tense == tense)
    }
}

impl Conjugation {
    /// Case and surrounding whitespace are ignored when marking an answer.
    pub fn matches(&self, answer: &Conjugation) -> bool {
        let same = |a: &str, b: &str| a.trim().to_lowercase() == b.trim().to_lowercase();

        same(&self.je, &answer.je)
            && same(&self.tu, &answer.tu)
            && same(&self.il, &answer.il)
            && same(&self.nous, &answer.nous)
            && same(&self.vous, &answer.vous)
            && same(&self.ils, &answer.ils)
    }
}
