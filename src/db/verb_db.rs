use std::io;
use std::path::{Path, PathBuf};

use log::info;

use super::json_file;
use super::LoadError;
use crate::verb::{Conjugation, RandomVerb, Verb};

pub struct VerbDb {
    location: PathBuf,
    verbs: Vec<Verb>,
    modified: bool,
}

impl VerbDb {
    pub fn load(location: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let location = location.into();
        let verbs = json_file::read(&location)?;

        Ok(Self {
            location,
            verbs,
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

    pub fn verb_list(&self) -> Vec<&str> {
        self.verbs.iter().map(|v| v.infinitive.as_str()).collect()
    }

    pub fn add_verb(&mut self, verb: Verb) -> &mut Self {
        info!(
            "adding verb {} with {} tenses",
            verb.infinitive,
            verb.tenses.len()
        );

        self.verbs.push(verb);
        self.modified = true;
        self
    }

    pub fn remove_verb(&mut self, infinitive: &str) -> &mut Self {
        info!("removing verb {infinitive}");

        self.verbs.retain(|v| v.infinitive != infinitive);
        self.modified = true;
        self
    }

    fn find(&self, infinitive: &str) -> Option<&Verb> {
        self.verbs.iter().find(|v| v.infinitive == infinitive)
    }

    /// Whether the verb exists and, if a tense is given, has that tense.
    pub fn has(&self, infinitive: &str, tense: Option<&str>) -> bool {
        match (self.find(infinitive), tense) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(verb), Some(tense)) => verb.tense(tense).is_some(),
        }
    }

    /// Picks one verb/tense pair. `seed` is expected in `[0, 1)` and maps
    /// onto the flattened list of every tense of every verb, optionally
    /// restricted to the infinitives in `within`.
    pub fn get_random(&self, seed: f64, within: Option<&[String]>) -> Option<RandomVerb> {
        let pairs = self
            .verbs
            .iter()
            .filter(|v| within.map_or(true, |set| set.contains(&v.infinitive)))
            .flat_map(|v| {
                v.tenses.iter().map(|t| RandomVerb {
                    verb: v.infinitive.clone(),
                    tense: t.tense.clone(),
                })
            })
            .collect::<Vec<_>>();

        let last = pairs.len().checked_sub(1)?;
        let i = (seed.max(0.0) * pairs.len() as f64).floor() as usize;

        pairs.into_iter().nth(i.min(last))
    }

    pub fn get_conj(&self, infinitive: &str, tense: &str) -> Option<&Conjugation> {
        self.find(infinitive)?
            .tense(tense)
            .map(|t| &t.conjugation)
    }

    /// Writes the store out if anything changed since the last save.
    pub fn save(&mut self) -> Result<bool, io::Error> {
        if !self.modified {
            return Ok(false);
        }

        json_file::write(&self.location, &self.verbs)?;
        self.modified = false;

        info!("saved {} verbs to {:?}", self.verbs.len(), self.location);
        Ok(true)
    }
}
