use std::fmt::Display;

use log::debug;
use serde_json::{Map, Value};

pub type Output = Map<String, Value>;

/// A chain of steps run against one store on behalf of a single client request.
///
/// Each step only runs while the request is still good: the first failing
/// validation sets `invalid_input`, the first failing server check or step
/// error sets `server_error`, and from then on every later step is skipped.
pub struct Request<'db, I, D: ?Sized> {
    input: I,
    db: &'db mut D,
    invalid_input: bool,
    server_error: bool,
    output: Output,
    log: Vec<String>,
}

impl<'db, I, D: ?Sized> Request<'db, I, D> {
    pub fn new(input: I, db: &'db mut D) -> Self {
        Self {
            input,
            db,
            invalid_input: false,
            server_error: false,
            output: Output::new(),
            log: vec![],
        }
    }

    fn running(&self) -> bool {
        !self.invalid_input && !self.server_error
    }

    fn fail(&mut self, e: impl Display) {
        self.server_error = true;
        self.log.push(format!("Error: {e}"));
    }

    pub fn validate(mut self, validation: impl FnOnce(&I, &D) -> bool) -> Self {
        if self.running() {
            let invalid = !validation(&self.input, &*self.db);
            self.invalid_input = invalid;
            self.log.push(format!("Invalid: {invalid}"));
        }
        self
    }

    pub fn check_server(mut self, check: impl FnOnce(&I, &D) -> bool) -> Self {
        if self.running() {
            let error = !check(&self.input, &*self.db);
            self.server_error = error;
            self.log.push(format!("Server error: {error}"));
        }
        self
    }

    pub fn modify<E: Display>(
        mut self,
        modify: impl FnOnce(&I, &mut D) -> Result<(), E>,
    ) -> Self {
        if self.running() {
            match modify(&self.input, &mut *self.db) {
                Ok(()) => self.log.push("Modified DB".into()),
                Err(e) => self.fail(e),
            }
        }
        self
    }

    pub fn then<E: Display>(
        mut self,
        transform: impl FnOnce(&I, Output, &D) -> Result<Output, E>,
    ) -> Self {
        if self.running() {
            let output = std::mem::take(&mut self.output);
            match transform(&self.input, output, &*self.db) {
                Ok(output) => {
                    self.output = output;
                    self.log.push("Transformed Data".into());
                }
                Err(e) => self.fail(e),
            }
        }
        self
    }

    pub fn is_ok(&self) -> bool {
        self.running()
    }

    #[cfg(test)]
    pub fn invalid_input(&self) -> bool {
        self.invalid_input
    }

    #[cfg(test)]
    pub fn server_error(&self) -> bool {
        self.server_error
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn db(&self) -> &D {
        &*self.db
    }

    #[cfg(test)]
    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn to_json(&self) -> Value {
        let mut json = Output::new();
        json.insert("invalid_input".into(), self.invalid_input.into());
        json.insert("server_error".into(), self.server_error.into());

        if self.running() {
            for (k, v) in &self.output {
                json.insert(k.clone(), v.clone());
            }
        }

        debug!("request steps: {:?}", self.log);
        Value::Object(json)
    }
}
