//! Extension points.
//!
//! Policy override hooks the host registers at construction time: each is a
//! pure function folding a default value through the registered callbacks
//! in priority order. Registration is explicit on a [`Hooks`] value passed
//! into the layer; there is no global registry.

use crate::observe::LogLevel;
use crate::types::{Outcome, Request};

pub type ExpirationFn = dyn Fn(u64, &Outcome, &Request, &str) -> u64 + Send + Sync;
pub type IsErrorFn = dyn Fn(bool, &Outcome, &Request, &str) -> bool + Send + Sync;
pub type LogLevelFn = dyn Fn(LogLevel, &Outcome, &Request, &str) -> LogLevel + Send + Sync;

struct Registered<F: ?Sized> {
    name: String,
    priority: i32,
    callback: Box<F>,
}

fn insert_sorted<F: ?Sized>(hooks: &mut Vec<Registered<F>>, hook: Registered<F>) {
    hooks.push(hook);
    hooks.sort_by_key(|h| h.priority);
}

/// Named, prioritized value-transformer registries for the layer's policy
/// decisions. Lower priority runs first; callbacks registered under the
/// same priority run in registration order.
#[derive(Default)]
pub struct Hooks {
    expiration: Vec<Registered<ExpirationFn>>,
    is_error: Vec<Registered<IsErrorFn>>,
    log_level: Vec<Registered<LogLevelFn>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the expiration seconds applied when an entry is stored.
    pub fn on_expiration<F>(&mut self, name: impl Into<String>, priority: i32, callback: F)
    where
        F: Fn(u64, &Outcome, &Request, &str) -> u64 + Send + Sync + 'static,
    {
        insert_sorted(
            &mut self.expiration,
            Registered {
                name: name.into(),
                priority,
                callback: Box::new(callback),
            },
        );
    }

    /// Override whether an outcome classifies as an error.
    pub fn on_is_error<F>(&mut self, name: impl Into<String>, priority: i32, callback: F)
    where
        F: Fn(bool, &Outcome, &Request, &str) -> bool + Send + Sync + 'static,
    {
        insert_sorted(
            &mut self.is_error,
            Registered {
                name: name.into(),
                priority,
                callback: Box::new(callback),
            },
        );
    }

    /// Override the level an observation line is emitted at.
    pub fn on_log_level<F>(&mut self, name: impl Into<String>, priority: i32, callback: F)
    where
        F: Fn(LogLevel, &Outcome, &Request, &str) -> LogLevel + Send + Sync + 'static,
    {
        insert_sorted(
            &mut self.log_level,
            Registered {
                name: name.into(),
                priority,
                callback: Box::new(callback),
            },
        );
    }

    pub fn unregister_expiration(&mut self, name: &str) -> bool {
        let len = self.expiration.len();
        self.expiration.retain(|h| h.name != name);
        self.expiration.len() < len
    }

    pub fn unregister_is_error(&mut self, name: &str) -> bool {
        let len = self.is_error.len();
        self.is_error.retain(|h| h.name != name);
        self.is_error.len() < len
    }

    pub fn unregister_log_level(&mut self, name: &str) -> bool {
        let len = self.log_level.len();
        self.log_level.retain(|h| h.name != name);
        self.log_level.len() < len
    }

    pub(crate) fn expiration(
        &self,
        default: u64,
        outcome: &Outcome,
        request: &Request,
        url: &str,
    ) -> u64 {
        self.expiration
            .iter()
            .fold(default, |value, hook| (hook.callback)(value, outcome, request, url))
    }

    pub(crate) fn is_error(
        &self,
        default: bool,
        outcome: &Outcome,
        request: &Request,
        url: &str,
    ) -> bool {
        self.is_error
            .iter()
            .fold(default, |value, hook| (hook.callback)(value, outcome, request, url))
    }

    pub(crate) fn log_level(
        &self,
        default: LogLevel,
        outcome: &Outcome,
        request: &Request,
        url: &str,
    ) -> LogLevel {
        self.log_level
            .iter()
            .fold(default, |value, hook| (hook.callback)(value, outcome, request, url))
    }
}
