use tracing::{debug, warn};

use crate::error::CollectError;

type Strategy<'a, T> = Box<dyn FnOnce() -> Result<T, CollectError> + 'a>;

/// Ordered list of collection strategies. The first one that returns `Ok` is
/// accepted, even if its data is partial.
pub struct FallbackChain<'a, T> {
    attribute: &'static str,
    strategies: Vec<(&'static str, Strategy<'a, T>)>,
}

impl<'a, T> FallbackChain<'a, T> {
    pub fn new(attribute: &'static str) -> Self {
        FallbackChain {
            attribute,
            strategies: Vec::new(),
        }
    }

    pub fn then<F>(mut self, name: &'static str, strategy: F) -> Self
    where
        F: FnOnce() -> Result<T, CollectError> + 'a,
    {
        self.strategies.push((name, Box::new(strategy)));
        self
    }

    /// Adds the strategy only when `enabled` holds.
    pub fn then_if<F>(self, enabled: bool, name: &'static str, strategy: F) -> Self
    where
        F: FnOnce() -> Result<T, CollectError> + 'a,
    {
        if enabled {
            self.then(name, strategy)
        } else {
            self
        }
    }

    /// Runs strategies in order. Returns the winning value and its strategy
    /// name, or `None` when every strategy failed.
    pub fn run(self) -> Option<(T, &'static str)> {
        let attribute = self.attribute;
        for (name, strategy) in self.strategies {
            match strategy() {
                Ok(value) => {
                    debug!(attribute, strategy = name, "collection strategy succeeded");
                    return Some((value, name));
                }
                Err(err) => {
                    debug!(attribute, strategy = name, error = %err, "collection strategy failed");
                }
            }
        }
        warn!(attribute, "all collection strategies failed, reporting as unavailable");
        None
    }

    pub fn resolve_or_else<F>(self, fallback: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.run().map(|(value, _)| value).unwrap_or_else(fallback)
    }
}
