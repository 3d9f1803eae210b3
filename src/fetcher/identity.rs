use crate::config::{FetcherConfig, Rotation, DEFAULT_USER_AGENTS};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fixed pool of client identities (User-Agent strings)
#[derive(Debug)]
pub struct IdentityPool {
    agents: Vec<String>,
    rotation: Rotation,
    cursor: AtomicUsize,
}

impl IdentityPool {
    /// Creates a pool, ignoring blank entries
    ///
    /// Falls back to the built-in desktop identities when nothing usable
    /// is supplied.
    pub fn new(agents: Vec<String>, rotation: Rotation) -> Self {
        let mut agents: Vec<String> = agents
            .into_iter()
            .map(|ua| ua.trim().to_string())
            .filter(|ua| !ua.is_empty())
            .collect();

        if agents.is_empty() {
            agents = DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect();
        }

        Self {
            agents,
            rotation,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &FetcherConfig) -> Self {
        Self::new(config.user_agents.clone(), config.rotation)
    }

    /// Picks the identity for the next attempt
    pub fn next(&self) -> &str {
        let index = match self.rotation {
            Rotation::Cyclic => self.cursor.fetch_add(1, Ordering::Relaxed) % self.agents.len(),
            Rotation::Random => rand::rng().random_range(0..self.agents.len()),
        };
        &self.agents[index]
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
