//! Smart router over the provider pool
//!
//! Ranks providers by configured priority (declaration order breaks ties)
//! and answers "best eligible provider right now". A reported failure
//! demotes the provider to the back of the ranking for the remainder of the
//! current sprint only; `reset_ranking` restores priority order at sprint
//! start. Provider health beyond that is already captured by each client's
//! own throttle counter, so the router deliberately carries no extra
//! backoff state.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::providers::ProviderClient;

/// Priority-ranked provider pool
pub struct SmartRouter {
    /// All clients, in declaration order
    clients: Vec<Arc<ProviderClient>>,
    /// Current ranking as indices into `clients`
    ranking: Mutex<Vec<usize>>,
}

impl SmartRouter {
    pub fn new(clients: Vec<Arc<ProviderClient>>) -> Self {
        let ranking = Self::priority_order(&clients);
        Self {
            clients,
            ranking: Mutex::new(ranking),
        }
    }

    /// Stable sort by priority desc; equal priorities keep declaration order
    fn priority_order(clients: &[Arc<ProviderClient>]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..clients.len()).collect();
        order.sort_by_key(|&i| Reverse(clients[i].descriptor().priority));
        order
    }

    /// Highest-ranked provider that is available, rate-eligible, and not in
    /// the exclusion set. Returns `None` when the pool is exhausted.
    pub fn best_eligible(&self, exclude: &HashSet<String>) -> Option<Arc<ProviderClient>> {
        let ranking = self.ranking.lock();
        ranking
            .iter()
            .map(|&i| &self.clients[i])
            .find(|client| {
                !exclude.contains(client.name()) && client.available() && client.eligible()
            })
            .cloned()
    }

    /// Demote a provider to the back of the ranking for this sprint
    pub fn report_failure(&self, name: &str) {
        let mut ranking = self.ranking.lock();
        if let Some(pos) = ranking
            .iter()
            .position(|&i| self.clients[i].name() == name)
        {
            let idx = ranking.remove(pos);
            ranking.push(idx);
            debug!(provider = name, "demoted to back of ranking for this sprint");
        }
    }

    /// Restore priority order (called at the start of each sprint)
    pub fn reset_ranking(&self) {
        *self.ranking.lock() = Self::priority_order(&self.clients);
    }

    pub fn clients(&self) -> &[Arc<ProviderClient>] {
        &self.clients
    }

    /// Providers with a resolved credential
    pub fn available_count(&self) -> usize {
        self.clients.iter().filter(|c| c.available()).count()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Provider names in current ranking order (diagnostics)
    pub fn ranking(&self) -> Vec<String> {
        let ranking = self.ranking.lock();
        ranking
            .iter()
            .map(|&i| self.clients[i].name().to_string())
            .collect()
    }
}
