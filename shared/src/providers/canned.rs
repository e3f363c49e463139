//! Terminal tier: canned responses from the catalog.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

use crate::catalog::LAST_RESORT_GREETING;
use crate::context::resolve_context_key;
use crate::{Catalog, ChatRequest};

/// Picks a canned response for the request's language and page.
pub struct CannedTier {
    catalog: Arc<Catalog>,
    rng: Mutex<StdRng>,
}

impl CannedTier {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic selection for tests.
    pub fn with_seed(catalog: Arc<Catalog>, seed: u64) -> Self {
        Self {
            catalog,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Pick one response uniformly at random. Cannot fail.
    pub fn attempt(&self, request: &ChatRequest) -> String {
        let context_key = resolve_context_key(request.context.as_ref());
        let candidates = self
            .catalog
            .fallback_responses(&request.language, &context_key);

        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        candidates
            .choose(&mut *rng)
            .cloned()
            .unwrap_or_else(|| LAST_RESORT_GREETING.to_string())
    }
}
