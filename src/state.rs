use crate::identity::ClientIdentity;
use crate::rate_limit::RateLimiter;
use std::sync::Arc;
// app's shared state

pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
    pub identity: Arc<dyn ClientIdentity>, // who a request is counted against
}

impl AppState {
    pub fn new(rate_limiter: Arc<RateLimiter>, identity: Arc<dyn ClientIdentity>) -> Self {
        Self {
            rate_limiter,
            identity,
        }
    }
}
