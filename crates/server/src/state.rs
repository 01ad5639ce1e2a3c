use std::sync::Arc;

use crate::admission::RateLimitState;
use crate::lookup::Lookup;

#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<Lookup>,
    pub admission: RateLimitState,
}
