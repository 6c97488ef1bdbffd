use std::sync::Arc;

use crate::engine::BookingEngine;
use crate::utils::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(engine: BookingEngine, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: Arc::new(engine),
            clock,
        }
    }
}
