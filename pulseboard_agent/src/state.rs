//! Shared agent state handed to every request handler.

use std::sync::Arc;

use crate::hub::Hub;
use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    // Simulation core (generators + alert history)
    pub pipeline: Arc<Pipeline>,

    // Connected sockets
    pub hub: Arc<Hub>,
}
