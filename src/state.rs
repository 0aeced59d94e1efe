//! Shared application state: the training database and the content
//! orchestrator. Cheap to clone; handlers receive it via axum `State`.

use tracing::{info, instrument};

use crate::config::Settings;
use crate::db::TrainingDb;
use crate::gigachat::GigaChat;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub db: TrainingDb,
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Assemble state from its already-built parts. Connection and client
    /// construction stay in `main` so startup failures surface there.
    #[instrument(level = "info", skip_all)]
    pub fn new(settings: &Settings, db: TrainingDb, client: GigaChat) -> Self {
        info!(
            target: "kurso_backend",
            base_url = %client.base_url,
            model = %client.model,
            "GigaChat client ready"
        );
        let orchestrator = Orchestrator::new(client, &settings.retry);
        Self { db, orchestrator }
    }
}
