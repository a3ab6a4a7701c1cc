//! Shared application state.

use std::sync::Arc;

use cairn_core::ActivityRecorder;
use cairn_core::auth::TokenSigner;
use cairn_core::config::{Config, PaginationConfig};
use cairn_core::store::{ActivityStore, CommentStore, ProjectStore, TaskStore, UserStore};

/// Handles shared by every request. Cheap to clone; all fields are
/// reference-counted or small.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub comments: Arc<dyn CommentStore>,
    pub activity: Arc<dyn ActivityStore>,
    pub recorder: ActivityRecorder,
    pub tokens: Arc<TokenSigner>,
    pub pagination: PaginationConfig,
}

impl AppState {
    /// Builds state around one store that implements every trait, and
    /// spawns the activity writer task on the current runtime.
    pub fn new<S>(store: Arc<S>, config: &Config) -> Self
    where
        S: UserStore + ProjectStore + TaskStore + CommentStore + ActivityStore + 'static,
    {
        let activity: Arc<dyn ActivityStore> = store.clone();
        let recorder = ActivityRecorder::spawn(activity.clone(), config.activity.queue_capacity);
        Self {
            users: store.clone(),
            projects: store.clone(),
            tasks: store.clone(),
            comments: store.clone(),
            activity,
            recorder,
            tokens: Arc::new(TokenSigner::new(
                &config.auth.token_secret,
                config.auth.token_ttl_hours,
            )),
            pagination: config.pagination.clone(),
        }
    }
}
