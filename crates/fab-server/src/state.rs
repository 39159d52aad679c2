use std::sync::Arc;

use fab_sdk::Fab;

use crate::auth::{AuthProvider, SessionAuth};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub fab: Arc<Fab>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    /// State authenticating bearer tokens against `fab`'s own sessions.
    pub fn new(fab: Arc<Fab>) -> Self {
        let auth = Arc::new(SessionAuth::new(Arc::clone(&fab)));
        Self { fab, auth }
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }
}
