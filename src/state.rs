// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{attempt::AttemptService, catalog::ExamCatalog},
    store::Repository,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Repository>,
    pub config: Config,
    pub catalog: ExamCatalog,
    pub attempts: Arc<AttemptService>,
}

impl AppState {
    pub fn new(store: Arc<dyn Repository>, config: Config) -> Self {
        Self {
            catalog: ExamCatalog::new(store.clone()),
            attempts: AttemptService::new(store.clone()),
            store,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Repository> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ExamCatalog {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for Arc<AttemptService> {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}
