//! Route composition
//!
//! A [`Mountable`] knows its prefix and builds its routes from the shared
//! [`AppState`]; [`RouterBuilder`] mounts them and records each mount.

use axum::Router;
use serde::Serialize;
use tracing::info;

use crate::api::AppState;

pub trait Mountable {
    /// Path prefix, empty for the root
    const PREFIX: &'static str;
    const NAME: &'static str;

    fn routes(state: AppState) -> Router;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mount {
    pub prefix: &'static str,
    pub name: &'static str,
}

pub struct RouterBuilder {
    state: AppState,
    router: Router,
    mounts: Vec<Mount>,
}

impl RouterBuilder {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            router: Router::new(),
            mounts: Vec::new(),
        }
    }

    pub fn mount<M: Mountable>(mut self) -> Self {
        let routes = M::routes(self.state.clone());
        self.router = if M::PREFIX.is_empty() {
            self.router.merge(routes)
        } else {
            self.router.nest(M::PREFIX, routes)
        };
        info!(name = M::NAME, prefix = M::PREFIX, "Mounted routes");
        self.mounts.push(Mount {
            prefix: M::PREFIX,
            name: M::NAME,
        });
        self
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    pub fn build(self) -> (Router, Vec<Mount>) {
        (self.router, self.mounts)
    }
}
