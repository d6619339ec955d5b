//! Resource module: the playback queue

use chrono::Utc;
use mg_core::{
    ActionKind, AddCommand, Error, Event, EventBody, RemoveCommand, Resource, Result,
};
use mg_keeper::Waiter;
use mg_state::ResourceRegistry;
use tracing::{debug, info};

use crate::module::{require, Module};
use crate::roundtrip::RoundTrip;

pub const NAME: &str = "resource";

pub struct ResourceModule {
    registry: ResourceRegistry,
    rt: RoundTrip,
}

impl ResourceModule {
    pub fn new(rt: RoundTrip) -> Self {
        Self::with_registry(rt, ResourceRegistry::new())
    }

    pub fn with_registry(rt: RoundTrip, registry: ResourceRegistry) -> Self {
        Self { registry, rt }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Queue a resource on the engine
    pub async fn add(&self, path: &str, unique: &str) -> Result<Resource> {
        require("path", path)?;
        require("unique", unique)?;
        let _reservation = self.registry.reserve(unique)?;
        if self.registry.contains(unique) {
            return Err(Error::duplicate_key(unique));
        }

        let command = AddCommand {
            path: path.to_string(),
            unique: unique.to_string(),
        };
        self.rt
            .call(
                ActionKind::ResourceAdd,
                &command,
                Waiter::for_unique(ActionKind::ResourceAdd, unique),
            )
            .await?;

        Ok(self
            .registry
            .get_by_unique(unique)
            .unwrap_or_else(|| Resource::new(path, unique)))
    }

    /// Drop a queued resource. The current one cannot be removed.
    pub async fn remove(&self, unique: &str) -> Result<Resource> {
        require("unique", unique)?;
        let _reservation = self.registry.reserve(unique)?;
        self.registry.check_removable(unique)?;
        let snapshot = self
            .registry
            .get_by_unique(unique)
            .ok_or_else(|| Error::not_found(unique))?;

        let command = RemoveCommand {
            unique: unique.to_string(),
        };
        self.rt
            .call(
                ActionKind::ResourceRemove,
                &command,
                Waiter::for_unique(ActionKind::ResourceRemove, unique),
            )
            .await?;

        Ok(snapshot)
    }

    pub fn list(&self) -> Vec<Resource> {
        self.registry.list()
    }

    pub fn all_list(&self) -> Vec<Resource> {
        self.registry.all_list()
    }

    pub fn current(&self) -> Option<Resource> {
        self.registry.current()
    }
}

impl Module for ResourceModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn handle_event(&self, event: &Event) -> Result<()> {
        if let Some(error) = event.error() {
            debug!(kind = %event.kind, error = %error, "Skipping failed event");
            return Ok(());
        }

        let body = match (&event.body, event.kind) {
            (EventBody::Resource(body), _) => body,
            (EventBody::Play(_), ActionKind::PlayStop) => {
                self.registry.stop_all(Utc::now());
                return Ok(());
            }
            _ => return Ok(()),
        };

        match event.kind {
            ActionKind::ResourceAdd => {
                self.registry.add(Resource::new(&body.path, &body.unique))?;
            }
            ActionKind::ResourceRemove => {
                self.registry.remove_by_unique(&body.unique)?;
            }
            ActionKind::ResourceStart => {
                self.registry.mark_started(&body.unique, Utc::now())?;
                info!(unique = %body.unique, path = %body.path, "Resource started");
            }
            ActionKind::ResourceEnd => {
                self.registry.mark_ended(&body.unique, Utc::now())?;
                info!(unique = %body.unique, "Resource finished");
            }
            _ => {}
        }
        Ok(())
    }
}
