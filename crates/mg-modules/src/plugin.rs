//! Plugin module: filters and overlays loaded into the engine

use mg_core::{
    ActionKind, Error, Event, EventBody, Plugin, PluginCommand, PluginParams, RemoveCommand,
    Result,
};
use mg_keeper::Waiter;
use mg_state::PluginRegistry;
use tracing::{debug, info};

use crate::module::{require, Module};
use crate::roundtrip::RoundTrip;

pub const NAME: &str = "plugin";

pub struct PluginModule {
    registry: PluginRegistry,
    rt: RoundTrip,
}

impl PluginModule {
    pub fn new(rt: RoundTrip) -> Self {
        Self {
            registry: PluginRegistry::new(NAME),
            rt,
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub async fn add(&self, path: &str, unique: &str, params: PluginParams) -> Result<Plugin> {
        require("path", path)?;
        require("unique", unique)?;
        let _reservation = self.registry.reserve(unique)?;
        if self.registry.contains(unique) {
            return Err(Error::duplicate_key(unique));
        }

        let command = PluginCommand {
            path: path.to_string(),
            unique: unique.to_string(),
            params: params.clone(),
        };
        self.rt
            .call(
                ActionKind::PluginAdd,
                &command,
                Waiter::for_unique(ActionKind::PluginAdd, unique),
            )
            .await?;

        Ok(self
            .registry
            .get_by_unique(unique)
            .unwrap_or_else(|| Plugin::new(path, unique, params)))
    }

    pub async fn remove(&self, unique: &str) -> Result<Plugin> {
        require("unique", unique)?;
        let _reservation = self.registry.reserve(unique)?;
        let snapshot = self
            .registry
            .get_by_unique(unique)
            .ok_or_else(|| Error::not_found(unique))?;

        let command = RemoveCommand {
            unique: unique.to_string(),
        };
        self.rt
            .call(
                ActionKind::PluginRemove,
                &command,
                Waiter::for_unique(ActionKind::PluginRemove, unique),
            )
            .await?;

        Ok(snapshot)
    }

    /// Replace the parameters of a loaded plugin
    pub async fn update(&self, unique: &str, params: PluginParams) -> Result<Plugin> {
        require("unique", unique)?;
        let _reservation = self.registry.reserve(unique)?;
        let existing = self
            .registry
            .get_by_unique(unique)
            .ok_or_else(|| Error::not_found(unique))?;

        let command = PluginCommand {
            path: existing.path.clone(),
            unique: unique.to_string(),
            params: params.clone(),
        };
        self.rt
            .call(
                ActionKind::PluginUpdate,
                &command,
                Waiter::for_unique(ActionKind::PluginUpdate, unique),
            )
            .await?;

        Ok(self.registry.get_by_unique(unique).unwrap_or(Plugin {
            params,
            ..existing
        }))
    }

    pub fn list(&self) -> Vec<Plugin> {
        self.registry.list()
    }
}

impl Module for PluginModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn handle_event(&self, event: &Event) -> Result<()> {
        let EventBody::Plugin(body) = &event.body else {
            return Ok(());
        };
        if let Some(error) = event.error() {
            debug!(kind = %event.kind, unique = %body.unique, error = %error, "Skipping failed event");
            return Ok(());
        }

        match event.kind {
            ActionKind::PluginAdd => {
                self.registry
                    .add(Plugin::new(&body.path, &body.unique, body.params.clone()))?;
                info!(unique = %body.unique, path = %body.path, "Plugin loaded");
            }
            ActionKind::PluginRemove => {
                self.registry.remove_by_unique(&body.unique)?;
            }
            ActionKind::PluginUpdate => {
                let params = body.params.clone();
                self.registry
                    .update(&body.unique, move |plugin| plugin.params = params)?;
            }
            _ => {}
        }
        Ok(())
    }
}
