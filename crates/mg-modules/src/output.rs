//! Output module: push targets

use mg_core::{ActionKind, AddCommand, Error, Event, EventBody, Output, RemoveCommand, Result};
use mg_keeper::Waiter;
use mg_state::OutputRegistry;
use tracing::{debug, warn};

use crate::module::{require, Module};
use crate::roundtrip::RoundTrip;

pub const NAME: &str = "output";

pub struct OutputModule {
    registry: OutputRegistry,
    rt: RoundTrip,
}

impl OutputModule {
    pub fn new(rt: RoundTrip) -> Self {
        Self {
            registry: OutputRegistry::new(NAME),
            rt,
        }
    }

    pub fn registry(&self) -> &OutputRegistry {
        &self.registry
    }

    pub async fn add(&self, path: &str, unique: &str) -> Result<Output> {
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
                ActionKind::OutputAdd,
                &command,
                Waiter::for_unique(ActionKind::OutputAdd, unique),
            )
            .await?;

        Ok(self
            .registry
            .get_by_unique(unique)
            .unwrap_or_else(|| Output::new(path, unique)))
    }

    pub async fn remove(&self, unique: &str) -> Result<Output> {
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
                ActionKind::OutputRemove,
                &command,
                Waiter::for_unique(ActionKind::OutputRemove, unique),
            )
            .await?;

        Ok(snapshot)
    }

    pub fn list(&self) -> Vec<Output> {
        self.registry.list()
    }
}

impl Module for OutputModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn handle_event(&self, event: &Event) -> Result<()> {
        let EventBody::Output(body) = &event.body else {
            return Ok(());
        };

        match (event.kind, event.error()) {
            (ActionKind::OutputError, Some(error)) => {
                warn!(unique = %body.unique, error = %error, "Output reported an error");
                let error = error.to_string();
                self.registry
                    .update(&body.unique, move |output| output.error = Some(error))?;
            }
            (_, Some(error)) => {
                debug!(kind = %event.kind, error = %error, "Skipping failed event");
            }
            (ActionKind::OutputAdd, None) => {
                self.registry.add(Output::new(&body.path, &body.unique))?;
            }
            (ActionKind::OutputRemove, None) => {
                self.registry.remove_by_unique(&body.unique)?;
            }
            _ => {}
        }
        Ok(())
    }
}
