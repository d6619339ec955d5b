//! Play module: playback control and engine log relay

use mg_core::{ActionKind, Event, EventBody, Result, StopCommand};
use mg_keeper::Waiter;
use tracing::{debug, error, info, warn};

use crate::module::Module;
use crate::roundtrip::RoundTrip;

pub const NAME: &str = "play";

pub struct PlayModule {
    rt: RoundTrip,
}

impl PlayModule {
    pub fn new(rt: RoundTrip) -> Self {
        Self { rt }
    }

    /// Stop playback; resolved by the next `PLAY_STOP` event
    pub async fn stop(&self) -> Result<()> {
        self.rt
            .call(
                ActionKind::PlayStop,
                &StopCommand {},
                Waiter::any(ActionKind::PlayStop),
            )
            .await?;
        Ok(())
    }
}

impl Module for PlayModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn handle_event(&self, event: &Event) -> Result<()> {
        match (&event.body, event.kind) {
            (EventBody::Play(_), ActionKind::PlayStop) => match event.error() {
                Some(e) => debug!(error = %e, "Engine refused to stop"),
                None => info!("Playback stopped"),
            },
            (EventBody::Play(_), ActionKind::PlayEnd) => {
                info!("Engine finished its queue");
            }
            (EventBody::Log(log), ActionKind::EngineLog) => match log.level.as_str() {
                "error" => error!(target: "engine", "{}", log.message),
                "warn" | "warning" => warn!(target: "engine", "{}", log.message),
                "debug" | "trace" => debug!(target: "engine", "{}", log.message),
                _ => info!(target: "engine", "{}", log.message),
            },
            _ => {}
        }
        Ok(())
    }
}
