use std::sync::Arc;

use stallwatch_types::{Ack, ActionCommand};

use crate::capability::InputInjector;
use crate::error::ActionError;
use crate::locator::LocatedTarget;

/// Builds resume commands and hands them to the injector. One attempt per call.
pub struct ActionDispatcher {
    injector: Arc<dyn InputInjector>,
    resume_text: String,
}

impl ActionDispatcher {
    pub fn new(injector: Arc<dyn InputInjector>, resume_text: impl Into<String>) -> Self {
        Self {
            injector,
            resume_text: resume_text.into(),
        }
    }

    pub fn command_for(&self, target: &LocatedTarget) -> ActionCommand {
        ActionCommand {
            text_payload: self.resume_text.clone(),
            target_region: target.input_box,
            window_id: Some(target.window.id),
        }
    }

    pub async fn dispatch(&self, command: &ActionCommand) -> Result<Ack, ActionError> {
        tracing::debug!(
            "sending {:?} to input box at {:?}",
            command.text_payload,
            command.target_region
        );
        self.injector.inject(command).await
    }
}
