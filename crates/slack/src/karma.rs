use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use plusplus_core::{KarmaOutcome, KarmaService};

use crate::events::{EventContext, EventHandlerError, MessageEvent, MessageService, ReplyMessage};
use crate::replies::ReplyFormatter;

/// Runs each channel message through `KarmaService` and renders the outcome.
pub struct KarmaMessageService {
    karma: Arc<KarmaService>,
    formatter: Arc<ReplyFormatter>,
}

impl KarmaMessageService {
    pub fn new(karma: Arc<KarmaService>) -> Self {
        Self::with_formatter(karma, ReplyFormatter::shared())
    }

    pub fn with_formatter(karma: Arc<KarmaService>, formatter: Arc<ReplyFormatter>) -> Self {
        Self { karma, formatter }
    }
}

#[async_trait]
impl MessageService for KarmaMessageService {
    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<Option<ReplyMessage>, EventHandlerError> {
        let outcome = match self.karma.handle_message(&event.text, &event.user_id).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "karma.message_failed",
                    correlation_id = %ctx.correlation_id,
                    channel_id = %event.channel_id,
                    error_class = error.error_class(),
                    error = %error,
                    "karma request failed; no reply sent"
                );
                return Err(error.into());
            }
        };

        Ok(match outcome {
            KarmaOutcome::Reply(reply) => Some(ReplyMessage {
                channel_id: event.channel_id.clone(),
                thread_ts: event.thread_ts.clone(),
                text: self.formatter.render(&reply),
            }),
            KarmaOutcome::NoOperation | KarmaOutcome::TargetMissing => None,
        })
    }
}
