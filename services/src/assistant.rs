//! Tutor endpoint.

use sqlcoach_types::{AssistantReply, ChatTurn};

use crate::wire::{AskBody, AskWire};
use crate::{AssistantService, BackendClient, ServiceFut, decode_json};

impl AssistantService for BackendClient {
    fn ask(&self, turn: ChatTurn) -> ServiceFut<'_, AssistantReply> {
        Box::pin(async move {
            let url = self.endpoint(&format!("api/exercises/{}/ai/", turn.problem_id))?;
            tracing::debug!(problem_id = %turn.problem_id, mode = %turn.mode, "Asking tutor");
            let body = AskBody {
                message: &turn.message,
                user_query: &turn.code,
                error: turn.last_error.as_deref(),
                demo_mode: turn.mode.is_demo(),
            };
            let response = self.http().post(url).json(&body).send().await?;
            let wire: AskWire = decode_json(response).await?;
            Ok(wire.into_reply())
        })
    }
}
