use crate::error::CallError;
use crate::relay::{JoinOutcome, PollBatch, RelayChannel, rejection};
use async_trait::async_trait;
use huddle_core::{
    JoinRequest, JoinResponse, LeaveRequest, Participant, ParticipantId, PollQuery, RelayStatus,
    RoomId, Signal, SignalsResponse, StatusResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// `RelayChannel` over the relay's HTTP/JSON API.
#[derive(Clone)]
pub struct HttpRelay {
    client: Client,
    base_url: String,
}

impl HttpRelay {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CallError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CallError::RelayUnreachable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, op: &str, room: &RoomId) -> String {
        format!("{}/{}/{}", self.base_url, op, room)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CallError> {
    let status = response.status();
    if status.is_server_error() {
        return Err(CallError::RelayUnreachable(format!("relay answered {status}")));
    }
    // 4xx bodies still carry a JSON status/code pair.
    response
        .json::<T>()
        .await
        .map_err(|e| CallError::RelayUnreachable(format!("invalid relay response ({status}): {e}")))
}

fn unreachable(e: reqwest::Error) -> CallError {
    CallError::RelayUnreachable(e.to_string())
}

fn check(response: StatusResponse) -> Result<(), CallError> {
    match response.status {
        RelayStatus::Success => Ok(()),
        RelayStatus::Error => Err(rejection(response.code.as_deref(), response.message)),
    }
}

#[async_trait]
impl RelayChannel for HttpRelay {
    async fn join(&self, room: &RoomId, participant: &Participant) -> Result<JoinOutcome, CallError> {
        let body = JoinRequest {
            username: participant.display_name.clone(),
            user_id: Some(participant.id.0.clone()),
        };

        let response = self
            .client
            .post(self.url("join", room))
            .json(&body)
            .send()
            .await
            .map_err(unreachable)?;

        let body: JoinResponse = decode(response).await?;
        JoinOutcome::from_response(body, &participant.id)
    }

    async fn poll(
        &self,
        room: &RoomId,
        participant_id: &ParticipantId,
        since: Option<u64>,
    ) -> Result<PollBatch, CallError> {
        let query = PollQuery {
            user_id: participant_id.0.clone(),
            since,
        };

        let response = self
            .client
            .get(self.url("signals", room))
            .query(&query)
            .send()
            .await
            .map_err(unreachable)?;

        let body: SignalsResponse = decode(response).await?;
        let batch = PollBatch::from_response(body)?;
        if !batch.signals.is_empty() {
            debug!("Polled {} signals from room {}", batch.signals.len(), room);
        }
        Ok(batch)
    }

    async fn send(&self, room: &RoomId, signal: &Signal) -> Result<(), CallError> {
        let response = self
            .client
            .post(self.url("signal", room))
            .json(signal)
            .send()
            .await
            .map_err(unreachable)?;

        check(decode(response).await?)
    }

    async fn leave(&self, room: &RoomId, participant_id: &ParticipantId) -> Result<(), CallError> {
        let body = LeaveRequest {
            user_id: participant_id.0.clone(),
        };

        let response = self
            .client
            .post(self.url("leave", room))
            .json(&body)
            .send()
            .await
            .map_err(unreachable)?;

        check(decode(response).await?)
    }
}
