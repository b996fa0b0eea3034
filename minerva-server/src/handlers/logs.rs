//! Server-Sent Events handler for the diagnostic log stream

use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use minerva_core::LOG_TOPIC;
use std::convert::Infallible;

/// SSE endpoint streaming every message logged after the client connects
pub async fn log_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let event_stream = state.log_sink().subscribe().map(|message| {
        let data = serde_json::json!({
            "message": message.message,
            "timestamp": message.timestamp,
        })
        .to_string();

        Ok(Event::default().event(LOG_TOPIC).data(data))
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
