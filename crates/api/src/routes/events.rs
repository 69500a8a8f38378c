//! Server-Sent Events feed of console events.

use std::convert::Infallible;
use std::time::Duration;

use agency_core::access::{authorize_capability, Capability};
use agency_core::events::ConsoleEvent;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::error::ApiResult;
use crate::middleware::auth::Console;
use crate::state::AppState;

fn to_sse(event: &ConsoleEvent) -> Event {
    let name = match event {
        ConsoleEvent::Welcome => "welcome",
        ConsoleEvent::ItemChanged(_) => "item_changed",
        ConsoleEvent::Notification(_) => "notification",
    };
    Event::default()
        .event(name)
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to encode console event");
            Event::default().comment("unencodable event")
        })
}

/// Live feed of item changes and new notifications. Starts with a `welcome`
/// event; a subscriber that falls behind skips the events it missed.
pub async fn stream(
    State(state): State<AppState>,
    Console(session): Console,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    authorize_capability(&session, Capability::ReadNotifications)?;
    let rx = state.event_bus().subscribe();
    tracing::debug!(
        user_id = ?session.user_id(),
        subscribers = state.event_bus().subscriber_count(),
        "Console event stream opened"
    );

    let welcome = stream::once(async { Ok(to_sse(&ConsoleEvent::Welcome)) });
    let live = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Ok(to_sse(&event)), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Console event stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(welcome.chain(live)).keep_alive(
        KeepAlive::new().interval(Duration::from_secs(15)),
    ))
}
