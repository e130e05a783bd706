//! Server-Sent Events (SSE) utilities

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::time::Duration;

/// Interval between keep-alive comments on idle SSE connections
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Wrap an event stream into an SSE response with the standard heartbeat
///
/// Proxies and browsers drop idle connections; the keep-alive comment keeps
/// long-lived streams open between domain events.
pub fn with_heartbeat<S>(stream: S) -> Sse<S>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

/// SSE response carrying exactly one event, after which the stream ends
///
/// # Example
/// ```rust,ignore
/// pub async fn disabled_feed() -> impl IntoResponse {
///     folio_common::sse::single_event("status", "offline")
/// }
/// ```
pub fn single_event(
    event_name: &'static str,
    data: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let event = Event::default().event(event_name).data(data);
    Sse::new(stream::once(async move { Ok::<Event, Infallible>(event) }))
}
