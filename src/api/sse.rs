//! Server-Sent Events state stream
//!
//! Streams full-state snapshots to connected clients. Every push uses the
//! same envelope: event label `state`, data the serialized snapshot — the
//! registration push included.

use crate::api::server::AppContext;
use crate::broadcast::{Broadcaster, ObserverId};
use crate::coordinator::Coordinator;
use crate::error::Result;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Unregisters the observer when the client stream is dropped
struct ObserverGuard {
    coordinator: Arc<Coordinator>,
    id: ObserverId,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        debug!("SSE client disconnected, observer {}", self.id);
        self.coordinator.unregister_observer(self.id);
    }
}

/// GET /events - SSE state stream
///
/// The observer receives the current snapshot immediately, then every
/// subsequent snapshot in commit order until it disconnects.
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let (tx, rx) = Broadcaster::channel();
    let id = ctx.coordinator.register_observer(tx).await?;
    debug!(
        "New SSE client connected as observer {} ({} live)",
        id,
        ctx.coordinator.observer_count()
    );

    let guard = ObserverGuard {
        coordinator: ctx.coordinator.clone(),
        id,
    };

    let stream = ReceiverStream::new(rx).map(move |payload| {
        let _ = &guard;
        Ok(Event::default().event("state").data(payload.as_str()))
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
