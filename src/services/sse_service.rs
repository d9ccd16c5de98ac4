use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{dto::sse::ServerEvent, services::sse_events, state::SessionHandle};

/// Subscribe to a session's event stream.
///
/// The snapshot is built and the receiver registered while the session lock
/// is held, so a subscriber can never miss an event that postdates its
/// snapshot and never receives one that predates it.
pub async fn subscribe_session(
    handle: &SessionHandle,
) -> (Option<ServerEvent>, broadcast::Receiver<ServerEvent>) {
    let session = handle.session.lock().await;
    let snapshot = sse_events::snapshot_event(&session);
    let receiver = handle.sse.subscribe();
    (snapshot, receiver)
}

/// Convert a broadcast receiver into an SSE response, emitting the snapshot
/// first, then forwarding events until the client disconnects.
pub fn to_sse_stream(
    snapshot: Option<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        if let Some(payload) = snapshot
            && tx.send(Ok(to_event(payload))).await.is_err()
        {
            return;
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        tracing::debug!("session SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}
