use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::StreamExt;
use futures::future;
use futures::stream::Stream;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::{ApiError, ApiResult};
use crate::server::appstate::AppState;

pub async fn get_events(State(state): State<AppState>) -> Sse<impl Stream<Item = ApiResult<Event>>> {
    let hello = tokio_stream::iter([Ok(Event::default().comment("hi"))]);

    let channel = state.integration().bus().subscribe();
    let stream = BroadcastStream::new(channel).filter_map(|evt| {
        let res = match evt {
            Ok(evt) => {
                log::trace!("## EVENT ##: {evt:?}");
                Some(
                    Event::default()
                        .event("state_changed")
                        .json_data(evt)
                        .map_err(ApiError::from),
                )
            }
            Err(err) => {
                // slow client, carry on with the newest events
                log::warn!("Event stream lagging: {err}");
                None
            }
        };
        future::ready(res)
    });

    Sse::new(hello.chain(stream)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text(": ping"),
    )
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(get_events))
}
