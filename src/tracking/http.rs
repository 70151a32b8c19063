use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use reqwest::header::{self, HeaderValue};
use std::collections::VecDeque;
use swift_orders::OrderId;
use tracing::{debug, info};

use super::{
    ErrorCallback, LiveTrackingSubscriber, SseDecoder, SseEvent, Subscription, TrackingRoute,
    UpdateCallback, spawn_dispatch,
};
use crate::error::StreamError;
use crate::network::ApiClient;

type ByteStream = BoxStream<'static, reqwest::Result<Vec<u8>>>;

/// Live tracking over the server's `text/event-stream` endpoint.
#[derive(Debug, Clone)]
pub struct SseSubscriber {
    api: ApiClient,
    route: TrackingRoute,
}

impl SseSubscriber {
    pub const fn new(api: ApiClient, route: TrackingRoute) -> Self {
        Self { api, route }
    }
}

impl LiveTrackingSubscriber for SseSubscriber {
    fn subscribe(
        &self,
        order_id: &OrderId,
        on_update: UpdateCallback,
        on_error: ErrorCallback,
    ) -> Subscription {
        let path = self.route.path(order_id);
        info!(%order_id, %path, "Subscribing to order tracking");

        let events = event_stream(self.api.clone(), path, order_id.clone());
        spawn_dispatch(order_id.clone(), events, on_update, on_error)
    }
}

enum State {
    Connect { api: ApiClient, path: String },
    Open {
        body: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<SseEvent>,
    },
    Done,
}

/// Connects on first poll, then yields decoded events until the body ends.
/// A connection or read failure is yielded once and ends the stream.
fn event_stream(
    api: ApiClient,
    path: String,
    order_id: OrderId,
) -> impl Stream<Item = Result<SseEvent, StreamError>> + Send + 'static {
    stream::unfold(State::Connect { api, path }, move |mut state| {
        let order_id = order_id.clone();

        async move {
            loop {
                state = match state {
                    State::Connect { api, path } => match connect(&api, &path, &order_id).await {
                        Ok(body) => State::Open {
                            body,
                            decoder: SseDecoder::default(),
                            pending: VecDeque::new(),
                        },
                        Err(err) => return Some((Err(err), State::Done)),
                    },
                    State::Open {
                        mut body,
                        mut decoder,
                        mut pending,
                    } => {
                        if let Some(event) = pending.pop_front() {
                            return Some((
                                Ok(event),
                                State::Open {
                                    body,
                                    decoder,
                                    pending,
                                },
                            ));
                        }

                        match body.next().await {
                            Some(Ok(chunk)) => {
                                pending.extend(decoder.feed(&chunk));
                                State::Open {
                                    body,
                                    decoder,
                                    pending,
                                }
                            }
                            Some(Err(e)) => {
                                let err = StreamError::Transport {
                                    order_id: order_id.clone(),
                                    status_code: e.status().map(|status| status.as_u16()),
                                    message: e.to_string(),
                                };
                                return Some((Err(err), State::Done));
                            }
                            None => return None,
                        }
                    }
                    State::Done => return None,
                };
            }
        }
    })
}

async fn connect(api: &ApiClient, path: &str, order_id: &OrderId) -> Result<ByteStream, StreamError> {
    let transport = |status_code: Option<u16>, message: String| StreamError::Transport {
        order_id: order_id.clone(),
        status_code,
        message,
    };

    let response = api
        .http()
        .get(api.url(path))
        .header(header::ACCEPT, HeaderValue::from_static("text/event-stream"))
        .send()
        .await
        .map_err(|e| transport(e.status().map(|s| s.as_u16()), e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = status
            .canonical_reason()
            .map_or_else(|| status.to_string(), str::to_owned);
        return Err(transport(Some(status.as_u16()), message));
    }

    debug!(%order_id, %path, "Tracking stream open");
    Ok(response
        .bytes_stream()
        .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
        .boxed())
}
