use axum::{http, response::IntoResponse};
use bytes::Bytes;
use futures::Stream;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio_stream::wrappers::ReceiverStream;

/// A `text/event-stream` body fed by a task writing preformatted frames into a channel
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    pub fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        let mut response = http::Response::new(body);
        let headers = response.headers_mut();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(
            http::header::CACHE_CONTROL,
            http::HeaderValue::from_static("no-cache"),
        );
        headers.insert(
            http::header::CONNECTION,
            http::HeaderValue::from_static("keep-alive"),
        );
        response
    }
}

/// A named event. Multi-line data is sent as one `data:` field per line.
pub fn format_event(event: &str, data: &str) -> String {
    let mut frame = format!("event: {}\n", event);
    if data.is_empty() {
        frame.push_str("data: \n");
    }
    for line in data.lines() {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

/// An unnamed `data:` frame, as used by OpenAI streaming
pub fn format_data(data: &str) -> String {
    format!("data: {}\n\n", data)
}
