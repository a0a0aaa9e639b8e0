//! Call observability for the inbound gRPC server.
//!
//! A tower layer around the whole tonic router. It logs the method and
//! incoming metadata, times the call, and logs the `grpc-status` the
//! handler produced. The inner result is handed back untouched.
//!
//! Trailers-only responses carry `grpc-status` in the headers and finish
//! there. Everything else finishes when the response body yields its
//! trailers, so streaming calls are timed to their last frame. A body
//! dropped before its end is reported as `Cancelled`.
//!
//! Metric labels use the request path only for well-formed
//! `/<service>/<method>` calls the router actually handled. Anything else
//! is folded into `unknown` so peers cannot mint new series.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use http::HeaderMap;
use http_body::{Body, Frame, SizeHint};
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Status};
use tower::{Layer, Service};

use crate::authority::AUTHORIZATION_METADATA;
use crate::observability::metrics;

const REDACTED: &str = "[redacted]";

/// Metric label for calls that did not reach a registered method.
pub const UNKNOWN_METHOD: &str = "unknown";

#[derive(Debug, Clone, Copy, Default)]
pub struct CallLogLayer;

impl<S> Layer<S> for CallLogLayer {
    type Service = CallLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CallLog { inner }
    }
}

#[derive(Debug, Clone)]
pub struct CallLog<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for CallLog<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ResBody: Send + 'static,
{
    type Response = http::Response<ObservedBody<ResBody>>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: http::Request<ReqBody>) -> Self::Future {
        let method = request.uri().path().to_owned();
        tracing::info!(
            method = %method,
            metadata = ?redacted_metadata(request.headers()),
            "gRPC call started"
        );

        let record = CallRecord {
            method,
            start: Instant::now(),
        };
        let call = self.inner.call(request);

        Box::pin(async move {
            match call.await {
                Ok(response) => {
                    let mut record = Some(record);
                    if let Some((code, message)) = status_in(response.headers()) {
                        if let Some(record) = record.take() {
                            record.finish(code, message.as_deref());
                        }
                    }
                    Ok(response.map(|body| ObservedBody {
                        inner: Box::pin(body),
                        record,
                    }))
                }
                Err(e) => {
                    record.failed(&e);
                    Err(e)
                }
            }
        })
    }
}

/// One in-flight call, finished exactly once.
#[derive(Debug)]
struct CallRecord {
    method: String,
    start: Instant,
}

impl CallRecord {
    fn finish(self, code: Code, message: Option<&str>) {
        let elapsed = self.start.elapsed();
        if code == Code::Ok {
            tracing::info!(method = %self.method, code = ?code, elapsed = ?elapsed, "gRPC call finished");
        } else {
            tracing::warn!(
                method = %self.method,
                code = ?code,
                message = message.unwrap_or_default(),
                elapsed = ?elapsed,
                "gRPC call finished"
            );
        }
        metrics::record_rpc_call(method_label(&self.method, code), code, elapsed);
    }

    fn failed(self, error: &dyn fmt::Display) {
        let elapsed = self.start.elapsed();
        tracing::error!(method = %self.method, error = %error, elapsed = ?elapsed, "gRPC call errored");
        metrics::record_rpc_call(
            method_label(&self.method, Code::Internal),
            Code::Internal,
            elapsed,
        );
    }
}

/// Response body that reports the call outcome once its trailers arrive.
pub struct ObservedBody<B> {
    inner: Pin<Box<B>>,
    record: Option<CallRecord>,
}

impl<B> Body for ObservedBody<B>
where
    B: Body,
    B::Error: fmt::Display,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = this.inner.as_mut().poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(trailers) = frame.trailers_ref() {
                    if let Some(record) = this.record.take() {
                        let (code, message) = status_in(trailers).unwrap_or((Code::Ok, None));
                        record.finish(code, message.as_deref());
                    }
                }
            }
            Poll::Ready(Some(Err(e))) => {
                if let Some(record) = this.record.take() {
                    record.failed(e);
                }
            }
            Poll::Ready(None) => {
                if let Some(record) = this.record.take() {
                    record.finish(Code::Ok, None);
                }
            }
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for ObservedBody<B> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            record.finish(Code::Cancelled, Some("response body dropped before completion"));
        }
    }
}

impl<B> fmt::Debug for ObservedBody<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedBody")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// Incoming metadata with the credential blanked out.
fn redacted_metadata(headers: &HeaderMap) -> MetadataMap {
    let mut metadata = MetadataMap::from_headers(headers.clone());
    if metadata.contains_key(AUTHORIZATION_METADATA) {
        metadata.insert(AUTHORIZATION_METADATA, MetadataValue::from_static(REDACTED));
    }
    metadata
}

fn status_in(headers: &HeaderMap) -> Option<(Code, Option<String>)> {
    Status::from_header_map(headers).map(|status| {
        let message = Some(status.message().to_owned()).filter(|m| !m.is_empty());
        (status.code(), message)
    })
}

fn method_label(path: &str, code: Code) -> &str {
    if code == Code::Unimplemented || !is_rpc_path(path) {
        UNKNOWN_METHOD
    } else {
        path
    }
}

fn is_rpc_path(path: &str) -> bool {
    path.strip_prefix('/')
        .and_then(|rest| rest.split_once('/'))
        .is_some_and(|(service, method)| {
            !service.is_empty() && !method.is_empty() && !method.contains('/')
        })
}
