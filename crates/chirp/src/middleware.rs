//! Request-decoding middleware.
//!
//! [`DecodeLayer`] decodes every request it sees into a fresh value of `T`
//! and stores the result in the request extensions, where handlers retrieve
//! it with [`request_from_extensions`]. Failures can be logged, handed to a
//! callback, or answered directly with an interrupt status.

use crate::body::Body;
use crate::config::DecodeConfig;
use crate::descriptor::Decode;
use crate::error::ParseError;
use crate::params::PathParams;
use crate::pipeline::Decoder;
use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{Extensions, HeaderValue, Request, Response, StatusCode};
use std::fmt;
use std::sync::Arc;

/// Callback invoked when decoding fails.
///
/// Returning a response answers the request with it; returning `None`
/// defers to the layer's interrupt status, if any.
pub type ErrorHook =
    dyn Fn(&ParseError, &Request<Body>) -> Option<Response<String>> + Send + Sync + 'static;

/// A decoded request value stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T>(pub T);

/// Outcome of running a request through a [`DecodeLayer`].
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next handler.
    Continue(Request<Body>),
    /// Answer the request without calling the next handler.
    Respond(Response<String>),
}

/// Middleware decoding requests into `T`.
///
/// # Example
///
/// ```rust
/// use chirp::{request_from_extensions, Body, Decode, DecodeLayer, Flow, Params};
/// use http::StatusCode;
///
/// #[derive(Debug, Clone, Default, Decode)]
/// struct Lookup {
///     #[chirp(path = "id")]
///     id: u64,
/// }
///
/// let layer = DecodeLayer::<Lookup>::new().with_interrupt(StatusCode::BAD_REQUEST);
///
/// let request = http::Request::builder().uri("/items/7").body(Body::empty()).unwrap();
/// let params: Params = [("id", "7")].into_iter().collect();
///
/// match layer.process(request, &params) {
///     Flow::Continue(request) => {
///         let lookup = request_from_extensions::<Lookup>(request.extensions()).unwrap();
///         assert_eq!(lookup.id, 7);
///     }
///     Flow::Respond(_) => unreachable!(),
/// }
///
/// let request = http::Request::builder().uri("/items/x").body(Body::empty()).unwrap();
/// let params: Params = [("id", "x")].into_iter().collect();
///
/// match layer.process(request, &params) {
///     Flow::Respond(response) => assert_eq!(response.status(), StatusCode::BAD_REQUEST),
///     Flow::Continue(_) => unreachable!(),
/// }
/// ```
pub struct DecodeLayer<T: 'static> {
    decoder: Decoder<T>,
    interrupt: Option<StatusCode>,
    on_error: Option<Arc<ErrorHook>>,
    log_errors: bool,
}

impl<T> DecodeLayer<T>
where
    T: Decode + Default + Clone + Send + Sync,
{
    /// Creates a layer that logs failures and always continues.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(DecodeConfig::default())
    }

    /// Creates a layer from a configuration.
    #[must_use]
    pub fn from_config(config: DecodeConfig) -> Self {
        if let Err(err) = config.validate() {
            tracing::warn!(error = %err, "invalid decode configuration");
        }
        let interrupt = config.interrupt();
        let log_errors = config.log_errors;
        Self {
            decoder: Decoder::with_config(config),
            interrupt,
            on_error: None,
            log_errors,
        }
    }

    /// Answers failed requests with `status` and the error text.
    #[must_use]
    pub fn with_interrupt(mut self, status: StatusCode) -> Self {
        self.interrupt = Some(status);
        self
    }

    /// Installs a failure callback.
    #[must_use]
    pub fn with_on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ParseError, &Request<Body>) -> Option<Response<String>> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Enables or disables failure logging.
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }

    /// Returns the decoder used by this layer.
    #[must_use]
    pub fn decoder(&self) -> &Decoder<T> {
        &self.decoder
    }

    /// Decodes `request` and decides whether it continues.
    ///
    /// The decoded value is stored in the request extensions even when
    /// decoding fails, holding whatever was populated before the failure.
    pub fn process(&self, mut request: Request<Body>, params: &dyn PathParams) -> Flow {
        let mut value = T::default();
        let result = self.decoder.decode(&mut request, params, &mut value);
        request.extensions_mut().insert(Decoded(value));

        match result {
            Ok(()) => Flow::Continue(request),
            Err(err) => self.handle_error(&err, request),
        }
    }

    /// Runs `next` unless the layer answers the request itself.
    pub fn call<F>(&self, request: Request<Body>, params: &dyn PathParams, next: F) -> Response<String>
    where
        F: FnOnce(Request<Body>) -> Response<String>,
    {
        match self.process(request, params) {
            Flow::Continue(request) => next(request),
            Flow::Respond(response) => response,
        }
    }

    fn handle_error(&self, err: &ParseError, request: Request<Body>) -> Flow {
        if self.log_errors {
            tracing::warn!(
                channel = %err.channel(),
                tag = err.tag(),
                source = err.source_text(),
                error = %err,
                "request parsing error"
            );
        }

        if let Some(hook) = &self.on_error {
            if let Some(response) = hook(err, &request) {
                return Flow::Respond(response);
            }
        }

        match self.interrupt {
            Some(status) => Flow::Respond(error_response(status, err)),
            None => Flow::Continue(request),
        }
    }
}

impl<T> Default for DecodeLayer<T>
where
    T: Decode + Default + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Clone for DecodeLayer<T> {
    fn clone(&self) -> Self {
        Self {
            decoder: self.decoder.clone(),
            interrupt: self.interrupt,
            on_error: self.on_error.clone(),
            log_errors: self.log_errors,
        }
    }
}

impl<T: 'static> fmt::Debug for DecodeLayer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeLayer")
            .field("decoder", &self.decoder)
            .field("interrupt", &self.interrupt)
            .field("on_error", &self.on_error.is_some())
            .field("log_errors", &self.log_errors)
            .finish()
    }
}

/// Builds a plain-text error response whose body is the error line.
fn error_response(status: StatusCode, err: &ParseError) -> Response<String> {
    let mut response = Response::new(format!("{err}\n"));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// Returns the value a [`DecodeLayer`] stored for this request.
#[must_use]
pub fn request_from_extensions<T>(extensions: &Extensions) -> Option<&T>
where
    T: Clone + Send + Sync + 'static,
{
    extensions.get::<Decoded<T>>().map(|decoded| &decoded.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Params;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default, crate::Decode)]
    struct Data {
        #[chirp(path = "id")]
        id: u64,
        #[chirp(body = "name")]
        name: String,
        #[chirp(query = "part")]
        part: String,
    }

    fn request(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn params(id: &str) -> Params {
        [("id", id)].into_iter().collect()
    }

    #[test]
    fn test_continue_stores_value() {
        let layer = DecodeLayer::<Data>::new();

        let flow = layer.process(request("/u/3?part=last", r#"{"name":"John"}"#), &params("3"));

        let Flow::Continue(request) = flow else {
            panic!("expected continue");
        };
        let data = request_from_extensions::<Data>(request.extensions()).unwrap();
        assert_eq!(data.id, 3);
        assert_eq!(data.name, "John");
        assert_eq!(data.part, "last");
    }

    #[test]
    fn test_failure_without_interrupt_continues_with_partial_value() {
        let layer = DecodeLayer::<Data>::new().with_logging(false);

        let flow = layer.process(request("/u/x?part=last", r#"{"name":"John"}"#), &params("x"));

        let Flow::Continue(request) = flow else {
            panic!("expected continue");
        };
        let data = request_from_extensions::<Data>(request.extensions()).unwrap();
        assert_eq!(data.name, "John");
        assert_eq!(data.id, 0);
    }

    #[test]
    fn test_interrupt_response() {
        let layer = DecodeLayer::<Data>::new()
            .with_logging(false)
            .with_interrupt(StatusCode::UNPROCESSABLE_ENTITY);

        let Flow::Respond(response) = layer.process(request("/u/x", "{}"), &params("x")) else {
            panic!("expected response");
        };

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.body().starts_with("path[id](x): "));
        assert!(response.body().ends_with('\n'));
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    #[test]
    fn test_hook_response_wins_over_interrupt() {
        let layer = DecodeLayer::<Data>::new()
            .with_logging(false)
            .with_interrupt(StatusCode::BAD_REQUEST)
            .with_on_error(|err, _| {
                let mut response = Response::new(err.error_code().to_string());
                *response.status_mut() = StatusCode::IM_A_TEAPOT;
                Some(response)
            });

        let Flow::Respond(response) = layer.process(request("/u/x", "{}"), &params("x")) else {
            panic!("expected response");
        };

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.body(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_hook_declining_falls_back_to_interrupt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let layer = DecodeLayer::<Data>::new()
            .with_logging(false)
            .with_interrupt(StatusCode::BAD_REQUEST)
            .with_on_error(move |err, request| {
                seen.fetch_add(1, Ordering::SeqCst);
                assert_eq!(err.tag(), "id");
                assert!(request_from_extensions::<Data>(request.extensions()).is_some());
                None
            });

        let response = layer.call(request("/u/x", "{}"), &params("x"), |_| {
            panic!("request should be interrupted")
        });

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_config() {
        let config = DecodeConfig::builder()
            .interrupt_status(400)
            .log_errors(false)
            .max_body_bytes(2)
            .build()
            .unwrap();
        let layer = DecodeLayer::<Data>::from_config(config);

        let Flow::Respond(response) =
            layer.process(request("/u/1", r#"{"name":"John"}"#), &params("1"))
        else {
            panic!("expected response");
        };

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.body().starts_with("body[*]"));
        assert_eq!(layer.decoder().config().max_body_bytes, 2);
    }

    #[test]
    fn test_from_config_ignores_success_interrupt_status() {
        let config: DecodeConfig =
            serde_json::from_str(r#"{"interrupt_status": 200, "log_errors": false}"#).unwrap();
        let layer = DecodeLayer::<Data>::from_config(config);

        let flow = layer.process(request("/u/x", "{}"), &params("x"));

        assert!(matches!(flow, Flow::Continue(_)));
    }

    #[test]
    fn test_missing_extension() {
        let extensions = Extensions::new();
        assert!(request_from_extensions::<Data>(&extensions).is_none());
    }
}
