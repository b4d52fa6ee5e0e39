// Beerstock
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! HTTP plumbing for the REST layer.
//!
//! Each API lives in its own `<entity>_<method>.rs` file.  The `tests` module of that file defines
//! a `route` function returning the method and path of the API, and every test in the module goes
//! through it so that none of them can accidentally exercise a different API.

use async_trait::async_trait;
use axum::Json;
use axum::body::HttpBody;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Errors reported to API clients.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// The server failed in a way the client cannot fix.
    #[error("{0}")]
    InternalError(String),

    /// The request cannot be fulfilled as given.
    #[error("{0}")]
    InvalidRequest(String),

    /// The request refers to something that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request carries a body but the API takes none.
    #[error("Content should be empty")]
    PayloadNotEmpty,
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = match self {
            RestError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => StatusCode::NOT_FOUND,
            RestError::PayloadNotEmpty => StatusCode::PAYLOAD_TOO_LARGE,
        };
        (status, Json(ErrorResponse { message: self.to_string() })).into_response()
    }
}

/// JSON body of every error response.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorResponse {
    /// Description of what went wrong.
    pub(crate) message: String,
}

/// Extractor for APIs that take no body.  Requests that carry one are rejected.
pub struct EmptyBody;

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        match req.into_body().is_end_stream() {
            true => Ok(EmptyBody),
            false => Err(RestError::PayloadNotEmpty),
        }
    }
}

/// Helpers to send requests to a `Router` and check its responses in tests.
#[cfg(feature = "testutils")]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
    use http::{Method, request};
    use serde::de::DeserializeOwned;
    use tower::util::ServiceExt;

    /// Largest response body that the checks read.
    const BODY_LIMIT: usize = 64 * 1024;

    /// A request that is sent to an app exactly once.
    #[must_use]
    pub struct OneShotBuilder {
        /// App that serves the request.
        app: Router,

        /// Request under construction.
        request: request::Builder,
    }

    impl OneShotBuilder {
        /// Prepares a request for the `method` and `uri` pair, to be served by `app`.
        pub fn new<U: AsRef<str>>(app: Router, (method, uri): (Method, U)) -> Self {
            Self { app, request: http::Request::builder().method(method).uri(uri.as_ref()) }
        }

        /// Adds the header `name` with `value` to the request.
        pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
        where
            HeaderName: TryFrom<K>,
            <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
            HeaderValue: TryFrom<V>,
            <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
        {
            self.request = self.request.header(name, value);
            self
        }

        /// Sends the request with `body`, labeled as `content_type` if given.
        async fn send(self, content_type: Option<&str>, body: Body) -> ResponseChecker {
            let mut request = self.request;
            if let Some(content_type) = content_type {
                request = request.header(CONTENT_TYPE, content_type);
            }
            let response = self.app.oneshot(request.body(body).unwrap()).await.unwrap();
            ResponseChecker { response, status: StatusCode::OK }
        }

        /// Sends the request without a body.
        pub async fn send_empty(self) -> ResponseChecker {
            self.send(None, Body::empty()).await
        }

        /// Sends the request with `text` as a plain text body.
        pub async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
            self.send(Some(mime::TEXT_PLAIN.as_ref()), Body::from(text.into())).await
        }

        /// Sends the request with `value` serialized as a JSON body.
        pub async fn send_json<T: Serialize>(self, value: T) -> ResponseChecker {
            let body = serde_json::to_vec(&value).unwrap();
            self.send(Some(mime::APPLICATION_JSON.as_ref()), Body::from(body)).await
        }
    }

    /// Expectations on the response to a request sent by `OneShotBuilder`.
    #[must_use]
    pub struct ResponseChecker {
        /// Response returned by the app.
        response: Response,

        /// Status the response must have.  Defaults to `200 OK`.
        status: StatusCode,
    }

    impl ResponseChecker {
        /// Expects the response to have `status`.
        pub fn expect_status(mut self, status: StatusCode) -> Self {
            self.status = status;
            self
        }

        /// Checks the status of the response and returns its body as text.
        async fn into_body_text(self) -> String {
            assert_eq!(self.status, self.response.status());
            let bytes = axum::body::to_bytes(self.response.into_body(), BODY_LIMIT).await.unwrap();
            String::from_utf8(bytes.to_vec()).unwrap()
        }

        /// Expects the response to have no body.
        pub async fn expect_empty(self) {
            let body = self.into_body_text().await;
            assert!(body.is_empty(), "Expected an empty body but got {}", body);
        }

        /// Expects the body to be an `ErrorResponse` whose message matches `exp_re`.
        pub async fn expect_error(self, exp_re: &str) {
            let body = self.into_body_text().await;
            let error: ErrorResponse = serde_json::from_str(&body)
                .unwrap_or_else(|e| panic!("Body is not an ErrorResponse ({}): {}", e, body));
            assert_matches(&error.message, exp_re);
        }

        /// Expects the body to be the JSON representation of a `T` and returns it.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            let body = self.into_body_text().await;
            serde_json::from_str(&body)
                .unwrap_or_else(|e| panic!("Body is not the expected JSON ({}): {}", e, body))
        }

        /// Expects the body to be plain text that matches `exp_re`.
        ///
        /// Errors raised by axum extractors are reported this way instead of as `ErrorResponse`s.
        pub async fn expect_text(self, exp_re: &str) {
            assert!(!exp_re.is_empty(), "Check empty bodies with expect_empty");

            let body = self.into_body_text().await;
            assert!(
                serde_json::from_str::<ErrorResponse>(&body).is_err(),
                "Check ErrorResponse bodies with expect_error"
            );
            assert_matches(&body, exp_re);
        }
    }

    /// Asserts that `text` matches the regular expression `exp_re`.
    fn assert_matches(text: &str, exp_re: &str) {
        let re = regex::Regex::new(exp_re).unwrap();
        assert!(re.is_match(text), "'{}' does not match '{}'", text, exp_re);
    }

    /// Generates `test_payload_must_be_json`, which checks that the API at `$route` served by
    /// `$app` rejects bodies that are not JSON.
    #[macro_export]
    macro_rules! test_payload_must_be_json {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_json() {
                use axum::http::{StatusCode, header};
                use $crate::rest::testutils::OneShotBuilder;

                OneShotBuilder::new($app, $route)
                    .send_text("this is not json")
                    .await
                    .expect_status(StatusCode::UNSUPPORTED_MEDIA_TYPE)
                    .expect_text("Content-Type")
                    .await;

                OneShotBuilder::new($app, $route)
                    .with_header(header::CONTENT_TYPE, "application/json")
                    .send_text("this is not json")
                    .await
                    .expect_status(StatusCode::BAD_REQUEST)
                    .expect_text("expected ident")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_json;

    /// Generates `test_payload_must_be_empty`, which checks that the API at `$route` served by
    /// `$app` rejects requests with a body.
    #[macro_export]
    macro_rules! test_payload_must_be_empty {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_empty() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("should not be here")
                    .await
                    .expect_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE)
                    .expect_error("should be empty")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_empty;
}
