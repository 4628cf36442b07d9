//! Cookie parsing middleware layer for Axum.

use crate::extractor::RequestCookies;
use axum::body::Body;
use axum::http::Request;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer that parses the credential cookies once per request.
///
/// Handlers read the result through the [`RequestCookies`] extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerLayer;

impl CallerLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for CallerLayer {
    type Service = CallerMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CallerMiddleware { inner }
    }
}

/// Middleware service inserting [`RequestCookies`] into the request extensions.
#[derive(Debug, Clone)]
pub struct CallerMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for CallerMiddleware<S>
where
    S: Service<Request<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let cookies = RequestCookies::from_headers(req.headers());
        tracing::trace!(
            path = %req.uri().path(),
            has_token = cookies.caller.token().is_some(),
            has_session = cookies.caller.session().is_some(),
            "Parsed request cookies"
        );
        req.extensions_mut().insert(cookies);
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use std::convert::Infallible;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_inserts_cookies() {
        let service = CallerLayer::new().layer(tower::service_fn(|req: Request<Body>| async move {
            let cookies = req.extensions().get::<RequestCookies>().cloned();
            Ok::<_, Infallible>(cookies)
        }));

        let req = Request::builder()
            .header(COOKIE, "webhook_token=abc")
            .body(Body::empty())
            .unwrap();
        let cookies = service.oneshot(req).await.unwrap().unwrap();
        assert_eq!(cookies.caller.token(), Some("abc"));
        assert_eq!(cookies.caller.session(), None);
    }
}
