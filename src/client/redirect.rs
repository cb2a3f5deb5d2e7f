// File: ./src/client/redirect.rs
// Published calendar links often bounce through a redirect or two
// (http -> https, share link -> storage URL) before the feed itself.
use http::{Request, Response, Uri, header};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Wraps a client so 3xx answers with a usable Location are re-requested,
/// at most `max_hops` times.
#[derive(Clone, Copy, Debug)]
pub struct RedirectLayer {
    max_hops: usize,
}

impl RedirectLayer {
    pub fn new(max_hops: usize) -> Self {
        Self { max_hops }
    }
}

impl<S> Layer<S> for RedirectLayer {
    type Service = Redirecting<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Redirecting {
            inner,
            max_hops: self.max_hops,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Redirecting<S> {
    inner: S,
    max_hops: usize,
}

/// Resolve a Location header against the request it answered. Relative
/// locations inherit scheme and authority.
pub fn resolve_location(base: &Uri, location: &str) -> Option<Uri> {
    let parts = location.parse::<Uri>().ok()?.into_parts();

    let scheme = match parts.scheme {
        Some(scheme) => scheme,
        None => base.scheme()?.clone(),
    };
    let authority = match parts.authority {
        Some(authority) => authority,
        None => base.authority()?.clone(),
    };

    let builder = Uri::builder().scheme(scheme).authority(authority);
    match parts.path_and_query {
        Some(pq) => builder.path_and_query(pq),
        None => builder.path_and_query("/"),
    }
    .build()
    .ok()
}

fn next_hop<B>(response: &Response<B>, current: &Uri) -> Option<Uri> {
    if !response.status().is_redirection() {
        return None;
    }
    let location = response.headers().get(header::LOCATION)?.to_str().ok()?;
    resolve_location(current, location)
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Redirecting<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    ReqBody: Clone + Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut inner = self.inner.clone();
        let max_hops = self.max_hops;

        Box::pin(async move {
            let mut req = req;
            let mut hops = 0;
            loop {
                // The body is re-sent as-is on every hop.
                let retry = req.clone();
                let response = inner.call(req).await?;

                let Some(uri) = next_hop(&response, retry.uri()) else {
                    return Ok(response);
                };
                if hops == max_hops {
                    log::warn!(
                        "Giving up after {} redirects, last Location was {}",
                        max_hops,
                        uri
                    );
                    return Ok(response);
                }

                log::debug!("Following redirect {} -> {}", retry.uri(), uri);
                req = retry;
                *req.uri_mut() = uri;
                hops += 1;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_location_inherits_origin() {
        let base: Uri = "https://cal.example.com/feeds/a.ics".parse().unwrap();
        let next = resolve_location(&base, "/feeds/b.ics?token=1").unwrap();
        assert_eq!(next.to_string(), "https://cal.example.com/feeds/b.ics?token=1");
    }

    #[test]
    fn test_absolute_location_wins() {
        let base: Uri = "http://cal.example.com/a.ics".parse().unwrap();
        let next = resolve_location(&base, "https://cdn.example.net/a.ics").unwrap();
        assert_eq!(next.to_string(), "https://cdn.example.net/a.ics");
    }

    #[test]
    fn test_only_redirect_statuses_hop() {
        let base: Uri = "http://cal.example.com/a.ics".parse().unwrap();
        let ok = Response::builder()
            .status(200)
            .header(header::LOCATION, "/elsewhere.ics")
            .body(())
            .unwrap();
        assert_eq!(next_hop(&ok, &base), None);

        let moved = Response::builder()
            .status(302)
            .header(header::LOCATION, "/elsewhere.ics")
            .body(())
            .unwrap();
        assert_eq!(
            next_hop(&moved, &base).map(|u| u.to_string()),
            Some("http://cal.example.com/elsewhere.ics".to_string())
        );
    }
}
