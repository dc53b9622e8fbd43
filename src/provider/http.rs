use super::ProviderError;

use hyper::body::Bytes;
use hyper::client::Client;
use hyper::header::{ACCEPT, USER_AGENT};
use hyper::http::uri::Uri;
use hyper::{Body, Request, StatusCode};
use hyper_tls::HttpsConnector;
use std::future::Future;
use std::time::Duration;

/// Several providers reject the default identities of HTTP client libraries
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:100.0) Gecko/20100101 Firefox/100.0";

/// Append `path_and_query` to the path of `base_uri`, dropping any query the base had
pub fn compose_uri(base_uri: &Uri, path_and_query: &str) -> Result<Uri, hyper::http::Error> {
    let base_path = base_uri.path();
    let separator = if base_path.ends_with('/') { "" } else { "/" };
    let new_path = [base_path, separator, path_and_query].concat();
    let mut builder = Uri::builder();
    if let Some(scheme) = base_uri.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = base_uri.authority() {
        builder = builder.authority(authority.clone());
    }
    builder.path_and_query(new_path).build()
}

/// Drive `future` to completion on a throwaway current-thread runtime.
///
/// The runtime is shut down without waiting for its blocking pool: a DNS lookup
/// stuck in `getaddrinfo` must not hold the caller once `future` has returned.
fn run<F: Future>(future: F) -> Result<F::Output, ProviderError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ProviderError::Runtime)?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

/// Blocking GET bounded by `timeout`.
///
/// Runtime, client and connection live only for the duration of the call.
pub fn get(uri: Uri, timeout: Duration) -> Result<(StatusCode, Bytes), ProviderError> {
    run(async {
        let https = HttpsConnector::new();
        let client = Client::builder().build::<_, Body>(https);
        let request = Request::builder()
            .uri(uri.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "application/json")
            .body(Body::empty())?;
        log::trace!("GET {uri}");
        let response = tokio::time::timeout(timeout, async {
            let response = client.request(request).await?;
            let status = response.status();
            let body = hyper::body::to_bytes(response.into_body()).await?;
            Ok::<_, hyper::Error>((status, body))
        })
        .await
        .map_err(|_| ProviderError::Timeout(timeout))??;
        Ok::<_, ProviderError>(response)
    })?
}


#[cfg(test)]
mod tests {
    use super::test_server::*;
    use super::*;

    #[test]
    fn compose() {
        let base: Uri = "http://ip-api.com/json/".parse().unwrap();
        assert_eq!(
            compose_uri(&base, "192.0.2.1?fields=status").unwrap(),
            "http://ip-api.com/json/192.0.2.1?fields=status"
        );
        let no_slash: Uri = "https://api.ip.sb/geoip?x=1".parse().unwrap();
        assert_eq!(
            compose_uri(&no_slash, "2001:db8::1").unwrap(),
            "https://api.ip.sb/geoip/2001:db8::1"
        );
    }

    #[test]
    fn get_sends_browser_identity() {
        let (base, server) = serve_once("/json/", response("200 OK", r#"{"ok":true}"#));
        let uri = compose_uri(&base, "192.0.2.1").unwrap();
        let (status, body) = get(uri, Duration::from_secs(5)).unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), br#"{"ok":true}"#);

        let request = server.join().unwrap();
        assert!(
            request.starts_with("GET /json/192.0.2.1 HTTP/1.1"),
            "{request}"
        );
        let user_agent = format!("user-agent: {BROWSER_USER_AGENT}").to_ascii_lowercase();
        assert!(request.to_ascii_lowercase().contains(&user_agent));
    }

    #[test]
    fn silent_server_times_out() {
        let uri = serve_silently("/", Duration::from_secs(3));
        let error = get(uri, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(error, ProviderError::Timeout(_)), "{error}");
        assert!(error.is_retryable());
    }

    #[test]
    fn stuck_blocking_task_does_not_delay_return() {
        let started = std::time::Instant::now();
        let output = run(async {
            let stuck =
                tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(5)));
            tokio::time::timeout(Duration::from_millis(100), stuck).await
        })
        .unwrap();
        assert!(output.is_err());
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    }

    #[test]
    fn refused_connection_is_network_error() {
        let error = get(refused("/"), Duration::from_secs(5)).unwrap_err();
        assert!(matches!(error, ProviderError::Network(_)), "{error}");
        assert!(error.is_retryable());
    }
}
