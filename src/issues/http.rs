//! Shared HTTP plumbing for the tracker clients

use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use ureq::http::{HeaderMap, Response};
use ureq::Body;

use super::{IssueError, IssueResult};

pub(super) const USER_AGENT: &str = concat!("repominer/", env!("CARGO_PKG_VERSION"));

/// Page size requested from paginated endpoints.
pub(super) const PER_PAGE: usize = 100;

pub(super) fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // status codes are mapped to IssueError below
        .timeout_global(Some(std::time::Duration::from_secs(60)))
        .build()
        .new_agent()
}

fn header(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

/// Decode a successful response, or map the failure status to an error.
pub(super) fn read_json<T: DeserializeOwned>(
    response: Response<Body>,
    host: &str,
    url: &str,
) -> IssueResult<T> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return response
            .into_body()
            .read_json::<T>()
            .map_err(|e| IssueError::Parse(e.to_string()));
    }

    let remaining = header(
        response.headers(),
        &["x-ratelimit-remaining", "ratelimit-remaining"],
    );
    let reset_at = header(response.headers(), &["x-ratelimit-reset", "ratelimit-reset"])
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

    match status {
        429 => Err(IssueError::RateLimited { reset_at }),
        403 if remaining.as_deref() == Some("0") => Err(IssueError::RateLimited { reset_at }),
        401 => Err(IssueError::Unauthorized {
            host: host.to_string(),
        }),
        404 => Err(IssueError::NotFound(url.to_string())),
        _ => {
            let message = response.into_body().read_to_string().unwrap_or_default();
            Err(IssueError::Api { status, message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> Response<Body> {
        let mut builder = Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder
            .body(Body::builder().data(body.to_string()))
            .expect("valid response")
    }

    #[test]
    fn test_success_decodes_body() {
        let resp = response(200, &[], r#"[{"name": "bug"}]"#);
        let value: serde_json::Value = read_json(resp, "github.com", "/labels").unwrap();
        assert_eq!(value[0]["name"], "bug");
    }

    #[test]
    fn test_exhausted_quota_is_rate_limited() {
        let resp = response(
            403,
            &[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1700000000")],
            "",
        );
        let err = read_json::<serde_json::Value>(resp, "github.com", "/labels").unwrap_err();
        match err {
            IssueError::RateLimited { reset_at } => {
                assert_eq!(reset_at.map(|t| t.timestamp()), Some(1_700_000_000))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_forbidden_with_quota_left_is_api_error() {
        let resp = response(403, &[("x-ratelimit-remaining", "12")], "forbidden");
        let err = read_json::<serde_json::Value>(resp, "github.com", "/labels").unwrap_err();
        assert!(matches!(err, IssueError::Api { status: 403, .. }));
    }

    #[test]
    fn test_status_mapping() {
        let err = read_json::<serde_json::Value>(response(429, &[], ""), "gitlab.com", "/x")
            .unwrap_err();
        assert!(matches!(err, IssueError::RateLimited { reset_at: None }));

        let err = read_json::<serde_json::Value>(response(401, &[], ""), "gitlab.com", "/x")
            .unwrap_err();
        assert!(matches!(err, IssueError::Unauthorized { .. }));

        let err = read_json::<serde_json::Value>(response(404, &[], ""), "gitlab.com", "/x")
            .unwrap_err();
        assert!(matches!(err, IssueError::NotFound(_)));
    }
}
