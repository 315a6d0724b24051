use std::time::{Duration, SystemTime};

use crate::error::{Error, ModelResult};
use error_stack::{ResultExt, report};
use reqwest::{Response, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;
use tracing::error;

/// Parses a `Retry-After` header value.
///
/// Both forms from RFC 9110 are accepted: delta-seconds (`"30"`) and an
/// HTTP date. A date in the past yields a zero duration.
pub fn parse_retry_after(value: &str, now: SystemTime) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let date = httpdate::parse_http_date(value).ok()?;
    Some(date.duration_since(now).unwrap_or(Duration::ZERO))
}

/// Extracts the retry-after hint from a response, if any.
pub fn retry_after_from_response(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_retry_after(value, SystemTime::now()))
}

/// Decodes a JSON response body.
///
/// `429 Too Many Requests` becomes [`Error::RatelimitExceeded`] carrying the
/// `Retry-After` hint; any other status >= 400 becomes
/// [`Error::ReqwestError`] with the body as message.
pub async fn handle_reqwest_response<T: DeserializeOwned>(response: Response) -> ModelResult<T> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = retry_after_from_response(&response);
        return Err(report!(Error::RatelimitExceeded(retry_after))
            .attach_printable(format!("HTTP {status} from {}", response.url())));
    }

    if status.is_client_error() || status.is_server_error() {
        let error_body = response.text().await.change_context(Error::ReqwestError(
            "Failed to get text from response".to_string(),
        ))?;

        error!(%status, "Error Body: {}", &error_body);

        return Err(report!(Error::ReqwestError(error_body))
            .attach_printable(format!("HTTP status {status}")));
    }

    response
        .json()
        .await
        .change_context(Error::SerdeDeserialize(
            "Failed to deserialize JSON".to_string(),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after_seconds() {
        let now = SystemTime::now();
        assert_eq!(parse_retry_after("30", now), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after(" 0 ", now), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = httpdate::parse_http_date("Sun, 06 Nov 1994 08:49:07 GMT").unwrap();
        assert_eq!(
            parse_retry_after("Sun, 06 Nov 1994 08:49:37 GMT", now),
            Some(Duration::from_secs(30))
        );
        // Dates already passed mean "retry now".
        assert_eq!(
            parse_retry_after("Sun, 06 Nov 1994 08:48:00 GMT", now),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_parse_retry_after_garbage() {
        let now = SystemTime::now();
        assert_eq!(parse_retry_after("soon", now), None);
        assert_eq!(parse_retry_after("", now), None);
        assert_eq!(parse_retry_after("-5", now), None);
    }
}
