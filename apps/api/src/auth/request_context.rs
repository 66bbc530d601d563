use axum::http::HeaderMap;
use keyshare_application::LoginContext;

/// Collects the caller's address and user agent for the login audit.
pub fn extract_request_context(headers: &HeaderMap) -> LoginContext {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    let user_agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    LoginContext {
        ip_address,
        user_agent,
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::extract_request_context;

    #[test]
    fn first_forwarded_address_is_used() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        headers.insert("user-agent", HeaderValue::from_static("test-agent"));

        let context = extract_request_context(&headers);

        assert_eq!(context.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(context.user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn missing_headers_leave_context_empty() {
        let context = extract_request_context(&HeaderMap::new());

        assert_eq!(context.ip_address, None);
        assert_eq!(context.user_agent, None);
    }
}
