//! Strict parsers for token endpoint response bodies.
//!
//! Each parser validates the wire format once and either yields a
//! [`TokenGrant`] or rejects the body. Nothing is defaulted silently except
//! the token type, which endpoints routinely omit.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::token::TokenGrant;

/// Builds a matcher for `<field>value</field>`, tolerating a namespace prefix
/// and attributes on the opening tag.
#[allow(clippy::expect_used)] // patterns are static and covered by tests
fn element(field: &str) -> Regex {
    let pattern = format!(
        r"<(?:[A-Za-z_][\w.\-]*:)?{field}(?:\s[^>]*)?>([^<]*)</(?:[A-Za-z_][\w.\-]*:)?{field}\s*>"
    );
    Regex::new(&pattern).expect("valid element pattern")
}

static ACCESS_TOKEN: LazyLock<Regex> = LazyLock::new(|| element("accessToken"));
static TOKEN_TYPE: LazyLock<Regex> = LazyLock::new(|| element("tokenType"));
static EXPIRES_IN: LazyLock<Regex> = LazyLock::new(|| element("expiresIn"));

/// Extracts the text of exactly one element.
fn single<'a>(re: &Regex, body: &'a str, field: &str) -> Result<&'a str> {
    let mut matches = re.captures_iter(body);
    let first = matches
        .next()
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::InvalidResponse(format!("missing <{field}>")))?;
    if matches.next().is_some() {
        return Err(Error::InvalidResponse(format!("duplicate <{field}>")));
    }
    Ok(first.as_str().trim())
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn positive_lifetime(raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::InvalidResponse(format!(
            "expiresIn must be a positive integer, got {raw:?}"
        ))),
        Ok(secs) => Ok(secs),
    }
}

/// Parses the Walmart Marketplace `OAuthTokenDTO` XML body.
///
/// # Errors
///
/// Returns [`Error::InvalidResponse`] when any of `accessToken`, `tokenType`
/// or `expiresIn` is missing, duplicated, empty or malformed.
pub fn parse_walmart_xml(body: &str) -> Result<TokenGrant> {
    let access_token = unescape_xml(single(&ACCESS_TOKEN, body, "accessToken")?);
    if access_token.is_empty() {
        return Err(Error::InvalidResponse("empty <accessToken>".into()));
    }

    let token_type = unescape_xml(single(&TOKEN_TYPE, body, "tokenType")?);
    if token_type.is_empty() {
        return Err(Error::InvalidResponse("empty <tokenType>".into()));
    }

    let expires_in = positive_lifetime(single(&EXPIRES_IN, body, "expiresIn")?)?;

    Ok(TokenGrant {
        access_token,
        token_type,
        expires_in,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogisticsEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<LogisticsTokenBody>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogisticsTokenBody {
    #[serde(alias = "accessToken", alias = "access_token")]
    token: String,
    #[serde(default, alias = "token_type")]
    token_type: Option<String>,
    #[serde(alias = "expires_in")]
    expires_in: u64,
}

/// Parses the automation backend's carrier token envelope:
/// `{"success": true, "data": {"token": "...", "tokenType": "Bearer", "expiresIn": 3600}}`.
///
/// # Errors
///
/// Returns [`Error::Rejected`] when `success` is false, [`Error::Json`] when
/// the envelope does not deserialize, and [`Error::InvalidResponse`] for an
/// empty token or non-positive lifetime.
pub fn parse_logistics_json(body: &str) -> Result<TokenGrant> {
    let envelope: LogisticsEnvelope = serde_json::from_str(body)?;

    if !envelope.success {
        let reason = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| "no reason given".to_string());
        return Err(Error::Rejected(reason));
    }

    let data = envelope
        .data
        .ok_or_else(|| Error::InvalidResponse("missing data".into()))?;

    if data.token.trim().is_empty() {
        return Err(Error::InvalidResponse("empty token".into()));
    }
    if data.expires_in == 0 {
        return Err(Error::InvalidResponse("expiresIn must be positive".into()));
    }

    Ok(TokenGrant {
        access_token: data.token,
        token_type: data
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Bearer".to_string()),
        expires_in: data.expires_in,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const WALMART_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<OAuthTokenDTO><accessToken>eyJraWQiOi.abc&amp;def</accessToken><tokenType>Bearer</tokenType><expiresIn>900</expiresIn></OAuthTokenDTO>"#;

    #[test]
    fn test_walmart_plain() {
        let grant = parse_walmart_xml(WALMART_BODY).unwrap();
        assert_eq!(grant.access_token, "eyJraWQiOi.abc&def");
        assert_eq!(grant.token_type, "Bearer");
        assert_eq!(grant.expires_in, 900);
    }

    #[test]
    fn test_walmart_namespaced() {
        let body = r#"<ns2:OAuthTokenDTO xmlns:ns2="com.walmart"><ns2:accessToken>tok</ns2:accessToken>
            <ns2:tokenType>Bearer</ns2:tokenType><ns2:expiresIn> 900 </ns2:expiresIn></ns2:OAuthTokenDTO>"#;
        let grant = parse_walmart_xml(body).unwrap();
        assert_eq!(grant.access_token, "tok");
        assert_eq!(grant.expires_in, 900);
    }

    #[test]
    fn test_walmart_rejects_missing_field() {
        let body = "<OAuthTokenDTO><accessToken>tok</accessToken><expiresIn>900</expiresIn></OAuthTokenDTO>";
        let err = parse_walmart_xml(body).unwrap_err();
        assert!(err.to_string().contains("tokenType"));
    }

    #[test]
    fn test_walmart_rejects_duplicate_token() {
        let body = "<a><accessToken>one</accessToken><accessToken>two</accessToken>\
                    <tokenType>Bearer</tokenType><expiresIn>900</expiresIn></a>";
        assert!(matches!(
            parse_walmart_xml(body),
            Err(Error::InvalidResponse(msg)) if msg.contains("duplicate")
        ));
    }

    #[test]
    fn test_walmart_rejects_bad_lifetime() {
        for lifetime in ["0", "-5", "soon", ""] {
            let body = format!(
                "<a><accessToken>t</accessToken><tokenType>Bearer</tokenType><expiresIn>{lifetime}</expiresIn></a>"
            );
            assert!(parse_walmart_xml(&body).is_err(), "accepted {lifetime:?}");
        }
    }

    #[test]
    fn test_walmart_rejects_error_document() {
        let body = r#"<errors><error><code>UNAUTHORIZED.GMP_GATEWAY_API</code></error></errors>"#;
        assert!(parse_walmart_xml(body).is_err());
    }

    #[test]
    fn test_logistics_success() {
        let body = r#"{"success":true,"data":{"token":"estes-123","tokenType":"Bearer","expiresIn":3600}}"#;
        let grant = parse_logistics_json(body).unwrap();
        assert_eq!(grant, TokenGrant::new("estes-123", "Bearer", 3600));
    }

    #[test]
    fn test_logistics_snake_case_and_default_type() {
        let body = r#"{"success":true,"data":{"access_token":"xpo-9","expires_in":1800}}"#;
        let grant = parse_logistics_json(body).unwrap();
        assert_eq!(grant.token_type, "Bearer");
        assert_eq!(grant.expires_in, 1800);
    }

    #[test]
    fn test_logistics_rejected() {
        let body = r#"{"success":false,"error":"invalid credentials"}"#;
        assert!(matches!(
            parse_logistics_json(body),
            Err(Error::Rejected(msg)) if msg == "invalid credentials"
        ));
    }

    #[test]
    fn test_logistics_rejects_shapes() {
        assert!(parse_logistics_json(r#"{"success":true}"#).is_err());
        assert!(parse_logistics_json(r#"{"success":true,"data":{"token":"","expiresIn":60}}"#).is_err());
        assert!(parse_logistics_json(r#"{"success":true,"data":{"token":"t","expiresIn":0}}"#).is_err());
        assert!(parse_logistics_json(r#"{"token":"t"}"#).is_err());
        assert!(parse_logistics_json("<html>502</html>").is_err());
    }
}
