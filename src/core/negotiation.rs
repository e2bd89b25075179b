//! Content-type negotiation.
//!
//! Clients describe the translation they want through parameters on the
//! `Content-Type` header:
//!
//! ```text
//! application/json; reqmsg=pkg.Req; respmsg="pkg.Resp,pkg.Error"; qs=payload
//! ```
//!
//! * `reqmsg`  - message type of the JSON request body
//! * `respmsg` - comma separated response types, tried in order
//! * `qs`      - embed the binary request in this query parameter instead of the body
use crate::core::error::{TranscodeError, TranscodeResult};

pub const REQUEST_MESSAGE_PARAM: &str = "reqmsg";
pub const RESPONSE_MESSAGES_PARAM: &str = "respmsg";
pub const QUERY_PARAM: &str = "qs";

const NEGOTIATION_PARAMS: [&str; 3] = [REQUEST_MESSAGE_PARAM, RESPONSE_MESSAGES_PARAM, QUERY_PARAM];

/// A parsed media type: `type/subtype` plus ordered parameters.
///
/// Parameter names are stored lowercased; values keep their case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Parse a header value such as `text/plain; charset="utf-8"`.
    ///
    /// Values may be tokens or quoted strings. Empty parameter segments
    /// (`a/b; ; c=d;`) are ignored. Duplicate parameter names are rejected.
    pub fn parse(input: &str) -> TranscodeResult<Self> {
        let malformed = |reason: &str| TranscodeError::MalformedMetadata {
            value: input.to_string(),
            reason: reason.to_string(),
        };

        let (essence_raw, rest) = match input.find(';') {
            Some(idx) => (&input[..idx], &input[idx..]),
            None => (input, ""),
        };
        let essence = essence_raw.trim().to_ascii_lowercase();
        let (ty, subtype) = essence
            .split_once('/')
            .ok_or_else(|| malformed("expected 'type/subtype'"))?;
        if ty.is_empty() || subtype.is_empty() || !ty.chars().all(is_token_char) {
            return Err(malformed("invalid media type"));
        }
        if !subtype.chars().all(is_token_char) {
            return Err(malformed("invalid media subtype"));
        }

        let mut params: Vec<(String, String)> = Vec::new();
        let mut chars = rest.chars().peekable();
        loop {
            // Skip separators and whitespace between parameters
            while matches!(chars.peek(), Some(c) if *c == ';' || c.is_ascii_whitespace()) {
                chars.next();
            }
            if chars.peek().is_none() {
                break;
            }

            let mut key = String::new();
            while let Some(&c) = chars.peek() {
                if c == '=' || c == ';' || c.is_ascii_whitespace() {
                    break;
                }
                if !is_token_char(c) {
                    return Err(malformed("invalid character in parameter name"));
                }
                key.push(c.to_ascii_lowercase());
                chars.next();
            }
            if key.is_empty() || chars.next() != Some('=') {
                return Err(malformed("expected 'name=value' parameter"));
            }

            let mut value = String::new();
            if chars.peek() == Some(&'"') {
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => break,
                        },
                        _ => value.push(c),
                    }
                }
                if !closed {
                    return Err(malformed("unterminated quoted string"));
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ';' || c.is_ascii_whitespace() {
                        break;
                    }
                    if c == '"' || c.is_ascii_control() {
                        return Err(malformed("invalid character in parameter value"));
                    }
                    value.push(c);
                    chars.next();
                }
                if value.is_empty() {
                    return Err(malformed("empty parameter value"));
                }
            }

            while matches!(chars.peek(), Some(c) if c.is_ascii_whitespace()) {
                chars.next();
            }
            if !matches!(chars.peek(), None | Some(';')) {
                return Err(malformed("unexpected data after parameter value"));
            }

            if params.iter().any(|(k, _)| *k == key) {
                return Err(malformed("duplicate parameter"));
            }
            params.push((key, value));
        }

        Ok(Self { essence, params })
    }

    /// `type/subtype`, lowercased
    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this media type with the proxy's negotiation parameters removed
    pub fn without_negotiation_params(&self) -> Self {
        Self {
            essence: self.essence.clone(),
            params: self
                .params
                .iter()
                .filter(|(k, _)| !NEGOTIATION_PARAMS.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Render back to a header value, quoting values that need it
    pub fn to_header_value(&self) -> String {
        let mut out = self.essence.clone();
        for (k, v) in &self.params {
            if !v.is_empty() && v.chars().all(is_token_char) {
                out.push_str(&format!("; {k}={v}"));
            } else {
                let escaped = v.replace('\\', "\\\\").replace('"', "\\\"");
                out.push_str(&format!("; {k}=\"{escaped}\""));
            }
        }
        out
    }
}

/// RFC 2045 token characters
fn is_token_char(c: char) -> bool {
    c.is_ascii()
        && !c.is_ascii_control()
        && !c.is_ascii_whitespace()
        && !matches!(
            c,
            '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '='
        )
}

/// Per-request translation intent derived from the `Content-Type` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationDirective {
    /// Message type of the request body, if it should be transcoded
    pub request_type: Option<String>,
    /// Candidate response types in priority order; empty means pass-through
    pub response_candidates: Vec<String>,
    /// Query parameter carrying the binary payload instead of the body
    pub query_param: Option<String>,
}

impl NegotiationDirective {
    /// Extract the directive from an already parsed media type
    pub fn from_media_type(media_type: &MediaType) -> Self {
        let non_empty = |v: &str| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };

        let response_candidates = media_type
            .param(RESPONSE_MESSAGES_PARAM)
            .map(|list| list.split(',').filter_map(non_empty).collect())
            .unwrap_or_default();

        Self {
            request_type: media_type.param(REQUEST_MESSAGE_PARAM).and_then(non_empty),
            response_candidates,
            query_param: media_type.param(QUERY_PARAM).and_then(non_empty),
        }
    }

    /// Parse a raw `Content-Type` header value.
    ///
    /// A missing header is treated like an empty one and fails as malformed.
    pub fn parse(content_type: Option<&str>) -> TranscodeResult<(MediaType, Self)> {
        let media_type = MediaType::parse(content_type.unwrap_or(""))?;
        let directive = Self::from_media_type(&media_type);
        Ok((media_type, directive))
    }

    /// True when neither direction names a message type
    pub fn is_empty(&self) -> bool {
        self.request_type.is_none() && self.response_candidates.is_empty()
    }
}
