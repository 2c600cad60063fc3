//! Negotiated encoding of the `{statusCode, message}` feedback body.
//!
//! This is the narrow body-write capability the stages need to answer a
//! request they refuse. It knows a fixed set of encodings and picks one from
//! the `Accept` header.

use http::StatusCode;
use serde::Serialize;

use crate::response::{ContentType, Response};

/// The body of every denial and error response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Feedback {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    pub message: String,
}

impl Feedback {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status_code: status.as_u16().to_string(), message: message.into() }
    }
}

/// Body encodings a feedback can be written in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Encoding {
    Json,
    Plain,
    Xml,
}

/// Why a feedback body could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("no supported encoding in accept header `{0}`")]
    NotAcceptable(String),
    #[error("cannot encode body as json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Picks the encoding for an `Accept` header value.
///
/// The first recognised media range wins; parameters such as `q=` are
/// ignored. A missing or blank header means plain text.
pub fn negotiate(accept: Option<&str>) -> Result<Encoding, BodyError> {
    let accept = match accept.map(str::trim) {
        None | Some("") => return Ok(Encoding::Plain),
        Some(a) => a,
    };
    accept.split(',')
        .filter_map(|range| range.split(';').next())
        .map(str::trim)
        .find_map(|media| match media.to_ascii_lowercase().as_str() {
            "application/json" => Some(Encoding::Json),
            "application/xml" | "text/xml" => Some(Encoding::Xml),
            "text/plain" | "text/*" | "*/*" => Some(Encoding::Plain),
            _ => None,
        })
        .ok_or_else(|| BodyError::NotAcceptable(accept.to_owned()))
}

/// Encodes `feedback` per `accept` into a response carrying `status`.
pub fn write_feedback(
    status: StatusCode,
    accept: Option<&str>,
    feedback: &Feedback,
) -> Result<Response, BodyError> {
    let builder = Response::builder().status(status);
    let res = match negotiate(accept)? {
        Encoding::Json => builder.json(serde_json::to_vec(feedback)?),
        Encoding::Plain => builder.text(format!("{}\n", feedback.message)),
        Encoding::Xml => builder.bytes(ContentType::Xml, to_xml(feedback)),
    };
    Ok(res)
}

fn to_xml(feedback: &Feedback) -> String {
    format!(
        "<feedback><statusCode>{}</statusCode><message>{}</message></feedback>",
        escape_xml(&feedback.status_code),
        escape_xml(&feedback.message),
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&'  => out.push_str("&amp;"),
            '<'  => out.push_str("&lt;"),
            '>'  => out.push_str("&gt;"),
            '"'  => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _    => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiates_first_recognised_range() {
        assert_eq!(negotiate(None).unwrap(), Encoding::Plain);
        assert_eq!(negotiate(Some("  ")).unwrap(), Encoding::Plain);
        assert_eq!(negotiate(Some("application/json")).unwrap(), Encoding::Json);
        assert_eq!(
            negotiate(Some("image/png, text/xml;q=0.9, application/json")).unwrap(),
            Encoding::Xml,
        );
        assert_eq!(negotiate(Some("*/*")).unwrap(), Encoding::Plain);
        assert!(matches!(negotiate(Some("image/png")), Err(BodyError::NotAcceptable(_))));
    }

    #[test]
    fn json_uses_camel_case_status_code() {
        let fb = Feedback::new(StatusCode::UNAUTHORIZED, "cannot verify the signature");
        let res = write_feedback(StatusCode::UNAUTHORIZED, Some("application/json"), &fb).unwrap();
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.header("content-type"), Some("application/json"));
        let value: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(value["statusCode"], "401");
        assert_eq!(value["message"], "cannot verify the signature");
    }

    #[test]
    fn xml_escapes_message() {
        let fb = Feedback::new(StatusCode::FORBIDDEN, "a < b & c");
        let res = write_feedback(StatusCode::FORBIDDEN, Some("application/xml"), &fb).unwrap();
        assert_eq!(
            res.body_text(),
            "<feedback><statusCode>403</statusCode><message>a &lt; b &amp; c</message></feedback>",
        );
    }

    #[test]
    fn plain_is_message_with_newline() {
        let fb = Feedback::new(StatusCode::NOT_FOUND, "not found");
        let res = write_feedback(StatusCode::NOT_FOUND, None, &fb).unwrap();
        assert_eq!(res.body_text(), "not found\n");
    }
}
