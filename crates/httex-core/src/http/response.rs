use reqwest::StatusCode;

use crate::headers::HeaderMap;

/// Renders a status line the same way expected responses are rendered:
/// `"{code} {reason}"`, or just the bare code when reqwest has no canonical
/// reason phrase for it.
pub fn status_line_for(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

/// Copies a reqwest header map into a [`HeaderMap`], preserving order and
/// duplicate header names the way the wire response sent them.
pub fn headers_from(headers: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            out.insert(name.as_str(), v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_includes_canonical_reason() {
        assert_eq!(status_line_for(StatusCode::OK), "200 OK");
        assert_eq!(status_line_for(StatusCode::NOT_FOUND), "404 Not Found");
    }

    #[test]
    fn status_line_falls_back_to_bare_code_for_unknown_status() {
        let status = StatusCode::from_u16(499).unwrap();
        assert_eq!(status_line_for(status), "499");
    }

    #[test]
    fn headers_from_preserves_order_and_duplicates() {
        let mut raw = reqwest::header::HeaderMap::new();
        raw.append("set-cookie", "a=1".parse().unwrap());
        raw.append("set-cookie", "b=2".parse().unwrap());
        raw.append("content-type", "application/json".parse().unwrap());

        let headers = headers_from(&raw);
        assert_eq!(headers.get_all("set-cookie"), vec!["a=1", "b=2"]);
        assert_eq!(headers.get_first("content-type"), Some("application/json"));
    }
}
