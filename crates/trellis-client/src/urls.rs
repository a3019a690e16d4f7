//! URL helpers for building follow-up requests from proxies.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;

use crate::errors::ClientError;

const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Appends one percent-encoded path segment, keeping any query string last.
///
/// ```
/// use trellis_client::append_segment;
///
/// assert_eq!(append_segment("/counter?count=3", "value"), "/counter/value?count=3");
/// assert_eq!(append_segment("/jobs/", "id"), "/jobs/id");
/// ```
#[must_use]
pub fn append_segment(url: &str, segment: &str) -> String {
    let encoded = utf8_percent_encode(segment, SEGMENT);
    url.split_once('?').map_or_else(
        || format!("{}/{encoded}", url.trim_end_matches('/')),
        |(path, query)| format!("{}/{encoded}?{query}", path.trim_end_matches('/')),
    )
}

/// Resolves `reference` against `base`, shortening same-origin results to
/// path and query.
pub(crate) fn resolve(base: &Url, reference: &str) -> Result<String, ClientError> {
    let joined = base.join(reference).map_err(|source| ClientError::Url {
        url: reference.to_owned(),
        source,
    })?;
    if joined.origin() != base.origin() {
        return Ok(joined.into());
    }
    Ok(joined.query().map_or_else(
        || joined.path().to_owned(),
        |query| format!("{}?{query}", joined.path()),
    ))
}

pub(crate) fn parse_base(base: &str) -> Result<Url, ClientError> {
    Url::parse(base).map_err(|source| ClientError::Url {
        url: base.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/math", "add", "/math/add")]
    #[case("/counter?count=3", "increment", "/counter/increment?count=3")]
    #[case("/jobs/id", "a b/c", "/jobs/id/a%20b%2Fc")]
    fn segments_go_before_the_query(#[case] url: &str, #[case] segment: &str, #[case] expected: &str) {
        assert_eq!(append_segment(url, segment), expected);
    }

    #[rstest]
    #[case("http://trellis.invalid/jobs/list", "/jobs/id/ada", "/jobs/id/ada")]
    #[case("http://trellis.invalid/api/", "echo", "/api/echo")]
    #[case("http://trellis.invalid/", "/counter?count=2", "/counter?count=2")]
    #[case("http://trellis.invalid/", "http://elsewhere.example/x", "http://elsewhere.example/x")]
    fn references_resolve_against_the_request(
        #[case] raw_base: &str,
        #[case] reference: &str,
        #[case] expected: &str,
    ) {
        let base = parse_base(raw_base).expect("base");
        assert_eq!(resolve(&base, reference).expect("resolve"), expected);
    }
}
