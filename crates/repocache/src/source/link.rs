//! RFC 8288 `Link` header handling.

use url::Url;

/// Extract the `rel="next"` target from a `Link` header value, resolved
/// against `base` when relative.
pub fn next_link(header: &str, base: &str) -> Option<String> {
    header
        .split(',')
        .filter_map(parse_link_value)
        .find(|(_, rels)| rels.split_ascii_whitespace().any(|rel| rel.eq_ignore_ascii_case("next")))
        .and_then(|(target, _)| resolve(target, base))
}

/// Split `<target>; rel="a b"; other=x` into the target and the rel value.
fn parse_link_value(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.split(';');
    let target = parts
        .next()?
        .trim()
        .strip_prefix('<')?
        .strip_suffix('>')?;

    let rels = parts.find_map(|param| {
        let (key, val) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("rel")
            .then(|| val.trim().trim_matches('"'))
    })?;

    Some((target, rels))
}

fn resolve(target: &str, base: &str) -> Option<String> {
    match Url::parse(target) {
        Ok(url) => Some(url.into()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(base).ok()?.join(target).ok().map(Into::into)
        }
        Err(_) => None,
    }
}
