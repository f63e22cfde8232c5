//! Parser for the RFC 5988 `Link` response header GitHub uses for
//! pagination. Only a small subset is needed: splitting the header into
//! `<url>; rel="name"` entries and looking up the `next` relation.

/// One `<url>; rel="..."` entry from a `Link` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRelation {
    pub url: String,
    pub rel: String,
}

/// Split a `Link` header into its relations.
///
/// Entries are comma-separated; within an entry the URL (angle-bracketed)
/// and its parameters are semicolon-separated. Entries without a usable
/// URL or a `rel` parameter are skipped rather than treated as errors —
/// the caller only ever acts on `rel="next"`.
pub fn parse_link_header(header: &str) -> Vec<LinkRelation> {
    let mut relations = Vec::new();

    for entry in header.split(',') {
        let mut parts = entry.split(';');

        let url = match parts.next() {
            Some(raw) => {
                let raw = raw.trim();
                match raw.strip_prefix('<').and_then(|u| u.strip_suffix('>')) {
                    Some(url) => url.to_string(),
                    None => continue,
                }
            }
            None => continue,
        };

        let rel = parts.find_map(|param| {
            let (key, value) = param.trim().split_once('=')?;
            if key.trim() == "rel" {
                Some(value.trim().trim_matches('"').to_string())
            } else {
                None
            }
        });

        if let Some(rel) = rel {
            relations.push(LinkRelation { url, rel });
        }
    }

    relations
}

/// Extract the continuation URL, if the header advertises one.
pub fn next_url(header: &str) -> Option<String> {
    parse_link_header(header)
        .into_iter()
        .find(|relation| relation.rel == "next")
        .map(|relation| relation.url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GITHUB_STYLE: &str = "<https://api.github.com/repos/o/r/pulls?page=2>; rel=\"next\", <https://api.github.com/repos/o/r/pulls?page=9>; rel=\"last\"";

    #[test]
    fn test_parse_two_relations() {
        let relations = parse_link_header(GITHUB_STYLE);
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].rel, "next");
        assert_eq!(
            relations[0].url,
            "https://api.github.com/repos/o/r/pulls?page=2"
        );
        assert_eq!(relations[1].rel, "last");
    }

    #[test]
    fn test_next_url_present() {
        assert_eq!(
            next_url(GITHUB_STYLE).as_deref(),
            Some("https://api.github.com/repos/o/r/pulls?page=2")
        );
    }

    #[test]
    fn test_next_url_absent_when_only_prev_and_first() {
        let header = "<https://x/p?page=1>; rel=\"prev\", <https://x/p?page=1>; rel=\"first\"";
        assert!(next_url(header).is_none());
    }

    #[test]
    fn test_tolerates_extra_params_and_spacing() {
        let header = "  <https://x/p?page=3> ;  type=\"text/html\" ; rel=\"next\"  ";
        assert_eq!(next_url(header).as_deref(), Some("https://x/p?page=3"));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let header = "no-brackets; rel=\"next\", <https://x/ok>; rel=\"last\"";
        let relations = parse_link_header(header);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].rel, "last");
    }

    #[test]
    fn test_empty_header() {
        assert!(parse_link_header("").is_empty());
        assert!(next_url("").is_none());
    }
}
