//! URL paths to cache requests
//!
//! ```text
//! /help
//! /<index>                              keys of an index
//! /latest/<sel>   /oldest/<sel>         every message
//! /<index>/<value>/latest/<sel>         messages matching one header value
//! /<index>/<value>/oldest/<sel>
//! ```
//!
//! Paths missing their trailing pieces redirect to the first message.

use percent_encoding::percent_decode_str;

use crate::config::IndexKeys;
use crate::error::{Error, Result};
use crate::selector::{Position, Query};
use crate::types::{Direction, MatchKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Help,
    /// Known keys of one index
    List(String),
    Query(Query),
    /// Incomplete path; the client should retry at this location
    Redirect(String),
}

impl Route {
    pub fn parse(path: &str, keys: &IndexKeys) -> Result<Route> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Route::Redirect("/latest/0".to_string()));
        }

        let parts = trimmed
            .split('/')
            .map(decode)
            .collect::<Result<Vec<_>>>()?;

        if parts.len() == 1 {
            let name = parts[0].to_lowercase();
            if name == "help" {
                return Ok(Route::Help);
            }
            if Direction::from_segment(&name).is_some() {
                return Ok(Route::Redirect(format!("/{}/0", trimmed)));
            }
            if keys.has(&name) {
                return Ok(Route::List(name));
            }
            return Err(Error::UnknownIndex(parts[0].clone()));
        }

        // Catch-all
        if let Some(direction) = Direction::from_segment(&parts[0]) {
            if parts.len() > 2 {
                return Err(Error::InvalidRequest(path.to_string()));
            }
            let index = keys
                .catch_all()
                .ok_or_else(|| Error::UnknownIndex(String::new()))?;
            return Ok(Route::Query(Query {
                index: index.to_string(),
                value: String::new(),
                kind: MatchKind::CatchAll,
                position: Position::parse(&parts[1])?,
                direction,
            }));
        }

        let index = parts[0].to_lowercase();
        let kind = keys
            .kind(&index)
            .ok_or_else(|| Error::UnknownIndex(parts[0].clone()))?;

        let value = match kind {
            MatchKind::Address => parts[1].to_lowercase(),
            _ => parts[1].clone(),
        };

        let direction = match parts.get(2) {
            None => return Ok(Route::Redirect(format!("/{}/latest/0", trimmed))),
            Some(segment) => Direction::from_segment(segment)
                .ok_or_else(|| Error::InvalidRequest(path.to_string()))?,
        };

        let position = match parts.get(3) {
            None => return Ok(Route::Redirect(format!("/{}/0", trimmed))),
            Some(segment) => Position::parse(segment)?,
        };

        if parts.len() > 4 {
            return Err(Error::InvalidRequest(path.to_string()));
        }

        Ok(Route::Query(Query {
            index,
            value,
            kind,
            position,
            direction,
        }))
    }
}

fn decode(segment: &str) -> Result<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| Error::InvalidRequest(segment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn keys() -> IndexKeys {
        Config::default()
            .keys
            .with("subject", MatchKind::Substring)
    }

    fn query(path: &str) -> Query {
        match Route::parse(path, &keys()).unwrap() {
            Route::Query(q) => q,
            other => panic!("expected a query for {}, got {:?}", path, other),
        }
    }

    #[test]
    fn test_catch_all_queries() {
        let q = query("/latest/1");
        assert_eq!(q.index, "");
        assert_eq!(q.kind, MatchKind::CatchAll);
        assert_eq!(q.position, Position::Single(1));
        assert_eq!(q.direction, Direction::NewestFirst);

        let q = query("/oldest/17-20");
        assert_eq!(q.position, Position::Range(17, 20));
        assert_eq!(q.direction, Direction::OldestFirst);

        assert_eq!(query("/oldest/17,3").position, Position::IndexLimit(17, 3));
    }

    #[test]
    fn test_header_query() {
        let q = query("/from/Someone@Example.com/oldest/17");
        assert_eq!(q.index, "from");
        assert_eq!(q.value, "someone@example.com");
        assert_eq!(q.kind, MatchKind::Address);
        assert_eq!(q.position, Position::Single(17));
        assert_eq!(q.direction, Direction::OldestFirst);
    }

    #[test]
    fn test_segments_are_decoded() {
        let q = query("/subject/Weekly%20Report/latest/0");
        assert_eq!(q.kind, MatchKind::Substring);
        assert_eq!(q.value, "Weekly Report");
    }

    #[test]
    fn test_redirects() {
        let cases = [
            ("/", "/latest/0"),
            ("/latest", "/latest/0"),
            ("/from/a@x.com", "/from/a@x.com/latest/0"),
            ("/from/a@x.com/oldest", "/from/a@x.com/oldest/0"),
            ("/from/a@x.com/latest/", "/from/a@x.com/latest/0"),
        ];
        for (path, target) in cases {
            assert_eq!(
                Route::parse(path, &keys()).unwrap(),
                Route::Redirect(target.to_string()),
                "{}",
                path
            );
        }
    }

    #[test]
    fn test_help_and_list() {
        assert_eq!(Route::parse("/help", &keys()).unwrap(), Route::Help);
        assert_eq!(
            Route::parse("/from/", &keys()).unwrap(),
            Route::List("from".to_string())
        );
    }

    #[test]
    fn test_unknown_index() {
        assert!(matches!(
            Route::parse("/cc", &keys()),
            Err(Error::UnknownIndex(_))
        ));
        assert!(matches!(
            Route::parse("/cc/a@x.com/latest/0", &keys()),
            Err(Error::UnknownIndex(_))
        ));
    }

    #[test]
    fn test_invalid_selectors() {
        for path in [
            "/oldest/ok",
            "/latest/11-",
            "/latest/13-11",
            "/oldest/,11",
            "/latest/12,",
            "/oldest/,0",
            "/oldest/2,-1",
        ] {
            assert!(
                matches!(Route::parse(path, &keys()), Err(Error::InvalidSelector(_))),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_malformed_paths() {
        for path in ["/from/a@x.com/sideways/0", "/latest/0/extra", "/from/a/latest/0/x"] {
            assert!(
                matches!(Route::parse(path, &keys()), Err(Error::InvalidRequest(_))),
                "{} should be rejected",
                path
            );
        }
    }
}
