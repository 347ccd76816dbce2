//! Feature display names.
//!
//! Names are only used for reporting. Two file formats are accepted:
//!
//! - a JSON object, either `{"<id>": "<name>"}` or `{"<name>": <id>}`
//! - plain text, one `<id> <name>` or `<id>:<name>` entry per line (`#` starts a comment)

use std::{collections::BTreeMap, fs, path::Path};

use serde_json::Value;

use crate::{FeatureId, LineErrorKind, ParseError};

/// Reads a feature-name file.
pub fn load_feature_names<P>(path: P) -> Result<BTreeMap<FeatureId, String>, ParseError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let name = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: name.clone(),
        source,
    })?;
    parse_feature_names(&name, &text)
}

/// Parses feature-name text; `path` is used in error messages.
pub fn parse_feature_names(
    path: &str,
    text: &str,
) -> Result<BTreeMap<FeatureId, String>, ParseError> {
    if text.trim_start().starts_with('{') {
        parse_json(path, text)
    } else {
        parse_lines(path, text)
    }
}

fn parse_json(path: &str, text: &str) -> Result<BTreeMap<FeatureId, String>, ParseError> {
    let object: BTreeMap<String, Value> =
        serde_json::from_str(text).map_err(|source| ParseError::Json {
            path: path.to_owned(),
            source,
        })?;
    let invalid_id = |token: String| ParseError::Line {
        path: path.to_owned(),
        line: 1,
        kind: LineErrorKind::InvalidFeatureId { token },
    };

    let mut names = BTreeMap::new();
    for (key, value) in object {
        let (id, name) = match value {
            Value::String(name) => (key.parse::<FeatureId>().map_err(|()| invalid_id(key))?, name),
            Value::Number(n) => {
                let id = n
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .and_then(FeatureId::new)
                    .ok_or_else(|| invalid_id(n.to_string()))?;
                (id, key)
            }
            other => return Err(invalid_id(other.to_string())),
        };
        names.insert(id, name);
    }
    Ok(names)
}

fn parse_lines(path: &str, text: &str) -> Result<BTreeMap<FeatureId, String>, ParseError> {
    let mut names = BTreeMap::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split_once('#').map_or(line, |(data, _)| data).trim();
        if line.is_empty() {
            continue;
        }
        let error = |kind| ParseError::Line {
            path: path.to_owned(),
            line: line_no + 1,
            kind,
        };
        let (id, name) = line
            .split_once(|c: char| c == ':' || c.is_whitespace())
            .ok_or_else(|| error(LineErrorKind::MissingFeatureName))?;
        let id = id.parse::<FeatureId>().map_err(|()| {
            error(LineErrorKind::InvalidFeatureId {
                token: id.to_owned(),
            })
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(error(LineErrorKind::MissingFeatureName));
        }
        names.insert(id, name.to_owned());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(id: u32) -> FeatureId {
        FeatureId::new(id).unwrap()
    }

    #[test]
    fn test_text_format() {
        let names = parse_feature_names(
            "names.txt",
            "# id name\n1 bm25\n2:pagerank\n\n10\tcaption count\n",
        )
        .unwrap();
        assert_eq!(names[&fid(1)], "bm25");
        assert_eq!(names[&fid(2)], "pagerank");
        assert_eq!(names[&fid(10)], "caption count");
    }

    #[test]
    fn test_json_formats() {
        let by_id = parse_feature_names("f.json", r#"{"1": "bm25", "3": "title"}"#).unwrap();
        let by_name = parse_feature_names("f.json", r#"{"bm25": 1, "title": 3}"#).unwrap();
        assert_eq!(by_id, by_name);
        assert_eq!(by_id[&fid(3)], "title");
    }

    #[test]
    fn test_invalid_entries() {
        assert!(matches!(
            parse_feature_names("n.txt", "1 ok\nzero name\n"),
            Err(ParseError::Line {
                line: 2,
                kind: LineErrorKind::InvalidFeatureId { .. },
                ..
            })
        ));
        assert!(matches!(
            parse_feature_names("n.txt", "4\n"),
            Err(ParseError::Line {
                line: 1,
                kind: LineErrorKind::MissingFeatureName,
                ..
            })
        ));
        assert!(matches!(
            parse_feature_names("n.json", "{ not json"),
            Err(ParseError::Json { .. })
        ));
    }
}
