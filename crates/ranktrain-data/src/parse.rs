use std::collections::HashMap;

use crate::{Document, FeatureId, LineErrorKind, MAX_LABEL, ParseError, Query};

/// One successfully parsed data line.
#[derive(Debug, PartialEq)]
struct Line<'a> {
    query_id: &'a str,
    document: Document,
}

/// Groups the lines of `text` into queries, in order of first appearance.
pub(crate) fn parse_queries(path: &str, text: &str) -> Result<Vec<Query>, ParseError> {
    let mut index_by_id = HashMap::<&str, usize>::new();
    let mut groups: Vec<(&str, Vec<Document>)> = vec![];

    for (line_no, line) in text.lines().enumerate() {
        let parsed = parse_line(line).map_err(|kind| ParseError::Line {
            path: path.to_owned(),
            line: line_no + 1,
            kind,
        })?;
        let Some(Line { query_id, document }) = parsed else {
            continue;
        };
        let index = *index_by_id.entry(query_id).or_insert_with(|| {
            groups.push((query_id, vec![]));
            groups.len() - 1
        });
        groups[index].1.push(document);
    }

    Ok(groups
        .into_iter()
        .map(|(id, documents)| Query::new(id, documents))
        .collect())
}

/// Parses one line; blank and comment-only lines yield `None`.
fn parse_line(line: &str) -> Result<Option<Line<'_>>, LineErrorKind> {
    let (data, comment) = match line.split_once('#') {
        Some((data, comment)) => (data, Some(comment)),
        None => (line, None),
    };
    let mut tokens = data.split_whitespace();
    let Some(label_token) = tokens.next() else {
        return Ok(None);
    };
    if label_token.starts_with("qid:") {
        return Err(LineErrorKind::MissingLabel);
    }
    let label = parse_label(label_token)?;

    let query_id = tokens
        .next()
        .and_then(|token| token.strip_prefix("qid:"))
        .filter(|id| !id.is_empty())
        .ok_or(LineErrorKind::MissingQueryId)?;

    let mut features = tokens.map(parse_feature).collect::<Result<Vec<_>, _>>()?;
    features.sort_by_key(|(id, _)| *id);
    if let Some(w) = features.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(LineErrorKind::DuplicateFeature { feature: w[0].0 });
    }

    let mut document = Document::new(label, features);
    if let Some(name) = comment.and_then(document_name) {
        document = document.with_name(name);
    }
    Ok(Some(Line { query_id, document }))
}

/// Parses a relevance label in `0..=MAX_LABEL`.
pub(crate) fn parse_label(token: &str) -> Result<u32, LineErrorKind> {
    if !token.bytes().all(|b| b.is_ascii_digit()) || token.is_empty() {
        return Err(LineErrorKind::InvalidLabel {
            token: token.to_owned(),
        });
    }
    token
        .parse::<u32>()
        .ok()
        .filter(|&label| label <= MAX_LABEL)
        .ok_or_else(|| LineErrorKind::LabelTooLarge {
            token: token.to_owned(),
        })
}

fn parse_feature(token: &str) -> Result<(FeatureId, f64), LineErrorKind> {
    let (id, value) = token
        .split_once(':')
        .ok_or_else(|| LineErrorKind::MalformedFeature {
            token: token.to_owned(),
        })?;
    let feature = id
        .parse::<FeatureId>()
        .map_err(|()| LineErrorKind::InvalidFeatureId {
            token: id.to_owned(),
        })?;
    let value = value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LineErrorKind::NonNumericValue {
            feature,
            token: value.to_owned(),
        })?;
    Ok((feature, value))
}

/// Extracts `<name>` from a trailing `docid = <name> ...` comment.
fn document_name(comment: &str) -> Option<&str> {
    comment
        .trim_start()
        .strip_prefix("docid")?
        .trim_start()
        .strip_prefix('=')?
        .split_whitespace()
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(id: u32) -> FeatureId {
        FeatureId::new(id).unwrap()
    }

    fn line_error(line: &str) -> LineErrorKind {
        parse_line(line).unwrap_err()
    }

    #[test]
    fn test_full_line() {
        let line = parse_line("3 qid:17 1:0.5 4:-2 2:1e-3 # docid = GX01 inc = 1")
            .unwrap()
            .unwrap();
        assert_eq!(line.query_id, "17");
        assert_eq!(line.document.label(), 3);
        assert_eq!(
            line.document.features(),
            &[(fid(1), 0.5), (fid(2), 1e-3), (fid(4), -2.0)]
        );
        assert_eq!(line.document.name(), Some("GX01"));
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   \t"), Ok(None));
        assert_eq!(parse_line("# header"), Ok(None));
    }

    #[test]
    fn test_line_errors() {
        assert_eq!(line_error("qid:1 1:0.5"), LineErrorKind::MissingLabel);
        assert_eq!(
            line_error("-1 qid:1 1:0.5"),
            LineErrorKind::InvalidLabel {
                token: "-1".to_owned()
            }
        );
        assert_eq!(
            line_error("1024 qid:1 1:0.5"),
            LineErrorKind::LabelTooLarge {
                token: "1024".to_owned()
            }
        );
        assert_eq!(
            line_error("99999999999 qid:1 1:0.5"),
            LineErrorKind::LabelTooLarge {
                token: "99999999999".to_owned()
            }
        );
        assert_eq!(parse_label("1023"), Ok(MAX_LABEL));
        assert_eq!(line_error("1 1:0.5"), LineErrorKind::MissingQueryId);
        assert_eq!(line_error("1"), LineErrorKind::MissingQueryId);
        assert_eq!(line_error("1 qid: 1:0.5"), LineErrorKind::MissingQueryId);
        assert_eq!(
            line_error("1 qid:1 1=0.5"),
            LineErrorKind::MalformedFeature {
                token: "1=0.5".to_owned()
            }
        );
        assert_eq!(
            line_error("1 qid:1 0:0.5"),
            LineErrorKind::InvalidFeatureId {
                token: "0".to_owned()
            }
        );
        assert_eq!(
            line_error("1 qid:1 2:abc"),
            LineErrorKind::NonNumericValue {
                feature: fid(2),
                token: "abc".to_owned()
            }
        );
        assert_eq!(
            line_error("1 qid:1 2:NaN"),
            LineErrorKind::NonNumericValue {
                feature: fid(2),
                token: "NaN".to_owned()
            }
        );
        assert_eq!(
            line_error("1 qid:1 2:1 3:1 2:0"),
            LineErrorKind::DuplicateFeature { feature: fid(2) }
        );
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let text = "0 qid:b 1:1\n1 qid:a 1:2\n\n2 qid:b 1:3\n";
        let queries = parse_queries("mem", text).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].id(), "b");
        assert_eq!(queries[0].labels().collect::<Vec<_>>(), [0, 2]);
        assert_eq!(queries[1].id(), "a");
    }

    #[test]
    fn test_error_reports_path_and_line() {
        let err = parse_queries("train.txt", "0 qid:1 1:1\n\n1 qid:1 1:x\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "train.txt:3: non-numeric value 'x' for feature 1"
        );
    }

    #[test]
    fn test_identical_bytes_give_identical_queries() {
        let text = "2 qid:9 3:0.25 1:4\n0 qid:9 2:1\n1 qid:3 1:0.5\n";
        assert_eq!(
            parse_queries("x", text).unwrap(),
            parse_queries("x", text).unwrap()
        );
    }
}
