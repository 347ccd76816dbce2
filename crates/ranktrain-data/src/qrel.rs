//! TREC relevance judgments ("qrels").
//!
//! A qrel file lists, per query, the judged documents and their relevance:
//!
//! ```text
//! <qid> <iteration> <docid> <relevance>
//! ```
//!
//! The iteration column is ignored. Negative relevance (used by some collections for
//! "judged non-relevant") counts as 0. A repeated `(qid, docid)` pair keeps the last line.

use std::{
    collections::{BTreeMap, btree_map},
    fs,
    path::Path,
};

use crate::{LineErrorKind, ParseError, parse::parse_label};

/// Judgments of the documents of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryJudgments {
    gains: BTreeMap<String, u32>,
}

impl QueryJudgments {
    /// Relevance of `docid`; unjudged documents are non-relevant.
    #[must_use]
    pub fn gain(&self, docid: &str) -> u32 {
        self.gains.get(docid).copied().unwrap_or(0)
    }

    /// Relevance of every judged document, ordered by document id.
    pub fn gains(&self) -> impl Iterator<Item = u32> + '_ {
        self.gains.values().copied()
    }

    #[must_use]
    pub fn judged_count(&self) -> usize {
        self.gains.len()
    }

    #[must_use]
    pub fn relevant_count(&self) -> usize {
        self.gains().filter(|&gain| gain > 0).count()
    }
}

/// Relevance judgments for a set of queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Judgments {
    queries: BTreeMap<String, QueryJudgments>,
}

impl Judgments {
    /// Reads a qrel file.
    pub fn load<P>(path: P) -> Result<Self, ParseError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let name = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: name.clone(),
            source,
        })?;
        Self::parse(&name, &text)
    }

    /// Parses qrel text; `path` is used in error messages.
    pub fn parse(path: &str, text: &str) -> Result<Self, ParseError> {
        let mut queries = BTreeMap::<String, QueryJudgments>::new();
        for (line_no, line) in text.lines().enumerate() {
            let line_error = |kind| ParseError::Line {
                path: path.to_owned(),
                line: line_no + 1,
                kind,
            };
            let tokens = line.split_whitespace().collect::<Vec<_>>();
            if tokens.is_empty() || tokens[0].starts_with('#') {
                continue;
            }
            let [qid, _iteration, docid, relevance] = tokens[..] else {
                return Err(line_error(LineErrorKind::MissingJudgmentField));
            };
            let gain = match relevance.strip_prefix('-') {
                Some(magnitude) => parse_label(magnitude).map(|_| 0),
                None => parse_label(relevance),
            }
            .map_err(|_| {
                line_error(LineErrorKind::InvalidLabel {
                    token: relevance.to_owned(),
                })
            })?;
            queries
                .entry(qid.to_owned())
                .or_default()
                .gains
                .insert(docid.to_owned(), gain);
        }
        Ok(Self { queries })
    }

    /// Judgments of query `qid`, if the file mentions it.
    #[must_use]
    pub fn query(&self, qid: &str) -> Option<&QueryJudgments> {
        self.queries.get(qid)
    }

    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Judged queries in id order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, QueryJudgments> {
        self.queries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qrels() {
        let text = "\
# judged pool
101 0 doc-a 2
101 0 doc-b 0
101 Q0 doc-c -1

102 0 doc-a 1
101 0 doc-b 1
";
        let judgments = Judgments::parse("qrels", text).unwrap();
        assert_eq!(judgments.query_count(), 2);
        let q101 = judgments.query("101").unwrap();
        assert_eq!(q101.judged_count(), 3);
        assert_eq!(q101.gain("doc-a"), 2);
        // later line wins
        assert_eq!(q101.gain("doc-b"), 1);
        assert_eq!(q101.gain("doc-c"), 0);
        assert_eq!(q101.gain("unjudged"), 0);
        assert_eq!(q101.relevant_count(), 2);
        assert_eq!(q101.gains().collect::<Vec<_>>(), [2, 1, 0]);
        assert!(judgments.query("103").is_none());
        assert_eq!(
            judgments.iter().map(|(qid, _)| qid.as_str()).collect::<Vec<_>>(),
            ["101", "102"]
        );
    }

    #[test]
    fn test_qrel_errors() {
        let err = Judgments::parse("qrels", "101 0 doc-a\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "qrels:1: expected '<qid> <iteration> <docid> <relevance>'"
        );
        let err = Judgments::parse("qrels", "101 0 doc-a 1\n101 0 doc-b high\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "qrels:2: invalid relevance label 'high' (expected a non-negative integer)"
        );
        assert!(Judgments::parse("qrels", "101 0 doc-a 5000\n").is_err());
    }
}
