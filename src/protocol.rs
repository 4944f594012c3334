//! Public HTTP query structs (serde ready).
//! Absent parameters deserialize to empty strings and are forwarded upstream unchanged.
//! When a parameter repeats, the first occurrence wins.

use serde::Deserialize;

use crate::domain::{ProblemQuery, TagMatch};
use crate::util::split_tags;

/// `?tag=dp`
#[derive(Debug, Default, Deserialize)]
pub struct TagQuery {
    #[serde(default)]
    pub tag: String,
}

impl TagQuery {
    /// Build from raw query pairs, e.g. `?tag=dp&tag=math` gives `dp`.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self { tag: first_value(pairs, "tag") }
    }

    pub fn into_query(self, mode: TagMatch) -> ProblemQuery {
        ProblemQuery::single(self.tag, mode)
    }
}

/// `?tags=dp,graphs`
#[derive(Debug, Default, Deserialize)]
pub struct TagsQuery {
    #[serde(default)]
    pub tags: String,
}

impl TagsQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self { tags: first_value(pairs, "tags") }
    }

    pub fn into_query(self, mode: TagMatch) -> ProblemQuery {
        ProblemQuery::multi(split_tags(&self.tags), mode)
    }
}

fn first_value(pairs: &[(String, String)], key: &str) -> String {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tag_becomes_one_element_query() {
        let q = TagQuery { tag: "dp".into() }.into_query(TagMatch::Exact);
        assert_eq!(q.tags, vec!["dp"]);
        assert_eq!(q.mode, TagMatch::Exact);
    }

    #[test]
    fn absent_tags_still_count_as_one_requested_tag() {
        let q = TagsQuery::default().into_query(TagMatch::Exact);
        assert_eq!(q.tags, vec![""]);
    }

    #[test]
    fn comma_separated_tags_split_in_order() {
        let q = TagsQuery { tags: "graphs,dp,trees".into() }.into_query(TagMatch::Any);
        assert_eq!(q.tags, vec!["graphs", "dp", "trees"]);
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn repeated_parameter_keeps_first_value() {
        let q = TagQuery::from_pairs(&pairs(&[("tag", "dp"), ("tag", "math")]));
        assert_eq!(q.tag, "dp");

        let q = TagsQuery::from_pairs(&pairs(&[("other", "x"), ("tags", "dp,graphs"), ("tags", "math")]));
        assert_eq!(q.tags, "dp,graphs");
    }

    #[test]
    fn missing_parameter_is_empty() {
        assert_eq!(TagQuery::from_pairs(&pairs(&[("tags", "dp")])).tag, "");
        assert_eq!(TagsQuery::from_pairs(&[]).tags, "");
    }
}
