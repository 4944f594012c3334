//! Domain models: the upstream problem record and the tag-matching mode.

use serde::{Deserialize, Serialize};

/// A single problem as listed by the upstream problemset API.
///
/// Field names mirror the upstream JSON (camelCase) both ways, so the
/// backend passes records through without reshaping them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
  #[serde(default)] pub contest_id: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub problemset_name: Option<String>,
  pub index: String,
  pub name: String,
  #[serde(rename = "type", default)]
  pub kind: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub points: Option<f64>,
  // Unrated problems come without the field and sort first.
  #[serde(default)] pub rating: i32,
  #[serde(default)] pub tags: Vec<String>,
}

/// How a tag query narrows the fetched problems.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TagMatch {
  /// Everything upstream returned for the tags, extra tags allowed.
  #[default]
  Any,
  /// Only problems whose tag count equals the number of requested tags.
  ///
  /// This compares counts, not tag sets: a problem carrying the same number
  /// of entirely different tags also passes.
  Exact,
}

impl TagMatch {
  pub fn as_str(self) -> &'static str {
    match self {
      TagMatch::Any => "any",
      TagMatch::Exact => "exact",
    }
  }
}

/// One request's worth of tag filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProblemQuery {
  pub tags: Vec<String>,
  pub mode: TagMatch,
}

impl ProblemQuery {
  pub fn single(tag: impl Into<String>, mode: TagMatch) -> Self {
    Self { tags: vec![tag.into()], mode }
  }

  pub fn multi(tags: Vec<String>, mode: TagMatch) -> Self {
    Self { tags, mode }
  }
}
