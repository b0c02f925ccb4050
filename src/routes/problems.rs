mod delete;
mod get;
mod post;
mod put;

pub use delete::delete_problem_handler;
pub use get::{get_problem_by_id_handler, get_problems_handler, get_solved_problems_handler};
pub use post::post_problem_handler;
pub use put::put_problem_handler;

use std::collections::BTreeMap;
use std::fmt;

use actix_web::{HttpResponse, Responder, delete, get, post, put, web};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::sqlite::SqlitePool;
use tokio_util::sync::CancellationToken;

use super::{
    ErrorResponseWithMessage, Identity, external_error, judge_error_response, not_found,
};
use crate::database as db;
use crate::judge::{Orchestrator, ReferenceError, TestCase};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "EASY" => Some(Self::Easy),
            "MEDIUM" => Some(Self::Medium),
            "HARD" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Problem fields supplied by an author
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProblemBody {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub examples: serde_json::Value,
    pub constraints: String,
    pub hints: Option<String>,
    pub editorial: Option<String>,
    pub code_snippets: BTreeMap<String, String>,
    pub test_cases: Vec<TestCase>,
    pub reference_solutions: ReferenceSolutions,
}

/// Language name to solution source, in the order the author listed them
///
/// Reference solutions are checked in this order, so the first failing
/// language reported is the first one the author wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSolutions(pub Vec<(String, String)>);

impl<L: Into<String>, C: Into<String>> FromIterator<(L, C)> for ReferenceSolutions {
    fn from_iter<I: IntoIterator<Item = (L, C)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(language, code)| (language.into(), code.into()))
                .collect(),
        )
    }
}

impl Serialize for ReferenceSolutions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (language, code) in &self.0 {
            map.serialize_entry(language, code)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ReferenceSolutions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SolutionsVisitor;

        impl<'de> Visitor<'de> for SolutionsVisitor {
            type Value = ReferenceSolutions;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from language name to source code")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut solutions: Vec<(String, String)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((language, code)) = access.next_entry::<String, String>()? {
                    if solutions.iter().any(|(seen, _)| *seen == language) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate reference solution for {language}"
                        )));
                    }
                    solutions.push((language, code));
                }
                Ok(ReferenceSolutions(solutions))
            }
        }

        deserializer.deserialize_map(SolutionsVisitor)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProblemRecord {
    pub id: i64,
    pub user_id: String,
    pub created_time: String,
    pub updated_time: String,
    #[serde(flatten)]
    pub body: ProblemBody,
}

/// Runs every reference solution; `Some` carries the response rejecting the body
async fn validate_references(
    body: &ProblemBody,
    orchestrator: &Orchestrator,
    shutdown: &CancellationToken,
) -> Option<HttpResponse> {
    let cancel = shutdown.child_token();
    match orchestrator
        .validate_reference_solutions(&body.reference_solutions.0, &body.test_cases, &cancel)
        .await
    {
        Ok(()) => None,
        Err(ReferenceError::Judge(e)) => Some(judge_error_response(&e)),
        Err(ReferenceError::Failed(failure)) => {
            Some(HttpResponse::BadRequest().json(serde_json::json!({
                "reason": "ERR_INVALID_ARGUMENT",
                "code": 1,
                "message": failure.to_string(),
                "details": failure,
            })))
        }
    }
}
