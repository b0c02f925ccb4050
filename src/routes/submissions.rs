use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;

use super::{Identity, external_error};
use crate::database as db;

/// A stored submission; list-valued columns hold JSON arrays, one entry per test case
#[derive(Serialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SubmissionRecord {
    pub id: i64,
    pub user_id: String,
    pub problem_id: i64,
    pub source_code: String,
    pub language: String,
    pub stdin: String,
    pub stdout: String,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub status: String,
    pub memory: Option<String>,
    pub time: Option<String>,
    pub created_time: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TestCaseResultRecord {
    pub test_case: i64,
    pub passed: bool,
    pub stdout: Option<String>,
    pub expected_output: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub status: String,
    pub memory: Option<String>,
    pub time: Option<String>,
}

#[derive(Serialize)]
struct SubmissionCount {
    count: i64,
}

#[get("/submissions")]
pub async fn get_submissions_handler(
    pool: web::Data<SqlitePool>,
    identity: Identity,
) -> impl Responder {
    match db::fetch_submissions(&identity.user_id, None, pool.into_inner()).await {
        Ok(submissions) => {
            log::info!(
                "Got {} submissions of user {}",
                submissions.len(),
                identity.user_id
            );
            HttpResponse::Ok().json(submissions)
        }
        Err(e) => external_error(e, "retrieve submissions"),
    }
}

#[get("/submissions/problem/{problem_id}")]
pub async fn get_submissions_by_problem_handler(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64,)>,
    identity: Identity,
) -> impl Responder {
    let problem_id = path.into_inner().0;

    match db::fetch_submissions(&identity.user_id, Some(problem_id), pool.into_inner()).await {
        Ok(submissions) => HttpResponse::Ok().json(submissions),
        Err(e) => external_error(e, "retrieve submissions"),
    }
}

/// Counts submissions from every user
#[get("/submissions/count/{problem_id}")]
pub async fn get_submission_count_handler(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64,)>,
    _identity: Identity,
) -> impl Responder {
    let problem_id = path.into_inner().0;

    match db::count_submissions(problem_id, pool.into_inner()).await {
        Ok(count) => HttpResponse::Ok().json(SubmissionCount { count }),
        Err(e) => external_error(e, "count submissions"),
    }
}
