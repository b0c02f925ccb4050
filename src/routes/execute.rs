use actix_web::{HttpResponse, Responder, post, web};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use tokio_util::sync::CancellationToken;

use super::{
    Identity, SubmissionRecord, TestCaseResultRecord, external_error, judge_error_response,
    not_found,
};
use crate::config::language_name;
use crate::database::{self as db, NewSubmission};
use crate::judge::{Orchestrator, TestCase};

#[derive(Deserialize, Debug)]
pub struct ExecuteRequest {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: Vec<String>,
    pub expected_outputs: Vec<String>,
    pub problem_id: i64,
}

#[derive(Serialize, Debug)]
pub struct ExecuteResponse {
    pub accepted: bool,
    pub submission: SubmissionRecord,
    pub test_cases: Vec<TestCaseResultRecord>,
}

#[post("/execute")]
pub async fn execute_handler(
    orchestrator: web::Data<Orchestrator>,
    pool: web::Data<SqlitePool>,
    shutdown: web::Data<CancellationToken>,
    identity: Identity,
    body: web::Json<ExecuteRequest>,
) -> impl Responder {
    let ExecuteRequest {
        source_code,
        language_id,
        stdin,
        expected_outputs,
        problem_id,
    } = body.into_inner();

    let test_cases = match TestCase::zip(stdin.clone(), expected_outputs) {
        Ok(test_cases) => test_cases,
        Err(e) => return judge_error_response(&e),
    };

    match db::find_problem(problem_id, pool.clone().into_inner()).await {
        Ok(true) => {}
        Ok(false) => return not_found(format!("Problem {problem_id} not found.")),
        Err(e) => return external_error(e, "validate if problem exists"),
    }

    // Cancelled on shutdown; a dropped handler future stops polling on its own
    let cancel = shutdown.child_token();

    let verdict = match orchestrator
        .execute(&source_code, language_id, &test_cases, &cancel)
        .await
    {
        Ok(verdict) => verdict,
        Err(e) => return judge_error_response(&e),
    };

    // Known to resolve: `execute` rejects unknown language ids
    let language = language_name(orchestrator.languages(), language_id)
        .unwrap_or_default()
        .to_string();

    let submission = NewSubmission {
        user_id: &identity.user_id,
        problem_id,
        source_code: &source_code,
        language: &language,
        stdin: &stdin,
    };

    let pool = pool.into_inner();
    let submission_id = match db::save_submission(&submission, &verdict, pool.clone()).await {
        Ok(id) => id,
        Err(e) => return external_error(e, "save submission"),
    };

    let stored = match db::fetch_submission(submission_id, pool.clone()).await {
        Ok(stored) => stored,
        Err(e) => return external_error(e, "retrieve submission"),
    };
    let test_cases = match db::fetch_test_case_results(submission_id, pool).await {
        Ok(results) => results,
        Err(e) => return external_error(e, "retrieve test case results"),
    };

    log::info!(
        "Submission {submission_id} by {} for problem {problem_id}: {}",
        identity.user_id,
        stored.status
    );

    HttpResponse::Ok().json(ExecuteResponse {
        accepted: verdict.accepted,
        submission: stored,
        test_cases,
    })
}
