use super::*;

#[put("/problems/{id}")]
pub async fn put_problem_handler(
    orchestrator: web::Data<Orchestrator>,
    pool: web::Data<SqlitePool>,
    shutdown: web::Data<CancellationToken>,
    path: web::Path<(i64,)>,
    identity: Identity,
    body: web::Json<ProblemBody>,
) -> impl Responder {
    if let Some(rejection) = identity.require_admin() {
        return rejection;
    }
    let problem_id = path.into_inner().0;

    match db::find_problem(problem_id, pool.clone().into_inner()).await {
        Ok(true) => {}
        Ok(false) => {
            log::info!("Put nothing because problem {problem_id} was not found");
            return not_found(format!("Problem {problem_id} not found."));
        }
        Err(e) => return external_error(e, "validate if problem exists"),
    }

    if let Some(rejection) = validate_references(&body, &orchestrator, &shutdown).await {
        return rejection;
    }

    match db::update_problem(problem_id, &body, pool.into_inner()).await {
        Ok(problem) => {
            log::info!("Updated problem {problem_id}");
            HttpResponse::Ok().json(problem)
        }
        // Deleted while its reference solutions were being judged
        Err(sqlx::Error::RowNotFound) => HttpResponse::Conflict().json(ErrorResponseWithMessage {
            reason: "ERR_INVALID_STATE",
            code: 2,
            message: format!("Problem {problem_id} was removed during validation."),
        }),
        Err(e) => external_error(e, "update problem"),
    }
}
