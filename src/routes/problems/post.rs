use super::*;

#[post("/problems")]
pub async fn post_problem_handler(
    orchestrator: web::Data<Orchestrator>,
    pool: web::Data<SqlitePool>,
    shutdown: web::Data<CancellationToken>,
    identity: Identity,
    body: web::Json<ProblemBody>,
) -> impl Responder {
    if let Some(rejection) = identity.require_admin() {
        return rejection;
    }

    if let Some(rejection) = validate_references(&body, &orchestrator, &shutdown).await {
        return rejection;
    }

    match db::create_problem(&body, &identity.user_id, pool.into_inner()).await {
        Ok(problem) => {
            log::info!("Created problem {} by {}", problem.id, identity.user_id);
            HttpResponse::Created().json(problem)
        }
        Err(e) => external_error(e, "insert problem into database"),
    }
}
