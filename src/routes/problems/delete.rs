use super::*;

#[delete("/problems/{id}")]
pub async fn delete_problem_handler(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64,)>,
    identity: Identity,
) -> impl Responder {
    if let Some(rejection) = identity.require_admin() {
        return rejection;
    }
    let problem_id = path.into_inner().0;

    match db::delete_problem(problem_id, pool.into_inner()).await {
        Ok(true) => {
            log::info!("Deleted problem {problem_id}");
            HttpResponse::Ok().finish()
        }
        Ok(false) => not_found(format!("Problem {problem_id} not found.")),
        Err(e) => external_error(e, "delete problem"),
    }
}
