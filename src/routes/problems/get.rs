use super::*;

#[get("/problems")]
pub async fn get_problems_handler(pool: web::Data<SqlitePool>, _identity: Identity) -> impl Responder {
    match db::fetch_problems(pool.into_inner()).await {
        Ok(problems) => {
            log::info!("Got {} problems", problems.len());
            HttpResponse::Ok().json(problems)
        }
        Err(e) => external_error(e, "retrieve problems"),
    }
}

#[get("/problems/solved")]
pub async fn get_solved_problems_handler(
    pool: web::Data<SqlitePool>,
    identity: Identity,
) -> impl Responder {
    match db::fetch_solved_problems(&identity.user_id, pool.into_inner()).await {
        Ok(problems) => HttpResponse::Ok().json(problems),
        Err(e) => external_error(e, "retrieve solved problems"),
    }
}

#[get("/problems/{id}")]
pub async fn get_problem_by_id_handler(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64,)>,
    _identity: Identity,
) -> impl Responder {
    let problem_id = path.into_inner().0;

    match db::fetch_problem(problem_id, pool.into_inner()).await {
        Ok(problem) => HttpResponse::Ok().json(problem),
        Err(sqlx::Error::RowNotFound) => not_found(format!("Problem {problem_id} not found.")),
        Err(e) => external_error(e, "retrieve problem"),
    }
}
