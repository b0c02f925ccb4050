use actix_web::{App, HttpServer, dev::Server, middleware, web};
use sqlx::sqlite::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::judge::Orchestrator;
use crate::routes::*;

/// Registers every route together with the extractor error handlers
///
/// `/problems/solved` must come before `/problems/{id}`.
pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(execute_handler)
        .service(post_problem_handler)
        .service(get_problems_handler)
        .service(get_solved_problems_handler)
        .service(get_problem_by_id_handler)
        .service(put_problem_handler)
        .service(delete_problem_handler)
        .service(get_submissions_handler)
        .service(get_submissions_by_problem_handler)
        .service(get_submission_count_handler)
        .service(post_playlist_handler)
        .service(get_playlists_handler)
        .service(get_playlist_by_id_handler)
        .service(post_playlist_problems_handler)
        .service(delete_playlist_problems_handler)
        .service(delete_playlist_handler)
        .service(get_languages_handler);
}

pub fn build_server(
    server_config: ServerConfig,
    orchestrator: Orchestrator,
    db_pool: SqlitePool,
    shutdown: CancellationToken,
) -> std::io::Result<Server> {
    let db_pool = web::Data::new(db_pool);
    let orchestrator = web::Data::new(orchestrator);
    let shutdown = web::Data::new(shutdown);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(db_pool.clone())
            .app_data(orchestrator.clone())
            .app_data(shutdown.clone())
            .wrap(middleware::Logger::default())
            .configure(app_config)
    })
    .bind((
        server_config
            .bind_address
            .unwrap_or("127.0.0.1".to_string()),
        server_config.bind_port.unwrap_or(12345),
    ))?
    .run();

    Ok(server)
}
