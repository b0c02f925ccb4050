use actix_web::{HttpResponse, Responder, delete, get, post, web};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use super::{Difficulty, ErrorResponseWithMessage, Identity, external_error, not_found};
use crate::database as db;

#[derive(Deserialize, Debug)]
pub struct PlaylistBody {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ProblemIdsBody {
    pub problem_ids: Vec<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlaylistProblem {
    pub id: i64,
    pub title: String,
    pub difficulty: Difficulty,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlaylistRecord {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_time: String,
    pub problems: Vec<PlaylistProblem>,
}

fn invalid_argument(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponseWithMessage {
        reason: "ERR_INVALID_ARGUMENT",
        code: 1,
        message: message.to_string(),
    })
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[post("/playlists")]
pub async fn post_playlist_handler(
    pool: web::Data<SqlitePool>,
    identity: Identity,
    body: web::Json<PlaylistBody>,
) -> impl Responder {
    let name = body.name.trim();
    if name.is_empty() {
        return invalid_argument("Playlist name must not be empty.");
    }

    match db::create_playlist(
        name,
        body.description.as_deref(),
        &identity.user_id,
        pool.into_inner(),
    )
    .await
    {
        Ok(playlist) => {
            log::info!("Created playlist {} for {}", playlist.id, identity.user_id);
            HttpResponse::Created().json(playlist)
        }
        Err(e) if is_unique_violation(&e) => {
            HttpResponse::BadRequest().json(ErrorResponseWithMessage {
                reason: "ERR_INVALID_ARGUMENT",
                code: 1,
                message: format!("Playlist {name} already exists."),
            })
        }
        Err(e) => external_error(e, "create playlist"),
    }
}

#[get("/playlists")]
pub async fn get_playlists_handler(
    pool: web::Data<SqlitePool>,
    identity: Identity,
) -> impl Responder {
    match db::fetch_playlists(&identity.user_id, None, pool.into_inner()).await {
        Ok(playlists) => HttpResponse::Ok().json(playlists),
        Err(e) => external_error(e, "retrieve playlists"),
    }
}

#[get("/playlists/{id}")]
pub async fn get_playlist_by_id_handler(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64,)>,
    identity: Identity,
) -> impl Responder {
    let playlist_id = path.into_inner().0;

    match db::fetch_playlists(&identity.user_id, Some(playlist_id), pool.into_inner()).await {
        Ok(mut playlists) => match playlists.pop() {
            Some(playlist) => HttpResponse::Ok().json(playlist),
            None => not_found(format!("Playlist {playlist_id} not found.")),
        },
        Err(e) => external_error(e, "retrieve playlist"),
    }
}

#[post("/playlists/{id}/problems")]
pub async fn post_playlist_problems_handler(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64,)>,
    identity: Identity,
    body: web::Json<ProblemIdsBody>,
) -> impl Responder {
    let playlist_id = path.into_inner().0;
    if body.problem_ids.is_empty() {
        return invalid_argument("Invalid or missing problem ids.");
    }

    match db::find_playlist(playlist_id, &identity.user_id, pool.clone().into_inner()).await {
        Ok(true) => {}
        Ok(false) => return not_found(format!("Playlist {playlist_id} not found.")),
        Err(e) => return external_error(e, "validate if playlist exists"),
    }

    for &problem_id in &body.problem_ids {
        match db::find_problem(problem_id, pool.clone().into_inner()).await {
            Ok(true) => {}
            Ok(false) => return not_found(format!("Problem {problem_id} not found.")),
            Err(e) => return external_error(e, "validate if problem exists"),
        }
    }

    match db::add_problems_to_playlist(playlist_id, &body.problem_ids, pool.into_inner()).await {
        Ok(added) => {
            log::info!("Added {added} problems to playlist {playlist_id}");
            HttpResponse::Created().json(serde_json::json!({ "added": added }))
        }
        Err(e) => external_error(e, "add problems to playlist"),
    }
}

#[delete("/playlists/{id}/problems")]
pub async fn delete_playlist_problems_handler(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64,)>,
    identity: Identity,
    body: web::Json<ProblemIdsBody>,
) -> impl Responder {
    let playlist_id = path.into_inner().0;
    if body.problem_ids.is_empty() {
        return invalid_argument("Invalid or missing problem ids.");
    }

    match db::find_playlist(playlist_id, &identity.user_id, pool.clone().into_inner()).await {
        Ok(true) => {}
        Ok(false) => return not_found(format!("Playlist {playlist_id} not found.")),
        Err(e) => return external_error(e, "validate if playlist exists"),
    }

    match db::remove_problems_from_playlist(playlist_id, &body.problem_ids, pool.into_inner())
        .await
    {
        Ok(removed) => HttpResponse::Ok().json(serde_json::json!({ "removed": removed })),
        Err(e) => external_error(e, "remove problems from playlist"),
    }
}

#[delete("/playlists/{id}")]
pub async fn delete_playlist_handler(
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64,)>,
    identity: Identity,
) -> impl Responder {
    let playlist_id = path.into_inner().0;

    match db::delete_playlist(playlist_id, &identity.user_id, pool.into_inner()).await {
        Ok(true) => {
            log::info!("Deleted playlist {playlist_id}");
            HttpResponse::Ok().finish()
        }
        Ok(false) => not_found(format!("Playlist {playlist_id} not found.")),
        Err(e) => external_error(e, "delete playlist"),
    }
}
