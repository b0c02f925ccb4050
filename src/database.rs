use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};

use crate::judge::{OverallVerdict, SubmissionSummary};
use crate::routes::{
    Difficulty, PlaylistProblem, PlaylistRecord, ProblemBody, ProblemRecord, SubmissionRecord,
    TestCaseResultRecord,
};

const DATABASE_NAME: &str = "judgehub.sqlite3";

pub fn get_db_path() -> anyhow::Result<PathBuf> {
    use anyhow::{Context, anyhow};
    use directories::ProjectDirs;

    let proj_dirs = ProjectDirs::from("", "", "judgehub")
        .ok_or_else(|| anyhow!("Unable to find user directory"))?;
    let data_dir = proj_dirs.data_local_dir();

    fs::create_dir_all(data_dir).context("Failed to create local data dir")?;

    Ok(data_dir.join(DATABASE_NAME))
}

pub async fn init_db(db_path: impl AsRef<Path>) -> sqlx::Result<SqlitePool> {
    let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display()); // rwc = read/write/create
    let db_pool = SqlitePoolOptions::new()
        .max_connections(4)
        .min_connections(0)
        .connect(&db_url)
        .await?;

    // PRAGMA statements cannot run inside a transaction
    for pragma_sql in &[
        "PRAGMA foreign_keys = ON;",
        "PRAGMA busy_timeout = 2000;",
        "PRAGMA journal_mode = WAL;",
        "PRAGMA synchronous = NORMAL;",
    ] {
        sqlx::query(pragma_sql).execute(&db_pool).await?;
    }

    let mut tx = db_pool.begin().await?;

    for sql in &[
        r"
        CREATE TABLE IF NOT EXISTS problems (
            id                   INTEGER  PRIMARY KEY AUTOINCREMENT,
            user_id              TEXT     NOT NULL,
            title                TEXT     NOT NULL,
            description          TEXT     NOT NULL,
            difficulty           TEXT     NOT NULL,
            tags                 TEXT     NOT NULL,
            examples             TEXT     NOT NULL,
            constraints          TEXT     NOT NULL,
            hints                TEXT,
            editorial            TEXT,
            code_snippets        TEXT     NOT NULL,
            test_cases           TEXT     NOT NULL,
            reference_solutions  TEXT     NOT NULL,
            created_time         TEXT     NOT NULL,
            updated_time         TEXT     NOT NULL
        );",
        r"
        CREATE TABLE IF NOT EXISTS submissions (
            id              INTEGER  PRIMARY KEY AUTOINCREMENT,
            user_id         TEXT     NOT NULL,
            problem_id      INTEGER  NOT NULL,
            source_code     TEXT     NOT NULL,
            language        TEXT     NOT NULL,
            stdin           TEXT     NOT NULL,
            stdout          TEXT     NOT NULL,
            stderr          TEXT,
            compile_output  TEXT,
            status          TEXT     NOT NULL,
            memory          TEXT,
            time            TEXT,
            created_time    TEXT     NOT NULL,
            FOREIGN KEY (problem_id) REFERENCES problems (id) ON DELETE CASCADE
        );",
        "CREATE INDEX IF NOT EXISTS idx_submissions_user ON submissions(user_id, problem_id);",
        r"
        CREATE TABLE IF NOT EXISTS test_case_results (
            submission_id    INTEGER  NOT NULL,
            test_case        INTEGER  NOT NULL,
            passed           INTEGER  NOT NULL,
            stdout           TEXT,
            expected_output  TEXT,
            stderr           TEXT,
            compile_output   TEXT,
            status           TEXT     NOT NULL,
            memory           TEXT,
            time             TEXT,
            PRIMARY KEY (submission_id, test_case),
            FOREIGN KEY (submission_id) REFERENCES submissions (id) ON DELETE CASCADE
        );",
        r"
        CREATE TABLE IF NOT EXISTS problem_solved (
            user_id       TEXT     NOT NULL,
            problem_id    INTEGER  NOT NULL,
            created_time  TEXT     NOT NULL,
            PRIMARY KEY (user_id, problem_id),
            FOREIGN KEY (problem_id) REFERENCES problems (id) ON DELETE CASCADE
        );",
        r"
        CREATE TABLE IF NOT EXISTS playlists (
            id            INTEGER  PRIMARY KEY AUTOINCREMENT,
            user_id       TEXT     NOT NULL,
            name          TEXT     NOT NULL,
            description   TEXT,
            created_time  TEXT     NOT NULL,
            UNIQUE (name, user_id)
        );",
        r"
        CREATE TABLE IF NOT EXISTS problems_in_playlist (
            playlist_id   INTEGER  NOT NULL,
            problem_id    INTEGER  NOT NULL,
            PRIMARY KEY (playlist_id, problem_id),
            FOREIGN KEY (playlist_id) REFERENCES playlists (id) ON DELETE CASCADE,
            FOREIGN KEY (problem_id)  REFERENCES problems (id)  ON DELETE CASCADE
        );",
    ] {
        sqlx::query(sql).execute(tx.as_mut()).await?;
    }

    tx.commit().await?;

    log::info!("Initialized database at {}", db_path.as_ref().display());

    Ok(db_pool)
}

pub fn remove_db(db_path: impl AsRef<Path>) {
    // WAL and SHM files might not exist
    let wal_path = format!("{}-wal", db_path.as_ref().display());
    let shm_path = format!("{}-shm", db_path.as_ref().display());
    let _ = fs::remove_file(wal_path);
    let _ = fs::remove_file(shm_path);

    if let Err(e) = std::fs::remove_file(&db_path) {
        log::warn!(
            "Unable to remove database at {}: {e}",
            db_path.as_ref().display()
        );
    } else {
        log::info!("Removed database at {}", db_path.as_ref().display());
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> sqlx::Result<String> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

fn from_json<T: serde::de::DeserializeOwned>(column: &str) -> sqlx::Result<T> {
    serde_json::from_str(column).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

// ======= PROBLEMS =======

#[derive(sqlx::FromRow)]
struct ProblemRow {
    id: i64,
    user_id: String,
    title: String,
    description: String,
    difficulty: String,
    tags: String,
    examples: String,
    constraints: String,
    hints: Option<String>,
    editorial: Option<String>,
    code_snippets: String,
    test_cases: String,
    reference_solutions: String,
    created_time: String,
    updated_time: String,
}

impl TryFrom<ProblemRow> for ProblemRecord {
    type Error = sqlx::Error;

    fn try_from(row: ProblemRow) -> sqlx::Result<Self> {
        let difficulty = Difficulty::from_db(&row.difficulty).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown difficulty {}", row.difficulty).into())
        })?;

        Ok(ProblemRecord {
            id: row.id,
            user_id: row.user_id,
            created_time: row.created_time,
            updated_time: row.updated_time,
            body: ProblemBody {
                title: row.title,
                description: row.description,
                difficulty,
                tags: from_json(&row.tags)?,
                examples: from_json(&row.examples)?,
                constraints: row.constraints,
                hints: row.hints,
                editorial: row.editorial,
                code_snippets: from_json(&row.code_snippets)?,
                test_cases: from_json(&row.test_cases)?,
                reference_solutions: from_json(&row.reference_solutions)?,
            },
        })
    }
}

const PROBLEM_COLUMNS: &str = "p.id, p.user_id, p.title, p.description, p.difficulty, p.tags, \
     p.examples, p.constraints, p.hints, p.editorial, p.code_snippets, p.test_cases, \
     p.reference_solutions, p.created_time, p.updated_time";

pub async fn create_problem(
    body: &ProblemBody,
    user_id: &str,
    pool: Arc<SqlitePool>,
) -> sqlx::Result<ProblemRecord> {
    let now = crate::create_timestamp();

    let result = sqlx::query(
        r#"
        INSERT INTO problems (user_id, title, description, difficulty, tags, examples, constraints,
                              hints, editorial, code_snippets, test_cases, reference_solutions,
                              created_time, updated_time)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&body.title)
    .bind(&body.description)
    .bind(body.difficulty.as_str())
    .bind(to_json(&body.tags)?)
    .bind(to_json(&body.examples)?)
    .bind(&body.constraints)
    .bind(&body.hints)
    .bind(&body.editorial)
    .bind(to_json(&body.code_snippets)?)
    .bind(to_json(&body.test_cases)?)
    .bind(to_json(&body.reference_solutions)?)
    .bind(&now)
    .bind(&now)
    .execute(pool.as_ref())
    .await?;

    fetch_problem(result.last_insert_rowid(), pool).await
}

pub async fn find_problem(id: i64, pool: Arc<SqlitePool>) -> sqlx::Result<bool> {
    let result = sqlx::query("SELECT 1 FROM problems WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.as_ref())
        .await?;

    Ok(result.is_some())
}

pub async fn fetch_problem(id: i64, pool: Arc<SqlitePool>) -> sqlx::Result<ProblemRecord> {
    log::debug!("Trying to fetch problem {id} from database");

    let row = sqlx::query_as::<_, ProblemRow>(&format!(
        "SELECT {PROBLEM_COLUMNS} FROM problems p WHERE p.id = ?"
    ))
    .bind(id)
    .fetch_one(pool.as_ref())
    .await?;

    row.try_into()
}

pub async fn fetch_problems(pool: Arc<SqlitePool>) -> sqlx::Result<Vec<ProblemRecord>> {
    sqlx::query_as::<_, ProblemRow>(&format!(
        "SELECT {PROBLEM_COLUMNS} FROM problems p ORDER BY p.id"
    ))
    .fetch_all(pool.as_ref())
    .await?
    .into_iter()
    .map(ProblemRecord::try_from)
    .collect()
}

pub async fn fetch_solved_problems(
    user_id: &str,
    pool: Arc<SqlitePool>,
) -> sqlx::Result<Vec<ProblemRecord>> {
    sqlx::query_as::<_, ProblemRow>(&format!(
        "SELECT {PROBLEM_COLUMNS} FROM problems p \
         JOIN problem_solved s ON s.problem_id = p.id \
         WHERE s.user_id = ? ORDER BY s.created_time"
    ))
    .bind(user_id)
    .fetch_all(pool.as_ref())
    .await?
    .into_iter()
    .map(ProblemRecord::try_from)
    .collect()
}

pub async fn update_problem(
    id: i64,
    body: &ProblemBody,
    pool: Arc<SqlitePool>,
) -> sqlx::Result<ProblemRecord> {
    let now = crate::create_timestamp();

    let updated = sqlx::query(
        r#"
        UPDATE problems
        SET title = ?, description = ?, difficulty = ?, tags = ?, examples = ?, constraints = ?,
            hints = ?, editorial = ?, code_snippets = ?, test_cases = ?, reference_solutions = ?,
            updated_time = ?
        WHERE id = ?
        "#,
    )
    .bind(&body.title)
    .bind(&body.description)
    .bind(body.difficulty.as_str())
    .bind(to_json(&body.tags)?)
    .bind(to_json(&body.examples)?)
    .bind(&body.constraints)
    .bind(&body.hints)
    .bind(&body.editorial)
    .bind(to_json(&body.code_snippets)?)
    .bind(to_json(&body.test_cases)?)
    .bind(to_json(&body.reference_solutions)?)
    .bind(&now)
    .bind(id)
    .execute(pool.as_ref())
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    fetch_problem(id, pool).await
}

/// Returns whether a problem was deleted
pub async fn delete_problem(id: i64, pool: Arc<SqlitePool>) -> sqlx::Result<bool> {
    let deleted = sqlx::query("DELETE FROM problems WHERE id = ?")
        .bind(id)
        .execute(pool.as_ref())
        .await?
        .rows_affected();

    Ok(deleted > 0)
}

// ======= SUBMISSIONS =======

/// What the caller submitted, before judging
pub struct NewSubmission<'a> {
    pub user_id: &'a str,
    pub problem_id: i64,
    pub source_code: &'a str,
    pub language: &'a str,
    pub stdin: &'a [String],
}

/// Stores a judged submission with one row per test case.
///
/// An accepted submission also marks the problem as solved by the user.
///
/// # Errors
///
/// Fails if any insertion fails; nothing is stored in that case.
pub async fn save_submission(
    submission: &NewSubmission<'_>,
    verdict: &OverallVerdict,
    pool: Arc<SqlitePool>,
) -> sqlx::Result<i64> {
    let now = crate::create_timestamp();
    let summary = SubmissionSummary::from_verdict(verdict);

    let mut tx = pool.begin().await?;

    let submission_id = sqlx::query(
        r#"
        INSERT INTO submissions (user_id, problem_id, source_code, language, stdin, stdout, stderr,
                                 compile_output, status, memory, time, created_time)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(submission.user_id)
    .bind(submission.problem_id)
    .bind(submission.source_code)
    .bind(submission.language)
    .bind(submission.stdin.join("\n"))
    .bind(&summary.stdout)
    .bind(&summary.stderr)
    .bind(&summary.compile_output)
    .bind(summary.status.as_str())
    .bind(&summary.memory)
    .bind(&summary.time)
    .bind(&now)
    .execute(tx.as_mut())
    .await?
    .last_insert_rowid();

    for case in &verdict.test_cases {
        sqlx::query(
            r#"
            INSERT INTO test_case_results (submission_id, test_case, passed, stdout, expected_output,
                                           stderr, compile_output, status, memory, time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(submission_id)
        .bind(case.test_case)
        .bind(case.passed)
        .bind(&case.stdout)
        .bind(&case.expected)
        .bind(&case.stderr)
        .bind(&case.compile_output)
        .bind(&case.status)
        .bind(&case.memory)
        .bind(&case.time)
        .execute(tx.as_mut())
        .await?;
    }

    if verdict.accepted {
        sqlx::query(
            "INSERT OR IGNORE INTO problem_solved (user_id, problem_id, created_time) VALUES (?, ?, ?)",
        )
        .bind(submission.user_id)
        .bind(submission.problem_id)
        .bind(&now)
        .execute(tx.as_mut())
        .await?;
    }

    tx.commit().await?;
    Ok(submission_id)
}

const SUBMISSION_COLUMNS: &str = "id, user_id, problem_id, source_code, language, stdin, stdout, \
     stderr, compile_output, status, memory, time, created_time";

pub async fn fetch_submission(id: i64, pool: Arc<SqlitePool>) -> sqlx::Result<SubmissionRecord> {
    sqlx::query_as::<_, SubmissionRecord>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(pool.as_ref())
    .await
}

pub async fn fetch_test_case_results(
    submission_id: i64,
    pool: Arc<SqlitePool>,
) -> sqlx::Result<Vec<TestCaseResultRecord>> {
    sqlx::query_as::<_, TestCaseResultRecord>(
        r#"
        SELECT test_case, passed, stdout, expected_output, stderr, compile_output, status, memory, time
        FROM test_case_results
        WHERE submission_id = ?
        ORDER BY test_case
        "#,
    )
    .bind(submission_id)
    .fetch_all(pool.as_ref())
    .await
}

pub async fn fetch_submissions(
    user_id: &str,
    problem_id: Option<i64>,
    pool: Arc<SqlitePool>,
) -> sqlx::Result<Vec<SubmissionRecord>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE user_id = "
    ));
    qb.push_bind(user_id);
    if let Some(problem_id) = problem_id {
        qb.push(" AND problem_id = ").push_bind(problem_id);
    }
    qb.push(" ORDER BY id");

    qb.build_query_as::<SubmissionRecord>()
        .fetch_all(pool.as_ref())
        .await
}

pub async fn count_submissions(problem_id: i64, pool: Arc<SqlitePool>) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions WHERE problem_id = ?")
        .bind(problem_id)
        .fetch_one(pool.as_ref())
        .await
}

// ======= PLAYLISTS =======

#[derive(sqlx::FromRow)]
struct PlaylistRow {
    id: i64,
    user_id: String,
    name: String,
    description: Option<String>,
    created_time: String,
}

#[derive(sqlx::FromRow)]
struct PlaylistProblemRow {
    playlist_id: i64,
    id: i64,
    title: String,
    difficulty: String,
}

pub async fn create_playlist(
    name: &str,
    description: Option<&str>,
    user_id: &str,
    pool: Arc<SqlitePool>,
) -> sqlx::Result<PlaylistRecord> {
    let now = crate::create_timestamp();

    let id = sqlx::query(
        "INSERT INTO playlists (user_id, name, description, created_time) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(name)
    .bind(description)
    .bind(&now)
    .execute(pool.as_ref())
    .await?
    .last_insert_rowid();

    Ok(PlaylistRecord {
        id,
        user_id: user_id.to_string(),
        name: name.to_string(),
        description: description.map(str::to_string),
        created_time: now,
        problems: Vec::new(),
    })
}

/// Fetches the playlists owned by `user_id`, optionally only the one with `id`
pub async fn fetch_playlists(
    user_id: &str,
    id: Option<i64>,
    pool: Arc<SqlitePool>,
) -> sqlx::Result<Vec<PlaylistRecord>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, user_id, name, description, created_time FROM playlists WHERE user_id = ",
    );
    qb.push_bind(user_id);
    if let Some(id) = id {
        qb.push(" AND id = ").push_bind(id);
    }
    qb.push(" ORDER BY id");

    let playlists = qb
        .build_query_as::<PlaylistRow>()
        .fetch_all(pool.as_ref())
        .await?;

    let problems = sqlx::query_as::<_, PlaylistProblemRow>(
        r#"
        SELECT pp.playlist_id, p.id, p.title, p.difficulty
        FROM problems_in_playlist pp
        JOIN problems p ON p.id = pp.problem_id
        JOIN playlists pl ON pl.id = pp.playlist_id
        WHERE pl.user_id = ?
        ORDER BY p.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool.as_ref())
    .await?;

    playlists
        .into_iter()
        .map(|row| {
            let problems = problems
                .iter()
                .filter(|p| p.playlist_id == row.id)
                .map(|p| {
                    Ok(PlaylistProblem {
                        id: p.id,
                        title: p.title.clone(),
                        difficulty: Difficulty::from_db(&p.difficulty).ok_or_else(|| {
                            sqlx::Error::Decode(
                                format!("unknown difficulty {}", p.difficulty).into(),
                            )
                        })?,
                    })
                })
                .collect::<sqlx::Result<Vec<_>>>()?;

            Ok(PlaylistRecord {
                id: row.id,
                user_id: row.user_id,
                name: row.name,
                description: row.description,
                created_time: row.created_time,
                problems,
            })
        })
        .collect()
}

pub async fn find_playlist(id: i64, user_id: &str, pool: Arc<SqlitePool>) -> sqlx::Result<bool> {
    let result = sqlx::query("SELECT 1 FROM playlists WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool.as_ref())
        .await?;

    Ok(result.is_some())
}

/// Returns the number of problems newly added; problems already present are skipped
pub async fn add_problems_to_playlist(
    playlist_id: i64,
    problem_ids: &[i64],
    pool: Arc<SqlitePool>,
) -> sqlx::Result<u64> {
    let mut tx = pool.begin().await?;
    let mut added = 0;

    for problem_id in problem_ids {
        added += sqlx::query(
            "INSERT OR IGNORE INTO problems_in_playlist (playlist_id, problem_id) VALUES (?, ?)",
        )
        .bind(playlist_id)
        .bind(problem_id)
        .execute(tx.as_mut())
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    Ok(added)
}

/// Returns the number of problems removed
pub async fn remove_problems_from_playlist(
    playlist_id: i64,
    problem_ids: &[i64],
    pool: Arc<SqlitePool>,
) -> sqlx::Result<u64> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("DELETE FROM problems_in_playlist WHERE playlist_id = ");
    qb.push_bind(playlist_id).push(" AND problem_id IN (");
    let mut separated = qb.separated(", ");
    for problem_id in problem_ids {
        separated.push_bind(*problem_id);
    }
    separated.push_unseparated(")");

    let removed = qb.build().execute(pool.as_ref()).await?.rows_affected();
    Ok(removed)
}

/// Returns whether a playlist owned by `user_id` was deleted
pub async fn delete_playlist(id: i64, user_id: &str, pool: Arc<SqlitePool>) -> sqlx::Result<bool> {
    let deleted = sqlx::query("DELETE FROM playlists WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool.as_ref())
        .await?
        .rows_affected();

    Ok(deleted > 0)
}
