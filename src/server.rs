use std::sync::{Arc, Mutex};
use axum::{extract::State, routing::{get, post}, Router, Json};
use tower_http::cors::{CorsLayer, Any};
use serde::{Deserialize, Serialize};
use axum::http::StatusCode;
use tracing::{info, warn};
use crate::error::IntrospectError;
use crate::persist::{SqlClient, SqliteClient, QueryRows};

pub type SharedClient = Arc<Mutex<SqliteClient>>;

#[derive(Deserialize)]
pub struct QueryRequest {
    pub sql: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub status: String,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

pub fn router(client: SharedClient) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);
    Router::new()
        .route("/v1/query", post(query))
        .route("/v1/tables", get(tables))
        .with_state(client)
        .layer(cors)
}

fn run_query(client: &SharedClient, sql: &str) -> Result<QueryRows, IntrospectError> {
    let mut guard = client.lock().map_err(|e| IntrospectError::Lock(e.to_string()))?;
    guard.query(sql)
}

pub async fn query(
    State(client): State<SharedClient>,
    Json(req): Json<QueryRequest>,
) -> (StatusCode, Json<QueryResponse>) {
    // rusqlite is synchronous, so queries run on a blocking thread
    let started = std::time::Instant::now();
    let result = tokio::task::spawn_blocking(move || run_query(&client, &req.sql)).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "Join error");
            Err(IntrospectError::Lock(e.to_string()))
        }
    };
    match result {
        Ok(rows) => {
            info!(ms = elapsed_ms, rows = rows.rows.len(), "query complete");
            let body = QueryResponse {
                status: "ok".into(),
                elapsed_ms,
                columns: Some(rows.columns),
                row_count: Some(rows.rows.len()),
                rows: Some(rows.rows),
                error: None,
            };
            (StatusCode::OK, Json(body))
        }
        Err(e) => {
            let status = match e {
                IntrospectError::Persistence(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let msg = format!("{e}");
            warn!(%msg, code = %status.as_u16(), "query error");
            let body = QueryResponse { status: "error".into(), elapsed_ms, columns: None, row_count: None, rows: None, error: Some(msg) };
            (status, Json(body))
        }
    }
}

pub async fn tables(State(client): State<SharedClient>) -> Result<Json<TablesResponse>, (StatusCode, String)> {
    let guard = client
        .lock()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(TablesResponse { tables: guard.tables().to_vec() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PersistenceMode;

    fn shared() -> SharedClient {
        let mut client = SqliteClient::open(&PersistenceMode::InMemory).unwrap();
        client.execute_sync("create temp table steampipe_mod (resource_name text);\ninsert into steampipe_mod (resource_name) values('demo');", true).unwrap();
        client.load_schema().unwrap();
        Arc::new(Mutex::new(client))
    }

    #[tokio::test]
    async fn query_returns_rows() {
        let (status, Json(body)) = query(State(shared()), Json(QueryRequest { sql: "select resource_name from steampipe_mod".into() })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.columns.unwrap(), vec!["resource_name"]);
        assert_eq!(body.rows.unwrap(), vec![vec![serde_json::json!("demo")]]);
    }

    #[tokio::test]
    async fn bad_sql_is_a_client_error() {
        let (status, Json(body)) = query(State(shared()), Json(QueryRequest { sql: "select nope from nowhere".into() })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.status, "error");
        assert!(body.error.is_some());
    }

    #[tokio::test]
    async fn tables_lists_loaded_schema() {
        let Json(body) = tables(State(shared())).await.unwrap();
        assert_eq!(body.tables, vec!["steampipe_mod"]);
    }
}
