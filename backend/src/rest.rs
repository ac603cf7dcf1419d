//! # REST Surface
//!
//! One database endpoint dispatching on an `action` discriminator, a
//! multipart upload endpoint, and a raw file download path. Database
//! responses always answer HTTP 200 and carry their outcome in the
//! `success`/`error` envelope; only the binary download path uses HTTP
//! status codes.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{ApiResponse, BillPatch, NewBill};
use std::sync::Arc;
use tracing::{error, info};

use crate::storage::{AssetError, AssetStore, JsonFileStore, SyncService};

const ERR_UNRECOGNIZED_ACTION: &str = "Ação não reconhecida";
const ERR_INTERNAL: &str = "Erro interno do servidor";
const ERR_BILL_NOT_FOUND: &str = "Boleto não encontrado";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SyncService>,
    pub files: JsonFileStore,
    pub assets: AssetStore,
}

impl AppState {
    pub fn new(store: Arc<SyncService>, files: JsonFileStore, assets: AssetStore) -> Self {
        Self {
            store,
            files,
            assets,
        }
    }

    /// Bootstrap before every database action: file layout plus default
    /// accounts. A no-op after the first successful run.
    async fn ensure_ready(&self) -> anyhow::Result<()> {
        self.files.bootstrap()?;
        self.store.ensure_default_users().await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/database", get(database_get).post(database_post))
        .route("/api/upload", post(upload_file))
        .route("/api/files/:nome", get(download_file))
        .with_state(state)
}

/// Query parameters for the read-side database actions.
#[derive(Deserialize, Debug)]
pub struct DatabaseQuery {
    pub action: Option<String>,
    #[serde(rename = "usuarioId")]
    pub usuario_id: Option<String>,
    pub username: Option<String>,
}

/// Write-side database actions, dispatched on the `action` field.
#[derive(Deserialize, Debug)]
#[serde(tag = "action")]
pub enum DatabaseCommand {
    #[serde(rename = "adicionarBoleto")]
    AddBill { boleto: NewBill },
    #[serde(rename = "atualizarBoleto")]
    UpdateBill { id: String, updates: BillPatch },
    #[serde(rename = "removerBoleto")]
    RemoveBill { id: String },
    #[serde(rename = "criarUsuario")]
    CreateUser { username: String, password: String },
}

/// Handler for GET /api/database
pub async fn database_get(
    State(state): State<AppState>,
    Query(query): Query<DatabaseQuery>,
) -> Json<ApiResponse<Value>> {
    info!("GET /api/database - action: {:?}", query.action);

    if let Err(e) = state.ensure_ready().await {
        error!("bootstrap failed: {:#}", e);
        return Json(ApiResponse::err(ERR_INTERNAL));
    }

    match (query.action.as_deref(), query.usuario_id, query.username) {
        (Some("buscarBoletos"), Some(usuario_id), _) => {
            match state.store.list_bills(&usuario_id).await {
                Ok(bills) => Json(ApiResponse::ok(json!(bills))),
                Err(e) => {
                    error!("error listing bills: {:#}", e);
                    Json(ApiResponse::err(ERR_INTERNAL))
                }
            }
        }
        (Some("buscarUsuario"), _, Some(username)) => {
            match state.store.find_user(&username).await {
                Ok(user) => Json(ApiResponse::ok(json!(user))),
                Err(e) => {
                    error!("error finding user: {:#}", e);
                    Json(ApiResponse::err(ERR_INTERNAL))
                }
            }
        }
        (Some("inicializar"), _, _) => Json(ApiResponse::ok_message("Banco inicializado")),
        _ => Json(ApiResponse::err(ERR_UNRECOGNIZED_ACTION)),
    }
}

/// Handler for POST /api/database
pub async fn database_post(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Json<ApiResponse<Value>> {
    if let Err(e) = state.ensure_ready().await {
        error!("bootstrap failed: {:#}", e);
        return Json(ApiResponse::err(ERR_INTERNAL));
    }

    let command: DatabaseCommand = match serde_json::from_value(body) {
        Ok(command) => command,
        Err(e) => {
            info!("unrecognized database command: {}", e);
            return Json(ApiResponse::err(ERR_UNRECOGNIZED_ACTION));
        }
    };
    info!("POST /api/database - command: {:?}", command);

    match command {
        DatabaseCommand::AddBill { boleto } => match state.store.add_bill(boleto).await {
            Ok(bill) => Json(ApiResponse::ok(json!(bill))),
            Err(e) => {
                error!("error adding bill: {:#}", e);
                Json(ApiResponse::err(ERR_INTERNAL))
            }
        },
        DatabaseCommand::UpdateBill { id, updates } => {
            match state.store.update_bill(&id, &updates).await {
                Ok(true) => Json(ApiResponse::ok_empty()),
                Ok(false) => Json(ApiResponse::err(ERR_BILL_NOT_FOUND)),
                Err(e) => {
                    error!("error updating bill: {:#}", e);
                    Json(ApiResponse::err(ERR_INTERNAL))
                }
            }
        }
        DatabaseCommand::RemoveBill { id } => match state.store.remove_bill(&id).await {
            Ok(true) => Json(ApiResponse::ok_empty()),
            Ok(false) => Json(ApiResponse::err(ERR_BILL_NOT_FOUND)),
            Err(e) => {
                error!("error removing bill: {:#}", e);
                Json(ApiResponse::err(ERR_INTERNAL))
            }
        },
        DatabaseCommand::CreateUser { username, password } => {
            match state.store.create_user(&username, &password).await {
                Ok(user) => Json(ApiResponse::ok(json!(user))),
                Err(e) => {
                    error!("error creating user: {:#}", e);
                    Json(ApiResponse::err(ERR_INTERNAL))
                }
            }
        }
    }
}

/// Handler for POST /api/upload — multipart with an `action` of
/// `salvarArquivo`, the file bytes and a target filename.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Json<ApiResponse<Value>> {
    let mut action: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                info!("malformed multipart payload: {}", e);
                return Json(ApiResponse::err("Arquivo inválido"));
            }
        };
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("action") => action = field.text().await.ok(),
            Some("nomeArquivo") => file_name = field.text().await.ok(),
            Some("arquivo") => {
                if file_name.is_none() {
                    file_name = field.file_name().map(|n| n.to_string());
                }
                bytes = field.bytes().await.ok().map(|b| b.to_vec());
            }
            _ => {}
        }
    }

    if action.as_deref() != Some("salvarArquivo") {
        return Json(ApiResponse::err(ERR_UNRECOGNIZED_ACTION));
    }
    let (Some(name), Some(bytes)) = (file_name, bytes) else {
        return Json(ApiResponse::err("Arquivo inválido"));
    };

    info!("POST /api/upload - {} ({} bytes)", name, bytes.len());
    match state.assets.save(&name, &bytes) {
        Ok(()) => Json(ApiResponse::ok(json!({ "arquivo": name }))),
        Err(e) => {
            error!("error saving asset: {}", e);
            Json(ApiResponse::err("Erro ao salvar arquivo"))
        }
    }
}

/// Handler for GET /api/files/:nome — raw bytes with a derived content
/// type, or 404.
pub async fn download_file(State(state): State<AppState>, Path(nome): Path<String>) -> Response {
    info!("GET /api/files/{}", nome);

    match state.assets.load(&nome) {
        Ok((bytes, mime)) => ([(header::CONTENT_TYPE, mime)], bytes).into_response(),
        Err(AssetError::NotFound(_)) | Err(AssetError::InvalidName(_)) => {
            (StatusCode::NOT_FOUND, "Arquivo não encontrado").into_response()
        }
        Err(e) => {
            error!("error reading asset: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Erro ao ler arquivo").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::MemoryKeyValue;
    use crate::storage::CacheStore;
    use tempfile::TempDir;

    fn setup_test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let files = JsonFileStore::new(temp_dir.path());
        let cache = CacheStore::new(Arc::new(MemoryKeyValue::default()));
        let store = Arc::new(SyncService::new(Arc::new(files.clone()), cache));
        let assets = AssetStore::new(files.assets_dir());
        (AppState::new(store, files, assets), temp_dir)
    }

    fn get_query(action: &str, usuario_id: Option<&str>, username: Option<&str>) -> DatabaseQuery {
        DatabaseQuery {
            action: Some(action.to_string()),
            usuario_id: usuario_id.map(|s| s.to_string()),
            username: username.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn inicializar_reports_success() {
        let (state, _temp_dir) = setup_test_state();

        let response =
            database_get(State(state), Query(get_query("inicializar", None, None))).await;
        assert!(response.0.success);
        assert_eq!(response.0.message.as_deref(), Some("Banco inicializado"));
    }

    #[tokio::test]
    async fn add_then_list_through_the_handlers() {
        let (state, _temp_dir) = setup_test_state();

        let body = json!({
            "action": "adicionarBoleto",
            "boleto": {
                "name": "Internet",
                "amount": 99.9,
                "dueDate": "2025-04-02",
                "paid": false,
                "ownerId": "user-1"
            }
        });
        let created = database_post(State(state.clone()), Json(body)).await;
        assert!(created.0.success);
        let bill_id = created.0.data.as_ref().unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(!bill_id.is_empty());

        let listed = database_get(
            State(state),
            Query(get_query("buscarBoletos", Some("user-1"), None)),
        )
        .await;
        assert!(listed.0.success);
        let bills = listed.0.data.unwrap();
        assert_eq!(bills.as_array().unwrap().len(), 1);
        assert_eq!(bills[0]["id"], json!(bill_id));
    }

    #[tokio::test]
    async fn seeded_login_is_visible_through_the_handler() {
        let (state, _temp_dir) = setup_test_state();

        let response = database_get(
            State(state),
            Query(get_query("buscarUsuario", None, Some("aecreboque"))),
        )
        .await;
        assert!(response.0.success);
        assert_eq!(response.0.data.unwrap()["password"], json!("123"));
    }

    #[tokio::test]
    async fn unknown_actions_fail_without_an_http_error() {
        let (state, _temp_dir) = setup_test_state();

        let get_response = database_get(
            State(state.clone()),
            Query(get_query("inexistente", None, None)),
        )
        .await;
        assert!(!get_response.0.success);
        assert_eq!(
            get_response.0.error.as_deref(),
            Some(ERR_UNRECOGNIZED_ACTION)
        );

        let post_response =
            database_post(State(state), Json(json!({ "action": "inexistente" }))).await;
        assert!(!post_response.0.success);
    }

    #[tokio::test]
    async fn updating_a_missing_bill_reports_not_found() {
        let (state, _temp_dir) = setup_test_state();

        let body = json!({
            "action": "atualizarBoleto",
            "id": "missing",
            "updates": { "paid": true }
        });
        let response = database_post(State(state), Json(body)).await;
        assert!(!response.0.success);
        assert_eq!(response.0.error.as_deref(), Some(ERR_BILL_NOT_FOUND));
    }

    #[tokio::test]
    async fn download_serves_saved_assets_with_content_type() {
        let (state, _temp_dir) = setup_test_state();

        state.assets.save("fatura.pdf", b"%PDF-fake").unwrap();

        let found = download_file(State(state.clone()), Path("fatura.pdf".to_string()))
            .await
            .into_response();
        assert_eq!(found.status(), StatusCode::OK);
        assert_eq!(
            found.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );

        let missing = download_file(State(state), Path("missing.pdf".to_string()))
            .await
            .into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
