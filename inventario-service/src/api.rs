use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use diesel_async::{pooled_connection::bb8::Pool, AsyncPgConnection};
use serde::Serialize;
use uuid::Uuid;

use crate::handlers::{ActualizarInventario, CrearInventario, InventarioService, ServiceError};
use crate::models::{BodegaResumen, InventarioCompleto, ProductoResumen};

type DbPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/inventario", get(listar_inventario).post(crear_inventario))
        .route(
            "/api/inventario/:id",
            get(obtener_inventario)
                .put(actualizar_inventario)
                .delete(eliminar_inventario),
        )
        .route("/api/inventario/buscar/:termino", get(buscar_inventario))
        .route("/api/productos", get(listar_productos))
        .route("/api/bodegas", get(listar_bodegas))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

fn error_response(err: ServiceError) -> ApiError {
    let status = match err {
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::Store(_) | ServiceError::Pool(_) => {
            tracing::error!("error de almacenamiento: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

pub async fn listar_inventario(
    State(state): State<AppState>,
) -> Result<Json<Vec<InventarioCompleto>>, ApiError> {
    let service = InventarioService::new(state.pool);
    service.listar().await.map(Json).map_err(error_response)
}

pub async fn obtener_inventario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InventarioCompleto>, ApiError> {
    let service = InventarioService::new(state.pool);
    service.obtener(id).await.map(Json).map_err(error_response)
}

pub async fn buscar_inventario(
    State(state): State<AppState>,
    Path(termino): Path<String>,
) -> Result<Json<Vec<InventarioCompleto>>, ApiError> {
    let service = InventarioService::new(state.pool);
    service
        .buscar(&termino)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn crear_inventario(
    State(state): State<AppState>,
    Json(datos): Json<CrearInventario>,
) -> Result<Json<InventarioCompleto>, ApiError> {
    let service = InventarioService::new(state.pool);
    match service.crear(datos).await {
        Ok(item) => {
            tracing::info!("registro de inventario {} creado", item.id_inventario);
            Ok(Json(item))
        }
        Err(e) => Err(error_response(e)),
    }
}

pub async fn actualizar_inventario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(cambios): Json<ActualizarInventario>,
) -> Result<Json<InventarioCompleto>, ApiError> {
    let service = InventarioService::new(state.pool);
    service
        .actualizar(id, cambios)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn eliminar_inventario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let service = InventarioService::new(state.pool);
    match service.eliminar(id).await {
        Ok(()) => {
            tracing::info!("registro de inventario {} eliminado", id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(error_response(e)),
    }
}

pub async fn listar_productos(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductoResumen>>, ApiError> {
    let service = InventarioService::new(state.pool);
    service
        .listar_productos()
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn listar_bodegas(
    State(state): State<AppState>,
) -> Result<Json<Vec<BodegaResumen>>, ApiError> {
    let service = InventarioService::new(state.pool);
    service
        .listar_bodegas()
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn health_check() -> &'static str {
    "OK"
}
