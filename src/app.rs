use std::any::Any;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use crate::errors::AppError;
use crate::handlers;
use crate::middleware::require_token;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let data_routes = Router::new()
        .route(
            "/api/data",
            get(handlers::get_data)
                .post(handlers::save_data)
                .fallback(handlers::not_found),
        )
        .route_layer(from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route(
            "/api/register",
            post(handlers::handle_register).fallback(handlers::not_found),
        )
        .route(
            "/api/login",
            post(handlers::handle_login).fallback(handlers::not_found),
        )
        .merge(data_routes)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.server.max_body_size))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

// Preflight requests are answered here, before routing.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    AppError::internal("Internal server error")(detail).into_response()
}
