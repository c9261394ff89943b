pub mod auth;
pub mod products;
pub mod roles;
pub mod sales;
pub mod users;

use axum::extract::FromRequest;
use axum::routing::{get, post};
use axum::Router;

use crate::error::AppError;
use crate::state::SharedState;

/// `Json<T>` whose rejection is an [`AppError`], so malformed bodies get the
/// same error payload as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        // Users
        .route("/api/v1/users", get(users::list).post(users::create))
        .route(
            "/api/v1/users/{id}",
            get(users::get).patch(users::update).delete(users::delete),
        )
        // Roles
        .route("/api/v1/roles", get(roles::list).post(roles::create))
        .route("/api/v1/roles/{id}", get(roles::get))
        // Products
        .route("/api/v1/products", get(products::list).post(products::create))
        .route(
            "/api/v1/products/{id}",
            get(products::get)
                .patch(products::update)
                .delete(products::delete),
        )
        // Sales
        .route("/api/v1/sales", get(sales::list).post(sales::create))
        .route("/api/v1/sales/{id}", get(sales::get))
}
