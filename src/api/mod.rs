mod attendance;
pub mod auth;
mod dashboard;
mod employees;
pub mod error;
pub mod extract;
mod leave;
mod messages;
mod notifications;
mod org;
mod settings;
pub mod validation;

use axum::{
    http::{header, Method},
    routing::{delete, get, patch, post, put},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub use error::{ApiError, ErrorCode};

/// Plain `{ "message": ... }` acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/change-password", post(auth::change_password))
        .route("/me", get(auth::me))
        .route("/bootstrap", get(auth::bootstrap));

    let attendance_routes = Router::new()
        .route("/", get(attendance::list_own).post(attendance::create_manual))
        .route("/checkin", post(attendance::check_in))
        .route("/checkout", post(attendance::check_out))
        .route("/today", get(attendance::today))
        .route("/corrections/mine", get(attendance::my_corrections))
        .route("/corrections/pending", get(attendance::all_corrections))
        .route("/corrections/:id/review", post(attendance::review_correction))
        .route("/:id", put(attendance::admin_edit))
        .route("/:id/note", post(attendance::set_note))
        .route("/:id/request-correction", post(attendance::request_correction));

    let leave_routes = Router::new()
        .route("/requests", get(leave::list_requests))
        .route("/balance", get(leave::balance))
        .route("/request", post(leave::request_leave))
        .route("/approve/:id", post(leave::approve))
        .route("/reject/:id", post(leave::reject));

    let employee_routes = Router::new()
        .route("/", get(employees::list))
        .route("/summary", get(employees::summary))
        .route("/:id", get(employees::get_employee).patch(employees::update))
        .route("/:id/attendance", get(employees::attendance));

    let dashboard_routes = Router::new()
        .route("/stats", get(dashboard::stats))
        .route("/activity", get(dashboard::activity))
        .route("/admin/stats", get(dashboard::admin_stats))
        .route("/admin/today-breakdown", get(dashboard::today_breakdown))
        .route("/admin/activity", get(dashboard::admin_activity))
        .route("/admin/not-checked-in-today", get(dashboard::not_checked_in_today))
        .route("/admin/top-employees", get(dashboard::top_employees));

    let message_routes = Router::new()
        .route("/unread-count", get(messages::unread_count))
        .route("/conversations", get(messages::conversations))
        .route("/:id", get(messages::thread).post(messages::send))
        .route("/:id/read", put(messages::mark_read));

    let org_routes = Router::new()
        .route("/schedule", get(org::get_schedule).put(org::update_schedule))
        .route("/holidays", get(org::list_holidays).post(org::create_holiday))
        .route("/holidays/:id", delete(org::delete_holiday))
        .route("/special-days", get(org::list_special_days).post(org::create_special_day))
        .route("/special-days/:id", delete(org::delete_special_day))
        .route("/departments", get(org::list_departments).post(org::create_department))
        .route(
            "/departments/:id",
            patch(org::update_department).delete(org::delete_department),
        )
        .route("/zones", get(org::list_zones).post(org::create_zone))
        .route("/zones/:id", patch(org::update_zone).delete(org::delete_zone))
        .route("/roles", get(org::list_roles).post(org::create_role))
        .route("/roles/:id", patch(org::update_role).delete(org::delete_role));

    let notification_routes = Router::new()
        .route("/", get(notifications::list))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", put(notifications::mark_all_read))
        .route("/broadcast", post(notifications::broadcast))
        .route("/:id", delete(notifications::delete))
        .route("/:id/read", put(notifications::mark_read));

    let settings_routes = Router::new()
        .route("/", get(settings::get_settings).put(settings::update_settings))
        .route("/apply-leave-defaults", post(settings::apply_leave_defaults));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/attendance", attendance_routes)
        .nest("/leave", leave_routes)
        .nest("/employees", employee_routes)
        .nest("/dashboard", dashboard_routes)
        .nest("/messages", message_routes)
        .nest("/org", org_routes)
        .nest("/notifications", notification_routes)
        .nest("/settings", settings_routes);

    // Same-origin in production; this is for the SPA dev server
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .allow_origin(tower_http::cors::AllowOrigin::mirror_request());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
