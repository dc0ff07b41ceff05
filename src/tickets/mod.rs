pub mod query;
pub mod stats;
pub mod store;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::StoreError;
use crate::shared::models::{Category, TicketComment, TicketRating, TicketView};
use crate::shared::state::AppState;
use crate::tickets::query::{ListParams, SortMode, TicketFilter};
use crate::tickets::stats::DashboardStats;
use crate::tickets::store::{NewTicket, TicketChanges};

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub user: Option<Uuid>,
    pub category: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub category: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub answer: Option<String>,
    pub is_answered: Option<bool>,
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRatingRequest {
    pub score: i32,
    #[serde(default)]
    pub rater_name: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TicketView>>, StoreError> {
    let mut conn = state.conn.get()?;
    let snapshot = store::load_snapshot(&mut conn)?;
    let filter = TicketFilter::from_params(&params, &snapshot.categories);
    let sort = SortMode::from_param(params.sort.as_deref());
    let views = store::attach_average_ratings(snapshot.tickets, &snapshot.ratings);
    Ok(Json(query::run(views, &filter, sort)))
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketView>), StoreError> {
    let mut conn = state.conn.get()?;
    let ticket = store::create_ticket(
        &mut conn,
        NewTicket {
            user_id: req.user,
            category_id: req.category,
            kind: req.kind,
            priority: req.priority,
            name: req.name,
            email: req.email,
            subject: req.subject,
            message: req.message,
            is_anonymous: req.is_anonymous,
        },
    )?;
    Ok((
        StatusCode::CREATED,
        Json(TicketView {
            ticket,
            average_rating: None,
        }),
    ))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketView>, StoreError> {
    let mut conn = state.conn.get()?;
    let ticket = store::get_ticket(&mut conn, id)?;
    let average_rating = store::average_rating_for(&mut conn, id)?;
    Ok(Json(TicketView {
        ticket,
        average_rating,
    }))
}

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTicketRequest>,
) -> Result<Json<TicketView>, StoreError> {
    let mut conn = state.conn.get()?;
    let ticket = store::update_ticket(
        &mut conn,
        id,
        TicketChanges {
            category_id: req.category,
            kind: req.kind,
            priority: req.priority,
            status: req.status,
            name: req.name,
            email: req.email,
            subject: req.subject,
            message: req.message,
            answer: req.answer,
            is_answered: req.is_answered,
            is_anonymous: req.is_anonymous,
        },
    )?;
    let average_rating = store::average_rating_for(&mut conn, id)?;
    Ok(Json(TicketView {
        ticket,
        average_rating,
    }))
}

pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StoreError> {
    let mut conn = state.conn.get()?;
    store::delete_ticket(&mut conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<TicketView>, StoreError> {
    let mut conn = state.conn.get()?;
    let ticket = store::set_status(&mut conn, id, &req.status)?;
    let average_rating = store::average_rating_for(&mut conn, id)?;
    Ok(Json(TicketView {
        ticket,
        average_rating,
    }))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TicketComment>>, StoreError> {
    let mut conn = state.conn.get()?;
    Ok(Json(store::list_comments(&mut conn, id)?))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<TicketComment>), StoreError> {
    let mut conn = state.conn.get()?;
    let comment = store::add_comment(&mut conn, id, &req.author_name, &req.body)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_ratings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TicketRating>>, StoreError> {
    let mut conn = state.conn.get()?;
    Ok(Json(store::list_ratings(&mut conn, id)?))
}

pub async fn add_rating(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateRatingRequest>,
) -> Result<(StatusCode, Json<TicketRating>), StoreError> {
    let mut conn = state.conn.get()?;
    let rating = store::add_rating(&mut conn, id, req.score, &req.rater_name, &req.comment)?;
    Ok((StatusCode::CREATED, Json(rating)))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, StoreError> {
    let mut conn = state.conn.get()?;
    Ok(Json(store::list_categories(&mut conn)?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), StoreError> {
    let mut conn = state.conn.get()?;
    let category = store::create_category(&mut conn, &req.name)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StoreError> {
    let mut conn = state.conn.get()?;
    store::delete_category(&mut conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardStats>, StoreError> {
    let mut conn = state.conn.get()?;
    let snapshot = store::load_snapshot(&mut conn)?;
    Ok(Json(stats::compute(&snapshot)))
}

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route(
            "/api/tickets/:id",
            get(get_ticket)
                .put(update_ticket)
                .patch(update_ticket)
                .delete(delete_ticket),
        )
        .route("/api/tickets/:id/status", put(change_status))
        .route(
            "/api/tickets/:id/comments",
            get(list_comments).post(add_comment),
        )
        .route(
            "/api/tickets/:id/ratings",
            get(list_ratings).post(add_rating),
        )
        .route(
            "/api/categories",
            get(list_categories).post(create_category),
        )
        .route("/api/categories/:id", axum::routing::delete(delete_category))
        .route("/api/dashboard/stats", get(dashboard_stats))
}
