use std::sync::Arc;

use actix_web::{delete, web, HttpResponse};

use crate::{app_state::AppState, errors::AppError};

#[delete("/api/exams/{id}")]
pub async fn delete_exam(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let report = state.cascade_service.delete_exam(&id).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[delete("/api/classes/{id}")]
pub async fn delete_class(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let report = state.cascade_service.delete_class(&id).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[delete("/api/subjects/{id}")]
pub async fn delete_subject(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let report = state.cascade_service.delete_subject(&id).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[delete("/api/topics/{id}")]
pub async fn delete_topic(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let report = state.cascade_service.delete_topic(&id).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// `id` is the teacher profile id.
#[delete("/api/teachers/{id}")]
pub async fn delete_teacher(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let report = state.cascade_service.delete_teacher(&id).await?;
    Ok(HttpResponse::Ok().json(report))
}
