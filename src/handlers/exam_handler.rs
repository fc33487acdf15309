use std::sync::Arc;

use actix_web::{delete, get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::{AddExamResultRequest, BulkResultRow, CreateExamRequest, FinalizeExamRequest},
};

#[post("/api/exams")]
pub async fn create_exam(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateExamRequest>,
) -> Result<HttpResponse, AppError> {
    let exam = state.exam_service.create_exam(&request).await?;
    Ok(HttpResponse::Created().json(exam))
}

#[get("/api/exams/{id}")]
pub async fn get_exam(
    state: web::Data<Arc<AppState>>,
    exam_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let detail = state.exam_service.get_exam_detail(&exam_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[post("/api/exams/{id}/results")]
pub async fn add_result(
    state: web::Data<Arc<AppState>>,
    exam_id: web::Path<String>,
    request: web::Json<AddExamResultRequest>,
) -> Result<HttpResponse, AppError> {
    let result = state
        .exam_result_service
        .add_result(&exam_id, &request)
        .await?;
    Ok(HttpResponse::Created().json(result))
}

#[post("/api/exams/{id}/results/bulk")]
pub async fn bulk_add_results(
    state: web::Data<Arc<AppState>>,
    exam_id: web::Path<String>,
    rows: web::Json<Vec<BulkResultRow>>,
) -> Result<HttpResponse, AppError> {
    let outcome = state.exam_result_service.bulk_add(&exam_id, &rows).await?;
    Ok(HttpResponse::Created().json(outcome))
}

#[get("/api/exams/{id}/results")]
pub async fn list_results(
    state: web::Data<Arc<AppState>>,
    exam_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let results = state.exam_result_service.list_results(&exam_id).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[delete("/api/exam-results/{id}")]
pub async fn delete_result(
    state: web::Data<Arc<AppState>>,
    result_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.exam_result_service.delete_result(&result_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/exams/{id}/finalize")]
pub async fn finalize_exam(
    state: web::Data<Arc<AppState>>,
    exam_id: web::Path<String>,
    request: Option<web::Json<FinalizeExamRequest>>,
) -> Result<HttpResponse, AppError> {
    let request = request.map(|r| r.into_inner()).unwrap_or_default();
    let outcome = state.exam_service.finalize(&exam_id, &request).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[get("/api/exams/{id}/reports/{student_id}")]
pub async fn get_report(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (exam_id, student_id) = path.into_inner();
    let report = state.exam_service.get_report(&exam_id, &student_id).await?;
    Ok(HttpResponse::Ok().json(report))
}
