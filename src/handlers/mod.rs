pub mod cascade_handler;
pub mod exam_handler;
pub mod health_handler;

use actix_web::web;

pub use cascade_handler::{delete_class, delete_exam, delete_subject, delete_teacher, delete_topic};
pub use exam_handler::{
    add_result, bulk_add_results, create_exam, delete_result, finalize_exam, get_exam,
    get_report, list_results,
};
pub use health_handler::{health_check, health_check_ready};

/// Registers every route. Shared by the server and the route tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(health_check_ready)
        .service(create_exam)
        .service(bulk_add_results)
        .service(list_results)
        .service(add_result)
        .service(finalize_exam)
        .service(get_report)
        .service(get_exam)
        .service(delete_exam)
        .service(delete_result)
        .service(delete_class)
        .service(delete_subject)
        .service(delete_topic)
        .service(delete_teacher);
}
