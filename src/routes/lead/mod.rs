//! src/routes/lead/mod.rs

mod emails;
mod post;

use actix_web::http::header::{self, ContentType};
use actix_web::HttpResponse;

pub use post::{submit_lead, LeadError, LeadForm};

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .insert_header((header::ALLOW, "POST, OPTIONS"))
        .content_type(ContentType::plaintext())
        .body("Method Not Allowed")
}
