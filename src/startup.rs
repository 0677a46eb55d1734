//! src/startup.rs

use std::net::TcpListener;
use actix_cors::Cors;
use actix_web::{HttpServer, App, web, dev::Server};
use actix_web::guard::{self, GuardContext};
use actix_web::http::{header, Method};
use actix_web::middleware::Logger;
use crate::email_client::LeadMailer;
use crate::routes::{health_check, method_not_allowed, submit_lead};

pub fn run(
    listener: TcpListener,
    mailer: LeadMailer,
    allowed_origin: String,
) -> Result<Server, std::io::Error> {
    let mailer = web::Data::new(mailer);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .route("/health_check", web::get().to(health_check))
            // `Cors` answers every OPTIONS as a preflight and rejects one without
            // Access-Control-Request-Method with a 400, so bare OPTIONS requests
            // are routed past it to the second resource and get a 405.
            .service(
                web::resource("/api/lead")
                    .guard(guard::fn_guard(is_not_bare_options))
                    .route(web::post().to(submit_lead))
                    .default_service(web::to(method_not_allowed))
                    .wrap(lead_cors(&allowed_origin)),
            )
            .service(web::resource("/api/lead").to(method_not_allowed))
            .app_data(mailer.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}

fn lead_cors(allowed_origin: &str) -> Cors {
    let cors = if allowed_origin == "*" {
        Cors::default().allow_any_origin().send_wildcard()
    } else {
        Cors::default().allowed_origin(allowed_origin)
    };
    cors.allowed_methods(["POST"])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(86400)
}

fn is_not_bare_options(ctx: &GuardContext<'_>) -> bool {
    let head = ctx.head();
    head.method != Method::OPTIONS
        || head.headers().contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}
