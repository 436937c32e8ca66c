use actix_web::{http::StatusCode, web::ServiceConfig};

use super::helpers::get_request;
use crate::routes::health;

fn configure(cfg: &mut ServiceConfig) {
    cfg.service(health);
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/health", &[], configure).await.expect("Failed to make request");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}
