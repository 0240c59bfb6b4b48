use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

pub mod auth;
pub mod db_models;
pub mod db_utils;
pub mod export;
pub mod insertable;
pub mod lifecycle;
pub mod messages;
pub mod notifications;
pub mod pg_handling;
pub mod redis_handling;
pub mod sweeper;

pub mod auth_route;
pub mod dishes_route;
pub mod notifications_route;
pub mod parameters_route;
pub mod reservations_route;
pub mod reviews_route;
pub mod schedule_route;
pub mod users_route;

#[get("/")]
pub async fn home_page() -> impl Responder {
    HttpResponse::Ok().body("Canteen reservation service")
}

#[get("/health")]
pub async fn healthcheck() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Every route of the API; literal segments are registered before `/{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(home_page)
        .service(healthcheck)
        .service(
            web::scope("/auth")
                .service(auth_route::register_user)
                .service(auth_route::obtain_token)
                .service(auth_route::refresh_token)
                .service(auth_route::logout)
                .service(auth_route::me),
        )
        .service(
            web::scope("/users")
                .service(users_route::fetch_users)
                .service(users_route::create_user)
                .service(users_route::fetch_me)
                .service(users_route::update_me)
                .service(users_route::fetch_user)
                .service(users_route::update_user)
                .service(users_route::delete_user),
        )
        .service(
            web::scope("/dishes")
                .service(dishes_route::fetch_dishes)
                .service(dishes_route::create_dish)
                .service(dishes_route::get_dish)
                .service(dishes_route::update_dish)
                .service(dishes_route::delete_dish),
        )
        .service(
            web::scope("/schedule")
                .service(schedule_route::fetch_slots)
                .service(schedule_route::create_slot)
                .service(schedule_route::schedule_week)
                .service(schedule_route::get_slot)
                .service(schedule_route::update_slot)
                .service(schedule_route::delete_slot),
        )
        .service(
            web::scope("/reservations")
                .service(reservations_route::fetch_reservations)
                .service(reservations_route::create_reservation)
                .service(reservations_route::export_reservations)
                .service(reservations_route::bulk_change_status)
                .service(reservations_route::get_reservation)
                .service(reservations_route::change_status)
                .service(reservations_route::cancel_reservation),
        )
        .service(
            web::scope("/notifications")
                .service(notifications_route::fetch_notifications)
                .service(notifications_route::get_notification)
                .service(notifications_route::mark_read)
                .service(notifications_route::delete_notification),
        )
        .service(
            web::scope("/reviews")
                .service(reviews_route::fetch_reviews)
                .service(reviews_route::create_review)
                .service(reviews_route::bulk_approve)
                .service(reviews_route::bulk_reject)
                .service(reviews_route::get_review)
                .service(reviews_route::approve_review)
                .service(reviews_route::reject_review)
                .service(reviews_route::delete_review),
        )
        .service(
            web::scope("/parameters")
                .service(parameters_route::fetch_parameters)
                .service(parameters_route::create_parameter)
                .service(parameters_route::get_parameter)
                .service(parameters_route::update_parameter)
                .service(parameters_route::delete_parameter),
        );
}

#[cfg(test)]
mod tests {
    use actix::SyncArbiter;
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::http::StatusCode;
    use actix_web::web::Data;
    use actix_web::{test, App};
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::PgConnection;

    use super::*;
    use crate::config::AuthSettings;
    use crate::services::db_utils::{AppState, PgActor};

    /// State whose backends are never contacted by the requests under test.
    fn offline_state() -> Data<AppState> {
        let manager = ConnectionManager::<PgConnection>::new("postgres://offline@127.0.0.1:1/canteen");
        let pool = Pool::builder().max_size(1).build_unchecked(manager);
        let pg_db = SyncArbiter::start(1, move || PgActor(pool.clone()));
        let redis_db = redis::Client::open("redis://127.0.0.1:1/").unwrap();

        Data::new(AppState {
            pg_db,
            redis_db,
            auth: AuthSettings { access_ttl_secs: 900, refresh_ttl_secs: 86400 },
        })
    }

    #[actix_web::test]
    async fn health_and_banner_need_no_credentials() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(configure)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn protected_routes_reject_missing_tokens() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(configure)).await;

        for uri in ["/dishes", "/reservations", "/notifications", "/parameters", "/auth/me", "/users/me"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[actix_web::test]
    async fn malformed_authorization_header_is_rejected() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/schedule")
            .insert_header((AUTHORIZATION, "Token abc"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn login_requires_both_fields() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/auth/token/obtain")
            .set_json(json!({ "username": "awa@example.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "password": ["This field is required."] }));
    }
}
