use actix_session::Session;
use actix_web::{
    http::{header, StatusCode},
    web, HttpRequest, HttpResponse,
};
use serde::Serialize;
use tera::Context;

use crate::{auth, auth::Admin, errors::AppError, report::MONTHS_FR, AppState, TEMPLATES};

mod account;
mod api;
mod cities;
mod home;
mod owners;
mod payments;
mod reports;
mod tenants;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(account::login_handler)
        .service(account::login_form_handler)
        .service(account::logout_handler)
        .service(account::settings_handler)
        .service(account::settings_form_handler)
        .service(home::index_handler)
        .service(home::dashboard_handler)
        .service(reports::dashboard_pdf_handler)
        .service(reports::global_report_handler)
        .service(reports::invoice_handler)
        .service(reports::owner_report_handler)
        .service(owners::list_handler)
        .service(owners::new_handler)
        .service(owners::create_handler)
        .service(owners::edit_handler)
        .service(owners::update_handler)
        .service(owners::confirm_delete_handler)
        .service(owners::delete_handler)
        .service(tenants::list_handler)
        .service(tenants::new_handler)
        .service(tenants::create_handler)
        .service(tenants::edit_handler)
        .service(tenants::update_handler)
        .service(tenants::confirm_delete_handler)
        .service(tenants::delete_handler)
        .service(payments::list_handler)
        .service(payments::new_handler)
        .service(payments::create_handler)
        .service(payments::edit_handler)
        .service(payments::update_handler)
        .service(payments::confirm_delete_handler)
        .service(payments::delete_handler)
        .service(cities::list_handler)
        .service(cities::create_handler)
        .service(cities::delete_handler)
        .service(api::tenant_rent_handler)
        .service(api::owner_tenants_handler);
}

#[derive(Serialize)]
struct MonthChoice {
    value: u32,
    name: &'static str,
}

fn month_choices() -> Vec<MonthChoice> {
    MONTHS_FR
        .iter()
        .zip(1..)
        .map(|(name, value)| MonthChoice { value, name })
        .collect()
}

/// Context shared by every page: agency, logged-in user, flash messages.
pub(crate) fn base_context(
    state: &AppState,
    admin: Option<&Admin>,
    session: &Session,
    title: &str,
) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("agency_name", &state.agency_name);
    context.insert("version", env!("CARGO_PKG_VERSION"));
    context.insert("identity", &admin.map(|a| a.username.as_str()));
    context.insert("flash", &auth::take_flash(session));
    context.insert("months", &month_choices());
    context
}

pub(crate) fn render(template: &str, context: &Context) -> Result<String, AppError> {
    TEMPLATES.render(template, context).map_err(|e| {
        log::error!("Failed to render template {}: {}", template, e);
        AppError::TemplateError(e)
    })
}

pub(crate) fn page(
    status: StatusCode,
    template: &str,
    context: &Context,
) -> Result<HttpResponse, AppError> {
    let rendered = render(template, context)?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(rendered))
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location))
        .finish()
}

pub(crate) fn pdf_response(filename: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .append_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(bytes)
}

/// File name safe for a Content-Disposition header.
pub(crate) fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "document".to_owned()
    } else {
        stem
    }
}

/// AJAX submissions get JSON answers instead of HTML pages.
pub(crate) fn wants_json(req: &HttpRequest) -> bool {
    let get = |name: header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned()
    };
    get(header::HeaderName::from_static("x-requested-with")).eq_ignore_ascii_case("XMLHttpRequest")
        || get(header::ACCEPT).contains("application/json")
}

#[cfg(test)]
pub(crate) mod tests {
    use actix_identity::IdentityMiddleware;
    use actix_session::{storage::CookieSessionStore, SessionMiddleware};
    use actix_web::{
        body::MessageBody,
        cookie::{Cookie, Key},
        dev::{Service, ServiceResponse},
        test as actix_test, App,
    };

    use super::*;
    use crate::{db, utils};

    pub const PASSWORD: &str = "motdepasse-solide";

    pub async fn app_state() -> AppState {
        let state = db::tests::test_state().await;
        db::create_admin(
            &state,
            "admin".to_owned(),
            utils::hash_password(PASSWORD).unwrap(),
        )
        .await
        .unwrap();
        state
    }

    pub async fn init(
        state: AppState,
    ) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
    {
        actix_test::init_service(
            App::new()
                .wrap(IdentityMiddleware::default())
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await
    }

    /// Logs in and returns the session cookie.
    pub async fn login<S, B>(app: &S) -> Cookie<'static>
    where
        S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let req = actix_test::TestRequest::post()
            .uri("/login")
            .set_form([("username", "admin"), ("password", PASSWORD)])
            .to_request();
        let resp = actix_test::call_service(app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");
        resp.response()
            .cookies()
            .find(|c| c.name() == "id")
            .map(|c| c.into_owned())
            .expect("session cookie")
    }

    #[test]
    fn file_stems_are_header_safe() {
        assert_eq!(file_stem("Koné \"Aya\""), "Kon___Aya_");
        assert_eq!(file_stem(""), "document");
    }

    #[actix_web::test]
    async fn anonymous_requests_redirect_to_login() {
        let app = init(app_state().await).await;
        for uri in ["/", "/dashboard", "/owners", "/payments", "/api/owners/1/tenants"] {
            let req = actix_test::TestRequest::get().uri(uri).to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
        }
    }

    #[actix_web::test]
    async fn wrong_password_redirects_back_to_login_with_flash() {
        let app = init(app_state().await).await;
        let req = actix_test::TestRequest::post()
            .uri("/login")
            .set_form([("username", "admin"), ("password", "nope")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");

        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == "id")
            .map(|c| c.into_owned())
            .unwrap();
        let req = actix_test::TestRequest::get()
            .uri("/login")
            .cookie(cookie)
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Nom d&#x27;utilisateur ou mot de passe incorrect."));
    }

    #[actix_web::test]
    async fn home_and_dashboard_render_after_login() {
        let app = init(app_state().await).await;
        let cookie = login(&app).await;
        for uri in ["/", "/dashboard?month=3", "/owners", "/tenants", "/payments", "/cities", "/settings"] {
            let req = actix_test::TestRequest::get()
                .uri(uri)
                .cookie(cookie.clone())
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn invalid_month_filter_is_a_bad_request() {
        let app = init(app_state().await).await;
        let cookie = login(&app).await;
        let req = actix_test::TestRequest::get()
            .uri("/dashboard?month=13")
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
