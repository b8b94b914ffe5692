use actix_identity::Identity;
use actix_session::Session;
use actix_web::{get, http::StatusCode, post, web, HttpMessage, HttpRequest, Responder};

use super::{base_context, page, redirect};
use crate::{
    auth::{push_flash, Admin},
    db,
    errors::AppError,
    forms::{FieldErrors, LoginForm, SettingsForm},
    utils, AppState,
};

#[get("/login")]
pub async fn login_handler(
    state: web::Data<AppState>,
    identity: Option<Identity>,
    session: Session,
) -> Result<impl Responder, AppError> {
    if identity.is_some() {
        return Ok(redirect("/"));
    }
    let context = base_context(&state, None, &session, "Connexion");
    page(StatusCode::OK, "login.html", &context)
}

#[post("/login")]
pub async fn login_form_handler(
    web::Form(form): web::Form<LoginForm>,
    state: web::Data<AppState>,
    session: Session,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        push_flash(&session, "Tous les champs sont obligatoires.")?;
        return Ok(redirect("/login"));
    }

    let account = db::find_admin_by_username(&state, username).await.map_err(|e| {
        log::error!("Failed to look up admin account: {}", e);
        AppError::from(e)
    })?;

    let verified = match &account {
        Some(account) => utils::verify_password(&form.password, &account.pwd_hash)?,
        None => false,
    };
    let Some(account) = account.filter(|_| verified) else {
        log::warn!("Failed login attempt for username {:?}", username);
        push_flash(&session, "Nom d'utilisateur ou mot de passe incorrect.")?;
        return Ok(redirect("/login"));
    };

    session.renew();
    Identity::login(&request.extensions(), account.username.clone())
        .map_err(|e| AppError::IdentityError(e.to_string()))?;
    log::info!("Admin {} logged in", account.username);
    Ok(redirect("/"))
}

#[post("/logout")]
pub async fn logout_handler(identity: Option<Identity>) -> impl Responder {
    if let Some(identity) = identity {
        identity.logout();
    }
    redirect("/login")
}

#[get("/settings")]
pub async fn settings_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let mut context = base_context(&state, Some(&admin), &session, "Paramètres");
    context.insert(
        "form",
        &SettingsForm {
            username: admin.username.clone(),
            ..SettingsForm::default()
        },
    );
    context.insert("errors", &FieldErrors::default());
    page(StatusCode::OK, "settings.html", &context)
}

#[post("/settings")]
pub async fn settings_form_handler(
    admin: Admin,
    web::Form(form): web::Form<SettingsForm>,
    state: web::Data<AppState>,
    session: Session,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let account = db::find_admin_by_username(&state, &admin.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let validated = form.clean(&account.username).and_then(|change| {
        match utils::verify_password(&form.current_password, &account.pwd_hash) {
            Ok(true) => Ok(change),
            _ => {
                let mut errors = FieldErrors::default();
                errors.add("current_password", "Mot de passe actuel incorrect.");
                Err(errors)
            }
        }
    });

    let change = match validated {
        Ok(change) => change,
        Err(errors) => {
            let mut context = base_context(&state, Some(&admin), &session, "Paramètres");
            context.insert("form", &form);
            context.insert("errors", &errors);
            return page(StatusCode::BAD_REQUEST, "settings.html", &context);
        }
    };

    let pwd_hash = change
        .password
        .as_deref()
        .map(utils::hash_password)
        .transpose()?;
    let renamed = change.username.is_some();
    let account = db::update_admin(&state, account.id, change.username, pwd_hash)
        .await
        .map_err(|e| {
            log::error!("Failed to update admin account: {}", e);
            AppError::from(e)
        })?;

    if renamed {
        Identity::login(&request.extensions(), account.username.clone())
            .map_err(|e| AppError::IdentityError(e.to_string()))?;
    }
    log::info!("Settings updated for admin {}", account.username);
    push_flash(&session, "Paramètres enregistrés.")?;
    Ok(redirect("/settings"))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::header, test};

    use crate::routes::tests::{app_state, init, login, PASSWORD};

    use super::*;

    #[actix_web::test]
    async fn settings_change_password() {
        let state = app_state().await;
        let app = init(state.clone()).await;
        let cookie = login(&app).await;

        let req = test::TestRequest::post()
            .uri("/settings")
            .cookie(cookie.clone())
            .set_form([
                ("username", "admin"),
                ("current_password", PASSWORD),
                ("password", "un-nouveau-secret"),
                ("password2", "un-nouveau-secret"),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/settings");

        let account = db::find_admin_by_username(&state, "admin")
            .await
            .unwrap()
            .unwrap();
        assert!(utils::verify_password("un-nouveau-secret", &account.pwd_hash).unwrap());
    }

    #[actix_web::test]
    async fn settings_require_current_password() {
        let app = init(app_state().await).await;
        let cookie = login(&app).await;

        let req = test::TestRequest::post()
            .uri("/settings")
            .cookie(cookie)
            .set_form([
                ("username", "admin"),
                ("current_password", "faux"),
                ("password", "un-nouveau-secret"),
                ("password2", "un-nouveau-secret"),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn logout_ends_session() {
        let app = init(app_state().await).await;
        let cookie = login(&app).await;

        let req = test::TestRequest::post()
            .uri("/logout")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");

        let cleared = resp
            .response()
            .cookies()
            .find(|c| c.name() == "id")
            .map(|c| c.into_owned())
            .unwrap();
        let req = test::TestRequest::get()
            .uri("/")
            .cookie(cleared)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    }
}
