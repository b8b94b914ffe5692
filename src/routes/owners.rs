use actix_session::Session;
use actix_web::{get, http::StatusCode, post, web, HttpResponse, Responder};

use super::{base_context, page, redirect};
use crate::{
    auth::{push_flash, Admin},
    db,
    errors::AppError,
    forms::{FieldErrors, OwnerForm},
    AppState,
};

fn form_page(
    state: &AppState,
    admin: &Admin,
    session: &Session,
    status: StatusCode,
    form: &OwnerForm,
    errors: &FieldErrors,
    owner_id: Option<i64>,
) -> Result<HttpResponse, AppError> {
    let title = if owner_id.is_some() {
        "Modifier le propriétaire"
    } else {
        "Ajouter un propriétaire"
    };
    let mut context = base_context(state, Some(admin), session, title);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("owner_id", &owner_id);
    page(status, "owners/form.html", &context)
}

#[get("/owners")]
pub async fn list_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let owners = db::get_all_owners(&state).await.map_err(|e| {
        log::error!("Failed to get owners: {}", e);
        AppError::from(e)
    })?;
    let mut context = base_context(&state, Some(&admin), &session, "Propriétaires");
    context.insert("owners", &owners);
    page(StatusCode::OK, "owners/list.html", &context)
}

#[get("/owners/new")]
pub async fn new_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    form_page(
        &state,
        &admin,
        &session,
        StatusCode::OK,
        &OwnerForm::default(),
        &FieldErrors::default(),
        None,
    )
}

#[post("/owners/new")]
pub async fn create_handler(
    admin: Admin,
    web::Form(form): web::Form<OwnerForm>,
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    match form.clean() {
        Ok(owner) => {
            let owner = db::create_owner(&state, owner).await?;
            push_flash(&session, &format!("Propriétaire « {} » ajouté.", owner.name))?;
            Ok(redirect("/owners"))
        }
        Err(errors) => form_page(
            &state,
            &admin,
            &session,
            StatusCode::BAD_REQUEST,
            &form,
            &errors,
            None,
        ),
    }
}

#[get("/owners/{id}/edit")]
pub async fn edit_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let owner = db::get_owner_by_id(&state, path.into_inner()).await?;
    form_page(
        &state,
        &admin,
        &session,
        StatusCode::OK,
        &OwnerForm::from_owner(&owner),
        &FieldErrors::default(),
        Some(owner.id),
    )
}

#[post("/owners/{id}/edit")]
pub async fn update_handler(
    admin: Admin,
    web::Form(form): web::Form<OwnerForm>,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let id = db::get_owner_by_id(&state, path.into_inner()).await?.id;
    match form.clean() {
        Ok(owner) => {
            let owner = db::update_owner(&state, id, owner).await?;
            push_flash(&session, &format!("Propriétaire « {} » modifié.", owner.name))?;
            Ok(redirect("/owners"))
        }
        Err(errors) => form_page(
            &state,
            &admin,
            &session,
            StatusCode::BAD_REQUEST,
            &form,
            &errors,
            Some(id),
        ),
    }
}

#[get("/owners/{id}/delete")]
pub async fn confirm_delete_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let owner = db::get_owner_by_id(&state, path.into_inner()).await?;
    let tenants = db::get_tenants(&state, Some(owner.id)).await?;
    let mut context = base_context(&state, Some(&admin), &session, "Supprimer le propriétaire");
    context.insert("owner", &owner);
    context.insert("tenants", &tenants);
    page(StatusCode::OK, "owners/delete.html", &context)
}

#[post("/owners/{id}/delete")]
pub async fn delete_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let owner = db::get_owner_by_id(&state, path.into_inner()).await?;
    db::delete_owner(&state, owner.id).await?;
    push_flash(&session, &format!("Propriétaire « {} » supprimé.", owner.name))?;
    Ok(redirect("/owners"))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::header, test};

    use super::*;
    use crate::routes::tests::{app_state, init, login};

    #[actix_web::test]
    async fn create_edit_delete_owner() {
        let state = app_state().await;
        let app = init(state.clone()).await;
        let cookie = login(&app).await;

        let req = test::TestRequest::post()
            .uri("/owners/new")
            .cookie(cookie.clone())
            .set_form([("name", "Kouassi"), ("phone", "")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/owners");

        let owner = db::get_all_owners(&state).await.unwrap().remove(0);
        assert_eq!(owner.phone, "0000000000");

        let req = test::TestRequest::post()
            .uri(&format!("/owners/{}/edit", owner.id))
            .cookie(cookie.clone())
            .set_form([("name", "Kouassi Jean"), ("phone", "0700000000")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            db::get_owner_by_id(&state, owner.id).await.unwrap().name,
            "Kouassi Jean"
        );

        let req = test::TestRequest::post()
            .uri(&format!("/owners/{}/delete", owner.id))
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(db::get_all_owners(&state).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn invalid_owner_rerenders_form() {
        let app = init(app_state().await).await;
        let cookie = login(&app).await;

        let req = test::TestRequest::post()
            .uri("/owners/new")
            .cookie(cookie)
            .set_form([("name", ""), ("phone", "abc")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Ce champ est obligatoire."));
        assert!(body.contains("Numéro de téléphone invalide."));
    }
}
