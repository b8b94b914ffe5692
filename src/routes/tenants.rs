use actix_session::Session;
use actix_web::{get, http::StatusCode, post, web, HttpResponse, Responder};

use super::{base_context, page, redirect};
use crate::{
    auth::{push_flash, Admin},
    db,
    errors::AppError,
    forms::{FieldErrors, TenantForm},
    structs::Owner,
    AppState,
};

#[derive(serde::Deserialize)]
pub struct NewTenantQuery {
    owner: Option<i64>,
}

#[allow(clippy::too_many_arguments)]
fn form_page(
    state: &AppState,
    admin: &Admin,
    session: &Session,
    status: StatusCode,
    form: &TenantForm,
    errors: &FieldErrors,
    owners: &[Owner],
    tenant_id: Option<i64>,
) -> Result<HttpResponse, AppError> {
    let title = if tenant_id.is_some() {
        "Modifier le locataire"
    } else {
        "Ajouter un locataire"
    };
    let mut context = base_context(state, Some(admin), session, title);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("owners", owners);
    context.insert("tenant_id", &tenant_id);
    page(status, "tenants/form.html", &context)
}

#[get("/tenants")]
pub async fn list_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let tenants = db::get_tenant_views(&state).await.map_err(|e| {
        log::error!("Failed to get tenants: {}", e);
        AppError::from(e)
    })?;
    let mut context = base_context(&state, Some(&admin), &session, "Locataires");
    context.insert("tenants", &tenants);
    page(StatusCode::OK, "tenants/list.html", &context)
}

#[get("/tenants/new")]
pub async fn new_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<NewTenantQuery>,
) -> Result<impl Responder, AppError> {
    let owners = db::get_all_owners(&state).await?;
    let form = TenantForm {
        owner_id: query.owner.map(|id| id.to_string()).unwrap_or_default(),
        ..TenantForm::default()
    };
    form_page(
        &state,
        &admin,
        &session,
        StatusCode::OK,
        &form,
        &FieldErrors::default(),
        &owners,
        None,
    )
}

#[post("/tenants/new")]
pub async fn create_handler(
    admin: Admin,
    web::Form(form): web::Form<TenantForm>,
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let owners = db::get_all_owners(&state).await?;
    match form.clean(|id| owners.iter().any(|o| o.id == id)) {
        Ok(tenant) => {
            let tenant = db::create_tenant(&state, tenant).await?;
            push_flash(&session, &format!("Locataire « {} » ajouté.", tenant.name))?;
            Ok(redirect("/tenants"))
        }
        Err(errors) => form_page(
            &state,
            &admin,
            &session,
            StatusCode::BAD_REQUEST,
            &form,
            &errors,
            &owners,
            None,
        ),
    }
}

#[get("/tenants/{id}/edit")]
pub async fn edit_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let tenant = db::get_tenant_by_id(&state, path.into_inner()).await?;
    let owners = db::get_all_owners(&state).await?;
    form_page(
        &state,
        &admin,
        &session,
        StatusCode::OK,
        &TenantForm::from_tenant(&tenant),
        &FieldErrors::default(),
        &owners,
        Some(tenant.id),
    )
}

#[post("/tenants/{id}/edit")]
pub async fn update_handler(
    admin: Admin,
    web::Form(form): web::Form<TenantForm>,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let id = db::get_tenant_by_id(&state, path.into_inner()).await?.id;
    let owners = db::get_all_owners(&state).await?;
    match form.clean(|id| owners.iter().any(|o| o.id == id)) {
        Ok(tenant) => {
            let tenant = db::update_tenant(&state, id, tenant).await?;
            push_flash(&session, &format!("Locataire « {} » modifié.", tenant.name))?;
            Ok(redirect("/tenants"))
        }
        Err(errors) => form_page(
            &state,
            &admin,
            &session,
            StatusCode::BAD_REQUEST,
            &form,
            &errors,
            &owners,
            Some(id),
        ),
    }
}

#[get("/tenants/{id}/delete")]
pub async fn confirm_delete_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let tenant = db::get_tenant_by_id(&state, path.into_inner()).await?;
    let owner = db::get_owner_by_id(&state, tenant.owner_id).await?;
    let mut context = base_context(&state, Some(&admin), &session, "Supprimer le locataire");
    context.insert("tenant", &tenant);
    context.insert("owner", &owner);
    page(StatusCode::OK, "tenants/delete.html", &context)
}

#[post("/tenants/{id}/delete")]
pub async fn delete_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let tenant = db::get_tenant_by_id(&state, path.into_inner()).await?;
    db::delete_tenant(&state, tenant.id).await?;
    push_flash(&session, &format!("Locataire « {} » supprimé.", tenant.name))?;
    Ok(redirect("/tenants"))
}
