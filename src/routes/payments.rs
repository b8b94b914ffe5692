use actix_session::Session;
use actix_web::{get, http::StatusCode, post, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use super::{base_context, home::query_string, page, redirect, wants_json};
use crate::{
    auth::{push_flash, Admin},
    db,
    errors::AppError,
    forms::{FieldErrors, PaymentForm},
    report::{ReportFilter, ReportQuery},
    structs::Payment,
    AppState,
};

#[derive(Deserialize)]
pub struct NewPaymentQuery {
    owner: Option<i64>,
    tenant: Option<i64>,
}

enum Submission {
    Saved(Payment),
    Invalid(FieldErrors),
    Duplicate,
}

/// Validates `form` and writes it, as a new payment or over payment `id`.
async fn submit(
    state: &AppState,
    form: &PaymentForm,
    id: Option<i64>,
) -> Result<Submission, AppError> {
    let tenant = match form.tenant_id() {
        Some(tenant_id) => db::find_tenant(state, tenant_id).await?,
        None => None,
    };
    let payment = match form.clean(tenant.as_ref()) {
        Ok(payment) => payment,
        Err(errors) => return Ok(Submission::Invalid(errors)),
    };
    let saved = match id {
        Some(id) => db::update_payment(state, id, payment).await,
        None => db::create_payment(state, payment).await,
    };
    match saved {
        Ok(payment) => Ok(Submission::Saved(payment)),
        Err(AppError::DuplicatePayment) => Ok(Submission::Duplicate),
        Err(e) => Err(e),
    }
}

async fn form_page(
    state: &AppState,
    admin: &Admin,
    session: &Session,
    status: StatusCode,
    form: &PaymentForm,
    errors: &FieldErrors,
    payment_id: Option<i64>,
) -> Result<HttpResponse, AppError> {
    let owners = db::get_all_owners(state).await?;
    let tenants = db::get_tenants(state, None).await?;
    let title = if payment_id.is_some() {
        "Modifier le paiement"
    } else {
        "Enregistrer un paiement"
    };
    let mut context = base_context(state, Some(admin), session, title);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("owners", &owners);
    context.insert("tenants", &tenants);
    context.insert("payment_id", &payment_id);
    page(status, "payments/form.html", &context)
}

/// Answers a submission with JSON or HTML depending on the client.
#[allow(clippy::too_many_arguments)]
async fn respond(
    request: &HttpRequest,
    state: &AppState,
    admin: &Admin,
    session: &Session,
    form: &PaymentForm,
    payment_id: Option<i64>,
    submission: Submission,
    flash: &str,
) -> Result<HttpResponse, AppError> {
    let json = wants_json(request);
    match submission {
        Submission::Saved(payment) if json => {
            let status = if payment_id.is_some() {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            Ok(HttpResponse::build(status).json(json!({ "id": payment.id })))
        }
        Submission::Saved(_) => {
            push_flash(session, flash)?;
            Ok(redirect("/payments"))
        }
        Submission::Invalid(errors) if json => {
            Ok(HttpResponse::BadRequest().json(json!({ "errors": errors })))
        }
        Submission::Duplicate if json => Ok(HttpResponse::BadRequest().json(json!({
            "error": "duplicate_payment",
            "message": AppError::DuplicatePayment.to_string(),
        }))),
        Submission::Invalid(errors) => {
            form_page(state, admin, session, StatusCode::BAD_REQUEST, form, &errors, payment_id)
                .await
        }
        Submission::Duplicate => {
            let mut errors = FieldErrors::default();
            errors.add("period", AppError::DuplicatePayment.to_string());
            form_page(state, admin, session, StatusCode::BAD_REQUEST, form, &errors, payment_id)
                .await
        }
    }
}

#[get("/payments")]
pub async fn list_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, AppError> {
    let filter = ReportFilter::from_query(&query)?;
    let owners = db::get_all_owners(&state).await?;
    let payments = db::get_payments(&state, &filter).await.map_err(|e| {
        log::error!("Failed to get payments: {}", e);
        AppError::from(e)
    })?;

    let mut context = base_context(&state, Some(&admin), &session, "Paiements");
    context.insert("filter", &filter);
    context.insert("period", &filter.period_label());
    context.insert("owners", &owners);
    context.insert("payments", &payments);
    context.insert("query", &query_string(&filter));
    page(StatusCode::OK, "payments/list.html", &context)
}

#[get("/payments/new")]
pub async fn new_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<NewPaymentQuery>,
) -> Result<impl Responder, AppError> {
    let today = chrono::Local::now().date_naive();
    let mut form = PaymentForm {
        owner_id: query.owner.map(|id| id.to_string()).unwrap_or_default(),
        payment_date: today.format("%Y-%m-%d").to_string(),
        period: today.format("%Y-%m").to_string(),
        ..PaymentForm::default()
    };
    // Preselecting a tenant also fills in its owner and rent.
    let tenant = match query.tenant {
        Some(id) => db::find_tenant(&state, id).await?,
        None => None,
    };
    if let Some(tenant) = tenant {
        form.owner_id = tenant.owner_id.to_string();
        form.tenant_id = tenant.id.to_string();
        form.amount = tenant.monthly_rent.to_string();
    }
    form_page(
        &state,
        &admin,
        &session,
        StatusCode::OK,
        &form,
        &FieldErrors::default(),
        None,
    )
    .await
}

#[post("/payments/new")]
pub async fn create_handler(
    admin: Admin,
    web::Form(form): web::Form<PaymentForm>,
    state: web::Data<AppState>,
    session: Session,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let submission = submit(&state, &form, None).await?;
    respond(
        &request,
        &state,
        &admin,
        &session,
        &form,
        None,
        submission,
        "Paiement enregistré.",
    )
    .await
}

#[get("/payments/{id}/edit")]
pub async fn edit_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let payment = db::get_payment_by_id(&state, path.into_inner()).await?;
    let owner_id = match payment.owner_id {
        Some(owner_id) => owner_id,
        None => db::get_tenant_by_id(&state, payment.tenant_id).await?.owner_id,
    };
    form_page(
        &state,
        &admin,
        &session,
        StatusCode::OK,
        &PaymentForm::from_payment(&payment, owner_id),
        &FieldErrors::default(),
        Some(payment.id),
    )
    .await
}

#[post("/payments/{id}/edit")]
pub async fn update_handler(
    admin: Admin,
    web::Form(form): web::Form<PaymentForm>,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let id = db::get_payment_by_id(&state, path.into_inner()).await?.id;
    let submission = submit(&state, &form, Some(id)).await?;
    respond(
        &request,
        &state,
        &admin,
        &session,
        &form,
        Some(id),
        submission,
        "Paiement modifié.",
    )
    .await
}

#[get("/payments/{id}/delete")]
pub async fn confirm_delete_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let payment = db::get_payment_view_by_id(&state, path.into_inner()).await?;
    let mut context = base_context(&state, Some(&admin), &session, "Supprimer le paiement");
    context.insert("payment", &payment);
    page(StatusCode::OK, "payments/delete.html", &context)
}

#[post("/payments/{id}/delete")]
pub async fn delete_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let payment = db::get_payment_by_id(&state, path.into_inner()).await?;
    db::delete_payment(&state, payment.id).await?;
    push_flash(&session, "Paiement supprimé.")?;
    Ok(redirect("/payments"))
}
