use std::collections::BTreeMap;

use actix_session::Session;
use actix_web::{get, http::StatusCode, web, Responder};

use super::{base_context, page};
use crate::{
    auth::Admin,
    db,
    errors::AppError,
    forms::{FieldErrors, OwnerForm, PaymentForm, TenantForm},
    report::{self, ReportFilter, ReportQuery},
    AppState,
};

#[get("/")]
pub async fn index_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, AppError> {
    let filter = ReportFilter {
        owner_id: None,
        ..ReportFilter::from_query(&query)?
    };

    let owners = db::get_all_owners(&state).await.map_err(|e| {
        log::error!("Failed to get owners: {}", e);
        AppError::from(e)
    })?;
    let tenants = db::get_tenants(&state, None).await.map_err(|e| {
        log::error!("Failed to get tenants: {}", e);
        AppError::from(e)
    })?;
    let payments = db::get_payments(&state, &filter).await.map_err(|e| {
        log::error!("Failed to get payments: {}", e);
        AppError::from(e)
    })?;

    let summary = report::summarize(&tenants, &payments);
    let unpaid = report::unpaid_tenants(&owners, &tenants, &payments);
    // Keyed by the <select> option value.
    let rents: BTreeMap<String, String> = tenants
        .iter()
        .map(|t| (t.id.to_string(), t.monthly_rent.to_string()))
        .collect();

    let mut context = base_context(&state, Some(&admin), &session, "Accueil");
    context.insert("filter", &filter);
    context.insert("owners", &owners);
    context.insert("owners_count", &owners.len());
    context.insert("summary", &summary);
    context.insert("unpaid", &unpaid);
    context.insert("rents_json", &serde_json::to_string(&rents)?);
    context.insert("owner_form", &OwnerForm::default());
    context.insert("tenant_form", &TenantForm::default());
    context.insert("payment_form", &PaymentForm::default());
    context.insert("errors", &FieldErrors::default());
    page(StatusCode::OK, "home.html", &context)
}

#[get("/dashboard")]
pub async fn dashboard_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, AppError> {
    let filter = ReportFilter::from_query(&query)?;
    let owner = match filter.owner_id {
        Some(id) => Some(db::get_owner_by_id(&state, id).await?),
        None => None,
    };

    let owners = db::get_all_owners(&state).await?;
    let tenants = db::get_tenants(&state, filter.owner_id).await?;
    let payments = db::get_payments(&state, &filter).await.map_err(|e| {
        log::error!("Failed to get payments: {}", e);
        AppError::from(e)
    })?;
    let summary = report::summarize(&tenants, &payments);

    let mut context = base_context(&state, Some(&admin), &session, "Tableau de bord");
    context.insert("filter", &filter);
    context.insert("period", &filter.period_label());
    context.insert("owner", &owner);
    context.insert("owners", &owners);
    context.insert("owners_count", &owners.len());
    context.insert("summary", &summary);
    context.insert("query", &query_string(&filter));
    page(StatusCode::OK, "dashboard.html", &context)
}

/// Query string reproducing `filter`, for the PDF links.
pub(crate) fn query_string(filter: &ReportFilter) -> String {
    let mut parts = Vec::new();
    if let Some(month) = filter.month {
        parts.push(format!("month={}", month));
    }
    if let Some(year) = filter.year {
        parts.push(format!("year={}", year));
    }
    if let Some(owner) = filter.owner_id {
        parts.push(format!("owner={}", owner));
    }
    parts.join("&")
}

#[cfg(test)]
mod tests {
    use actix_web::test as actix_test;

    use super::*;
    use crate::{
        db::tests::{new_payment, seed_owner_and_tenant},
        routes::tests::{app_state, init, login},
    };

    #[test]
    fn query_string_keeps_filters() {
        let filter = ReportFilter {
            month: Some(3),
            year: Some(2025),
            owner_id: Some(2),
        };
        assert_eq!(query_string(&filter), "month=3&year=2025&owner=2");
        assert_eq!(query_string(&ReportFilter::default()), "");
    }

    #[actix_web::test]
    async fn dashboard_shows_commission() {
        let state = app_state().await;
        let (owner, tenant) = seed_owner_and_tenant(&state).await;
        db::create_payment(&state, new_payment(owner.id, tenant.id, 3, 2025))
            .await
            .unwrap();
        let app = init(state).await;
        let cookie = login(&app).await;

        let req = actix_test::TestRequest::get()
            .uri(&format!("/dashboard?month=3&owner={}", owner.id))
            .cookie(cookie)
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        let body = String::from_utf8(body.to_vec()).unwrap();

        // 10% of 500.00
        assert!(body.contains("50.00"));
        assert!(body.contains("Kouassi"));
        assert!(body.contains("Payé"));
    }

    #[actix_web::test]
    async fn home_lists_unpaid_tenants() {
        let state = app_state().await;
        let (owner, tenant) = seed_owner_and_tenant(&state).await;
        db::create_payment(&state, new_payment(owner.id, tenant.id, 1, 2025))
            .await
            .unwrap();
        let app = init(state).await;
        let cookie = login(&app).await;

        let req = actix_test::TestRequest::get()
            .uri("/?month=2")
            .cookie(cookie.clone())
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("id=\"unpaid-tenant-1\""));

        let req = actix_test::TestRequest::get()
            .uri("/?month=1")
            .cookie(cookie)
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(!body.contains("id=\"unpaid-tenant-1\""));
    }
}
