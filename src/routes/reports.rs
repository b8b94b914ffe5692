use actix_web::{get, web, Responder};

use super::{file_stem, pdf_response};
use crate::{
    auth::Admin,
    db, documents,
    errors::AppError,
    report::{self, month_name, ReportFilter, ReportQuery},
    AppState,
};

#[get("/dashboard.pdf")]
pub async fn dashboard_pdf_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, AppError> {
    let filter = ReportFilter::from_query(&query)?;
    let owner = match filter.owner_id {
        Some(id) => Some(db::get_owner_by_id(&state, id).await?),
        None => None,
    };
    let owners_count = db::count_owners(&state).await?;
    let tenants = db::get_tenants(&state, filter.owner_id).await?;
    let payments = db::get_payments(&state, &filter).await?;
    let summary = report::summarize(&tenants, &payments);

    let bytes = documents::dashboard_report(owners_count, &summary, &filter, owner.as_ref());
    log::info!("Dashboard report generated ({} bytes)", bytes.len());
    Ok(pdf_response("dashboard.pdf", bytes))
}

#[get("/reports/global.pdf")]
pub async fn global_report_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, AppError> {
    let filter = ReportFilter {
        owner_id: None,
        ..ReportFilter::from_query(&query)?
    };
    let owners = db::get_all_owners(&state).await?;
    let tenants = db::get_tenants(&state, None).await?;
    let payments = db::get_payments(&state, &filter).await?;

    let by_owner = report::summarize_by_owner(&owners, &tenants, &payments);
    let totals = report::summarize(&tenants, &payments);
    let bytes = documents::global_report(&state.agency_name, &by_owner, &totals, &filter);
    Ok(pdf_response("rapport_global.pdf", bytes))
}

#[get("/owners/{id}/invoice.pdf")]
pub async fn invoice_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, AppError> {
    let owner = db::get_owner_by_id(&state, path.into_inner()).await?;
    let filter = ReportFilter::from_query(&query)?.for_owner(owner.id);
    let tenants = db::get_tenants(&state, Some(owner.id)).await?;
    let payments = db::get_payments(&state, &filter).await?;
    let summary = report::summarize(&tenants, &payments);

    // Without a month filter the invoice is labelled with the latest payment's month.
    let month_label = match filter.month {
        Some(_) => filter.period_label(),
        None => payments
            .first()
            .and_then(|p| month_name(p.month as u32))
            .unwrap_or("")
            .to_owned(),
    };

    let bytes = documents::invoice(&state.agency_name, &owner, &summary, &month_label);
    log::info!("Invoice generated for owner {}", owner.id);
    Ok(pdf_response(
        &format!("facture_{}.pdf", file_stem(&owner.name)),
        bytes,
    ))
}

#[get("/owners/{id}/report.pdf")]
pub async fn owner_report_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, AppError> {
    let owner = db::get_owner_by_id(&state, path.into_inner()).await?;
    let filter = ReportFilter::from_query(&query)?.for_owner(owner.id);
    let tenants = db::get_tenants(&state, Some(owner.id)).await?;
    let payments = db::get_payments(&state, &filter).await?;
    let summary = report::summarize(&tenants, &payments);

    let bytes = documents::owner_report(&state.agency_name, &owner, &summary, &payments, &filter);
    Ok(pdf_response(
        &format!("rapport_{}.pdf", file_stem(&owner.name)),
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use actix_web::{
        http::{header, StatusCode},
        test,
    };

    use crate::{
        db::{
            self,
            tests::{new_payment, seed_owner_and_tenant},
        },
        routes::tests::{app_state, init, login},
    };

    #[actix_web::test]
    async fn invoice_is_a_pdf_attachment() {
        let state = app_state().await;
        let (owner, tenant) = seed_owner_and_tenant(&state).await;
        db::create_payment(&state, new_payment(owner.id, tenant.id, 4, 2025))
            .await
            .unwrap();
        let app = init(state).await;
        let cookie = login(&app).await;

        let req = test::TestRequest::get()
            .uri(&format!("/owners/{}/invoice.pdf", owner.id))
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"facture_Kouassi.pdf\""
        );
        let body = test::read_body(resp).await;
        assert!(body.starts_with(b"%PDF-1.4"));
        assert!(body.windows(6).any(|w| w == b"Avril)"));
    }

    #[actix_web::test]
    async fn reports_render_for_every_scope() {
        let state = app_state().await;
        let (owner, _) = seed_owner_and_tenant(&state).await;
        let app = init(state).await;
        let cookie = login(&app).await;

        for uri in [
            "/dashboard.pdf".to_owned(),
            "/dashboard.pdf?month=1&year=2025".to_owned(),
            format!("/dashboard.pdf?owner={}", owner.id),
            "/reports/global.pdf?month=2".to_owned(),
            format!("/owners/{}/report.pdf", owner.id),
        ] {
            let req = test::TestRequest::get()
                .uri(&uri)
                .cookie(cookie.clone())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn unknown_owner_is_not_found() {
        let app = init(app_state().await).await;
        let cookie = login(&app).await;
        let req = test::TestRequest::get()
            .uri("/owners/999/invoice.pdf")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
