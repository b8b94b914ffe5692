//! JSON helpers for the payment form scripts.

use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;

use crate::{auth::Admin, db, errors::AppError, money::Money, AppState};

#[derive(Serialize)]
struct TenantRent {
    tenant_id: i64,
    monthly_rent: Money,
}

#[derive(Serialize)]
struct TenantChoice {
    id: i64,
    name: String,
    monthly_rent: Money,
}

#[get("/api/tenants/{id}/rent")]
pub async fn tenant_rent_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let tenant = db::get_tenant_by_id(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TenantRent {
        tenant_id: tenant.id,
        monthly_rent: tenant.monthly_rent,
    }))
}

#[get("/api/owners/{id}/tenants")]
pub async fn owner_tenants_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let owner = db::get_owner_by_id(&state, path.into_inner()).await?;
    let tenants: Vec<TenantChoice> = db::get_tenants(&state, Some(owner.id))
        .await?
        .into_iter()
        .map(|t| TenantChoice {
            id: t.id,
            name: t.name,
            monthly_rent: t.monthly_rent,
        })
        .collect();
    Ok(HttpResponse::Ok().json(tenants))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::json;

    use crate::{
        db::tests::seed_owner_and_tenant,
        routes::tests::{app_state, init, login},
    };

    #[actix_web::test]
    async fn tenant_rent_and_owner_tenants() {
        let state = app_state().await;
        let (owner, tenant) = seed_owner_and_tenant(&state).await;
        let app = init(state).await;
        let cookie = login(&app).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/tenants/{}/rent", tenant.id))
            .cookie(cookie.clone())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "tenant_id": tenant.id, "monthly_rent": "500.00" }));

        let req = test::TestRequest::get()
            .uri(&format!("/api/owners/{}/tenants", owner.id))
            .cookie(cookie.clone())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!([{ "id": tenant.id, "name": "Yao", "monthly_rent": "500.00" }])
        );

        let req = test::TestRequest::get()
            .uri("/api/owners/999/tenants")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
