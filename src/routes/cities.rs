use actix_session::Session;
use actix_web::{get, http::StatusCode, post, web, Responder};

use super::{base_context, page, redirect};
use crate::{
    auth::{push_flash, Admin},
    db,
    errors::AppError,
    forms::{CityForm, FieldErrors},
    AppState,
};

#[get("/cities")]
pub async fn list_handler(
    admin: Admin,
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let cities = db::get_all_cities(&state).await?;
    let mut context = base_context(&state, Some(&admin), &session, "Villes");
    context.insert("cities", &cities);
    context.insert("form", &CityForm::default());
    context.insert("errors", &FieldErrors::default());
    page(StatusCode::OK, "cities/list.html", &context)
}

#[post("/cities")]
pub async fn create_handler(
    admin: Admin,
    web::Form(form): web::Form<CityForm>,
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    match form.clean() {
        Ok(name) => {
            let city = db::create_city(&state, name).await?;
            push_flash(&session, &format!("Ville « {} » ajoutée.", city.name))?;
            Ok(redirect("/cities"))
        }
        Err(errors) => {
            let cities = db::get_all_cities(&state).await?;
            let mut context = base_context(&state, Some(&admin), &session, "Villes");
            context.insert("cities", &cities);
            context.insert("form", &form);
            context.insert("errors", &errors);
            page(StatusCode::BAD_REQUEST, "cities/list.html", &context)
        }
    }
}

#[post("/cities/{id}/delete")]
pub async fn delete_handler(
    _admin: Admin,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    if !db::delete_city(&state, path.into_inner()).await? {
        return Err(AppError::NotFound);
    }
    push_flash(&session, "Ville supprimée.")?;
    Ok(redirect("/cities"))
}

#[cfg(test)]
mod tests {
    use actix_web::test;

    use super::*;
    use crate::routes::tests::{app_state, init, login};

    #[actix_web::test]
    async fn add_and_remove_city() {
        let state = app_state().await;
        let app = init(state.clone()).await;
        let cookie = login(&app).await;

        let req = test::TestRequest::post()
            .uri("/cities")
            .cookie(cookie.clone())
            .set_form([("name", "Abidjan")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        // The flash message travels in the refreshed session cookie.
        let with_flash = resp
            .response()
            .cookies()
            .find(|c| c.name() == "id")
            .map(|c| c.into_owned())
            .unwrap();

        let req = test::TestRequest::get()
            .uri("/cities")
            .cookie(with_flash)
            .to_request();
        let body = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
        assert!(body.contains("Abidjan"));
        assert!(body.contains("Ville « Abidjan » ajoutée."));

        let city = db::get_all_cities(&state).await.unwrap().remove(0);
        let req = test::TestRequest::post()
            .uri(&format!("/cities/{}/delete", city.id))
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let req = test::TestRequest::post()
            .uri(&format!("/cities/{}/delete", city.id))
            .cookie(cookie)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn empty_city_name_is_rejected() {
        let app = init(app_state().await).await;
        let cookie = login(&app).await;
        let req = test::TestRequest::post()
            .uri("/cities")
            .cookie(cookie)
            .set_form([("name", "  ")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
