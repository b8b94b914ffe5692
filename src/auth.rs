use std::future::{ready, Ready};

use actix_identity::IdentityExt;
use actix_session::{Session, SessionExt};
use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::errors::AppError;

const FLASH_KEY: &str = "flash";

/// The logged-in admin. Extracting it from an anonymous request fails with
/// [`AppError::Unauthorized`], which redirects to the login page.
#[derive(Debug, Clone)]
pub struct Admin {
    pub username: String,
}

impl FromRequest for Admin {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let username = req.get_identity().ok().and_then(|identity| identity.id().ok());
        ready(match username {
            Some(username) => Ok(Admin { username }),
            None => {
                if let Err(e) = push_flash(&req.get_session(), "Veuillez vous connecter.") {
                    log::warn!("Failed to store flash message: {}", e);
                }
                Err(AppError::Unauthorized)
            }
        })
    }
}

pub fn push_flash(session: &Session, message: &str) -> Result<(), AppError> {
    let mut messages: Vec<String> = session
        .get(FLASH_KEY)
        .unwrap_or_default()
        .unwrap_or_default();
    messages.push(message.to_owned());
    session.insert(FLASH_KEY, messages)?;
    Ok(())
}

/// Returns the pending flash messages and clears them.
pub fn take_flash(session: &Session) -> Vec<String> {
    session
        .remove_as::<Vec<String>>(FLASH_KEY)
        .and_then(Result::ok)
        .unwrap_or_default()
}
