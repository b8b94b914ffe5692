//! Command-line interface: run the web server or set up the admin account.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};

use crate::{
    config::{self, Config},
    db,
    errors::AppError,
    forms::MIN_PASSWORD_LEN,
    structs::AdminAccount,
    utils, AppState,
};

/// Rental management back office
#[derive(Parser)]
#[command(name = "locative")]
#[command(about = "Property rental management back office", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default if no command specified)
    Serve,

    /// Create the administrator account
    CreateAdmin {
        /// Login name, prompted for when omitted
        #[arg(long)]
        username: Option<String>,

        /// Password, prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

fn prompt(label: &str) -> Result<String, AppError> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// Creates the single admin account. Refuses when one already exists.
pub async fn create_admin_account(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<AdminAccount, AppError> {
    if db::count_admins(state).await? > 0 {
        return Err(AppError::BadRequest("Un compte existe déjà".to_owned()));
    }
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest(
            "Le nom d'utilisateur est obligatoire".to_owned(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Le mot de passe doit contenir au moins {} caractères",
            MIN_PASSWORD_LEN
        )));
    }
    let pwd_hash = utils::hash_password(password)?;
    let account = db::create_admin(state, username.to_owned(), pwd_hash).await?;
    Ok(account)
}

pub async fn run_create_admin(
    config: &Config,
    username: Option<String>,
    password: Option<String>,
) -> Result<(), AppError> {
    let db_pool = config::connect(&config.database_url).await?;
    let state = AppState {
        db_pool,
        agency_name: config.agency_name.clone(),
    };

    let username = match username {
        Some(username) => username,
        None => prompt("Nom d'utilisateur")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt("Mot de passe")?,
    };

    let account = create_admin_account(&state, &username, &password).await?;
    log::info!("Admin account {} created", account.username);
    println!("Compte administrateur « {} » créé.", account.username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_state;

    #[actix_web::test]
    async fn only_one_admin_account() {
        let state = test_state().await;
        let account = create_admin_account(&state, " admin ", "motdepasse-solide")
            .await
            .unwrap();
        assert_eq!(account.username, "admin");
        assert!(utils::verify_password("motdepasse-solide", &account.pwd_hash).unwrap());

        let err = create_admin_account(&state, "autre", "motdepasse-solide")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Un compte existe déjà"));
    }

    #[actix_web::test]
    async fn short_password_is_refused() {
        let state = test_state().await;
        assert!(create_admin_account(&state, "admin", "court").await.is_err());
        assert_eq!(db::count_admins(&state).await.unwrap(), 0);
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["locative"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["locative", "create-admin", "--username", "admin"]).unwrap();
        match cli.command {
            Some(Commands::CreateAdmin { username, password }) => {
                assert_eq!(username.as_deref(), Some("admin"));
                assert!(password.is_none());
            }
            _ => panic!("expected create-admin"),
        }
    }
}
