//! Form inputs as posted by the browser and their validation.
//!
//! Every field arrives as a string so an invalid value can be echoed back
//! into the re-rendered form next to its error.

use std::{borrow::Cow, collections::BTreeMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    money::Money,
    structs::{NewOwner, NewPayment, NewTenant, Owner, Payment, Tenant},
};

pub const DEFAULT_PHONE: &str = "0000000000";
pub const MIN_PASSWORD_LEN: usize = 8;

/// Field name to error messages.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(report: ValidationErrors) -> Self {
        let mut errors = FieldErrors::default();
        for (field, field_errors) in report.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Valeur invalide.".to_owned());
                errors.add(&field, message);
            }
        }
        errors
    }
}

fn check(value: &impl Validate) -> FieldErrors {
    value.validate().err().map(FieldErrors::from).unwrap_or_default()
}

fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required")
            .with_message(Cow::Borrowed("Ce champ est obligatoire.")));
    }
    Ok(())
}

fn phone_number(value: &str) -> Result<(), ValidationError> {
    let valid = value
        .trim()
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '.'));
    if !valid {
        return Err(ValidationError::new("phone")
            .with_message(Cow::Borrowed("Numéro de téléphone invalide.")));
    }
    Ok(())
}

fn phone_or_default(value: &str) -> String {
    match value.trim() {
        "" => DEFAULT_PHONE.to_owned(),
        phone => phone.to_owned(),
    }
}

fn validate_id(errors: &mut FieldErrors, field: &str, value: &str) -> i64 {
    match value.trim().parse::<i64>() {
        Ok(id) if id > 0 => id,
        _ => {
            errors.add(field, "Sélectionnez une valeur valide.");
            0
        }
    }
}

fn validate_money(errors: &mut FieldErrors, field: &str, value: &str) -> Money {
    Money::parse(value).unwrap_or_else(|e| {
        errors.add(field, format!("{}.", e));
        Money::ZERO
    })
}

/// Parses an `<input type="month">` value such as `2025-03`.
pub fn parse_period(value: &str) -> Option<(i32, i32)> {
    let (year, month) = value.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: i32 = month.parse().ok()?;
    ((1..=12).contains(&month) && (1900..=9999).contains(&year)).then_some((month, year))
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, Validate)]
pub struct CityForm {
    #[serde(default)]
    #[validate(
        custom(function = "required"),
        length(max = 100, message = "100 caractères maximum.")
    )]
    pub name: String,
}

impl CityForm {
    /// The trimmed city name.
    pub fn clean(&self) -> Result<String, FieldErrors> {
        check(self).into_result(self.name.trim().to_owned())
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, Validate)]
pub struct OwnerForm {
    #[serde(default)]
    #[validate(
        custom(function = "required"),
        length(max = 100, message = "100 caractères maximum.")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(
        length(max = 20, message = "20 caractères maximum."),
        custom(function = "phone_number")
    )]
    pub phone: String,
}

impl OwnerForm {
    pub fn from_owner(owner: &Owner) -> Self {
        OwnerForm {
            name: owner.name.clone(),
            phone: owner.phone.clone(),
        }
    }

    pub fn clean(&self) -> Result<NewOwner, FieldErrors> {
        check(self).into_result(NewOwner {
            name: self.name.trim().to_owned(),
            phone: phone_or_default(&self.phone),
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, Validate)]
pub struct TenantForm {
    #[serde(default)]
    #[validate(
        custom(function = "required"),
        length(max = 100, message = "100 caractères maximum.")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(
        length(max = 20, message = "20 caractères maximum."),
        custom(function = "phone_number")
    )]
    pub phone: String,
    #[serde(default)]
    pub monthly_rent: String,
    #[serde(default)]
    pub owner_id: String,
}

impl TenantForm {
    pub fn from_tenant(tenant: &Tenant) -> Self {
        TenantForm {
            name: tenant.name.clone(),
            phone: tenant.phone.clone(),
            monthly_rent: tenant.monthly_rent.to_string(),
            owner_id: tenant.owner_id.to_string(),
        }
    }

    /// `owner_exists` tells whether the submitted owner id is known.
    pub fn clean(&self, owner_exists: impl Fn(i64) -> bool) -> Result<NewTenant, FieldErrors> {
        let mut errors = check(self);
        let monthly_rent = validate_money(&mut errors, "monthly_rent", &self.monthly_rent);
        let owner_id = validate_id(&mut errors, "owner_id", &self.owner_id);
        if owner_id > 0 && !owner_exists(owner_id) {
            errors.add("owner_id", "Propriétaire introuvable.");
        }
        errors.into_result(NewTenant {
            name: self.name.trim().to_owned(),
            phone: phone_or_default(&self.phone),
            monthly_rent,
            owner_id,
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub payment_date: String,
    /// `YYYY-MM`
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub misc_fee: String,
    pub paid_in_advance: Option<String>,
}

impl PaymentForm {
    pub fn from_payment(payment: &Payment, owner_id: i64) -> Self {
        PaymentForm {
            owner_id: owner_id.to_string(),
            tenant_id: payment.tenant_id.to_string(),
            payment_date: payment.payment_date.format("%Y-%m-%d").to_string(),
            period: format!("{:04}-{:02}", payment.year, payment.month),
            amount: payment.amount.to_string(),
            misc_fee: payment.misc_fee.to_string(),
            paid_in_advance: payment.paid_in_advance.then(|| "on".to_owned()),
        }
    }

    /// Selected tenant id, if it parses.
    pub fn tenant_id(&self) -> Option<i64> {
        self.tenant_id.trim().parse().ok().filter(|id| *id > 0)
    }

    /// `tenant` is the record behind [`PaymentForm::tenant_id`], when it exists.
    /// The tenant has to belong to the selected owner.
    pub fn clean(&self, tenant: Option<&Tenant>) -> Result<NewPayment, FieldErrors> {
        let mut errors = FieldErrors::default();

        let owner_id = validate_id(&mut errors, "owner_id", &self.owner_id);
        let tenant_id = validate_id(&mut errors, "tenant_id", &self.tenant_id);
        if tenant_id > 0 {
            match tenant {
                Some(tenant) if tenant.id == tenant_id => {
                    if owner_id > 0 && tenant.owner_id != owner_id {
                        errors.add(
                            "tenant_id",
                            "Ce locataire n'appartient pas au propriétaire sélectionné.",
                        );
                    }
                }
                _ => errors.add("tenant_id", "Locataire introuvable."),
            }
        }

        let payment_date = match NaiveDate::parse_from_str(self.payment_date.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                errors.add("payment_date", "Date invalide.");
                NaiveDate::default()
            }
        };

        let (month, year) = parse_period(&self.period).unwrap_or_else(|| {
            errors.add("period", "Mois concerné invalide.");
            (0, 0)
        });

        let amount = validate_money(&mut errors, "amount", &self.amount);
        if errors.get("amount").is_none() && amount == Money::ZERO {
            errors.add("amount", "Le montant doit être positif.");
        }
        let misc_fee = if self.misc_fee.trim().is_empty() {
            Money::ZERO
        } else {
            validate_money(&mut errors, "misc_fee", &self.misc_fee)
        };

        errors.into_result(NewPayment {
            owner_id,
            tenant_id,
            payment_date,
            month,
            year,
            amount,
            misc_fee,
            paid_in_advance: self.paid_in_advance.is_some(),
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, Validate)]
pub struct SettingsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    #[validate(custom(function = "required"))]
    pub current_password: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    #[validate(must_match(
        other = "password",
        message = "Les mots de passe ne correspondent pas."
    ))]
    pub password2: String,
}

/// What to change on the admin account.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct AccountChange {
    #[validate(length(max = 100, message = "100 caractères maximum."))]
    pub username: Option<String>,
    #[validate(length(min = 8, max = 128, message = "Entre 8 et 128 caractères."))]
    pub password: Option<String>,
}

impl SettingsForm {
    /// Fields left blank, or equal to the current value, are not changed.
    pub fn clean(&self, current_username: &str) -> Result<AccountChange, FieldErrors> {
        let mut errors = check(self);
        let username = match self.username.trim() {
            "" => None,
            name if name == current_username => None,
            name => Some(name.to_owned()),
        };
        let password = (!self.password.is_empty()).then(|| self.password.clone());
        let change = AccountChange { username, password };
        errors.merge(check(&change));
        errors.into_result(change)
    }
}
