use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

use crate::money::Money;

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub monthly_rent: Money,
    pub owner_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A tenant joined with the name of its owner, for listings.
#[derive(Serialize, Debug, Clone, FromRow)]
pub struct TenantView {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub monthly_rent: Money,
    pub owner_id: i64,
    pub owner_name: String,
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct Payment {
    pub id: i64,
    pub owner_id: Option<i64>,
    pub tenant_id: i64,
    pub payment_date: NaiveDate,
    pub month: i32,
    pub year: i32,
    pub amount: Money,
    pub misc_fee: Money,
    pub paid_in_advance: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A payment joined with its tenant and the tenant's owner.
#[derive(Serialize, Debug, Clone, FromRow)]
pub struct PaymentView {
    pub id: i64,
    pub tenant_id: i64,
    pub tenant_name: String,
    pub owner_id: i64,
    pub owner_name: String,
    pub payment_date: NaiveDate,
    pub month: i32,
    pub year: i32,
    pub amount: Money,
    pub misc_fee: Money,
    pub paid_in_advance: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct AdminAccount {
    pub id: i64,
    pub username: String,
    pub pwd_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOwner {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTenant {
    pub name: String,
    pub phone: String,
    pub monthly_rent: Money,
    pub owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub owner_id: i64,
    pub tenant_id: i64,
    pub payment_date: NaiveDate,
    pub month: i32,
    pub year: i32,
    pub amount: Money,
    pub misc_fee: Money,
    pub paid_in_advance: bool,
}
