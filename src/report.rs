//! Rent aggregation shared by the dashboards and the PDF documents.
//!
//! Every function here is pure: callers load the tenants and the payments
//! in scope (see [`crate::db::get_payments`]) and hand them over.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    money::Money,
    structs::{Owner, PaymentView, Tenant},
};

/// Share of collected rent kept by the agency.
pub const COMMISSION_PERCENT: i64 = 10;

pub const MONTHS_FR: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

pub fn month_name(month: u32) -> Option<&'static str> {
    match month {
        1..=12 => Some(MONTHS_FR[month as usize - 1]),
        _ => None,
    }
}

pub fn commission(received: Money) -> Money {
    received.percent(COMMISSION_PERCENT)
}

pub fn net_to_owner(received: Money, misc_fees: Money) -> Money {
    received - commission(received) + misc_fees
}

/// Raw `?month=&year=&owner=` query string; empty values mean "no filter".
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReportQuery {
    pub month: Option<String>,
    pub year: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub owner_id: Option<i64>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ReportFilter {
    pub fn from_query(query: &ReportQuery) -> Result<Self, AppError> {
        let month = match non_empty(&query.month) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(m @ 1..=12) => Some(m),
                _ => return Err(AppError::BadRequest(format!("mois invalide : {}", raw))),
            },
            None => None,
        };
        let year = match non_empty(&query.year) {
            Some(raw) => match raw.parse::<i32>() {
                Ok(y @ 1900..=9999) => Some(y),
                _ => return Err(AppError::BadRequest(format!("année invalide : {}", raw))),
            },
            None => None,
        };
        let owner_id = match non_empty(&query.owner) {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| AppError::BadRequest(format!("propriétaire invalide : {}", raw)))?,
            ),
            None => None,
        };
        Ok(ReportFilter {
            month,
            year,
            owner_id,
        })
    }

    /// Same month/year window, restricted to one owner.
    pub fn for_owner(self, owner_id: i64) -> Self {
        ReportFilter {
            owner_id: Some(owner_id),
            ..self
        }
    }

    /// Human label of the period, e.g. `Mars 2025`, `Mars` or `2025`.
    pub fn period_label(&self) -> String {
        match (self.month.and_then(month_name), self.year) {
            (Some(month), Some(year)) => format!("{} {}", month, year),
            (Some(month), None) => month.to_owned(),
            (None, Some(year)) => year.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaymentStatus {
    #[serde(rename = "Payé")]
    Paid,
    #[serde(rename = "Impayé")]
    Unpaid,
}

impl PaymentStatus {
    pub fn label(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Payé",
            PaymentStatus::Unpaid => "Impayé",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantLine {
    pub tenant_id: i64,
    pub name: String,
    pub owner_id: i64,
    pub monthly_rent: Money,
    pub paid: Money,
    pub misc_fees: Money,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub tenants_count: usize,
    pub total_rent: Money,
    pub total_received: Money,
    pub remaining: Money,
    pub commission: Money,
    pub misc_fees: Money,
    pub net_to_owner: Money,
    pub paid_tenants: usize,
    pub unpaid_tenants: usize,
    pub lines: Vec<TenantLine>,
}

/// Totals over `tenants`; payments of tenants outside that set are ignored.
pub fn summarize(tenants: &[Tenant], payments: &[PaymentView]) -> Summary {
    let in_scope: HashSet<i64> = tenants.iter().map(|t| t.id).collect();

    let mut paid_by_tenant: HashMap<i64, (Money, Money)> = HashMap::new();
    for payment in payments.iter().filter(|p| in_scope.contains(&p.tenant_id)) {
        let entry = paid_by_tenant
            .entry(payment.tenant_id)
            .or_insert((Money::ZERO, Money::ZERO));
        entry.0 = entry.0 + payment.amount;
        entry.1 = entry.1 + payment.misc_fee;
    }

    let lines: Vec<TenantLine> = tenants
        .iter()
        .map(|tenant| {
            let (paid, misc_fees, status) = match paid_by_tenant.get(&tenant.id) {
                Some(&(paid, fees)) => (paid, fees, PaymentStatus::Paid),
                None => (Money::ZERO, Money::ZERO, PaymentStatus::Unpaid),
            };
            TenantLine {
                tenant_id: tenant.id,
                name: tenant.name.clone(),
                owner_id: tenant.owner_id,
                monthly_rent: tenant.monthly_rent,
                paid,
                misc_fees,
                status,
            }
        })
        .collect();

    let total_rent: Money = tenants.iter().map(|t| t.monthly_rent).sum();
    let total_received: Money = lines.iter().map(|l| l.paid).sum();
    let misc_fees: Money = lines.iter().map(|l| l.misc_fees).sum();
    let paid_tenants = paid_by_tenant.len();

    Summary {
        tenants_count: tenants.len(),
        total_rent,
        total_received,
        remaining: total_rent - total_received,
        commission: commission(total_received),
        misc_fees,
        net_to_owner: net_to_owner(total_received, misc_fees),
        paid_tenants,
        unpaid_tenants: tenants.len() - paid_tenants,
        lines,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerSummary {
    pub owner: Owner,
    pub summary: Summary,
}

/// One [`Summary`] per owner, in the order of `owners`.
pub fn summarize_by_owner(
    owners: &[Owner],
    tenants: &[Tenant],
    payments: &[PaymentView],
) -> Vec<OwnerSummary> {
    owners
        .iter()
        .map(|owner| {
            let owned: Vec<Tenant> = tenants
                .iter()
                .filter(|t| t.owner_id == owner.id)
                .cloned()
                .collect();
            OwnerSummary {
                owner: owner.clone(),
                summary: summarize(&owned, payments),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct UnpaidEntry {
    pub owner_id: i64,
    pub owner_name: String,
    pub tenant_id: i64,
    pub tenant_name: String,
    pub monthly_rent: Money,
}

/// Tenants without any payment in `payments`, grouped by owner.
pub fn unpaid_tenants(
    owners: &[Owner],
    tenants: &[Tenant],
    payments: &[PaymentView],
) -> Vec<UnpaidEntry> {
    let paid: HashSet<i64> = payments.iter().map(|p| p.tenant_id).collect();
    owners
        .iter()
        .flat_map(|owner| {
            let paid = &paid;
            tenants
                .iter()
                .filter(move |t| t.owner_id == owner.id && !paid.contains(&t.id))
                .map(move |t| UnpaidEntry {
                    owner_id: owner.id,
                    owner_name: owner.name.clone(),
                    tenant_id: t.id,
                    tenant_name: t.name.clone(),
                    monthly_rent: t.monthly_rent,
                })
        })
        .collect()
}
