use sqlx::{QueryBuilder, Sqlite};

use crate::{
    errors::AppError,
    report::ReportFilter,
    structs::{
        AdminAccount, City, NewOwner, NewPayment, NewTenant, Owner, Payment, PaymentView, Tenant,
        TenantView,
    },
    AppState,
};

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// Cities

pub async fn get_all_cities(state: &AppState) -> Result<Vec<City>, sqlx::Error> {
    sqlx::query_as::<_, City>("SELECT * FROM cities ORDER BY name")
        .fetch_all(&state.db_pool)
        .await
}

pub async fn create_city(state: &AppState, name: String) -> Result<City, sqlx::Error> {
    let created_at = now();
    let city = sqlx::query_as::<_, City>(
        "INSERT INTO cities (name, created_at, updated_at) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(&created_at)
    .bind(&created_at)
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("City created: {:?}", city);
    Ok(city)
}

pub async fn delete_city(state: &AppState, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cities WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    log::info!("City with id {} deleted", id);
    Ok(result.rows_affected() > 0)
}

// Owners

pub async fn get_all_owners(state: &AppState) -> Result<Vec<Owner>, sqlx::Error> {
    sqlx::query_as::<_, Owner>("SELECT * FROM owners ORDER BY name, id")
        .fetch_all(&state.db_pool)
        .await
}

pub async fn count_owners(state: &AppState) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM owners")
        .fetch_one(&state.db_pool)
        .await
}

pub async fn get_owner_by_id(state: &AppState, id: i64) -> Result<Owner, sqlx::Error> {
    sqlx::query_as::<_, Owner>("SELECT * FROM owners WHERE id = $1")
        .bind(id)
        .fetch_one(&state.db_pool)
        .await
}

pub async fn create_owner(state: &AppState, owner: NewOwner) -> Result<Owner, sqlx::Error> {
    let created_at = now();
    let owner = sqlx::query_as::<_, Owner>(
        "INSERT INTO owners (name, phone, created_at, updated_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(owner.name)
    .bind(owner.phone)
    .bind(&created_at)
    .bind(&created_at)
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("Owner created: {:?}", owner);
    Ok(owner)
}

pub async fn update_owner(
    state: &AppState,
    id: i64,
    owner: NewOwner,
) -> Result<Owner, sqlx::Error> {
    let owner = sqlx::query_as::<_, Owner>(
        "UPDATE owners SET name = $1, phone = $2, updated_at = $3 WHERE id = $4 RETURNING *",
    )
    .bind(owner.name)
    .bind(owner.phone)
    .bind(now())
    .bind(id)
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("Owner updated: {:?}", owner);
    Ok(owner)
}

/// Tenants and payments of the owner go with it.
pub async fn delete_owner(state: &AppState, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM owners WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    log::info!("Owner with id {} deleted", id);
    Ok(())
}

// Tenants

pub async fn get_tenants(
    state: &AppState,
    owner_id: Option<i64>,
) -> Result<Vec<Tenant>, sqlx::Error> {
    match owner_id {
        Some(owner_id) => {
            sqlx::query_as::<_, Tenant>(
                "SELECT * FROM tenants WHERE owner_id = $1 ORDER BY name, id",
            )
            .bind(owner_id)
            .fetch_all(&state.db_pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY name, id")
                .fetch_all(&state.db_pool)
                .await
        }
    }
}

pub async fn get_tenant_views(state: &AppState) -> Result<Vec<TenantView>, sqlx::Error> {
    sqlx::query_as::<_, TenantView>(
        r#"
        SELECT t.id, t.name, t.phone, t.monthly_rent, t.owner_id, o.name AS owner_name
        FROM tenants t
        JOIN owners o ON o.id = t.owner_id
        ORDER BY o.name, t.name, t.id
        "#,
    )
    .fetch_all(&state.db_pool)
    .await
}

pub async fn get_tenant_by_id(state: &AppState, id: i64) -> Result<Tenant, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(id)
        .fetch_one(&state.db_pool)
        .await
}

pub async fn find_tenant(state: &AppState, id: i64) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn create_tenant(state: &AppState, tenant: NewTenant) -> Result<Tenant, sqlx::Error> {
    let created_at = now();
    let tenant = sqlx::query_as::<_, Tenant>(
        r#"
        INSERT INTO tenants (name, phone, monthly_rent, owner_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(tenant.name)
    .bind(tenant.phone)
    .bind(tenant.monthly_rent)
    .bind(tenant.owner_id)
    .bind(&created_at)
    .bind(&created_at)
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("Tenant created: {:?}", tenant);
    Ok(tenant)
}

/// Moving a tenant to another owner also moves its payments.
pub async fn update_tenant(
    state: &AppState,
    id: i64,
    tenant: NewTenant,
) -> Result<Tenant, sqlx::Error> {
    let updated_at = now();
    let mut tx = state.db_pool.begin().await?;

    let tenant = sqlx::query_as::<_, Tenant>(
        r#"
        UPDATE tenants
        SET name = $1, phone = $2, monthly_rent = $3, owner_id = $4, updated_at = $5
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(tenant.name)
    .bind(tenant.phone)
    .bind(tenant.monthly_rent)
    .bind(tenant.owner_id)
    .bind(&updated_at)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE payments SET owner_id = $1, updated_at = $2 WHERE tenant_id = $3",
    )
    .bind(tenant.owner_id)
    .bind(&updated_at)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    log::info!("Tenant updated: {:?}", tenant);
    Ok(tenant)
}

pub async fn delete_tenant(state: &AppState, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    log::info!("Tenant with id {} deleted", id);
    Ok(())
}

// Payments

const PAYMENT_VIEW_SELECT: &str = r#"
    SELECT p.id, p.tenant_id, t.name AS tenant_name, t.owner_id AS owner_id,
           o.name AS owner_name, p.payment_date, p.month, p.year, p.amount,
           p.misc_fee, p.paid_in_advance
    FROM payments p
    JOIN tenants t ON t.id = p.tenant_id
    JOIN owners o ON o.id = t.owner_id
    WHERE 1 = 1"#;

/// Payments matching `filter`; the owner filter follows the tenant's owner.
pub async fn get_payments(
    state: &AppState,
    filter: &ReportFilter,
) -> Result<Vec<PaymentView>, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(PAYMENT_VIEW_SELECT);
    if let Some(month) = filter.month {
        query.push(" AND p.month = ").push_bind(month as i32);
    }
    if let Some(year) = filter.year {
        query.push(" AND p.year = ").push_bind(year);
    }
    if let Some(owner_id) = filter.owner_id {
        query.push(" AND t.owner_id = ").push_bind(owner_id);
    }
    query.push(" ORDER BY p.year DESC, p.month DESC, p.payment_date DESC, p.id DESC");

    query
        .build_query_as::<PaymentView>()
        .fetch_all(&state.db_pool)
        .await
}

pub async fn get_payment_by_id(state: &AppState, id: i64) -> Result<Payment, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(id)
        .fetch_one(&state.db_pool)
        .await
}

pub async fn get_payment_view_by_id(
    state: &AppState,
    id: i64,
) -> Result<PaymentView, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(PAYMENT_VIEW_SELECT);
    query.push(" AND p.id = ").push_bind(id);
    query
        .build_query_as::<PaymentView>()
        .fetch_one(&state.db_pool)
        .await
}

/// Fails with [`AppError::DuplicatePayment`] when the tenant already paid that month.
pub async fn create_payment(state: &AppState, payment: NewPayment) -> Result<Payment, AppError> {
    let created_at = now();
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (owner_id, tenant_id, payment_date, month, year, amount, misc_fee,
                              paid_in_advance, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(payment.owner_id)
    .bind(payment.tenant_id)
    .bind(payment.payment_date)
    .bind(payment.month)
    .bind(payment.year)
    .bind(payment.amount)
    .bind(payment.misc_fee)
    .bind(payment.paid_in_advance)
    .bind(&created_at)
    .bind(&created_at)
    .fetch_one(&state.db_pool)
    .await
    .map_err(AppError::duplicate_payment_or)?;
    log::info!("Payment created: {:?}", payment);
    Ok(payment)
}

pub async fn update_payment(
    state: &AppState,
    id: i64,
    payment: NewPayment,
) -> Result<Payment, AppError> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        UPDATE payments
        SET owner_id = $1, tenant_id = $2, payment_date = $3, month = $4, year = $5,
            amount = $6, misc_fee = $7, paid_in_advance = $8, updated_at = $9
        WHERE id = $10
        RETURNING *
        "#,
    )
    .bind(payment.owner_id)
    .bind(payment.tenant_id)
    .bind(payment.payment_date)
    .bind(payment.month)
    .bind(payment.year)
    .bind(payment.amount)
    .bind(payment.misc_fee)
    .bind(payment.paid_in_advance)
    .bind(now())
    .bind(id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(AppError::duplicate_payment_or)?;
    log::info!("Payment updated: {:?}", payment);
    Ok(payment)
}

pub async fn delete_payment(state: &AppState, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM payments WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    log::info!("Payment with id {} deleted", id);
    Ok(())
}

// Admin account

pub async fn count_admins(state: &AppState) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM admin_accounts")
        .fetch_one(&state.db_pool)
        .await
}

pub async fn find_admin_by_username(
    state: &AppState,
    username: &str,
) -> Result<Option<AdminAccount>, sqlx::Error> {
    sqlx::query_as::<_, AdminAccount>("SELECT * FROM admin_accounts WHERE username = $1")
        .bind(username)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn create_admin(
    state: &AppState,
    username: String,
    pwd_hash: String,
) -> Result<AdminAccount, sqlx::Error> {
    let created_at = now();
    let admin = sqlx::query_as::<_, AdminAccount>(
        "INSERT INTO admin_accounts (username, pwd_hash, created_at, updated_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(username)
    .bind(pwd_hash)
    .bind(&created_at)
    .bind(&created_at)
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("Admin account created: {}", admin.username);
    Ok(admin)
}

pub async fn update_admin(
    state: &AppState,
    id: i64,
    username: Option<String>,
    pwd_hash: Option<String>,
) -> Result<AdminAccount, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE admin_accounts SET updated_at = ");
    query.push_bind(now());
    if let Some(username) = username {
        query.push(", username = ").push_bind(username);
    }
    if let Some(pwd_hash) = pwd_hash {
        query.push(", pwd_hash = ").push_bind(pwd_hash);
    }
    query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

    let admin = query
        .build_query_as::<AdminAccount>()
        .fetch_one(&state.db_pool)
        .await?;
    log::info!("Admin account updated: {}", admin.username);
    Ok(admin)
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::money::Money;

    pub async fn test_state() -> AppState {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&db_pool)
            .await
            .unwrap();
        sqlx::migrate!().run(&db_pool).await.unwrap();
        AppState {
            db_pool,
            agency_name: "TEST AGENCY".to_owned(),
        }
    }

    pub fn new_payment(owner_id: i64, tenant_id: i64, month: i32, year: i32) -> NewPayment {
        NewPayment {
            owner_id,
            tenant_id,
            payment_date: NaiveDate::from_ymd_opt(year, month as u32, 5).unwrap(),
            month,
            year,
            amount: Money::from_cents(50_000),
            misc_fee: Money::ZERO,
            paid_in_advance: false,
        }
    }

    pub async fn seed_owner_and_tenant(state: &AppState) -> (Owner, Tenant) {
        let owner = create_owner(
            state,
            NewOwner {
                name: "Kouassi".to_owned(),
                phone: "0700000000".to_owned(),
            },
        )
        .await
        .unwrap();
        let tenant = create_tenant(
            state,
            NewTenant {
                name: "Yao".to_owned(),
                phone: "0500000000".to_owned(),
                monthly_rent: Money::from_cents(50_000),
                owner_id: owner.id,
            },
        )
        .await
        .unwrap();
        (owner, tenant)
    }

    #[actix_web::test]
    async fn duplicate_payment_is_rejected() {
        let state = test_state().await;
        let (owner, tenant) = seed_owner_and_tenant(&state).await;

        create_payment(&state, new_payment(owner.id, tenant.id, 3, 2025))
            .await
            .unwrap();
        let err = create_payment(&state, new_payment(owner.id, tenant.id, 3, 2025))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicatePayment));

        create_payment(&state, new_payment(owner.id, tenant.id, 3, 2026))
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn deleting_owner_cascades() {
        let state = test_state().await;
        let (owner, tenant) = seed_owner_and_tenant(&state).await;
        create_payment(&state, new_payment(owner.id, tenant.id, 1, 2025))
            .await
            .unwrap();

        delete_owner(&state, owner.id).await.unwrap();

        assert!(find_tenant(&state, tenant.id).await.unwrap().is_none());
        assert!(get_payments(&state, &ReportFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[actix_web::test]
    async fn moving_tenant_moves_its_payments() {
        let state = test_state().await;
        let (owner, tenant) = seed_owner_and_tenant(&state).await;
        let payment = create_payment(&state, new_payment(owner.id, tenant.id, 2, 2025))
            .await
            .unwrap();
        let other = create_owner(
            &state,
            NewOwner {
                name: "Bamba".to_owned(),
                phone: "0000000000".to_owned(),
            },
        )
        .await
        .unwrap();

        update_tenant(
            &state,
            tenant.id,
            NewTenant {
                name: tenant.name.clone(),
                phone: tenant.phone.clone(),
                monthly_rent: tenant.monthly_rent,
                owner_id: other.id,
            },
        )
        .await
        .unwrap();

        let payment = get_payment_by_id(&state, payment.id).await.unwrap();
        assert_eq!(payment.owner_id, Some(other.id));
    }

    #[actix_web::test]
    async fn payment_filters() {
        let state = test_state().await;
        let (owner, tenant) = seed_owner_and_tenant(&state).await;
        for month in 1..=3 {
            create_payment(&state, new_payment(owner.id, tenant.id, month, 2025))
                .await
                .unwrap();
        }

        let march = ReportFilter {
            month: Some(3),
            ..ReportFilter::default()
        };
        let payments = get_payments(&state, &march).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].tenant_name, "Yao");
        assert_eq!(payments[0].owner_name, "Kouassi");

        let other_owner = ReportFilter {
            owner_id: Some(owner.id + 1),
            ..ReportFilter::default()
        };
        assert!(get_payments(&state, &other_owner).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn admin_update_changes_only_given_fields() {
        let state = test_state().await;
        let admin = create_admin(&state, "admin".to_owned(), "hash-1".to_owned())
            .await
            .unwrap();

        let updated = update_admin(&state, admin.id, None, Some("hash-2".to_owned()))
            .await
            .unwrap();
        assert_eq!(updated.username, "admin");
        assert_eq!(updated.pwd_hash, "hash-2");

        let renamed = update_admin(&state, admin.id, Some("gestion".to_owned()), None)
            .await
            .unwrap();
        assert_eq!(renamed.username, "gestion");
        assert_eq!(renamed.pwd_hash, "hash-2");
    }

    #[actix_web::test]
    async fn unique_index_migration_keeps_earliest_payment() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(include_str!("../migrations/20250101000000_init.sql"))
            .execute(&pool)
            .await
            .unwrap();
        sqlx::raw_sql(
            "INSERT INTO owners (id, name, created_at, updated_at)
                 VALUES (1, 'Kouassi', '2025-01-01', '2025-01-01');
             INSERT INTO tenants (id, name, monthly_rent, owner_id, created_at, updated_at)
                 VALUES (1, 'Yao', 50000, 1, '2025-01-01', '2025-01-01');
             INSERT INTO payments
                 (id, owner_id, tenant_id, payment_date, month, year, amount, created_at, updated_at)
             VALUES
                 (1, 1, 1, '2025-03-10', 3, 2025, 50000, '2025-03-10', '2025-03-10'),
                 (2, 1, 1, '2025-03-02', 3, 2025, 50000, '2025-03-02', '2025-03-02'),
                 (3, 1, 1, '2025-03-02', 3, 2025, 50000, '2025-03-02', '2025-03-02'),
                 (4, 1, 1, '2025-03-02', 4, 2025, 50000, '2025-03-02', '2025-03-02');",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::raw_sql(include_str!(
            "../migrations/20250102000000_unique_monthly_payment.sql"
        ))
        .execute(&pool)
        .await
        .unwrap();

        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM payments ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(ids, [2, 4]);

        let duplicate = sqlx::query(
            "INSERT INTO payments
                 (owner_id, tenant_id, payment_date, month, year, amount, created_at, updated_at)
             VALUES (1, 1, '2025-03-20', 3, 2025, 100, '2025-03-20', '2025-03-20')",
        )
        .execute(&pool)
        .await;
        assert!(duplicate.is_err());
    }
}
