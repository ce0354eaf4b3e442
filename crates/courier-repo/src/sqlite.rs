use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use courier_types::domain::parcel::{DeliveryStatus, Parcel, ParcelQuery, PaymentStatus};
use courier_types::domain::payment::PaymentRecord;
use courier_types::domain::rider::{Rider, RiderQuery, RiderStatus, WorkStatus};
use courier_types::domain::tracking::TrackingEvent;
use courier_types::domain::user::{Role, User, UserQuery};
use courier_types::ports::parcel_repository::ParcelRepository;
use courier_types::ports::payment_repository::PaymentRepository;
use courier_types::ports::rider_repository::RiderRepository;
use courier_types::ports::store::RepoError;
use courier_types::ports::tracking_repository::TrackingRepository;
use courier_types::ports::user_repository::UserRepository;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

pub struct SqliteRepo {
    pool: SqlitePool,
}

fn db_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Duplicate(db.message().to_string())
        }
        _ => RepoError::DbError(e.to_string()),
    }
}

fn decode_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::DbError(e.to_string())
}

// Fixed precision keeps the text columns sortable.
fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(decode_err)?
        .with_timezone(&Utc))
}

fn parse_id(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(decode_err)
}

#[derive(FromRow)]
struct DbUser {
    id: String,
    email: String,
    display_name: String,
    photo_url: Option<String>,
    role: String,
    created_at: String,
}

impl DbUser {
    fn into_user(self) -> Result<User, RepoError> {
        Ok(User {
            id: parse_id(&self.id)?,
            email: self.email,
            display_name: self.display_name,
            photo_url: self.photo_url,
            role: Role::from_str(&self.role).map_err(decode_err)?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbRider {
    id: String,
    name: String,
    email: String,
    rider_district: String,
    status: String,
    work_status: String,
    created_at: String,
}

impl DbRider {
    fn into_rider(self) -> Result<Rider, RepoError> {
        Ok(Rider {
            id: parse_id(&self.id)?,
            name: self.name,
            email: self.email,
            rider_district: self.rider_district,
            status: RiderStatus::from_str(&self.status).map_err(decode_err)?,
            work_status: WorkStatus::from_str(&self.work_status).map_err(decode_err)?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbParcel {
    id: String,
    tracking_id: String,
    sender_email: String,
    parcel_name: String,
    courier_cost: f64,
    payment_status: String,
    delivery_status: String,
    rider_id: Option<String>,
    rider_name: Option<String>,
    rider_email: Option<String>,
    requested_at: String,
    updated_at: String,
    details_json: String,
}

impl DbParcel {
    fn into_parcel(self) -> Result<Parcel, RepoError> {
        let details: Map<String, Value> =
            serde_json::from_str(&self.details_json).map_err(decode_err)?;
        Ok(Parcel {
            id: parse_id(&self.id)?,
            tracking_id: self.tracking_id,
            sender_email: self.sender_email,
            parcel_name: self.parcel_name,
            courier_cost: self.courier_cost,
            payment_status: PaymentStatus::from_str(&self.payment_status).map_err(decode_err)?,
            delivery_status: DeliveryStatus::from_str(&self.delivery_status)
                .map_err(decode_err)?,
            rider_id: self.rider_id.as_deref().map(parse_id).transpose()?,
            rider_name: self.rider_name,
            rider_email: self.rider_email,
            requested_at: parse_ts(&self.requested_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            details,
        })
    }
}

#[derive(FromRow)]
struct DbTrackingEvent {
    tracking_id: String,
    status: String,
    details: String,
    created_at: String,
}

impl DbTrackingEvent {
    fn into_event(self) -> Result<TrackingEvent, RepoError> {
        Ok(TrackingEvent {
            tracking_id: self.tracking_id,
            status: DeliveryStatus::from_str(&self.status).map_err(decode_err)?,
            details: self.details,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbPayment {
    id: String,
    transaction_id: String,
    parcel_id: String,
    parcel_name: String,
    customer_email: String,
    amount: f64,
    currency: String,
    payment_status: String,
    tracking_id: String,
    paid_at: String,
}

impl DbPayment {
    fn into_payment(self) -> Result<PaymentRecord, RepoError> {
        Ok(PaymentRecord {
            id: parse_id(&self.id)?,
            transaction_id: self.transaction_id,
            parcel_id: parse_id(&self.parcel_id)?,
            parcel_name: self.parcel_name,
            customer_email: self.customer_email,
            amount: self.amount,
            currency: self.currency,
            payment_status: PaymentStatus::from_str(&self.payment_status).map_err(decode_err)?,
            tracking_id: self.tracking_id,
            paid_at: parse_ts(&self.paid_at)?,
        })
    }
}

const USER_COLUMNS: &str = "id, email, display_name, photo_url, role, created_at";
const RIDER_COLUMNS: &str = "id, name, email, rider_district, status, work_status, created_at";
const PARCEL_COLUMNS: &str = "id, tracking_id, sender_email, parcel_name, courier_cost, payment_status, delivery_status, rider_id, rider_name, rider_email, requested_at, updated_at, details_json";
const PAYMENT_COLUMNS: &str = "id, transaction_id, parcel_id, parcel_name, customer_email, amount, currency, payment_status, tracking_id, paid_at";

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_courier.sql");
        for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl UserRepository for SqliteRepo {
    async fn insert_user(&self, user: User) -> Result<User, RepoError> {
        sqlx::query(
            "INSERT INTO users (id, email, display_name, photo_url, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.photo_url)
        .bind(user.role.as_str())
        .bind(ts(&user.created_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbUser::into_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbUser::into_user).transpose()
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, RepoError> {
        let search = query.search.as_ref().map(|s| s.to_lowercase());
        let rows: Vec<DbUser> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE (? IS NULL OR instr(lower(display_name), ?) > 0)
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(&search)
        .bind(&search)
        .bind(query.limit as i64)
        .bind(query.skip as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(DbUser::into_user).collect()
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, RepoError> {
        let updated = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_user(id).await
    }

    async fn set_user_role_by_email(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<User>, RepoError> {
        let updated = sqlx::query("UPDATE users SET role = ? WHERE email = ?")
            .bind(role.as_str())
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_user_by_email(email).await
    }
}

#[async_trait]
impl RiderRepository for SqliteRepo {
    async fn insert_rider(&self, rider: Rider) -> Result<Rider, RepoError> {
        sqlx::query(
            "INSERT INTO riders (id, name, email, rider_district, status, work_status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rider.id.to_string())
        .bind(&rider.name)
        .bind(&rider.email)
        .bind(&rider.rider_district)
        .bind(rider.status.as_str())
        .bind(rider.work_status.as_str())
        .bind(ts(&rider.created_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rider)
    }

    async fn find_rider(&self, id: Uuid) -> Result<Option<Rider>, RepoError> {
        let row: Option<DbRider> =
            sqlx::query_as(&format!("SELECT {RIDER_COLUMNS} FROM riders WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbRider::into_rider).transpose()
    }

    async fn list_riders(&self, query: &RiderQuery) -> Result<Vec<Rider>, RepoError> {
        let status = query.status.map(|s| s.as_str());
        let work_status = query.work_status.map(|w| w.as_str());
        let rows: Vec<DbRider> = sqlx::query_as(&format!(
            "SELECT {RIDER_COLUMNS} FROM riders
             WHERE (? IS NULL OR status = ?)
               AND (? IS NULL OR work_status = ?)
               AND (? IS NULL OR rider_district = ?)
             ORDER BY created_at DESC"
        ))
        .bind(status)
        .bind(status)
        .bind(work_status)
        .bind(work_status)
        .bind(&query.district)
        .bind(&query.district)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(DbRider::into_rider).collect()
    }

    async fn set_rider_status(
        &self,
        id: Uuid,
        status: RiderStatus,
    ) -> Result<Option<Rider>, RepoError> {
        let updated = sqlx::query("UPDATE riders SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_rider(id).await
    }

    async fn swap_rider_work_status(
        &self,
        id: Uuid,
        from: WorkStatus,
        to: WorkStatus,
    ) -> Result<bool, RepoError> {
        let updated =
            sqlx::query("UPDATE riders SET work_status = ? WHERE id = ? AND work_status = ?")
                .bind(to.as_str())
                .bind(id.to_string())
                .bind(from.as_str())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(updated.rows_affected() == 1)
    }
}

#[async_trait]
impl ParcelRepository for SqliteRepo {
    async fn insert_parcel(&self, parcel: Parcel) -> Result<Parcel, RepoError> {
        let details_json = serde_json::to_string(&parcel.details).map_err(decode_err)?;
        sqlx::query(
            "INSERT INTO parcels (id, tracking_id, sender_email, parcel_name, courier_cost, payment_status, delivery_status, rider_id, rider_name, rider_email, requested_at, updated_at, details_json)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(parcel.id.to_string())
        .bind(&parcel.tracking_id)
        .bind(&parcel.sender_email)
        .bind(&parcel.parcel_name)
        .bind(parcel.courier_cost)
        .bind(parcel.payment_status.as_str())
        .bind(parcel.delivery_status.as_str())
        .bind(parcel.rider_id.map(|id| id.to_string()))
        .bind(&parcel.rider_name)
        .bind(&parcel.rider_email)
        .bind(ts(&parcel.requested_at))
        .bind(ts(&parcel.updated_at))
        .bind(details_json)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(parcel)
    }

    async fn find_parcel(&self, id: Uuid) -> Result<Option<Parcel>, RepoError> {
        let row: Option<DbParcel> =
            sqlx::query_as(&format!("SELECT {PARCEL_COLUMNS} FROM parcels WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbParcel::into_parcel).transpose()
    }

    async fn list_parcels(&self, query: &ParcelQuery) -> Result<Vec<Parcel>, RepoError> {
        let status = query.delivery_status.map(|s| s.as_str());
        let excluded = query.exclude_status.map(|s| s.as_str());
        let rows: Vec<DbParcel> = sqlx::query_as(&format!(
            "SELECT {PARCEL_COLUMNS} FROM parcels
             WHERE (? IS NULL OR sender_email = ?)
               AND (? IS NULL OR rider_email = ?)
               AND (? IS NULL OR delivery_status = ?)
               AND (? IS NULL OR delivery_status != ?)
             ORDER BY requested_at DESC"
        ))
        .bind(&query.sender_email)
        .bind(&query.sender_email)
        .bind(&query.rider_email)
        .bind(&query.rider_email)
        .bind(status)
        .bind(status)
        .bind(excluded)
        .bind(excluded)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(DbParcel::into_parcel).collect()
    }

    async fn replace_parcel_if(
        &self,
        expected: DeliveryStatus,
        parcel: &Parcel,
    ) -> Result<bool, RepoError> {
        let details_json = serde_json::to_string(&parcel.details).map_err(decode_err)?;
        let updated = sqlx::query(
            "UPDATE parcels SET sender_email = ?, parcel_name = ?, courier_cost = ?, payment_status = ?, delivery_status = ?, rider_id = ?, rider_name = ?, rider_email = ?, updated_at = ?, details_json = ?
             WHERE id = ? AND delivery_status = ?",
        )
        .bind(&parcel.sender_email)
        .bind(&parcel.parcel_name)
        .bind(parcel.courier_cost)
        .bind(parcel.payment_status.as_str())
        .bind(parcel.delivery_status.as_str())
        .bind(parcel.rider_id.map(|id| id.to_string()))
        .bind(&parcel.rider_name)
        .bind(&parcel.rider_email)
        .bind(ts(&parcel.updated_at))
        .bind(details_json)
        .bind(parcel.id.to_string())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(updated.rows_affected() == 1)
    }

    async fn delete_parcel(&self, id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM parcels WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl TrackingRepository for SqliteRepo {
    async fn append_event(&self, event: TrackingEvent) -> Result<TrackingEvent, RepoError> {
        sqlx::query(
            "INSERT INTO tracking_events (tracking_id, status, details, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&event.tracking_id)
        .bind(event.status.as_str())
        .bind(&event.details)
        .bind(ts(&event.created_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(event)
    }

    async fn events_for(&self, tracking_id: &str) -> Result<Vec<TrackingEvent>, RepoError> {
        let rows: Vec<DbTrackingEvent> = sqlx::query_as(
            "SELECT tracking_id, status, details, created_at FROM tracking_events
             WHERE tracking_id = ? ORDER BY seq ASC",
        )
        .bind(tracking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(DbTrackingEvent::into_event).collect()
    }
}

#[async_trait]
impl PaymentRepository for SqliteRepo {
    async fn insert_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord, RepoError> {
        sqlx::query(
            "INSERT INTO payments (id, transaction_id, parcel_id, parcel_name, customer_email, amount, currency, payment_status, tracking_id, paid_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(payment.id.to_string())
        .bind(&payment.transaction_id)
        .bind(payment.parcel_id.to_string())
        .bind(&payment.parcel_name)
        .bind(&payment.customer_email)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.payment_status.as_str())
        .bind(&payment.tracking_id)
        .bind(ts(&payment.paid_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(payment)
    }

    async fn find_payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = ?"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(DbPayment::into_payment).transpose()
    }

    async fn list_payments(
        &self,
        customer_email: Option<&str>,
    ) -> Result<Vec<PaymentRecord>, RepoError> {
        let rows: Vec<DbPayment> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE (? IS NULL OR customer_email = ?)
             ORDER BY paid_at DESC"
        ))
        .bind(customer_email)
        .bind(customer_email)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(DbPayment::into_payment).collect()
    }
}
