//! PostgreSQL implementation of Ledger.
//!
//! Status writes are a single conditional `UPDATE ... WHERE status = $expected`
//! that also matches the invoice observation time the caller read, so two
//! writers racing on one payment cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    NewPayment, Payment, PaymentMethod, PaymentStatus, PaymentType, StatusUpdate, User,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, StateMachine, Timestamp, UserId,
};
use crate::ports::Ledger;

const SUBSCRIPTION_UNIQUE_INDEX: &str = "payments_provider_subscription_id_key";
const PAYMENT_USER_FK: &str = "payments_user_id_fkey";

const PAYMENT_COLUMNS: &str = "id, user_id, provider_subscription_id, amount, payment_method, \
     payment_type, status, invoice_id, invoice_observed_at, create_date, expire_date";

/// PostgreSQL implementation of the Ledger port.
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: Uuid,
    provider_subscription_id: String,
    amount: i64,
    payment_method: String,
    payment_type: String,
    status: String,
    invoice_id: Option<String>,
    invoice_observed_at: Option<DateTime<Utc>>,
    create_date: DateTime<Utc>,
    expire_date: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            provider_subscription_id: row.provider_subscription_id,
            amount: row.amount,
            payment_method: row.payment_method.parse::<PaymentMethod>().map_err(corrupt)?,
            payment_type: row.payment_type.parse::<PaymentType>().map_err(corrupt)?,
            status: row.status.parse::<PaymentStatus>().map_err(corrupt)?,
            invoice_id: row.invoice_id,
            invoice_observed_at: row.invoice_observed_at.map(Timestamp::from_datetime),
            create_date: Timestamp::from_datetime(row.create_date),
            expire_date: Timestamp::from_datetime(row.expire_date),
        })
    }
}

/// Database row representation of a user.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    provider_customer_id: Option<String>,
    default_payment_instrument_id: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            name: row.name,
            provider_customer_id: row.provider_customer_id,
            default_payment_instrument_id: row.default_payment_instrument_id,
        }
    }
}

fn corrupt(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored value: {}", err))
}

fn user_not_found(user_id: &UserId) -> DomainError {
    DomainError::new(ErrorCode::UserNotFound, "User not found")
        .with_detail("user_id", user_id.to_string())
}

impl PostgresLedger {
    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS);
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(payment_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::database)?;
        row.map(Payment::try_from).transpose()
    }

    /// Explain why a conditional update matched no row.
    async fn update_miss(
        &self,
        payment_id: &PaymentId,
        update: &StatusUpdate,
    ) -> DomainError {
        match self.fetch_payment(payment_id).await {
            Ok(None) => DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                .with_detail("payment_id", payment_id.to_string()),
            Ok(Some(current)) if current.status != update.expected_status => DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Payment status changed concurrently: expected {}, found {}",
                    update.expected_status, current.status
                ),
            )
            .with_detail("payment_id", payment_id.to_string()),
            Ok(Some(current))
                if current.invoice_observed_at != update.expected_invoice_observed_at =>
            {
                DomainError::new(
                    ErrorCode::ConcurrentModification,
                    "Payment invoice changed concurrently",
                )
                .with_detail("payment_id", payment_id.to_string())
            }
            Ok(Some(_)) => DomainError::new(
                ErrorCode::DatabaseError,
                "Conditional status update matched no row",
            ),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl Ledger for PostgresLedger {
    async fn find_payment_by_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE provider_subscription_id = $1",
            PAYMENT_COLUMNS
        );
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(provider_subscription_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::database)?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_user_by_id(&self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, name, provider_customer_id, default_payment_instrument_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        Ok(row.map(User::from))
    }

    async fn create_user(&self, user: &User) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, provider_customer_id, default_payment_instrument_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.provider_customer_id)
        .bind(&user.default_payment_instrument_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return DomainError::validation("id", "User already exists");
                }
            }
            DomainError::database(format!("Failed to save user: {}", e))
        })?;

        Ok(())
    }

    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        let payment = payment.into_payment(PaymentId::new());
        let subscription_id = payment.provider_subscription_id.clone();
        let user_id = payment.user_id;

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, provider_subscription_id, amount, payment_method,
                payment_type, status, invoice_id, invoice_observed_at, create_date, expire_date
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.user_id.as_uuid())
        .bind(&payment.provider_subscription_id)
        .bind(payment.amount)
        .bind(payment.payment_method.as_str())
        .bind(payment.payment_type.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.invoice_id)
        .bind(payment.invoice_observed_at.map(|t| *t.as_datetime()))
        .bind(payment.create_date.as_datetime())
        .bind(payment.expire_date.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                match db_err.constraint() {
                    Some(SUBSCRIPTION_UNIQUE_INDEX) => {
                        return DomainError::new(
                            ErrorCode::DuplicateSubscription,
                            "A payment already exists for this subscription",
                        )
                        .with_detail("subscription_id", subscription_id.clone());
                    }
                    Some(PAYMENT_USER_FK) => return user_not_found(&user_id),
                    _ => {}
                }
            }
            DomainError::database(format!("Failed to save payment: {}", e))
        })?;

        Ok(payment)
    }

    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        update: StatusUpdate,
    ) -> Result<Payment, DomainError> {
        update
            .expected_status
            .transition_to(update.new_status)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;

        let sql = format!(
            r#"
            UPDATE payments SET
                status = $3,
                invoice_id = COALESCE($4, invoice_id),
                invoice_observed_at = COALESCE($5, invoice_observed_at),
                updated_at = now()
            WHERE id = $1 AND status = $2 AND invoice_observed_at IS NOT DISTINCT FROM $6
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(payment_id.as_uuid())
            .bind(update.expected_status.as_str())
            .bind(update.new_status.as_str())
            .bind(&update.invoice_id)
            .bind(update.invoice_observed_at.map(|t| *t.as_datetime()))
            .bind(update.expected_invoice_observed_at.map(|t| *t.as_datetime()))
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::database)?;

        match row {
            Some(row) => Payment::try_from(row),
            None => Err(self.update_miss(payment_id, &update).await),
        }
    }

    async fn update_user_customer_id(
        &self,
        user_id: &UserId,
        provider_customer_id: &str,
    ) -> Result<String, DomainError> {
        let stored: Option<(Option<String>,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET provider_customer_id = COALESCE(provider_customer_id, $2)
            WHERE id = $1
            RETURNING provider_customer_id
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(provider_customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        match stored {
            Some((Some(id),)) => Ok(id),
            Some((None,)) => Err(DomainError::database("customer id was not stored")),
            None => Err(user_not_found(user_id)),
        }
    }

    async fn update_user_default_instrument(
        &self,
        user_id: &UserId,
        instrument_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET default_payment_instrument_id = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(instrument_id)
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(user_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> PaymentRow {
        PaymentRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            provider_subscription_id: "sub_1".to_string(),
            amount: 1999,
            payment_method: "CARD".to_string(),
            payment_type: "MONTHLY".to_string(),
            status: status.to_string(),
            invoice_id: None,
            invoice_observed_at: None,
            create_date: Utc::now(),
            expire_date: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_payment() {
        let payment = Payment::try_from(row("ACTIVE")).unwrap();
        assert_eq!(payment.status, PaymentStatus::Active);
        assert_eq!(payment.payment_method, PaymentMethod::Card);
        assert_eq!(payment.payment_type, PaymentType::Monthly);
        assert_eq!(payment.invoice_observed_at, None);
    }

    #[test]
    fn row_keeps_invoice_observation_time() {
        let observed = Utc::now();
        let mut row = row("ACTIVE");
        row.invoice_id = Some("in_2".to_string());
        row.invoice_observed_at = Some(observed);

        let payment = Payment::try_from(row).unwrap();
        assert_eq!(
            payment.invoice_observed_at,
            Some(Timestamp::from_datetime(observed))
        );
    }

    #[test]
    fn unknown_stored_status_is_a_database_error() {
        let err = Payment::try_from(row("PAST_DUE")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn user_row_converts_to_user() {
        let id = Uuid::new_v4();
        let user = User::from(UserRow {
            id,
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            provider_customer_id: Some("cus_1".to_string()),
            default_payment_instrument_id: None,
        });
        assert_eq!(user.id, UserId::from_uuid(id));
        assert_eq!(user.provider_customer_id.as_deref(), Some("cus_1"));
    }
}
