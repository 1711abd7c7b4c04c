use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use const_format::formatcp;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use crate::{
    config::DatabaseConfig,
    error::LedgerError,
    model::{normalize_payment_tx_ids, Invoice, InvoiceStats, InvoiceStatus},
};

use super::{Database, InvoiceUpdate};

/// Amount equality tolerance for salt lookups. Client amounts travel through
/// floating point, so a stored `1.000000` must match a queried `1.0000001`.
const AMOUNT_EPSILON: f64 = 0.000001;

const COLUMNS: &str = "invoice_hash, merchant_address, payer_address, amount, memo, status, \
     invoice_transaction_id, payment_tx_ids, salt, invoice_type, block_settled, \
     created_at, updated_at";

#[derive(Clone)]
pub struct PostgresDB {
    pool: sqlx::Pool<sqlx::Postgres>,
}

impl PostgresDB {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        Ok(Self {
            pool: PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(config.db_url.as_str())
                .await?,
        })
    }

    pub async fn migrate(&self) {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .expect("Could not run migrations");
    }
}

#[async_trait]
impl Database for PostgresDB {
    type DB = sqlx::Postgres;

    async fn begin_tx(&self) -> Result<sqlx::Transaction<'static, Self::DB>, sqlx::Error> {
        self.pool.begin().await
    }

    #[instrument(level = "debug", skip(self, tx, invoice), err)]
    async fn upsert_invoice(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        invoice: &Invoice,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"INSERT INTO invoices (
                invoice_hash, merchant_address, amount, memo, status,
                invoice_transaction_id, salt, invoice_type, payment_tx_ids
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (invoice_hash) DO UPDATE SET
                merchant_address = EXCLUDED.merchant_address,
                amount = EXCLUDED.amount,
                memo = EXCLUDED.memo,
                status = EXCLUDED.status,
                invoice_transaction_id = EXCLUDED.invoice_transaction_id,
                salt = EXCLUDED.salt,
                invoice_type = EXCLUDED.invoice_type,
                updated_at = NOW()"#,
        )
        .bind(&invoice.invoice_hash)
        .bind(&invoice.merchant_address)
        .bind(invoice.amount)
        .bind(&invoice.memo)
        .bind(invoice.status.to_string())
        .bind(&invoice.invoice_transaction_id)
        .bind(&invoice.salt)
        .bind(i32::from(invoice.invoice_type))
        .bind(sqlx::types::Json(&invoice.payment_tx_ids))
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    #[instrument(level = "debug", skip(self, tx), err)]
    async fn get_invoice(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        hash: &str,
    ) -> Result<Option<Invoice>, LedgerError> {
        let row = sqlx::query_as::<_, InvoiceRow>(formatcp!(
            "SELECT {} FROM invoices WHERE invoice_hash = $1 LIMIT 1",
            COLUMNS
        ))
        .bind(hash)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(InvoiceRow::into_entity))
    }

    #[instrument(level = "debug", skip(self, tx), err)]
    async fn get_invoice_by_salt(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        salt: &str,
        amount: f64,
    ) -> Result<Option<Invoice>, LedgerError> {
        let row = sqlx::query_as::<_, InvoiceRow>(formatcp!(
            "SELECT {} FROM invoices WHERE salt = $1 AND amount BETWEEN $2 AND $3 \
             ORDER BY created_at LIMIT 1",
            COLUMNS
        ))
        .bind(salt)
        .bind(amount - AMOUNT_EPSILON)
        .bind(amount + AMOUNT_EPSILON)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(InvoiceRow::into_entity))
    }

    #[instrument(level = "debug", skip(self, tx), err)]
    async fn list_recent(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        limit: i64,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, LedgerError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, InvoiceRow>(formatcp!(
                    "SELECT {} FROM invoices WHERE status = $1 \
                     ORDER BY created_at DESC LIMIT $2",
                    COLUMNS
                ))
                .bind(status.to_string())
                .bind(limit)
                .fetch_all(&mut **tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, InvoiceRow>(formatcp!(
                    "SELECT {} FROM invoices ORDER BY created_at DESC LIMIT $1",
                    COLUMNS
                ))
                .bind(limit)
                .fetch_all(&mut **tx)
                .await?
            }
        };

        Ok(rows.into_iter().map(InvoiceRow::into_entity).collect())
    }

    #[instrument(level = "debug", skip(self, tx, update), err)]
    async fn apply_update(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        hash: &str,
        update: &InvoiceUpdate,
    ) -> Result<Option<Invoice>, LedgerError> {
        // Row lock for the read-merge-write; a concurrent append must not
        // lose a previously appended transaction id.
        let current = sqlx::query_as::<_, InvoiceRow>(formatcp!(
            "SELECT {} FROM invoices WHERE invoice_hash = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(hash)
        .fetch_optional(&mut **tx)
        .await?;

        let current = match current {
            Some(row) => row.into_entity(),
            None => return Ok(None),
        };

        let mut tx_ids = current.payment_tx_ids;
        if let Some(new_id) = &update.payment_tx_id {
            if !tx_ids.contains(new_id) {
                tx_ids.push(new_id.clone());
            }
        }

        sqlx::query(
            r#"UPDATE invoices SET
                status = COALESCE($2, status),
                payer_address = COALESCE($3, payer_address),
                block_settled = COALESCE($4, block_settled),
                payment_tx_ids = $5,
                updated_at = NOW()
            WHERE invoice_hash = $1"#,
        )
        .bind(hash)
        .bind(update.status.map(|status| status.to_string()))
        .bind(&update.payer_address)
        .bind(update.block_settled)
        .bind(sqlx::types::Json(&tx_ids))
        .execute(&mut **tx)
        .await?;

        self.get_invoice(tx, hash).await
    }

    #[instrument(level = "debug", skip(self, tx), err)]
    async fn invoice_stats(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
    ) -> Result<InvoiceStats, LedgerError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE status = 'SETTLED') AS settled,
                COUNT(DISTINCT merchant_address) AS merchants
            FROM invoices"#,
        )
        .fetch_one(&mut **tx)
        .await?;

        Ok(InvoiceStats {
            total: row.total,
            pending: row.pending,
            settled: row.settled,
            merchants: row.merchants,
        })
    }
}

#[derive(sqlx::FromRow, Debug)]
struct InvoiceRow {
    invoice_hash: String,
    merchant_address: String,
    payer_address: Option<String>,
    amount: f64,
    memo: Option<String>,
    status: String,
    invoice_transaction_id: Option<String>,
    payment_tx_ids: serde_json::Value,
    salt: Option<String>,
    invoice_type: i32,
    block_settled: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_entity(self) -> Invoice {
        Invoice {
            invoice_hash: self.invoice_hash,
            merchant_address: self.merchant_address,
            payer_address: self.payer_address,
            amount: self.amount,
            memo: self.memo,
            status: InvoiceStatus::from_str(&self.status)
                .expect("invalid status in invoice row"),
            invoice_transaction_id: self.invoice_transaction_id,
            payment_tx_ids: normalize_payment_tx_ids(&self.payment_tx_ids),
            salt: self.salt,
            invoice_type: self.invoice_type.into(),
            block_settled: self.block_settled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
struct StatsRow {
    total: i64,
    pending: i64,
    settled: i64,
    merchants: i64,
}
