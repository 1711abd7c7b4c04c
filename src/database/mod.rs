use async_trait::async_trait;

use crate::{
    error::LedgerError,
    model::{Invoice, InvoiceStats, InvoiceStatus},
};

pub mod postgres;

/// Partial update applied to an existing invoice row. Address fields arrive
/// here already encrypted; the store never sees plaintext.
#[derive(Debug, Clone, Default)]
pub struct InvoiceUpdate {
    pub status: Option<InvoiceStatus>,
    pub payer_address: Option<String>,
    pub payment_tx_id: Option<String>,
    pub block_settled: Option<i64>,
}

#[async_trait]
pub trait Database {
    type DB: sqlx::Database;

    async fn begin_tx(&self) -> Result<sqlx::Transaction<'static, Self::DB>, sqlx::Error>;

    /// Insert or fully replace the mutable columns of the row matched by
    /// `invoice_hash`. The payment history is never replaced by this call.
    async fn upsert_invoice(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        invoice: &Invoice,
    ) -> Result<(), LedgerError>;

    async fn get_invoice(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        hash: &str,
    ) -> Result<Option<Invoice>, LedgerError>;

    /// Lookup by salt with a tolerant amount match.
    async fn get_invoice_by_salt(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        salt: &str,
        amount: f64,
    ) -> Result<Option<Invoice>, LedgerError>;

    async fn list_recent(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        limit: i64,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, LedgerError>;

    /// Read-merge-write of a partial update as a single atomic unit. The
    /// payment history append is idempotent. Returns `None` when no row
    /// matches the hash.
    async fn apply_update(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
        hash: &str,
        update: &InvoiceUpdate,
    ) -> Result<Option<Invoice>, LedgerError>;

    /// Aggregate counts over stored rows. The distinct-merchant count works
    /// on ciphertext equality, which holds because the codec is
    /// deterministic.
    async fn invoice_stats(
        &self,
        tx: &mut sqlx::Transaction<'static, Self::DB>,
    ) -> Result<InvoiceStats, LedgerError>;
}
