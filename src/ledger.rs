use crate::{
    codec::AddressCodec,
    config::{BuildParams, DatabaseConfig, LedgerConfig, ServerConfig},
    database::{postgres::PostgresDB, Database, InvoiceUpdate},
    error::LedgerError,
    model::{Invoice, InvoiceStats, InvoiceStatus, InvoiceType},
    primitives::PatchInvoiceRequest,
};
use chrono::Utc;
use tracing::instrument;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 100;
const DEFAULT_RECENT_LIMIT: i64 = 10;
const MAX_RECENT_LIMIT: i64 = 50;

/// Merchant-scoped lookups decrypt and filter in memory, so they only scan
/// the most recent rows. This bounds the query instead of indexing on a
/// value the store cannot see in plaintext.
const MERCHANT_SCAN_WINDOW: i64 = 100;

/// A validated creation payload. Addresses are still plaintext here; the
/// ledger encrypts them before they reach the store.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_hash: String,
    pub merchant_address: String,
    pub amount: f64,
    pub memo: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub invoice_transaction_id: Option<String>,
    pub salt: Option<String>,
    pub invoice_type: Option<InvoiceType>,
}

#[derive(Clone)]
pub struct Ledger<DB: Database = PostgresDB> {
    pub db: DB,
    pub codec: AddressCodec,
    pub config: LedgerConfig,
    pub build_params: BuildParams,
}

impl<DB> Ledger<DB>
where
    DB: Database,
{
    pub fn new(db: DB, config: LedgerConfig, build_params: BuildParams) -> Self {
        Self {
            codec: AddressCodec::new(&config.encryption_key),
            db,
            config,
            build_params,
        }
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn list_invoices(
        &self,
        status: Option<InvoiceStatus>,
        limit: Option<i64>,
        merchant: Option<&str>,
    ) -> Result<Vec<Invoice>, LedgerError> {
        let limit = clamp_limit(limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);

        let mut tx = self.db.begin_tx().await?;
        let rows = self.db.list_recent(&mut tx, limit, status).await?;
        tx.commit().await?;

        let mut invoices = rows
            .into_iter()
            .map(|invoice| self.decrypt_invoice(invoice))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(merchant) = merchant {
            invoices.retain(|invoice| invoice.merchant_address == merchant);
        }

        Ok(invoices)
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn merchant_invoices(&self, address: &str) -> Result<Vec<Invoice>, LedgerError> {
        let mut tx = self.db.begin_tx().await?;
        let rows = self
            .db
            .list_recent(&mut tx, MERCHANT_SCAN_WINDOW, None)
            .await?;
        tx.commit().await?;

        let mut invoices = rows
            .into_iter()
            .map(|invoice| self.decrypt_invoice(invoice))
            .collect::<Result<Vec<_>, _>>()?;
        invoices.retain(|invoice| invoice.merchant_address == address);

        Ok(invoices)
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn recent_invoices(&self, limit: Option<i64>) -> Result<Vec<Invoice>, LedgerError> {
        let limit = clamp_limit(limit, DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT);

        let mut tx = self.db.begin_tx().await?;
        let rows = self.db.list_recent(&mut tx, limit, None).await?;
        tx.commit().await?;

        rows.into_iter()
            .map(|invoice| self.decrypt_invoice(invoice))
            .collect()
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn invoice_by_hash(&self, hash: &str) -> Result<Invoice, LedgerError> {
        let mut tx = self.db.begin_tx().await?;
        let invoice = self.db.get_invoice(&mut tx, hash).await?;
        tx.commit().await?;

        let invoice = invoice.ok_or(LedgerError::InvoiceNotFound)?;
        self.decrypt_invoice(invoice)
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn invoice_by_salt(&self, salt: &str, amount: f64) -> Result<Invoice, LedgerError> {
        let mut tx = self.db.begin_tx().await?;
        let invoice = self.db.get_invoice_by_salt(&mut tx, salt, amount).await?;
        tx.commit().await?;

        let invoice = invoice.ok_or(LedgerError::InvoiceNotFound)?;
        self.decrypt_invoice(invoice)
    }

    #[instrument(level = "debug", skip(self, new_invoice), err)]
    pub async fn create_invoice(&self, new_invoice: NewInvoice) -> Result<Invoice, LedgerError> {
        let merchant_plaintext = new_invoice.merchant_address.clone();
        let now = Utc::now();

        let invoice = Invoice {
            invoice_hash: new_invoice.invoice_hash.clone(),
            merchant_address: self.codec.encode(&merchant_plaintext)?,
            payer_address: None,
            amount: new_invoice.amount,
            memo: new_invoice.memo,
            status: new_invoice.status.unwrap_or(InvoiceStatus::Pending),
            invoice_transaction_id: new_invoice.invoice_transaction_id,
            payment_tx_ids: Vec::new(),
            salt: new_invoice.salt,
            invoice_type: new_invoice.invoice_type.unwrap_or_default(),
            block_settled: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin_tx().await?;
        self.db.upsert_invoice(&mut tx, &invoice).await?;
        let stored = self
            .db
            .get_invoice(&mut tx, &new_invoice.invoice_hash)
            .await?;
        tx.commit().await?;

        // The row just written must be there; treat anything else as a
        // store failure rather than a user-facing 404.
        let mut stored = stored.ok_or(LedgerError::Db(sqlx::Error::RowNotFound))?;

        // Hand back the plaintext the caller supplied instead of paying for
        // a decrypt round-trip of a value we already know.
        stored.merchant_address = merchant_plaintext;
        stored.payer_address = match stored.payer_address {
            Some(ciphertext) => Some(self.codec.decode(&ciphertext)?),
            None => None,
        };

        Ok(stored)
    }

    #[instrument(level = "debug", skip(self, patch), err)]
    pub async fn update_invoice(
        &self,
        hash: &str,
        patch: PatchInvoiceRequest,
    ) -> Result<Invoice, LedgerError> {
        let payer_plaintext = patch.payer_address.filter(|address| !address.is_empty());
        let payer_encrypted = match &payer_plaintext {
            Some(address) => Some(self.codec.encode(address)?),
            None => None,
        };

        let update = InvoiceUpdate {
            status: patch.status,
            payer_address: payer_encrypted,
            payment_tx_id: patch.payment_tx_ids.filter(|id| !id.is_empty()),
            block_settled: patch.block_settled,
        };

        let mut tx = self.db.begin_tx().await?;
        let merged = self.db.apply_update(&mut tx, hash, &update).await?;
        tx.commit().await?;

        let merged = merged.ok_or(LedgerError::InvoiceNotFound)?;
        self.decrypt_invoice(merged)
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn stats(&self) -> Result<InvoiceStats, LedgerError> {
        let mut tx = self.db.begin_tx().await?;
        let stats = self.db.invoice_stats(&mut tx).await?;
        tx.commit().await?;

        Ok(stats)
    }

    fn decrypt_invoice(&self, mut invoice: Invoice) -> Result<Invoice, LedgerError> {
        invoice.merchant_address = self.codec.decode(&invoice.merchant_address)?;
        invoice.payer_address = match invoice.payer_address {
            Some(ciphertext) => Some(self.codec.decode(&ciphertext)?),
            None => None,
        };
        Ok(invoice)
    }
}

fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

#[derive(Debug, Default)]
pub struct LedgerBuilder {
    encryption_key: Option<String>,
    db_config: Option<DatabaseConfig>,
    server_config: Option<ServerConfig>,
}

impl LedgerBuilder {
    pub fn new() -> Self {
        LedgerBuilder {
            encryption_key: None,
            db_config: None,
            server_config: None,
        }
    }

    pub fn with_encryption_key(mut self, encryption_key: String) -> Self {
        self.encryption_key = Some(encryption_key);
        self
    }

    pub fn with_db(mut self, db_config: Option<DatabaseConfig>) -> Self {
        self.db_config = db_config;
        self
    }

    pub fn with_server(mut self, server_config: Option<ServerConfig>) -> Self {
        self.server_config = server_config;
        self
    }

    pub async fn build(self) -> Result<Ledger<PostgresDB>, LedgerError> {
        let db_config = self.db_config.expect("db-config not set");
        let db = PostgresDB::new(&db_config).await?;
        db.migrate().await;

        Ok(Ledger::new(
            db,
            LedgerConfig::new(
                self.encryption_key.expect("encryption-key not set"),
                self.server_config.unwrap_or_default(),
                db_config,
            ),
            BuildParams::from_env(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 50, 100), 50);
        assert_eq!(clamp_limit(Some(20), 50, 100), 20);
        assert_eq!(clamp_limit(Some(500), 50, 100), 100);
        assert_eq!(clamp_limit(Some(0), 50, 100), 1);
        assert_eq!(clamp_limit(Some(-3), 50, 100), 1);
        assert_eq!(clamp_limit(None, 10, 50), 10);
        assert_eq!(clamp_limit(Some(200), 10, 50), 50);
    }
}
