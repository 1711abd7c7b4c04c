//! Request and response objects for the invoice endpoints. All of these are
//! serializable with serde and documented via utoipa.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::model::{InvoiceStatus, InvoiceType};

/// Body of `POST /invoices`. Required fields are modeled as options so the
/// handler can reject incomplete payloads with a client error instead of a
/// deserialization rejection.
#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct PostInvoiceRequest {
    pub invoice_hash: Option<String>,
    #[schema(example = "aleo1qyqszqgqqyqszqgqqyqszqgqqyqszqgqqyqszqgpq5yc2t")]
    pub merchant_address: Option<String>,
    #[schema(example = 5.0)]
    pub amount: Option<f64>,
    pub memo: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub invoice_transaction_id: Option<String>,
    pub salt: Option<String>,
    #[schema(value_type = Option<i32>, example = 0)]
    pub invoice_type: Option<InvoiceType>,
}

/// Body of `PATCH /invoices/{hash}`. Every field is optional; only supplied
/// fields are merged. `payment_tx_ids` carries a single new transaction id
/// which is appended to the stored history if not already present.
#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct PatchInvoiceRequest {
    pub status: Option<InvoiceStatus>,
    #[schema(example = "at1v9rzq7yxmq7y6jtt3kpmcpzvhgyw9sgxy5l6m3q0wq0q9k2xsyqsrr5me")]
    pub payment_tx_ids: Option<String>,
    pub payer_address: Option<String>,
    pub block_settled: Option<i64>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListInvoicesQuery {
    pub status: Option<InvoiceStatus>,
    pub limit: Option<i64>,
    pub merchant: Option<String>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentInvoicesQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BySaltQuery {
    pub salt: Option<String>,
    pub amount: Option<f64>,
}
