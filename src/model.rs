use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of an invoice. `Pending` is the only initial state; `Settled`
/// is reached through an explicit update, `Expired` is accepted on update
/// but never set by the service itself.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Pending,
    Settled,
    Expired,
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Settled => write!(f, "SETTLED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SETTLED" => Ok(Self::Settled),
            "EXPIRED" => Ok(Self::Expired),
            _ => Err(()),
        }
    }
}

/// Wire representation is a plain integer: 0 = Standard, 1 = MultiPay.
/// Anything else coerces to Standard.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(from = "i32", into = "i32")]
pub enum InvoiceType {
    #[default]
    Standard,
    MultiPay,
}

impl From<i32> for InvoiceType {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::MultiPay,
            _ => Self::Standard,
        }
    }
}

impl From<InvoiceType> for i32 {
    fn from(value: InvoiceType) -> Self {
        match value {
            InvoiceType::Standard => 0,
            InvoiceType::MultiPay => 1,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, ToSchema)]
pub struct Invoice {
    #[schema(example = "4845153046196275708485173841975167133484731743872038474601123552622426549942field")]
    pub invoice_hash: String,
    /// Encrypted at rest, plaintext on the wire.
    #[schema(example = "aleo1qyqszqgqqyqszqgqqyqszqgqqyqszqgqqyqszqgpq5yc2t")]
    pub merchant_address: String,
    pub payer_address: Option<String>,
    #[schema(example = 5.0)]
    pub amount: f64,
    pub memo: Option<String>,
    pub status: InvoiceStatus,
    pub invoice_transaction_id: Option<String>,
    pub payment_tx_ids: Vec<String>,
    pub salt: Option<String>,
    #[schema(value_type = i32, example = 0)]
    pub invoice_type: InvoiceType,
    pub block_settled: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Default, ToSchema)]
pub struct InvoiceStats {
    pub total: i64,
    pub pending: i64,
    pub settled: i64,
    pub merchants: i64,
}

/// Normalize the stored payment history to a structured list.
///
/// Older rows persisted the history as a JSON string containing an encoded
/// array rather than a JSONB array. Every read goes through this so callers
/// never have to branch on the stored shape.
pub fn normalize_payment_tx_ids(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect(),
        serde_json::Value::String(encoded) if !encoded.is_empty() => {
            serde_json::from_str::<Vec<String>>(encoded).unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            InvoiceStatus::Pending,
            InvoiceStatus::Settled,
            InvoiceStatus::Expired,
        ] {
            assert_eq!(
                InvoiceStatus::from_str(&status.to_string()),
                Ok(status)
            );
        }
        assert!(InvoiceStatus::from_str("PAID").is_err());
    }

    #[test]
    fn test_invoice_type_coercion() {
        assert_eq!(InvoiceType::from(0), InvoiceType::Standard);
        assert_eq!(InvoiceType::from(1), InvoiceType::MultiPay);
        assert_eq!(InvoiceType::from(42), InvoiceType::Standard);
        assert_eq!(i32::from(InvoiceType::MultiPay), 1);
    }

    #[test]
    fn test_normalize_structured_array() {
        let value = json!(["tx1", "tx2"]);
        assert_eq!(normalize_payment_tx_ids(&value), vec!["tx1", "tx2"]);
    }

    #[test]
    fn test_normalize_encoded_string() {
        let value = json!("[\"tx1\",\"tx2\"]");
        assert_eq!(normalize_payment_tx_ids(&value), vec!["tx1", "tx2"]);
    }

    #[test]
    fn test_normalize_degenerate_shapes() {
        assert_eq!(normalize_payment_tx_ids(&json!("")), Vec::<String>::new());
        assert_eq!(normalize_payment_tx_ids(&json!(null)), Vec::<String>::new());
        assert_eq!(
            normalize_payment_tx_ids(&json!("not json")),
            Vec::<String>::new()
        );
        assert_eq!(
            normalize_payment_tx_ids(&json!(["tx1", 7])),
            vec!["tx1"]
        );
    }
}
