use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::instrument;

use crate::{
    error::LedgerError,
    ledger::{Ledger, NewInvoice},
    model::{Invoice, InvoiceStats},
    primitives::{
        BySaltQuery, ListInvoicesQuery, PatchInvoiceRequest, PostInvoiceRequest,
        RecentInvoicesQuery,
    },
};

#[utoipa::path(
    get,
    path = "/invoices",
    params(ListInvoicesQuery),
    responses(
        (status = 200, description = "list invoices, most recent first", body = [Invoice])
    ),
)]
#[instrument(name = "list_invoices", skip(ledger), err)]
pub async fn list_invoices(
    State(ledger): State<Ledger>,
    Query(params): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<Invoice>>, LedgerError> {
    let invoices = ledger
        .list_invoices(params.status, params.limit, params.merchant.as_deref())
        .await?;

    Ok(Json(invoices))
}

#[utoipa::path(
    get,
    path = "/invoices/merchant/{address}",
    responses(
        (status = 200, description = "invoices for a merchant, possibly empty", body = [Invoice])
    ),
    params(
        ("address" = String, Path, description = "plaintext merchant address"),
    )
)]
#[instrument(name = "get_merchant_invoices", skip(ledger), err)]
pub async fn get_merchant_invoices(
    Path(address): Path<String>,
    State(ledger): State<Ledger>,
) -> Result<Json<Vec<Invoice>>, LedgerError> {
    let invoices = ledger.merchant_invoices(&address).await?;

    Ok(Json(invoices))
}

#[utoipa::path(
    get,
    path = "/invoices/recent",
    params(RecentInvoicesQuery),
    responses(
        (status = 200, description = "most recent invoices", body = [Invoice])
    ),
)]
#[instrument(name = "get_recent_invoices", skip(ledger), err)]
pub async fn get_recent_invoices(
    State(ledger): State<Ledger>,
    Query(params): Query<RecentInvoicesQuery>,
) -> Result<Json<Vec<Invoice>>, LedgerError> {
    let invoices = ledger.recent_invoices(params.limit).await?;

    Ok(Json(invoices))
}

#[utoipa::path(
    get,
    path = "/invoices/by-salt",
    params(BySaltQuery),
    responses(
        (status = 200, description = "invoice matched by salt and amount", body = Invoice),
        (status = 400, description = "missing salt or amount"),
        (status = 404, description = "no invoice matches"),
    ),
)]
#[instrument(name = "get_invoice_by_salt", skip(ledger), err)]
pub async fn get_invoice_by_salt(
    State(ledger): State<Ledger>,
    Query(params): Query<BySaltQuery>,
) -> Result<Json<Invoice>, LedgerError> {
    let salt = params
        .salt
        .filter(|salt| !salt.is_empty())
        .ok_or(LedgerError::MissingSaltOrAmount)?;
    let amount = params.amount.ok_or(LedgerError::MissingSaltOrAmount)?;

    let invoice = ledger.invoice_by_salt(&salt, amount).await?;

    Ok(Json(invoice))
}

#[utoipa::path(
    get,
    path = "/invoices/stats",
    responses(
        (status = 200, description = "aggregate invoice counts", body = InvoiceStats)
    ),
)]
#[instrument(name = "get_invoice_stats", skip(ledger), err)]
pub async fn get_invoice_stats(
    State(ledger): State<Ledger>,
) -> Result<Json<InvoiceStats>, LedgerError> {
    let stats = ledger.stats().await?;

    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/invoice/{hash}",
    responses(
        (status = 200, description = "invoice for the given hash", body = Invoice),
        (status = 404, description = "unknown invoice hash"),
    ),
    params(
        ("hash" = String, Path, description = "invoice hash"),
    )
)]
#[instrument(name = "get_invoice_by_hash", skip(ledger), err)]
pub async fn get_invoice_by_hash(
    Path(hash): Path<String>,
    State(ledger): State<Ledger>,
) -> Result<Json<Invoice>, LedgerError> {
    let invoice = ledger.invoice_by_hash(&hash).await?;

    Ok(Json(invoice))
}

#[utoipa::path(
    post,
    path = "/invoices",
    request_body = PostInvoiceRequest,
    responses(
        (status = 200, description = "created or replaced invoice", body = Invoice),
        (status = 400, description = "missing required fields"),
    ),
)]
#[instrument(name = "post_invoice", skip(ledger, request), err)]
pub async fn post_invoice(
    State(ledger): State<Ledger>,
    Json(request): Json<PostInvoiceRequest>,
) -> Result<Json<Invoice>, LedgerError> {
    let invoice_hash = request
        .invoice_hash
        .filter(|hash| !hash.is_empty())
        .ok_or(LedgerError::MissingFields)?;
    let merchant_address = request
        .merchant_address
        .filter(|address| !address.is_empty())
        .ok_or(LedgerError::MissingFields)?;
    let amount = request
        .amount
        .filter(|amount| *amount != 0.0)
        .ok_or(LedgerError::MissingFields)?;

    let invoice = ledger
        .create_invoice(NewInvoice {
            invoice_hash,
            merchant_address,
            amount,
            memo: request.memo,
            status: request.status,
            invoice_transaction_id: request.invoice_transaction_id,
            salt: request.salt.filter(|salt| !salt.is_empty()),
            invoice_type: request.invoice_type,
        })
        .await?;

    Ok(Json(invoice))
}

#[utoipa::path(
    patch,
    path = "/invoices/{hash}",
    request_body = PatchInvoiceRequest,
    responses(
        (status = 200, description = "merged invoice", body = Invoice),
        (status = 404, description = "unknown invoice hash"),
    ),
    params(
        ("hash" = String, Path, description = "invoice hash"),
    )
)]
#[instrument(name = "patch_invoice", skip(ledger, request), err)]
pub async fn patch_invoice(
    Path(hash): Path<String>,
    State(ledger): State<Ledger>,
    Json(request): Json<PatchInvoiceRequest>,
) -> Result<Json<Invoice>, LedgerError> {
    let invoice = ledger.update_invoice(&hash, request).await?;

    Ok(Json(invoice))
}
