use chrono::NaiveDate;

/// Transaction classification taken from the type column of an export line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Invoice,
    CreditNote,
    Quotation,
    Unrecognized,
}

impl TransactionKind {
    /// Case-insensitive substring match against the transaction-type label.
    pub fn classify(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("facture") {
            Self::Invoice
        } else if label.contains("avoir") {
            Self::CreditNote
        } else if label.contains("devis") {
            Self::Quotation
        } else {
            Self::Unrecognized
        }
    }

    /// Invoices and credit notes land in the same line table.
    pub fn is_invoice_like(&self) -> bool {
        matches!(self, Self::Invoice | Self::CreditNote)
    }
}

/// Validation state carried by a quotation line's status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotationStatus {
    Validated,
    Pending,
}

impl QuotationStatus {
    pub fn from_label(status: &str) -> Self {
        if status.trim().to_lowercase() == "devis validé" {
            Self::Validated
        } else {
            Self::Pending
        }
    }
}

/// One successfully parsed and classified export line.
#[derive(Debug, Clone)]
pub struct ParsedLine {
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub client_id: String,
    pub client: String,
    pub reference: String,
    pub family: Option<String>,
    pub quantity: i64,
    pub total_ttc: f64,
    pub total_document: f64,
    pub pair: Option<i64>,
    pub status: String,
    pub seller_ref: String,
}

/// Line-level invoice/credit-note record, immutable once written.
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub date: String,
    pub client_id: String,
    pub client: String,
    pub invoice_ref: String,
    pub family: Option<String>,
    pub quantity: i64,
    pub total_ttc: f64,
    pub total_invoice: f64,
    pub pair: Option<i64>,
    pub status: String,
    pub seller_ref: String,
}

/// Line-level quotation record, same replacement semantics as InvoiceLine.
#[derive(Debug, Clone)]
pub struct QuotationLine {
    pub date: String,
    pub client_id: String,
    pub client: String,
    pub quotation_ref: String,
    pub family: Option<String>,
    pub quantity: i64,
    pub total_ttc: f64,
    pub total_quotation: f64,
    pub pair: Option<i64>,
    pub status: String,
    pub seller_ref: String,
}

/// Consolidated per-(client, date) quotation header. The pipeline only ever
/// recomputes is_validated; action and comment belong to a separate workflow.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct QuotationHeader {
    pub id: Option<i64>,
    pub date: String,
    pub client_id: String,
    pub client: String,
    pub seller_ref: String,
    pub is_validated: bool,
    pub action: Option<String>,
    pub comment: Option<String>,
}

/// Per-invoice aggregate rebuilt from invoice lines for a date range.
#[derive(Debug, Clone)]
pub struct InvoiceSummary {
    pub date: String,
    pub client_id: String,
    pub client: String,
    pub invoice_ref: String,
    pub seller_ref: String,
    pub total_invoice: f64,
    pub status: String,
    pub is_optical: bool,
}
