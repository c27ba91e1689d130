//! Raw transaction rows as they arrive in retail CSV exports

use chrono::NaiveDateTime;
use serde::Deserialize;

/// One transaction-level row of the raw input file.
///
/// Header aliases match the Online-Retail export format so the same struct
/// deserializes both the original column names and snake_case variants.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    /// Order identifier; one invoice may span several rows
    #[serde(alias = "InvoiceNo")]
    pub invoice_no: String,

    /// Product identifier
    #[serde(alias = "StockCode")]
    pub stock_code: String,

    /// Units sold; negative values are returns
    #[serde(alias = "Quantity")]
    pub quantity: f64,

    /// Transaction timestamp, parsed lazily by the feature builder
    #[serde(alias = "InvoiceDate")]
    pub invoice_date: String,

    /// Price per unit
    #[serde(alias = "UnitPrice")]
    pub unit_price: f64,

    /// Entity identifier; absent for anonymous checkouts
    #[serde(alias = "CustomerID", default)]
    pub customer_id: Option<String>,

    /// Categorical dimension used for one-hot encoding
    #[serde(alias = "Country")]
    pub country: String,
}

/// Timestamp formats accepted in the `InvoiceDate` column.
const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y %H:%M", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M"];

impl RawTransaction {
    /// Parse the invoice date, trying each accepted format in turn.
    pub fn parse_date(&self) -> Option<NaiveDateTime> {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&self.invoice_date, fmt).ok())
    }

    /// Whether the row carries a usable entity identifier.
    pub fn has_customer(&self) -> bool {
        self.customer_id
            .as_deref()
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawTransaction {
        RawTransaction {
            invoice_no: "536365".to_string(),
            stock_code: "85123A".to_string(),
            quantity: 6.0,
            invoice_date: "01-12-2010 08:26".to_string(),
            unit_price: 2.55,
            customer_id: Some("17850".to_string()),
            country: "United Kingdom".to_string(),
        }
    }

    #[test]
    fn test_parse_date_primary_format() {
        let tx = sample();
        let dt = tx.parse_date().unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2010-12-01");
    }

    #[test]
    fn test_parse_date_iso_fallback() {
        let mut tx = sample();
        tx.invoice_date = "2010-12-01 08:26:00".to_string();
        assert!(tx.parse_date().is_some());
    }

    #[test]
    fn test_parse_date_garbage() {
        let mut tx = sample();
        tx.invoice_date = "yesterday".to_string();
        assert!(tx.parse_date().is_none());
    }

    #[test]
    fn test_has_customer() {
        let mut tx = sample();
        assert!(tx.has_customer());

        tx.customer_id = Some("  ".to_string());
        assert!(!tx.has_customer());

        tx.customer_id = None;
        assert!(!tx.has_customer());
    }

    #[test]
    fn test_csv_header_aliases() {
        let data = "InvoiceNo,StockCode,Quantity,InvoiceDate,UnitPrice,CustomerID,Country\n\
                    536365,85123A,6,01-12-2010 08:26,2.55,17850,United Kingdom\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let tx: RawTransaction = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(tx.invoice_no, "536365");
        assert_eq!(tx.quantity, 6.0);
        assert_eq!(tx.customer_id.as_deref(), Some("17850"));
    }
}
