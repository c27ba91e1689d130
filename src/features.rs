//! Feature builder: raw transactions to per-customer RFM feature tables
//!
//! One shared transformation produces both the reference and the current
//! snapshot so the two stay schema-compatible. Column order is fixed:
//! the eight numeric aggregates first, then one-hot country columns.

use crate::error::{MonitorError, Result};
use crate::types::{FeatureTable, RawTransaction};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Numeric feature columns, in schema order.
pub const NUMERIC_FEATURES: [&str; 8] = [
    "recency",
    "frequency",
    "monetary",
    "avg_quantity",
    "total_quantity",
    "avg_unit_price",
    "num_orders",
    "num_products",
];

/// Prefix of one-hot categorical columns.
pub const CATEGORY_PREFIX: &str = "country_";

/// Result of one feature build.
#[derive(Debug)]
pub struct BuildOutput {
    pub table: FeatureTable,
    /// Raw rows dropped for a missing entity identifier
    pub excluded_rows: u64,
    /// Category levels backing the one-hot columns, in column order
    pub categories: Vec<String>,
}

/// Running per-customer aggregates.
#[derive(Debug, Default)]
struct CustomerAgg {
    last_purchase: Option<NaiveDateTime>,
    invoices: HashSet<String>,
    stock_codes: HashSet<String>,
    monetary: f64,
    total_quantity: f64,
    unit_price_sum: f64,
    row_count: u64,
    country_counts: HashMap<String, u64>,
}

/// Transforms raw transaction rows into a per-customer feature table.
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Load raw transactions from a CSV file.
    ///
    /// A missing required column or an unreadable row is fatal: the input
    /// cannot be interpreted and no partial table is returned.
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<Vec<RawTransaction>> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| MonitorError::Schema(format!("cannot open {}: {e}", path.display())))?;

        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let tx: RawTransaction = record
                .map_err(|e| MonitorError::Schema(format!("{}: {e}", path.display())))?;
            rows.push(tx);
        }
        info!(path = %path.display(), rows = rows.len(), "Loaded raw transactions");
        Ok(rows)
    }

    /// Build the per-customer feature table.
    ///
    /// With `known_categories` (a monitoring run against an existing
    /// reference) the one-hot column set is fixed and unseen countries
    /// contribute zero vectors, never a new column. Without (a baseline
    /// training run) categories are discovered from the data and the
    /// discovered set becomes the schema of record.
    pub fn build(
        &self,
        raw: &[RawTransaction],
        known_categories: Option<&[String]>,
    ) -> Result<BuildOutput> {
        let mut excluded_rows = 0u64;
        let mut returns_dropped = 0u64;
        let mut snapshot_instant: Option<NaiveDateTime> = None;
        let mut aggs: BTreeMap<String, CustomerAgg> = BTreeMap::new();

        for tx in raw {
            if !tx.has_customer() {
                excluded_rows += 1;
                continue;
            }
            // Returns and zero-priced rows are excluded from all aggregates
            if tx.quantity <= 0.0 || tx.unit_price <= 0.0 {
                returns_dropped += 1;
                continue;
            }
            let date = tx.parse_date().ok_or_else(|| {
                MonitorError::Schema(format!(
                    "unparseable invoice date {:?} on invoice {}",
                    tx.invoice_date, tx.invoice_no
                ))
            })?;
            snapshot_instant = Some(match snapshot_instant {
                Some(current) => current.max(date),
                None => date,
            });

            let customer_id = tx.customer_id.as_deref().unwrap_or_default().trim();
            let agg = aggs.entry(customer_id.to_string()).or_default();
            agg.last_purchase = Some(match agg.last_purchase {
                Some(last) => last.max(date),
                None => date,
            });
            agg.invoices.insert(tx.invoice_no.clone());
            agg.stock_codes.insert(tx.stock_code.clone());
            agg.monetary += tx.quantity * tx.unit_price;
            agg.total_quantity += tx.quantity;
            agg.unit_price_sum += tx.unit_price;
            agg.row_count += 1;
            *agg.country_counts.entry(tx.country.clone()).or_insert(0) += 1;
        }

        if excluded_rows > 0 {
            warn!(excluded_rows, "Dropped rows with missing customer identifier");
        }
        if returns_dropped > 0 {
            debug!(returns_dropped, "Dropped returns and zero-priced rows");
        }

        let categories: Vec<String> = match known_categories {
            Some(known) => known.to_vec(),
            None => {
                let mut discovered: Vec<String> = aggs
                    .values()
                    .filter_map(modal_country)
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect();
                discovered.sort();
                discovered
            }
        };

        let mut schema: Vec<String> = NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect();
        schema.extend(categories.iter().map(|c| format!("{CATEGORY_PREFIX}{c}")));

        let mut table = FeatureTable::new(schema);
        for (customer_id, agg) in &aggs {
            let last = agg.last_purchase.ok_or_else(|| {
                MonitorError::Internal(format!("aggregate for {customer_id} has no purchase date"))
            })?;
            let instant = snapshot_instant.ok_or_else(|| {
                MonitorError::Internal("snapshot instant missing with non-empty aggregates".into())
            })?;
            let recency = (instant - last).num_days().max(0) as f64;
            let frequency = agg.invoices.len() as f64;
            let rows = agg.row_count as f64;

            let mut values = vec![
                recency,
                frequency,
                agg.monetary,
                agg.total_quantity / rows,
                agg.total_quantity,
                agg.unit_price_sum / rows,
                frequency,
                agg.stock_codes.len() as f64,
            ];
            let country = modal_country(agg);
            for cat in &categories {
                let hot = country.as_deref() == Some(cat.as_str());
                values.push(if hot { 1.0 } else { 0.0 });
            }

            // Realized lifetime value over an assumed one-year lifespan
            let clv = agg.monetary * (frequency / (recency + 1.0)) * 365.0;
            table.push_row(customer_id.clone(), values, Some(clv))?;
        }

        info!(
            customers = table.row_count(),
            features = table.schema().len(),
            "Feature table built"
        );

        Ok(BuildOutput {
            table,
            excluded_rows,
            categories,
        })
    }

    /// Recover category levels from a stored feature schema.
    pub fn categories_from_schema(schema: &[String]) -> Vec<String> {
        schema
            .iter()
            .filter_map(|c| c.strip_prefix(CATEGORY_PREFIX))
            .map(str::to_string)
            .collect()
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Most frequent country for a customer; ties break lexicographically.
fn modal_country(agg: &CustomerAgg) -> Option<String> {
    agg.country_counts
        .iter()
        .max_by(|(a_name, a_count), (b_name, b_count)| {
            a_count.cmp(b_count).then(b_name.cmp(a_name))
        })
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(
        invoice: &str,
        stock: &str,
        qty: f64,
        date: &str,
        price: f64,
        customer: Option<&str>,
        country: &str,
    ) -> RawTransaction {
        RawTransaction {
            invoice_no: invoice.to_string(),
            stock_code: stock.to_string(),
            quantity: qty,
            invoice_date: date.to_string(),
            unit_price: price,
            customer_id: customer.map(str::to_string),
            country: country.to_string(),
        }
    }

    fn sample_rows() -> Vec<RawTransaction> {
        vec![
            tx("i1", "s1", 2.0, "01-12-2010 08:00", 10.0, Some("c1"), "UK"),
            tx("i1", "s2", 1.0, "01-12-2010 08:00", 5.0, Some("c1"), "UK"),
            tx("i2", "s1", 3.0, "05-12-2010 12:00", 10.0, Some("c1"), "UK"),
            tx("i3", "s3", 1.0, "03-12-2010 09:00", 20.0, Some("c2"), "France"),
            // return row, excluded from aggregates
            tx("i4", "s1", -2.0, "04-12-2010 10:00", 10.0, Some("c1"), "UK"),
            // anonymous row, counted as excluded
            tx("i5", "s1", 1.0, "04-12-2010 10:00", 10.0, None, "UK"),
        ]
    }

    #[test]
    fn test_rfm_aggregates() {
        let out = FeatureBuilder::new().build(&sample_rows(), None).unwrap();
        let t = &out.table;

        assert_eq!(t.row_count(), 2);
        assert_eq!(out.excluded_rows, 1);

        // c1: last purchase 05-12, snapshot instant 05-12 -> recency 0
        // c2: last purchase 03-12 -> recency 2 days
        assert_eq!(t.column("recency").unwrap(), &[0.0, 2.0]);
        // c1 has invoices i1, i2
        assert_eq!(t.column("frequency").unwrap(), &[2.0, 1.0]);
        // c1 monetary: 2*10 + 1*5 + 3*10 = 55 (return excluded)
        assert_eq!(t.column("monetary").unwrap(), &[55.0, 20.0]);
        assert_eq!(t.column("num_products").unwrap(), &[2.0, 1.0]);
    }

    #[test]
    fn test_clv_label_formula() {
        let out = FeatureBuilder::new().build(&sample_rows(), None).unwrap();
        let labels = out.table.labels().unwrap();
        // c1: monetary 55, frequency 2, recency 0 -> 55 * 2 * 365
        assert!((labels[0] - 55.0 * 2.0 * 365.0).abs() < 1e-9);
        // c2: monetary 20, frequency 1, recency 2 -> 20 / 3 * 365
        assert!((labels[1] - 20.0 * (1.0 / 3.0) * 365.0).abs() < 1e-9);
    }

    #[test]
    fn test_discovered_categories_sorted_and_one_hot() {
        let out = FeatureBuilder::new().build(&sample_rows(), None).unwrap();
        assert_eq!(out.categories, vec!["France".to_string(), "UK".to_string()]);
        assert_eq!(out.table.column("country_UK").unwrap(), &[1.0, 0.0]);
        assert_eq!(out.table.column("country_France").unwrap(), &[0.0, 1.0]);
    }

    #[test]
    fn test_unseen_category_maps_to_zero_vector() {
        // Reference schema knows UK and France; current data has Germany
        let known = vec!["France".to_string(), "UK".to_string()];
        let rows = vec![tx(
            "i1",
            "s1",
            1.0,
            "01-12-2010 08:00",
            10.0,
            Some("c9"),
            "Germany",
        )];
        let out = FeatureBuilder::new().build(&rows, Some(&known)).unwrap();

        // No new column, both known columns are zero for this customer
        assert_eq!(out.table.schema().len(), NUMERIC_FEATURES.len() + 2);
        assert_eq!(out.table.column("country_UK").unwrap(), &[0.0]);
        assert_eq!(out.table.column("country_France").unwrap(), &[0.0]);
        assert!(out.table.column("country_Germany").is_none());
    }

    #[test]
    fn test_schema_stable_with_known_categories() {
        let known = vec!["France".to_string(), "UK".to_string()];
        let a = FeatureBuilder::new()
            .build(&sample_rows(), Some(&known))
            .unwrap();
        let b = FeatureBuilder::new()
            .build(&sample_rows()[..3], Some(&known))
            .unwrap();
        assert_eq!(a.table.schema(), b.table.schema());
    }

    #[test]
    fn test_unparseable_date_is_fatal() {
        let rows = vec![tx("i1", "s1", 1.0, "not-a-date", 10.0, Some("c1"), "UK")];
        let err = FeatureBuilder::new().build(&rows, None);
        assert!(matches!(err, Err(MonitorError::Schema(_))));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        // No UnitPrice column
        std::fs::write(
            &path,
            "InvoiceNo,StockCode,Quantity,InvoiceDate,CustomerID,Country\n\
             i1,s1,2,01-12-2010 08:00,c1,UK\n",
        )
        .unwrap();

        let err = FeatureBuilder::new().load_csv(&path);
        assert!(matches!(err, Err(MonitorError::Schema(_))));
    }

    #[test]
    fn test_categories_from_schema() {
        let schema = vec![
            "recency".to_string(),
            "country_France".to_string(),
            "country_UK".to_string(),
        ];
        assert_eq!(
            FeatureBuilder::categories_from_schema(&schema),
            vec!["France".to_string(), "UK".to_string()]
        );
    }
}
