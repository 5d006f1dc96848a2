use std::collections::BTreeMap;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::money;

/// Known commission column names from the upstream exports, tried in
/// priority order before any fuzzy scan. The fuzzy fallback walks the raw
/// bag in sorted key order, so resolution is deterministic for a given row.
pub const COMMISSION_COLUMNS: [&str; 5] = [
    "comissao",
    "comissão",
    "comissao_liquida",
    "commission",
    "net_commission",
];

/// Same policy for the gross revenue column.
pub const REVENUE_COLUMNS: [&str; 5] = [
    "faturamento",
    "valor_bruto",
    "gross_revenue",
    "valor",
    "revenue",
];

/// One transaction line imported from an affiliate platform export.
///
/// Rows are read-only once imported: the dashboard never mutates them, it
/// only replaces the whole set on a fresh import or a delete-all.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SalesRow {
    pub id: String,

    #[schemars(description = "Calendar date of the order in YYYY-MM-DD, no timezone")]
    pub date: NaiveDate,

    #[serde(default)]
    #[schemars(description = "Optional time-of-day as exported, kept as free text")]
    pub time: Option<String>,

    #[serde(default)]
    pub product: String,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    #[schemars(description = "Attribution sub-identifier (channel tag); absent means organic")]
    pub sub_id: Option<String>,

    #[serde(default)]
    pub gross_revenue: f64,

    #[serde(default)]
    pub platform_fee: f64,

    #[serde(default)]
    #[schemars(description = "Net affiliate commission for this order")]
    pub commission: f64,

    #[serde(default)]
    pub profit: f64,

    /// Raw source columns preserved verbatim. The upstream export schema
    /// varies between platforms, so monetary fields may only exist here.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub raw: BTreeMap<String, Value>,
}

impl SalesRow {
    /// Resolves the net commission: the typed field when positive, then the
    /// known column candidates in priority order, then a fuzzy scan for any
    /// raw key containing `comiss`.
    pub fn commission_value(&self) -> f64 {
        if self.commission > 0.0 {
            return self.commission;
        }
        resolve_raw_amount(&self.raw, &COMMISSION_COLUMNS, "comiss")
    }

    /// Resolves the gross revenue with the same candidate-then-fuzzy policy.
    pub fn revenue_value(&self) -> f64 {
        if self.gross_revenue > 0.0 {
            return self.gross_revenue;
        }
        resolve_raw_amount(&self.raw, &REVENUE_COLUMNS, "fatur")
    }

    /// Trimmed attribution tag, `None` when empty or absent.
    pub fn channel_tag(&self) -> Option<&str> {
        self.sub_id
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }
}

fn resolve_raw_amount(raw: &BTreeMap<String, Value>, candidates: &[&str], fuzzy: &str) -> f64 {
    for key in candidates {
        if let Some(value) = raw.get(*key) {
            let parsed = money::parse_non_negative(value);
            if parsed > 0.0 {
                return parsed;
            }
        }
    }
    for (key, value) in raw {
        if key.to_lowercase().contains(fuzzy) {
            let parsed = money::parse_non_negative(value);
            if parsed > 0.0 {
                return parsed;
            }
        }
    }
    0.0
}

/// A manually entered or bulk-imported advertising expenditure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AdSpend {
    pub id: String,

    pub date: NaiveDate,

    pub amount: f64,

    #[serde(default)]
    #[schemars(description = "Channel tag; absent or empty means general/unallocated spend")]
    pub sub_id: Option<String>,
}

impl AdSpend {
    pub fn channel_tag(&self) -> Option<&str> {
        self.sub_id
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }
}

/// Create/update payload for an ad spend, as accepted by the API and by the
/// `/bulk` import endpoint. `schema_as_json` publishes the import contract.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AdSpendPayload {
    #[schemars(description = "Calendar date in YYYY-MM-DD (forms also accept dd/mm/yyyy)")]
    pub date: NaiveDate,

    #[schemars(description = "Amount spent; must be strictly positive")]
    pub amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional channel tag; omit for general spend")]
    pub sub_id: Option<String>,
}

impl AdSpendPayload {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AdSpendPayload)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Active reporting window plus an optional exact (case-insensitive)
/// channel filter, applied before the engine sees the collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub channel: Option<String>,
}

impl ReportQuery {
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        crate::dates::in_range(date, self.from, self.to)
    }

    pub fn channel_filter(&self) -> Option<&str> {
        self.channel
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row_with_raw(raw: BTreeMap<String, Value>) -> SalesRow {
        SalesRow {
            id: "r1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            time: None,
            product: "Curso X".to_string(),
            platform: None,
            sub_id: None,
            gross_revenue: 0.0,
            platform_fee: 0.0,
            commission: 0.0,
            profit: 0.0,
            raw,
        }
    }

    #[test]
    fn test_commission_typed_field_wins() {
        let mut row = row_with_raw(BTreeMap::new());
        row.commission = 42.5;
        assert_eq!(row.commission_value(), 42.5);
    }

    #[test]
    fn test_commission_candidate_priority() {
        let mut raw = BTreeMap::new();
        raw.insert("comissao".to_string(), json!("R$ 10,00"));
        raw.insert("minha_comissao_extra".to_string(), json!("R$ 99,00"));
        let row = row_with_raw(raw);
        assert_eq!(row.commission_value(), 10.0);
    }

    #[test]
    fn test_commission_fuzzy_fallback() {
        let mut raw = BTreeMap::new();
        raw.insert("valor_comissao_net".to_string(), json!("15,50"));
        let row = row_with_raw(raw);
        assert_eq!(row.commission_value(), 15.5);
    }

    #[test]
    fn test_commission_missing_is_zero() {
        let row = row_with_raw(BTreeMap::new());
        assert_eq!(row.commission_value(), 0.0);
    }

    #[test]
    fn test_channel_tag_trimming() {
        let mut row = row_with_raw(BTreeMap::new());
        row.sub_id = Some("  fb-ads  ".to_string());
        assert_eq!(row.channel_tag(), Some("fb-ads"));

        row.sub_id = Some("   ".to_string());
        assert_eq!(row.channel_tag(), None);
    }

    #[test]
    fn test_payload_schema_generation() {
        let schema_json = AdSpendPayload::schema_as_json().unwrap();
        assert!(schema_json.contains("date"));
        assert!(schema_json.contains("amount"));
        assert!(schema_json.contains("sub_id"));
    }

    #[test]
    fn test_sales_row_deserializes_with_defaults() {
        let row: SalesRow = serde_json::from_str(
            r#"{"id": "abc", "date": "2024-02-01", "commission": 12.3}"#,
        )
        .unwrap();
        assert_eq!(row.commission, 12.3);
        assert!(row.raw.is_empty());
        assert_eq!(row.channel_tag(), None);
    }
}
