use std::collections::HashMap;
use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use store_core::{
    Master, NewTaxRule, RepositoryError, ScopeFilter, TaxRule, TaxRuleQuery, TaxRuleRepository,
};
use thiserror::Error;
use tracing::{debug, info};

/// Rounding type used for rows that leave the column empty.
pub const DEFAULT_ROUNDING_TYPE: i32 = 1;

/// Errors that can occur when loading tax rule data.
#[derive(Debug, Error)]
pub enum TaxRuleLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid row {line}: {message}")]
    InvalidRow { line: usize, message: String },

    #[error("Rounding type {0} not found in database (have you run the seeds?)")]
    RoundingTypeNotFound(i32),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxRuleLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxRuleLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of the tax rules CSV file.
///
/// Columns:
/// - `apply_date`: `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`, in UTC
/// - `tax_rate`: percentage, e.g. `10`
/// - `tax_adjust`: amount added after rounding (empty for 0)
/// - `rounding_type`: rounding type id (empty for round half up)
/// - `product_id`, `product_class_id`, `pref_id`, `country_id`: scope,
///   empty for unscoped
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxRuleRecord {
    #[serde(deserialize_with = "deserialize_apply_date")]
    pub apply_date: DateTime<Utc>,
    pub tax_rate: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub tax_adjust: Option<Decimal>,
    pub rounding_type: Option<i32>,
    pub product_id: Option<i64>,
    pub product_class_id: Option<i64>,
    pub pref_id: Option<i32>,
    pub country_id: Option<i32>,
}

impl TaxRuleRecord {
    /// A `0` scope cell means "unscoped", the same as an empty one.
    fn clear_zero_scopes(&mut self) {
        self.product_id = self.product_id.filter(|id| *id != 0);
        self.product_class_id = self.product_class_id.filter(|id| *id != 0);
        self.pref_id = self.pref_id.filter(|id| *id != 0);
        self.country_id = self.country_id.filter(|id| *id != 0);
    }

    /// Candidates that may share this record's apply date and scope.
    fn same_scope_query(&self) -> TaxRuleQuery {
        TaxRuleQuery {
            applied_before: self.apply_date + TimeDelta::seconds(1),
            product: ScopeFilter::for_id(self.product_id),
            product_class: ScopeFilter::for_id(self.product_class_id),
            pref: ScopeFilter::for_id(self.pref_id.map(i64::from)),
            country: ScopeFilter::for_id(self.country_id.map(i64::from)),
        }
    }

    fn has_scope_of(&self, rule: &TaxRule) -> bool {
        self.product_id == rule.product_id
            && self.product_class_id == rule.product_class_id
            && self.pref_id == rule.pref_id
            && self.country_id == rule.country_id
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_apply_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|date| date.and_time(Default::default()))
        })
        .map(|date| date.and_utc())
        .map_err(|_| serde::de::Error::custom(format!("invalid apply_date '{}'", s)))
}

/// Loader for tax rules from CSV files.
///
/// Rules are written through [`TaxRuleRepository`], so any backend works.
pub struct TaxRuleLoader;

impl TaxRuleLoader {
    /// Parse tax rule records from a CSV reader.
    ///
    /// Scope cells holding `0` are read as empty. Rows with a negative
    /// `tax_rate` are rejected as [`TaxRuleLoaderError::InvalidRow`]; line
    /// numbers count the header.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxRuleRecord>, TaxRuleLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();

        for (index, result) in csv_reader.deserialize().enumerate() {
            let mut record: TaxRuleRecord = result?;
            record.clear_zero_scopes();
            if record.tax_rate.is_sign_negative() {
                return Err(TaxRuleLoaderError::InvalidRow {
                    line: index + 2,
                    message: format!("tax_rate {} is negative", record.tax_rate),
                });
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Write tax rule records into the database and return how many rows
    /// were written.
    ///
    /// A record whose apply date and scope match an existing rule updates
    /// that rule, so loading the same file twice does not duplicate rules.
    /// Every other record is inserted.
    pub async fn load<R>(repo: &R, records: &[TaxRuleRecord]) -> Result<usize, TaxRuleLoaderError>
    where
        R: TaxRuleRepository + ?Sized,
    {
        let mut rounding_types: HashMap<i32, Master> = HashMap::new();
        let mut inserted = 0;
        let mut updated = 0;

        for record in records {
            let rounding_id = record.rounding_type.unwrap_or(DEFAULT_ROUNDING_TYPE);
            let rounding_type = match rounding_types.get(&rounding_id) {
                Some(master) => master.clone(),
                None => {
                    let master = repo
                        .find_rounding_type(rounding_id)
                        .await?
                        .ok_or(TaxRuleLoaderError::RoundingTypeNotFound(rounding_id))?;
                    rounding_types.insert(rounding_id, master.clone());
                    master
                }
            };
            let tax_adjust = record.tax_adjust.unwrap_or(Decimal::ZERO);

            let existing = repo
                .find_tax_rule_candidates(&record.same_scope_query())
                .await?
                .into_iter()
                .find(|rule| rule.apply_date == record.apply_date && record.has_scope_of(rule));

            match existing {
                Some(mut rule) => {
                    rule.tax_rate = record.tax_rate;
                    rule.tax_adjust = tax_adjust;
                    rule.rounding_type = Some(rounding_type);
                    repo.update_tax_rule(&rule).await?;
                    debug!(tax_rule_id = rule.id, "updated tax rule from csv");
                    updated += 1;
                }
                None => {
                    let rule = repo
                        .insert_tax_rule(NewTaxRule {
                            product_id: record.product_id,
                            product_class_id: record.product_class_id,
                            pref_id: record.pref_id,
                            country_id: record.country_id,
                            rounding_type: Some(rounding_type),
                            tax_rate: record.tax_rate,
                            tax_adjust,
                            apply_date: record.apply_date,
                        })
                        .await?;
                    debug!(tax_rule_id = rule.id, "inserted tax rule from csv");
                    inserted += 1;
                }
            }
        }

        info!(inserted, updated, "loaded tax rules");
        Ok(inserted + updated)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const HEADER: &str =
        "apply_date,tax_rate,tax_adjust,rounding_type,product_id,product_class_id,pref_id,country_id";

    fn csv(rows: &[&str]) -> String {
        std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_parse_global_default() {
        let records = TaxRuleLoader::parse(csv(&["2019-10-01,10,,,,,,"]).as_bytes())
            .expect("Failed to parse CSV");

        assert_eq!(
            records,
            vec![TaxRuleRecord {
                apply_date: Utc.with_ymd_and_hms(2019, 10, 1, 0, 0, 0).unwrap(),
                tax_rate: dec!(10),
                tax_adjust: None,
                rounding_type: None,
                product_id: None,
                product_class_id: None,
                pref_id: None,
                country_id: None,
            }]
        );
    }

    #[test]
    fn test_parse_scoped_rule_with_time() {
        let records =
            TaxRuleLoader::parse(csv(&["2024-04-01 09:30:00, 8.5 ,-1,2,7,70,13,392"]).as_bytes())
                .expect("Failed to parse CSV");

        let record = &records[0];
        assert_eq!(
            record.apply_date,
            Utc.with_ymd_and_hms(2024, 4, 1, 9, 30, 0).unwrap()
        );
        assert_eq!(record.tax_rate, dec!(8.5));
        assert_eq!(record.tax_adjust, Some(dec!(-1)));
        assert_eq!(record.rounding_type, Some(2));
        assert_eq!(record.product_id, Some(7));
        assert_eq!(record.product_class_id, Some(70));
        assert_eq!(record.pref_id, Some(13));
        assert_eq!(record.country_id, Some(392));
    }

    #[test]
    fn test_parse_zero_scope_is_unscoped() {
        let records = TaxRuleLoader::parse(csv(&["2019-10-01,10,,,0,0,13,0"]).as_bytes())
            .expect("Failed to parse CSV");

        let record = &records[0];
        assert_eq!(record.product_id, None);
        assert_eq!(record.product_class_id, None);
        assert_eq!(record.pref_id, Some(13));
        assert_eq!(record.country_id, None);
    }

    #[test]
    fn test_parse_invalid_apply_date() {
        let result = TaxRuleLoader::parse(csv(&["01/10/2019,10,,,,,,"]).as_bytes());

        let err = result.expect_err("Should fail for invalid date");
        let TaxRuleLoaderError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(msg.contains("invalid apply_date"), "got: {}", msg);
    }

    #[test]
    fn test_parse_missing_column() {
        let result = TaxRuleLoader::parse("apply_date\n2019-10-01".as_bytes());

        let err = result.expect_err("Should fail for missing column");
        let TaxRuleLoaderError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(msg.contains("missing field"), "got: {}", msg);
    }

    #[test]
    fn test_parse_negative_rate_reports_line() {
        let result = TaxRuleLoader::parse(
            csv(&["2014-04-01,8,,,,,,", "2019-10-01,-10,,,,,,"]).as_bytes(),
        );

        let err = result.expect_err("Should fail for negative rate");
        assert!(
            matches!(err, TaxRuleLoaderError::InvalidRow { line: 3, .. }),
            "got: {:?}",
            err
        );
    }
}
