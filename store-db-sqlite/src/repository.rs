use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use store_core::{
    Master, MasterKind, NewTaxRule, Order, Product, ProductClass, ReferenceRepository,
    RepositoryError, ScopeFilter, ShipmentItem, ShipmentItemRepository, Shipping, TaxRule,
    TaxRuleQuery, TaxRuleRepository,
};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal};

/// Storage format of every date column, always UTC.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TAX_RULE_SELECT: &str = "SELECT t.id, t.product_id, t.product_class_id, t.pref_id,
        t.country_id, t.tax_rate, t.tax_adjust, t.apply_date, t.create_date, t.update_date,
        r.id AS rounding_type_id, r.name AS rounding_type_name,
        r.sort_no AS rounding_type_sort_no
    FROM dtb_tax_rule t
    LEFT JOIN mtb_rounding_type r ON r.id = t.rounding_type_id";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens `database_url`, creating the file if needed.
    ///
    /// Accepts `sqlite:` URLs, bare paths and `:memory:`. An in-memory
    /// database is held on a single connection so it outlives each query.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true);

        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(&self, seeds_dir: &Path) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn get_date(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let text: String = row
        .try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))?;
    NaiveDateTime::parse_from_str(&text, DATE_FORMAT)
        .map(|date| date.and_utc())
        .map_err(|e| {
            RepositoryError::Database(format!("Invalid date '{}' in {}: {}", text, column, e))
        })
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(db_error)
}

fn row_to_tax_rule(row: &SqliteRow) -> Result<TaxRule, RepositoryError> {
    let rounding_type = match get::<Option<i32>>(row, "rounding_type_id")? {
        Some(id) => Some(Master {
            id,
            name: get(row, "rounding_type_name")?,
            sort_no: get(row, "rounding_type_sort_no")?,
        }),
        None => None,
    };

    Ok(TaxRule {
        id: get(row, "id")?,
        product_id: get(row, "product_id")?,
        product_class_id: get(row, "product_class_id")?,
        pref_id: get(row, "pref_id")?,
        country_id: get(row, "country_id")?,
        rounding_type,
        tax_rate: get_decimal(row, "tax_rate")?,
        tax_adjust: get_decimal(row, "tax_adjust")?,
        apply_date: get_date(row, "apply_date")?,
        create_date: get_date(row, "create_date")?,
        update_date: get_date(row, "update_date")?,
    })
}

fn row_to_master(row: &SqliteRow) -> Result<Master, RepositoryError> {
    Ok(Master {
        id: get(row, "id")?,
        name: get(row, "name")?,
        sort_no: get(row, "sort_no")?,
    })
}

fn row_to_product(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: get(row, "id")?,
        name: get(row, "name")?,
    })
}

fn row_to_product_class(row: &SqliteRow) -> Result<ProductClass, RepositoryError> {
    Ok(ProductClass {
        id: get(row, "id")?,
        product_id: get(row, "product_id")?,
        code: get(row, "code")?,
    })
}

fn row_to_order(row: &SqliteRow) -> Result<Order, RepositoryError> {
    Ok(Order {
        id: get(row, "id")?,
        order_no: get(row, "order_no")?,
    })
}

fn row_to_shipping(row: &SqliteRow) -> Result<Shipping, RepositoryError> {
    Ok(Shipping {
        id: get(row, "id")?,
        order_id: get(row, "order_id")?,
    })
}

fn push_scope_filter(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, filter: ScopeFilter) {
    match filter {
        ScopeFilter::IsNull => {
            builder.push(format!(" AND {column} IS NULL"));
        }
        ScopeFilter::NullOr(id) => {
            builder
                .push(format!(" AND ({column} IS NULL OR {column} = "))
                .push_bind(id)
                .push(")");
        }
    }
}

#[async_trait]
impl TaxRuleRepository for SqliteRepository {
    async fn find_tax_rule_candidates(
        &self,
        query: &TaxRuleQuery,
    ) -> Result<Vec<TaxRule>, RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(TAX_RULE_SELECT);
        builder
            .push(" WHERE t.apply_date < ")
            .push_bind(format_date(query.applied_before));
        push_scope_filter(&mut builder, "t.product_id", query.product);
        push_scope_filter(&mut builder, "t.product_class_id", query.product_class);
        push_scope_filter(&mut builder, "t.pref_id", query.pref);
        push_scope_filter(&mut builder, "t.country_id", query.country);
        builder.push(" ORDER BY t.apply_date DESC, t.id DESC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        debug!(candidates = rows.len(), "queried tax rule candidates");
        rows.iter().map(row_to_tax_rule).collect()
    }

    async fn list_default_tax_rules(&self) -> Result<Vec<TaxRule>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{TAX_RULE_SELECT}
             WHERE t.product_id IS NULL AND t.product_class_id IS NULL
             ORDER BY t.apply_date DESC, t.id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_tax_rule).collect()
    }

    async fn find_tax_rule(&self, id: i64) -> Result<Option<TaxRule>, RepositoryError> {
        let row = sqlx::query(&format!("{TAX_RULE_SELECT} WHERE t.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(row_to_tax_rule).transpose()
    }

    async fn find_tax_rule_by_apply_date(
        &self,
        apply_date: DateTime<Utc>,
    ) -> Result<Option<TaxRule>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{TAX_RULE_SELECT} WHERE t.apply_date = ? ORDER BY t.id DESC LIMIT 1"
        ))
        .bind(format_date(apply_date))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_tax_rule).transpose()
    }

    async fn insert_tax_rule(&self, rule: NewTaxRule) -> Result<TaxRule, RepositoryError> {
        let now = format_date(Utc::now());

        let result = sqlx::query(
            "INSERT INTO dtb_tax_rule
                (product_id, product_class_id, pref_id, country_id, rounding_type_id,
                 tax_rate, tax_adjust, apply_date, create_date, update_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rule.product_id)
        .bind(rule.product_class_id)
        .bind(rule.pref_id)
        .bind(rule.country_id)
        .bind(rule.rounding_type.as_ref().map(|m| m.id))
        .bind(decimal_to_text(rule.tax_rate))
        .bind(decimal_to_text(rule.tax_adjust))
        .bind(format_date(rule.apply_date))
        .bind(now.clone())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        let id = result.last_insert_rowid();
        info!(tax_rule_id = id, "inserted tax rule");
        self.find_tax_rule(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn update_tax_rule(&self, rule: &TaxRule) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE dtb_tax_rule
             SET product_id = ?, product_class_id = ?, pref_id = ?, country_id = ?,
                 rounding_type_id = ?, tax_rate = ?, tax_adjust = ?, apply_date = ?,
                 update_date = ?
             WHERE id = ?",
        )
        .bind(rule.product_id)
        .bind(rule.product_class_id)
        .bind(rule.pref_id)
        .bind(rule.country_id)
        .bind(rule.rounding_type.as_ref().map(|m| m.id))
        .bind(decimal_to_text(rule.tax_rate))
        .bind(decimal_to_text(rule.tax_adjust))
        .bind(format_date(rule.apply_date))
        .bind(format_date(Utc::now()))
        .bind(rule.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn remove_tax_rule(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM dtb_tax_rule WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        info!(tax_rule_id = id, "removed tax rule");
        Ok(())
    }

    async fn find_rounding_type(&self, id: i32) -> Result<Option<Master>, RepositoryError> {
        self.find_master(MasterKind::RoundingType, id).await
    }
}

#[async_trait]
impl ShipmentItemRepository for SqliteRepository {
    async fn find_shipment_item(&self, id: i64) -> Result<Option<ShipmentItem>, RepositoryError> {
        let Some(row) = sqlx::query("SELECT * FROM dtb_shipment_item WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let order = match get::<Option<i64>>(&row, "order_id")? {
            Some(id) => self.find_order(id).await?,
            None => None,
        };
        let shipping = match get::<Option<i64>>(&row, "shipping_id")? {
            Some(id) => self.find_shipping(id).await?,
            None => None,
        };
        let product = match get::<Option<i64>>(&row, "product_id")? {
            Some(id) => self.find_product(id).await?,
            None => None,
        };
        let product_class = match get::<Option<i64>>(&row, "product_class_id")? {
            Some(id) => self.find_product_class(id).await?,
            None => None,
        };
        let order_item_type = self
            .find_optional_master(MasterKind::OrderItemType, get(&row, "order_item_type_id")?)
            .await?;
        let tax_type = self
            .find_optional_master(MasterKind::TaxType, get(&row, "tax_type_id")?)
            .await?;
        let tax_display_type = self
            .find_optional_master(MasterKind::TaxDisplayType, get(&row, "tax_display_type_id")?)
            .await?;

        Ok(Some(ShipmentItem {
            id: get(&row, "id")?,
            price: get_decimal(&row, "price")?,
            quantity: get_decimal(&row, "quantity")?,
            tax_rate: get_decimal(&row, "tax_rate")?,
            product_name: get(&row, "product_name")?,
            product_code: get(&row, "product_code")?,
            class_name1: get(&row, "class_name1")?,
            class_name2: get(&row, "class_name2")?,
            class_category_name1: get(&row, "class_category_name1")?,
            class_category_name2: get(&row, "class_category_name2")?,
            tax_rule: get(&row, "tax_rule")?,
            order,
            shipping,
            product,
            product_class,
            order_item_type,
            tax_type,
            tax_display_type,
        }))
    }

    async fn update_shipment_item(&self, item: &ShipmentItem) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE dtb_shipment_item
             SET order_id = ?, shipping_id = ?, product_id = ?, product_class_id = ?,
                 order_item_type_id = ?, tax_type_id = ?, tax_display_type_id = ?,
                 product_name = ?, product_code = ?, class_name1 = ?, class_name2 = ?,
                 class_category_name1 = ?, class_category_name2 = ?,
                 price = ?, quantity = ?, tax_rate = ?, tax_rule = ?
             WHERE id = ?",
        )
        .bind(item.order.as_ref().map(|o| o.id))
        .bind(item.shipping.as_ref().map(|s| s.id))
        .bind(item.product.as_ref().map(|p| p.id))
        .bind(item.product_class.as_ref().map(|pc| pc.id))
        .bind(item.order_item_type.as_ref().map(|m| m.id))
        .bind(item.tax_type.as_ref().map(|m| m.id))
        .bind(item.tax_display_type.as_ref().map(|m| m.id))
        .bind(item.product_name.clone())
        .bind(item.product_code.clone())
        .bind(item.class_name1.clone())
        .bind(item.class_name2.clone())
        .bind(item.class_category_name1.clone())
        .bind(item.class_category_name2.clone())
        .bind(decimal_to_text(item.price))
        .bind(decimal_to_text(item.quantity))
        .bind(decimal_to_text(item.tax_rate))
        .bind(item.tax_rule.clone())
        .bind(item.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        info!(shipment_item_id = item.id, "updated shipment item");
        Ok(())
    }
}

impl SqliteRepository {
    async fn find_optional_master(
        &self,
        kind: MasterKind,
        id: Option<i32>,
    ) -> Result<Option<Master>, RepositoryError> {
        match id {
            Some(id) => self.find_master(kind, id).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ReferenceRepository for SqliteRepository {
    async fn find_master(
        &self,
        kind: MasterKind,
        id: i32,
    ) -> Result<Option<Master>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT id, name, sort_no FROM {} WHERE id = ?",
            kind.table_name()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_master).transpose()
    }

    async fn find_product(&self, id: i64) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query("SELECT id, name FROM dtb_product WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_product_class(&self, id: i64) -> Result<Option<ProductClass>, RepositoryError> {
        let row = sqlx::query("SELECT id, product_id, code FROM dtb_product_class WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(row_to_product_class).transpose()
    }

    async fn find_order(&self, id: i64) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query("SELECT id, order_no FROM dtb_order WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn find_shipping(&self, id: i64) -> Result<Option<Shipping>, RepositoryError> {
        let row = sqlx::query("SELECT id, order_id FROM dtb_shipping WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(row_to_shipping).transpose()
    }
}
