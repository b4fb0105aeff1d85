use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};
use store_core::RepositoryError;

/// Reads a decimal column. Amounts are written as TEXT, but INTEGER and
/// REAL values from hand-written SQL are accepted too.
pub fn get_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    let type_info = value_ref.type_info();
    let type_name = type_info.name();

    match type_name {
        "TEXT" => {
            let val: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{}': {}", column, e))
            })?;
            val.trim().parse::<Decimal>().map_err(|e| {
                RepositoryError::Database(format!(
                    "Failed to parse '{}' in '{}' as Decimal: {}",
                    val, column, e
                ))
            })
        }
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!(
                    "Failed to get INTEGER from '{}': {}",
                    column, e
                ))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{}': {}", column, e))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {} to Decimal: {}", val, e))
            })
        }
        "NULL" => Ok(Decimal::ZERO),
        _ => Err(RepositoryError::Database(format!(
            "Unexpected type '{}' for column '{}'",
            type_name, column
        ))),
    }
}

/// Text form used when writing a decimal column.
pub fn decimal_to_text(d: Decimal) -> String {
    d.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query(
            "CREATE TABLE amounts (
                id INTEGER PRIMARY KEY,
                text_value TEXT,
                int_value INTEGER,
                real_value REAL,
                blob_value BLOB
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create test table");
        pool
    }

    async fn fetch(pool: &SqlitePool, insert: &str, column: &str) -> Result<Decimal, RepositoryError> {
        sqlx::query(insert)
            .execute(pool)
            .await
            .expect("Failed to insert test data");
        let row = sqlx::query("SELECT * FROM amounts WHERE id = 1")
            .fetch_one(pool)
            .await
            .expect("Failed to fetch row");
        get_decimal(&row, column)
    }

    #[tokio::test]
    async fn reads_text_amounts_exactly() {
        let pool = setup_test_db().await;

        let result = fetch(
            &pool,
            "INSERT INTO amounts (id, text_value) VALUES (1, '8.125')",
            "text_value",
        )
        .await;

        assert_eq!(result, Ok(dec!(8.125)));
    }

    #[tokio::test]
    async fn reads_integer_amounts() {
        let pool = setup_test_db().await;

        let result = fetch(
            &pool,
            "INSERT INTO amounts (id, int_value) VALUES (1, -1200)",
            "int_value",
        )
        .await;

        assert_eq!(result, Ok(dec!(-1200)));
    }

    #[tokio::test]
    async fn reads_real_amounts() {
        let pool = setup_test_db().await;

        let result = fetch(
            &pool,
            "INSERT INTO amounts (id, real_value) VALUES (1, 123.45)",
            "real_value",
        )
        .await;

        assert_eq!(result, Ok(dec!(123.45)));
    }

    #[tokio::test]
    async fn null_reads_as_zero() {
        let pool = setup_test_db().await;

        let result = fetch(&pool, "INSERT INTO amounts (id) VALUES (1)", "real_value").await;

        assert_eq!(result, Ok(Decimal::ZERO));
    }

    #[tokio::test]
    async fn malformed_text_is_a_database_error() {
        let pool = setup_test_db().await;

        let result = fetch(
            &pool,
            "INSERT INTO amounts (id, text_value) VALUES (1, 'ten')",
            "text_value",
        )
        .await;

        assert!(matches!(result, Err(RepositoryError::Database(msg)) if msg.starts_with("Failed to parse 'ten'")));
    }

    #[tokio::test]
    async fn blob_is_rejected() {
        let pool = setup_test_db().await;

        let result = fetch(
            &pool,
            "INSERT INTO amounts (id, blob_value) VALUES (1, x'00')",
            "blob_value",
        )
        .await;

        assert_eq!(
            result,
            Err(RepositoryError::Database(
                "Unexpected type 'BLOB' for column 'blob_value'".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn missing_column_is_reported() {
        let pool = setup_test_db().await;

        let result = fetch(&pool, "INSERT INTO amounts (id) VALUES (1)", "nope").await;

        assert!(matches!(result, Err(RepositoryError::Database(msg)) if msg.starts_with("Column 'nope' not found:")));
    }

    #[test]
    fn text_form_drops_trailing_zeros() {
        assert_eq!(decimal_to_text(dec!(10.00)), "10");
        assert_eq!(decimal_to_text(dec!(8.50)), "8.5");
    }
}
