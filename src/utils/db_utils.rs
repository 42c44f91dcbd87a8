use actix_web::error::ErrorBadRequest;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build a tenant-scoped partial UPDATE
/// ===============================
/// Only keys listed in `allowed` may appear in `payload`; they are the only
/// strings spliced into the statement.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_value: u64,
    company_id: u64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ErrorBadRequest(format!("Field `{}` cannot be updated", unknown)));
    }

    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ? AND company_id = ?",
        table, set_clause
    );

    let mut values = Vec::with_capacity(obj.len() + 2);

    // Convert JSON values → SqlValue
    for value in obj.values() {
        match value {
            Value::String(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(d) => values.push(SqlValue::Date(d)),
                Err(_) => values.push(SqlValue::String(s.clone())),
            },
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    values.push(SqlValue::U64(u));
                } else if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }

    values.push(SqlValue::U64(id_value));
    values.push(SqlValue::U64(company_id));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Duplicate-key violation (MySQL SQLSTATE 23000).
pub fn is_duplicate(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[&str] = &["first_name", "hire_date", "active"];

    #[test]
    fn builds_scoped_update_in_key_order() {
        let payload = json!({"first_name": "Ana", "hire_date": "2026-02-01", "active": false});
        let update = build_update_sql("employees", &payload, FIELDS, 7, 3).unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET active = ?, first_name = ?, hire_date = ? WHERE id = ? AND company_id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::Bool(false),
                SqlValue::String("Ana".into()),
                SqlValue::Date(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()),
                SqlValue::U64(7),
                SqlValue::U64(3),
            ]
        );
    }

    #[test]
    fn rejects_columns_outside_allow_list() {
        let payload = json!({"company_id": 9});
        assert!(build_update_sql("employees", &payload, FIELDS, 7, 3).is_err());
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql("employees", &json!({}), FIELDS, 7, 3).is_err());
        assert!(build_update_sql("employees", &json!([1, 2]), FIELDS, 7, 3).is_err());
        assert!(build_update_sql("employees", &json!({"active": [true]}), FIELDS, 7, 3).is_err());
    }
}
