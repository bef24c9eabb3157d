// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative mapping between contract fields and relational columns.
//!
//! Each entity has one static [`EntityMap`]. Entities travel through
//! `serde_json::Value`, so the maps alone generate every insert, upsert and
//! select statement and drive value conversion in both directions.
//! [`validate_all`] runs at startup and rejects a map that drifted from its
//! entity type.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value as SqlValue, ValueRef};
use rusqlite::Row;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use leadflow_core::{
    Branch, CallLog, Enquiry, HistoryEntry, LeadflowError, Message, PipelineStage, Product,
    Promotion, QueueItem, QueueStatus, Role, User,
};

/// Storage class of a mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    /// Stored as 0/1.
    Bool,
    /// Nested object or array, stored as JSON text.
    Json,
    /// RFC 3339 UTC with fixed nanosecond precision, so text order is time order.
    Timestamp,
}

/// One contract field and the column that stores it.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub field: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
}

const fn col(field: &'static str, column: &'static str, kind: ColumnKind) -> FieldMap {
    FieldMap {
        field,
        column,
        kind,
    }
}

/// Mapping of one entity type onto one table.
#[derive(Debug)]
pub struct EntityMap {
    /// Entity name used in errors.
    pub entity: &'static str,
    pub table: &'static str,
    /// Primary key column.
    pub key: &'static str,
    pub fields: &'static [FieldMap],
    /// Contract fields accepted on write but never stored in this table.
    pub write_only: &'static [&'static str],
    /// Contract fields assembled from other tables.
    pub joined: &'static [&'static str],
}

use ColumnKind::{Bool, Integer, Json, Real, Text, Timestamp};

pub static USERS: EntityMap = EntityMap {
    entity: "user",
    table: "users",
    key: "id",
    fields: &[
        col("id", "id", Text),
        col("username", "username", Text),
        col("role", "role", Text),
        col("name", "name", Text),
        col("branchId", "branch_id", Text),
        col("passwordLastChanged", "password_last_changed", Timestamp),
    ],
    write_only: &["password"],
    joined: &[],
};

pub static BRANCHES: EntityMap = EntityMap {
    entity: "branch",
    table: "branches",
    key: "id",
    fields: &[
        col("id", "id", Text),
        col("name", "name", Text),
        col("location", "location", Text),
        col("contactNumber", "contact_number", Text),
        col("active", "active", Bool),
    ],
    write_only: &[],
    joined: &[],
};

pub static PRODUCTS: EntityMap = EntityMap {
    entity: "product",
    table: "products",
    key: "id",
    fields: &[
        col("id", "id", Text),
        col("sku", "sku", Text),
        col("name", "name", Text),
        col("category", "category", Text),
        col("description", "description", Text),
        col("nameLocalized", "name_localized", Json),
        col("categoryLocalized", "category_localized", Json),
        col("descriptionLocalized", "description_localized", Json),
        col("priceMin", "price_min", Real),
        col("priceMax", "price_max", Real),
        col("active", "active", Bool),
        col("branchId", "branch_id", Text),
        col("specifications", "specifications", Json),
    ],
    write_only: &[],
    joined: &[],
};

pub static ENQUIRIES: EntityMap = EntityMap {
    entity: "enquiry",
    table: "enquiries",
    key: "id",
    fields: &[
        col("id", "id", Text),
        col("customerName", "customer_name", Text),
        col("customerPhone", "customer_phone", Text),
        col("customerLocation", "customer_location", Text),
        col("productId", "product_id", Text),
        col("branchId", "branch_id", Text),
        col("purchaseIntent", "purchase_intent", Text),
        col("pipelineStage", "pipeline_stage", Text),
        col("createdBy", "created_by", Text),
        col("createdAt", "created_at", Timestamp),
        col("closedAmount", "closed_amount", Real),
        col("warrantyMonths", "warranty_months", Integer),
    ],
    write_only: &[],
    joined: &["history"],
};

/// History rows; `enquiry_id` and `seq` are bound by the enquiry queries.
pub static HISTORY: EntityMap = EntityMap {
    entity: "history entry",
    table: "enquiry_history",
    key: "seq",
    fields: &[
        col("stage", "stage", Text),
        col("timestamp", "timestamp", Timestamp),
        col("userId", "user_id", Text),
        col("notes", "notes", Text),
    ],
    write_only: &[],
    joined: &[],
};

pub static PROMOTIONS: EntityMap = EntityMap {
    entity: "promotion",
    table: "promotions",
    key: "id",
    fields: &[
        col("id", "id", Text),
        col("title", "title", Text),
        col("description", "description", Text),
        col("discountPercent", "discount_percent", Real),
        col("productIds", "product_ids", Json),
        col("branchId", "branch_id", Text),
        col("startsAt", "starts_at", Timestamp),
        col("endsAt", "ends_at", Timestamp),
        col("active", "active", Bool),
    ],
    write_only: &[],
    joined: &[],
};

pub static MESSAGES: EntityMap = EntityMap {
    entity: "message",
    table: "messages",
    key: "id",
    fields: &[
        col("id", "id", Text),
        col("senderId", "sender_id", Text),
        col("recipientId", "recipient_id", Text),
        col("branchId", "branch_id", Text),
        col("content", "content", Text),
        col("createdAt", "created_at", Timestamp),
        col("read", "read", Bool),
    ],
    write_only: &[],
    joined: &[],
};

pub static QUEUE: EntityMap = EntityMap {
    entity: "queue item",
    table: "message_queue",
    key: "id",
    fields: &[
        col("id", "id", Text),
        col("recipient", "recipient", Text),
        col("message", "message", Text),
        col("status", "status", Text),
        col("enquiryId", "enquiry_id", Text),
        col("createdAt", "created_at", Timestamp),
        col("updatedAt", "updated_at", Timestamp),
    ],
    write_only: &[],
    joined: &[],
};

pub static CALL_LOGS: EntityMap = EntityMap {
    entity: "call log",
    table: "call_logs",
    key: "call_sid",
    fields: &[
        col("callSid", "call_sid", Text),
        col("enquiryId", "enquiry_id", Text),
        col("fromNumber", "from_number", Text),
        col("toNumber", "to_number", Text),
        col("branchId", "branch_id", Text),
        col("callerId", "caller_id", Text),
        col("status", "status", Text),
        col("durationSecs", "duration_secs", Integer),
        col("recordingUrl", "recording_url", Text),
        col("createdAt", "created_at", Timestamp),
        col("updatedAt", "updated_at", Timestamp),
    ],
    write_only: &[],
    joined: &[],
};

impl EntityMap {
    /// Comma-separated column list, optionally qualified with a table alias.
    pub fn column_list(&self, alias: Option<&str>) -> String {
        self.fields
            .iter()
            .map(|f| match alias {
                Some(a) => format!("{a}.{}", f.column),
                None => f.column.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", self.column_list(None), self.table)
    }

    pub fn insert_sql(&self) -> String {
        let placeholders = (1..=self.fields.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            self.table,
            self.column_list(None)
        )
    }

    /// Insert-or-replace by primary key; the row keeps its rowid on update.
    pub fn upsert_sql(&self) -> String {
        let assignments = self
            .fields
            .iter()
            .filter(|f| f.column != self.key)
            .map(|f| format!("{0} = excluded.{0}", f.column))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} ON CONFLICT({}) DO UPDATE SET {assignments}",
            self.insert_sql(),
            self.key
        )
    }

    /// Encode `entity` into column values, in field order.
    pub fn encode<T: Serialize>(&self, entity: &T) -> Result<Vec<SqlValue>, LeadflowError> {
        let value = serde_json::to_value(entity)?;
        self.encode_value(&value)
    }

    fn encode_value(&self, value: &Value) -> Result<Vec<SqlValue>, LeadflowError> {
        let object = value.as_object().ok_or_else(|| {
            LeadflowError::Internal(format!("{} did not serialize to an object", self.entity))
        })?;
        self.fields
            .iter()
            .map(|f| {
                to_sql(f.kind, object.get(f.field).unwrap_or(&Value::Null)).map_err(|detail| {
                    LeadflowError::Internal(format!("{}.{}: {detail}", self.entity, f.field))
                })
            })
            .collect()
    }

    /// Read this map's columns from `row`, starting at column `offset`.
    pub fn read_object(&self, row: &Row<'_>, offset: usize) -> rusqlite::Result<Map<String, Value>> {
        let mut object = Map::new();
        for (i, f) in self.fields.iter().enumerate() {
            let idx = offset + i;
            object.insert(f.field.to_string(), from_sql(f.kind, row.get_ref(idx)?, idx)?);
        }
        Ok(object)
    }

    /// Read and deserialize an entity from `row`, starting at column `offset`.
    pub fn decode<T: DeserializeOwned>(&self, row: &Row<'_>, offset: usize) -> rusqlite::Result<T> {
        let object = self.read_object(row, offset)?;
        decode_object(object, offset)
    }

    /// Column holding `field`, if mapped.
    pub fn column_of(&self, field: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.column)
    }

    /// Index of `column` in field order.
    pub fn position_of_column(&self, column: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.column == column)
    }

    /// Check this map against a fully-populated sample of its entity.
    ///
    /// Every sample field must be mapped, write-only or joined; every mapped
    /// field must exist on the sample; every sample value must encode as its
    /// declared kind.
    pub fn validate(&self, sample: &Value) -> Result<(), LeadflowError> {
        let object = sample.as_object().ok_or_else(|| {
            LeadflowError::Config(format!("{} sample is not an object", self.entity))
        })?;

        let mut problems = Vec::new();
        for key in object.keys() {
            let mapped = self.fields.iter().any(|f| f.field == key);
            if !mapped && !self.write_only.contains(&key.as_str()) && !self.joined.contains(&key.as_str())
            {
                problems.push(format!("field `{key}` has no column"));
            }
        }
        for f in self.fields {
            if !object.contains_key(f.field) {
                problems.push(format!("column `{}` maps unknown field `{}`", f.column, f.field));
            }
        }
        if problems.is_empty()
            && let Err(e) = self.encode_value(sample)
        {
            problems.push(e.to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(LeadflowError::Config(format!(
                "{} mapping is inconsistent: {}",
                self.table,
                problems.join("; ")
            )))
        }
    }
}

/// Deserialize a column object into an entity. `idx` is reported on failure.
pub fn decode_object<T: DeserializeOwned>(object: Map<String, Value>, idx: usize) -> rusqlite::Result<T> {
    serde_json::from_value(Value::Object(object))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Normalize an RFC 3339 timestamp to the stored text form.
pub fn timestamp_text(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn to_sql(kind: ColumnKind, value: &Value) -> Result<SqlValue, String> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    let mismatch = || format!("expected {kind:?}, got {value}");
    match kind {
        Text => match value {
            Value::String(s) => Ok(SqlValue::Text(s.clone())),
            _ => Err(mismatch()),
        },
        Integer => value.as_i64().map(SqlValue::Integer).ok_or_else(mismatch),
        Real => value.as_f64().map(SqlValue::Real).ok_or_else(mismatch),
        Bool => value
            .as_bool()
            .map(|b| SqlValue::Integer(i64::from(b)))
            .ok_or_else(mismatch),
        Json => serde_json::to_string(value)
            .map(SqlValue::Text)
            .map_err(|e| e.to_string()),
        Timestamp => {
            let text = value.as_str().ok_or_else(mismatch)?;
            let parsed = DateTime::parse_from_rfc3339(text).map_err(|e| e.to_string())?;
            Ok(SqlValue::Text(timestamp_text(&parsed.with_timezone(&Utc))))
        }
    }
}

fn from_sql(kind: ColumnKind, value: ValueRef<'_>, idx: usize) -> rusqlite::Result<Value> {
    let invalid = |ty: Type| rusqlite::Error::InvalidColumnType(idx, format!("{kind:?}"), ty);
    Ok(match (kind, value) {
        (_, ValueRef::Null) => Value::Null,
        (Text | Timestamp, ValueRef::Text(bytes)) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        (Integer, ValueRef::Integer(i)) => Value::Number(i.into()),
        (Real, ValueRef::Real(f)) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        (Real, ValueRef::Integer(i)) => {
            Number::from_f64(i as f64).map(Value::Number).unwrap_or(Value::Null)
        }
        (Bool, ValueRef::Integer(i)) => Value::Bool(i != 0),
        (Json, ValueRef::Text(bytes)) => serde_json::from_slice(bytes)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))?,
        (_, other) => return Err(invalid(other.data_type())),
    })
}

/// Validate every entity map against a fully-populated sample.
pub fn validate_all() -> Result<(), LeadflowError> {
    let now = Utc::now();
    let labels = || Some(BTreeMap::from([("ta".to_string(), "மாதிரி".to_string())]));

    let user = User {
        id: "u".into(),
        username: "sample".into(),
        role: Role::Caller,
        name: "Sample".into(),
        branch_id: Some("b".into()),
        password: Some("pw".into()),
        password_last_changed: Some(now),
    };
    let branch = Branch {
        id: "b".into(),
        name: "Sample".into(),
        location: "Sample".into(),
        contact_number: "0".into(),
        active: true,
    };
    let product = Product {
        id: "p".into(),
        sku: "S-1".into(),
        name: "Sample".into(),
        category: "Sample".into(),
        description: "Sample".into(),
        name_localized: labels(),
        category_localized: labels(),
        description_localized: labels(),
        price_min: 1.0,
        price_max: 2.0,
        active: true,
        branch_id: Some("b".into()),
        specifications: labels(),
    };
    let history = HistoryEntry {
        stage: PipelineStage::New,
        timestamp: now,
        user_id: "u".into(),
        notes: Some("n".into()),
    };
    let enquiry = Enquiry {
        id: "e".into(),
        customer_name: "Sample".into(),
        customer_phone: "0".into(),
        customer_location: "Sample".into(),
        product_id: "p".into(),
        branch_id: "b".into(),
        purchase_intent: "now".into(),
        pipeline_stage: PipelineStage::New,
        created_by: "u".into(),
        created_at: now,
        closed_amount: Some(1.0),
        warranty_months: Some(12),
        history: vec![history.clone()],
    };
    let promotion = Promotion {
        id: "pr".into(),
        title: "Sample".into(),
        description: "Sample".into(),
        discount_percent: Some(5.0),
        product_ids: vec!["p".into()],
        branch_id: Some("b".into()),
        starts_at: now,
        ends_at: now,
        active: true,
    };
    let message = Message {
        id: "m".into(),
        sender_id: "u".into(),
        recipient_id: Some("u".into()),
        branch_id: Some("b".into()),
        content: "hi".into(),
        created_at: now,
        read: false,
    };
    let queue_item = QueueItem {
        id: "q".into(),
        recipient: "0".into(),
        message: "hi".into(),
        status: QueueStatus::Draft,
        enquiry_id: Some("e".into()),
        created_at: now,
        updated_at: now,
    };
    let call_log = CallLog {
        call_sid: "c".into(),
        enquiry_id: "e".into(),
        from_number: "0".into(),
        to_number: "1".into(),
        branch_id: "b".into(),
        caller_id: "u".into(),
        status: "queued".into(),
        duration_secs: Some(1),
        recording_url: Some("https://rec".into()),
        created_at: now,
        updated_at: now,
    };

    USERS.validate(&serde_json::to_value(&user)?)?;
    BRANCHES.validate(&serde_json::to_value(&branch)?)?;
    PRODUCTS.validate(&serde_json::to_value(&product)?)?;
    ENQUIRIES.validate(&serde_json::to_value(&enquiry)?)?;
    HISTORY.validate(&serde_json::to_value(&history)?)?;
    PROMOTIONS.validate(&serde_json::to_value(&promotion)?)?;
    MESSAGES.validate(&serde_json::to_value(&message)?)?;
    QUEUE.validate(&serde_json::to_value(&queue_item)?)?;
    CALL_LOGS.validate(&serde_json::to_value(&call_log)?)?;
    Ok(())
}
