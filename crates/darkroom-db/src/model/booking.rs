use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use darkroom_core::actor::Rank;
use darkroom_core::schedule::{RentalType, Slot};
use darkroom_core::types::EntityKind;
use darkroom_core::workflow::BookingStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::schema::{BOOKINGS, TableSchema};
use crate::db::wire::SqlValue;
use crate::model::cloud::{date_only, full_time};
use crate::model::{CloudRecord, LocalRecord, null_default, rank_level};

/// Structured part of a booking's free-form details. Unknown keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photographer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_ons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One entry of a booking's append-only status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: BookingStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub client_id: Option<String>,
    pub client_name: String,
    pub client_phone: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_default")]
    pub rental_type: RentalType,
    pub shoot_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: BookingStatus,
    #[serde(default, deserialize_with = "null_default")]
    pub total_amount: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub paid_amount: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub currency: String,
    #[serde(default = "unit_rate", deserialize_with = "rate_or_unit")]
    pub exchange_rate: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub details: BookingDetails,
    #[serde(default, deserialize_with = "null_default")]
    pub status_history: Vec<StatusChange>,
    pub selection_deadline: Option<NaiveDate>,
    pub selection_confirmed_at: Option<DateTime<Utc>>,
    pub delivery_deadline: Option<NaiveDate>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub client_token: Option<String>,
    #[serde(with = "rank_level", default = "lowest_rank")]
    pub last_editor_rank: Rank,
    pub created_by: Option<String>,
    pub created_by_name: Option<String>,
    pub updated_by: Option<String>,
    pub updated_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

const fn unit_rate() -> f64 {
    1.0
}

const fn lowest_rank() -> Rank {
    Rank::Staff
}

fn rate_or_unit<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let rate = Option::<f64>::deserialize(deserializer)?;
    Ok(rate.filter(|rate| *rate > 0.0).unwrap_or(1.0))
}

impl Booking {
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    #[must_use]
    pub fn outstanding(&self) -> f64 {
        (self.total_amount - self.paid_amount).max(0.0)
    }

    /// The booking's footprint on the calendar.
    #[must_use]
    pub fn slot(&self) -> Slot {
        Slot {
            booking_id: self.id.clone(),
            date: self.shoot_date,
            start: self.start_time,
            end: self.end_time,
            rental_type: self.rental_type,
        }
    }
}

impl LocalRecord for Booking {
    const SCHEMA: &'static TableSchema = &BOOKINGS;

    fn key(&self) -> SqlValue {
        SqlValue::from(self.id.as_str())
    }
}

impl CloudRecord for Booking {
    const KIND: EntityKind = EntityKind::Booking;
    const CLOUD_ALIASES: &'static [(&'static str, &'static [&'static str])] = &[
        ("clientName", &["client", "customer_name"]),
        ("clientPhone", &["phone", "client_phone_number"]),
        ("shootDate", &["date", "booking_date", "event_date"]),
        ("totalAmount", &["total", "price", "amount"]),
        ("paidAmount", &["paid", "deposit"]),
        ("rentalType", &["rental", "booking_type"]),
        ("details", &["metadata", "extra"]),
    ];

    fn record_id(&self) -> &str {
        &self.id
    }

    fn normalize_cloud(object: &mut Map<String, Value>) {
        for field in ["shootDate", "selectionDeadline", "deliveryDeadline"] {
            date_only(object, field);
        }
        full_time(object, "startTime");
        full_time(object, "endTime");
        if let Some(Value::String(kind)) = object.get_mut("rentalType") {
            *kind = kind.trim().to_ascii_lowercase();
        }
    }
}
