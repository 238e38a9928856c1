//! Booking service: the studio calendar and each shoot's workflow.

use chrono::{NaiveDate, NaiveTime, Utc};
use darkroom_core::actor::{Actor, Rank, RankPolicy, Resolution, Role, resolve};
use darkroom_core::schedule::{
    Availability, RentalType, Slot, check_availability, delivery_deadline, selection_deadline,
};
use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_core::workflow::BookingStatus;
use darkroom_db::db::lock::RowGuard;
use darkroom_db::db::query::Filter;
use darkroom_db::model::booking::{Booking, BookingDetails, StatusChange};
use darkroom_db::model::conflict::BookingConflict;
use serde::Deserialize;

use crate::activity;
use crate::conflict::record_conflict;
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle;
use crate::mirror::list_mirrored;
use crate::notify::NewNotification;
use crate::studio::Studio;
use crate::sync::write::push_record;

const DEFAULT_CURRENCY: &str = "DZD";
/// Lock namespace for calendar days; held across an availability check and the write it guards.
const CALENDAR_LOCK: &str = "booking-dates";

/// Input for a new booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub client_id: Option<String>,
    pub client_name: String,
    pub client_phone: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rental_type: RentalType,
    pub shoot_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub paid_amount: f64,
    pub currency: Option<String>,
    pub exchange_rate: Option<f64>,
    #[serde(default)]
    pub details: BookingDetails,
    /// Starting stage; new bookings are inquiries unless stated otherwise.
    pub status: Option<BookingStatus>,
    /// Book even when the window collides with other bookings.
    #[serde(default)]
    pub allow_overlap: bool,
}

impl NewBooking {
    #[must_use]
    pub fn new(client_name: impl Into<String>, shoot_date: NaiveDate) -> Self {
        Self {
            client_id: None,
            client_name: client_name.into(),
            client_phone: None,
            category: String::new(),
            rental_type: RentalType::Partial,
            shoot_date,
            start_time: None,
            end_time: None,
            total_amount: 0.0,
            paid_amount: 0.0,
            currency: None,
            exchange_rate: None,
            details: BookingDetails::default(),
            status: None,
            allow_overlap: false,
        }
    }

    #[must_use]
    pub const fn window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }
}

/// Fields a booking edit may change. Absent fields are left as they are.
/// Status and payments have their own operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub category: Option<String>,
    pub rental_type: Option<RentalType>,
    pub shoot_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub total_amount: Option<f64>,
    pub currency: Option<String>,
    pub exchange_rate: Option<f64>,
    pub details: Option<BookingDetails>,
    #[serde(default)]
    pub allow_overlap: bool,
}

impl BookingPatch {
    fn moves_slot(&self) -> bool {
        self.rental_type.is_some()
            || self.shoot_date.is_some()
            || self.start_time.is_some()
            || self.end_time.is_some()
    }

    fn apply_to(&self, booking: &mut Booking) {
        if let Some(name) = &self.client_name {
            booking.client_name.clone_from(name);
        }
        if let Some(phone) = &self.client_phone {
            booking.client_phone = Some(phone.clone());
        }
        if let Some(category) = &self.category {
            booking.category.clone_from(category);
        }
        if let Some(rental_type) = self.rental_type {
            booking.rental_type = rental_type;
        }
        if let Some(date) = self.shoot_date {
            booking.shoot_date = date;
            booking.selection_deadline = Some(selection_deadline(date));
        }
        if let Some(start) = self.start_time {
            booking.start_time = Some(start);
        }
        if let Some(end) = self.end_time {
            booking.end_time = Some(end);
        }
        if let Some(total) = self.total_amount {
            booking.total_amount = total;
        }
        if let Some(currency) = &self.currency {
            booking.currency.clone_from(currency);
        }
        if let Some(rate) = self.exchange_rate {
            booking.exchange_rate = rate;
        }
        if let Some(details) = &self.details {
            booking.details = details.clone();
        }
    }
}

/// Result of an edit: either stored, or held back for a manager.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingUpdate {
    Applied(Booking),
    Deferred(BookingConflict),
}

/// ## Summary
/// Checks the shape of a booking before it is written.
///
/// ## Errors
/// Returns `ValidationError` naming the first problem found.
pub fn validate(booking: &Booking) -> ServiceResult<()> {
    if booking.client_name.trim().is_empty() {
        return Err(ServiceError::ValidationError("client name is required".to_string()));
    }
    if let (Some(start), Some(end)) = (booking.start_time, booking.end_time)
        && start >= end
    {
        return Err(ServiceError::ValidationError(format!(
            "start time {start} must be before end time {end}"
        )));
    }
    for (field, amount) in [
        ("total amount", booking.total_amount),
        ("paid amount", booking.paid_amount),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ServiceError::ValidationError(format!(
                "{field} must be a non-negative number"
            )));
        }
    }
    if !booking.exchange_rate.is_finite() || booking.exchange_rate <= 0.0 {
        return Err(ServiceError::ValidationError(
            "exchange rate must be positive".to_string(),
        ));
    }
    Ok(())
}

/// ## Summary
/// Checks a calendar slot against every live, non-cancelled booking that day.
///
/// ## Errors
/// Returns an error if the local read fails.
pub async fn availability(studio: &Studio, slot: &Slot) -> ServiceResult<Availability> {
    let same_day: Vec<Booking> = studio
        .store
        .find_where(
            Filter::active().and(Filter::eq("shootDate", slot.date.to_string())),
            None,
        )
        .await?;
    let others: Vec<Slot> = same_day
        .iter()
        .filter(|booking| booking.status != BookingStatus::Cancelled)
        .map(Booking::slot)
        .collect();
    Ok(check_availability(slot, &others))
}

/// ## Summary
/// Availability of a prospective window, as shown before booking.
///
/// ## Errors
/// Returns an error if the local read fails.
pub async fn check_booking_availability(
    studio: &Studio,
    date: NaiveDate,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
    rental_type: RentalType,
    exclude: Option<&str>,
) -> ServiceResult<Availability> {
    let slot = Slot {
        booking_id: exclude.unwrap_or_default().to_string(),
        date,
        start,
        end,
        rental_type,
    };
    availability(studio, &slot).await
}

async fn ensure_available(studio: &Studio, booking: &Booking) -> ServiceResult<()> {
    let found = availability(studio, &booking.slot()).await?;
    if found.has_conflict {
        return Err(ServiceError::ScheduleConflict(format!(
            "{} on {} collides with {}",
            booking.client_name,
            booking.shoot_date,
            found.conflicting_booking_ids.join(", ")
        )));
    }
    Ok(())
}

/// Locks the given calendar days, always in date order.
async fn lock_days(studio: &Studio, mut days: Vec<NaiveDate>) -> Vec<RowGuard> {
    days.sort_unstable();
    days.dedup();
    let mut guards = Vec::with_capacity(days.len());
    for day in days {
        guards.push(studio.store.lock_row(CALENDAR_LOCK, &day.to_string()).await);
    }
    guards
}

async fn load_active(studio: &Studio, id: &str) -> ServiceResult<Booking> {
    match studio.store.find::<Booking>(id).await? {
        Some(booking) if !booking.is_deleted() => Ok(booking),
        _ => Err(ServiceError::NotFound(format!("booking {id}"))),
    }
}

/// ## Summary
/// Books a shoot. Computes the selection deadline and issues the client
/// portal token.
///
/// ## Side Effects
/// Local write, cloud mirror (or queue) and an audit entry.
///
/// ## Errors
/// - `AuthorizationError` below reception rank
/// - `ValidationError` for malformed input
/// - `ScheduleConflict` when the window is taken and overlap was not allowed
#[tracing::instrument(skip(studio, actor, input), fields(actor = %actor.id))]
pub async fn create_booking(studio: &Studio, actor: &Actor, input: NewBooking) -> ServiceResult<Booking> {
    actor.require(Rank::Reception, "create bookings")?;

    let now = Utc::now();
    let status = input.status.unwrap_or(BookingStatus::Inquiry);
    let booking = Booking {
        id: uuid::Uuid::now_v7().to_string(),
        client_id: input.client_id,
        client_name: input.client_name.trim().to_string(),
        client_phone: input.client_phone,
        category: input.category,
        rental_type: input.rental_type,
        shoot_date: input.shoot_date,
        start_time: input.start_time,
        end_time: input.end_time,
        status,
        total_amount: input.total_amount,
        paid_amount: input.paid_amount,
        currency: input.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        exchange_rate: input.exchange_rate.unwrap_or(1.0),
        details: input.details,
        status_history: vec![StatusChange {
            status,
            timestamp: now,
            note: None,
        }],
        selection_deadline: Some(selection_deadline(input.shoot_date)),
        selection_confirmed_at: None,
        delivery_deadline: None,
        delivered_at: None,
        client_token: Some(uuid::Uuid::new_v4().simple().to_string()),
        last_editor_rank: actor.rank(),
        created_by: Some(actor.id.clone()),
        created_by_name: Some(actor.name.clone()),
        updated_by: Some(actor.id.clone()),
        updated_by_name: Some(actor.name.clone()),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        deleted_by: None,
    };

    validate(&booking)?;
    let day = lock_days(studio, vec![booking.shoot_date]).await;
    if !input.allow_overlap {
        ensure_available(studio, &booking).await?;
    }
    let _row = studio.store.lock_row(EntityKind::Booking.table(), &booking.id).await;
    studio.store.upsert(&booking).await?;
    drop(day);

    push_record(studio, SyncOperation::Create, &booking).await?;
    activity::record(
        studio,
        actor,
        "create",
        EntityKind::Booking,
        &booking.id,
        format!("Booked {} for {}", booking.client_name, booking.shoot_date),
    )
    .await?;

    tracing::info!(booking_id = %booking.id, "Booking created");
    Ok(booking)
}

/// ## Summary
/// Edits a booking. When someone else edited it last and outranks the
/// actor, the edit is stored as a pending conflict instead and the booking
/// is left as it is.
///
/// ## Errors
/// - `NotFound` when the booking does not exist or is in the trash
/// - `ValidationError` for an edit that leaves the booking malformed
/// - `ScheduleConflict` when a moved window collides and overlap was not allowed
#[tracing::instrument(skip(studio, actor, patch), fields(actor = %actor.id))]
pub async fn update_booking(
    studio: &Studio,
    actor: &Actor,
    id: &str,
    patch: BookingPatch,
) -> ServiceResult<BookingUpdate> {
    let _guard = studio.store.lock_row(EntityKind::Booking.table(), id).await;
    let live = load_active(studio, id).await?;

    let mut proposal = live.clone();
    patch.apply_to(&mut proposal);
    validate(&proposal)?;
    let days = if patch.moves_slot() {
        lock_days(studio, vec![live.shoot_date, proposal.shoot_date]).await
    } else {
        Vec::new()
    };
    if patch.moves_slot() && !patch.allow_overlap {
        ensure_available(studio, &proposal).await?;
    }

    let same_editor = live.updated_by.as_deref() == Some(actor.id.as_str());
    if !same_editor
        && resolve(actor.rank(), live.last_editor_rank, RankPolicy::Strict) == Resolution::Defer
    {
        tracing::info!(
            incoming = ?actor.rank(),
            stored = ?live.last_editor_rank,
            "Edit deferred to a manager"
        );
        let conflict = record_conflict(studio, actor, proposal).await?;
        return Ok(BookingUpdate::Deferred(conflict));
    }

    proposal.last_editor_rank = actor.rank();
    proposal.updated_by = Some(actor.id.clone());
    proposal.updated_by_name = Some(actor.name.clone());
    proposal.updated_at = Utc::now();

    studio.store.upsert(&proposal).await?;
    drop(days);
    push_record(studio, SyncOperation::Update, &proposal).await?;
    activity::record(
        studio,
        actor,
        "update",
        EntityKind::Booking,
        id,
        format!("Edited booking for {}", proposal.client_name),
    )
    .await?;
    Ok(BookingUpdate::Applied(proposal))
}

/// ## Summary
/// Moves a booking to another workflow stage and appends to its history.
///
/// ## Side Effects
/// - Entering selection stamps the confirmation time and the delivery deadline
/// - Entering delivered stamps the delivery time and notifies editors and printers
///
/// ## Errors
/// - `NotFound` when the booking does not exist or is in the trash
/// - `ValidationError` for a no-op or impossible transition
/// - `AuthorizationError` for a backward move below manager rank
#[tracing::instrument(skip(studio, actor, note), fields(actor = %actor.id))]
pub async fn change_status(
    studio: &Studio,
    actor: &Actor,
    id: &str,
    next: BookingStatus,
    note: Option<String>,
) -> ServiceResult<Booking> {
    let _guard = studio.store.lock_row(EntityKind::Booking.table(), id).await;
    let mut booking = load_active(studio, id).await?;
    let previous = booking.status;
    previous.check_transition(next, actor.rank())?;

    let now = Utc::now();
    booking.status = next;
    booking.status_history.push(StatusChange {
        status: next,
        timestamp: now,
        note,
    });
    booking.updated_at = now;
    match next {
        BookingStatus::Selection => {
            booking.selection_confirmed_at = Some(now);
            booking.delivery_deadline = Some(delivery_deadline(now.date_naive()));
        }
        BookingStatus::Delivered => booking.delivered_at = Some(now),
        _ => {}
    }

    studio.store.upsert(&booking).await?;
    push_record(studio, SyncOperation::Update, &booking).await?;
    activity::record(
        studio,
        actor,
        "status_change",
        EntityKind::Booking,
        id,
        format!("{} moved from {previous} to {next}", booking.client_name),
    )
    .await?;

    if next == BookingStatus::Delivered {
        studio.notifier.publish_detached(
            &studio.store,
            NewNotification {
                kind: "booking_delivered",
                title: format!("Delivered: {}", booking.client_name),
                message: format!(
                    "The {} shoot of {} is delivered; clear its working files.",
                    booking.category, booking.shoot_date
                ),
                target_roles: vec![Role::Editor, Role::Printer],
                booking_id: Some(booking.id.clone()),
            },
        );
    }
    Ok(booking)
}

/// ## Summary
/// Records a client payment against the outstanding balance.
///
/// ## Errors
/// - `AuthorizationError` below reception rank
/// - `NotFound` when the booking does not exist or is in the trash
/// - `ValidationError` for a non-positive amount or one above the balance
#[tracing::instrument(skip(studio, actor), fields(actor = %actor.id))]
pub async fn record_payment(
    studio: &Studio,
    actor: &Actor,
    id: &str,
    amount: f64,
) -> ServiceResult<Booking> {
    actor.require(Rank::Reception, "record payments")?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ServiceError::ValidationError(
            "payment must be a positive amount".to_string(),
        ));
    }

    let _guard = studio.store.lock_row(EntityKind::Booking.table(), id).await;
    let mut booking = load_active(studio, id).await?;
    let outstanding = booking.outstanding();
    if amount > outstanding + f64::EPSILON {
        return Err(ServiceError::ValidationError(format!(
            "payment of {amount:.2} exceeds the outstanding {outstanding:.2} {}",
            booking.currency
        )));
    }

    booking.paid_amount += amount;
    booking.updated_at = Utc::now();
    studio.store.upsert(&booking).await?;
    push_record(studio, SyncOperation::Update, &booking).await?;
    activity::record(
        studio,
        actor,
        "payment",
        EntityKind::Booking,
        id,
        format!("Received {amount:.2} {} from {}", booking.currency, booking.client_name),
    )
    .await?;
    Ok(booking)
}

/// ## Errors
/// Returns `NotFound` when the booking does not exist or is in the trash.
pub async fn get_booking(studio: &Studio, id: &str) -> ServiceResult<Booking> {
    load_active(studio, id).await
}

/// ## Summary
/// Live bookings in calendar order, reconciled with the cloud when reachable.
pub async fn list_bookings(studio: &Studio) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = list_mirrored(studio)
        .await
        .into_iter()
        .filter(|booking: &Booking| !booking.is_deleted())
        .collect();
    bookings.sort_by(|a, b| {
        a.shoot_date
            .cmp(&b.shoot_date)
            .then_with(|| a.start_time.cmp(&b.start_time))
            .then_with(|| a.id.cmp(&b.id))
    });
    bookings
}

/// ## Errors
/// Returns an error if the local read fails.
pub async fn list_deleted_bookings(studio: &Studio) -> ServiceResult<Vec<Booking>> {
    lifecycle::list_deleted(studio).await
}

/// ## Summary
/// Moves a booking to the trash; its reminders and tasks are removed.
///
/// ## Errors
/// See [`lifecycle::soft_delete`].
pub async fn delete_booking(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<usize> {
    lifecycle::soft_delete(studio, actor, EntityKind::Booking, id).await
}

/// ## Errors
/// See [`lifecycle::restore`].
pub async fn restore_booking(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<()> {
    lifecycle::restore(studio, actor, EntityKind::Booking, id).await
}
