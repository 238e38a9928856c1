//! Equipment tracking: who has which item, battery and memory card pools,
//! maintenance. Every change appends an inventory log entry.

use chrono::Utc;
use darkroom_core::actor::{Actor, Rank};
use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_db::db::query::Filter;
use darkroom_db::model::inventory::{
    InventoryAction, InventoryItem, InventoryLog, InventoryStatus, ItemType,
};
use serde::{Deserialize, Serialize};

use crate::activity;
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle;
use crate::mirror::list_mirrored;
use crate::studio::Studio;
use crate::sync::write::{insert_record, push_record};

/// Known equipment with its pool sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: &'static str,
    pub item_type: ItemType,
    pub battery_total: u32,
    pub memory_total: u32,
}

const fn entry(name: &'static str, item_type: ItemType, battery_total: u32, memory_total: u32) -> CatalogEntry {
    CatalogEntry {
        name,
        item_type,
        battery_total,
        memory_total,
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    entry("Canon EOS R5", ItemType::Camera, 3, 2),
    entry("Sony A7 IV", ItemType::Camera, 3, 2),
    entry("Canon RF 24-70mm f/2.8", ItemType::Lens, 0, 0),
    entry("Sony FE 85mm f/1.4 GM", ItemType::Lens, 0, 0),
    entry("Godox AD600 Pro", ItemType::Light, 2, 0),
    entry("Aputure 300d II", ItemType::Light, 0, 0),
    entry("DJI Mavic 3", ItemType::Drone, 3, 1),
    entry("Rode Wireless GO II", ItemType::Audio, 2, 0),
    entry("Manfrotto 055 tripod", ItemType::Accessory, 0, 0),
];

/// A custom item not in the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub item_type: ItemType,
    #[serde(default)]
    pub battery_total: u32,
    #[serde(default)]
    pub memory_total: u32,
    pub notes: Option<String>,
}

impl From<&CatalogEntry> for NewItem {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            name: entry.name.to_string(),
            item_type: entry.item_type,
            battery_total: entry.battery_total,
            memory_total: entry.memory_total,
            notes: None,
        }
    }
}

fn new_log(item_id: &str, action: InventoryAction, actor: &Actor, detail: String) -> InventoryLog {
    InventoryLog {
        id: uuid::Uuid::now_v7().to_string(),
        item_id: item_id.to_string(),
        action,
        actor_id: actor.id.clone(),
        actor_name: actor.name.clone(),
        detail,
        created_at: Utc::now(),
    }
}

async fn append_log(studio: &Studio, log: &InventoryLog) -> ServiceResult<()> {
    insert_record(studio, log).await?;
    Ok(())
}

/// ## Summary
/// Adds an item with every battery charged and every memory card free.
///
/// ## Errors
/// - `AuthorizationError` below reception rank
/// - `ValidationError` for an empty name
#[tracing::instrument(skip(studio, actor, input), fields(actor = %actor.id))]
pub async fn create_item(studio: &Studio, actor: &Actor, input: NewItem) -> ServiceResult<InventoryItem> {
    actor.require(Rank::Reception, "add equipment")?;
    let now = Utc::now();
    let item = InventoryItem {
        id: uuid::Uuid::now_v7().to_string(),
        name: input.name.trim().to_string(),
        item_type: input.item_type,
        status: InventoryStatus::Storage,
        assigned_to: None,
        assigned_to_name: None,
        battery_total: input.battery_total,
        battery_charged: input.battery_total,
        memory_total: input.memory_total,
        memory_free: input.memory_total,
        notes: input.notes,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        deleted_by: None,
    };
    item.validate()?;

    insert_record(studio, &item).await?;
    append_log(
        studio,
        &new_log(&item.id, InventoryAction::Created, actor, format!("Added {}", item.name)),
    )
    .await?;
    activity::record(
        studio,
        actor,
        "create",
        EntityKind::InventoryItem,
        &item.id,
        format!("Added {} to inventory", item.name),
    )
    .await?;
    Ok(item)
}

/// ## Summary
/// Adds an item from the catalog by name.
///
/// ## Errors
/// `NotFound` for a name not in the catalog, otherwise as [`create_item`].
pub async fn create_from_catalog(studio: &Studio, actor: &Actor, name: &str) -> ServiceResult<InventoryItem> {
    let entry = CATALOG
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| ServiceError::NotFound(format!("catalog entry '{name}'")))?;
    create_item(studio, actor, NewItem::from(entry)).await
}

/// ## Summary
/// Applies `change` to a live item under its row lock. `change` returns the
/// log detail, or `None` when nothing changed; a no-op writes nothing.
async fn transition<F>(
    studio: &Studio,
    actor: &Actor,
    id: &str,
    action: InventoryAction,
    change: F,
) -> ServiceResult<InventoryItem>
where
    F: FnOnce(&mut InventoryItem) -> ServiceResult<Option<String>>,
{
    let _guard = studio.store.lock_row(EntityKind::InventoryItem.table(), id).await;
    let mut item = match studio.store.find::<InventoryItem>(id).await? {
        Some(item) if item.deleted_at.is_none() => item,
        _ => return Err(ServiceError::NotFound(format!("inventory item {id}"))),
    };

    let Some(detail) = change(&mut item)? else {
        tracing::debug!(action = action.as_str(), item_id = %id, "Nothing to change");
        return Ok(item);
    };
    item.validate()?;
    item.updated_at = Utc::now();

    let log = new_log(id, action, actor, detail);
    let _log_guard = studio.store.lock_row(EntityKind::InventoryLog.table(), &log.id).await;
    let mut tx = studio.store.begin();
    tx.upsert(&item)?;
    tx.upsert(&log)?;
    tx.commit().await?;

    push_record(studio, SyncOperation::Update, &item).await?;
    push_record(studio, SyncOperation::Create, &log).await?;
    activity::record(
        studio,
        actor,
        action.as_str(),
        EntityKind::InventoryItem,
        id,
        format!("{}: {}", item.name, log.detail),
    )
    .await?;
    Ok(item)
}

/// ## Summary
/// Hands an item in storage to a staff member.
///
/// ## Errors
/// - `NotFound` when the item does not exist or is in the trash
/// - `ValidationError` when the item is deployed or in maintenance
pub async fn assign_item(
    studio: &Studio,
    actor: &Actor,
    id: &str,
    assignee: &Actor,
) -> ServiceResult<InventoryItem> {
    transition(studio, actor, id, InventoryAction::Assigned, |item| {
        match item.status {
            InventoryStatus::Storage => {}
            InventoryStatus::Deployed => {
                return Err(ServiceError::ValidationError(format!(
                    "{} is already out with {}",
                    item.name,
                    item.assigned_to_name.as_deref().unwrap_or("someone")
                )));
            }
            InventoryStatus::Maintenance => {
                return Err(ServiceError::ValidationError(format!(
                    "{} is in maintenance",
                    item.name
                )));
            }
        }
        item.status = InventoryStatus::Deployed;
        item.assigned_to = Some(assignee.id.clone());
        item.assigned_to_name = Some(assignee.name.clone());
        Ok(Some(format!("Assigned to {}", assignee.name)))
    })
    .await
}

/// ## Errors
/// - `NotFound` when the item does not exist or is in the trash
/// - `ValidationError` when the item is not deployed
pub async fn return_item(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<InventoryItem> {
    transition(studio, actor, id, InventoryAction::Returned, |item| {
        if item.status != InventoryStatus::Deployed {
            return Err(ServiceError::ValidationError(format!(
                "{} is not deployed",
                item.name
            )));
        }
        let from = item.assigned_to_name.take().unwrap_or_default();
        item.assigned_to = None;
        item.status = InventoryStatus::Storage;
        Ok(Some(format!("Returned by {from}")))
    })
    .await
}

/// ## Summary
/// Sends an item to maintenance, taking it back from its assignee.
///
/// ## Errors
/// - `NotFound` when the item does not exist or is in the trash
/// - `ValidationError` when the item is already in maintenance
pub async fn start_maintenance(
    studio: &Studio,
    actor: &Actor,
    id: &str,
    reason: &str,
) -> ServiceResult<InventoryItem> {
    transition(studio, actor, id, InventoryAction::MaintenanceIn, |item| {
        if item.status == InventoryStatus::Maintenance {
            return Err(ServiceError::ValidationError(format!(
                "{} is already in maintenance",
                item.name
            )));
        }
        item.status = InventoryStatus::Maintenance;
        item.assigned_to = None;
        item.assigned_to_name = None;
        Ok(Some(format!("Sent to maintenance: {}", reason.trim())))
    })
    .await
}

/// ## Errors
/// - `NotFound` when the item does not exist or is in the trash
/// - `ValidationError` when the item is not in maintenance
pub async fn finish_maintenance(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<InventoryItem> {
    transition(studio, actor, id, InventoryAction::MaintenanceOut, |item| {
        if item.status != InventoryStatus::Maintenance {
            return Err(ServiceError::ValidationError(format!(
                "{} is not in maintenance",
                item.name
            )));
        }
        item.status = InventoryStatus::Storage;
        Ok(Some("Back from maintenance".to_string()))
    })
    .await
}

/// Pool adjustments. Each is a no-op at its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolAction {
    ChargeBattery,
    DrainBattery,
    UseMemoryCard,
    FreeMemoryCard,
}

impl PoolAction {
    const fn log_action(self) -> InventoryAction {
        match self {
            Self::ChargeBattery => InventoryAction::BatteryCharged,
            Self::DrainBattery => InventoryAction::BatteryDrained,
            Self::UseMemoryCard => InventoryAction::MemoryUsed,
            Self::FreeMemoryCard => InventoryAction::MemoryFreed,
        }
    }
}

/// ## Summary
/// Moves one unit of a battery or memory card pool.
///
/// ## Errors
/// Returns `NotFound` when the item does not exist or is in the trash.
pub async fn adjust_pool(
    studio: &Studio,
    actor: &Actor,
    id: &str,
    pool: PoolAction,
) -> ServiceResult<InventoryItem> {
    transition(studio, actor, id, pool.log_action(), |item| {
        let changed = match pool {
            PoolAction::ChargeBattery => item.charge_battery(),
            PoolAction::DrainBattery => item.drain_battery(),
            PoolAction::UseMemoryCard => item.use_memory_card(),
            PoolAction::FreeMemoryCard => item.free_memory_card(),
        };
        Ok(changed.then(|| match pool {
            PoolAction::ChargeBattery | PoolAction::DrainBattery => format!(
                "Batteries {}/{} charged",
                item.battery_charged, item.battery_total
            ),
            PoolAction::UseMemoryCard | PoolAction::FreeMemoryCard => format!(
                "Memory cards {}/{} free",
                item.memory_free, item.memory_total
            ),
        }))
    })
    .await
}

/// ## Errors
/// Returns `NotFound` when the item does not exist or is in the trash.
pub async fn update_notes(
    studio: &Studio,
    actor: &Actor,
    id: &str,
    notes: Option<String>,
) -> ServiceResult<InventoryItem> {
    let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    transition(studio, actor, id, InventoryAction::NotesUpdated, |item| {
        if item.notes == notes {
            return Ok(None);
        }
        item.notes = notes;
        Ok(Some(match &item.notes {
            Some(text) => format!("Notes: {text}"),
            None => "Notes cleared".to_string(),
        }))
    })
    .await
}

/// ## Summary
/// Moves an item to the trash.
///
/// ## Errors
/// See [`lifecycle::soft_delete`].
pub async fn delete_item(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<()> {
    lifecycle::soft_delete(studio, actor, EntityKind::InventoryItem, id).await?;
    append_log(
        studio,
        &new_log(id, InventoryAction::Deleted, actor, "Moved to the trash".to_string()),
    )
    .await
}

/// ## Summary
/// Removes an item for good. Its inventory log is kept and closed with a
/// purge entry once the item is gone.
///
/// ## Errors
/// See [`lifecycle::purge`]. A missing item leaves the log untouched.
pub async fn purge_item(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<()> {
    actor.require(Rank::Manager, "permanently delete equipment")?;
    lifecycle::purge(studio, actor, EntityKind::InventoryItem, id).await?;
    append_log(
        studio,
        &new_log(id, InventoryAction::Purged, actor, "Permanently deleted".to_string()),
    )
    .await
}

/// Live items by name.
pub async fn list_items(studio: &Studio) -> Vec<InventoryItem> {
    let mut items: Vec<InventoryItem> = list_mirrored(studio).await;
    items.retain(|item| item.deleted_at.is_none());
    items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    items
}

/// ## Summary
/// An item's log, newest first.
///
/// ## Errors
/// Returns an error if the local read fails.
pub async fn item_log(studio: &Studio, item_id: &str) -> ServiceResult<Vec<InventoryLog>> {
    let mut entries: Vec<InventoryLog> = studio
        .store
        .find_where(Filter::eq("itemId", item_id), None)
        .await?;
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    Ok(entries)
}
