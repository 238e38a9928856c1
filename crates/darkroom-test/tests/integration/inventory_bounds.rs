//! Equipment pools stay within bounds while the studio is offline and the
//! log reaches the cloud afterwards.

use darkroom_test::component::inventory::{
    PoolAction, adjust_pool, assign_item, create_from_catalog, item_log, return_item,
};
use darkroom_test::component::model::inventory::InventoryStatus;

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn pools_clamp_and_logs_sync_after_reconnect() {
    let test = TestStudio::new().await;
    let item = create_from_catalog(&test.studio, &reception(), "Godox AD600 Pro")
        .await
        .expect("create");
    assert_eq!((item.battery_charged, item.battery_total), (2, 2));
    assert_eq!(item.memory_total, 0);

    test.go_offline();
    let shooter = photographer();
    assign_item(&test.studio, &reception(), &item.id, &shooter)
        .await
        .expect("assign");
    for _ in 0..4 {
        let drained = adjust_pool(&test.studio, &shooter, &item.id, PoolAction::DrainBattery)
            .await
            .expect("drain battery");
        assert!(drained.battery_charged <= drained.battery_total);
    }
    let no_cards = adjust_pool(&test.studio, &shooter, &item.id, PoolAction::UseMemoryCard)
        .await
        .expect("no memory cards");
    assert_eq!(no_cards.memory_free, 0);
    let back = return_item(&test.studio, &shooter, &item.id)
        .await
        .expect("return");
    assert_eq!(back.status, InventoryStatus::Storage);
    assert_eq!(back.battery_charged, 0);

    // created, assigned, two drains, returned
    let log = item_log(&test.studio, &item.id).await.expect("log");
    assert_eq!(log.len(), 5);

    test.restore_network();
    let report = test.studio.sync_now().await.expect("drain");
    assert_eq!(report.failed, 0);
    let row = test.cloud.row("inventory", &item.id).expect("mirrored");
    assert_eq!(row.get("battery_charged"), Some(&serde_json::json!(0)));
    assert_eq!(row.get("status"), Some(&serde_json::json!("storage")));
    let mirrored_logs = test
        .cloud
        .rows("inventory_logs")
        .into_iter()
        .filter(|entry| entry.get("item_id") == Some(&serde_json::json!(item.id)))
        .count();
    assert_eq!(mirrored_logs, 5);
}
