use salvo::prelude::*;
use salvo::test::{ResponseExt, TestClient};

use super::*;

#[handler]
async fn auth_method(depot: &mut Depot) -> String {
    match settings_from_depot(depot) {
        Ok(settings) => format!("{:?}", settings.auth.method),
        Err(err) => err.to_string(),
    }
}

#[test_log::test(tokio::test)]
async fn test_hoop_shares_studio_settings() {
    let settings = Settings::defaults().expect("defaults");
    let router = Router::new()
        .hoop(SettingsHandler::new(settings))
        .push(Router::with_path("method").get(auth_method));

    let body = TestClient::get("http://127.0.0.1:5800/method")
        .send(router)
        .await
        .take_string()
        .await
        .expect("body");
    assert_eq!(body, "SingleUser");
}

#[test_log::test(tokio::test)]
async fn test_unmounted_settings_are_a_config_error() {
    let router = Router::new().push(Router::with_path("method").get(auth_method));

    let body = TestClient::get("http://127.0.0.1:5800/method")
        .send(router)
        .await
        .take_string()
        .await
        .expect("body");
    assert!(body.contains("studio settings are not mounted"));
}
