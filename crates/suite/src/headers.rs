//! Link, Location, CORS and Allow headers

use anyhow::ensure;
use lws_harness::{CheckResult, TestClient};
use serde_json::json;

use crate::{expect_status, require_header, unique_path};

/// Resources advertise `ldp#Resource` in Link (7.1.1)
pub async fn link_resource(client: &TestClient) -> CheckResult {
    let path = "/test-link-resource.json";
    client.create_json(path, &json!({ "test": true })).await?;

    let response = client.get(path).send().await?;
    let link = require_header(&response, "Link")?;
    ensure!(link.contains("ldp#Resource"), "Link header should include ldp#Resource");
    Ok(())
}

/// Containers advertise `ldp#Container` in Link (7.1.2)
pub async fn link_container(client: &TestClient) -> CheckResult {
    let response = client.get("/").send().await?;
    let link = require_header(&response, "Link")?;
    ensure!(link.contains("ldp#Container"), "Link header should include ldp#Container");
    Ok(())
}

/// 201 Created carries a Location naming the resource (7.2.1)
pub async fn location_header(client: &TestClient) -> CheckResult {
    let path = unique_path("test-location", ".json");

    let response = client
        .put_json(&path, &json!({ "test": true }))
        .send()
        .await?;
    if response.status == 201 {
        client.track(path.as_str());
    }

    expect_status(&response, 201, "Status should be 201")?;
    let location = require_header(&response, "Location")?;
    ensure!(
        location.contains(&path),
        "Location should include resource path {}, got {}",
        path,
        location
    );
    Ok(())
}

/// Responses carry Access-Control-Allow-Origin (7.3.1)
pub async fn cors_allow_origin(client: &TestClient) -> CheckResult {
    let response = client.get("/").send().await?;
    require_header(&response, "Access-Control-Allow-Origin")?;
    Ok(())
}

/// Preflights carry Access-Control-Allow-Methods (7.3.2)
pub async fn cors_allow_methods(client: &TestClient) -> CheckResult {
    let response = client
        .options("/")
        .header("Origin", "https://example.com")
        .send()
        .await?;
    require_header(&response, "Access-Control-Allow-Methods")?;
    Ok(())
}

/// OPTIONS lists supported methods in Allow (7.4.1)
pub async fn allow_header(client: &TestClient) -> CheckResult {
    let response = client.options("/").send().await?;
    let allow = require_header(&response, "Allow")?;
    ensure!(allow.contains("GET"), "Allow should include GET, got {}", allow);
    Ok(())
}
