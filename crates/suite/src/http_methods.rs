//! HTTP method semantics: GET, PUT, POST, DELETE, HEAD, OPTIONS

use anyhow::ensure;
use lws_harness::{CheckResult, TestClient};
use serde_json::json;

use crate::{expect_status, require_header, unique_path};

/// GET on an existing resource returns 200 with ETag, Link and a body (4.1.1)
pub async fn get_resource(client: &TestClient) -> CheckResult {
    let path = "/test-get-resource.json";
    client.create_json(path, &json!({ "data": "test" })).await?;

    let response = client.get(path).send().await?;

    expect_status(&response, 200, "Status should be 200")?;
    require_header(&response, "ETag")?;
    require_header(&response, "Link")?;
    ensure!(!response.text().is_empty(), "Body should not be empty");
    Ok(())
}

/// GET on a missing resource returns 404 (4.1.1)
pub async fn get_not_found(client: &TestClient) -> CheckResult {
    let response = client.get("/nonexistent-resource.json").send().await?;
    expect_status(&response, 404, "Status should be 404")
}

/// GET on the root container returns JSON-LD typed as a container (4.1.2)
pub async fn get_container(client: &TestClient) -> CheckResult {
    let response = client.get("/").send().await?;

    expect_status(&response, 200, "Status should be 200")?;
    let content_type = require_header(&response, "Content-Type")?;
    ensure!(
        content_type.contains("application/ld+json"),
        "Content-Type should be application/ld+json, got {}",
        content_type
    );
    let link = require_header(&response, "Link")?;
    ensure!(link.contains("Container"), "Link header should include Container");
    Ok(())
}

/// PUT to a new path returns 201 with Location (4.2.1)
pub async fn put_create(client: &TestClient) -> CheckResult {
    let path = unique_path("test-put-create", ".json");
    let response = client
        .put_json(&path, &json!({ "test": true }))
        .send()
        .await?;
    if response.status == 201 {
        client.track(path.as_str());
    }

    expect_status(&response, 201, "Status should be 201 for new resource")?;
    require_header(&response, "Location")?;
    Ok(())
}

/// PUT to an existing path returns 204 (4.2.1)
pub async fn put_update(client: &TestClient) -> CheckResult {
    let path = "/test-put-update.json";
    client.create_json(path, &json!({ "version": 1 })).await?;

    let response = client
        .put_json(path, &json!({ "version": 2 }))
        .send()
        .await?;

    expect_status(&response, 204, "Status should be 204 for update")
}

/// `If-None-Match: *` creates once, then refuses with 412 (4.2.2)
pub async fn put_if_none_match(client: &TestClient) -> CheckResult {
    let path = unique_path("test-put-if-none-match", ".json");

    let first = client
        .put_json(&path, &json!({ "test": true }))
        .header("If-None-Match", "*")
        .send()
        .await?;
    if first.status == 201 {
        client.track(path.as_str());
    }
    expect_status(&first, 201, "Should create new resource")?;

    let second = client
        .put_json(&path, &json!({ "test": false }))
        .header("If-None-Match", "*")
        .send()
        .await?;
    expect_status(&second, 412, "Should return 412 when resource exists")
}

/// POST with a Slug creates a resource whose Location carries the slug (4.3.1)
pub async fn post_slug(client: &TestClient) -> CheckResult {
    let slug = unique_path("test-slug", "");
    let slug = slug.trim_start_matches('/');

    let response = client
        .post_json("/", &json!({ "posted": true }))
        .header("Slug", slug)
        .send()
        .await?;

    expect_status(&response, 201, "Status should be 201")?;
    let location = require_header(&response, "Location")?;
    client.track(client.path_of(location));
    ensure!(location.contains("test-slug"), "Location should include slug, got {}", location);
    Ok(())
}

/// POST with an ldp#BasicContainer type link creates a container (4.3.2)
pub async fn post_container(client: &TestClient) -> CheckResult {
    let slug = unique_path("test-container", "");
    let slug = slug.trim_start_matches('/');

    let response = client
        .request(lws_harness::client::Method::POST, "/")
        .header("Slug", slug)
        .header("Link", "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\"")
        .send()
        .await?;

    expect_status(&response, 201, "Status should be 201")?;
    let location = require_header(&response, "Location")?;
    client.track(client.path_of(location));
    ensure!(location.ends_with('/'), "Container URI should end with /, got {}", location);
    Ok(())
}

/// DELETE removes a resource with 204 and later GETs return 404 (4.4.1)
pub async fn delete_resource(client: &TestClient) -> CheckResult {
    let path = "/test-delete-resource.json";
    client.create_json(path, &json!({ "test": true })).await?;

    let response = client.delete(path).send().await?;
    expect_status(&response, 204, "Status should be 204")?;

    let verify = client.get(path).send().await?;
    expect_status(&verify, 404, "Resource should be deleted")
}

/// DELETE on a missing resource returns 404 (4.4.1)
pub async fn delete_not_found(client: &TestClient) -> CheckResult {
    let response = client.delete("/nonexistent-resource.json").send().await?;
    expect_status(&response, 404, "Status should be 404")
}

/// HEAD returns the GET metadata without a body (4.5.1)
pub async fn head_resource(client: &TestClient) -> CheckResult {
    let path = "/test-head-resource.json";
    client.create_json(path, &json!({ "test": "data" })).await?;

    let response = client.head(path).send().await?;

    expect_status(&response, 200, "Status should be 200")?;
    require_header(&response, "ETag")?;
    require_header(&response, "Content-Type")?;
    require_header(&response, "Link")?;
    ensure!(response.text().is_empty(), "Body should be empty");
    Ok(())
}

/// A CORS preflight answers 204 with allow headers (4.6.1)
pub async fn options_cors(client: &TestClient) -> CheckResult {
    let response = client
        .options("/")
        .header("Origin", "https://example.com")
        .send()
        .await?;

    expect_status(&response, 204, "Status should be 204")?;
    require_header(&response, "Access-Control-Allow-Origin")?;
    require_header(&response, "Access-Control-Allow-Methods")?;
    Ok(())
}
