//! ETag generation and conditional requests

use anyhow::Context;
use lws_harness::{CheckResult, TestClient};
use serde_json::json;

use crate::{expect_status, require_header, unique_path};

/// Resources carry a non-empty ETag (5.1.1)
pub async fn generation(client: &TestClient) -> CheckResult {
    let path = "/test-etag-generation.json";
    client.create_json(path, &json!({ "test": true })).await?;

    let response = client.get(path).send().await?;
    require_header(&response, "ETag")?;
    Ok(())
}

/// PUT with a matching `If-Match` succeeds (5.2.1)
pub async fn if_match_success(client: &TestClient) -> CheckResult {
    let path = "/test-if-match-success.json";
    client.create_json(path, &json!({ "version": 1 })).await?;

    let current = client.get(path).send().await?;
    let etag = current
        .header("ETag")
        .context("Resource should have an ETag to match against")?;

    let response = client
        .put_json(path, &json!({ "version": 2 }))
        .header("If-Match", etag)
        .send()
        .await?;

    expect_status(&response, 204, "Should update with matching ETag")
}

/// PUT with a stale `If-Match` fails with 412 (5.2.1)
pub async fn if_match_fail(client: &TestClient) -> CheckResult {
    let path = "/test-if-match-fail.json";
    client.create_json(path, &json!({ "version": 1 })).await?;

    let response = client
        .put_json(path, &json!({ "version": 2 }))
        .header("If-Match", "\"wrong-etag\"")
        .send()
        .await?;

    expect_status(&response, 412, "Should return 412 Precondition Failed")
}

/// `If-None-Match: *` creates an absent resource (5.3.1)
pub async fn if_none_match_create(client: &TestClient) -> CheckResult {
    let path = unique_path("test-if-none-match-create", ".json");

    let response = client
        .put_json(&path, &json!({ "created": true }))
        .header("If-None-Match", "*")
        .send()
        .await?;
    if response.status == 201 {
        client.track(path.as_str());
    }

    expect_status(&response, 201, "Should create with If-None-Match: *")
}

/// `If-None-Match: *` refuses to overwrite (5.3.1)
pub async fn if_none_match_prevent(client: &TestClient) -> CheckResult {
    let path = "/test-if-none-match-prevent.json";
    client.create_json(path, &json!({ "exists": true })).await?;

    let response = client
        .put_json(path, &json!({ "overwrite": true }))
        .header("If-None-Match", "*")
        .send()
        .await?;

    expect_status(&response, 412, "Should return 412 when resource exists")
}
