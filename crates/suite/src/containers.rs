//! JSON-LD container listings

use anyhow::{ensure, Context};
use lws_harness::{CheckResult, TestClient};
use serde_json::{json, Value};

use crate::{expect_status, require_header};

async fn root_listing(client: &TestClient) -> anyhow::Result<Value> {
    let response = client.get("/").send().await?;
    expect_status(&response, 200, "Status should be 200")?;
    response.json().context("Container listing should be JSON")
}

/// Containers are served as JSON-LD (6.1.1)
pub async fn jsonld(client: &TestClient) -> CheckResult {
    let response = client.get("/").send().await?;

    expect_status(&response, 200, "Status should be 200")?;
    let content_type = require_header(&response, "Content-Type")?;
    ensure!(
        content_type.contains("application/ld+json"),
        "Content-Type should be application/ld+json, got {}",
        content_type
    );
    let body = response.json().context("Should have JSON body")?;
    ensure!(!body.is_null(), "Should have JSON body");
    Ok(())
}

/// Listings carry an `@context` declaring `@vocab` (6.1.2)
pub async fn context(client: &TestClient) -> CheckResult {
    let body = root_listing(client).await?;

    let context = body.get("@context").context("Should have @context")?;
    let has_vocab = body.get("@vocab").is_some() || context.get("@vocab").is_some();
    ensure!(has_vocab, "Should have @vocab");
    Ok(())
}

/// Listings carry a `contains` array (6.1.3)
pub async fn contains(client: &TestClient) -> CheckResult {
    client
        .create_json("/test-container-item.json", &json!({ "test": true }))
        .await?;

    let body = root_listing(client).await?;
    let contains = body.get("contains").context("Should have contains property")?;
    ensure!(contains.is_array(), "contains should be an array");
    Ok(())
}

/// Container identifiers end with a slash (6.1.4)
pub async fn trailing_slash(client: &TestClient) -> CheckResult {
    let body = root_listing(client).await?;

    let id = body.get("@id").and_then(Value::as_str).unwrap_or_default();
    ensure!(id.ends_with('/'), "Container @id should end with /, got {:?}", id);
    Ok(())
}
