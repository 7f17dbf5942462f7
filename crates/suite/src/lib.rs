//! LWS Protocol Assertion Suite
//!
//! Assertion bodies for the Linked Web Storage protocol, bound to the
//! implementation refs used by the bundled manifests:
//! - `http-methods/*`: GET, PUT, POST, DELETE, HEAD and OPTIONS semantics
//! - `etag/*`: ETag generation and conditional requests
//! - `headers/*`: Link, Location, CORS and Allow headers
//! - `containers/*`: JSON-LD container listings

use anyhow::{ensure, Context};
use lws_harness::{HttpResponse, TestRegistry};
use std::sync::atomic::{AtomicU64, Ordering};

pub mod containers;
pub mod etag;
pub mod headers;
pub mod http_methods;

/// Bind `ref => body` pairs on a registry
macro_rules! bind {
    ($registry:expr, { $($reference:literal => $check:path),* $(,)? }) => {
        $( $registry.register($reference, |client| Box::pin($check(client))); )*
    };
}

/// Registry holding every assertion in the suite
pub fn registry() -> TestRegistry {
    let mut registry = TestRegistry::new();

    bind!(registry, {
        "http-methods/get#resource" => http_methods::get_resource,
        "http-methods/get#not-found" => http_methods::get_not_found,
        "http-methods/get#container" => http_methods::get_container,
        "http-methods/put#create" => http_methods::put_create,
        "http-methods/put#update" => http_methods::put_update,
        "http-methods/put#if-none-match" => http_methods::put_if_none_match,
        "http-methods/post#slug" => http_methods::post_slug,
        "http-methods/post#container" => http_methods::post_container,
        "http-methods/delete#resource" => http_methods::delete_resource,
        "http-methods/delete#not-found" => http_methods::delete_not_found,
        "http-methods/head#resource" => http_methods::head_resource,
        "http-methods/options#cors" => http_methods::options_cors,

        "etag/if-match#generation" => etag::generation,
        "etag/if-match#success" => etag::if_match_success,
        "etag/if-match#fail" => etag::if_match_fail,
        "etag/if-none-match#create" => etag::if_none_match_create,
        "etag/if-none-match#prevent" => etag::if_none_match_prevent,

        "headers/link#resource" => headers::link_resource,
        "headers/link#container" => headers::link_container,
        "headers/link#location" => headers::location_header,
        "headers/cors#allow-origin" => headers::cors_allow_origin,
        "headers/cors#allow-methods" => headers::cors_allow_methods,
        "headers/cors#allow" => headers::allow_header,

        "containers/listing#jsonld" => containers::jsonld,
        "containers/listing#context" => containers::context,
        "containers/listing#contains" => containers::contains,
        "containers/listing#trailing-slash" => containers::trailing_slash,
    });

    registry
}

/// Path that no earlier run (or earlier call in this run) has used
pub(crate) fn unique_path(prefix: &str, suffix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "/{}-{}-{}{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        n,
        suffix
    )
}

pub(crate) fn expect_status(
    response: &HttpResponse,
    expected: u16,
    message: &str,
) -> anyhow::Result<()> {
    ensure!(
        response.status == expected,
        "{}: expected {}, got {}",
        message,
        expected,
        response.status
    );
    Ok(())
}

/// Non-empty header value or a failure naming the header
pub(crate) fn require_header<'r>(
    response: &'r HttpResponse,
    name: &str,
) -> anyhow::Result<&'r str> {
    let value = response
        .header(name)
        .with_context(|| format!("Should have {} header", name))?;
    ensure!(!value.is_empty(), "{} header should not be empty", name);
    Ok(value)
}

#[cfg(test)]
pub(crate) mod testing;
