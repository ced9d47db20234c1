//! End-to-end tests for the dynexpr expression compiler.
//!
//! Each module composes several clauses against one shared placeholder scope
//! the way a data-access layer would when building a single request.
//!
//! Run them with:
//! ```text
//! cargo test -p dynexpr-integration
//! ```

use std::sync::{Arc, Once};
use std::time::Duration;

use bytes::Bytes;
use dynexpr_core::{
    AsyncValueTransform, Compiler, CompilerConfig, EntitySchema, TransformContext, TransformError,
    TransformRegistry, ValueTransform,
};
use dynexpr_model::PropertyDescriptor;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// XOR "cipher" standing in for a synchronous field-encryption hook.
#[derive(Debug)]
pub struct XorCipher(pub u8);

impl ValueTransform for XorCipher {
    fn transform(&self, input: Bytes, _ctx: &TransformContext) -> Result<Bytes, TransformError> {
        Ok(input.iter().map(|b| b ^ self.0).collect::<Vec<_>>().into())
    }

    fn inverse(&self, input: Bytes, ctx: &TransformContext) -> Result<Bytes, TransformError> {
        self.transform(input, ctx)
    }
}

/// Asynchronous hook that waits before echoing a field-tagged payload, like a
/// remote key service would.
#[derive(Debug)]
pub struct SlowKeyService {
    /// Delay before each response.
    pub delay: Duration,
}

#[async_trait::async_trait]
impl AsyncValueTransform for SlowKeyService {
    async fn transform(&self, input: Bytes, ctx: &TransformContext) -> Result<Bytes, TransformError> {
        tokio::time::sleep(self.delay).await;
        let mut out = format!("{}:", ctx.field).into_bytes();
        out.extend_from_slice(&input);
        Ok(out.into())
    }

    async fn inverse(&self, input: Bytes, ctx: &TransformContext) -> Result<Bytes, TransformError> {
        let prefix = format!("{}:", ctx.field);
        input
            .strip_prefix(prefix.as_bytes())
            .map(Bytes::copy_from_slice)
            .ok_or_else(|| anyhow::anyhow!("payload not sealed for {}", ctx.field).into())
    }
}

/// A compiler with the `xor` (sync) and `kms` (async) hooks registered.
#[must_use]
pub fn compiler() -> Compiler {
    init_tracing();
    let mut transforms = TransformRegistry::new();
    transforms.register_sync("xor", Arc::new(XorCipher(0x5a)));
    transforms.register_async(
        "kms",
        Arc::new(SlowKeyService {
            delay: Duration::from_millis(5),
        }),
    );
    Compiler::new(CompilerConfig::default(), transforms)
}

/// The `User` entity used throughout the scenarios.
#[must_use]
pub fn user_schema() -> EntitySchema {
    EntitySchema::new("User")
        .with_property(PropertyDescriptor::new("pk"))
        .with_property(PropertyDescriptor::new("sk"))
        .with_property(PropertyDescriptor::new("status"))
        .with_property(PropertyDescriptor::new("age"))
        .with_property(PropertyDescriptor::new("size"))
        .with_property(PropertyDescriptor::new("tags"))
        .with_property(PropertyDescriptor::new("createdAt").with_attribute_name("created_at"))
        .with_property(PropertyDescriptor::new("balance").with_format("F2"))
        .with_property(PropertyDescriptor::new("email").with_value_transform("xor"))
        .with_property(PropertyDescriptor::new("ssn").with_value_transform("kms"))
}

mod test_format_string;
mod test_predicate;
mod test_request;
mod test_transform;
