//! Converting identifiers between UUID and base-62 form.

use anyhow::Context;
use chainlog_core::base62;
use uuid::Uuid;

/// Base-62 form of a UUID.
pub(crate) fn encode(uuid: &str) -> anyhow::Result<String> {
    let uuid = Uuid::parse_str(uuid.trim()).with_context(|| format!("'{uuid}' is not a UUID"))?;
    Ok(base62::encode(uuid.as_u128()))
}

/// UUID form of a base-62 id.
pub(crate) fn decode(input: &str) -> anyhow::Result<String> {
    let value = base62::decode(input.trim())?;
    Ok(Uuid::from_u128(value).to_string())
}
