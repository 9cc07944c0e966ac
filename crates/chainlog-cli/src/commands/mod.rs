//! Subcommand implementations.

pub(crate) mod id;
pub(crate) mod inspect;
pub(crate) mod mine;
pub(crate) mod record;
pub(crate) mod verify;

use anyhow::Context;
use chainlog_core::base62;
use uuid::Uuid;

/// Parse an identifier given either as a UUID or in base-62.
pub(crate) fn parse_uuid(input: &str) -> anyhow::Result<Uuid> {
    let input = input.trim();
    if let Ok(uuid) = Uuid::parse_str(input) {
        return Ok(uuid);
    }
    let value = base62::decode(input)
        .with_context(|| format!("'{input}' is neither a UUID nor a base-62 id"))?;
    Ok(Uuid::from_u128(value))
}
