//! Protocol version resolution.
//!
//! Maps the caller's Hive version token to the client protocol revision sent
//! when opening a session. The table is fixed; resolution is a pure lookup.

use crate::error::ConnectionError;
use crate::rpc::messages::ProtocolVersion;

/// Version token used when none is configured.
pub const DEFAULT_HIVE_VERSION: &str = "10";

const LEGACY_VERSIONS: &[(&str, ProtocolVersion)] = &[
    ("10", ProtocolVersion::V1),
    ("11", ProtocolVersion::V2),
    ("12", ProtocolVersion::V3),
    ("13", ProtocolVersion::V7),
    ("cdh4", ProtocolVersion::V1),
    ("cdh5", ProtocolVersion::V5),
];

const SYMBOLIC_VERSIONS: &[ProtocolVersion] = &[
    ProtocolVersion::V1,
    ProtocolVersion::V2,
    ProtocolVersion::V3,
    ProtocolVersion::V4,
    ProtocolVersion::V5,
    ProtocolVersion::V6,
    ProtocolVersion::V7,
];

/// Resolve a version token to a protocol revision.
///
/// Accepts the legacy levels `10`, `11`, `12`, `13`, the distribution names
/// `cdh4` and `cdh5`, and the symbolic levels `v1`..`v7` (also spelled
/// `PROTOCOL_V1`..`PROTOCOL_V7`). Matching ignores case and surrounding spaces.
///
/// # Errors
///
/// Returns `ConnectionError::InvalidVersion` for any other token.
pub fn resolve_protocol_version(token: &str) -> Result<ProtocolVersion, ConnectionError> {
    let normalized = token.trim().to_lowercase();

    if let Some((_, version)) = LEGACY_VERSIONS.iter().find(|(t, _)| *t == normalized) {
        return Ok(*version);
    }

    let symbolic = normalized
        .strip_prefix("protocol_")
        .unwrap_or(&normalized)
        .strip_prefix('v')
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| SYMBOLIC_VERSIONS.get(idx).copied());

    symbolic.ok_or_else(|| ConnectionError::InvalidVersion(token.to_string()))
}
