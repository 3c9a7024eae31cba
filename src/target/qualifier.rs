//! Entity qualifiers: the `"<entity>.<id>"` key a caller uses to fetch or lock the
//! record a target lives on.

use crate::error::EngineError;
use crate::target::resolve_target;

/// Qualifier for the entity addressed by `target`
pub fn get_entity_qualificator(target: &str) -> Result<String, EngineError> {
    let parsed = resolve_target(target)?;
    let entity_type = parsed.entity_type()?;
    Ok(format!("{}.{}", entity_type, parsed.id))
}
