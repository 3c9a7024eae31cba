//! Compose/parse round-trip over every supported entity type.

use proptest::prelude::*;
use ripple::target::qualifier::get_entity_qualificator;
use ripple::target::{get_target, parse_target, EntityType, ParsedTarget};

fn entity_type() -> impl Strategy<Value = EntityType> {
    prop::sample::select(EntityType::ALL.to_vec())
}

fn entity_id() -> impl Strategy<Value = String> {
    // dots are allowed inside braces
    "[A-Za-z0-9_-]{1,8}(\\.[A-Za-z0-9_-]{1,4})?"
}

fn rest_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-zA-Z0-9_]{0,6}|[0-9]{1,2}", 0..5).prop_map(|s| s.join("."))
}

proptest! {
    #[test]
    fn prop_parse_inverts_get_target(kind in entity_type(), id in entity_id(), rest in rest_path()) {
        let target = get_target(kind, &id, &rest);
        match parse_target(&target) {
            ParsedTarget::Entity(parsed) => {
                prop_assert_eq!(parsed.entity, kind.as_str());
                prop_assert_eq!(parsed.id, id.clone());
                prop_assert_eq!(parsed.rest, rest);
            }
            ParsedTarget::NotValid => prop_assert!(false, "{} did not parse", target),
        }
        prop_assert_eq!(
            get_entity_qualificator(&target).unwrap(),
            format!("{}.{}", kind.as_str(), id)
        );
    }

    #[test]
    fn prop_lowercase_entity_is_not_valid(id in entity_id(), rest in rest_path()) {
        let target = get_target(EntityType::Case, &id, &rest).to_lowercase();
        prop_assert_eq!(parse_target(&target), ParsedTarget::NotValid);
    }
}
