// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::hash::{Hash, Hasher};

use crate::osm::{FeatureType, Relation};

/// Values of the `except` tag which exempt general motor traffic from a restriction.
const MOTOR_VEHICLE_EXCEPTIONS: &[&str] = &["motorcar", "motor_vehicle", "vehicle"];

/// A prohibited from-via-to maneuver, as described by a `no_*`
/// [turn restriction](https://wiki.openstreetmap.org/wiki/Relation:restriction).
///
/// The identity of a restriction is the maneuver itself: `id` is ignored by both
/// [PartialEq] and [Hash], so relations describing the same maneuver are the same fact.
#[derive(Debug, Clone, Copy)]
pub struct Restriction {
    /// Absolute value of the relation's identifier, used for reporting only.
    pub id: u64,
    pub from_way: u64,
    pub via_node: u64,
    pub to_way: u64,
}

impl Restriction {
    fn maneuver(&self) -> (u64, u64, u64) {
        (self.from_way, self.via_node, self.to_way)
    }

    /// Checks if a relation is a simple, prohibitory turn restriction applicable to cars.
    ///
    /// Returns `Ok(None)` if the relation is not a turn restriction at all, is an `only_*`
    /// restriction, or has an `except` tag exempting motor vehicles.
    ///
    /// Returns an [InvalidRestriction] if the relation is a candidate restriction,
    /// but its members don't follow the from (way), via (node), to (way) schema.
    /// Every member must have one of these roles. If a role occurs multiple times,
    /// the last member with that role wins.
    pub fn from_relation(r: &Relation) -> Result<Option<Self>, InvalidRestriction> {
        match r.tag("restriction") {
            Some(v) if v.starts_with("no_") => {}
            _ => return Ok(None),
        }

        if let Some(except) = r.tag("except") {
            if MOTOR_VEHICLE_EXCEPTIONS.contains(&except) {
                return Ok(None);
            }
        }

        let mut from_way = None;
        let mut via_node = None;
        let mut to_way = None;

        for m in &r.members {
            let (slot, expected_type) = match m.role.as_str() {
                "from" => (&mut from_way, FeatureType::Way),
                "via" => (&mut via_node, FeatureType::Node),
                "to" => (&mut to_way, FeatureType::Way),
                _ => return Err(InvalidRestriction::UnexpectedRole(m.role.clone())),
            };

            if m.type_ != expected_type {
                return Err(InvalidRestriction::InvalidMemberType(
                    m.role.clone(),
                    m.type_,
                ));
            }

            *slot = Some(m.ref_.unsigned_abs());
        }

        Ok(Some(Self {
            id: r.id.unsigned_abs(),
            from_way: from_way.ok_or(InvalidRestriction::MissingMember("from"))?,
            via_node: via_node.ok_or(InvalidRestriction::MissingMember("via"))?,
            to_way: to_way.ok_or(InvalidRestriction::MissingMember("to"))?,
        }))
    }
}

impl PartialEq for Restriction {
    fn eq(&self, other: &Self) -> bool {
        self.maneuver() == other.maneuver()
    }
}

impl Eq for Restriction {}

impl Hash for Restriction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.maneuver().hash(state);
    }
}

/// Reason for which a candidate turn restriction doesn't follow the simple
/// from (way), via (node), to (way) schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidRestriction {
    UnexpectedRole(String),
    InvalidMemberType(String, FeatureType),
    MissingMember(&'static str),
}

impl std::fmt::Display for InvalidRestriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedRole(role) => write!(f, "unexpected member role {role:?}"),
            Self::InvalidMemberType(role, type_) => {
                write!(f, "member with role {role} can't be of type {type_}")
            }
            Self::MissingMember(role) => write!(f, "missing '{role}' member"),
        }
    }
}

impl std::error::Error for InvalidRestriction {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::RelationMember;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashMap;

    macro_rules! tags {
        {} => { HashMap::default() };
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    macro_rules! member {
        ($type_:ident, $ref_:expr, $role:literal) => {
            RelationMember {
                type_: FeatureType::$type_,
                ref_: $ref_,
                role: $role.to_string(),
            }
        };
    }

    fn relation(tags: HashMap<String, String>, members: Vec<RelationMember>) -> Relation {
        Relation {
            id: 99,
            members,
            tags,
        }
    }

    fn simple_members() -> Vec<RelationMember> {
        vec![
            member!(Way, 7, "from"),
            member!(Node, 5, "via"),
            member!(Way, 10, "to"),
        ]
    }

    fn expected() -> Restriction {
        Restriction {
            id: 99,
            from_way: 7,
            via_node: 5,
            to_way: 10,
        }
    }

    fn hash_of(r: &Restriction) -> u64 {
        let mut h = DefaultHasher::new();
        r.hash(&mut h);
        h.finish()
    }

    #[test]
    fn prohibitory() {
        let r = Restriction::from_relation(&relation(
            tags! {"type": "restriction", "restriction": "no_left_turn"},
            simple_members(),
        ))
        .unwrap()
        .unwrap();

        assert_eq!(r.id, 99);
        assert_eq!(r.from_way, 7);
        assert_eq!(r.via_node, 5);
        assert_eq!(r.to_way, 10);
    }

    #[test]
    fn gates() {
        assert_eq!(
            Restriction::from_relation(&relation(tags! {"type": "restriction"}, simple_members())),
            Ok(None),
        );
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "only_straight_on"},
                simple_members()
            )),
            Ok(None),
        );
        assert_eq!(
            Restriction::from_relation(&relation(tags! {"restriction": "No_u_turn"}, vec![])),
            Ok(None),
        );
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "no_left_turn", "except": "motorcar"},
                simple_members()
            )),
            Ok(None),
        );
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "no_left_turn", "except": "motor_vehicle"},
                simple_members()
            )),
            Ok(None),
        );
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "no_left_turn", "except": "vehicle"},
                simple_members()
            )),
            Ok(None),
        );
    }

    #[test]
    fn other_exceptions() {
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "no_left_turn", "except": "bicycle"},
                simple_members()
            )),
            Ok(Some(expected())),
        );

        // Only exact matches exempt the restriction
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "no_left_turn", "except": "psv;motorcar"},
                simple_members()
            )),
            Ok(Some(expected())),
        );
    }

    #[test]
    fn gates_are_checked_before_members() {
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "only_left_turn"},
                vec![member!(Way, 1, "location_hint")]
            )),
            Ok(None),
        );
    }

    #[test]
    fn unexpected_role() {
        let mut members = simple_members();
        members.push(member!(Node, 3, "location_hint"));

        assert_eq!(
            Restriction::from_relation(&relation(tags! {"restriction": "no_u_turn"}, members)),
            Err(InvalidRestriction::UnexpectedRole("location_hint".to_string())),
        );
    }

    #[test]
    fn via_way() {
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "no_u_turn"},
                vec![
                    member!(Way, 7, "from"),
                    member!(Way, 8, "via"),
                    member!(Way, 10, "to"),
                ]
            )),
            Err(InvalidRestriction::InvalidMemberType(
                "via".to_string(),
                FeatureType::Way
            )),
        );
    }

    #[test]
    fn from_node() {
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "no_u_turn"},
                vec![
                    member!(Node, 7, "from"),
                    member!(Node, 5, "via"),
                    member!(Way, 10, "to"),
                ]
            )),
            Err(InvalidRestriction::InvalidMemberType(
                "from".to_string(),
                FeatureType::Node
            )),
        );
    }

    #[test]
    fn missing_members() {
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "no_u_turn"},
                vec![member!(Way, 7, "from"), member!(Node, 5, "via")]
            )),
            Err(InvalidRestriction::MissingMember("to")),
        );
        assert_eq!(
            Restriction::from_relation(&relation(
                tags! {"restriction": "no_u_turn"},
                vec![member!(Node, 5, "via"), member!(Way, 10, "to")]
            )),
            Err(InvalidRestriction::MissingMember("from")),
        );
        assert_eq!(
            Restriction::from_relation(&relation(tags! {"restriction": "no_u_turn"}, vec![])),
            Err(InvalidRestriction::MissingMember("from")),
        );
    }

    #[test]
    fn last_duplicate_member_wins() {
        let r = Restriction::from_relation(&relation(
            tags! {"restriction": "no_right_turn"},
            vec![
                member!(Way, 1, "from"),
                member!(Node, 2, "via"),
                member!(Way, 7, "from"),
                member!(Way, 3, "to"),
                member!(Node, 5, "via"),
                member!(Way, 10, "to"),
            ],
        ))
        .unwrap()
        .unwrap();

        assert_eq!((r.from_way, r.via_node, r.to_way), (7, 5, 10));
    }

    #[test]
    fn negative_ids() {
        let r = Restriction::from_relation(&Relation {
            id: -99,
            members: vec![
                member!(Way, -7, "from"),
                member!(Node, -5, "via"),
                member!(Way, -10, "to"),
            ],
            tags: tags! {"restriction": "no_left_turn"},
        })
        .unwrap()
        .unwrap();

        assert_eq!(r.id, 99);
        assert_eq!((r.from_way, r.via_node, r.to_way), (7, 5, 10));
    }

    #[test]
    fn identity_ignores_relation_id() {
        let a = expected();
        let b = Restriction { id: 100, ..a };
        let c = Restriction { to_way: 11, ..a };

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);
    }
}
