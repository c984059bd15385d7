//! Schema definition types.

use modelfuzz_core::{EnumId, PrimitiveKind, PropertyId, TypeId, Value};
use std::collections::{BTreeSet, HashMap};

/// What a property holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyTarget {
    /// A primitive attribute value.
    Primitive(PrimitiveKind),
    /// A literal of an enumeration.
    Enumeration(EnumId),
    /// A reference to a node conforming to the type.
    Node(TypeId),
}

/// Property definition within a type.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// Unique identifier.
    pub id: PropertyId,
    /// Property name.
    pub name: String,
    /// Type that declares this property.
    pub owner: TypeId,
    /// Value domain.
    pub target: PropertyTarget,
    /// Whether this property holds an ordered list of values.
    pub many: bool,
    /// Whether a multi-valued property rejects duplicate values.
    pub unique: bool,
    /// Whether this node-valued property owns its values.
    pub containment: bool,
    /// Whether this node-valued property is the back-reference to the
    /// node's container.
    pub container: bool,
    /// For a container property, the containment property of the parent
    /// type it mirrors.
    pub opposite: Option<PropertyId>,
    /// Whether the property may be written at all.
    pub changeable: bool,
    /// Whether the property is computed from other state.
    pub derived: bool,
    /// Whether a primitive property can represent absence.
    pub nullable: bool,
    /// Declared default value.
    pub default: Option<Value>,
}

impl PropertyDef {
    /// The node type of a node-valued property.
    pub fn node_type(&self) -> Option<TypeId> {
        match self.target {
            PropertyTarget::Node(type_id) => Some(type_id),
            _ => None,
        }
    }

    /// Returns true if this is a multi-valued property that rejects duplicates.
    pub fn is_unique_collection(&self) -> bool {
        self.many && self.unique
    }

    /// Returns true if the value domain is a primitive that cannot
    /// represent absence.
    pub fn is_non_nullable_primitive(&self) -> bool {
        matches!(self.target, PropertyTarget::Primitive(_)) && !self.nullable
    }

    /// The single value this property reads as when it was never written or
    /// was unset.
    pub fn default_value(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match self.target {
            PropertyTarget::Primitive(kind) if !self.nullable => kind.zero(),
            _ => Value::Null,
        }
    }
}

/// Enumeration definition.
#[derive(Debug, Clone)]
pub struct EnumDef {
    /// Unique identifier.
    pub id: EnumId,
    /// Enumeration name.
    pub name: String,
    /// Ordered literal names.
    pub literals: Vec<String>,
}

impl EnumDef {
    /// The value of the literal at `index`.
    pub fn literal(&self, index: usize) -> Option<Value> {
        (index < self.literals.len()).then(|| Value::Literal(self.id, index as u32))
    }
}

/// Node type definition.
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Unique identifier.
    pub id: TypeId,
    /// Type name.
    pub name: String,
    /// Parent type IDs (for inheritance).
    pub parent_ids: Vec<TypeId>,
    /// Properties declared on this type, in declaration order.
    pub properties: Vec<PropertyId>,
    /// Whether this type is abstract (cannot be instantiated directly).
    pub is_abstract: bool,
}

impl TypeDef {
    pub fn new(id: TypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_ids: Vec::new(),
            properties: Vec::new(),
            is_abstract: false,
        }
    }
}

/// Precomputed subtype relationships.
///
/// Sets are ordered so iteration follows type-id order.
#[derive(Debug, Default)]
pub struct SubtypeIndex {
    /// For each type, the set of all its subtypes (transitive).
    subtypes: HashMap<TypeId, BTreeSet<TypeId>>,
    /// For each type, the set of all its supertypes (transitive).
    supertypes: HashMap<TypeId, BTreeSet<TypeId>>,
}

impl SubtypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the subtype index from type definitions.
    pub fn build(types: &[TypeDef]) -> Self {
        let mut index = Self::new();

        for type_def in types {
            index.subtypes.insert(type_def.id, BTreeSet::new());
            index.supertypes.insert(type_def.id, BTreeSet::new());
        }

        // Direct parents first
        for type_def in types {
            for &parent_id in &type_def.parent_ids {
                if let Some(parent_subtypes) = index.subtypes.get_mut(&parent_id) {
                    parent_subtypes.insert(type_def.id);
                }
                if let Some(type_supertypes) = index.supertypes.get_mut(&type_def.id) {
                    type_supertypes.insert(parent_id);
                }
            }
        }

        // Transitively close the relationships
        let mut changed = true;
        while changed {
            changed = false;
            for type_def in types {
                let type_id = type_def.id;
                let supertypes: Vec<TypeId> = index
                    .supertypes
                    .get(&type_id)
                    .map(|s| s.iter().copied().collect())
                    .unwrap_or_default();

                for super_id in supertypes {
                    let transitive: Vec<TypeId> = index
                        .supertypes
                        .get(&super_id)
                        .map(|s| s.iter().copied().collect())
                        .unwrap_or_default();

                    for trans_id in transitive {
                        if let Some(set) = index.supertypes.get_mut(&type_id) {
                            if set.insert(trans_id) {
                                changed = true;
                            }
                        }
                        if let Some(set) = index.subtypes.get_mut(&trans_id) {
                            set.insert(type_id);
                        }
                    }
                }
            }
        }

        index
    }

    /// Check if `sub` is a subtype of `super_type` (reflexive).
    pub fn is_subtype(&self, sub: TypeId, super_type: TypeId) -> bool {
        if sub == super_type {
            return true;
        }
        self.supertypes
            .get(&sub)
            .map(|set| set.contains(&super_type))
            .unwrap_or(false)
    }

    /// Get all subtypes of a type (not including the type itself).
    pub fn get_subtypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.subtypes
            .get(&type_id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Get all supertypes of a type (not including the type itself).
    pub fn get_supertypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.supertypes
            .get(&type_id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(kind: PrimitiveKind, nullable: bool) -> PropertyDef {
        PropertyDef {
            id: PropertyId::new(0),
            name: "attr".into(),
            owner: TypeId::new(0),
            target: PropertyTarget::Primitive(kind),
            many: false,
            unique: false,
            containment: false,
            container: false,
            opposite: None,
            changeable: true,
            derived: false,
            nullable,
            default: None,
        }
    }

    #[test]
    fn test_default_value_of_non_nullable_primitive_is_zero() {
        assert_eq!(attribute(PrimitiveKind::Int, false).default_value(), Value::Int(0));
        assert_eq!(attribute(PrimitiveKind::Int, true).default_value(), Value::Null);
    }

    #[test]
    fn test_explicit_default_wins() {
        let mut prop = attribute(PrimitiveKind::Bool, false);
        prop.default = Some(Value::Bool(true));
        assert_eq!(prop.default_value(), Value::Bool(true));
    }

    #[test]
    fn test_enum_literal_lookup() {
        let def = EnumDef {
            id: EnumId::new(2),
            name: "Status".into(),
            literals: vec!["Draft".into(), "Done".into()],
        };
        assert_eq!(def.literal(1), Some(Value::Literal(EnumId::new(2), 1)));
        assert_eq!(def.literal(2), None);
    }

    #[test]
    fn test_subtype_index_transitive() {
        // GIVEN Entity <- Item <- Book
        let entity = TypeDef::new(TypeId::new(0), "Entity");
        let mut item = TypeDef::new(TypeId::new(1), "Item");
        item.parent_ids.push(entity.id);
        let mut book = TypeDef::new(TypeId::new(2), "Book");
        book.parent_ids.push(item.id);

        // WHEN the index is built
        let index = SubtypeIndex::build(&[entity, item, book]);

        // THEN Book is a transitive subtype of Entity
        assert!(index.is_subtype(TypeId::new(2), TypeId::new(0)));
        assert!(!index.is_subtype(TypeId::new(0), TypeId::new(2)));
        let subs: Vec<TypeId> = index.get_subtypes(TypeId::new(0)).collect();
        assert_eq!(subs, vec![TypeId::new(1), TypeId::new(2)]);
    }
}
