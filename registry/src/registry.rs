//! The Registry - immutable schema lookup.

use crate::{EnumDef, PropertyDef, SubtypeIndex, TypeDef};
use modelfuzz_core::{EnumId, PropertyId, TypeId};
use std::collections::{HashMap, HashSet};

/// The Registry provides runtime lookup of schema definitions.
/// It is immutable after construction.
///
/// Types, properties and enumerations are stored densely by id, so every
/// iteration follows declaration order.
#[derive(Debug, Default)]
pub struct Registry {
    /// Node type definitions, indexed by `TypeId`.
    types: Vec<TypeDef>,
    /// Node type ID lookup by name.
    type_names: HashMap<String, TypeId>,

    /// Property definitions, indexed by `PropertyId`.
    properties: Vec<PropertyDef>,

    /// Enumeration definitions, indexed by `EnumId`.
    enums: Vec<EnumDef>,

    /// Precomputed subtype relationships.
    subtype_index: SubtypeIndex,
}

impl Registry {
    pub(crate) fn new(
        types: Vec<TypeDef>,
        type_names: HashMap<String, TypeId>,
        properties: Vec<PropertyDef>,
        enums: Vec<EnumDef>,
        subtype_index: SubtypeIndex,
    ) -> Self {
        Self {
            types,
            type_names,
            properties,
            enums,
            subtype_index,
        }
    }

    // ==================== Type Lookups ====================

    /// Get a type definition by name.
    pub fn get_type_by_name(&self, name: &str) -> Option<&TypeDef> {
        self.type_names.get(name).and_then(|id| self.get_type(*id))
    }

    /// Get a type definition by ID.
    pub fn get_type(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.index())
    }

    /// Get a type ID by name.
    pub fn get_type_id(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Name of a type, or a placeholder for unknown ids.
    pub fn type_name(&self, id: TypeId) -> &str {
        self.get_type(id).map(|t| t.name.as_str()).unwrap_or("unknown")
    }

    /// Get all type definitions in declaration order.
    pub fn all_types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.iter()
    }

    // ==================== Property Lookups ====================

    /// Get a property definition by ID.
    pub fn get_property(&self, id: PropertyId) -> Option<&PropertyDef> {
        self.properties.get(id.index())
    }

    /// Name of a property, or a placeholder for unknown ids.
    pub fn property_name(&self, id: PropertyId) -> &str {
        self.get_property(id)
            .map(|p| p.name.as_str())
            .unwrap_or("unknown")
    }

    /// Get a property of a type by name, including inherited properties.
    pub fn get_type_property(&self, type_id: TypeId, name: &str) -> Option<&PropertyDef> {
        self.get_all_type_properties(type_id)
            .into_iter()
            .find(|p| p.name == name)
    }

    /// Check if a property is defined on a type (own or inherited).
    pub fn type_has_property(&self, type_id: TypeId, property: PropertyId) -> bool {
        self.get_property(property)
            .map(|p| self.is_subtype(type_id, p.owner))
            .unwrap_or(false)
    }

    /// Get all properties for a type including inherited ones.
    /// Parent properties come first, each property appears once.
    pub fn get_all_type_properties(&self, type_id: TypeId) -> Vec<&PropertyDef> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();

        self.collect_type_properties(type_id, &mut result, &mut seen);
        result
    }

    fn collect_type_properties<'a>(
        &'a self,
        type_id: TypeId,
        result: &mut Vec<&'a PropertyDef>,
        seen: &mut HashSet<PropertyId>,
    ) {
        if let Some(type_def) = self.get_type(type_id) {
            for &parent_id in &type_def.parent_ids {
                self.collect_type_properties(parent_id, result, seen);
            }
            for &property_id in &type_def.properties {
                if seen.insert(property_id) {
                    if let Some(property) = self.get_property(property_id) {
                        result.push(property);
                    }
                }
            }
        }
    }

    /// Containment properties of a type (own and inherited), in the order
    /// used to traverse the model.
    pub fn containment_properties(&self, type_id: TypeId) -> Vec<&PropertyDef> {
        self.get_all_type_properties(type_id)
            .into_iter()
            .filter(|p| p.containment)
            .collect()
    }

    // ==================== Enumeration Lookups ====================

    /// Get an enumeration by ID.
    pub fn get_enum(&self, id: EnumId) -> Option<&EnumDef> {
        self.enums.get(id.index())
    }

    // ==================== Subtype Queries ====================

    /// Check if `sub` is a subtype of `super_type`.
    pub fn is_subtype(&self, sub: TypeId, super_type: TypeId) -> bool {
        self.subtype_index.is_subtype(sub, super_type)
    }

    /// Get all subtypes of a type (not including the type itself).
    pub fn get_subtypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.subtype_index.get_subtypes(type_id)
    }

    /// Get all supertypes of a type (not including the type itself).
    pub fn get_supertypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.subtype_index.get_supertypes(type_id)
    }
}
