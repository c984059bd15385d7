//! RegistryBuilder for constructing an immutable Registry.

use crate::{EnumDef, PropertyDef, PropertyTarget, Registry, SubtypeIndex, TypeDef};
use modelfuzz_core::{EnumId, PrimitiveKind, PropertyId, TypeId, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during registry construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate type name: {0}")]
    DuplicateTypeName(String),

    #[error("Duplicate enumeration name: {0}")]
    DuplicateEnumName(String),

    #[error("Enumeration {0} declares no literals")]
    EmptyEnum(String),

    #[error("Unknown parent type: {0}")]
    UnknownParentType(String),

    #[error("Duplicate property {property} on type {type_name}")]
    DuplicateProperty { type_name: String, property: String },

    #[error("Unknown target type {target} for property {property}")]
    UnknownTargetType { property: String, target: String },

    #[error("Unknown enumeration {target} for property {property}")]
    UnknownEnum { property: String, target: String },

    #[error("Property {0} is flagged containment or container but is not node-valued")]
    NotNodeValued(String),

    #[error("Container property {0} must be single-valued")]
    ContainerMustBeSingle(String),

    #[error("Container property {property} names unknown containment {opposite}")]
    UnknownOpposite { property: String, opposite: String },

    #[error("Container property {property} cannot mirror {opposite}: {reason}")]
    InvalidOpposite {
        property: String,
        opposite: String,
        reason: String,
    },
}

/// Declared target of a property, by name until the registry is built.
#[derive(Debug, Clone)]
enum TargetDecl {
    Primitive(PrimitiveKind),
    Enumeration(String),
    Node(String),
}

/// Declaration of a property, resolved against the other declarations
/// when the registry is built.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    name: String,
    target: TargetDecl,
    many: bool,
    unique: bool,
    containment: bool,
    opposite: Option<String>,
    changeable: bool,
    derived: bool,
    nullable: bool,
    default: Option<Value>,
}

impl PropertyDecl {
    fn new(name: impl Into<String>, target: TargetDecl) -> Self {
        Self {
            name: name.into(),
            target,
            many: false,
            unique: false,
            containment: false,
            opposite: None,
            changeable: true,
            derived: false,
            nullable: false,
            default: None,
        }
    }

    /// A primitive attribute.
    pub fn attribute(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::new(name, TargetDecl::Primitive(kind))
    }

    /// An enumeration-valued attribute.
    pub fn enumeration(name: impl Into<String>, enum_name: impl Into<String>) -> Self {
        Self::new(name, TargetDecl::Enumeration(enum_name.into()))
    }

    /// A cross reference to nodes of `type_name`.
    pub fn reference(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, TargetDecl::Node(type_name.into()))
    }

    /// A containment reference owning nodes of `type_name`.
    pub fn containment(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let mut decl = Self::new(name, TargetDecl::Node(type_name.into()));
        decl.containment = true;
        decl
    }

    /// The back-reference to a container of `type_name`, mirroring that
    /// type's containment property `opposite`.
    pub fn container(
        name: impl Into<String>,
        type_name: impl Into<String>,
        opposite: impl Into<String>,
    ) -> Self {
        let mut decl = Self::new(name, TargetDecl::Node(type_name.into()));
        decl.opposite = Some(opposite.into());
        decl
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.changeable = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Builder for constructing an immutable Registry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    /// Types being built, indexed by id.
    types: Vec<TypeDef>,
    /// Type name to ID mapping.
    type_names: HashMap<String, TypeId>,

    /// Property declarations, indexed by the id allocated for them.
    properties: Vec<(TypeId, PropertyDecl)>,

    /// Enumerations being built.
    enums: Vec<EnumDef>,
    /// Enumeration name to ID mapping.
    enum_names: HashMap<String, EnumId>,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type definition.
    pub fn add_type(&mut self, name: impl Into<String>) -> TypeBuilder<'_> {
        TypeBuilder {
            builder: self,
            name: name.into(),
            parent_names: Vec::new(),
            properties: Vec::new(),
            is_abstract: false,
        }
    }

    /// Add an enumeration with its ordered literals.
    pub fn add_enum(
        &mut self,
        name: impl Into<String>,
        literals: &[&str],
    ) -> Result<EnumId, RegistryError> {
        let name = name.into();
        if self.enum_names.contains_key(&name) {
            return Err(RegistryError::DuplicateEnumName(name));
        }
        if literals.is_empty() {
            return Err(RegistryError::EmptyEnum(name));
        }

        let id = EnumId::new(self.enums.len() as u32);
        self.enums.push(EnumDef {
            id,
            name: name.clone(),
            literals: literals.iter().map(|l| l.to_string()).collect(),
        });
        self.enum_names.insert(name, id);
        Ok(id)
    }

    /// Get the id of an already declared type.
    pub fn get_type_id(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Build the immutable Registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let subtype_index = SubtypeIndex::build(&self.types);

        // Resolve targets
        let mut properties = Vec::with_capacity(self.properties.len());
        for (i, (owner, decl)) in self.properties.iter().enumerate() {
            let target = match &decl.target {
                TargetDecl::Primitive(kind) => PropertyTarget::Primitive(*kind),
                TargetDecl::Enumeration(name) => match self.enum_names.get(name) {
                    Some(&id) => PropertyTarget::Enumeration(id),
                    None => {
                        return Err(RegistryError::UnknownEnum {
                            property: decl.name.clone(),
                            target: name.clone(),
                        })
                    }
                },
                TargetDecl::Node(name) => match self.type_names.get(name) {
                    Some(&id) => PropertyTarget::Node(id),
                    None => {
                        return Err(RegistryError::UnknownTargetType {
                            property: decl.name.clone(),
                            target: name.clone(),
                        })
                    }
                },
            };

            let is_container = decl.opposite.is_some();
            if (decl.containment || is_container) && !matches!(target, PropertyTarget::Node(_)) {
                return Err(RegistryError::NotNodeValued(decl.name.clone()));
            }
            if is_container && decl.many {
                return Err(RegistryError::ContainerMustBeSingle(decl.name.clone()));
            }

            properties.push(PropertyDef {
                id: PropertyId::new(i as u32),
                name: decl.name.clone(),
                owner: *owner,
                target,
                many: decl.many,
                // A node occupies at most one position of a containment list
                unique: decl.unique || (decl.containment && decl.many),
                containment: decl.containment,
                container: is_container,
                opposite: None,
                changeable: decl.changeable,
                derived: decl.derived,
                nullable: decl.nullable,
                default: decl.default.clone(),
            });
        }

        // Resolve container opposites now that every property exists
        for (i, (owner, decl)) in self.properties.iter().enumerate() {
            let Some(opposite_name) = &decl.opposite else {
                continue;
            };
            let Some(parent_type) = properties[i].node_type() else {
                continue;
            };

            let opposite = properties
                .iter()
                .find(|p| {
                    p.name == *opposite_name && subtype_index.is_subtype(parent_type, p.owner)
                })
                .ok_or_else(|| RegistryError::UnknownOpposite {
                    property: decl.name.clone(),
                    opposite: opposite_name.clone(),
                })?;

            if !opposite.containment {
                return Err(RegistryError::InvalidOpposite {
                    property: decl.name.clone(),
                    opposite: opposite_name.clone(),
                    reason: "not a containment property".to_string(),
                });
            }
            let accepts_owner = opposite
                .node_type()
                .map(|t| subtype_index.is_subtype(*owner, t))
                .unwrap_or(false);
            if !accepts_owner {
                return Err(RegistryError::InvalidOpposite {
                    property: decl.name.clone(),
                    opposite: opposite_name.clone(),
                    reason: "containment does not accept the owning type".to_string(),
                });
            }

            let opposite_id = opposite.id;
            properties[i].opposite = Some(opposite_id);
        }

        Ok(Registry::new(
            self.types,
            self.type_names,
            properties,
            self.enums,
            subtype_index,
        ))
    }
}

/// Builder for a type definition.
pub struct TypeBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    name: String,
    parent_names: Vec<String>,
    properties: Vec<PropertyDecl>,
    is_abstract: bool,
}

impl<'a> TypeBuilder<'a> {
    /// Add a parent type by name.
    pub fn extends(mut self, parent_name: impl Into<String>) -> Self {
        self.parent_names.push(parent_name.into());
        self
    }

    /// Add a property.
    pub fn property(mut self, decl: PropertyDecl) -> Self {
        self.properties.push(decl);
        self
    }

    /// Mark as abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Finish building this type.
    pub fn done(self) -> Result<TypeId, RegistryError> {
        if self.builder.type_names.contains_key(&self.name) {
            return Err(RegistryError::DuplicateTypeName(self.name));
        }

        let mut parent_ids = Vec::new();
        for parent_name in &self.parent_names {
            match self.builder.type_names.get(parent_name) {
                Some(&parent_id) => parent_ids.push(parent_id),
                None => return Err(RegistryError::UnknownParentType(parent_name.clone())),
            }
        }

        // Property names must be unique across the type and its ancestors
        let mut names: Vec<&str> = Vec::new();
        self.builder.collect_property_names(&parent_ids, &mut names);
        for decl in &self.properties {
            if names.contains(&decl.name.as_str()) {
                return Err(RegistryError::DuplicateProperty {
                    type_name: self.name.clone(),
                    property: decl.name.clone(),
                });
            }
            names.push(&decl.name);
        }

        let id = TypeId::new(self.builder.types.len() as u32);
        let mut type_def = TypeDef::new(id, self.name.clone());
        type_def.parent_ids = parent_ids;
        type_def.is_abstract = self.is_abstract;

        for decl in self.properties {
            let property_id = PropertyId::new(self.builder.properties.len() as u32);
            type_def.properties.push(property_id);
            self.builder.properties.push((id, decl));
        }

        self.builder.type_names.insert(self.name, id);
        self.builder.types.push(type_def);

        Ok(id)
    }
}

impl RegistryBuilder {
    fn collect_property_names<'s>(&'s self, type_ids: &[TypeId], names: &mut Vec<&'s str>) {
        for type_id in type_ids {
            if let Some(type_def) = self.types.get(type_id.index()) {
                self.collect_property_names(&type_def.parent_ids, names);
                for property_id in &type_def.properties {
                    let name = self.properties[property_id.index()].1.name.as_str();
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
    }
}
