/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::collections::HashMap;
use std::fmt::Display;

use super::content::ContentSpec;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntityKind {
    /// Referenced as `&name;` in content and attribute values.
    General,
    /// Referenced as `%name;` inside the DTD.
    Parameter,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EntityOrigin {
    /// Replacement text given in the declaration.
    Internal(String),
    /// Parsed entity stored in another resource.
    External {
        public_id: Option<String>,
        system_id: String,
    },
    /// Non-XML resource, only usable in ENTITY attributes.
    Unparsed {
        public_id: Option<String>,
        system_id: String,
        notation: String,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub origin: EntityOrigin,
}

impl Entity {
    pub fn internal(name: &str, kind: EntityKind, value: &str) -> Self {
        Entity {
            name: name.to_string(),
            kind,
            origin: EntityOrigin::Internal(value.to_string()),
        }
    }

    pub fn external(name: &str, kind: EntityKind, public_id: Option<&str>, system_id: &str) -> Self {
        Entity {
            name: name.to_string(),
            kind,
            origin: EntityOrigin::External {
                public_id: public_id.map(str::to_string),
                system_id: system_id.to_string(),
            },
        }
    }

    pub fn is_parsed(&self) -> bool {
        !matches!(self.origin, EntityOrigin::Unparsed { .. })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notation {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ElementDecl {
    pub name: String,
    pub content: ContentSpec,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttributeType {
    CData,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    Notation(Vec<String>),
    Enumeration(Vec<String>),
}

impl AttributeType {
    /// Values of every type except CDATA get their spaces collapsed.
    pub fn is_tokenized(&self) -> bool {
        !matches!(self, AttributeType::CData)
    }
}

impl Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeType::CData => f.write_str("CDATA"),
            AttributeType::Id => f.write_str("ID"),
            AttributeType::IdRef => f.write_str("IDREF"),
            AttributeType::IdRefs => f.write_str("IDREFS"),
            AttributeType::Entity => f.write_str("ENTITY"),
            AttributeType::Entities => f.write_str("ENTITIES"),
            AttributeType::NmToken => f.write_str("NMTOKEN"),
            AttributeType::NmTokens => f.write_str("NMTOKENS"),
            AttributeType::Notation(names) => write!(f, "NOTATION ({})", names.join("|")),
            AttributeType::Enumeration(names) => write!(f, "({})", names.join("|")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DefaultKind {
    Required,
    Implied,
    Fixed,
    Value,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeDecl {
    pub element: String,
    pub name: String,
    pub attribute_type: AttributeType,
    pub default_kind: DefaultKind,
    /// Present for [Fixed](DefaultKind::Fixed) and [Value](DefaultKind::Value).
    pub default_value: Option<String>,
}

/// Declarations collected from the DTD of one document.
///
/// Every kind of declaration is keyed by name and the first declaration
/// of a name wins. Adding a duplicate leaves the registry unchanged and
/// returns false.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeclarationRegistry {
    general_entities: HashMap<String, Entity>,
    parameter_entities: HashMap<String, Entity>,
    notations: HashMap<String, Notation>,
    elements: HashMap<String, ElementDecl>,
    attributes: HashMap<(String, String), AttributeDecl>,
    attribute_order: HashMap<String, Vec<String>>,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        DeclarationRegistry::default()
    }

    pub fn is_empty(&self) -> bool {
        self.general_entities.is_empty()
            && self.parameter_entities.is_empty()
            && self.notations.is_empty()
            && self.elements.is_empty()
            && self.attributes.is_empty()
    }

    fn entities_of(&self, kind: EntityKind) -> &HashMap<String, Entity> {
        match kind {
            EntityKind::General => &self.general_entities,
            EntityKind::Parameter => &self.parameter_entities,
        }
    }

    pub fn entity(&self, name: &str, kind: EntityKind) -> Option<&Entity> {
        self.entities_of(kind).get(name)
    }

    pub fn general_entity(&self, name: &str) -> Option<&Entity> {
        self.general_entities.get(name)
    }

    pub fn parameter_entity(&self, name: &str) -> Option<&Entity> {
        self.parameter_entities.get(name)
    }

    pub fn has_entity(&self, name: &str, kind: EntityKind) -> bool {
        self.entities_of(kind).contains_key(name)
    }

    pub fn add_entity(&mut self, entity: Entity) -> bool {
        let map = match entity.kind {
            EntityKind::General => &mut self.general_entities,
            EntityKind::Parameter => &mut self.parameter_entities,
        };
        if map.contains_key(&entity.name) {
            return false;
        }
        map.insert(entity.name.clone(), entity);
        true
    }

    pub fn notation(&self, name: &str) -> Option<&Notation> {
        self.notations.get(name)
    }

    pub fn add_notation(&mut self, notation: Notation) -> bool {
        if self.notations.contains_key(&notation.name) {
            return false;
        }
        self.notations.insert(notation.name.clone(), notation);
        true
    }

    pub fn element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    pub fn add_element(&mut self, element: ElementDecl) -> bool {
        if self.elements.contains_key(&element.name) {
            return false;
        }
        self.elements.insert(element.name.clone(), element);
        true
    }

    pub fn attribute(&self, element: &str, name: &str) -> Option<&AttributeDecl> {
        self.attributes.get(&(element.to_string(), name.to_string()))
    }

    pub fn add_attribute(&mut self, attribute: AttributeDecl) -> bool {
        let key = (attribute.element.clone(), attribute.name.clone());
        if self.attributes.contains_key(&key) {
            return false;
        }
        self.attribute_order
            .entry(attribute.element.clone())
            .or_default()
            .push(attribute.name.clone());
        self.attributes.insert(key, attribute);
        true
    }

    /// Attributes declared for `element`, in declaration order.
    pub fn attributes(&self, element: &str) -> Vec<&AttributeDecl> {
        match self.attribute_order.get(element) {
            None => Vec::new(),
            Some(names) => names
                .iter()
                .filter_map(|name| self.attribute(element, name))
                .collect(),
        }
    }

    /// Names of the attributes declared for `element`, in declaration order.
    pub fn attribute_names(&self, element: &str) -> &[String] {
        self.attribute_order
            .get(element)
            .map(|names| names.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_declaration_wins() {
        let mut registry = DeclarationRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.add_entity(Entity::internal("e", EntityKind::General, "first")));
        assert!(!registry.add_entity(Entity::internal("e", EntityKind::General, "second")));
        assert!(registry.add_entity(Entity::internal("e", EntityKind::Parameter, "pe")));
        assert_eq!(
            registry.general_entity("e").map(|e| &e.origin),
            Some(&EntityOrigin::Internal("first".to_string()))
        );
        assert_eq!(
            registry.parameter_entity("e").map(|e| &e.origin),
            Some(&EntityOrigin::Internal("pe".to_string()))
        );
        assert!(!registry.is_empty());
    }

    #[test]
    fn attribute_order() {
        let mut registry = DeclarationRegistry::new();
        for (name, kind) in [("b", DefaultKind::Implied), ("a", DefaultKind::Required), ("b", DefaultKind::Fixed)] {
            registry.add_attribute(AttributeDecl {
                element: "e".to_string(),
                name: name.to_string(),
                attribute_type: AttributeType::CData,
                default_kind: kind,
                default_value: None,
            });
        }
        assert_eq!(registry.attribute_names("e"), ["b", "a"]);
        assert_eq!(registry.attributes("e")[0].default_kind, DefaultKind::Implied);
        assert!(registry.attribute_names("x").is_empty());
    }

    #[test]
    fn type_display() {
        assert_eq!(AttributeType::IdRefs.to_string(), "IDREFS");
        assert_eq!(
            AttributeType::Notation(vec!["gif".to_string(), "png".to_string()]).to_string(),
            "NOTATION (gif|png)"
        );
        assert_eq!(
            AttributeType::Enumeration(vec!["a".to_string()]).to_string(),
            "(a)"
        );
    }
}
