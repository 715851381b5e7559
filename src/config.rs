/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::source::DEFAULT_TAB_WIDTH;

/// Parser configuration.
///
/// ```
/// use iksxml::ParserConfig;
///
/// let config = ParserConfig::new()
///     .encoding("ISO-8859-9".to_string())
///     .load_external_dtd(false)
///     .tab_width(4);
/// assert_eq!(config.tab_width, 4);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParserConfig {
    /// Distance between tab stops when counting columns.
    ///
    /// Zero counts a tab as a single column. Default is 8.
    pub tab_width: u32,

    /// Encoding to decode the document with, ignoring what the bytes and
    /// the XML declaration say.
    ///
    /// Default is `None`.
    pub encoding: Option<String>,

    /// URL of the document.
    ///
    /// It is reported in errors, and relative SYSTEM identifiers are
    /// resolved against it. Default is `None`.
    pub system_id: Option<String>,

    /// Whether to process namespaces.
    ///
    /// When enabled, element and attribute names are resolved to their
    /// namespace URIs, prefix mappings are reported, and `xmlns` attributes
    /// are not passed as regular attributes. Default is `true`.
    pub namespaces: bool,

    /// Whether to fetch and parse the external DTD subset.
    ///
    /// Default is `true`.
    pub load_external_dtd: bool,

    /// Whether to expand references to external parsed entities in content.
    ///
    /// When disabled, such references produce no text. Default is `true`.
    pub external_entities: bool,

    /// Whether to add declared default attribute values to start tags
    /// which omit them. Default is `true`.
    pub attribute_defaults: bool,

    /// Maximum nesting of entity expansions. Default is 64.
    pub max_entity_depth: usize,
}

impl ParserConfig {
    pub fn new() -> ParserConfig {
        ParserConfig {
            tab_width: DEFAULT_TAB_WIDTH,
            encoding: None,
            system_id: None,
            namespaces: true,
            load_external_dtd: true,
            external_entities: true,
            attribute_defaults: true,
            max_entity_depth: 64,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig::new()
    }
}

gen_setters! { ParserConfig,
    tab_width: val u32,
    encoding: into Option<String>,
    system_id: into Option<String>,
    namespaces: val bool,
    load_external_dtd: val bool,
    external_entities: val bool,
    attribute_defaults: val bool,
    max_entity_depth: val usize
}
