/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Namespace scopes.

use crate::error::description;

pub const NS_XMLNS_PREFIX: &str = "xmlns";
pub const NS_XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";
pub const NS_XML_PREFIX: &str = "xml";
pub const NS_XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// Splits a qualified name into prefix and local part.
///
/// Fails for names with more than one colon or with an empty part.
pub(crate) fn split_qname(name: &str) -> Result<(Option<&str>, &str), &'static str> {
    match name.split_once(':') {
        None => Ok((None, name)),
        Some((prefix, local)) => {
            if prefix.is_empty() || local.is_empty() || local.contains(':') {
                Err(description::PREFIX_BAD_QNAME)
            } else {
                Ok((Some(prefix), local))
            }
        }
    }
}

/// Prefix bindings of the open elements.
///
/// Each element gets a frame holding the `(prefix, uri)` pairs it
/// declared, in declaration order. The default namespace uses the empty
/// prefix, and an empty URI means the prefix is not bound.
#[derive(Debug)]
pub(crate) struct NamespaceStack {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceStack {
    pub(crate) fn new() -> Self {
        NamespaceStack {
            frames: vec![vec![(NS_XML_PREFIX.to_string(), NS_XML_URI.to_string())]],
        }
    }

    pub(crate) fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Removes the innermost frame and returns its bindings.
    pub(crate) fn pop_frame(&mut self) -> Vec<(String, String)> {
        if self.frames.len() > 1 {
            self.frames.pop().unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    /// Binds `prefix` in the innermost frame.
    ///
    /// `allow_unbinding` permits an empty URI for a non-empty prefix,
    /// which XML 1.1 documents may use to undeclare it.
    pub(crate) fn declare(
        &mut self,
        prefix: &str,
        uri: &str,
        allow_unbinding: bool,
    ) -> Result<(), &'static str> {
        if prefix == NS_XMLNS_PREFIX {
            return Err(description::PREFIX_RESERVED);
        }
        if prefix == NS_XML_PREFIX {
            if uri != NS_XML_URI {
                return Err(description::PREFIX_RESERVED);
            }
        } else if uri == NS_XML_URI || uri == NS_XMLNS_URI {
            return Err(description::PREFIX_RESERVED);
        }
        if !prefix.is_empty() && uri.is_empty() && !allow_unbinding {
            return Err(description::PREFIX_EMPTY_URI);
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.push((prefix.to_string(), uri.to_string()));
        }
        Ok(())
    }

    /// Finds the URI bound to `prefix`, innermost frame first.
    pub(crate) fn resolve(&self, prefix: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| {
                frame
                    .iter()
                    .rev()
                    .find(|(p, _)| p == prefix)
                    .map(|(_, uri)| uri.as_str())
            })
            .filter(|uri| !uri.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qnames() {
        assert_eq!(split_qname("a"), Ok((None, "a")));
        assert_eq!(split_qname("p:a"), Ok((Some("p"), "a")));
        assert!(split_qname(":a").is_err());
        assert!(split_qname("p:").is_err());
        assert!(split_qname("p:a:b").is_err());
    }

    #[test]
    fn scoping() {
        let mut ns = NamespaceStack::new();
        assert_eq!(ns.resolve("xml"), Some(NS_XML_URI));
        ns.push_frame();
        ns.declare("p", "urn:outer", false).unwrap();
        ns.declare("", "urn:default", false).unwrap();
        ns.push_frame();
        ns.declare("p", "urn:inner", false).unwrap();
        ns.declare("", "", false).unwrap();
        assert_eq!(ns.resolve("p"), Some("urn:inner"));
        assert_eq!(ns.resolve(""), None);
        let popped = ns.pop_frame();
        assert_eq!(popped.len(), 2);
        assert_eq!(ns.resolve("p"), Some("urn:outer"));
        assert_eq!(ns.resolve(""), Some("urn:default"));
        ns.pop_frame();
        assert_eq!(ns.resolve("p"), None);
        assert!(ns.pop_frame().is_empty());
        assert_eq!(ns.resolve("xml"), Some(NS_XML_URI));
    }

    #[test]
    fn reserved() {
        let mut ns = NamespaceStack::new();
        ns.push_frame();
        assert_eq!(ns.declare("xmlns", "urn:x", false), Err(description::PREFIX_RESERVED));
        assert_eq!(ns.declare("xml", "urn:x", false), Err(description::PREFIX_RESERVED));
        assert_eq!(ns.declare("p", NS_XML_URI, false), Err(description::PREFIX_RESERVED));
        assert_eq!(ns.declare("p", "", false), Err(description::PREFIX_EMPTY_URI));
        assert!(ns.declare("p", "", true).is_ok());
        assert!(ns.declare("xml", NS_XML_URI, false).is_ok());
    }
}
