/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::error::description;

/// Pseudo-attributes of an XML declaration or a text declaration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct XmlDeclaration {
    pub version: Option<String>,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// A declaration syntax problem, with the scalar offset it was found at.
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct DeclarationError {
    pub(crate) offset: usize,
    pub(crate) description: &'static str,
}

fn fail<T>(offset: usize, description: &'static str) -> Result<T, DeclarationError> {
    Err(DeclarationError {
        offset,
        description,
    })
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_encoding_name(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => (),
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Parses `<?xml ... ?>`.
///
/// Pseudo-attributes are accepted in any order but each only once. A text
/// declaration (at the start of an external entity) must carry an encoding
/// and cannot say standalone; a document declaration must carry a version.
pub(crate) fn parse_declaration(
    text: &str,
    is_text_declaration: bool,
) -> Result<XmlDeclaration, DeclarationError> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < 5 || chars[0] != '<' || chars[1] != '?' || chars[2..5] != ['x', 'm', 'l'] {
        return fail(0, description::XML_DECL_BAD_START);
    }
    let mut decl = XmlDeclaration::default();
    let mut i = 5;
    loop {
        let ws_start = i;
        while i < chars.len() && is_space(chars[i]) {
            i += 1;
        }
        if i + 1 < chars.len() && chars[i] == '?' && chars[i + 1] == '>' {
            if i + 2 != chars.len() {
                return fail(i + 2, description::XML_DECL_NO_END);
            }
            break;
        }
        if i >= chars.len() {
            return fail(i, description::XML_DECL_NO_END);
        }
        if i == ws_start {
            return fail(i, description::WHITESPACE_EXPECTED);
        }

        let name_start = i;
        while i < chars.len() && chars[i].is_ascii_alphabetic() {
            i += 1;
        }
        let name: String = chars[name_start..i].iter().collect();
        while i < chars.len() && is_space(chars[i]) {
            i += 1;
        }
        if i >= chars.len() || chars[i] != '=' {
            if name.is_empty() {
                return fail(name_start, description::XML_DECL_NO_END);
            }
            return fail(i, description::EQ_EXPECTED);
        }
        i += 1;
        while i < chars.len() && is_space(chars[i]) {
            i += 1;
        }
        let quote = match chars.get(i) {
            Some(&q) if q == '"' || q == '\'' => q,
            _ => return fail(i, description::QUOTE_EXPECTED),
        };
        i += 1;
        let value_start = i;
        while i < chars.len() && chars[i] != quote {
            i += 1;
        }
        if i >= chars.len() {
            return fail(value_start - 1, description::EOF_IN_LITERAL);
        }
        let value: String = chars[value_start..i].iter().collect();
        i += 1;

        match name.as_str() {
            "version" => {
                if decl.version.is_some() {
                    return fail(name_start, description::XML_DECL_DUPLICATE);
                }
                if value != "1.0" && value != "1.1" {
                    return fail(value_start, description::XML_DECL_BAD_VERSION);
                }
                decl.version = Some(value);
            }
            "encoding" => {
                if decl.encoding.is_some() {
                    return fail(name_start, description::XML_DECL_DUPLICATE);
                }
                if !is_encoding_name(&value) {
                    return fail(value_start, description::XML_DECL_BAD_ENCODING);
                }
                decl.encoding = Some(value);
            }
            "standalone" => {
                if is_text_declaration {
                    return fail(name_start, description::TEXT_DECL_STANDALONE);
                }
                if decl.standalone.is_some() {
                    return fail(name_start, description::XML_DECL_DUPLICATE);
                }
                decl.standalone = match value.as_str() {
                    "yes" => Some(true),
                    "no" => Some(false),
                    _ => return fail(value_start, description::XML_DECL_BAD_STANDALONE),
                };
            }
            _ => return fail(name_start, description::XML_DECL_UNKNOWN),
        }
    }

    if is_text_declaration {
        if decl.encoding.is_none() {
            return fail(0, description::TEXT_DECL_NO_ENCODING);
        }
    } else if decl.version.is_none() {
        return fail(0, description::XML_DECL_NO_VERSION);
    }
    Ok(decl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(version: Option<&str>, encoding: Option<&str>, standalone: Option<bool>) -> XmlDeclaration {
        XmlDeclaration {
            version: version.map(str::to_string),
            encoding: encoding.map(str::to_string),
            standalone,
        }
    }

    #[test]
    fn document_declarations() {
        assert_eq!(
            parse_declaration("<?xml version='1.0'?>", false),
            Ok(decl(Some("1.0"), None, None))
        );
        assert_eq!(
            parse_declaration("<?xml version=\"1.1\" encoding=\"UTF-8\" standalone='yes' ?>", false),
            Ok(decl(Some("1.1"), Some("UTF-8"), Some(true)))
        );
        assert_eq!(
            parse_declaration("<?xml standalone = 'no'\n version = '1.0'?>", false),
            Ok(decl(Some("1.0"), None, Some(false)))
        );
    }

    #[test]
    fn text_declarations() {
        assert_eq!(
            parse_declaration("<?xml encoding='ISO-8859-1'?>", true),
            Ok(decl(None, Some("ISO-8859-1"), None))
        );
        assert_eq!(
            parse_declaration("<?xml version='1.0' encoding='utf-16'?>", true),
            Ok(decl(Some("1.0"), Some("utf-16"), None))
        );
        assert_eq!(
            parse_declaration("<?xml version='1.0'?>", true).unwrap_err().description,
            description::TEXT_DECL_NO_ENCODING
        );
        assert_eq!(
            parse_declaration("<?xml encoding='a' standalone='no'?>", true).unwrap_err().description,
            description::TEXT_DECL_STANDALONE
        );
    }

    #[test]
    fn bad_declarations() {
        let err = parse_declaration("<?xml version='1.0' version='1.0'?>", false).unwrap_err();
        assert_eq!(err.description, description::XML_DECL_DUPLICATE);
        assert_eq!(err.offset, 20);

        let err = parse_declaration("<?xml version='2.0'?>", false).unwrap_err();
        assert_eq!(err.description, description::XML_DECL_BAD_VERSION);
        assert_eq!(err.offset, 15);

        assert_eq!(
            parse_declaration("<?xml encoding='UTF-8'?>", false).unwrap_err().description,
            description::XML_DECL_NO_VERSION
        );
        assert_eq!(
            parse_declaration("<?xml version='1.0'encoding='UTF-8'?>", false).unwrap_err().description,
            description::WHITESPACE_EXPECTED
        );
        assert_eq!(
            parse_declaration("<?xml version='1.0' lang='en'?>", false).unwrap_err().description,
            description::XML_DECL_UNKNOWN
        );
        assert_eq!(
            parse_declaration("<?xml version='1.0' standalone='maybe'?>", false).unwrap_err().description,
            description::XML_DECL_BAD_STANDALONE
        );
        assert_eq!(
            parse_declaration("<?xml version='1.0' encoding='8bit'?>", false).unwrap_err().description,
            description::XML_DECL_BAD_ENCODING
        );
        assert_eq!(
            parse_declaration("<?xml version='1.0 ?>", false).unwrap_err().description,
            description::EOF_IN_LITERAL
        );
    }
}
