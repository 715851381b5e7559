/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::*;
use crate::handler::HandlerError;

fn describe_name(name: &QName) -> String {
    match &name.namespace_uri {
        Some(uri) => format!("{{{}}}{}", uri, name.name),
        None => name.name.clone(),
    }
}

/// Records every event as a short string.
#[derive(Default)]
struct Tester {
    events: Vec<String>,
    documents: usize,
    errors: usize,
    abort_on_comment: bool,
}

impl SaxHandler for Tester {
    fn handle_event(&mut self, event: &SaxEvent) -> std::result::Result<(), HandlerError> {
        let text = match event {
            SaxEvent::BeginDocument => {
                self.documents += 1;
                return Ok(());
            }
            SaxEvent::EndDocument => {
                assert_eq!(self.documents, 1);
                return Ok(());
            }
            SaxEvent::BeginElement { name, attributes } => {
                let mut s = format!("<{}", describe_name(name));
                for attr in attributes.iter() {
                    let marker = if attr.specified { "" } else { "*" };
                    s.push_str(&format!(" {}{}='{}'", describe_name(&attr.name), marker, attr.value));
                }
                s.push('>');
                s
            }
            SaxEvent::EndElement { name } => format!("</{}>", name),
            SaxEvent::BeginPrefixMapping { prefix: "", uri } => format!("xmlns={}", uri),
            SaxEvent::BeginPrefixMapping { prefix, uri } => format!("xmlns:{}={}", prefix, uri),
            SaxEvent::EndPrefixMapping { prefix: "" } => "-xmlns".to_string(),
            SaxEvent::EndPrefixMapping { prefix } => format!("-xmlns:{}", prefix),
            SaxEvent::Text(text) => text.to_string(),
            SaxEvent::CDataSection(text) => format!("[CDATA[{}]]", text),
            SaxEvent::Comment(text) => {
                if self.abort_on_comment {
                    return Err(HandlerError::new("no comments please"));
                }
                format!("<!--{}-->", text)
            }
            SaxEvent::ProcessingInstruction { target, data } => format!("<?{} {}?>", target, data),
            SaxEvent::InternalEntityDecl {
                name,
                value,
                parameter: true,
            } => format!("!ENTITY % {} '{}'", name, value),
            SaxEvent::InternalEntityDecl { name, value, .. } => format!("!ENTITY {} '{}'", name, value),
            SaxEvent::ExternalEntityDecl { name, system_id, .. } => format!("!ENTITY {} SYSTEM {}", name, system_id),
            SaxEvent::UnparsedEntityDecl {
                name,
                system_id,
                notation,
                ..
            } => format!("!ENTITY {} SYSTEM {} NDATA {}", name, system_id, notation),
            SaxEvent::NotationDecl(notation) => format!("!NOTATION {}", notation.name),
            SaxEvent::ElementDecl(decl) => format!("!ELEMENT {} {}", decl.name, decl.content),
            SaxEvent::AttributeDecl(decl) => {
                format!("!ATTLIST {} {} {}", decl.element, decl.name, decl.attribute_type)
            }
        };
        self.events.push(text);
        Ok(())
    }

    fn handle_error(&mut self, _error: &XmlError) {
        self.errors += 1;
    }
}

fn parse_with(config: ParserConfig, xml: &str) -> Vec<String> {
    let mut tester = Tester::default();
    let mut parser = XmlParser::new(config);
    if let Err(err) = parser.parse_str(&mut tester, xml) {
        panic!("{:?} failed: {}", xml, err);
    }
    assert_eq!(tester.errors, 0);
    tester.events
}

fn check(xml: &str, expected: &[&str]) {
    assert_eq!(parse_with(ParserConfig::new(), xml), expected);
}

fn parse_error(xml: &str) -> XmlError {
    let mut tester = Tester::default();
    let mut parser = XmlParser::new(ParserConfig::new());
    let err = parser.parse_str(&mut tester, xml).unwrap_err();
    assert_eq!(tester.errors, 1);
    err
}

fn check_error(xml: &str, kind: ErrorKind, line: u32, column: u32) {
    let err = parse_error(xml);
    assert_eq!(err.kind(), kind, "{:?}: {}", xml, err);
    assert_eq!(err.position(), Position::at(line, column), "{:?}: {}", xml, err);
}

#[test]
fn tags() {
    check("<lonely/>", &["<lonely>", "</lonely>"]);

    check("   <lonely/>    ", &["<lonely>", "</lonely>"]);

    check(
        "<?xml version='1.0'?><parent><child/><child/>child</parent>",
        &["<parent>", "<child>", "</child>", "<child>", "</child>", "child", "</parent>"],
    );

    check(
        "<parent  ><empty \t /><b>lala</b \n></parent>",
        &["<parent>", "<empty>", "</empty>", "<b>", "lala", "</b>", "</parent>"],
    );

    check(
        "<mytag abc='123' id=\"XC72\"></mytag>",
        &["<mytag abc='123' id='XC72'>", "</mytag>"],
    );

    check(
        "<a><b x1 ='lala'/><c x2\t= \t'bibi'/></a>",
        &["<a>", "<b x1='lala'>", "</b>", "<c x2='bibi'>", "</c>", "</a>"],
    );

    check(
        "<tag a='12\"34' b=\"123'456\" />",
        &["<tag a='12\"34' b='123'456'>", "</tag>"],
    );

    check(
        "<a><b>john&amp;mary<c><d e='f' g='123456' h='madcat' klm='nop'/></c></b></a>",
        &[
            "<a>",
            "<b>",
            "john&mary",
            "<c>",
            "<d e='f' g='123456' h='madcat' klm='nop'>",
            "</d>",
            "</c>",
            "</b>",
            "</a>",
        ],
    );
}

#[test]
fn comments() {
    check(
        "<item url='http://jabber.org'><!-- little comment -->Jabber Site</item>",
        &[
            "<item url='http://jabber.org'>",
            "<!-- little comment -->",
            "Jabber Site",
            "</item>",
        ],
    );

    check(
        "<index><!-- <item> - tag has no childs --><item name='lala' page='42'/></index>",
        &[
            "<index>",
            "<!-- <item> - tag has no childs -->",
            "<item name='lala' page='42'>",
            "</item>",
            "</index>",
        ],
    );

    check(
        "<!-- comment --> <empty/> <!-- lala -->",
        &["<!-- comment -->", "<empty>", "</empty>", "<!-- lala -->"],
    );
}

#[test]
fn cdatas() {
    check(
        "<ka>1234<![CDATA[ <ka> lala ] ]] ]]] ]]>4321</ka>",
        &["<ka>", "1234", "[CDATA[ <ka> lala ] ]] ]]] ]]", "4321", "</ka>"],
    );

    check("<data><![CDATA[[TEST]]]></data>", &["<data>", "[CDATA[[TEST]]]", "</data>"]);

    check(
        "<a>[[bg:Чингис хан]][[bn:চেঙ্গিজ খান]]</a>",
        &["<a>", "[[bg:Чингис хан]][[bn:চেঙ্গিজ খান]]", "</a>"],
    );
}

#[test]
fn pi() {
    check(
        "<a><?lala bibi ?>bibi<?empty?></a>",
        &["<a>", "<?lala bibi ?>", "bibi", "<?empty ?>", "</a>"],
    );
}

#[test]
fn entities() {
    check(
        "<body>I&apos;m fixing parser&amp;tester for &quot;&lt;&quot; and &quot;&gt;&quot; chars.</body>",
        &["<body>", "I'm fixing parser&tester for \"<\" and \">\" chars.", "</body>"],
    );

    check("<a>&#x3B;&#65;&#x42;&#x3b;</a>", &["<a>", ";AB;", "</a>"]);

    check(
        "<a> &#x90; &#x900; &#x10abc; </a>",
        &["<a>", " \u{90} \u{900} \u{10abc} ", "</a>"],
    );

    // undeclared entities are kept as they are
    check("<a>&lala;</a>", &["<a>", "&lala;", "</a>"]);
}

#[test]
fn attribute_values() {
    check("<a b='a&amp;b &#x42;&#65;'></a>", &["<a b='a&b BA'>", "</a>"]);
    check("<a b='1\t2\n3'/>", &["<a b='1 2 3'>", "</a>"]);
    check("<a b='&#9;'/>", &["<a b='\t'>", "</a>"]);
}

#[test]
fn long_tag() {
    let name = "abc".repeat(500);
    let xml = format!("<{}></{}>", name, name);
    let start = format!("<{}>", name);
    let end = format!("</{}>", name);
    check(&xml, &[&start, &end]);
}

#[test]
fn location() {
    let mut tester = Tester::default();
    let mut parser = XmlParser::new(ParserConfig::new());
    assert!(parser.parse_str(&mut tester, "<a>\n\n </a>").is_ok());
    assert_eq!(tester.events, ["<a>", "\n\n ", "</a>"]);
    assert_eq!(parser.progress().position(), Position::at(3, 6));
    assert_eq!(parser.progress().depth(), 0);

    check_error("<a>\n  <b>\n</a>", ErrorKind::StructuralError, 3, 1);
    check_error("<a>\n\t<b\t/ ></a>", ErrorKind::InvalidCharacter, 2, 17);
}

#[test]
fn session() {
    let mut tester = Tester::default();
    let mut parser = XmlParser::default();
    let xml = "<?xml version='1.1' standalone='yes'?><!DOCTYPE doc [<!ENTITY e 'x'>]><doc/>";
    assert!(parser.parse_str(&mut tester, xml).is_ok());
    let session = parser.session();
    assert_eq!(session.version.as_deref(), Some("1.1"));
    assert_eq!(session.encoding.as_deref(), Some("UTF-8"));
    assert_eq!(session.standalone, Some(true));
    assert_eq!(session.doctype_name.as_deref(), Some("doc"));
    assert!(session.registry.general_entity("e").is_some());
}

#[test]
fn bad_tags() {
    check_error("<a>< b/></a>", ErrorKind::InvalidCharacter, 1, 5);
    check_error("<a><b/ ></a>", ErrorKind::InvalidCharacter, 1, 6);
    check_error("<a></ccc/></a>", ErrorKind::InvalidCharacter, 1, 9);
    check_error("<a><b/><c></c/></a>", ErrorKind::InvalidCharacter, 1, 14);
    check_error("</a>", ErrorKind::StructuralError, 1, 1);
    check_error("<a> </a  b>", ErrorKind::InvalidCharacter, 1, 10);
    check_error("<a></a><b/>", ErrorKind::StructuralError, 1, 8);
    check_error("<a a='1' b></a>", ErrorKind::InvalidCharacter, 1, 11);
    check_error("<a a='1' b=></a>", ErrorKind::InvalidCharacter, 1, 12);
    check_error("<a a='12' b '2'></a>", ErrorKind::InvalidCharacter, 1, 13);
    check_error("<a a='123' b c='5'></a>", ErrorKind::InvalidCharacter, 1, 14);
    check_error("<a a='12'></a b='1'>", ErrorKind::InvalidCharacter, 1, 15);
    check_error("<g><test a='123'/ b='lala'></g>", ErrorKind::InvalidCharacter, 1, 17);
    check_error("<a a='1' b='></a>", ErrorKind::InvalidCharacter, 1, 14);
    check_error("<a> <> </a>", ErrorKind::InvalidCharacter, 1, 6);
    check_error("<a> </> </a>", ErrorKind::InvalidCharacter, 1, 7);
    check_error("<a a='1'b='2'/>", ErrorKind::InvalidCharacter, 1, 9);
    check_error("<a x='1' x='2'/>", ErrorKind::StructuralError, 1, 10);
}

#[test]
fn bad_structure() {
    check_error("<a></b>", ErrorKind::StructuralError, 1, 4);
    check_error("<a><b></b>", ErrorKind::UnexpectedEndOfInput, 1, 11);
    check_error("", ErrorKind::UnexpectedEndOfInput, 1, 1);
    check_error("<!-- only -->", ErrorKind::UnexpectedEndOfInput, 1, 14);
    check_error("<a/><!DOCTYPE a>", ErrorKind::StructuralError, 1, 5);
    check_error("<!DOCTYPE a><!DOCTYPE a><a/>", ErrorKind::StructuralError, 1, 13);

    let err = parse_error("<a>\n<b></c></a>");
    assert!(err.message().contains("</c>"));
    assert!(err.message().contains("<b>"));
    assert!(err.message().contains("line 2, column 1"));
}

#[test]
fn bad_comments() {
    check_error("<e><!-- -- --></e>", ErrorKind::MalformedComment, 1, 4);
    check_error("<ha><!-- <lala> --><!- comment -></ha>", ErrorKind::InvalidCharacter, 1, 20);
    check_error("<!-- c1 --> lala <ha/>", ErrorKind::InvalidCharacter, 1, 13);
    check_error("<!-- c1 --> <ha/> <!-- pika -->c", ErrorKind::InvalidCharacter, 1, 32);
    check_error("<!-- c ---> <ha/>", ErrorKind::MalformedComment, 1, 1);
    check_error("<a><!-- c </a>", ErrorKind::UnexpectedEndOfInput, 1, 4);
}

#[test]
fn bad_pi() {
    check_error("<e/> <?xml >", ErrorKind::MalformedXmlDeclaration, 1, 6);
    check_error("<e/> <?XmL ?>", ErrorKind::MalformedProcessingInstruction, 1, 6);
    check_error("<e/> <?pi", ErrorKind::UnexpectedEndOfInput, 1, 6);
    check_error("<e/> <?pi/data?>", ErrorKind::MalformedProcessingInstruction, 1, 10);
}

#[test]
fn bad_cdatas() {
    check_error("  lala <a></a>", ErrorKind::InvalidCharacter, 1, 3);
    check_error("  <a></a> lala", ErrorKind::InvalidCharacter, 1, 11);
    check_error("<![CDATA[lala]]> <a/>", ErrorKind::MalformedCDataSection, 1, 1);
    check_error("<a> <![DATA[lala]> </a>", ErrorKind::InvalidCharacter, 1, 5);
    check_error("<a> <![CDaTA[lala]> </a>", ErrorKind::InvalidCharacter, 1, 5);
    check_error("<a>x]]>y</a>", ErrorKind::InvalidCharacter, 1, 5);
    check_error("<a>]]]>y</a>", ErrorKind::InvalidCharacter, 1, 5);
    check_error("<a><![CDATA[x]]</a>", ErrorKind::UnexpectedEndOfInput, 1, 4);
}

#[test]
fn bad_entities() {
    check_error("<a>&lala           </a>", ErrorKind::InvalidCharacter, 1, 4);
    check_error("<lol>&lt;<&gt;</lol>", ErrorKind::InvalidCharacter, 1, 11);
    check_error("<a>&#1a;</a>", ErrorKind::MalformedNumber, 1, 4);
    check_error("<a>&#Xaa;</a>", ErrorKind::MalformedNumber, 1, 4);
    check_error("<a>&#xa5g;</a>", ErrorKind::MalformedNumber, 1, 4);
    check_error("<a>&#0;</a>", ErrorKind::MalformedNumber, 1, 4);
    check_error("<a>& b;</a>", ErrorKind::InvalidCharacter, 1, 4);
    check_error("<a b='&#xD800;'/>", ErrorKind::MalformedNumber, 1, 7);
}

#[test]
fn declared_entities() {
    check(
        "<!DOCTYPE a [<!ENTITY e 'x&amp;y'><!ENTITY f '<b>&e;</b>'>]><a>&f;</a>",
        &[
            "!ENTITY e 'x&amp;y'",
            "!ENTITY f '<b>&e;</b>'",
            "<a>",
            "<b>",
            "x&y",
            "</b>",
            "</a>",
        ],
    );

    check(
        "<!DOCTYPE a [<!ENTITY q \"it's\">]><a b='&q;'>&q;</a>",
        &["!ENTITY q 'it's'", "<a b='it's'>", "it's", "</a>"],
    );

    check_error(
        "<!DOCTYPE a [<!ENTITY e '<b>'>]><a>&e;</b></a>",
        ErrorKind::StructuralError,
        1,
        36,
    );
    check_error(
        "<!DOCTYPE a [<!ENTITY e '&e;'>]><a>&e;</a>",
        ErrorKind::StructuralError,
        1,
        36,
    );
    check_error(
        "<!DOCTYPE a [<!ENTITY e '<'>]><a b='&e;'/>",
        ErrorKind::InvalidCharacter,
        1,
        37,
    );

    let err = parse_error("<!DOCTYPE a [<!NOTATION n SYSTEM 'n'><!ENTITY u SYSTEM 'u.bin' NDATA n>]><a>&u;</a>");
    assert_eq!(err.kind(), ErrorKind::StructuralError);
    assert!(err.message().starts_with(description::ENTITY_UNPARSED));

    let err = parse_error("<!DOCTYPE a [<!ENTITY x SYSTEM 'x.ent'>]><a b='&x;'/>");
    assert_eq!(err.kind(), ErrorKind::StructuralError);
}

#[test]
fn external_entities_need_a_resolver() {
    let err = parse_error("<!DOCTYPE a [<!ENTITY x SYSTEM 'x.ent'>]><a>&x;</a>");
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.message().contains(description::RESOLVER_MISSING));

    let config = ParserConfig::new().external_entities(false);
    assert_eq!(
        parse_with(config, "<!DOCTYPE a [<!ENTITY x SYSTEM 'x.ent'>]><a>[&x;]</a>"),
        ["!ENTITY x SYSTEM x.ent", "<a>", "[]", "</a>"]
    );
}

#[test]
fn attribute_defaults() {
    check(
        "<!DOCTYPE a [<!ATTLIST a b CDATA 'x' c NMTOKENS #FIXED ' p  q '>]><a c='  r   s '/>",
        &[
            "!ATTLIST a b CDATA",
            "!ATTLIST a c NMTOKENS",
            "<a c='r s' b*='x'>",
            "</a>",
        ],
    );

    let config = ParserConfig::new().attribute_defaults(false);
    assert_eq!(
        parse_with(config, "<!DOCTYPE a [<!ATTLIST a b CDATA 'x'>]><a/>"),
        ["!ATTLIST a b CDATA", "<a>", "</a>"]
    );
}

#[test]
fn namespaces() {
    check(
        "<a xmlns:p='U'><p:b/></a>",
        &["xmlns:p=U", "<a>", "<{U}p:b>", "</p:b>", "</a>", "-xmlns:p"],
    );

    check(
        "<a xmlns='D' xmlns:q='Q'><b c='1' q:d='2'/></a>",
        &[
            "xmlns=D",
            "xmlns:q=Q",
            "<{D}a>",
            "<{D}b c='1' {Q}q:d='2'>",
            "</b>",
            "</a>",
            "-xmlns:q",
            "-xmlns",
        ],
    );

    check(
        "<xml:a/>",
        &["<{http://www.w3.org/XML/1998/namespace}xml:a>", "</xml:a>"],
    );
    check_error(
        "<x:a xmlns:x='http://www.w3.org/XML/1998/namespace'/>",
        ErrorKind::StructuralError,
        1,
        6,
    );

    // the prefix is out of scope after </a>
    check_error("<r><a xmlns:p='U'/><p:b/></r>", ErrorKind::StructuralError, 1, 20);
    check_error("<a xmlns:p=''/>", ErrorKind::StructuralError, 1, 4);
    check_error("<a b:c:d='1'/>", ErrorKind::StructuralError, 1, 4);
    check_error("<a xmlns:p='U' xmlns:q='U' p:x='1' q:x='2'/>", ErrorKind::StructuralError, 1, 36);

    let config = ParserConfig::new().namespaces(false);
    assert_eq!(
        parse_with(config, "<p:a xmlns:p='U'/>"),
        ["<p:a xmlns:p='U'>", "</p:a>"]
    );
}

#[test]
fn handler_abort() {
    let mut tester = Tester {
        abort_on_comment: true,
        ..Tester::default()
    };
    let mut parser = XmlParser::default();
    let err = parser.parse_str(&mut tester, "<a>x<!-- c --></a>").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerAbort);
    assert_eq!(err.message(), "no comments please");
    assert_eq!(tester.events, ["<a>", "x"]);
    assert_eq!(tester.errors, 1);
}

#[test]
fn token_normalization() {
    assert_eq!(normalize_tokens("  a   b c  "), "a b c");
    assert_eq!(normalize_tokens("   "), "");
}
