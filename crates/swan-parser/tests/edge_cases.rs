//! Structural invariants, CRLF behaviour, recovery and stress coverage.

use swan_parser::*;

fn walk_nodes<'a>(nodes: &'a [XNode], f: &mut impl FnMut(&'a XNode)) {
    for node in nodes {
        f(node);
        if let XNode::Element(element) = node {
            walk_nodes(&element.children, f);
        }
    }
}

#[test]
fn test_structural_integrity() {
    let source = concat!(
        "<view s-for=\"item, idx in list trackBy item.id\">\n",
        "  <text s-if=\"{{item.ok}}\">{{ item.name }}</text>\n",
        "  <include src=\"./x.swan\"/>\n",
        "</view>\n",
        "<filter>exports.f = function (a) { return a; };</filter>\n"
    );
    let document = parse(source);
    assert!(document.errors.is_empty(), "{:?}", document.errors);

    let len = source.len();
    walk_nodes(&document.children, &mut |node| {
        let span = node.span();
        assert!(u32::from(span.start) <= u32::from(span.end));
        assert!(u32::from(span.end) as usize <= len);

        if let XNode::Element(element) = node {
            assert!(element.span.contains_span(element.start_tag.span));
            if let Some(end_tag) = &element.end_tag {
                assert!(u32::from(element.start_tag.span.end) <= u32::from(end_tag.span.start));
                assert!(element.span.contains_span(end_tag.span));
            }
            for pair in element.children.windows(2) {
                assert!(pair[0].span().end <= pair[1].span().start);
            }
            for attr in &element.start_tag.attributes {
                let attr_span = attr.span();
                assert!(element.start_tag.span.contains_span(attr_span));
                let (key_span, pieces) = match attr {
                    AttributeNode::Plain(a) => (a.key.span, &a.value),
                    AttributeNode::Directive(d) => (d.key.span, &d.value),
                };
                assert!(attr_span.contains_span(key_span));
                for pair in pieces.windows(2) {
                    assert!(pair[0].span().end <= pair[1].span().start);
                }
                for piece in pieces {
                    assert!(attr_span.contains_span(piece.span()));
                }
            }
        }
    });
}

#[test]
fn test_streams_sorted() {
    let source = concat!(
        "<!-- head -->\n",
        "<view s-for=\"item in list trackBy item.id\" style=\"{{a:1}}\">\n",
        "  {{ x /* note */ + y }}\n",
        "</view>"
    );
    let document = parse(source);

    for pair in document.tokens.windows(2) {
        assert!(
            pair[0].span.end <= pair[1].span.start,
            "overlap: {pair:?}"
        );
    }
    for pair in document.comments.windows(2) {
        assert!(pair[0].span.start <= pair[1].span.start);
    }
    for pair in document.errors.windows(2) {
        assert!(pair[0].span.start <= pair[1].span.start);
    }
    assert_eq!(document.comments.len(), 2);
}

#[test]
fn test_crlf_invariance() {
    let lf = "<view s-if=\"{{cond}}\">\n  {{ a + b }}\n</view>\n";
    let crlf = lf.replace('\n', "\r\n");

    let doc_lf = parse(lf);
    let doc_crlf = parse(&crlf);

    assert_eq!(doc_lf.errors.len(), doc_crlf.errors.len());
    assert_eq!(doc_lf.tokens.len(), doc_crlf.tokens.len());
    for (a, b) in doc_lf.tokens.iter().zip(doc_crlf.tokens.iter()) {
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.value, b.value);
        assert_eq!(a.start_loc, b.start_loc);
        assert_eq!(a.end_loc, b.end_loc);
    }
}

#[test]
fn test_expression_location_across_crlf() {
    let source = "{{ a +\r\nb }}";
    let document = parse(source);
    assert!(document.errors.is_empty(), "{:?}", document.errors);

    let b = document
        .tokens
        .iter()
        .find(|t| t.kind == TokenKind::Identifier && t.value == "b")
        .expect("expected identifier token for b");
    // `b` sits at byte 8 of the original source, behind the CRLF gap.
    assert_eq!(b.span, Span::at(8, 9));
    assert_eq!(b.start_loc, LineCol::new(2, 0));
}

#[test]
fn test_token_locations_consistent() {
    let source = "<view s-if=\"{{cond}}\">hello {{ a + b }}</view>";
    let document = parse(source);
    for token in &document.tokens {
        if token.start_loc.line == token.end_loc.line {
            assert_eq!(
                token.end_loc.column - token.start_loc.column,
                token.span.len(),
                "token {token:?}"
            );
        }
    }
}

#[test]
fn test_determinism() {
    let source = "<view s-for=\"item in list\">{{ item }}<filter>var x = 1;</filter></view>";
    let first = parse(source);
    let second = parse(source);
    assert_eq!(first.tokens.len(), second.tokens.len());
    for (a, b) in first.tokens.iter().zip(second.tokens.iter()) {
        assert_eq!(a, b);
    }
    assert_eq!(first.errors.len(), second.errors.len());
}

#[test]
fn test_edge_inputs_do_not_panic() {
    let cases = [
        "",
        "   ",
        "<view>",
        "<view",
        "</view>",
        "</ ",
        "</>",
        "<view attr=",
        "<view attr=\"",
        "<view attr='{{x'>",
        "<view a={{x}}>",
        "{{",
        "{{ a ",
        "{{}}",
        "{{{a}}}",
        "a }} b {{",
        "<!--",
        "<!-->",
        "<!--->",
        "<!doctype html>",
        "<![CDATA[x]]>",
        "<?pi?>",
        "<view s-for=\"in\">",
        "<view s-for=\" in list\">",
        "<view s-for=\"item in\">",
        "<import-sjs>",
        "<import-sjs>not js at {{ all",
        "<textarea>{{x}}</textarea>",
        "<filter>function broken( {</filter>",
        "\u{0}",
        "<view \u{0}=\"1\">",
    ];
    for (i, source) in cases.iter().enumerate() {
        let document = parse(source);
        assert!(
            u32::from(document.span.end) as usize == source.len(),
            "case {i} produced a bad document span"
        );
    }
}

#[test]
fn test_recovered_inputs_report_errors() {
    let cases: &[(&str, ErrorCode)] = &[
        ("<view a=\"1\" a=\"2\">", ErrorCode::DuplicateAttribute),
        ("</view>", ErrorCode::XInvalidEndTag),
        ("{{cond", ErrorCode::MissingExpressionEndTag),
        ("<!-- x", ErrorCode::EofInComment),
        ("<view", ErrorCode::EofInTag),
        ("<view a=\"{{bad syntax here!}}\">", ErrorCode::XExpressionError),
    ];
    for (source, code) in cases {
        let document = parse(source);
        assert!(
            document.errors.iter().any(|e| e.code == *code),
            "expected {code:?} for {source:?}, got {:?}",
            document.errors
        );
    }
}

#[test]
fn test_rawtext_end_tag_rollback_in_tree() {
    // `</filte>` is not the open tag; it must stay part of the module
    // source text.
    let document = parse("<textarea>a</textare>b</textarea>");
    let XNode::Element(element) = &document.children[0] else {
        panic!("expected element");
    };
    let XNode::Text(text) = &element.children[0] else {
        panic!("expected text child");
    };
    assert_eq!(text.value, "a</textare>b");
}

#[test]
fn test_stress_deep_nesting() {
    let mut source = String::new();
    for _ in 0..50 {
        source.push_str("<view>");
    }
    source.push_str("{{ x }}");
    for _ in 0..50 {
        source.push_str("</view>");
    }

    let document = parse(&source);
    assert!(document.errors.is_empty(), "{:?}", document.errors);

    let mut depth = 0;
    let mut node = &document.children[0];
    while let XNode::Element(element) = node {
        depth += 1;
        match element.children.first() {
            Some(child) => node = child,
            None => break,
        }
    }
    assert_eq!(depth, 50);
}

#[test]
fn test_stress_many_siblings() {
    let mut source = String::new();
    for i in 0..100 {
        source.push_str(&format!("<view id=\"{i}\">content</view>"));
    }

    let document = parse(&source);
    assert!(document.errors.is_empty(), "{:?}", document.errors);
    assert_eq!(document.children.len(), 100);
}

#[test]
fn test_left_open_reserved_tag_never_matches() {
    // The reserved left-open set holds only the `_` placeholder, which can
    // never tokenize as a tag name; nothing auto-closes.
    let document = parse("<view><view></view></view>");
    assert!(document.errors.is_empty(), "{:?}", document.errors);
    let XNode::Element(outer) = &document.children[0] else {
        panic!("expected element");
    };
    assert!(matches!(&outer.children[0], XNode::Element(inner) if inner.end_tag.is_some()));
}
