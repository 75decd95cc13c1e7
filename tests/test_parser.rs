use ministache::ast::{
    Comment, Define, Expr, Identifier, Inherit, List, Node, NumberLit, Partial, Section,
    StringLit, Text, Variable,
};
use ministache::{parse, ErrorKind};

use similar_asserts::assert_eq;

fn ident(name: &str) -> Identifier {
    Identifier {
        segments: name.split('.').map(|s| s.to_string()).collect(),
    }
}

fn text(text: &str) -> Node {
    Node::Text(Text {
        text: text.to_string(),
    })
}

fn assert_no_close(node: &Node) {
    assert!(
        !matches!(node, Node::Close(_)),
        "close node survived into the tree"
    );
    if let Some(children) = node.children() {
        for child in children {
            assert_no_close(child);
        }
    }
}

#[test]
fn test_empty() {
    assert_eq!(
        parse("empty", "", "", "").unwrap(),
        Node::List(List { children: vec![] })
    );
}

#[test]
fn test_text_only() {
    assert_eq!(
        parse("spaces", "", "", " \t\n").unwrap(),
        Node::List(List {
            children: vec![text(" \t\n")],
        })
    );
}

#[test]
fn test_variable_with_tail() {
    let root = parse("variable", "", "", r#"((test 1 "two" 3.14))"#).unwrap();
    assert_eq!(
        root,
        Node::List(List {
            children: vec![Node::Variable(Variable {
                head: Expr::Identifier(ident("test")),
                tail: vec![
                    Expr::Number(NumberLit { text: "1".into() }),
                    Expr::String(StringLit { text: "two".into() }),
                    Expr::Number(NumberLit { text: "3.14".into() }),
                ],
            })],
        })
    );
}

#[test]
fn test_dotted_variable() {
    let root = parse("dotted", "", "", "((user.name))").unwrap();
    assert_eq!(
        root,
        Node::List(List {
            children: vec![Node::Variable(Variable {
                head: Expr::Identifier(ident("user.name")),
                tail: vec![],
            })],
        })
    );
}

#[test]
fn test_section() {
    let root = parse("section", "", "", "((#test))x((/test))").unwrap();
    assert_eq!(
        root,
        Node::List(List {
            children: vec![Node::Section(Section {
                head: ident("test"),
                tail: vec![],
                inverted: false,
                children: vec![text("x")],
            })],
        })
    );
    assert_no_close(&root);
}

#[test]
fn test_inverted_section() {
    let root = parse("inverted", "", "", "((^test))((/test))").unwrap();
    assert_eq!(
        root,
        Node::List(List {
            children: vec![Node::Section(Section {
                head: ident("test"),
                tail: vec![],
                inverted: true,
                children: vec![],
            })],
        })
    );
}

#[test]
fn test_section_with_dotted_name() {
    let root = parse("dotted-section", "", "", "((#a.b))x((/a.b))").unwrap();
    assert_no_close(&root);
    match root {
        Node::List(list) => match &list.children[..] {
            [Node::Section(section)] => assert_eq!(section.head.name(), "a.b"),
            tree => panic!("unexpected tree: {tree:?}"),
        },
        tree => panic!("unexpected tree: {tree:?}"),
    }
}

#[test]
fn test_nested_sections() {
    let root = parse("nested", "", "", "((#a))((#b))x((/b))((/a))").unwrap();
    assert_no_close(&root);
}

#[test]
fn test_comment() {
    assert_eq!(
        parse("comment", "", "", "((! comment text))").unwrap(),
        Node::List(List {
            children: vec![Node::Comment(Comment {
                text: " comment text".into(),
            })],
        })
    );
}

#[test]
fn test_partial() {
    assert_eq!(
        parse("partial", "", "", "((>partial))").unwrap(),
        Node::List(List {
            children: vec![Node::Partial(Partial {
                name: "partial".into(),
            })],
        })
    );
}

#[test]
fn test_define() {
    assert_eq!(
        parse("define", "", "", "(($test))x((/test))").unwrap(),
        Node::List(List {
            children: vec![Node::Define(Define {
                name: "test".into(),
                children: vec![text("x")],
            })],
        })
    );
}

#[test]
fn test_inherit_buckets_children() {
    let root = parse("inherit", "", "", "((<base))a(($b))c((/b))((/base))").unwrap();
    assert_no_close(&root);
    let expected = {
        let mut inherit = Inherit {
            name: "base".into(),
            overrides: Default::default(),
        };
        inherit.overrides.insert("default".into(), vec![text("a")]);
        inherit.overrides.insert(
            "b".into(),
            vec![Node::Define(Define {
                name: "b".into(),
                children: vec![text("c")],
            })],
        );
        Node::List(List {
            children: vec![Node::Inherit(inherit)],
        })
    };
    assert_eq!(root, expected);
}

#[test]
fn test_custom_delimiters() {
    let root = parse("delims", "$$", "@@", "a$$x@@b").unwrap();
    assert_eq!(
        root,
        Node::List(List {
            children: vec![
                text("a"),
                Node::Variable(Variable {
                    head: Expr::Identifier(ident("x")),
                    tail: vec![],
                }),
                text("b"),
            ],
        })
    );
}

#[test]
fn test_incorrect_section_head() {
    let err = parse("incorrect-section", "", "", "((^3.14))((/3.14))").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    insta::assert_snapshot!(
        err,
        @"incorrect-section:1:3: expression in section must start with identifier"
    );
}

#[test]
fn test_unclosed_section() {
    let err = parse("unclosed-section", "", "", "((#test))").unwrap_err();
    assert_eq!(
        err.to_string(),
        "unclosed-section:1:9: tag not closed"
    );
}

#[test]
fn test_stray_close_tag() {
    let err = parse("close-tag", "", "", "((/test))").unwrap_err();
    assert_eq!(err.to_string(), "close-tag:1:7: unexpected closing tag");
}

#[test]
fn test_mismatched_close_tag() {
    let err = parse("mismatch", "", "", "((#a))x((/b))").unwrap_err();
    assert_eq!(err.to_string(), "mismatch:1:11: unexpected closing tag");
}

#[test]
fn test_empty_tag() {
    let err = parse("empty-tag", "", "", "(())").unwrap_err();
    assert_eq!(err.to_string(), "empty-tag:1:2: empty tags are not allowed");
}

#[test]
fn test_unrecognized_character() {
    let err = parse("unknown", "", "", "((%test))").unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknown:1:2: unrecognized character in tag: U+0025 '%'"
    );
}

#[test]
fn test_unclosed_tag() {
    let err = parse("unclosed", "", "", "((unclosed").unwrap_err();
    assert_eq!(err.to_string(), "unclosed:1:10: unclosed tag");
}

#[test]
fn test_error_on_later_line() {
    let err = parse("multiline", "", "", "hello\n((#x))").unwrap_err();
    assert_eq!(err.to_string(), "multiline:2:6: tag not closed");
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.column(), Some(6));
    assert_eq!(err.name(), Some("multiline"));
}

#[test]
fn test_string_head_takes_no_tail() {
    let err = parse("string-head", "", "", r#"(("a" "b"))"#).unwrap_err();
    assert_eq!(err.to_string(), "string-head:1:6: unexpected token: b");
}

#[test]
fn test_complex_literal_rejected() {
    let err = parse("complex", "", "", "((1+2i))").unwrap_err();
    assert_eq!(err.to_string(), "complex:1:2: unexpected token: 1+2i");
}

#[test]
fn test_dot_must_be_followed_by_identifier() {
    let err = parse("dot", "", "", "((a.))").unwrap_err();
    assert_eq!(
        err.to_string(),
        "dot:1:4: unrecognized character in identifier: U+0029 ')'"
    );
}

#[test]
fn test_missing_name_after_partial() {
    let err = parse("partial-name", "", "", "((>))").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(
        err.to_string(),
        "partial-name:1:3: expected a delimiter, but got: ))"
    );
}

#[test]
fn test_nesting_depth_limit() {
    let mut source = String::new();
    for _ in 0..200 {
        source.push_str("((#a))");
    }
    source.push('x');
    for _ in 0..200 {
        source.push_str("((/a))");
    }
    let err = parse("deep", "", "", &source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert!(err.to_string().contains("maximum nesting depth"));
}

#[test]
fn test_every_tag_kind_in_one_template() {
    let source = "
((<base))
\t((one \"two\" 3))

\t((#one \"two\" 3 ))
\t\t((self))
\t((/one))

\t((^one \"two\" 3 ))
\t\t((self))
\t((/one))

\t((>one.two.three))

\t((! This is a comment!))
((/base))
";
    let root = parse("kitchen-sink", "", "", source).unwrap();
    assert_no_close(&root);
}

#[test]
fn test_first_error_wins() {
    // The lexer's own message is surfaced, not a parser message about the
    // token that could not be produced.
    let err = parse("lex-error", "", "", "text ((! unterminated").unwrap_err();
    assert_eq!(err.to_string(), "lex-error:1:8: unclosed comment");
}
