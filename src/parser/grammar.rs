//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::model::FieldKind;
use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse a definition unit into an AST
pub fn parse(input: &str) -> Result<Document, Vec<crate::ParseError>> {
    let len = input.len();

    // Lex up front so that unmatched input is reported rather than skipped
    let tokens = crate::parser::lexer::lex(input)?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Document, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())));

    let value = recursive(|value| {
        // [a, b, c]
        let list = value
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(ValueExpr::List);

        // { key = value, ... }
        let map = identifier
            .clone()
            .then_ignore(just(Token::Equals))
            .then(value.clone())
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(ValueExpr::Map);

        // Numbers (including negative via Minus token)
        let number = just(Token::Minus)
            .or_not()
            .then(select! {
                Token::Integer(n) => ValueExpr::Integer(n),
                Token::Float(f) => ValueExpr::Float(f),
            })
            .map(|(neg, value)| match (neg, value) {
                (Some(_), ValueExpr::Integer(n)) => ValueExpr::Integer(-n),
                (Some(_), ValueExpr::Float(f)) => ValueExpr::Float(-f),
                (_, value) => value,
            });

        // Name or Name.attribute
        let reference = identifier
            .clone()
            .then(just(Token::Dot).ignore_then(identifier.clone()).or_not())
            .map(|(target, attribute)| match attribute {
                Some(attribute) => ValueExpr::Attribute {
                    target: target.node,
                    attribute: attribute.node,
                },
                None => ValueExpr::Name(target.node),
            });

        choice((
            just(Token::Null).to(ValueExpr::Null),
            just(Token::True).to(ValueExpr::Bool(true)),
            just(Token::False).to(ValueExpr::Bool(false)),
            select! { Token::String(s) => ValueExpr::String(s) },
            number,
            list,
            map,
            reference,
        ))
        .map_with(|v, e| Spanned::new(v, span_range(&e.span())))
        .boxed()
    });

    // Optional `: kind` annotation
    let annotation = just(Token::Colon)
        .ignore_then(identifier.clone())
        .try_map(|id, span| {
            id.node
                .as_str()
                .parse::<FieldKind>()
                .map(|kind| Spanned::new(kind, id.span.clone()))
                .map_err(|msg| Rich::custom(span, msg))
        });

    let field = identifier
        .clone()
        .then(annotation.or_not())
        .then_ignore(just(Token::Equals))
        .then(value)
        .then_ignore(just(Token::Comma).or_not())
        .map_with(|((name, annotation), value), e| {
            Spanned::new(
                FieldDecl {
                    name,
                    annotation,
                    value,
                },
                span_range(&e.span()),
            )
        });

    let resource = just(Token::Resource)
        .ignore_then(identifier)
        .then(
            field
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::BraceOpen), just(Token::BraceClose)),
        )
        .map_with(|(name, fields), e| {
            Spanned::new(ResourceDecl { name, fields }, span_range(&e.span()))
        });

    // A unit is a list of resource declarations
    resource
        .repeated()
        .collect()
        .then_ignore(end())
        .map(|resources| Document { resources })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &str) -> ResourceDecl {
        let doc = parse(input).expect("Should parse");
        assert_eq!(doc.resources.len(), 1);
        doc.resources.into_iter().next().map(|r| r.node).expect("one resource")
    }

    #[test]
    fn test_parse_empty_unit() {
        let doc = parse("// nothing\n").expect("Should parse");
        assert!(doc.resources.is_empty());
    }

    #[test]
    fn test_parse_plain_fields() {
        let decl = single(
            r#"
            resource Thing1 {
                name = "thing1-default"
                value = 100
                ratio = -0.5
                enabled = false
                nothing = null
                tags = []
            }
        "#,
        );
        assert_eq!(decl.name.node.as_str(), "Thing1");
        let values: Vec<&ValueExpr> = decl.fields.iter().map(|f| &f.node.value.node).collect();
        assert_eq!(
            values,
            vec![
                &ValueExpr::String("thing1-default".to_string()),
                &ValueExpr::Integer(100),
                &ValueExpr::Float(-0.5),
                &ValueExpr::Bool(false),
                &ValueExpr::Null,
                &ValueExpr::List(vec![]),
            ]
        );
    }

    #[test]
    fn test_parse_references() {
        let decl = single(
            r#"resource Thing2 {
                parent = Thing1
                parent_id = Thing1.Id
            }"#,
        );
        assert_eq!(
            decl.fields[0].node.value.node,
            ValueExpr::Name(Identifier::new("Thing1"))
        );
        assert_eq!(
            decl.fields[1].node.value.node,
            ValueExpr::Attribute {
                target: Identifier::new("Thing1"),
                attribute: Identifier::new("Id"),
            }
        );
    }

    #[test]
    fn test_parse_nested_containers() {
        let decl = single(
            r#"resource Rule {
                rules = [Encryption, { algorithm = "AES256", default = Key.Arn }],
                config = {},
            }"#,
        );
        match &decl.fields[0].node.value.node {
            ValueExpr::List(items) => {
                assert_eq!(items.len(), 2);
                match &items[1].node {
                    ValueExpr::Map(entries) => {
                        assert_eq!(entries.len(), 2);
                        assert_eq!(entries[0].0.node.as_str(), "algorithm");
                    }
                    other => panic!("Expected Map, got {:?}", other),
                }
            }
            other => panic!("Expected List, got {:?}", other),
        }
        assert_eq!(decl.fields[1].node.value.node, ValueExpr::Map(vec![]));
    }

    #[test]
    fn test_parse_annotation() {
        let decl = single("resource T { weight: float = 3 }");
        let field = &decl.fields[0].node;
        assert_eq!(field.annotation.as_ref().map(|a| a.node), Some(FieldKind::Float));
        assert_eq!(field.value.node, ValueExpr::Integer(3));
    }

    #[test]
    fn test_parse_unknown_annotation_is_error() {
        let result = parse("resource T { weight: decimal = 3 }");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_multiple_resources() {
        let doc = parse(
            r#"
            resource A { }
            resource B { a = A }
        "#,
        )
        .expect("Should parse");
        let names: Vec<&str> = doc.resources.iter().map(|r| r.node.name.node.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_parse_missing_value_is_error() {
        let result = parse("resource A { name = }");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_spans_point_at_source() {
        let input = "resource A { parent = B.Id }";
        let decl = single(input);
        let span = decl.fields[0].node.value.span.clone();
        assert_eq!(&input[span], "B.Id");
    }

    #[test]
    fn test_parse_rejects_overflowing_integer() {
        let input = "resource A { sizes = [1, 99999999999999999999] }";
        let errors = parse(input).unwrap_err();
        assert_eq!(errors.len(), 1);
        let crate::ParseError::Syntax { span, message, .. } = &errors[0];
        assert_eq!(&input[span.clone()], "99999999999999999999");
        assert!(message.contains("out of range"));
    }

    #[test]
    fn test_parse_rejects_stray_characters() {
        let input = r#"resource A { name = @ "x" # }"#;
        let errors = parse(input).unwrap_err();
        let found: Vec<&str> = errors
            .iter()
            .map(|e| {
                let crate::ParseError::Syntax { span, .. } = e;
                &input[span.clone()]
            })
            .collect();
        assert_eq!(found, vec!["@", "#"]);
    }
}
