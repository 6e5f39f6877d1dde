//! Error types for parsing, registration and graph analysis

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Configuration-correctness errors raised by the registry, the dependency
/// analyzer, the orderer and the loader
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    /// Two registrations with the same identity
    #[error("duplicate resource type: {name}")]
    DuplicateName { name: String },

    /// The dependency graph contains a cycle
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// The loader made no progress during a full pass over the pending units
    #[error(
        "unresolvable load order for units [{}] (missing: {})",
        stalled.join(", "),
        missing.join(", ")
    )]
    UnresolvableLoadOrder {
        stalled: Vec<String>,
        missing: Vec<String>,
    },

    /// A reference names a type that was never registered
    #[error("unknown reference to '{name}' from '{referenced_by}'")]
    UnknownReference { name: String, referenced_by: String },

    /// A field override or assignment names a field the type does not declare
    #[error("resource type '{resource}' has no field '{field}'")]
    UnknownField { resource: String, field: String },

    /// A field's default does not match its explicit kind annotation
    #[error("field '{field}' of '{resource}' is declared {declared} but defaults to {found}")]
    FieldKindMismatch {
        resource: String,
        field: String,
        declared: String,
        found: String,
    },
}

impl ResourceError {
    /// Create a duplicate name error
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Create a cyclic dependency error
    pub fn cyclic(cycle: Vec<String>) -> Self {
        Self::CyclicDependency { cycle }
    }

    /// Create an unknown reference error
    pub fn unknown_reference(name: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        Self::UnknownReference {
            name: name.into(),
            referenced_by: referenced_by.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    /// Error for input the lexer could not match
    pub fn invalid_token(text: &str, span: Span) -> Self {
        let message = if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            format!("Integer literal '{}' is out of range", text)
        } else {
            format!("Invalid token '{}'", text)
        };
        ParseError::Syntax {
            span,
            message,
            expected: vec![],
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                let written = Report::build(ReportKind::Error, filename, span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf);
                if written.is_err() {
                    return self.to_string();
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::parser::lexer::Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, crate::parser::lexer::Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::String(s) => format!("string \"{}\"", s),
        Token::Integer(n) => format!("integer {}", n),
        Token::Float(n) => format!("number {}", n),
        Token::Resource => "keyword 'resource'".to_string(),
        Token::True => "keyword 'true'".to_string(),
        Token::False => "keyword 'false'".to_string(),
        Token::Null => "keyword 'null'".to_string(),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Equals => "'='".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Minus => "'-'".to_string(),
        _ => format!("{:?}", tok),
    }
}
