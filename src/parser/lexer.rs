use std::str::Lines;

use crate::errors::ParseErrorKind;
use crate::parser::ast::NodeKind;

const COMMENT: &str = ";;";

/// One directive of a script, borrowed from its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'input> {
    Name(&'input str),
    Node {
        kind: NodeKind,
        label: &'input str,
    },
    Text {
        text: &'input str,
        next: &'input str,
    },
    Response {
        text: &'input str,
        next: &'input str,
    },
    Trigger {
        text: &'input str,
        next: &'input str,
        trigger: &'input str,
    },
}

/// A directive along with its one-based line number and raw line.
pub type SpannedDirective<'input> = (usize, Directive<'input>, &'input str);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError<'input> {
    pub line: usize,
    pub raw: &'input str,
    pub kind: ParseErrorKind,
}

/// Splits a script into directives, skipping blank lines and comments.
pub struct Lexer<'input> {
    lines: Lines<'input>,
    line: usize,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Self {
            lines: input.lines(),
            line: 0,
        }
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Result<SpannedDirective<'input>, LexerError<'input>>;

    fn next(&mut self) -> Option<Self::Item> {
        for raw in self.lines.by_ref() {
            self.line += 1;

            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            let result = lex_directive(line)
                .map(|directive| (self.line, directive, raw.trim()))
                .map_err(|kind| LexerError {
                    line: self.line,
                    raw: raw.trim(),
                    kind,
                });
            return Some(result);
        }

        None
    }
}

/// Cuts the line at the first `;;` that is not inside a quoted string.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes && line[i..].starts_with(COMMENT) => return &line[..i],
            _ => {}
        }
    }
    line
}

fn lex_directive(line: &str) -> Result<Directive<'_>, ParseErrorKind> {
    let body = line
        .strip_prefix('(')
        .ok_or(ParseErrorKind::UnrecognizedLine)?;
    let keyword_end = body
        .find(|c: char| c.is_whitespace() || c == ')' || c == '"')
        .unwrap_or(body.len());
    let (keyword, args) = body.split_at(keyword_end);

    match keyword {
        "name" => {
            let mut fields = fields(args);
            let name = fields.next().ok_or(ParseErrorKind::MissingField {
                directive: "name",
                field: "identifier",
            })?;
            Ok(Directive::Name(name))
        }
        "node" => {
            let mut fields = fields(args);
            let tag = fields.next().ok_or(ParseErrorKind::MissingField {
                directive: "node",
                field: "kind",
            })?;
            let label = fields.next().ok_or(ParseErrorKind::MissingField {
                directive: "node",
                field: "label",
            })?;
            let kind = NodeKind::from_tag(tag)
                .ok_or_else(|| ParseErrorKind::UnknownNodeKind(tag.to_string()))?;
            Ok(Directive::Node { kind, label })
        }
        "text" => {
            let (text, rest) = quoted("text", args)?;
            // The successor is whatever comes last after the string.
            let next = fields(rest).last().ok_or(ParseErrorKind::MissingField {
                directive: "text",
                field: "successor label",
            })?;
            Ok(Directive::Text { text, next })
        }
        "resp" => {
            let (text, rest) = quoted("resp", args)?;
            let next = fields(rest).next().ok_or(ParseErrorKind::MissingField {
                directive: "resp",
                field: "successor label",
            })?;
            Ok(Directive::Response { text, next })
        }
        "trig" => {
            let (text, rest) = quoted("trig", args)?;
            let mut fields = fields(rest);
            let next = fields.next().ok_or(ParseErrorKind::MissingField {
                directive: "trig",
                field: "successor label",
            })?;
            let trigger = fields.next().ok_or(ParseErrorKind::MissingField {
                directive: "trig",
                field: "trigger",
            })?;
            Ok(Directive::Trigger {
                text,
                next,
                trigger,
            })
        }
        _ => Err(ParseErrorKind::UnrecognizedLine),
    }
}

/// Whitespace separated fields, ignoring the closing parenthesis.
fn fields(args: &str) -> impl Iterator<Item = &str> {
    args.trim().trim_end_matches(')').split_whitespace()
}

/// The text between the first and last double quote, and everything after it.
fn quoted<'input>(
    directive: &'static str,
    args: &'input str,
) -> Result<(&'input str, &'input str), ParseErrorKind> {
    let missing = ParseErrorKind::MissingField {
        directive,
        field: "quoted text",
    };
    let start = args.find('"').ok_or_else(|| missing.clone())?;
    let end = args.rfind('"').ok_or_else(|| missing.clone())?;
    if end <= start {
        return Err(missing);
    }
    Ok((&args[start + 1..end], &args[end + 1..]))
}
