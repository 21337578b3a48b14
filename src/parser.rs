use std::fs;
use std::path::Path;

use log::*;

use crate::errors::{CompileError, ParseError, ParseErrorKind};

pub mod ast;
mod lexer;

use ast::{canonical_label, canonical_node_label, Dialogue, Node, NodeKind, Response};
use lexer::{Directive, Lexer};

/// The node currently receiving `text`, `resp` and `trig` lines.
struct NodeBuilder {
    label: String,
    kind: NodeKind,
    text: Option<String>,
    next: String,
    responses: Vec<Response>,
    /// Where the node was declared, for error reporting.
    line: usize,
    raw: String,
}

impl NodeBuilder {
    fn finish(self, file: &str) -> Result<Node, ParseError> {
        let text = match self.text {
            Some(text) => text,
            None => {
                return Err(ParseError {
                    file: file.to_string(),
                    line: self.line,
                    raw: self.raw,
                    kind: ParseErrorKind::MissingText(self.label),
                })
            }
        };

        match self.kind {
            NodeKind::Statement if !self.responses.is_empty() => {
                warn!(
                    "{}:{}: statement `{}` has responses, they will be ignored",
                    file, self.line, self.label
                );
            }
            NodeKind::Question if !self.next.is_empty() => {
                debug!(
                    "{}:{}: question `{}` has a successor, it will be ignored",
                    file, self.line, self.label
                );
            }
            _ => {}
        }

        Ok(Node {
            label: self.label,
            kind: self.kind,
            text,
            next: self.next,
            responses: self.responses,
        })
    }
}

struct ParserState<'a> {
    file: &'a str,
    name: Option<String>,
    dialogue: Dialogue,
    current: Option<NodeBuilder>,
}

impl<'a> ParserState<'a> {
    fn new(file: &'a str) -> Self {
        Self {
            file,
            name: None,
            dialogue: Dialogue::default(),
            current: None,
        }
    }

    /// Moves the node being built, if any, into the dialogue.
    fn finish_node(&mut self) -> Result<(), ParseError> {
        if let Some(builder) = self.current.take() {
            let node = builder.finish(self.file)?;
            if let Some(old) = self.dialogue.insert(node) {
                debug!("{}: node `{}` redefined", self.file, old.label);
            }
        }
        Ok(())
    }

    fn current_node(
        &mut self,
        directive: &'static str,
        line: usize,
        raw: &str,
    ) -> Result<&mut NodeBuilder, ParseError> {
        let file = self.file;
        self.current.as_mut().ok_or_else(|| ParseError {
            file: file.to_string(),
            line,
            raw: raw.to_string(),
            kind: ParseErrorKind::NoCurrentNode(directive),
        })
    }

    fn apply(&mut self, line: usize, directive: Directive<'_>, raw: &str) -> Result<(), ParseError> {
        match directive {
            Directive::Name(name) => {
                self.name = Some(name.to_string());
            }
            Directive::Node { kind, label } => {
                self.finish_node()?;
                self.current = Some(NodeBuilder {
                    label: canonical_node_label(label).to_string(),
                    kind,
                    text: None,
                    next: String::new(),
                    responses: Vec::new(),
                    line,
                    raw: raw.to_string(),
                });
            }
            Directive::Text { text, next } => {
                let node = self.current_node("text", line, raw)?;
                node.text = Some(text.to_string());
                node.next = canonical_label(next).to_string();
            }
            Directive::Response { text, next } => {
                let node = self.current_node("resp", line, raw)?;
                node.responses.push(Response {
                    text: text.to_string(),
                    next: canonical_label(next).to_string(),
                    trigger: None,
                });
            }
            Directive::Trigger {
                text,
                next,
                trigger,
            } => {
                let node = self.current_node("trig", line, raw)?;
                node.responses.push(Response {
                    text: text.to_string(),
                    next: canonical_label(next).to_string(),
                    trigger: Some(trigger.to_string()),
                });
            }
        }
        Ok(())
    }

    fn finish(mut self, default_name: &str) -> Result<Dialogue, ParseError> {
        self.finish_node()?;
        let mut dialogue = self.dialogue;
        dialogue.name = self.name.unwrap_or_else(|| default_name.to_string());
        Ok(dialogue)
    }
}

/// Parses script source.
///
/// `file` names the script in errors and doubles as the dialogue name when the
/// script has no `(name ...)` directive.
pub fn parse_string(file: &str, src: &str) -> Result<Dialogue, ParseError> {
    parse(file, file, src)
}

/// Reads and parses a script file. The file stem is the fallback dialogue name.
pub fn parse_file(path: &Path) -> Result<Dialogue, CompileError> {
    let src = fs::read_to_string(path).map_err(|err| CompileError::io(path, err))?;
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();

    Ok(parse(&path.display().to_string(), &stem, &src)?)
}

fn parse(file: &str, default_name: &str, src: &str) -> Result<Dialogue, ParseError> {
    let mut state = ParserState::new(file);
    for res in Lexer::new(src) {
        let (line, directive, raw) = res.map_err(|err| ParseError {
            file: file.to_string(),
            line: err.line,
            raw: err.raw.to_string(),
            kind: err.kind,
        })?;
        state.apply(line, directive, raw)?;
    }
    state.finish(default_name)
}
