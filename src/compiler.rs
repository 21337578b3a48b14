use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::errors::CompileError;
use crate::parser::{
    self,
    ast::{Dialogue, Node, NodeKind, START},
};

/// Writes the macro calls for a dialogue.
///
/// The start node comes first, every other node follows in first-seen order.
pub fn write_dialogue<W: Write>(dialogue: &Dialogue, out: &mut W) -> io::Result<()> {
    writeln!(out, "T_INIT({}, {});", dialogue.name, dialogue.len())?;

    if let Some(start) = dialogue.start() {
        write_node(&dialogue.name, start, out)?;
    }
    for node in dialogue.nodes().filter(|node| node.label != START) {
        write_node(&dialogue.name, node, out)?;
    }

    Ok(())
}

fn write_node<W: Write>(dialogue: &str, node: &Node, out: &mut W) -> io::Result<()> {
    match node.kind {
        NodeKind::Statement => {
            writeln!(
                out,
                "T_STATEMENT({}, {}, \"{}\", {});",
                dialogue, node.label, node.text, node.next
            )?;
        }
        NodeKind::Question => {
            writeln!(
                out,
                "T_QUESTION({}, {}, \"{}\", {});",
                dialogue,
                node.label,
                node.text,
                node.responses.len()
            )?;
            for (i, resp) in node.responses.iter().enumerate() {
                match &resp.trigger {
                    Some(trigger) => writeln!(
                        out,
                        "T_RESPONSE_TRIGGER({}, {}, trigger_{}, \"{}\", {}, cb_trigger_{}, null);",
                        dialogue, node.label, i, resp.text, resp.next, trigger
                    )?,
                    None => writeln!(
                        out,
                        "T_RESPONSE({}, {}, option_{}, \"{}\", {});",
                        dialogue, node.label, i, resp.text, resp.next
                    )?,
                }
            }
        }
    }
    Ok(())
}

/// Generates the artifact text for a dialogue.
pub fn generate(dialogue: &Dialogue) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_dialogue(dialogue, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}

pub fn compile_string(file: &str, src: &str) -> Result<String, CompileError> {
    let dialogue = parser::parse_string(file, src)?;
    Ok(generate(&dialogue))
}

/// Parses `input` and writes its artifact to `output`.
pub fn compile_file(input: &Path, output: &Path) -> Result<(), CompileError> {
    let dialogue = parser::parse_file(input)?;

    let file = File::create(output).map_err(|err| CompileError::io(output, err))?;
    let mut out = BufWriter::new(file);
    write_dialogue(&dialogue, &mut out)
        .and_then(|_| out.flush())
        .map_err(|err| CompileError::io(output, err))
}
