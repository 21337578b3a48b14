pub use crate::{
    build::{run, BuildConfig, BuildOutcome, BuildPlan, FileTask, ProcessResult},
    cache::{Cache, CacheEntry},
    compiler::{compile_file, compile_string, generate, write_dialogue},
    errors::{BuildError, CacheError, CompileError, ParseError, ParseErrorKind},
    parser::{
        ast::{Dialogue, Node, NodeKind, Response, QUIT, START},
        parse_file, parse_string,
    },
};

pub mod build;
pub mod cache;
pub mod compiler;
pub mod errors;
pub mod parser;
