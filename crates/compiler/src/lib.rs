//! quadc compiler library
//!
//! A front-end lowering an imperative source language through three
//! successive representations:
//!
//! 1. an AST lifted from the parser's concrete syntax tree by a
//!    stack-based post-order walk,
//! 2. a labeled, quadruple-style three-address IR (one statement table per
//!    function),
//! 3. a per-function control-flow graph converted to SSA form via
//!    dominator-based ϕ insertion.
//!
//! The pipeline is single-threaded and write-best-effort: recoverable
//! per-node problems are reported to stderr and lowering continues, so one
//! invocation surfaces as many diagnostics as possible.

pub mod ast;
pub mod ast_builder;
pub mod cfg;
pub mod codegen;
pub mod lir;
pub mod semcheck;
pub mod ssa;
pub mod symbols;

pub use ast::TransUnit;
pub use ast_builder::AstBuilder;
pub use cfg::{BasicBlock, Cfg, CfgBuilder};
pub use codegen::{LirGen, build_lir};
pub use lir::{LlBuilder, LlBuildersList, LlComponent, LlLiteral, LlLocation, LlStmt};
pub use semcheck::check_unit;
pub use ssa::SsaGenerator;
pub use symbols::{ScopeStack, SymbolTable};

use tree_sitter::{Language, Parser, Tree};

/// Parse source text with the external C grammar, yielding the CST.
pub fn parse(source: &str) -> Result<Tree, String> {
    let language: Language = tree_sitter_c::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| format!("Failed to load grammar: {e}"))?;
    parser
        .parse(source, None)
        .ok_or_else(|| "Failed to parse source".to_string())
}

/// Lower a parsed CST to the AST.
pub fn build_ast(source: &str, tree: &Tree, verbose: bool) -> Result<TransUnit, String> {
    let language: Language = tree_sitter_c::LANGUAGE.into();
    let mut builder = AstBuilder::new(source, &language, verbose);
    builder
        .build(tree.root_node())
        .ok_or_else(|| "CST lowering produced no translation unit".to_string())
}

/// Full front half of the pipeline: parse, lower to AST, run the semantic
/// pre-checks (reported to stderr), and generate the per-function LIR.
pub fn compile_to_lir(source: &str) -> Result<LlBuildersList, String> {
    let tree = parse(source)?;
    let unit = build_ast(source, &tree, false)?;
    for error in semcheck::check_unit(&unit) {
        eprintln!("{error}");
    }
    Ok(codegen::build_lir(&unit))
}
