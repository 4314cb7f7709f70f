//! quadc CLI
//!
//! Parses one source file, lowers it to AST and LIR, and on request builds
//! the per-function CFGs in SSA form. Textual dumps go to the selected
//! output (stdout by default); diagnostics go to stderr.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use tree_sitter::Tree;

use quadc::{CfgBuilder, SsaGenerator};

#[derive(ClapParser)]
#[command(name = "quadc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lower source programs to three-address code, CFG, and SSA form", long_about = None)]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Emit the AST pretty-print and per-stage traces
    #[arg(long)]
    verbose: bool,

    /// Emit the LIR statement tables
    #[arg(long)]
    intermedial: bool,

    /// Build the CFG for each function and convert it to SSA form
    #[arg(long)]
    cfg: bool,

    /// Also write the raw CST as a dot file named cst.dot
    #[arg(long = "output-cst")]
    output_cst: bool,

    /// Output file path for textual dumps ("-" means stdout)
    #[arg(short, long, default_value = "-")]
    output: String,
}

fn main() {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {}: {}", cli.input.display(), e);
            process::exit(1);
        }
    };

    let tree = match quadc::parse(&source) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if cli.output_cst
        && let Err(e) = fs::write("cst.dot", cst_to_dot(&tree, &source))
    {
        eprintln!("Error writing cst.dot: {e}");
    }

    let unit = match quadc::build_ast(&source, &tree, cli.verbose) {
        Ok(unit) => unit,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let mut out = open_output(&cli.output);

    if cli.verbose {
        let _ = writeln!(out, "\n======= AST:");
        let _ = write!(out, "{}", unit.pretty_print(""));
    }

    for error in quadc::check_unit(&unit) {
        eprintln!("{error}");
    }

    let builders = quadc::build_lir(&unit);

    if cli.intermedial {
        let _ = writeln!(out, "\n======= IR:");
        let _ = write!(out, "{builders}");
    }

    if cli.cfg {
        for (i, builder) in builders.builders.iter().enumerate() {
            let mut cfg = CfgBuilder::build(builder);
            let mut ssa = SsaGenerator::new();
            ssa.convert_to_ssa(&mut cfg);
            if cli.verbose {
                let _ = writeln!(out, "\n======= CFG for {}:", builder.name());
                let _ = write!(out, "{cfg}");
            }
            let path = format!("cfg{i}.dot");
            if let Err(e) = fs::write(&path, cfg.to_dot()) {
                eprintln!("Error writing {path}: {e}");
            }
        }
    }
}

fn open_output(path: &str) -> Box<dyn Write> {
    if path == "-" {
        return Box::new(io::stdout());
    }
    match fs::File::create(path) {
        Ok(file) => Box::new(file),
        Err(e) => {
            eprintln!("Error creating {path}: {e}; writing to stdout instead");
            Box::new(io::stdout())
        }
    }
}

/// Dot rendering of the raw CST (named nodes only; leaves carry their
/// source text).
fn cst_to_dot(tree: &Tree, source: &str) -> String {
    fn visit(
        node: tree_sitter::Node,
        source: &str,
        out: &mut String,
        counter: &mut usize,
    ) -> usize {
        let id = *counter;
        *counter += 1;
        let label = if node.named_child_count() == 0 {
            let text = source[node.byte_range()]
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', " ");
            format!("{}\\n{}", node.kind(), text)
        } else {
            node.kind().to_string()
        };
        out.push_str(&format!("  n{id} [label=\"{label}\"];\n"));
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                let child_id = visit(child, source, out, counter);
                out.push_str(&format!("  n{id} -> n{child_id};\n"));
            }
        }
        id
    }

    let mut out = String::from("digraph CST {\n  node [shape=box];\n");
    let mut counter = 0;
    visit(tree.root_node(), source, &mut out, &mut counter);
    out.push_str("}\n");
    out
}
