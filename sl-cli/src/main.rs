use clap::Parser;
use sl_compiler::backend::interp::Interp;
use sl_compiler::frontend::printer;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "slc")]
#[command(about = "Compiler for the SL expression language")]
struct Args {
    /// Source files; each file is an independent compilation unit
    files: Vec<PathBuf>,

    /// Print the parsed program back as source text
    #[arg(long)]
    ast: bool,

    /// Print the lowered control-flow graph. Default when neither --ast nor
    /// --run is given.
    #[arg(long)]
    cfg: bool,

    /// Execute each unit's init function and print its result
    #[arg(long)]
    run: bool,
}

fn main() {
    let args = Args::parse();

    if args.files.is_empty() {
        eprintln!("No input files");
        std::process::exit(1);
    }

    let mut want_cfg = args.cfg;
    if !args.ast && !args.run && !want_cfg {
        want_cfg = true;
    }

    // Units are independent: one failure must not stop the others.
    let mut failed = false;
    for path in &args.files {
        if let Err(message) = compile_one(path, args.ast, want_cfg, args.run) {
            eprintln!("{}: {}", path.display(), message);
            failed = true;
        }
    }
    if failed {
        std::process::exit(1);
    }
}

fn compile_one(path: &Path, ast: bool, cfg: bool, run: bool) -> Result<(), String> {
    let source = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unit")
        .to_string();

    let parsed = sl_compiler::parse_unit(&source).map_err(|e| e.to_string())?;
    if ast {
        print!("{}", printer::print_unit(&parsed));
    }

    if !cfg && !run {
        return Ok(());
    }

    let mut module = sl_compiler::backend::cfg::Module::new(&name);
    sl_compiler::codegen::lower_unit(&name, &parsed, &mut module).map_err(|e| e.to_string())?;
    if cfg {
        for line in module.to_lines() {
            println!("{}", line);
        }
    }

    if run {
        let result = Interp::new(&module)
            .run(&format!("_{}_init", name), &[])
            .map_err(|e| e.to_string())?;
        println!("{} = {}", name, result);
    }
    Ok(())
}
