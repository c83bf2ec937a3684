use clap::Parser;
use color_print::cprintln;

#[derive(Debug, clap::Parser)]
#[clap(author, version, about = "Checker for the mini-C teaching language")]
struct Args {
    /// Input file
    input: String,

    /// Dump the parsed AST
    #[clap(long)]
    dump_ast: bool,

    /// Print the collected type and function tables
    #[clap(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // 1. Read the source text
    let code = match std::fs::read_to_string(&args.input) {
        Ok(code) => code,
        Err(e) => {
            cprintln!("<red,bold>error</>: cannot read {}: {}", args.input, e);
            std::process::exit(1);
        }
    };

    // 2. Tokenize and parse
    let ast = match mcc::syntax::parse(&code) {
        Ok(ast) => ast,
        Err(e) => {
            cprintln!("<red,bold>error</>: {}", e);
            std::process::exit(1);
        }
    };
    if args.dump_ast {
        println!("{ast:#?}");
    }

    // 3. Semantic analysis
    let program = match mcc::sema::check::check(&ast) {
        Ok(program) => program,
        Err(e) => {
            cprintln!("<red,bold>error</>: {}", e);
            std::process::exit(1);
        }
    };

    if args.verbose {
        for def in program.table.structs.values() {
            println!("struct {} ({} bytes)", def.name, program.table.sizeof(&mcc::Type::Struct(def.name.clone())));
            for (fname, fty) in &def.fields {
                println!("  {fname}: {fty}");
            }
        }
        for def in program.table.classes.values() {
            match &def.base {
                Some(base) => println!("class {} extends {}", def.name, base),
                None => println!("class {}", def.name),
            }
            for (fname, fty) in &def.fields {
                println!("  {fname}: {fty}");
            }
            for sig in def.methods.values() {
                println!("  {}() -> {}", sig.name, sig.ret);
            }
        }
        for func in program.funcs.values() {
            println!("fn {}({} args) -> {}", func.name, func.params.len(), func.ret);
        }
    }

    cprintln!("<green,bold>ok</>: {}", args.input);
}
