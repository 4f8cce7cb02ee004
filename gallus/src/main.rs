use clap::Parser;
use gallus_core::config::EnvConfig;
use gallus_core::interface::ModuleInterface;
use gallus_core::{compile_source, Environment, Reporter};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Parser)]
#[command(name = "gallus")]
#[command(about = "Compile a purely functional Haskell subset to Gallina", long_about = None)]
struct Cli {
    /// Input source files
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Directory the generated .v and interface files are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Directory of the Base library (contains env.toml and the Coq
    /// sources of Base.Free and Base.Prelude)
    #[arg(long, value_name = "DIR")]
    base_library: Option<PathBuf>,

    /// Do not write a _CoqProject file into the output directory
    #[arg(long)]
    no_coq_project: bool,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Compiler(#[from] gallus_core::error::CompilerError),
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(failures) if failures == 0 => {}
        Ok(_) => std::process::exit(1),
        Err(error) => {
            eprintln!("error: {}", error);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<usize, DriverError> {
    let config = load_config(cli.base_library.as_deref())?;
    let mut base_env = Environment::new();
    config.apply(&mut base_env)?;

    fs::create_dir_all(&cli.output)?;

    let mut generated: Vec<String> = Vec::new();
    let mut failures = 0usize;
    for file in &cli.files {
        match compile_file(file, &mut base_env, &cli.output, cli.verbose) {
            Ok(module_name) => generated.push(module_name),
            Err(_) => failures += 1,
        }
    }

    if !cli.no_coq_project {
        write_coq_project(&cli.output, cli.base_library.as_deref(), &generated)?;
    }

    Ok(failures)
}

fn load_config(base_library: Option<&Path>) -> Result<EnvConfig, DriverError> {
    match base_library {
        Some(dir) => {
            let path = dir.join("env.toml");
            let text = fs::read_to_string(&path)?;
            Ok(EnvConfig::from_toml(&text)?)
        }
        None => Ok(EnvConfig::default_config()?),
    }
}

/// Compile one source file. Diagnostics are rendered to stderr; the
/// compiled module's interface is cached for later files of the same
/// invocation.
fn compile_file(
    file: &Path,
    base_env: &mut Environment,
    output: &Path,
    verbose: bool,
) -> Result<String, DriverError> {
    if verbose {
        info!("compiling {}", file.display());
    }
    let file_name = file.display().to_string();
    let source = match fs::read_to_string(file) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("error: cannot read {}: {}", file_name, error);
            return Err(error.into());
        }
    };

    // Imports may refer to modules compiled by an earlier invocation;
    // load their interfaces from the output directory.
    load_imported_interfaces(&source, base_env, output);

    let mut reporter = Reporter::new();
    let result = compile_source(&source, base_env, &mut reporter);

    match result {
        Ok(converted) => {
            eprint!("{}", reporter.render_all(&file_name, &source));

            let module_name = converted.interface.name.clone();
            let v_path = output.join(format!("{}.v", module_name));
            fs::write(&v_path, converted.render())?;
            let iface_path = output.join(format!("{}.json", module_name));
            fs::write(&iface_path, converted.interface.to_json()?)?;
            if verbose {
                info!("wrote {}", v_path.display());
            }

            base_env.add_interface(converted.interface);
            Ok(module_name)
        }
        Err(error) => {
            reporter.fatal(&error);
            eprint!("{}", reporter.render_all(&file_name, &source));
            Err(error.into())
        }
    }
}

/// Best-effort pre-loading of interfaces for the files the module imports.
/// Unknown modules are reported precisely by the resolver afterwards.
fn load_imported_interfaces(source: &str, base_env: &mut Environment, output: &Path) {
    for line in source.lines() {
        let line = line.trim_start();
        if let Some(rest) = line.strip_prefix("import ") {
            let module_name = rest.trim().trim_end_matches(';').to_string();
            if module_name.is_empty() || base_env.has_module(&module_name) {
                continue;
            }
            let path = output.join(format!("{}.json", module_name));
            if let Ok(text) = fs::read_to_string(&path) {
                if let Ok(interface) = ModuleInterface::from_json(&text) {
                    base_env.add_interface(interface);
                }
            }
        }
    }
}

fn write_coq_project(
    output: &Path,
    base_library: Option<&Path>,
    generated: &[String],
) -> Result<(), DriverError> {
    let base = base_library
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "base".to_string());
    let mut text = format!("-R {} Base\n-R . Generated\n\n", base);
    for module_name in generated {
        text.push_str(&format!("{}.v\n", module_name));
    }
    fs::write(output.join("_CoqProject"), text)?;
    Ok(())
}
