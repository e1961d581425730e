use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use gala_core::error::GalaResult;
use gala_core::scripts::{read_script_sections, AutoloadPlan, ScriptAction};
use gala_printing::collection::name_regex;
use gala_utils::{debug, init_logging};

/// Run gdb pretty-printer scripts against a different debugger engine.
#[derive(Parser, Debug)]
#[command(name = "gala")]
#[command(version)]
#[command(about = "Inspect gdb script autoload sections and pretty-printer matchers", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List the scripts a binary's autoload sections would run
    Scripts
    {
        /// Object file to read
        binary: PathBuf,
        /// Directory relative script paths resolve against (default: the binary's directory)
        #[arg(long)]
        base_dir: Option<PathBuf>,
        /// Skip scripts whose name matches this regex at its start (repeatable)
        #[arg(long = "exclude", value_name = "REGEX")]
        exclude: Vec<String>,
    },
    /// Check which type names a name-derived subprinter would match
    Matcher
    {
        /// Subprinter name, e.g. `std::vector`
        name: String,
        /// Type names to test
        #[arg(required = true)]
        type_names: Vec<String>,
    },
}

fn main()
{
    let _logging = match init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    let cli = Cli::parse();
    match run_command(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}

/// Returns `false` when the command ran but found nothing to report.
fn run_command(cli: Cli) -> GalaResult<bool>
{
    match cli.command {
        Commands::Scripts {
            binary,
            base_dir,
            exclude,
        } => {
            let base_dir = base_dir
                .or_else(|| binary.parent().map(PathBuf::from))
                .unwrap_or_default();
            let sections = read_script_sections(&binary)?;
            if sections.is_empty() {
                println!("{}: no script sections", binary.display());
                return Ok(false);
            }

            let mut plan = AutoloadPlan::new(base_dir).with_exclusions(&exclude)?;
            plan.begin_module(&binary.to_string_lossy());
            for section in &sections {
                println!("{} ({} entries)", section.flavor.section_name(), section.entries.len());
                for entry in &section.entries {
                    match entry {
                        Ok(entry) => debug!(name = entry.name(), "section entry"),
                        Err(err) => println!("  malformed: {err}"),
                    }
                }
                for action in plan.plan_section(section) {
                    match action {
                        ScriptAction::RunFile { flavor, name, path } => {
                            println!("  run {flavor} file {name} -> {}", path.display());
                        }
                        ScriptAction::RunInline { file_name, body } => {
                            println!("  run inline {file_name} ({} lines)", body.lines().count());
                        }
                    }
                }
            }
            Ok(true)
        }
        Commands::Matcher { name, type_names } => {
            let regex = name_regex(&name)?;
            println!("pattern: {}", regex.as_str());
            let mut any = false;
            for type_name in &type_names {
                let matched = regex.is_match(type_name);
                any |= matched;
                println!("  {} {type_name}", if matched { "match   " } else { "no match" });
            }
            Ok(any)
        }
    }
}
