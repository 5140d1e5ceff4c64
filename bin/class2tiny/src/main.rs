use class2tiny::jvm::class_file::ClassFile;
use class2tiny::tiny::{disassemble, disassembly_listing, TinyClass};
use class2tiny::translate::{Converter, Diagnostic, Settings, SymbolTable, TinyClassBytes};

use clap::{value_parser, Arg, ArgAction, Command};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use walkdir::WalkDir;

type Outcome = Result<TinyClassBytes, Vec<Diagnostic>>;

fn main() -> io::Result<()> {
    env_logger::init();

    let matches = Command::new("JVM class to tiny class converter")
        .version("0.1.0")
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Convert JVM class files into compact class images for the tiny VM")
        .arg(
            Arg::new("output")
                .short('o')
                .long("output-directory")
                .value_name("DIRECTORY")
                .value_parser(value_parser!(PathBuf))
                .default_value("out")
                .help("Sets the output directory"),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("N")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("1")
                .help("Number of classes to convert in parallel"),
        )
        .arg(
            Arg::new("eliminate-nops")
                .long("eliminate-nops")
                .action(ArgAction::SetTrue)
                .help("Remove `nop` instructions from method bodies"),
        )
        .arg(
            Arg::new("no-fold-constants")
                .long("no-fold-constants")
                .action(ArgAction::SetTrue)
                .help("Never turn `ldc` of small ints into short immediates"),
        )
        .arg(
            Arg::new("no-line-numbers")
                .long("no-line-numbers")
                .action(ArgAction::SetTrue)
                .help("Leave line number tables out of the output"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Exit with an error if any method could not be converted"),
        )
        .arg(
            Arg::new("disassemble")
                .long("disassemble")
                .action(ArgAction::SetTrue)
                .help("Print the disassembly of every converted method"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Class files, or directories to search for class files")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf)),
        )
        .get_matches();

    let settings = Settings {
        eliminate_nops: matches.get_flag("eliminate-nops"),
        fold_small_constants: !matches.get_flag("no-fold-constants"),
        line_numbers: !matches.get_flag("no-line-numbers"),
    };
    let jobs = matches.get_one::<u32>("jobs").copied().unwrap_or(1) as usize;
    let strict = matches.get_flag("strict");
    let output_path: PathBuf = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("out"));

    // Find all of the class files
    let mut inputs: Vec<PathBuf> = vec![];
    for input_path in matches.get_many::<PathBuf>("INPUT").into_iter().flatten() {
        if input_path.is_file() {
            inputs.push(input_path.clone());
        } else {
            inputs.extend(
                WalkDir::new(input_path)
                    .follow_links(true)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .map(|e| e.into_path())
                    .filter(|e| e.is_file() && is_class_file(e)),
            );
        }
    }
    log::info!("Found {} class files", inputs.len());

    let mut classes: Vec<(PathBuf, Vec<u8>)> = vec![];
    let mut count_unreadable = 0;
    for input in inputs {
        match fs::read(&input) {
            Ok(bytes) => classes.push((input, bytes)),
            Err(err) => {
                log::error!("Failed to read {:?}: {}", input, err);
                count_unreadable += 1;
            }
        }
    }

    // Assign class ids in input order, before any conversion starts
    let symbols = SymbolTable::new();
    let mut class_names: Vec<Option<String>> = vec![];
    for (path, bytes) in &classes {
        let name = ClassFile::parse(bytes).ok().and_then(|class| {
            if let Err(err) = symbols.prepopulate(&class) {
                log::debug!("Could not collect class names of {:?}: {}", path, err);
            }
            class.name().ok().map(str::to_string)
        });
        class_names.push(name);
    }

    let outcomes = convert_all(&classes, &settings, &symbols, jobs);

    fs::create_dir_all(&output_path)?;
    let stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut count_failed = count_unreadable;
    let mut count_partial = 0;
    for (((path, _), class_name), outcome) in classes.iter().zip(class_names).zip(outcomes) {
        let (color, summary, diagnostics) = match &outcome {
            Ok(output) if output.diagnostics.is_empty() => {
                (Color::Green, b"OK".as_ref(), &output.diagnostics[..])
            }
            Ok(output) => {
                count_partial += 1;
                (Color::Yellow, b"PARTIAL".as_ref(), &output.diagnostics[..])
            }
            Err(diagnostics) => {
                count_failed += 1;
                (Color::Red, b"FAILED".as_ref(), &diagnostics[..])
            }
        };

        if let (Ok(output), Some(class_name)) = (&outcome, &class_name) {
            let class_file = output_path.join(format!("{}.tcls", class_name));
            log::debug!("Writing {:?}", class_file);
            if let Some(parent) = class_file.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&class_file, &output.bytes)?;
            if matches.get_flag("disassemble") {
                print_disassembly(class_name, &output.bytes)?;
            }
        }

        // Print out the class result
        let mut s = stdout.lock();
        s.write_all(b" - ")?;
        s.set_color(ColorSpec::new().set_bold(true))?;
        let label = class_name.unwrap_or_else(|| path.to_string_lossy().into_owned());
        s.write_all(label.as_bytes())?;
        s.set_color(ColorSpec::new().set_dimmed(true))?;
        s.write_all(b" [")?;
        s.set_color(ColorSpec::new().set_fg(Some(color)))?;
        s.write_all(summary)?;
        s.set_color(ColorSpec::new().set_dimmed(true))?;
        s.write_all(b"]\n")?;
        for diagnostic in diagnostics {
            writeln!(s, "     {}", diagnostic)?;
        }
        s.reset()?;
    }

    // Symbol table, shared by all classes
    let symbols_file = output_path.join("classes.tsym");
    log::debug!("Writing {:?} ({} classes)", symbols_file, symbols.len());
    let mut writer = BufWriter::new(fs::File::create(&symbols_file)?);
    symbols.serialize(&mut writer)?;
    writer.flush()?;

    // Exit code
    exit(if count_failed > 0 || (strict && count_partial > 0) {
        1
    } else {
        0
    })
}

/// Convert every class, using `jobs` worker threads
///
/// Outcomes are returned in the same order as the classes.
fn convert_all(
    classes: &[(PathBuf, Vec<u8>)],
    settings: &Settings,
    symbols: &SymbolTable,
    jobs: usize,
) -> Vec<Outcome> {
    let converter = Converter::new(settings, symbols);
    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<(usize, Outcome)>> = Mutex::new(Vec::with_capacity(classes.len()));

    std::thread::scope(|scope| {
        for _ in 0..jobs.max(1) {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let (path, bytes) = match classes.get(index) {
                    Some(class) => class,
                    None => break,
                };
                log::debug!("Converting {:?}", path);
                let outcome = converter.convert_class(bytes);
                results
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push((index, outcome));
            });
        }
    });

    let mut results = results
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, outcome)| outcome).collect()
}

fn print_disassembly(class_name: &str, bytes: &[u8]) -> io::Result<()> {
    let class = TinyClass::parse(bytes)?;
    let mut out = io::stdout().lock();
    writeln!(out, "class {}", class_name)?;
    for method in &class.methods {
        let name = class.name(method.name).unwrap_or("?");
        let descriptor = class.name(method.descriptor).unwrap_or("?");
        writeln!(out, "  {}{}", name, descriptor)?;
        match disassemble(&method.code) {
            Ok(records) => write!(out, "{}", disassembly_listing(&records))?,
            Err(err) => writeln!(out, "    <{}>", err)?,
        }
    }
    Ok(())
}

fn is_class_file(path: &Path) -> bool {
    path.extension().map_or(false, |ex| ex == "class")
}
