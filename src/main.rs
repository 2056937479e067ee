// src/main.rs
//! Command-line front end: consults a `.pl` file (or stdin) and then drops
//! into a read-eval-print loop, the way the teacher's binary dispatched on
//! file extension and an `--execute`/`-x` flag (`main.rs`), generalized here
//! to a single `.pl`/stdin top level with a `-g Goal` flag for running a
//! directive non-interactively.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use prolog_core::engine::Engine;
use prolog_core::promise::Outcome;
use prolog_core::reader::{self, Reader};
use prolog_core::term::Term;
use prolog_core::writer;

struct Options {
    file: Option<String>,
    goals: Vec<String>,
    quiet: bool,
    no_tty: bool,
}

fn parse_args(args: &[String]) -> Options {
    let mut opts = Options {
        file: None,
        goals: Vec::new(),
        quiet: false,
        no_tty: false,
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-g" | "--goal" => {
                i += 1;
                if let Some(g) = args.get(i) {
                    opts.goals.push(g.clone());
                }
            }
            "-q" | "--quiet" => opts.quiet = true,
            "--no-tty" => opts.no_tty = true,
            other if opts.file.is_none() => opts.file = Some(other.to_string()),
            _ => {}
        }
        i += 1;
    }
    opts
}

/// Consults every clause/directive in `source`, reporting (but not aborting
/// on) syntax or directive errors the way `consult/1` implementations
/// typically do: one bad clause shouldn't block the rest of the file.
fn consult_source(engine: &mut Engine, source: &str, quiet: bool) {
    let mut reader = match Reader::new(source) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("syntax error: {}", e);
            return;
        }
    };
    loop {
        let read = reader.next_term(&engine.operators);
        match read {
            Ok(Some(rt)) => {
                if let Err(e) = engine.consult_term(&rt.term) {
                    eprintln!("error: {}", writer::term_to_string(&e.to_term(), &engine.env, &engine.operators, true));
                }
            }
            Ok(None) => break,
            Err(e) => {
                if !quiet {
                    eprintln!("syntax error: {}", e);
                }
                break;
            }
        }
    }
}

fn run_goal(engine: &mut Engine, text: &str) -> bool {
    let with_dot = if text.trim_end().ends_with('.') {
        text.to_string()
    } else {
        format!("{}.", text)
    };
    let rt = match reader::read_one_term(&with_dot, &engine.operators) {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("syntax error in goal: {}", e);
            return false;
        }
    };
    match engine.solve_once(&rt.term) {
        Outcome::True => true,
        Outcome::False => {
            eprintln!("goal failed: {}", text);
            false
        }
        Outcome::Error(e) => {
            eprintln!(
                "uncaught exception: {}",
                writer::term_to_string(&e.to_term(), &engine.env, &engine.operators, true)
            );
            false
        }
    }
}

fn print_bindings(engine: &Engine, rt: &reader::ReadTerm) {
    let named: Vec<&(String, prolog_core::term::VarId)> = rt
        .variable_names
        .iter()
        .filter(|(name, _)| !name.starts_with('_'))
        .collect();
    if named.is_empty() {
        println!("true.");
        return;
    }
    for (i, (name, id)) in named.iter().enumerate() {
        let value = engine.env.resolve_deep(&Term::Var(*id));
        let rendered = writer::term_to_string(&value, &engine.env, &engine.operators, true);
        print!("{} = {}", name, rendered);
        if i + 1 < named.len() {
            println!(",");
        }
    }
    println!(".");
}

/// The interactive top level: reads one `.`-terminated term at a time from
/// stdin, solves it as a query, and offers further solutions on `;`.
fn repl(engine: &mut Engine) {
    let stdin = io::stdin();
    let mut buffer = String::new();
    loop {
        if buffer.is_empty() {
            print!("?- ");
            io::stdout().flush().ok();
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }
        buffer.push_str(&line);
        if !buffer.trim_end().ends_with('.') {
            continue;
        }
        let source = std::mem::take(&mut buffer);
        let rt = match reader::read_one_term(&source, &engine.operators) {
            Ok(rt) => rt,
            Err(e) => {
                eprintln!("syntax error: {}", e);
                continue;
            }
        };
        let mut solutions = engine.solve(&rt.term);
        loop {
            match solutions.next(engine) {
                Outcome::True => {
                    print_bindings(engine, &rt);
                    print!(" ");
                    io::stdout().flush().ok();
                    let mut more = String::new();
                    if stdin.lock().read_line(&mut more).unwrap_or(0) == 0 {
                        return;
                    }
                    if more.trim() != ";" {
                        break;
                    }
                }
                Outcome::False => {
                    println!("false.");
                    break;
                }
                Outcome::Error(e) => {
                    eprintln!(
                        "uncaught exception: {}",
                        writer::term_to_string(&e.to_term(), &engine.env, &engine.operators, true)
                    );
                    break;
                }
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    let opts = parse_args(&args);

    let mut engine = Engine::with_builtins();

    if let Some(path) = &opts.file {
        match fs::read_to_string(path) {
            Ok(source) => consult_source(&mut engine, &source, opts.quiet),
            Err(e) => {
                eprintln!("cannot read '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        }
    }

    let mut ok = true;
    for goal in &opts.goals {
        ok = run_goal(&mut engine, goal) && ok;
    }

    if opts.no_tty {
        return if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE };
    }

    repl(&mut engine);
    ExitCode::SUCCESS
}
