//! Runs one OpenGL lesson in a window.
//!
//! ```text
//! primer-lessons [--log <filter>] list
//! primer-lessons [--log <filter>] <lesson>
//! primer-lessons [--log <filter>] shader-class <vertex.vs> <fragment.fs>
//! ```
//!
//! `--log` takes an `env_logger` filter and overrides `RUST_LOG`. Escape or
//! closing the window ends a lesson.

mod lessons;

use std::path::PathBuf;

use anyhow::{bail, Result};
use primer_engine::logging::{init_logging, LoggingConfig};

use lessons::Lesson;

#[derive(Debug, PartialEq)]
enum Command {
    List,
    Run {
        lesson: Lesson,
        shaders: Option<(PathBuf, PathBuf)>,
    },
}

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Cli {
    command: Command,
    /// Log filter from `--log`.
    log: Option<String>,
}

const USAGE: &str = "usage: primer-lessons [--log <filter>] list | <lesson> [vertex.vs fragment.fs]";

fn parse_cli(args: &[String]) -> Result<Cli> {
    let (log, rest) = match args {
        [flag, filter, rest @ ..] if flag == "--log" => (Some(filter.clone()), rest),
        [flag] if flag == "--log" => bail!("--log needs a filter\n{USAGE}"),
        _ => (None, args),
    };
    Ok(Cli { command: parse_args(rest)?, log })
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args {
        [] => bail!("no lesson given\n{USAGE}"),
        [cmd] if cmd == "list" => Ok(Command::List),
        [name] => Ok(Command::Run {
            lesson: name.parse()?,
            shaders: None,
        }),
        [name, vs, fs] => Ok(Command::Run {
            lesson: name.parse()?,
            shaders: Some((vs.into(), fs.into())),
        }),
        _ => bail!("unexpected arguments\n{USAGE}"),
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&args)?;
    init_logging(cli.log.map(LoggingConfig::with_filter).unwrap_or_default());

    match cli.command {
        Command::List => {
            for lesson in Lesson::ALL {
                println!("{:<18} {}", lesson.name(), lesson.summary());
            }
            Ok(())
        }
        Command::Run { lesson, shaders } => lesson.run(shaders),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn list_is_a_command() {
        assert_eq!(parse_args(&args(&["list"])).unwrap(), Command::List);
    }

    #[test]
    fn lesson_without_paths() {
        assert_eq!(
            parse_args(&args(&["uniform"])).unwrap(),
            Command::Run {
                lesson: Lesson::Uniform,
                shaders: None
            }
        );
    }

    #[test]
    fn lesson_with_shader_paths() {
        let Command::Run { lesson, shaders } = parse_args(&args(&["shader-class", "a.vs", "a.fs"])).unwrap() else {
            panic!("expected a run command");
        };
        assert_eq!(lesson, Lesson::ShaderClass);
        assert_eq!(shaders, Some(("a.vs".into(), "a.fs".into())));
    }

    #[test]
    fn log_flag_sets_the_filter() {
        let cli = parse_cli(&args(&["--log", "primer_engine=debug", "vao"])).unwrap();
        assert_eq!(cli.log.as_deref(), Some("primer_engine=debug"));
        assert_eq!(cli.command, Command::Run { lesson: Lesson::Vao, shaders: None });
    }

    #[test]
    fn log_flag_is_optional_but_needs_a_value() {
        assert_eq!(parse_cli(&args(&["list"])).unwrap().log, None);
        assert!(parse_cli(&args(&["--log"])).is_err());
        assert!(parse_cli(&args(&["--log", "debug"])).unwrap_err().to_string().contains("no lesson"));
    }

    #[test]
    fn empty_and_oversized_argument_lists_fail() {
        assert!(parse_args(&[]).unwrap_err().to_string().contains("usage"));
        assert!(parse_args(&args(&["vao", "a", "b", "c"])).is_err());
        assert!(parse_args(&args(&["vao", "a"])).is_err());
    }
}
