//! Hard-coded security gate.
//!
//! These checks run before any policy lookup and cannot be approved around:
//! a stored rule for `bash` or `sed -i` never helps. Everything here is a
//! pure function of the segment.

use crate::command::CommandSegment;

use super::sed::check_sed;

/// Fragment every shell-reinvocation denial carries.
pub const SHELL_INVOCATION_DENIED: &str = "shell invocation not allowed";

/// Shells that can run an arbitrary command string.
pub const SHELLS: &[&str] = &["bash", "sh", "zsh", "ksh", "dash", "fish"];

/// Wrapper programs are unwrapped at most this many times.
const MAX_UNWRAP_DEPTH: usize = 8;

/// Result of running the gate over one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// No hard-coded rule applies; policy lookup decides.
    Pass,
    /// Refused outright, with a human-readable reason.
    Deny(String),
}

impl GateOutcome {
    pub fn is_denied(&self) -> bool {
        matches!(self, GateOutcome::Deny(_))
    }
}

/// Run every hard-coded check against a segment.
pub fn check_segment(segment: &CommandSegment) -> GateOutcome {
    check_invocation(&segment.program, &segment.args, 0)
}

fn check_invocation(program: &str, args: &[String], depth: usize) -> GateOutcome {
    if depth > MAX_UNWRAP_DEPTH {
        return GateOutcome::Deny("too many nested command wrappers".to_string());
    }

    let name = program_name(program);
    if name.is_empty() {
        return GateOutcome::Deny("empty command".to_string());
    }

    if SHELLS.contains(&name) {
        return check_shell(name, args);
    }

    if let Some(spec) = wrapper(name) {
        return match unwrap_wrapper(name, &spec, args) {
            Unwrapped::Runs(..) if spec.via_shell && !watch_exec_mode(args) => {
                shell_denied(format!("'{name}' runs its command through sh -c"))
            }
            Unwrapped::Runs(inner, rest) => check_invocation(inner, rest, depth + 1),
            Unwrapped::Shell(flag) => shell_denied(format!("'{name} {flag}' starts a shell")),
            Unwrapped::Nothing => GateOutcome::Pass,
        };
    }

    match name {
        "eval" | "source" | "." => shell_denied(format!("'{name}' runs its input as shell code")),
        "env" => match unwrap_env(args) {
            Ok(Some((inner, rest))) => check_invocation(&inner, &rest, depth + 1),
            Ok(None) => GateOutcome::Pass,
            Err(reason) => GateOutcome::Deny(reason),
        },
        "su" | "script" => shell_denied(format!("'{name}' starts a shell")),
        "find" => check_find(args, depth),
        "sed" | "gsed" => check_sed(args),
        _ => GateOutcome::Pass,
    }
}

/// Strip any directory from the program so `/bin/bash` is treated as `bash`.
fn program_name(program: &str) -> &str {
    program.rsplit('/').next().unwrap_or(program)
}

fn shell_denied(detail: String) -> GateOutcome {
    GateOutcome::Deny(format!("{SHELL_INVOCATION_DENIED}: {detail}"))
}

/// A shell is only let through when it is asked for its version or help.
fn check_shell(shell: &str, args: &[String]) -> GateOutcome {
    if !args.is_empty() && args.iter().all(|a| a == "--version" || a == "--help") {
        return GateOutcome::Pass;
    }

    let runs_string = args.iter().any(|arg| {
        arg == "--command"
            || (arg.starts_with('-') && !arg.starts_with("--") && arg[1..].contains('c'))
    });
    if runs_string {
        return shell_denied(format!("'{shell} -c' runs an arbitrary command string"));
    }

    match args.iter().find(|a| !a.starts_with('-') && !a.starts_with('+')) {
        Some(script) => shell_denied(format!("'{shell} {script}' runs a script file")),
        None => shell_denied(format!("'{shell}' would read commands from stdin")),
    }
}

/// Find the program `env` would run.
///
/// Returns `Ok(None)` when `env` only prints the environment, and an error
/// when an option is not understood.
fn unwrap_env(args: &[String]) -> Result<Option<(String, Vec<String>)>, String> {
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();

        if arg == "--" {
            i += 1;
            break;
        }

        match arg {
            "-" | "-i" | "--ignore-environment" | "-0" | "--null" | "-v" | "--debug" => {
                i += 1;
                continue;
            }
            "-u" | "--unset" | "-C" | "--chdir" => {
                i += 2;
                continue;
            }
            "-S" | "--split-string" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| "env -S requires an argument".to_string())?;
                return split_env_string(value, &args[i + 2..]);
            }
            _ => {}
        }

        if let Some(value) = arg.strip_prefix("--split-string=") {
            return split_env_string(value, &args[i + 1..]);
        }
        if let Some(value) = arg.strip_prefix("-S") {
            return split_env_string(value, &args[i + 1..]);
        }
        if arg.starts_with("--unset=") || arg.starts_with("--chdir=") {
            i += 1;
            continue;
        }
        if arg.starts_with('-') {
            return Err(format!("unsupported env option '{arg}'"));
        }
        if is_assignment(arg) {
            i += 1;
            continue;
        }

        return Ok(Some((arg.to_string(), args[i + 1..].to_vec())));
    }

    Ok(args
        .get(i)
        .map(|program| (program.clone(), args[i + 1..].to_vec())))
}

/// `env -S "bash -c ..."` splits its argument into further env arguments.
fn split_env_string(
    value: &str,
    rest: &[String],
) -> Result<Option<(String, Vec<String>)>, String> {
    let mut words =
        shlex::split(value).ok_or_else(|| "could not parse env -S argument".to_string())?;
    words.extend(rest.iter().cloned());
    unwrap_env(&words)
}

fn is_assignment(arg: &str) -> bool {
    match arg.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// How a wrapper program locates the command it runs.
struct Wrapper {
    /// Options that consume the following argument.
    value_flags: &'static [&'static str],
    /// Positional arguments before the command (`timeout DURATION cmd`).
    positionals: usize,
    /// Options that make the wrapper start a shell instead.
    shell_flags: &'static [&'static str],
    /// `NAME=value` arguments may precede the command.
    assignments: bool,
    /// The command is handed to `sh -c` unless exec mode is requested.
    via_shell: bool,
}

impl Wrapper {
    const fn new(value_flags: &'static [&'static str], positionals: usize) -> Self {
        Self {
            value_flags,
            positionals,
            shell_flags: &[],
            assignments: false,
            via_shell: false,
        }
    }
}

/// Programs that run another program named in their arguments.
fn wrapper(name: &str) -> Option<Wrapper> {
    let spec = match name {
        "command" | "nohup" | "setsid" | "busybox" => Wrapper::new(&[], 0),
        "exec" => Wrapper::new(&["-a"], 0),
        "nice" => Wrapper::new(&["-n", "--adjustment"], 0),
        "time" => Wrapper::new(&["-o", "--output", "-f", "--format"], 0),
        "timeout" => Wrapper::new(&["-s", "--signal", "-k", "--kill-after"], 1),
        "stdbuf" => Wrapper::new(&["-i", "-o", "-e", "--input", "--output", "--error"], 0),
        "chrt" | "taskset" => Wrapper::new(&[], 1),
        "ionice" => Wrapper::new(
            &["-c", "--class", "-n", "--classdata", "-p", "--pid", "-P", "--pgid", "-u", "--uid"],
            0,
        ),
        "strace" => Wrapper::new(
            &["-o", "-e", "-p", "-s", "-u", "-E", "-P", "-a", "-b", "-I", "-O", "-S", "-X"],
            0,
        ),
        "xargs" => Wrapper::new(
            &[
                "-I",
                "-L",
                "-n",
                "-P",
                "-s",
                "-d",
                "-E",
                "-a",
                "--arg-file",
                "--delimiter",
                "--max-args",
                "--max-procs",
                "--max-chars",
                "--max-lines",
                "--process-slot-var",
            ],
            0,
        ),
        "sudo" => Wrapper {
            shell_flags: &["-s", "--shell", "-i", "--login"],
            assignments: true,
            ..Wrapper::new(
                &[
                    "-u",
                    "--user",
                    "-g",
                    "--group",
                    "-h",
                    "--host",
                    "-p",
                    "--prompt",
                    "-C",
                    "--close-from",
                    "-D",
                    "--chdir",
                    "-r",
                    "--role",
                    "-t",
                    "--type",
                    "-U",
                    "--other-user",
                    "-T",
                    "--command-timeout",
                ],
                0,
            )
        },
        "doas" => Wrapper {
            shell_flags: &["-s"],
            ..Wrapper::new(&["-u", "-C"], 0)
        },
        "flock" => Wrapper {
            shell_flags: &["-c", "--command"],
            ..Wrapper::new(&["-w", "--timeout", "-E", "--conflict-exit-code"], 1)
        },
        "watch" => Wrapper {
            via_shell: true,
            ..Wrapper::new(&["-n", "--interval", "-q", "--equexit"], 0)
        },
        _ => return None,
    };
    Some(spec)
}

enum Unwrapped<'a> {
    /// The wrapper runs this program with these arguments.
    Runs(&'a str, &'a [String]),
    /// The wrapper was asked to start a shell with this option.
    Shell(String),
    /// No command follows; the wrapper only reports or looks something up.
    Nothing,
}

/// Find the program a wrapper like `nohup`, `sudo` or `timeout` would run.
fn unwrap_wrapper<'a>(name: &str, spec: &Wrapper, args: &'a [String]) -> Unwrapped<'a> {
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            i += 1;
            break;
        }
        if !arg.starts_with('-') || arg == "-" {
            break;
        }
        // `command -v foo` only looks the program up.
        if name == "command" && (arg == "-v" || arg == "-V") {
            return Unwrapped::Nothing;
        }
        if has_flag(arg, spec.shell_flags) {
            return Unwrapped::Shell(arg.to_string());
        }
        i += if spec.value_flags.contains(&arg) { 2 } else { 1 };
    }

    if spec.assignments {
        while args.get(i).is_some_and(|a| is_assignment(a)) {
            i += 1;
        }
    }
    i += spec.positionals;

    // `flock FILE -c CMD` takes its shell option after the lock file.
    if let Some(arg) = args.get(i).filter(|a| has_flag(a, spec.shell_flags)) {
        return Unwrapped::Shell(arg.clone());
    }

    match args.get(i) {
        Some(program) => Unwrapped::Runs(program.as_str(), &args[i + 1..]),
        None => Unwrapped::Nothing,
    }
}

/// Exact match, or a short flag hidden in a cluster such as `-is`.
fn has_flag(arg: &str, flags: &[&str]) -> bool {
    if flags.contains(&arg) {
        return true;
    }
    let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.starts_with('-')) else {
        return false;
    };
    flags
        .iter()
        .filter_map(|f| f.strip_prefix('-').filter(|f| f.len() == 1))
        .any(|f| cluster.contains(f))
}

/// `watch -x` runs its command directly instead of through `sh -c`.
fn watch_exec_mode(args: &[String]) -> bool {
    let mut i = 0;
    while let Some(arg) = args.get(i) {
        if arg == "--" || !arg.starts_with('-') {
            return false;
        }
        if arg == "--exec" || has_flag(arg, &["-x"]) {
            return true;
        }
        i += match arg.as_str() {
            "-n" | "--interval" | "-q" | "--equexit" => 2,
            _ => 1,
        };
    }
    false
}

/// Gate every command `find` would run via `-exec`, `-execdir`, `-ok` or `-okdir`.
fn check_find(args: &[String], depth: usize) -> GateOutcome {
    let mut i = 0;
    while i < args.len() {
        let action = args[i].as_str();
        if !matches!(action, "-exec" | "-execdir" | "-ok" | "-okdir") {
            i += 1;
            continue;
        }

        let start = i + 1;
        let end = args[start..]
            .iter()
            .position(|a| a == ";" || a == "+")
            .map_or(args.len(), |offset| start + offset);
        if start >= end {
            return GateOutcome::Deny(format!("'find {action}' without a command"));
        }

        let outcome = check_invocation(&args[start], &args[start + 1..end], depth + 1);
        if outcome.is_denied() {
            return outcome;
        }
        i = end + 1;
    }
    GateOutcome::Pass
}
