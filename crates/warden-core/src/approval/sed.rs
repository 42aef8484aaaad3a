//! `sed` invocation checks.
//!
//! `sed` can write files (`-i`, `w`, `W`), read arbitrary files into the
//! output (`r`, `R`) and run programs (`e`, `s///e`). Only a small,
//! output-only subset is let through; anything the parser does not
//! recognise is refused.

use super::gate::GateOutcome;

const REASON_PREFIX: &str = "unsafe sed usage";

/// Check a `sed` argument list. `args` excludes the program name.
pub fn check_sed(args: &[String]) -> GateOutcome {
    match check_args(args) {
        Ok(()) => GateOutcome::Pass,
        Err(detail) => GateOutcome::Deny(format!("{REASON_PREFIX}: {detail}")),
    }
}

fn check_args(args: &[String]) -> Result<(), String> {
    let mut script: Option<&str> = None;
    let mut operands_only = false;

    for arg in args {
        if operands_only || !arg.starts_with('-') || arg == "-" {
            // First operand is the script, the rest are input files.
            if script.is_none() {
                script = Some(arg);
            }
            continue;
        }

        if arg == "--" {
            operands_only = true;
            continue;
        }

        if let Some(long) = arg.strip_prefix("--") {
            let name = long.split('=').next().unwrap_or(long);
            match name {
                "version" | "help" => return Ok(()),
                "in-place" => return Err("in-place editing (--in-place) is not allowed".into()),
                "file" => return Err("script files (--file) are not allowed".into()),
                "expression" => {
                    return Err("inline expressions (--expression) are not allowed".into())
                }
                "quiet" | "silent" | "regexp-extended" | "separate" | "unbuffered"
                | "null-data" | "posix" | "sandbox" | "debug" => continue,
                _ => return Err(format!("unsupported option '{arg}'")),
            }
        }

        for flag in arg[1..].chars() {
            match flag {
                'n' | 'E' | 'r' | 's' | 'u' | 'z' => {}
                'i' | 'I' => return Err("in-place editing (-i) is not allowed".into()),
                'f' => return Err("script files (-f) are not allowed".into()),
                'e' => return Err("inline expressions (-e) are not allowed".into()),
                _ => return Err(format!("unsupported option '{arg}'")),
            }
        }
    }

    match script {
        Some(script) => ScriptChecker::new(script).check(),
        None => Err("missing script".into()),
    }
}

/// Walks a sed script command by command.
struct ScriptChecker {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl ScriptChecker {
    fn new(script: &str) -> Self {
        Self {
            chars: script.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.pos += 1;
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | ';')) {
            self.pos += 1;
        }
    }

    fn skip_digits(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn check(mut self) -> Result<(), String> {
        loop {
            self.skip_separators();
            if self.peek().is_none() {
                break;
            }
            self.command()?;
        }

        if self.depth != 0 {
            return Err("unbalanced braces in script".into());
        }
        Ok(())
    }

    fn command(&mut self) -> Result<(), String> {
        if self.address()? {
            self.skip_blanks();
            if self.peek() == Some(',') {
                self.pos += 1;
                self.skip_blanks();
                if !self.range_end()? {
                    return Err("malformed address range".into());
                }
            }
        }

        self.skip_blanks();
        while self.peek() == Some('!') {
            self.pos += 1;
            self.skip_blanks();
        }

        let cmd = self
            .next()
            .ok_or_else(|| "missing command after address".to_string())?;

        match cmd {
            'p' | 'P' | 'd' | 'D' | '=' | 'l' | 'n' | 'N' => self.end_of_command(),
            'q' | 'Q' => {
                self.skip_blanks();
                self.skip_digits();
                self.end_of_command()
            }
            's' => self.substitution(),
            '{' => {
                self.depth += 1;
                Ok(())
            }
            '}' => {
                if self.depth == 0 {
                    return Err("unbalanced braces in script".into());
                }
                self.depth -= 1;
                self.end_of_command()
            }
            'w' | 'W' => Err(format!("file write command '{cmd}' is not allowed")),
            'r' | 'R' => Err(format!("file read command '{cmd}' is not allowed")),
            'e' => Err("command execution ('e') is not allowed".into()),
            other => Err(format!("unsupported command '{other}'")),
        }
    }

    /// Parse an optional address. Returns whether one was present.
    fn address(&mut self) -> Result<bool, String> {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => {
                self.skip_digits();
                if self.peek() == Some('~') {
                    self.pos += 1;
                    if !self.skip_digits() {
                        return Err("malformed step address".into());
                    }
                }
                Ok(true)
            }
            Some('$') => {
                self.pos += 1;
                Ok(true)
            }
            Some('/') => {
                self.pos += 1;
                self.delimited('/')?;
                self.regex_address_flags();
                Ok(true)
            }
            Some('\\') => {
                self.pos += 1;
                let delim = self
                    .next()
                    .filter(|c| *c != '\n' && *c != '\\')
                    .ok_or_else(|| "malformed regex address".to_string())?;
                self.delimited(delim)?;
                self.regex_address_flags();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Second half of a range also accepts GNU `+N` and `~N`.
    fn range_end(&mut self) -> Result<bool, String> {
        if matches!(self.peek(), Some('+' | '~')) {
            self.pos += 1;
            return Ok(self.skip_digits());
        }
        self.address()
    }

    fn regex_address_flags(&mut self) {
        while matches!(self.peek(), Some('I' | 'M')) {
            self.pos += 1;
        }
    }

    /// Consume up to and including the closing `delim`, honouring escapes.
    fn delimited(&mut self, delim: char) -> Result<(), String> {
        loop {
            match self.next() {
                None | Some('\n') => return Err("unterminated regular expression".into()),
                Some('\\') => {
                    if self.next().is_none() {
                        return Err("unterminated regular expression".into());
                    }
                }
                Some(c) if c == delim => return Ok(()),
                Some(_) => {}
            }
        }
    }

    fn substitution(&mut self) -> Result<(), String> {
        let delim = self
            .next()
            .filter(|c| *c != '\n' && *c != '\\')
            .ok_or_else(|| "malformed substitution".to_string())?;
        self.delimited(delim)
            .map_err(|_| "unterminated substitution pattern".to_string())?;
        self.delimited(delim)
            .map_err(|_| "unterminated substitution replacement".to_string())?;

        while let Some(flag) = self.peek() {
            match flag {
                'g' | 'p' | 'i' | 'I' | 'm' | 'M' => {}
                c if c.is_ascii_digit() => {}
                'e' => return Err("the execute flag on substitutions (s///e) is not allowed".into()),
                'w' => return Err("the write flag on substitutions (s///w) is not allowed".into()),
                ';' | '\n' | '}' | ' ' | '\t' => break,
                other => return Err(format!("unsupported substitution flag '{other}'")),
            }
            self.pos += 1;
        }

        self.end_of_command()
    }

    fn end_of_command(&mut self) -> Result<(), String> {
        self.skip_blanks();
        match self.peek() {
            None | Some(';') | Some('\n') | Some('}') => Ok(()),
            Some(c) => Err(format!("unexpected '{c}' after command")),
        }
    }
}
