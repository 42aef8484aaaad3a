//! Typed command segments and chains.

use serde::{Deserialize, Serialize};

/// A single `{program, args}` invocation within a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandSegment {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSegment {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build a segment from string slices. Handy in tests and callers that
    /// already hold a tokenized argv.
    pub fn from_argv(program: &str, args: &[&str]) -> Self {
        Self::new(program, args.iter().map(|a| a.to_string()).collect())
    }

    /// Render the full command line matched by prefix and regex rules:
    /// `program` followed by the space-joined args.
    pub fn render(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl std::fmt::Display for CommandSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// How the segments of a chain are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainOperator {
    /// `a | b`
    Pipe,
    /// `a && b`
    And,
    /// `a; b`
    Sequence,
}

impl ChainOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainOperator::Pipe => "|",
            ChainOperator::And => "&&",
            ChainOperator::Sequence => ";",
        }
    }
}

/// An ordered list of segments joined by one operator.
///
/// `description` is the label shown to the human while prompting; it never
/// takes part in matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandChain {
    pub operator: ChainOperator,
    pub segments: Vec<CommandSegment>,
    pub description: String,
}

impl CommandChain {
    pub fn new(
        operator: ChainOperator,
        segments: Vec<CommandSegment>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            operator,
            segments,
            description: description.into(),
        }
    }

    /// A chain holding exactly one segment.
    pub fn single(segment: CommandSegment) -> Self {
        let description = segment.render();
        Self::new(ChainOperator::And, vec![segment], description)
    }

    /// Render every segment joined by the chain operator.
    pub fn render(&self) -> String {
        let sep = format!(" {} ", self.operator.as_str());
        self.segments
            .iter()
            .map(CommandSegment::render)
            .collect::<Vec<_>>()
            .join(&sep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_args() {
        assert_eq!(CommandSegment::from_argv("pwd", &[]).render(), "pwd");
    }

    #[test]
    fn render_joins_args_with_spaces() {
        let seg = CommandSegment::from_argv("git", &["commit", "-m", "fix bug"]);
        assert_eq!(seg.render(), "git commit -m fix bug");
    }

    #[test]
    fn chain_render_uses_operator() {
        let chain = CommandChain::new(
            ChainOperator::And,
            vec![
                CommandSegment::from_argv("cd", &["/app"]),
                CommandSegment::from_argv("mix", &["test"]),
            ],
            "run tests",
        );
        assert_eq!(chain.render(), "cd /app && mix test");
    }

    #[test]
    fn single_uses_rendered_segment_as_description() {
        let chain = CommandChain::single(CommandSegment::from_argv("ls", &["-la"]));
        assert_eq!(chain.description, "ls -la");
        assert_eq!(chain.segments.len(), 1);
    }
}
