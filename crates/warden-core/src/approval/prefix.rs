//! Canonical approval keys.
//!
//! Every segment gets a key the human approves instead of the exact command
//! line:
//! - Family programs (`git`, `gh`, `mix`, ...) keep their sub-command tokens
//! - Everything else is keyed by the program name alone
//! - Leading flags are skipped (including the value of known value flags)

use crate::command::CommandSegment;

use super::families::family_depth;

/// Program-level single-letter flags that take a value, per family.
fn value_flags(program: &str) -> &'static [&'static str] {
    match program {
        "git" => &["-C", "-c"],
        "gh" | "glab" => &["-R"],
        "cargo" => &["-C", "-Z"],
        "kubectl" | "helm" => &["-n"],
        "docker" | "podman" => &["-H", "-c", "-l"],
        "npm" | "pnpm" | "yarn" => &["-C"],
        "go" => &["-C"],
        "mvn" | "gradle" => &["-f", "-p"],
        _ => &[],
    }
}

/// Leading flags known not to change what a family sub-command executes.
///
/// A key match only counts as coverage when every flag skipped while
/// building the key is listed here. `git -c core.pager=CMD log` keys as
/// `git log` but must not ride on an approval of `git log`.
fn inert_flags(program: &str) -> &'static [&'static str] {
    match program {
        "git" => &[
            "--no-pager",
            "-P",
            "--no-optional-locks",
            "--literal-pathspecs",
            "--glob-pathspecs",
            "--noglob-pathspecs",
            "--icase-pathspecs",
            "--no-replace-objects",
        ],
        "cargo" => &["-q", "--quiet", "-v", "-vv", "--verbose", "--frozen", "--locked", "--offline"],
        "npm" | "pnpm" | "yarn" => &["--silent", "--quiet"],
        _ => &[],
    }
}

/// Key tokens plus every token skipped on the way to them.
struct KeyParts<'a> {
    tokens: Vec<&'a str>,
    skipped: Vec<&'a str>,
}

fn split_key(segment: &CommandSegment) -> KeyParts<'_> {
    let program = segment.program.as_str();
    let mut parts = KeyParts {
        tokens: vec![program],
        skipped: Vec::new(),
    };
    let Some(depth) = family_depth(program) else {
        return parts;
    };

    let takes_value = value_flags(program);
    let mut i = 0;
    while i < segment.args.len() && parts.tokens.len() <= depth {
        let arg = segment.args[i].as_str();
        if arg.starts_with('-') {
            parts.skipped.push(arg);
            if takes_value.contains(&arg) {
                if let Some(value) = segment.args.get(i + 1) {
                    parts.skipped.push(value.as_str());
                }
                i += 1;
            }
            i += 1;
            continue;
        }
        parts.tokens.push(arg);
        i += 1;
    }
    parts
}

/// Extract the canonical key for a segment.
///
/// This is the prompt default and the grouping key. It is not always
/// usable for coverage; see [`prefix_matches_segment`].
///
/// ```ignore
/// extract_key(&seg("gh", &["pr", "view", "123"]))  // "gh pr view"
/// extract_key(&seg("git", &["--no-pager", "log"])) // "git log"
/// extract_key(&seg("ls", &["-la"]))                // "ls"
/// ```
pub fn extract_key(segment: &CommandSegment) -> String {
    split_key(segment).tokens.join(" ")
}

/// The key, if nothing but inert flags was skipped to build it.
fn coverage_key(segment: &CommandSegment) -> Option<String> {
    let parts = split_key(segment);
    let inert = inert_flags(&segment.program);
    parts
        .skipped
        .iter()
        .all(|flag| inert.contains(flag))
        .then(|| parts.tokens.join(" "))
}

/// Does a stored prefix cover `text`?
///
/// Matches at token boundaries so `mix test` covers `mix test --trace` but
/// not `mix testall`. A prefix that itself ends in a space falls back to a
/// plain starts-with. Blank prefixes never match anything.
pub fn prefix_covers(prefix: &str, text: &str) -> bool {
    if prefix.trim().is_empty() {
        return false;
    }
    if prefix.ends_with(' ') {
        return text.starts_with(prefix);
    }
    text.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
}

/// Does a stored prefix cover this segment?
///
/// The key is consulted only when the skipped flags are inert; otherwise
/// the prefix has to cover the full rendering.
pub fn prefix_matches_segment(prefix: &str, segment: &CommandSegment) -> bool {
    coverage_key(segment).is_some_and(|key| prefix_covers(prefix, &key))
        || prefix_covers(prefix, &segment.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(program: &str, args: &[&str]) -> CommandSegment {
        CommandSegment::from_argv(program, args)
    }

    // ============================================
    // Key extraction
    // ============================================

    mod extraction {
        use super::*;

        #[test]
        fn non_family_programs_use_program_only() {
            assert_eq!(extract_key(&seg("ls", &["-la", "/tmp"])), "ls");
            assert_eq!(extract_key(&seg("python", &["manage.py", "migrate"])), "python");
            assert_eq!(extract_key(&seg("mycommand", &["sub", "arg"])), "mycommand");
        }

        #[test]
        fn family_programs_keep_subcommand() {
            assert_eq!(extract_key(&seg("mix", &["test"])), "mix test");
            assert_eq!(extract_key(&seg("mix", &["test", "--trace"])), "mix test");
            assert_eq!(extract_key(&seg("git", &["push", "origin", "main"])), "git push");
            assert_eq!(extract_key(&seg("cargo", &["build", "--release"])), "cargo build");
        }

        #[test]
        fn nested_families_take_two_tokens() {
            assert_eq!(extract_key(&seg("gh", &["pr", "view", "123"])), "gh pr view");
            assert_eq!(extract_key(&seg("gh", &["pr", "checkout", "123"])), "gh pr checkout");
            assert_eq!(extract_key(&seg("aws", &["s3", "ls", "s3://bucket"])), "aws s3 ls");
        }

        #[test]
        fn leading_flags_are_skipped() {
            assert_eq!(extract_key(&seg("git", &["--no-pager", "status"])), "git status");
            assert_eq!(
                extract_key(&seg("git", &["-c", "color.ui=false", "--no-pager", "diff"])),
                "git diff"
            );
            assert_eq!(extract_key(&seg("git", &["-C", "/repo", "log"])), "git log");
            assert_eq!(
                extract_key(&seg("gh", &["-R", "owner/repo", "pr", "list"])),
                "gh pr list"
            );
        }

        #[test]
        fn boolean_flags_do_not_swallow_subcommands() {
            assert_eq!(extract_key(&seg("cargo", &["-q", "build"])), "cargo build");
        }

        #[test]
        fn flags_between_nested_tokens() {
            assert_eq!(
                extract_key(&seg("gh", &["pr", "--repo=x/y", "view", "1"])),
                "gh pr view"
            );
        }

        #[test]
        fn family_without_subcommand() {
            assert_eq!(extract_key(&seg("git", &["--version"])), "git");
            assert_eq!(extract_key(&seg("gh", &["pr"])), "gh pr");
        }
    }

    // ============================================
    // Prefix matching
    // ============================================

    mod matching {
        use super::*;

        #[test]
        fn exact_and_token_boundary() {
            assert!(prefix_covers("mix test", "mix test"));
            assert!(prefix_covers("mix test", "mix test --trace"));
            assert!(!prefix_covers("mix test", "mix testall"));
            assert!(!prefix_covers("mix test --trace", "mix test"));
        }

        #[test]
        fn trailing_space_prefix() {
            assert!(prefix_covers("git ", "git status"));
            assert!(!prefix_covers("git ", "github-cli"));
        }

        #[test]
        fn blank_prefix_never_matches() {
            assert!(!prefix_covers("", "rm -rf /"));
            assert!(!prefix_covers("   ", "rm -rf /"));
        }

        #[test]
        fn nested_specific_prefix() {
            let view = seg("gh", &["pr", "view", "123"]);
            let checkout = seg("gh", &["pr", "checkout", "123"]);
            assert!(prefix_matches_segment("gh pr view", &view));
            assert!(!prefix_matches_segment("gh pr view", &checkout));
        }

        #[test]
        fn broader_stored_prefix_covers_both() {
            let view = seg("gh", &["pr", "view", "123"]);
            let checkout = seg("gh", &["pr", "checkout", "123"]);
            assert!(prefix_matches_segment("gh pr", &view));
            assert!(prefix_matches_segment("gh pr", &checkout));
        }

        #[test]
        fn key_match_survives_leading_flags() {
            let segment = seg("git", &["--no-pager", "log", "-5"]);
            assert!(prefix_matches_segment("git log", &segment));
        }

        #[test]
        fn config_injection_does_not_ride_on_key() {
            let fsmonitor = seg("git", &["-c", "core.fsmonitor=touch /tmp/x", "status"]);
            let pager = seg("git", &["-c", "core.pager=rm -rf ~", "log"]);
            assert_eq!(extract_key(&fsmonitor), "git status");
            assert!(!prefix_matches_segment("git status", &fsmonitor));
            assert!(!prefix_matches_segment("git log", &pager));
            assert!(!prefix_matches_segment("git log", &seg("git", &["--exec-path=/tmp", "log"])));
            assert!(!prefix_matches_segment("cargo build", &seg("cargo", &["--config", "x", "build"])));
        }

        #[test]
        fn non_inert_flags_fall_back_to_rendering() {
            let segment = seg("git", &["-C", "/repo", "log"]);
            assert!(!prefix_matches_segment("git log", &segment));
            assert!(prefix_matches_segment("git -C /repo log", &segment));
            assert!(prefix_matches_segment("git", &segment));
        }

        #[test]
        fn inert_flags_keep_key_coverage() {
            assert!(prefix_matches_segment("git status", &seg("git", &["-P", "status"])));
            assert!(prefix_matches_segment("cargo build", &seg("cargo", &["-q", "build"])));
        }

        #[test]
        fn rendered_match_for_longer_prefixes() {
            let segment = seg("rm", &["-rf", "/tmp/build"]);
            assert!(prefix_matches_segment("rm -rf /tmp/build", &segment));
            assert!(!prefix_matches_segment("rm -rf /tmp/buildx", &segment));
        }
    }
}
