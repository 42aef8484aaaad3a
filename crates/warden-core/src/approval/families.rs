//! Sub-command families.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Programs whose leading non-flag arguments name a sub-command worth
/// approving separately, mapped to how many of those tokens form the key.
///
/// `git push` and `git status` are very different things to approve, so
/// `git` has depth 1. `gh pr view` and `gh pr merge` differ at the second
/// token, so `gh` has depth 2.
///
/// Programs missing from this table are keyed by the program name alone.
pub static SUBCOMMAND_FAMILIES: LazyLock<HashMap<&'static str, usize>> = LazyLock::new(|| {
    [
        // Version control
        ("git", 1),
        ("hg", 1),
        ("svn", 1),
        ("jj", 1),
        // Forges (resource + action)
        ("gh", 2),
        ("glab", 2),
        // Cloud CLIs (service + action)
        ("aws", 2),
        ("gcloud", 2),
        ("az", 2),
        // Package managers
        ("npm", 1),
        ("pnpm", 1),
        ("yarn", 1),
        ("bun", 1),
        ("pip", 1),
        ("pip3", 1),
        ("uv", 1),
        ("poetry", 1),
        ("gem", 1),
        ("bundle", 1),
        ("brew", 1),
        ("apt", 1),
        ("apt-get", 1),
        ("composer", 1),
        // Build tools
        ("cargo", 1),
        ("rustup", 1),
        ("go", 1),
        ("mix", 1),
        ("rebar3", 1),
        ("mvn", 1),
        ("gradle", 1),
        ("dotnet", 1),
        ("swift", 1),
        ("deno", 1),
        ("rake", 1),
        // Containers and infrastructure
        ("docker", 1),
        ("podman", 1),
        ("kubectl", 1),
        ("helm", 1),
        ("terraform", 1),
    ]
    .into_iter()
    .collect()
});

/// Sub-command depth for a program, if it belongs to a family.
pub fn family_depth(program: &str) -> Option<usize> {
    SUBCOMMAND_FAMILIES.get(program).copied()
}
