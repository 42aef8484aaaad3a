//! # warden-core
//!
//! Core approval engine for Warden: decides whether shell commands proposed
//! by an AI coding agent may run.
//!
//! This crate is front-end agnostic and can be used by:
//! - the `warden` CLI
//! - editor or agent integrations (via [`approval::ApprovalUi`])
//!
//! ## Key Concepts
//!
//! - **Chain**: segments joined by one of `|`, `&&`, `;`
//! - **Gate**: hard denials that no stored approval can override
//! - **Rule**: a prefix or regex approval in session, global or project scope
//! - **Resolution**: the decision plus the session state to carry forward

pub mod approval;
pub mod command;
pub mod context;
pub mod logging;
pub mod paths;
pub mod persistence;

// Re-export commonly used types
pub use approval::{
    ApprovalError, ApprovalRule, ApprovalState, ApprovalUi, Decision, NonInteractiveUi,
    Resolution, Resolver, Scope,
};
pub use command::{parse_chain, CommandChain, CommandSegment};
pub use context::{WardenContext, WardenContextBuilder};
pub use persistence::{PolicyError, PolicyStore};
