//! Trackwall Intent-Firewall Rule Store
//!
//! The rule file the OS firewall consults:
//! ```text
//! <rules>
//!     <activity block="true" log="false">
//!         <component-filter name="package/component" />
//!     </activity>
//!     <service block="true" log="false"> ... </service>
//!     <broadcast block="true" log="false"> ... </broadcast>
//! </rules>
//! ```
//!
//! Every mutating call runs its own cycle:
//! ```text
//! Acquire(file) -> Parse -> Mutate -> Serialize -> Write(truncate + write)
//! ```
//! Nothing is cached between calls, so edits made by other tools survive.

mod document;
mod error;
mod store;
mod tag;

pub use document::{Element, FirewallDocument, Node, RuleSet};
pub use error::RuleError;
pub use store::{RuleStore, UnblockOutcome};
pub use tag::RuleTag;

pub type Result<T> = std::result::Result<T, RuleError>;
