//! Web server binding administration.
//!
//! The `BindingAdmin` trait covers the three things the renewal engine asks of
//! a web server: publish a challenge response (optionally probing that it is
//! reachable), install an issued certificate into the site bindings, and
//! report whether the site is running.

mod error;
mod traits;
mod webroot;

pub use error::BindingError;
pub use traits::{BindingAdmin, SiteState};
pub use webroot::{WebrootBindingAdmin, CONFIG_CHECK_FILE};
