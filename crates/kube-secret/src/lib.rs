//! kube-secret - Making kube secret files a bit more bearable
//!
//! Kubernetes stores `Secret` values base64-encoded under `data`. That is
//! fine for the API server and miserable for the human editing the manifest.
//! This crate flips those values between their on-disk (base64) form and
//! plaintext, without reordering keys, so a decode/encode cycle leaves no
//! noise in git history.
//!
//! Typical library usage:
//!
//! ```no_run
//! use kube_secret::{Direction, DocumentStore};
//!
//! # fn main() -> kube_secret::Result<()> {
//! let mut store = DocumentStore::new();
//! store.load(b"kind: Secret\ndata:\n  user: cm9vdA==\n")?;
//! store.transform(Direction::Decode)?;
//! let plaintext = store.serialize()?;
//! # let _ = plaintext;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod munger;
pub mod store;
pub mod workflow;

pub use config::Config;
pub use document::{Entry, Node, OrderedMap};
pub use error::{Result, SecretError};
pub use munger::Direction;
pub use store::DocumentStore;
pub use workflow::EditOutcome;
