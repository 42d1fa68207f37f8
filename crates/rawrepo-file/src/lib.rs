//! rawrepo-file - Filesystem-backed record store.
//!
//! Everything lives below one root directory:
//!
//! ```text
//! <root>/
//!   records/<bib>/<agency>.json         version history, oldest first
//!   relations/out/<bib>/<agency>.json   edges from the record
//!   relations/in/<bib>/<agency>.json    edges to the record
//!   queue.json                          pending jobs
//!   jobdiag.jsonl                       failed jobs, one per line
//!   queuerules.json                     provider to worker fan-out
//!   rawrepo.lock                        advisory lock for writers
//! ```
//!
//! Bibliographic ids are base64url encoded in paths.

mod backend;
mod codec;
mod store;

pub use store::FileStore;
