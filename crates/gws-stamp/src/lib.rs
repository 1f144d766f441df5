//! Folder change stamps for groupware storage.
//!
//! A [`ChangeStamp`] is a snapshot of a remote folder's membership: the
//! generation of its id space, the next id the folder will assign, and the
//! set of backend ids currently present. Comparing the stamp taken on the
//! previous poll with a fresh one tells the caller whether anything changed
//! and, if so, which ids appeared or disappeared.
//!
//! The common case of "nothing changed" is answered from the counters alone,
//! without touching the id sets.
//!
//! # Modules
//!
//! - [`stamp`] -- [`ChangeStamp`], its two kinds, and [`StampChanges`]
//! - [`token`] -- opaque byte encoding used to persist a stamp
//! - [`error`] -- Error types

pub mod error;
pub mod stamp;
pub mod token;

pub use error::{StampError, StampResult};
pub use stamp::{ChangeStamp, ModSeqStamp, StampChanges, UidStamp};
pub use token::{decode, encode, TOKEN_VERSION};
