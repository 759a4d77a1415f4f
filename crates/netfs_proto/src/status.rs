use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The six status codes shared by every RPC surface in this workspace.
///
/// `OK` is not a variant here: success is `Result::Ok(..)`. `RETRY` is
/// likewise not a failure in the usual sense (callers are expected to
/// wait for a retry callback), but it still crosses the RPC boundary as
/// part of the same flat vocabulary the original protocol uses, so it
/// is kept in this enum rather than folded into a distinct outcome type
/// at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Status {
    /// Transport-layer failure: peer unreachable, connection refused, etc.
    #[error("rpc transport failure")]
    RpcErr,
    /// Name not found in a directory.
    #[error("name not found")]
    NoEnt,
    /// Illegal argument: offset beyond end-of-file, oversized directory, missing extent.
    #[error("i/o error")]
    Io,
    /// Name already present in a directory.
    #[error("name already exists")]
    Exist,
    /// Lock not granted; caller must wait for an asynchronous retry callback.
    #[error("lock busy, retry pending")]
    Retry,
}

pub type Result<T> = core::result::Result<T, Status>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_over_bincode() {
        for status in [Status::RpcErr, Status::NoEnt, Status::Io, Status::Exist, Status::Retry] {
            let encoded = bincode::serialize(&status).unwrap();
            assert_eq!(bincode::deserialize::<Status>(&encoded).unwrap(), status);
        }
    }
}
