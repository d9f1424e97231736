//! Error types for the calculator and greet services.
//!
//! This module defines the central `Error` enum shared by the server and the
//! client wrappers. Server code raises it at the point of violation and relies
//! on `From<Error>` for `tonic::Status` to pick the status code. Client code
//! receives a `Status` (or a transport error) and converts it back, so callers
//! can branch on [`Error::kind`] instead of parsing messages.
//!
//! ## Error Cases
//! - `InvalidArgument`: The request failed validation.
//! - `DeadlineExceeded`: The caller's time budget ran out.
//! - `Cancelled`: The call was abandoned by the peer or by server shutdown.
//! - `ChannelError`: An internal communication failure between tasks.
//! - `Internal`: Any other unexpected fault.
//! - `ServiceShutdown`: A call arrived while the service was shutting down.
//! - `Transport`: The connection failed or the server is unreachable.

use core::fmt;
use std::error::Error as StdError;
use tonic::{Code, Status};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the calculator and greet services.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The request was malformed or outside the operation's domain.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The call deadline elapsed before the handler finished.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// The call was cancelled before it could complete.
    #[error("Call cancelled")]
    Cancelled,

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// Any other unexpected handler fault.
    #[error("Internal error: {context}")]
    Internal { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,

    /// The connection could not be established or was lost.
    #[error("Transport error: {reason}")]
    Transport { reason: String },
}

/// Machine-readable category of an [`Error`].
///
/// Domain failures (`InvalidArgument`, `DeadlineExceeded`, `Cancelled`,
/// `Internal`) never share a kind with transport failures (`Unavailable`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    DeadlineExceeded,
    Cancelled,
    Internal,
    Unavailable,
}

impl ErrorKind {
    /// Returns `true` for failures of the connection rather than the call.
    pub const fn is_transport(self) -> bool {
        matches!(self, Self::Unavailable)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Shorthand for an [`Error::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::ChannelError { .. } | Self::Internal { .. } => ErrorKind::Internal,
            Self::ServiceShutdown | Self::Transport { .. } => ErrorKind::Unavailable,
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidArgument { reason } => Status::invalid_argument(reason),
            Error::DeadlineExceeded => Status::deadline_exceeded("Deadline exceeded"),
            Error::Cancelled => Status::cancelled("Call was cancelled"),
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {context}"))
            }
            Error::Internal { context } => Status::internal(context),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
            Error::Transport { reason } => Status::unavailable(reason),
        }
    }
}

/// Returns `true` when `status` was raised by the local transport stack
/// rather than sent by the peer.
///
/// A status decoded from the peer's trailers never carries a source. One
/// built from a broken connection (an I/O or HTTP/2 failure) keeps the
/// underlying error, usually with `Code::Unknown` or `Code::Internal`.
fn is_transport_failure(status: &Status) -> bool {
    let Some(mut cause) = StdError::source(status) else {
        return false;
    };

    loop {
        if cause.is::<std::io::Error>() || cause.is::<tonic::transport::Error>() {
            return true;
        }
        match cause.source() {
            Some(next) => cause = next,
            None => break,
        }
    }

    matches!(
        status.code(),
        Code::Unknown | Code::Internal | Code::Unavailable | Code::Cancelled
    )
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        let message = status.message().to_string();
        if is_transport_failure(&status) {
            return Self::Transport { reason: message };
        }
        match status.code() {
            Code::InvalidArgument => Self::InvalidArgument { reason: message },
            Code::DeadlineExceeded => Self::DeadlineExceeded,
            Code::Cancelled => Self::Cancelled,
            Code::Unavailable => Self::Transport { reason: message },
            code => Self::Internal {
                context: format!("{code:?}: {message}"),
            },
        }
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Self::Transport {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_kind() {
        let cases = [
            (Error::invalid_argument("bad"), Code::InvalidArgument),
            (Error::DeadlineExceeded, Code::DeadlineExceeded),
            (Error::Cancelled, Code::Cancelled),
            (
                Error::ChannelError {
                    context: "closed".into(),
                },
                Code::Internal,
            ),
            (Error::ServiceShutdown, Code::Unavailable),
        ];

        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn invalid_argument_keeps_its_message() {
        let status = Status::from(Error::invalid_argument("Received a negative number: -2"));
        assert_eq!(status.message(), "Received a negative number: -2");

        let err = Error::from(status);
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            err,
            Error::invalid_argument("Received a negative number: -2")
        );
    }

    #[test]
    fn transport_failures_are_their_own_kind() {
        let err = Error::from(Status::unavailable("connection refused"));
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.kind().is_transport());

        for domain in [
            Error::invalid_argument("x"),
            Error::DeadlineExceeded,
            Error::Cancelled,
            Error::Internal {
                context: "boom".into(),
            },
        ] {
            assert!(!domain.kind().is_transport());
        }
    }

    #[test]
    fn unknown_codes_become_internal() {
        let err = Error::from(Status::unknown("???"));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn broken_connection_is_a_transport_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
        let status = Status::from_error(Box::new(io));

        let err = Error::from(status);
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.kind().is_transport());
    }

    #[test]
    fn locally_raised_unknown_is_a_transport_failure() {
        #[derive(Debug, thiserror::Error)]
        #[error("stream closed")]
        struct Closed;

        let mut status = Status::from_error(Box::new(Closed));
        assert!(StdError::source(&status).is_some());
        assert!(Error::from(status.clone()).kind().is_transport());

        // The same code sent by the peer stays a domain failure.
        status = Status::new(status.code(), status.message());
        assert!(!Error::from(status).kind().is_transport());
    }
}
