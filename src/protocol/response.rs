//! Response definitions
//!
//! Represents responses to clients.

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    Failure = 0x01,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Value for a successful GET, error message for a failure
    pub value: Option<String>,
}

impl Response {
    /// Create a SUCCESS response with optional value
    pub fn success(value: Option<String>) -> Self {
        Self {
            status: Status::Success,
            value,
        }
    }

    /// Create a FAILURE response carrying an error message
    pub fn failure(message: &str) -> Self {
        Self {
            status: Status::Failure,
            value: Some(message.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
