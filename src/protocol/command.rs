//! Request definitions
//!
//! Represents requests from clients.

/// Operation tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestKind {
    Get = 0x01,
    Set = 0x02,
    Rm = 0x03,
}

impl RequestKind {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(RequestKind::Get),
            0x02 => Some(RequestKind::Set),
            0x03 => Some(RequestKind::Rm),
            _ => None,
        }
    }
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Get a value by key
    Get { key: String },

    /// Set a key-value pair
    Set { key: String, value: String },

    /// Remove a key
    Rm { key: String },
}

impl Request {
    /// Get the operation tag
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Get { .. } => RequestKind::Get,
            Request::Set { .. } => RequestKind::Set,
            Request::Rm { .. } => RequestKind::Rm,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Request::Get { key } | Request::Set { key, .. } | Request::Rm { key } => key,
        }
    }
}
