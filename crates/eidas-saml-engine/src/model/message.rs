//! Semantic messages paired with their wire form.

use super::{AuthenticationRequest, AuthenticationResponse};

/// A semantic message together with the exact bytes that carry it.
///
/// The bytes are what signatures cover and what travels on the wire. The
/// message is a view over them and is never used to regenerate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMessage<T> {
    message: T,
    bytes: Vec<u8>,
}

/// A generated authentication request.
pub type RequestMessage = BinaryMessage<AuthenticationRequest>;

/// A generated authentication response.
pub type ResponseMessage = BinaryMessage<AuthenticationResponse>;

impl<T> BinaryMessage<T> {
    pub(crate) fn new(message: T, bytes: Vec<u8>) -> Self {
        Self { message, bytes }
    }

    /// The semantic view.
    #[must_use]
    pub fn message(&self) -> &T {
        &self.message
    }

    /// The signed, serialized form.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
