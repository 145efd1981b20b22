//! Semantic message model.
//!
//! These are the values callers exchange with the engine. They are immutable
//! once built; the engine derives them from the protocol object model and
//! never the other way round on the receiving side.

mod message;
mod request;
mod response;

pub use message::{BinaryMessage, RequestMessage, ResponseMessage};
pub use request::{AuthenticationRequest, AuthenticationRequestBuilder};
pub use response::{
    AttributeMap, AuthenticationResponse, AuthenticationResponseBuilder, ResponseStatus,
};
