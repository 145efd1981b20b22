//! SAML 2.0 object model.
//!
//! Typed forms of the protocol messages the engine exchanges, and their
//! mapping to and from the DOM in [`crate::xml`]. The eIDAS extensions
//! (SP type, requested attributes) live on the request types.

mod assertion;
mod authn_request;
mod constants;
mod marshal;
mod name_id;
mod response;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use marshal::{format_instant, parse_boolean, parse_instant, SamlObject};
pub use name_id::*;
pub use response::*;
pub use status::*;

pub(crate) use marshal::{
    ds, eidas, expect, issuer, issuer_of, optional_child, optional_instant, optional_text,
    required_attribute, saml, samlp, signature_certificate, xenc,
};
