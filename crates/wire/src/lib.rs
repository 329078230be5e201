//! Wire-shape request/response envelope types and the conversion between
//! them and `worldgate-dispatcher`'s internal `CommandBatch`/
//! `DispatchResponse`. Everything here is pure and synchronous; the
//! actual auth/admission and dispatch live in `worldgate-security` and
//! `worldgate-dispatcher`.

pub mod convert;
pub mod request;
pub mod response;

pub use convert::{from_dispatch_response, to_command_batch};
pub use request::{Commands, GatewayRequest};
pub use response::GatewayResponse;
