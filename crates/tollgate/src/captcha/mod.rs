//! CAPTCHA token issuance and validation.
//!
//! The challenge image and text are produced elsewhere; this layer only turns a
//! solution into a token and later checks an answer against it. No state is
//! kept between the two calls.

mod generator;
mod validator;

pub use generator::TokenGenerator;
pub use validator::Validator;
