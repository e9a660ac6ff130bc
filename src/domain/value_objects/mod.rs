//! # Value Objects
//!
//! Small immutable types shared by the entities.
//!
//! - [`Reference`]: shallow-or-loaded link to another entity
//! - [`Pan`], [`CardBrand`]: card number with masking and scheme detection
//! - [`ExpDate`]: card expiry month
//! - [`token`]: card access token generation

pub mod exp_date;
pub mod pan;
pub mod reference;
pub mod token;

pub use exp_date::{ExpDate, InvalidExpDateError};
pub use pan::{CardBrand, MASK_CHAR, Pan, mask_pan};
pub use reference::{Identified, Reference, detach, merge_reference, reference_id};
pub use token::{TOKEN_ENTROPY_BYTES, TOKEN_LEN, TokenError, generate_token};
