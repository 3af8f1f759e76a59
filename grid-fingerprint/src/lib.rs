//! Deterministic fingerprinting of Terraform output values, and a parser for
//! the `outputs` block of a state-JSON (version 4) document.

mod digest;
mod state_json;

pub use digest::{fingerprint, UNKNOWN};
pub use state_json::{is_well_formed_json, parse_outputs, OutputMeta, ParseError, ParsedOutputs};

pub mod prelude {
    pub use crate::{fingerprint, is_well_formed_json, parse_outputs, OutputMeta, ParsedOutputs, UNKNOWN};
}
