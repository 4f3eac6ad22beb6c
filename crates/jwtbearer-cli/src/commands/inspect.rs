use anyhow::{Context, Result};
use jwtbearer_grant::jwt::Assertion;
use serde_json::json;

use crate::cli::InspectArgs;
use crate::output::print_json;

use super::read_assertion;

pub fn inspect(args: &InspectArgs) -> Result<()> {
    let raw = read_assertion(&args.assertion)?;
    let assertion = Assertion::parse(&raw).context("Unable to parse the assertion")?;
    print_json(&json!({
        "header": serde_json::to_value(assertion.header())?,
        "claims": serde_json::to_value(assertion.unverified_claims())?,
    }))
}
