use anyhow::{Context, Result};
use jwtbearer_grant::JwtBearerConfig;

use crate::cli::CheckConfigArgs;
use crate::output::{print_field, print_success};

pub fn check_config(args: &CheckConfigArgs) -> Result<()> {
    let config = JwtBearerConfig::load(&args.file)
        .with_context(|| format!("Invalid configuration {}", args.file.display()))?;

    print_field("Token URL", &config.token_url);
    print_field("Skip client auth", config.skip_client_auth);
    print_field("JWT ID optional", config.jwt_id_optional);
    print_field("Issued-at optional", config.issued_at_optional);
    print_field(
        "Max assertion duration",
        format_duration(config.max_assertion_duration),
    );
    print_field(
        "Access token lifetime",
        format_duration(config.access_token_lifetime),
    );
    print_success("Configuration is valid");
    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    format!("{}s", duration.as_secs())
}
