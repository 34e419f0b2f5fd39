//! Show the role resolved for an account.

use std::io::Write;

use super::{CliError, SignedIn};

/// Sign in as `email` and print the resolved role tag.
///
/// # Errors
///
/// Returns an error if sign-in fails or stdout is closed.
pub async fn show(email: &str, password_env: &str) -> Result<(), CliError> {
    let signed_in = SignedIn::new(email, password_env).await?;
    let role = signed_in.ctx.role;

    let mut out = std::io::stdout().lock();
    writeln!(out, "{} {}", signed_in.ctx.identity.email, role.as_str())?;
    drop(out);

    signed_in.sign_out().await;
    Ok(())
}
