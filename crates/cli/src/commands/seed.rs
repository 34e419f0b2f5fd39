//! Seed the donor directory from a YAML fixture.
//!
//! Donors go through the same add operation as the web form, so the account
//! must be an admin or super admin. Accounts listed in the fixture are
//! ignored here; they only apply to the memory backend.

use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use donor_finder_web::services::fixture::Fixture;

use super::{CliError, SignedIn};

/// Insert every donor in `file`.
///
/// All entries are validated before the first insert. An authorization
/// failure aborts the run.
///
/// # Errors
///
/// Returns an error if the file is invalid, sign-in fails, the account may
/// not add donors, or an insert fails.
pub async fn donors(file: &Path, email: &str, password_env: &str) -> Result<(), CliError> {
    let fixture = Fixture::from_path(file)?;
    let count = fixture.validated_donors()?.len();
    info!(path = %file.display(), donors = count, "Parsed fixture");

    if !fixture.accounts.is_empty() {
        warn!(
            accounts = fixture.accounts.len(),
            "Fixture accounts are ignored by seed"
        );
    }

    let mut signed_in = SignedIn::new(email, password_env).await?;

    let mut inserted = 0usize;
    let mut result = Ok(());
    for form in &fixture.donors {
        match signed_in
            .state
            .directory()
            .add(&mut signed_in.ctx, form, Utc::now())
            .await
        {
            Ok(id) => {
                inserted += 1;
                info!(donor_id = ?id, name = %form.name, "Inserted donor");
            }
            Err(e) => {
                result = Err(e.into());
                break;
            }
        }
    }

    info!("Seeding complete!");
    info!("  Donors inserted: {inserted} of {count}");

    signed_in.sign_out().await;
    result
}
