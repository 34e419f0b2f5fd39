//! List the donor directory.

use std::io::Write;

use donor_finder_core::{BloodGroup, DirectoryFilter, Donor, GroupFilter, filter_donors};

use super::{CliError, SignedIn};

/// Parse a `--group` value. Unlike the web query, unknown groups are errors.
fn parse_group(value: Option<&str>) -> Result<GroupFilter, CliError> {
    match value.map(str::trim) {
        None | Some("") => Ok(GroupFilter::All),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(GroupFilter::All),
        Some(v) => v
            .to_ascii_uppercase()
            .parse::<BloodGroup>()
            .map(GroupFilter::Group)
            .map_err(|_| CliError::UnknownGroup(v.to_string())),
    }
}

fn format_row(donor: &Donor) -> String {
    format!(
        "{:<4} {:<24} {:<16} {:<16} {}",
        donor.group_or_empty(),
        donor.name_or_empty(),
        donor.city_or_empty(),
        donor.phone.as_deref().unwrap_or_default(),
        donor.last_donated,
    )
}

/// Load the directory and print the donors passing the filter.
///
/// # Errors
///
/// Returns an error if the group is unknown, sign-in fails, or the load fails.
pub async fn list(
    email: &str,
    password_env: &str,
    group: Option<&str>,
    search: Option<&str>,
) -> Result<(), CliError> {
    let filter = DirectoryFilter::new(parse_group(group)?, search.unwrap_or_default());

    let mut signed_in = SignedIn::new(email, password_env).await?;
    signed_in.state.directory().load(&mut signed_in.ctx).await;

    if let Some(message) = signed_in.ctx.cache.error() {
        let err = CliError::Load(message.to_string());
        signed_in.sign_out().await;
        return Err(err);
    }

    let donors = signed_in.ctx.cache.donors();
    let shown = filter_donors(donors, &filter);

    let mut out = std::io::stdout().lock();
    if shown.is_empty() {
        writeln!(out, "No donors found.")?;
    } else {
        for donor in &shown {
            writeln!(out, "{}", format_row(donor))?;
        }
    }
    writeln!(out, "{} of {} donors", shown.len(), donors.len())?;
    drop(out);

    signed_in.sign_out().await;
    Ok(())
}
