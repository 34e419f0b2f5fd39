//! Donor directory route handlers.
//!
//! The list is rendered from the session cache; mutations go through
//! [`crate::services::DirectoryService`], which checks the role before any
//! remote call.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;

use donor_finder_core::{
    BloodGroup, DirectoryFilter, Donor, DonorId, GroupFilter, filter_donors, latest_last_donated,
};

use super::expire_session;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireSession;
use crate::models::{Flash, SessionContext};
use crate::services::directory::{ADD_FORBIDDEN, DELETE_FORBIDDEN};
use crate::services::{DeleteOutcome, DirectoryError, DonorForm, IdentityError};
use crate::state::AppState;

/// Alert shown after a successful add.
pub const ADDED_MESSAGE: &str = "Donor Added Successfully!";
/// Alert shown after a successful delete.
pub const DELETED_MESSAGE: &str = "Donor deleted.";

// =============================================================================
// Query / Form Types
// =============================================================================

/// List query parameters. Absent values keep the remembered filter.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub group: Option<String>,
    pub q: Option<String>,
}

/// Delete confirmation answer.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub confirm: String,
}

impl ConfirmForm {
    fn accepted(&self) -> bool {
        self.confirm == "yes"
    }
}

// =============================================================================
// View Models
// =============================================================================

/// A filter chip.
pub struct GroupChip {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

/// A rendered donor card.
pub struct DonorCard {
    pub id: String,
    pub name: String,
    pub group: String,
    pub city: String,
    pub phone: String,
    pub last_donated: String,
    pub tel_href: String,
    pub chat_href: String,
}

impl From<&Donor> for DonorCard {
    fn from(donor: &Donor) -> Self {
        Self {
            id: donor.id.to_string(),
            name: donor.name_or_empty().to_string(),
            group: donor.group_or_empty().to_string(),
            city: donor.city_or_empty().to_string(),
            phone: donor.phone.clone().unwrap_or_default(),
            last_donated: donor.last_donated.to_string(),
            tel_href: donor.tel_href(),
            chat_href: donor.chat_href(),
        }
    }
}

fn list_href(group: GroupFilter, search: &str) -> String {
    let mut href = format!("/donors?group={}", urlencoding::encode(group.as_str()));
    if !search.is_empty() {
        href.push_str("&q=");
        href.push_str(&urlencoding::encode(search));
    }
    href
}

fn group_chips(filter: &DirectoryFilter) -> Vec<GroupChip> {
    std::iter::once(GroupFilter::All)
        .chain(BloodGroup::ALL.into_iter().map(GroupFilter::Group))
        .map(|group| GroupChip {
            label: group.as_str(),
            href: list_href(group, &filter.search),
            active: group == filter.group,
        })
        .collect()
}

/// A blood group option in the add form.
pub struct GroupOption {
    pub value: &'static str,
    pub selected: bool,
}

fn group_options(selected: &str) -> Vec<GroupOption> {
    BloodGroup::ALL
        .iter()
        .map(|g| GroupOption {
            value: g.as_str(),
            selected: g.as_str() == selected,
        })
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

/// Donor list page.
#[derive(Template, WebTemplate)]
#[template(path = "donors/index.html")]
pub struct DonorListTemplate {
    pub email: String,
    pub role_label: &'static str,
    pub role_class: &'static str,
    pub can_add: bool,
    pub can_delete: bool,
    pub chips: Vec<GroupChip>,
    pub active_group: &'static str,
    pub search: String,
    pub donors: Vec<DonorCard>,
    pub total: usize,
    pub load_error: Option<String>,
    pub flash: Option<Flash>,
}

impl DonorListTemplate {
    fn new(ctx: &mut SessionContext) -> Self {
        let donors: Vec<DonorCard> = filter_donors(ctx.cache.donors(), &ctx.filter)
            .into_iter()
            .map(DonorCard::from)
            .collect();

        Self {
            email: ctx.identity.email.to_string(),
            role_label: ctx.role.badge_label(),
            role_class: ctx.role.badge_class(),
            can_add: ctx.role.can_add_donors(),
            can_delete: ctx.role.can_delete_donors(),
            chips: group_chips(&ctx.filter),
            active_group: ctx.filter.group.as_str(),
            search: ctx.filter.search.clone(),
            donors,
            total: ctx.cache.donors().len(),
            load_error: ctx.cache.error().map(str::to_string),
            flash: ctx.take_flash(),
        }
    }
}

/// Add donor form.
#[derive(Template, WebTemplate)]
#[template(path = "donors/new.html")]
pub struct DonorFormTemplate {
    pub form: DonorForm,
    pub groups: Vec<GroupOption>,
    /// Upper bound for the last-donated date picker.
    pub max_last_donated: String,
    pub error: Option<String>,
}

impl DonorFormTemplate {
    fn new(form: DonorForm, error: Option<String>) -> Self {
        Self {
            groups: group_options(&form.group),
            form,
            max_last_donated: latest_last_donated(Utc::now()).to_string(),
            error,
        }
    }
}

/// Delete confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "donors/confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub id: String,
    /// Name from the cache, when the donor is still listed.
    pub name: Option<String>,
}

// =============================================================================
// Routes
// =============================================================================

/// Show the donor list.
///
/// Query parameters update the remembered filter. A cache that is not loaded
/// (or failed last time) is loaded first.
pub async fn index(
    State(state): State<AppState>,
    mut signed_in: RequireSession,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let ctx = &mut signed_in.ctx;
    if let Some(group) = query.group {
        ctx.filter.group = GroupFilter::from_query(Some(&group));
    }
    if let Some(q) = query.q {
        ctx.filter.search = q;
    }
    if ctx.cache.needs_load() {
        state.directory().load(ctx).await;
    }

    let page = DonorListTemplate::new(ctx);
    signed_in.save().await?;
    Ok(page.into_response())
}

/// Force a reload of the directory.
pub async fn refresh(
    State(state): State<AppState>,
    mut signed_in: RequireSession,
) -> Result<Redirect> {
    state.directory().load(&mut signed_in.ctx).await;
    signed_in.save().await?;
    Ok(Redirect::to("/donors"))
}

/// Show the add donor form.
pub async fn new_form(signed_in: RequireSession) -> Result<Response> {
    if !signed_in.ctx.role.can_add_donors() {
        return Err(AppError::Forbidden(ADD_FORBIDDEN.to_string()));
    }
    Ok(DonorFormTemplate::new(DonorForm::default(), None).into_response())
}

/// Handle the add donor form.
///
/// Invalid input and remote failures re-render the form with the entered
/// values.
pub async fn create(
    State(state): State<AppState>,
    mut signed_in: RequireSession,
    Form(form): Form<DonorForm>,
) -> Result<Response> {
    let result = state
        .directory()
        .add(&mut signed_in.ctx, &form, Utc::now())
        .await;

    let response = match result {
        Ok(id) => {
            if let Some(id) = id {
                add_breadcrumb("directory", "Donor added", &[("donor_id", id.as_str())]);
            }
            signed_in.ctx.set_flash(Flash::success(ADDED_MESSAGE));
            Redirect::to("/donors").into_response()
        }
        Err(DirectoryError::Invalid(e)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            DonorFormTemplate::new(form, Some(e.to_string())),
        )
            .into_response(),
        Err(DirectoryError::Identity(e)) if is_expired(&e) => {
            return Ok(expire_session(&signed_in.session).await);
        }
        Err(DirectoryError::Identity(e)) => (
            StatusCode::BAD_GATEWAY,
            DonorFormTemplate::new(form, Some(format!("Error adding donor: {e}"))),
        )
            .into_response(),
        Err(DirectoryError::Store(e)) => (
            StatusCode::BAD_GATEWAY,
            DonorFormTemplate::new(form, Some(format!("Error adding donor: {e}"))),
        )
            .into_response(),
        Err(e @ DirectoryError::Unauthorized(_)) => return Err(e.into()),
    };

    signed_in.save().await?;
    Ok(response)
}

/// Show the delete confirmation page.
pub async fn confirm_delete(signed_in: RequireSession, Path(id): Path<String>) -> Result<Response> {
    if !signed_in.ctx.role.can_delete_donors() {
        return Err(AppError::Forbidden(DELETE_FORBIDDEN.to_string()));
    }
    let id = DonorId::parse(&id).map_err(|_| AppError::NotFound("Donor".to_string()))?;
    let name = signed_in
        .ctx
        .cache
        .donors()
        .iter()
        .find(|d| d.id == id)
        .map(|d| d.name_or_empty().to_string());

    Ok(ConfirmDeleteTemplate {
        id: id.to_string(),
        name,
    }
    .into_response())
}

/// Handle the delete confirmation.
///
/// Only `confirm=yes` deletes; any other answer returns to the list without a
/// remote call.
pub async fn delete(
    State(state): State<AppState>,
    mut signed_in: RequireSession,
    Path(id): Path<String>,
    Form(answer): Form<ConfirmForm>,
) -> Result<Response> {
    let Ok(id) = DonorId::parse(&id) else {
        return Err(if signed_in.ctx.role.can_delete_donors() {
            AppError::NotFound("Donor".to_string())
        } else {
            AppError::Forbidden(DELETE_FORBIDDEN.to_string())
        });
    };

    let result = state
        .directory()
        .delete(&mut signed_in.ctx, &id, answer.accepted())
        .await;

    match result {
        Ok(DeleteOutcome::Deleted) => {
            add_breadcrumb("directory", "Donor deleted", &[("donor_id", id.as_str())]);
            signed_in.ctx.set_flash(Flash::success(DELETED_MESSAGE));
        }
        Ok(DeleteOutcome::Declined) => {}
        Err(DirectoryError::Identity(e)) if is_expired(&e) => {
            return Ok(expire_session(&signed_in.session).await);
        }
        Err(DirectoryError::Identity(e)) => {
            signed_in.ctx.set_flash(Flash::error(format!("Delete failed: {e}")));
        }
        Err(DirectoryError::Store(e)) => {
            signed_in.ctx.set_flash(Flash::error(format!("Delete failed: {e}")));
        }
        Err(e) => return Err(e.into()),
    }

    signed_in.save().await?;
    Ok(Redirect::to("/donors").into_response())
}

const fn is_expired(err: &IdentityError) -> bool {
    matches!(err, IdentityError::SessionExpired)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_chips_cover_all_groups_and_mark_active() {
        let filter = DirectoryFilter::new(GroupFilter::Group(BloodGroup::AbPositive), "mum");
        let chips = group_chips(&filter);
        assert_eq!(chips.len(), 9);
        assert_eq!(chips[0].label, "All");
        let active: Vec<_> = chips.iter().filter(|c| c.active).map(|c| c.label).collect();
        assert_eq!(active, vec!["AB+"]);
        assert_eq!(chips[0].href, "/donors?group=All&q=mum");
    }

    #[test]
    fn test_list_href_encodes_plus() {
        assert_eq!(
            list_href(GroupFilter::Group(BloodGroup::OPositive), ""),
            "/donors?group=O%2B"
        );
    }

    #[test]
    fn test_confirm_requires_yes() {
        assert!(ConfirmForm { confirm: "yes".to_string() }.accepted());
        assert!(!ConfirmForm { confirm: "no".to_string() }.accepted());
        assert!(!ConfirmForm::default().accepted());
    }
}
