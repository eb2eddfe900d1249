//! Store page handlers: listing, detail, add and edit.
//!
//! Submissions run as one explicit pipeline:
//! [`read_submission`] (upload filter) → [`ImageResizer::process`] →
//! [`StoreService`]. Validation and ownership failures come back as flash
//! messages on a redirect; anything else is an [`AppError`].
//!
//! [`ImageResizer::process`]: crate::services::ImageResizer::process
//! [`StoreService`]: crate::services::StoreService

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use delicious_core::StoreId;

use super::viewer;
use super::views::{PageContext, StoreForm, StoreView, TAG_CHOICES};
use crate::error::{AppError, Result};
use crate::middleware::{Flash, FlashLevel, OptionalAuth, RequireAuth};
use crate::models::StoreInput;
use crate::services::uploads::{REJECTED_FILETYPE, accept_content_type};
use crate::services::{PhotoUpload, UploadError};
use crate::state::AppState;

/// Store listing page.
#[derive(Template, WebTemplate)]
#[template(path = "stores.html")]
pub struct StoresTemplate {
    pub page: PageContext,
    pub stores: Vec<StoreView>,
}

/// Store detail page.
#[derive(Template, WebTemplate)]
#[template(path = "store.html")]
pub struct StoreTemplate {
    pub page: PageContext,
    pub store: StoreView,
    pub author_name: Option<String>,
}

/// Add / edit form.
#[derive(Template, WebTemplate)]
#[template(path = "edit_store.html")]
pub struct EditStoreTemplate {
    pub page: PageContext,
    pub form: StoreForm,
    pub tag_choices: &'static [&'static str],
}

/// `GET /` and `GET /stores`
#[tracing::instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    flash: Flash,
) -> Result<StoresTemplate> {
    let stores = state.store_service().list().await?;
    let viewer = viewer(&state, user.as_ref()).await?;

    Ok(StoresTemplate {
        stores: stores
            .iter()
            .map(|s| StoreView::new(s, viewer.as_ref()))
            .collect(),
        page: PageContext::new("Stores", user, flash.take().await),
    })
}

/// `GET /store/{slug}`
#[tracing::instrument(skip_all, fields(slug = %slug))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    OptionalAuth(user): OptionalAuth,
    flash: Flash,
) -> Result<StoreTemplate> {
    let detail = state.store_service().get_by_slug(&slug).await?;
    let viewer = viewer(&state, user.as_ref()).await?;

    Ok(StoreTemplate {
        store: StoreView::new(&detail.store, viewer.as_ref()),
        author_name: detail.author.map(|a| a.name),
        page: PageContext::new(detail.store.name, user, flash.take().await),
    })
}

/// `GET /add`
pub async fn new_store(RequireAuth(user): RequireAuth, flash: Flash) -> EditStoreTemplate {
    EditStoreTemplate {
        page: PageContext::new("Add Store", Some(user), flash.take().await),
        form: StoreForm::default(),
        tag_choices: &TAG_CHOICES,
    }
}

/// `POST /add`
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
    multipart: Multipart,
) -> Result<Redirect> {
    let created = async {
        let (mut input, photo) = read_submission(multipart).await?;
        input.photo = state.resizer().process(photo).await?;
        Ok::<_, AppError>(state.store_service().create(input, user.id).await?)
    }
    .await;

    match created {
        Ok(store) => {
            flash
                .push(
                    FlashLevel::Success,
                    format!("Successfully created {}. Care to leave a review?", store.name),
                )
                .await?;
            Ok(Redirect::to(&format!("/store/{}", store.slug)))
        }
        Err(err) => recover(&flash, err, "/add").await,
    }
}

/// `GET /stores/{id}/edit`
#[tracing::instrument(skip_all, fields(store_id = %id))]
pub async fn edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
) -> Result<Response> {
    let id = parse_store_id(&id)?;

    match state.store_service().get_for_edit(id, user.id).await {
        Ok(store) => Ok(EditStoreTemplate {
            page: PageContext::new(format!("Edit {}", store.name), Some(user), flash.take().await),
            form: StoreForm::from_store(&store),
            tag_choices: &TAG_CHOICES,
        }
        .into_response()),
        Err(err) => Ok(recover(&flash, err.into(), "/stores").await?.into_response()),
    }
}

/// `POST /add/{id}`
#[tracing::instrument(skip_all, fields(store_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
    multipart: Multipart,
) -> Result<Redirect> {
    let id = parse_store_id(&id)?;
    let back = format!("/stores/{id}/edit");

    let updated = async {
        let (mut input, photo) = read_submission(multipart).await?;
        input.photo = state.resizer().process(photo).await?;
        Ok::<_, AppError>(state.store_service().update(id, input, user.id).await?)
    }
    .await;

    match updated {
        Ok(store) => {
            flash
                .push(
                    FlashLevel::Success,
                    format!("Successfully updated {}.", store.name),
                )
                .await?;
            Ok(Redirect::to(&back))
        }
        Err(err) => recover(&flash, err, &back).await,
    }
}

/// Parse a store ID from the path. Malformed IDs are simply not found.
fn parse_store_id(raw: &str) -> Result<StoreId> {
    raw.parse()
        .map_err(|_| AppError::NotFound("store".to_string()))
}

/// Turn user-facing failures into error flashes and a redirect.
///
/// Validation problems go back to `back`; ownership failures go to the
/// store list. Every other error is returned unchanged.
async fn recover(flash: &Flash, err: AppError, back: &str) -> Result<Redirect> {
    let (messages, target): (Vec<String>, &str) = match &err {
        AppError::Validation(e) | AppError::Upload(UploadError::Rejected(e)) => {
            (e.messages().map(str::to_owned).collect(), back)
        }
        AppError::Upload(UploadError::UnsupportedFormat(_)) => {
            (vec![REJECTED_FILETYPE.to_owned()], back)
        }
        AppError::Forbidden(msg) => (vec![msg.clone()], "/stores"),
        _ => return Err(err),
    };

    tracing::info!(error = %err, redirect = target, "Submission refused");
    for message in messages {
        flash.push(FlashLevel::Error, message).await?;
    }
    Ok(Redirect::to(target))
}

/// Read the multipart store form.
///
/// The photo's declared content type is checked before its body is read.
/// An empty file input (no filename) means no photo.
///
/// # Errors
///
/// Returns `AppError::Validation` for a non-image photo,
/// `AppError::PayloadTooLarge` once the body limit is hit and
/// `AppError::BadRequest` for a malformed body.
pub async fn read_submission(
    mut multipart: Multipart,
) -> Result<(StoreInput, Option<PhotoUpload>)> {
    let mut input = StoreInput::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_owned();

        if name == "photo" {
            if field.file_name().is_none_or(str::is_empty) {
                continue;
            }
            let content_type = field.content_type().unwrap_or_default().to_owned();
            accept_content_type(&content_type)?;

            let bytes = field.bytes().await.map_err(bad_multipart)?;
            if !bytes.is_empty() {
                photo = Some(PhotoUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await.map_err(bad_multipart)?;
        match name.as_str() {
            "name" => input.name = value,
            "description" => input.description = value,
            "tags" => input.tags.push(value),
            "location[address]" => input.address = value,
            "location[coordinates][0]" => input.longitude = value,
            "location[coordinates][1]" => input.latitude = value,
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok((input, photo))
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
