use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::info;
use validator::Validate;

use orderhub_db::models::{ContactChanges, NewContact, UserChanges};
use orderhub_types::api::{
    Claims, CreateContactRequest, DeleteItemsRequest, UpdateAccountRequest, UpdateContactRequest,
};

use crate::auth::{hash_password, validate_password};
use crate::error::AppError;
use crate::extract::Json;
use crate::{AppState, blocking, views};

// -- Details --

pub async fn get_details(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = blocking(&state, move |s| {
        let row = s
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        let contacts = s.db.list_contacts(row.id)?;
        Ok(views::user(row, contacts))
    })
    .await?;

    Ok(Json(user))
}

pub async fn update_details(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    if let Some(password) = &req.password {
        let email = req.email.as_deref().unwrap_or(&claims.email);
        validate_password(password, email)?;
    }

    let user_id = claims.sub;
    blocking(&state, move |s| {
        if let Some(email) = &req.email {
            let taken = s
                .db
                .get_user_by_email(email.trim())?
                .is_some_and(|other| other.id != user_id);
            if taken {
                return Err(AppError::field("email", "User with this email already exists."));
            }
        }

        let changes = UserChanges {
            email: req.email.map(|e| e.trim().to_string()),
            password_hash: req.password.as_deref().map(hash_password).transpose()?,
            first_name: req.first_name,
            last_name: req.last_name,
            company: req.company,
            position: req.position,
        };
        if !s.db.update_user(user_id, &changes).map_err(AppError::from_db)? {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    })
    .await?;

    info!("Updated details of user {}", user_id);
    Ok(Json(json!({
        "status": true,
        "message": format!("user with id: {}, details updated", user_id),
    })))
}

// -- Contacts --

pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = blocking(&state, move |s| Ok(s.db.list_contacts(claims.sub)?)).await?;
    Ok(Json(rows.into_iter().map(views::contact).collect::<Vec<_>>()))
}

pub async fn create_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let contact = NewContact {
        city: req.city,
        street: req.street,
        house: req.house,
        structure: req.structure,
        building: req.building,
        apartment: req.apartment,
        phone: req.phone,
    };
    let id = blocking(&state, move |s| {
        s.db.create_contact(claims.sub, &contact).map_err(AppError::from_db)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": true, "message": "contacts created", "id": id })),
    ))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let id = req.id;
    let changes = ContactChanges {
        city: req.city,
        street: req.street,
        house: req.house,
        structure: req.structure,
        building: req.building,
        apartment: req.apartment,
        phone: req.phone,
    };
    let updated = blocking(&state, move |s| Ok(s.db.update_contact(claims.sub, id, &changes)?)).await?;

    if !updated {
        return Err(AppError::NotFound(format!("Contact {} not found", id)));
    }
    Ok(Json(json!({ "status": true })))
}

pub async fn delete_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeleteItemsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ids = req.ids();
    if ids.is_empty() {
        return Err(AppError::InvalidArguments);
    }

    let deleted = blocking(&state, move |s| Ok(s.db.delete_contacts(claims.sub, &ids)?)).await?;
    Ok(Json(json!({ "status": true, "deleted_count": deleted })))
}
