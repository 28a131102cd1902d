use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
};
use tracing::info;

use blog_db::queries;
use blog_types::api::{CardForm, CardResponse};

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::policy::{Action, Resource, authorize};
use crate::state::{AppState, db_task};
use crate::views::card_response;

const CARDS_PATH: &str = "/cards";

/// GET /cards: newest first, authors included, markup rendered per response.
pub async fn list_cards(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<CardResponse>>, ApiError> {
    authorize(&user, Action::Read, Resource::Cards).require()?;

    let rows = db_task(&state, |db| Ok(db.list_cards()?)).await?;
    let cards = rows.into_iter().map(|row| card_response(row, None)).collect();
    Ok(Json(cards))
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<CardResponse>, ApiError> {
    let (row, media) = db_task(&state, move |db| {
        let row = db.get_card(card_id)?.ok_or(ApiError::NotFound("Card"))?;
        let media = db.get_card_media(card_id)?;
        Ok((row, media))
    })
    .await?;

    authorize(&user, Action::Read, Resource::Card { author_id: row.author_id }).require()?;
    Ok(Json(card_response(row, Some(media))))
}

pub async fn create_card(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<CardForm>,
) -> Result<Redirect, ApiError> {
    authorize(&user, Action::Create, Resource::Cards).require()?;

    let author_id = user.id;
    let card_id = db_task(&state, move |db| {
        Ok(db.with_conn(|conn| {
            queries::insert_card(
                conn,
                &form.title,
                &form.content,
                author_id,
                form.is_to_all(),
                &queries::now_timestamp(),
            )
        })?)
    })
    .await?;

    info!("Card {} created by {}", card_id, user.username);
    Ok(Redirect::to(CARDS_PATH))
}

/// PUT or POST /cards/{id}. Browser forms cannot send PUT, so both land here.
pub async fn update_card(
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<CardForm>,
) -> Result<Redirect, ApiError> {
    let caller = user.clone();
    db_task(&state, move |db| {
        db.transaction(|tx| {
            let card = queries::card_by_id(tx, card_id)?.ok_or(ApiError::NotFound("Card"))?;
            authorize(&caller, Action::Update, Resource::Card { author_id: card.author_id })
                .require()?;
            queries::update_card(tx, card_id, &form.title, &form.content, &queries::now_timestamp())?;
            Ok(())
        })
    })
    .await?;

    info!("Card {} updated by {}", card_id, user.username);
    Ok(Redirect::to(CARDS_PATH))
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    let caller = user.clone();
    db_task(&state, move |db| {
        db.transaction(|tx| {
            let card = queries::card_by_id(tx, card_id)?.ok_or(ApiError::NotFound("Card"))?;
            authorize(&caller, Action::Delete, Resource::Card { author_id: card.author_id })
                .require()?;
            queries::delete_card(tx, card_id)?;
            Ok(())
        })
    })
    .await?;

    info!("Card {} deleted by {}", card_id, user.username);
    Ok(StatusCode::NO_CONTENT)
}
