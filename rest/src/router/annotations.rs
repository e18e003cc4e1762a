use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use journal::repository::AnnotationRepository;
use models::{annotation::Annotation, Note, Setup, Tag};
use serde::{de::DeserializeOwned, Serialize};

use crate::{error::AppError, AppState};

pub fn create_router() -> Router<AppState> {
    let router = Router::new()
        .route("/notes", get(list::<Note>).put(upsert::<Note>))
        .route("/notes/:id", delete(remove::<Note>))
        .route("/setups", get(list::<Setup>).put(upsert::<Setup>))
        .route("/setups/:id", delete(remove::<Setup>))
        .route("/tags", get(list::<Tag>).put(upsert::<Tag>))
        .route("/tags/:id", delete(remove::<Tag>));

    return router;
}

trait Collection<T> {
    fn collection(&self) -> &AnnotationRepository<T>;
}

impl Collection<Note> for AppState {
    fn collection(&self) -> &AnnotationRepository<Note> {
        return &self.notes;
    }
}

impl Collection<Setup> for AppState {
    fn collection(&self) -> &AnnotationRepository<Setup> {
        return &self.setups;
    }
}

impl Collection<Tag> for AppState {
    fn collection(&self) -> &AnnotationRepository<Tag> {
        return &self.tags;
    }
}

async fn list<T>(State(state): State<AppState>) -> Result<Json<Vec<T>>, AppError>
where
    T: Annotation + Serialize + DeserializeOwned + Send + 'static,
    AppState: Collection<T>,
{
    return Ok(Json(state.collection().list().await?));
}

async fn upsert<T>(
    State(state): State<AppState>,
    Json(record): Json<T>,
) -> Result<Json<T>, AppError>
where
    T: Annotation + Serialize + DeserializeOwned + Send + 'static,
    AppState: Collection<T>,
{
    return Ok(Json(state.collection().upsert(record).await?));
}

async fn remove<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError>
where
    T: Annotation + Serialize + DeserializeOwned + Send + 'static,
    AppState: Collection<T>,
{
    state.collection().delete(&id).await?;
    return Ok(StatusCode::NO_CONTENT);
}
