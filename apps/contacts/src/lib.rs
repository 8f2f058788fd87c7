#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use axum::extract::{Form, Path, Request, State};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod config;
pub mod contacts;
pub mod db;
pub mod session;
pub mod web_maud;

use crate::config::{Config, ConfigError, StoreDriver};
use crate::contacts::filter::{CLEAR_SENTINEL, CategoryFilter};
use crate::contacts::store::{self, ContactBackend, ContactStoreError};
use crate::contacts::types::{Contact, ContactId, ContactInput};
use crate::contacts::validation;
use crate::db::ContactsDb;
use crate::session::{SessionHandle, SessionRegistry};
use crate::web_maud::{
    CategoryOptionView, ContactDetailView, ContactRowView, WebBody, WebPage, render_page,
};

const SERVICE_NAME: &str = "contacts-service";
const SESSION_COOKIE_NAME: &str = "contacts_session";
const CONTACTS_PATH: &str = "/contacts";
const NOT_FOUND_PATH: &str = "/notfound";
const CONTACT_NOT_FOUND_MESSAGE: &str = "The specified contact was not found.";
const CLEAR_CATEGORY_LABEL: &str = "All";

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    backend: ContactBackend,
    sessions: SessionRegistry,
    started_at: SystemTime,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    store: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct CategoryFilterForm {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum WebError {
    #[error(transparent)]
    Store(#[from] ContactStoreError),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        tracing::error!(reason = %self, "contacts request failed");
        let page = WebPage {
            title: "Error".to_string(),
            path: String::new(),
            body: WebBody::ServerError {
                message: "The contact store is unavailable. Try again later.".to_string(),
            },
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Html(render_page(&page))).into_response()
    }
}

/// Opens the configured contact backend. The postgres variant connects and
/// bootstraps its table before the first request.
pub async fn build_backend(config: &Config) -> Result<ContactBackend> {
    match config.store_driver {
        StoreDriver::Session => Ok(ContactBackend::Session),
        StoreDriver::Postgres => {
            let url = config
                .db_url
                .as_deref()
                .ok_or(ConfigError::MissingDatabaseUrl)?;
            let db = Arc::new(ContactsDb::connect(url).await?);
            let store = store::postgres(db).await?;
            Ok(ContactBackend::Postgres(store))
        }
    }
}

pub fn build_router(config: Config, backend: ContactBackend) -> Router {
    let state = AppState {
        sessions: SessionRegistry::new(
            Duration::from_secs(config.session_ttl_seconds),
            config.max_sessions,
        ),
        config: Arc::new(config),
        backend,
        started_at: SystemTime::now(),
    };
    let session_state = state.clone();

    let contact_routes = Router::new()
        .route("/", get(root_redirect))
        .route(
            CONTACTS_PATH,
            get(contacts_index).post(contacts_filter),
        )
        .route("/contacts/new", get(new_contact_form).post(create_contact))
        .route("/contacts/:id", get(show_contact))
        .route("/contacts/:id/edit", get(edit_contact_form).post(update_contact))
        .route("/contacts/:id/delete", post(delete_contact))
        .route(NOT_FOUND_PATH, get(not_found_page))
        .route_layer(middleware::from_fn_with_state(session_state, session_gate));

    Router::new()
        .route("/healthz", get(health))
        .merge(contact_routes)
        .method_not_allowed_fallback(unmatched_redirect)
        .fallback(unmatched_redirect)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http()),
        )
}

pub async fn build_app(config: Config) -> Result<Router> {
    let backend = build_backend(&config).await?;
    Ok(build_router(config, backend))
}

pub async fn serve(config: Config) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        service = SERVICE_NAME,
        bind_addr = %config.bind_addr,
        store = config.store_driver.as_str(),
        "contacts service listening"
    );
    axum::serve(listener, build_app(config).await?).await?;
    Ok(())
}

async fn session_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let cookie = extract_cookie_value(request.headers(), SESSION_COOKIE_NAME);
    let resolved = state.sessions.resolve(cookie.as_deref()).await;
    request.extensions_mut().insert(resolved.handle.clone());

    let mut response = next.run(request).await;
    if resolved.is_new {
        let cookie = session_cookie(&resolved.id, state.sessions.ttl().as_secs());
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(error) => tracing::warn!(reason = %error, "session cookie not representable"),
        }
    }
    response
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = match state.started_at.elapsed() {
        Ok(duration) => duration.as_secs(),
        Err(_) => 0,
    };

    let status = if state.backend.is_available().await {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        store: state.backend.as_str(),
        uptime_seconds,
    })
}

async fn root_redirect() -> Response {
    redirect_found(CONTACTS_PATH)
}

async fn unmatched_redirect() -> Response {
    redirect_found(NOT_FOUND_PATH)
}

async fn not_found_page() -> Response {
    let page = WebPage {
        title: "Not found".to_string(),
        path: NOT_FOUND_PATH.to_string(),
        body: WebBody::NotFound,
    };
    (StatusCode::NOT_FOUND, Html(render_page(&page))).into_response()
}

async fn contacts_index(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Response, WebError> {
    render_contact_list(&state, &session).await
}

async fn contacts_filter(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Form(form): Form<CategoryFilterForm>,
) -> Result<Response, WebError> {
    {
        let mut guard = session.lock().await;
        match form.category {
            Some(category) => guard.category.set(category),
            None => guard.category.clear(),
        }
        tracing::debug!(category = ?guard.category.get(), "category filter updated");
    }
    render_contact_list(&state, &session).await
}

async fn new_contact_form(State(state): State<AppState>) -> Response {
    render_new_form(&state, Vec::new(), ContactInput::default())
}

async fn create_contact(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Form(input): Form<ContactInput>,
) -> Result<Response, WebError> {
    if let Err(error) = validation::validate(&input) {
        tracing::debug!(errors = error.messages.len(), "contact rejected");
        return Ok(render_new_form(&state, error.messages, input));
    }

    let contact_store = state.backend.store_for(&session);
    let id = contact_store.add_contact(input.normalized()).await?;
    info!(contact_id = id, store = state.backend.as_str(), "contact added");
    Ok(redirect_found(CONTACTS_PATH))
}

async fn show_contact(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path(raw_id): Path<String>,
) -> Result<Response, WebError> {
    let Some(contact) = load_contact(&state, &session, &raw_id).await? else {
        return Ok(contact_not_found(&session).await);
    };

    let page = WebPage {
        title: contact.full_name(),
        path: format!("/contacts/{}", contact.id),
        body: WebBody::ContactDetail(ContactDetailView {
            id: contact.id,
            name: contact.full_name(),
            email: contact.email.clone(),
            phone: contact.phone.replace('-', " "),
            category: contact.category.clone(),
        }),
    };
    Ok(Html(render_page(&page)).into_response())
}

async fn edit_contact_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path(raw_id): Path<String>,
) -> Result<Response, WebError> {
    let Some(contact) = load_contact(&state, &session, &raw_id).await? else {
        return Ok(contact_not_found(&session).await);
    };
    Ok(render_edit_form(&state, contact.id, Vec::new(), contact.fields()))
}

async fn update_contact(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path(raw_id): Path<String>,
    Form(input): Form<ContactInput>,
) -> Result<Response, WebError> {
    let Some(id) = parse_contact_id(&raw_id) else {
        return Ok(contact_not_found(&session).await);
    };
    let contact_store = state.backend.store_for(&session);

    if let Err(error) = validation::validate(&input) {
        if contact_store.single_contact(id).await?.is_none() {
            return Ok(contact_not_found(&session).await);
        }
        return Ok(render_edit_form(&state, id, error.messages, input));
    }

    if !contact_store
        .update_single_contact(id, input.normalized())
        .await?
    {
        return Ok(contact_not_found(&session).await);
    }
    info!(contact_id = id, store = state.backend.as_str(), "contact updated");
    Ok(redirect_found(&format!("/contacts/{id}")))
}

async fn delete_contact(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path(raw_id): Path<String>,
) -> Result<Response, WebError> {
    if let Some(id) = parse_contact_id(&raw_id) {
        let deleted = state.backend.store_for(&session).delete_contact(id).await?;
        info!(contact_id = id, deleted, store = state.backend.as_str(), "contact delete");
    }
    Ok(redirect_found(CONTACTS_PATH))
}

async fn render_contact_list(state: &AppState, session: &SessionHandle) -> Result<Response, WebError> {
    // The session store locks the session too, so read contacts before taking the guard.
    let contacts = state.backend.store_for(session).all_contacts().await?;

    let mut guard = session.lock().await;
    let mut categories = category_options(&state.config.categories, &guard.category);
    categories.push(CategoryOptionView {
        value: CLEAR_SENTINEL.to_string(),
        label: CLEAR_CATEGORY_LABEL.to_string(),
        checked: guard.category.is_checked(CLEAR_SENTINEL),
    });
    let contacts = guard.category.apply(contacts);
    let flash_error = guard.take_flash_error();
    drop(guard);

    let page = WebPage {
        title: "Contacts".to_string(),
        path: CONTACTS_PATH.to_string(),
        body: WebBody::ContactList {
            flash_error,
            contacts: contacts.iter().map(contact_row).collect(),
            categories,
        },
    };
    Ok(Html(render_page(&page)).into_response())
}

fn render_new_form(state: &AppState, errors: Vec<String>, form: ContactInput) -> Response {
    let page = WebPage {
        title: "New contact".to_string(),
        path: "/contacts/new".to_string(),
        body: WebBody::NewContact {
            categories: form_category_options(&state.config.categories, &form.category),
            errors,
            form,
        },
    };
    Html(render_page(&page)).into_response()
}

fn render_edit_form(
    state: &AppState,
    id: ContactId,
    errors: Vec<String>,
    form: ContactInput,
) -> Response {
    let page = WebPage {
        title: "Edit contact".to_string(),
        path: format!("/contacts/{id}/edit"),
        body: WebBody::EditContact {
            id,
            categories: form_category_options(&state.config.categories, &form.category),
            errors,
            form,
        },
    };
    Html(render_page(&page)).into_response()
}

async fn load_contact(
    state: &AppState,
    session: &SessionHandle,
    raw_id: &str,
) -> Result<Option<Contact>, WebError> {
    let Some(id) = parse_contact_id(raw_id) else {
        return Ok(None);
    };
    Ok(state.backend.store_for(session).single_contact(id).await?)
}

async fn contact_not_found(session: &SessionHandle) -> Response {
    session
        .lock()
        .await
        .set_flash_error(CONTACT_NOT_FOUND_MESSAGE);
    redirect_found(CONTACTS_PATH)
}

fn parse_contact_id(raw: &str) -> Option<ContactId> {
    raw.trim().parse::<ContactId>().ok()
}

fn contact_row(contact: &Contact) -> ContactRowView {
    ContactRowView {
        id: contact.id,
        name: contact.full_name(),
        email: contact.email.clone(),
        phone: contact.phone.clone(),
        category: contact.category.clone(),
    }
}

fn category_options(categories: &[String], filter: &CategoryFilter) -> Vec<CategoryOptionView> {
    categories
        .iter()
        .map(|category| CategoryOptionView {
            value: category.clone(),
            label: category.clone(),
            checked: filter.is_checked(category),
        })
        .collect()
}

fn form_category_options(categories: &[String], selected: &str) -> Vec<CategoryOptionView> {
    categories
        .iter()
        .map(|category| CategoryOptionView {
            value: category.clone(),
            label: category.clone(),
            checked: category == selected,
        })
        .collect()
}

fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn session_cookie(session_id: &str, max_age_seconds: u64) -> String {
    format!(
        "{SESSION_COOKIE_NAME}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    )
}

fn extract_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for part in raw.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if key.trim() == cookie_name && !value.is_empty() {
            return Some(value.to_string());
        }
    }

    None
}
