pub mod bills;
pub mod navigator;
pub mod new_bill;
pub mod template;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::services::ServeDir;

use crate::{
    config::Config,
    session::{current_user, CookieSession, User, USER_KEY},
    store::{Store, StoreError},
};
use navigator::Route;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub t: template::Template,
    pub allowed_extensions: Arc<[String]>,
}

/// Failure of a controller action. Displays as the text shown to the user.
#[derive(Debug, Error)]
pub enum BillsError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Erreur 401")]
    MissingUser,
    #[error("Erreur 400")]
    BadForm,
}

impl BillsError {
    pub fn status(&self) -> StatusCode {
        match self {
            BillsError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            BillsError::Store(StoreError::Server) => StatusCode::INTERNAL_SERVER_ERROR,
            BillsError::Store(StoreError::Rejected(_)) | BillsError::BadForm => {
                StatusCode::BAD_REQUEST
            }
            BillsError::MissingUser => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Which icon of the vertical layout is highlighted.
#[derive(Serialize, Default)]
pub struct Layout {
    bills_active: bool,
    new_bill_active: bool,
}

impl Layout {
    pub fn for_route(route: Route) -> Self {
        Self {
            bills_active: route == Route::Bills,
            new_bill_active: route == Route::NewBill,
        }
    }
}

/// Error view carrying the failure message verbatim.
pub struct ErrorPage(Response);

impl ErrorPage {
    pub fn new(err: &BillsError, route: Route, s: &AppState) -> ErrorPage {
        #[derive(Serialize)]
        struct Ctx {
            layout: Layout,
            error: String,
        }

        let ctx = Ctx {
            layout: Layout::for_route(route),
            error: err.to_string(),
        };

        Self(s.t.page(err.status(), "error", &ctx))
    }
}

impl IntoResponse for ErrorPage {
    fn into_response(self) -> Response {
        self.0
    }
}

pub fn app(state: AppState, uploads_dir: &Path) -> Router {
    Router::new()
        .route("/", get(login).post(login_post))
        .nest(
            "/employee",
            Router::new()
                .merge(bills::new_router())
                .merge(new_bill::new_router()),
        )
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .with_state(state)
}

pub async fn start_web_server(config: Config, store: Arc<dyn Store>) -> anyhow::Result<()> {
    log::info!("loading templates...");
    let t = template::Template::new(&config.templates_dir)?;

    let state = AppState {
        store,
        t,
        allowed_extensions: config.allowed_extensions.clone().into(),
    };
    let app = app(state, &config.uploads_dir);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("cannot listen on {}", config.bind_addr))?;
    log::info!("open website at http://{}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn login(State(s): State<AppState>, headers: HeaderMap) -> Response {
    if current_user(&CookieSession::from_headers(&headers)).is_some() {
        return Redirect::to(Route::Bills.path()).into_response();
    }
    s.t.page(StatusCode::OK, "login", &())
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
}

async fn login_post(
    State(s): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ErrorPage> {
    let user = serde_json::to_string(&User::employee(form.email.trim())).map_err(|err| {
        log::error!("cannot store user: {err}");
        ErrorPage::new(&BillsError::Store(StoreError::Server), Route::Login, &s)
    })?;

    Ok((
        [(header::SET_COOKIE, CookieSession::set_cookie(USER_KEY, &user))],
        Redirect::to(Route::Bills.path()),
    )
        .into_response())
}
