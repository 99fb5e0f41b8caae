use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use handlebars::RenderError;
use serde::{Deserialize, Serialize};

use super::{
    navigator::{Navigator, Redirector, Route},
    template::Template,
    AppState, BillsError, ErrorPage, Layout,
};
use crate::{
    models::{Bill, BillRow},
    store::{Store, StoreError},
};

/// Caption of the receipt overlay when the bill has no file name.
const RECEIPT_TITLE: &str = "Justificatif";

/// Data attributes of a "view receipt" affordance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewReceipt {
    pub file_url: Option<String>,
    pub file_name: Option<String>,
}

pub struct BillsController<'a> {
    store: &'a dyn Store,
    navigator: &'a dyn Navigator,
    t: &'a Template,
}

impl<'a> BillsController<'a> {
    pub fn new(store: &'a dyn Store, navigator: &'a dyn Navigator, t: &'a Template) -> Self {
        Self {
            store,
            navigator,
            t,
        }
    }

    /// Every bill of the store, labelled for display. Order is whatever the
    /// store answers; see [`sort_bills_by_date_descending`].
    pub async fn fetch_bills(&self) -> Result<Vec<BillRow>, StoreError> {
        let bills = self.store.list().await.inspect_err(|err| {
            log::error!("cannot fetch bills: {err}");
        })?;
        log::debug!("fetched {} bills", bills.len());

        Ok(bills.into_iter().map(BillRow::from).collect())
    }

    /// Renders the receipt overlay for the clicked bill.
    pub fn on_click_view_receipt(&self, event: &ViewReceipt) -> Result<String, RenderError> {
        #[derive(Serialize)]
        struct Ctx<'c> {
            file_url: Option<&'c str>,
            caption: &'c str,
        }

        let file_url = event.file_url.as_deref().filter(|u| !u.is_empty());
        let caption = event
            .file_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(RECEIPT_TITLE);
        if file_url.is_none() {
            log::debug!("no receipt to show for '{caption}'");
        }

        self.t.render("modal_receipt", &Ctx { file_url, caption })
    }

    pub fn on_click_create_new(&self) {
        self.navigator.navigate(Route::NewBill);
    }
}

/// Most recent first. Bills sharing a date keep their input order.
pub fn sort_bills_by_date_descending<B: AsRef<Bill>>(mut bills: Vec<B>) -> Vec<B> {
    bills.sort_by(|a, b| b.as_ref().date.cmp(&a.as_ref().date));
    bills
}

pub fn new_router() -> Router<AppState> {
    Router::new()
        .route("/bills", get(list))
        .route("/bills/receipt", get(receipt))
        .route("/bills/new", get(create_new))
}

#[axum::debug_handler]
async fn list(State(s): State<AppState>) -> Result<Response, ErrorPage> {
    let navigator = Redirector::default();
    let controller = BillsController::new(s.store.as_ref(), &navigator, &s.t);

    let bills = controller
        .fetch_bills()
        .await
        .map_err(|err| ErrorPage::new(&BillsError::from(err), Route::Bills, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        layout: Layout,
        bills: Vec<BillRow>,
    }

    let ctx = Ctx {
        layout: Layout::for_route(Route::Bills),
        bills: sort_bills_by_date_descending(bills),
    };

    Ok(s.t.page(StatusCode::OK, "bills", &ctx))
}

#[axum::debug_handler]
async fn receipt(State(s): State<AppState>, Query(q): Query<ViewReceipt>) -> Response {
    let navigator = Redirector::default();
    let controller = BillsController::new(s.store.as_ref(), &navigator, &s.t);

    match controller.on_click_view_receipt(&q) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            log::error!("cannot render receipt overlay: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template. Error: {err}"),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
async fn create_new(State(s): State<AppState>) -> Response {
    let navigator = Redirector::default();
    BillsController::new(s.store.as_ref(), &navigator, &s.t).on_click_create_new();

    match navigator.into_redirect() {
        Some(redirect) => redirect.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
