use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use super::{
    navigator::{Navigator, Redirector, Route},
    AppState, BillsError, ErrorPage, Layout,
};
use crate::{
    models::{extension_of, parse_amount, parse_pct, Attachment, Bill, BillDraft, BillStatus},
    session::{current_user, CookieSession, LocalSession},
    store::Store,
};

pub const EXPENSE_TYPES: [&str; 7] = [
    "Transports",
    "Restaurants et bars",
    "Hôtel et logement",
    "Services en ligne",
    "IT et électronique",
    "Equipement et matériel",
    "Fournitures de bureau",
];

/// Current selection of the receipt file input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInput {
    pub files: Vec<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSelection {
    Accepted,
    Rejected,
}

/// Values of the new-bill form fields, as typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBillForm {
    #[serde(rename = "type")]
    pub expense_type: String,
    pub name: String,
    pub date: String,
    pub amount: String,
    pub vat: String,
    pub pct: String,
    pub commentary: String,
}

impl NewBillForm {
    pub fn into_draft(self, email: String, file_url: String, file_name: String) -> BillDraft {
        BillDraft {
            email,
            bill_type: self.expense_type,
            name: self.name,
            date: self.date,
            amount: parse_amount(&self.amount),
            vat: self.vat,
            pct: parse_pct(&self.pct),
            commentary: self.commentary,
            file_url,
            file_name,
            status: BillStatus::Pending,
        }
    }
}

pub fn is_allowed_file(file_name: &str, allowed_extensions: &[String]) -> bool {
    extension_of(file_name).is_some_and(|ext| allowed_extensions.contains(&ext))
}

pub struct NewBillController<'a> {
    store: &'a dyn Store,
    navigator: &'a dyn Navigator,
    session: &'a dyn LocalSession,
    allowed_extensions: &'a [String],
    bill_id: Option<String>,
    receipt: Option<Attachment>,
    file_url: String,
    file_name: String,
}

impl<'a> NewBillController<'a> {
    pub fn new(
        store: &'a dyn Store,
        navigator: &'a dyn Navigator,
        session: &'a dyn LocalSession,
        allowed_extensions: &'a [String],
    ) -> Self {
        Self {
            store,
            navigator,
            session,
            allowed_extensions,
            bill_id: None,
            receipt: None,
            file_url: String::new(),
            file_name: String::new(),
        }
    }

    /// Submitting then updates `bill` instead of creating a new one.
    pub fn editing(mut self, bill: &Bill) -> Self {
        self.bill_id = Some(bill.id.clone());
        self.file_url = bill.file_url.clone().unwrap_or_default();
        self.file_name = bill.file_name.clone().unwrap_or_default();
        self
    }

    /// Keeps the selected file as the bill's receipt when its extension is
    /// allowed. The input holds a single file; extra entries are dropped.
    /// Otherwise the selection is emptied and the receipt kept so far stays
    /// untouched.
    pub fn on_file_selected(&mut self, input: &mut FileInput) -> FileSelection {
        input.files.truncate(1);
        let Some(file) = input.files.first() else {
            return FileSelection::Rejected;
        };

        if !is_allowed_file(&file.file_name, self.allowed_extensions) {
            log::warn!("ignored receipt '{}': extension not allowed", file.file_name);
            input.files.clear();
            return FileSelection::Rejected;
        }

        log::debug!("receipt '{}' selected", file.file_name);
        self.file_name = file.file_name.clone();
        self.file_url = String::new();
        self.receipt = Some(file.clone());
        FileSelection::Accepted
    }

    /// Sends the bill to the store and goes back to the bill list. On failure
    /// nothing is navigated, the selected receipt is kept for the next submit
    /// and the error is handed back for display.
    pub async fn on_submit(&mut self, form: NewBillForm) -> Result<Bill, BillsError> {
        let user = current_user(self.session).ok_or(BillsError::MissingUser)?;
        let draft = form.into_draft(user.email, self.file_url.clone(), self.file_name.clone());
        let receipt = self.receipt.clone();

        let saved = match &self.bill_id {
            Some(id) => self.store.update(id, draft, receipt).await,
            None => self.store.create(draft, receipt).await,
        };
        let bill = saved.inspect_err(|err| log::error!("cannot submit bill: {err}"))?;

        self.receipt = None;
        self.file_url = bill.file_url.clone().unwrap_or_default();
        self.file_name = bill.file_name.clone().unwrap_or_default();

        log::info!("bill {} submitted by {}", bill.id, bill.email);
        self.navigator.navigate(Route::Bills);
        Ok(bill)
    }
}

pub fn new_router() -> Router<AppState> {
    Router::new().route("/bill/new", get(form).post(submit))
}

#[axum::debug_handler]
async fn form(State(s): State<AppState>) -> Response {
    form_page(&s)
}

fn form_page(s: &AppState) -> Response {
    #[derive(Serialize)]
    struct Ctx {
        layout: Layout,
        expense_types: [&'static str; 7],
        accept: String,
    }

    let ctx = Ctx {
        layout: Layout::for_route(Route::NewBill),
        expense_types: EXPENSE_TYPES,
        accept: s
            .allowed_extensions
            .iter()
            .map(|e| format!(".{e}"))
            .collect::<Vec<_>>()
            .join(","),
    };

    s.t.page(StatusCode::OK, "new_bill", &ctx)
}

async fn read_form(multipart: &mut Multipart) -> Result<(NewBillForm, FileInput), BillsError> {
    let bad_form = |err: axum::extract::multipart::MultipartError| {
        log::warn!("invalid new bill form: {err}");
        BillsError::BadForm
    };

    let mut form = NewBillForm::default();
    let mut input = FileInput::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(bad_form)?;
            if !file_name.is_empty() {
                input.files.push(Attachment {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await.map_err(bad_form)?;
        match name.as_str() {
            "type" => form.expense_type = value,
            "name" => form.name = value,
            "date" => form.date = value,
            "amount" => form.amount = value,
            "vat" => form.vat = value,
            "pct" => form.pct = value,
            "commentary" => form.commentary = value,
            other => log::debug!("ignored form field '{other}'"),
        }
    }

    Ok((form, input))
}

#[axum::debug_handler]
async fn submit(
    State(s): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, ErrorPage> {
    let (form, mut input) = read_form(&mut multipart)
        .await
        .map_err(|err| ErrorPage::new(&err, Route::NewBill, &s))?;

    let session = CookieSession::from_headers(&headers);
    let navigator = Redirector::default();
    {
        let mut controller =
            NewBillController::new(s.store.as_ref(), &navigator, &session, &s.allowed_extensions);
        if !input.files.is_empty()
            && controller.on_file_selected(&mut input) == FileSelection::Rejected
        {
            return Ok(form_page(&s));
        }
        controller
            .on_submit(form)
            .await
            .map_err(|err| ErrorPage::new(&err, Route::NewBill, &s))?;
    }

    Ok(match navigator.into_redirect() {
        Some(redirect) => redirect.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
