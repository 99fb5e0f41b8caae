use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    front::navigator::{Navigator, Route},
    models::{Attachment, Bill, BillDraft, BillStatus},
    session::{LocalSession, User, USER_KEY},
    store::{Store, StoreError},
};

fn bill(id: &str, bill_type: &str, name: &str, date: (i32, u32, u32), amount: f64) -> Bill {
    Bill {
        id: id.to_string(),
        bill_type: bill_type.to_string(),
        name: name.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        amount,
        vat: "70".to_string(),
        pct: 20,
        commentary: Some("séminaire billed".to_string()),
        file_url: Some(format!("https://test.storage.tld/{id}.jpg")),
        file_name: Some(format!("{name}.jpg")),
        status: BillStatus::Pending,
        comment_admin: None,
        email: "a@a".to_string(),
    }
}

/// Four bills, deliberately not in date order.
pub fn fixture_bills() -> Vec<Bill> {
    vec![
        bill("47qAXb6fIm2zOKkLzMro", "Hôtel et logement", "encore", (2004, 4, 4), 400.0),
        bill("BeKy5Mo4jkmdfPGYpTxZ", "Transports", "test1", (2001, 1, 1), 100.0),
        bill("UIUZtnPQvnbFnB0ozvJh", "Services en ligne", "test3", (2003, 3, 3), 300.0),
        bill("qcCK3SzECmaZAGRrHjaC", "Restaurants et bars", "test2", (2002, 2, 2), 200.0),
    ]
}

#[derive(Default)]
pub struct MemoryStore {
    bills: Mutex<Vec<Bill>>,
    fail_with: Mutex<Option<StoreError>>,
    pub created: Mutex<Vec<(BillDraft, Option<Attachment>)>>,
    pub updated: Mutex<Vec<(String, BillDraft)>>,
}

impl MemoryStore {
    pub fn with_bills(bills: Vec<Bill>) -> Self {
        Self {
            bills: Mutex::new(bills),
            ..Self::default()
        }
    }

    pub fn failing(err: StoreError) -> Self {
        Self {
            fail_with: Mutex::new(Some(err)),
            ..Self::default()
        }
    }

    /// Later calls succeed again.
    pub fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    fn check(&self) -> Result<(), StoreError> {
        match &*self.fail_with.lock().unwrap() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn attach(id: &Uuid, draft: &mut BillDraft, receipt: Option<Attachment>) {
        if let Some(receipt) = receipt {
            draft.file_url = format!("/uploads/{}", receipt.storage_name(id));
            draft.file_name = receipt.file_name;
        }
    }

    fn to_bill(id: String, draft: &BillDraft) -> Result<Bill, StoreError> {
        let date = draft
            .date
            .parse()
            .map_err(|_| StoreError::Rejected("Erreur 400".to_string()))?;

        Ok(Bill {
            id,
            bill_type: draft.bill_type.clone(),
            name: draft.name.clone(),
            date,
            amount: draft.amount,
            vat: draft.vat.clone(),
            pct: draft.pct,
            commentary: Some(draft.commentary.clone()).filter(|c| !c.is_empty()),
            file_url: Some(draft.file_url.clone()).filter(|u| !u.is_empty()),
            file_name: Some(draft.file_name.clone()).filter(|n| !n.is_empty()),
            status: draft.status,
            comment_admin: None,
            email: draft.email.clone(),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list(&self) -> Result<Vec<Bill>, StoreError> {
        self.check()?;
        Ok(self.bills.lock().unwrap().clone())
    }

    async fn create(
        &self,
        mut draft: BillDraft,
        receipt: Option<Attachment>,
    ) -> Result<Bill, StoreError> {
        self.check()?;
        let id = Uuid::new_v4();
        self.created
            .lock()
            .unwrap()
            .push((draft.clone(), receipt.clone()));

        Self::attach(&id, &mut draft, receipt);
        let bill = Self::to_bill(id.to_string(), &draft)?;
        self.bills.lock().unwrap().push(bill.clone());
        Ok(bill)
    }

    async fn update(
        &self,
        id: &str,
        mut draft: BillDraft,
        receipt: Option<Attachment>,
    ) -> Result<Bill, StoreError> {
        self.check()?;
        self.updated
            .lock()
            .unwrap()
            .push((id.to_string(), draft.clone()));

        let mut bills = self.bills.lock().unwrap();
        let existing = bills
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound)?;
        Self::attach(&Uuid::new_v4(), &mut draft, receipt);
        *existing = Self::to_bill(id.to_string(), &draft)?;
        Ok(existing.clone())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

#[derive(Default)]
pub struct MemorySession(pub HashMap<String, String>);

impl MemorySession {
    pub fn employee(email: &str) -> Self {
        let user = serde_json::to_string(&User::employee(email)).unwrap();
        Self(HashMap::from([(USER_KEY.to_string(), user)]))
    }
}

impl LocalSession for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}
