use std::sync::Mutex;

use axum::response::Redirect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Bills,
    NewBill,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Bills => "/employee/bills",
            Route::NewBill => "/employee/bill/new",
        }
    }
}

/// Named-route page transitions.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Remembers the last requested route so a handler can answer with a redirect.
#[derive(Debug, Default)]
pub struct Redirector {
    target: Mutex<Option<Route>>,
}

impl Redirector {
    pub fn into_redirect(self) -> Option<Redirect> {
        let target = self.target.into_inner().unwrap_or_else(|e| e.into_inner());
        target.map(|route| Redirect::to(route.path()))
    }
}

impl Navigator for Redirector {
    fn navigate(&self, route: Route) {
        log::debug!("navigate to {}", route.path());
        *self.target.lock().unwrap_or_else(|e| e.into_inner()) = Some(route);
    }
}
