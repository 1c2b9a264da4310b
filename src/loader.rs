//! Data loader: fetches the ticket file, validates it and restores progress.

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    controller::Controller,
    error::LoadError,
    net::{Fetch, Request},
    session::SessionStore,
    storage::KeyValueStore,
    ticket::Ticket,
};

/// Location of the ticket file relative to the origin.
pub const TICKETS_URL: &str = "./tickets.json";

/// Parses a ticket file: a non-empty JSON array of objects.
pub fn parse_tickets(body: &[u8]) -> Result<Vec<Ticket>, LoadError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Array(items) = value else {
        return Err(LoadError::Empty);
    };
    if items.is_empty() {
        return Err(LoadError::Empty);
    }
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(ticket) => Ok(ticket),
            _ => Err(LoadError::NotAnObject { index }),
        })
        .collect()
}

pub fn fetch_tickets<F: Fetch + ?Sized>(fetcher: &F, url: &str) -> Result<Vec<Ticket>, LoadError> {
    let req = Request::get(url).with_accept("application/json");
    let resp = fetcher.fetch(&req).map_err(|source| LoadError::Fetch {
        url: url.to_string(),
        source,
    })?;
    if !resp.ok() {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: resp.status,
        });
    }
    parse_tickets(&resp.body)
}

/// Loads the deck at `url`, restores the session saved in `store` and draws
/// the first card. On error nothing is rendered.
pub fn load<F, S>(fetcher: &F, url: &str, store: S) -> Result<Controller<S>, LoadError>
where
    F: Fetch + ?Sized,
    S: KeyValueStore,
{
    let tickets = match fetch_tickets(fetcher, url) {
        Ok(tickets) => tickets,
        Err(e) => {
            warn!(url, error = %e, "ticket load failed");
            return Err(e);
        }
    };
    let persistence = SessionStore::new(store);
    let state = persistence.load(tickets.len());
    info!(
        url,
        tickets = tickets.len(),
        index = state.current_index,
        studied = state.studied.len(),
        "tickets loaded"
    );
    let mut controller = Controller::new(tickets, state, persistence);
    controller.render(true);
    Ok(controller)
}
