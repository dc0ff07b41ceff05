use std::cmp::Ordering;

use serde::Deserialize;
use uuid::Uuid;

use crate::shared::models::{Category, Priority, Status, TicketView};

/// Raw query-string parameters of the queue views. All optional; values
/// that don't parse are treated as "no filter" so stale or hand-edited
/// URLs keep working.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "query")]
    pub q: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct TicketFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category_id: Option<Uuid>,
    pub query: Option<String>,
}

impl TicketFilter {
    /// Permissive parse: unknown status/priority values and unknown
    /// category slugs become no-ops rather than errors.
    pub fn from_params(params: &ListParams, categories: &[Category]) -> Self {
        Self {
            status: params.status.as_deref().and_then(Status::from_str),
            priority: params.priority.as_deref().and_then(Priority::from_str),
            category_id: params.category.as_deref().and_then(|slug| {
                categories
                    .iter()
                    .find(|c| c.slug == slug)
                    .map(|c| c.id)
            }),
            query: params
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_lowercase),
        }
    }

    fn matches(&self, view: &TicketView) -> bool {
        let ticket = &view.ticket;
        if let Some(status) = self.status {
            if ticket.status != status.as_str() {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if ticket.priority != priority.as_str() {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if ticket.category_id != category_id {
                return false;
            }
        }
        if let Some(query) = &self.query {
            let in_subject = ticket.subject.to_lowercase().contains(query);
            let in_message = ticket.message.to_lowercase().contains(query);
            if !in_subject && !in_message {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Newest,
    Oldest,
    RatingDesc,
    RatingAsc,
    PriorityDesc,
}

impl SortMode {
    /// Unknown sort values fall back to `newest`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("oldest") => Self::Oldest,
            Some("rating_desc") => Self::RatingDesc,
            Some("rating_asc") => Self::RatingAsc,
            Some("priority_desc") => Self::PriorityDesc,
            _ => Self::Newest,
        }
    }
}

fn newest_first(a: &TicketView, b: &TicketView) -> Ordering {
    b.ticket.created_at.cmp(&a.ticket.created_at)
}

fn rating_or_zero(view: &TicketView) -> f64 {
    view.average_rating.unwrap_or(0.0)
}

fn priority_rank(view: &TicketView) -> u8 {
    Priority::from_str(&view.ticket.priority)
        .map(|p| p.rank())
        .unwrap_or(0)
}

/// Filter then sort a snapshot of the queue. Pure: the store is never
/// touched, the input order is irrelevant, ties break deterministically.
pub fn run(views: Vec<TicketView>, filter: &TicketFilter, sort: SortMode) -> Vec<TicketView> {
    let mut selected: Vec<TicketView> = views.into_iter().filter(|v| filter.matches(v)).collect();
    match sort {
        SortMode::Newest => selected.sort_by(newest_first),
        SortMode::Oldest => {
            selected.sort_by(|a, b| a.ticket.created_at.cmp(&b.ticket.created_at))
        }
        SortMode::RatingDesc => selected.sort_by(|a, b| {
            rating_or_zero(b)
                .partial_cmp(&rating_or_zero(a))
                .unwrap_or(Ordering::Equal)
                .then_with(|| newest_first(a, b))
        }),
        SortMode::RatingAsc => selected.sort_by(|a, b| {
            rating_or_zero(a)
                .partial_cmp(&rating_or_zero(b))
                .unwrap_or(Ordering::Equal)
                .then_with(|| newest_first(a, b))
        }),
        SortMode::PriorityDesc => selected.sort_by(|a, b| {
            priority_rank(b)
                .cmp(&priority_rank(a))
                .then_with(|| newest_first(a, b))
        }),
    }
    selected
}
