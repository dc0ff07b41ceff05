use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::shared::models::{Category, Priority, Status, Ticket, TicketRating};
use crate::shared::utils::round2;
use crate::tickets::store::Snapshot;

const LEADERBOARD_SIZE: usize = 5;

#[derive(Debug, Serialize)]
pub struct StatusCounts {
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
}

#[derive(Debug, Serialize)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub tickets: usize,
}

#[derive(Debug, Serialize)]
pub struct SubmitterStats {
    pub name: String,
    pub tickets: usize,
    pub average_rating: Option<f64>,
}

/// Summary tiles for the staff dashboard, computed over the full ticket
/// set of one snapshot.
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_tickets: usize,
    pub status_counts: StatusCounts,
    pub priority_counts: PriorityCounts,
    pub top_categories: Vec<CategoryCount>,
    pub global_average_rating: Option<f64>,
    pub top_submitters: Vec<SubmitterStats>,
}

fn count_status(tickets: &[Ticket], status: Status) -> usize {
    tickets.iter().filter(|t| t.status == status.as_str()).count()
}

fn count_priority(tickets: &[Ticket], priority: Priority) -> usize {
    tickets
        .iter()
        .filter(|t| t.priority == priority.as_str())
        .count()
}

fn top_categories(tickets: &[Ticket], categories: &[Category]) -> Vec<CategoryCount> {
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for ticket in tickets {
        *counts.entry(ticket.category_id).or_insert(0) += 1;
    }
    let mut board: Vec<CategoryCount> = categories
        .iter()
        .map(|c| CategoryCount {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
            tickets: counts.get(&c.id).copied().unwrap_or(0),
        })
        .collect();
    board.sort_by(|a, b| b.tickets.cmp(&a.tickets).then_with(|| a.name.cmp(&b.name)));
    board.truncate(LEADERBOARD_SIZE);
    board
}

fn global_average(ratings: &[TicketRating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(r.score)).sum();
    Some(round2(sum as f64 / ratings.len() as f64))
}

/// Top non-anonymous submitters by ticket count, grouped by the `name`
/// field, each annotated with the mean of all rating scores across their
/// tickets.
fn top_submitters(tickets: &[Ticket], ratings: &[TicketRating]) -> Vec<SubmitterStats> {
    let mut by_ticket: HashMap<Uuid, (i64, i64)> = HashMap::new();
    for rating in ratings {
        let entry = by_ticket.entry(rating.ticket_id).or_insert((0, 0));
        entry.0 += i64::from(rating.score);
        entry.1 += 1;
    }

    let mut by_name: HashMap<&str, (usize, i64, i64)> = HashMap::new();
    for ticket in tickets {
        if ticket.is_anonymous || ticket.name.is_empty() {
            continue;
        }
        let entry = by_name.entry(ticket.name.as_str()).or_insert((0, 0, 0));
        entry.0 += 1;
        if let Some((sum, count)) = by_ticket.get(&ticket.id) {
            entry.1 += sum;
            entry.2 += count;
        }
    }

    let mut board: Vec<SubmitterStats> = by_name
        .into_iter()
        .map(|(name, (tickets, sum, count))| SubmitterStats {
            name: name.to_string(),
            tickets,
            average_rating: (count > 0).then(|| round2(sum as f64 / count as f64)),
        })
        .collect();
    board.sort_by(|a, b| b.tickets.cmp(&a.tickets).then_with(|| a.name.cmp(&b.name)));
    board.truncate(LEADERBOARD_SIZE);
    board
}

pub fn compute(snapshot: &Snapshot) -> DashboardStats {
    let tickets = &snapshot.tickets;
    DashboardStats {
        total_tickets: tickets.len(),
        status_counts: StatusCounts {
            open: count_status(tickets, Status::Open),
            in_progress: count_status(tickets, Status::InProgress),
            closed: count_status(tickets, Status::Closed),
        },
        priority_counts: PriorityCounts {
            low: count_priority(tickets, Priority::Low),
            medium: count_priority(tickets, Priority::Medium),
            high: count_priority(tickets, Priority::High),
        },
        top_categories: top_categories(tickets, &snapshot.categories),
        global_average_rating: global_average(&snapshot.ratings),
        top_submitters: top_submitters(tickets, &snapshot.ratings),
    }
}
