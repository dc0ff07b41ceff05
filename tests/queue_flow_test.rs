use chrono::{Duration, Utc};
use uuid::Uuid;

use ticketserver::shared::models::{Category, Status, Ticket, TicketRating};
use ticketserver::tickets::query::{self, ListParams, SortMode, TicketFilter};
use ticketserver::tickets::stats;
use ticketserver::tickets::store::{attach_average_ratings, Snapshot};

fn category(name: &str, slug: &str) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slug.to_string(),
        created_at: Utc::now(),
    }
}

fn ticket(category: &Category, name: &str, subject: &str, status: &str, age_mins: i64) -> Ticket {
    let created = Utc::now() - Duration::minutes(age_mins);
    Ticket {
        id: Uuid::new_v4(),
        user_id: None,
        category_id: category.id,
        kind: "question".to_string(),
        priority: "medium".to_string(),
        status: status.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        subject: subject.to_string(),
        message: "No connectivity on the third floor.".to_string(),
        answer: String::new(),
        is_answered: false,
        is_anonymous: false,
        created_at: created,
        updated_at: created,
    }
}

fn rating(ticket_id: Uuid, score: i32) -> TicketRating {
    TicketRating {
        id: Uuid::new_v4(),
        ticket_id,
        score,
        rater_name: "Amina".to_string(),
        comment: String::new(),
        created_at: Utc::now(),
    }
}

#[test]
fn closed_ticket_with_ratings_flows_through_queue_and_dashboard() {
    let it = category("IT", "it");
    let dorm = category("Dormitory", "dormitory");

    let mut wifi = ticket(&it, "Amina", "Wifi down", "open", 5);
    let heating = ticket(&dorm, "Omar", "Heating not working", "open", 60);

    let ratings = vec![rating(wifi.id, 4), rating(wifi.id, 5)];

    // staff resolves the wifi ticket
    wifi.status = Status::Closed.as_str().to_string();
    wifi.updated_at = Utc::now();
    assert!(wifi.updated_at > wifi.created_at);

    let snapshot = Snapshot {
        tickets: vec![wifi.clone(), heating.clone()],
        ratings: ratings.clone(),
        categories: vec![it.clone(), dorm],
    };

    // the rated ticket averages 4.5
    let views = attach_average_ratings(snapshot.tickets.clone(), &snapshot.ratings);
    let wifi_view = views.iter().find(|v| v.ticket.id == wifi.id).unwrap();
    assert_eq!(wifi_view.average_rating, Some(4.5));

    // the closed queue includes it
    let params = ListParams {
        status: Some("closed".to_string()),
        ..Default::default()
    };
    let filter = TicketFilter::from_params(&params, &snapshot.categories);
    let queue = query::run(views, &filter, SortMode::Newest);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].ticket.id, wifi.id);

    // and the dashboard reflects the same snapshot
    let dashboard = stats::compute(&snapshot);
    assert_eq!(dashboard.total_tickets, 2);
    assert_eq!(dashboard.status_counts.closed, 1);
    assert_eq!(dashboard.status_counts.open, 1);
    assert_eq!(dashboard.global_average_rating, Some(4.5));
    assert_eq!(dashboard.top_categories[0].name, "IT");
    assert_eq!(dashboard.top_submitters.len(), 2);
}

#[test]
fn category_slug_filter_narrows_the_queue() {
    let it = category("IT", "it");
    let dorm = category("Dormitory", "dormitory");
    let tickets = vec![
        ticket(&it, "Amina", "Wifi down", "open", 5),
        ticket(&dorm, "Omar", "Heating not working", "open", 10),
    ];
    let categories = vec![it, dorm];

    let params = ListParams {
        category: Some("dormitory".to_string()),
        ..Default::default()
    };
    let filter = TicketFilter::from_params(&params, &categories);
    let views = attach_average_ratings(tickets, &[]);
    let queue = query::run(views, &filter, SortMode::Newest);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].ticket.subject, "Heating not working");
}
