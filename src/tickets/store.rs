use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use tracing::info;
use uuid::Uuid;

use crate::shared::error::StoreError;
use crate::shared::models::{
    Category, Priority, Status, Ticket, TicketComment, TicketKind, TicketRating, TicketView, User,
};
use crate::shared::schema::{categories, ticket_comments, ticket_ratings, tickets, users};
use crate::shared::utils::round2;

/// Upper bound on slug collision retries before giving up.
const MAX_SLUG_ATTEMPTS: u32 = 50;

/// Lowercase URL-safe transform of a category name. Runs of
/// non-alphanumeric characters collapse into single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("category");
    }
    slug
}

fn is_unique_violation(err: &DieselError, constraint: &str) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name() == Some(constraint)
    )
}

/// Create a category, deriving a unique slug. Uniqueness is owned by the
/// database constraint; collisions retry with `-2`, `-3`, … suffixes so
/// two concurrent creations cannot both win the same slug.
pub fn create_category(conn: &mut PgConnection, name: &str) -> Result<Category, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::validation("name", "is required"));
    }

    let base = slugify(name);
    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let slug = if attempt == 1 {
            base.clone()
        } else {
            format!("{base}-{attempt}")
        };
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug,
            created_at: Utc::now(),
        };
        match diesel::insert_into(categories::table)
            .values(&category)
            .execute(conn)
        {
            Ok(_) => return Ok(category),
            Err(ref e) if is_unique_violation(e, "categories_slug_key") => continue,
            Err(ref e) if is_unique_violation(e, "categories_name_key") => {
                return Err(StoreError::validation("name", "must be unique"));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(StoreError::validation("name", "could not derive a unique slug"))
}

pub fn list_categories(conn: &mut PgConnection) -> Result<Vec<Category>, StoreError> {
    Ok(categories::table
        .order(categories::name.asc())
        .load(conn)?)
}

pub fn find_category(conn: &mut PgConnection, id: Uuid) -> Result<Category, StoreError> {
    Ok(categories::table.find(id).first(conn)?)
}

pub fn find_category_by_name(
    conn: &mut PgConnection,
    name: &str,
) -> Result<Category, StoreError> {
    Ok(categories::table
        .filter(categories::name.eq(name))
        .first(conn)?)
}

/// Delete a category. Fails while any ticket references it; the
/// `ON DELETE RESTRICT` clause raises the violation and the row is left
/// untouched.
pub fn delete_category(conn: &mut PgConnection, id: Uuid) -> Result<(), StoreError> {
    match diesel::delete(categories::table.find(id)).execute(conn) {
        Ok(0) => Err(StoreError::NotFound),
        Ok(_) => Ok(()),
        Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(
            StoreError::ReferentialIntegrity(
                "category is referenced by existing tickets".to_string(),
            ),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Unvalidated ticket input as it arrives from the submission surface.
#[derive(Debug, Default, Clone)]
pub struct NewTicket {
    pub user_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub is_anonymous: bool,
}

#[derive(Debug)]
struct ValidatedTicket {
    kind: TicketKind,
    priority: Priority,
    name: String,
    email: String,
    subject: String,
    message: String,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Field-by-field validation of a submission; the first failing field
/// wins. Anonymization happens here, at write time: an anonymous
/// submission has its identity cleared regardless of what was sent.
fn validate_ticket(input: &NewTicket, owner: Option<&User>) -> Result<ValidatedTicket, StoreError> {
    let kind = match &input.kind {
        None => TicketKind::Question,
        Some(v) => TicketKind::from_str(v)
            .ok_or_else(|| StoreError::validation("type", "must be question or complaint"))?,
    };
    let priority = match &input.priority {
        None => Priority::Medium,
        Some(v) => Priority::from_str(v)
            .ok_or_else(|| StoreError::validation("priority", "must be low, medium or high"))?,
    };
    let subject =
        non_empty(&input.subject).ok_or_else(|| StoreError::validation("subject", "is required"))?;
    let message =
        non_empty(&input.message).ok_or_else(|| StoreError::validation("message", "is required"))?;

    let (name, email) = if input.is_anonymous {
        (String::new(), String::new())
    } else {
        let name = non_empty(&input.name)
            .or_else(|| owner.map(|u| u.username.clone()))
            .ok_or_else(|| StoreError::validation("name", "is required"))?;
        let email = non_empty(&input.email)
            .or_else(|| owner.map(|u| u.email.clone()).filter(|e| !e.is_empty()))
            .ok_or_else(|| StoreError::validation("email", "is required"))?;
        (name, email)
    };

    Ok(ValidatedTicket {
        kind,
        priority,
        name,
        email,
        subject,
        message,
    })
}

pub fn create_ticket(conn: &mut PgConnection, input: NewTicket) -> Result<Ticket, StoreError> {
    let category_id = input
        .category_id
        .ok_or_else(|| StoreError::validation("category", "is required"))?;
    let category_known: i64 = categories::table
        .filter(categories::id.eq(category_id))
        .count()
        .get_result(conn)?;
    if category_known == 0 {
        return Err(StoreError::validation("category", "unknown category"));
    }

    let owner = match input.user_id {
        Some(uid) => Some(
            users::table
                .find(uid)
                .first::<User>(conn)
                .optional()?
                .ok_or_else(|| StoreError::validation("user", "unknown user"))?,
        ),
        None => None,
    };

    let validated = validate_ticket(&input, owner.as_ref())?;
    let now = Utc::now();
    let ticket = Ticket {
        id: Uuid::new_v4(),
        user_id: input.user_id,
        category_id,
        kind: validated.kind.as_str().to_string(),
        priority: validated.priority.as_str().to_string(),
        status: Status::Open.as_str().to_string(),
        name: validated.name,
        email: validated.email,
        subject: validated.subject,
        message: validated.message,
        answer: String::new(),
        is_answered: false,
        is_anonymous: input.is_anonymous,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(tickets::table)
        .values(&ticket)
        .execute(conn)?;
    info!(ticket_id = %ticket.id, "ticket created");
    Ok(ticket)
}

pub fn get_ticket(conn: &mut PgConnection, id: Uuid) -> Result<Ticket, StoreError> {
    Ok(tickets::table.find(id).first(conn)?)
}

/// Transition a ticket to a new status. The state machine is permissive:
/// any member of the status enum may move to any other, only non-members
/// are rejected, and a rejected call mutates nothing.
pub fn set_status(conn: &mut PgConnection, id: Uuid, status: &str) -> Result<Ticket, StoreError> {
    let status = Status::from_str(status)
        .ok_or_else(|| StoreError::InvalidTransition(status.to_string()))?;
    let updated = diesel::update(tickets::table.find(id))
        .set((
            tickets::status.eq(status.as_str()),
            tickets::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Err(StoreError::NotFound);
    }
    get_ticket(conn, id)
}

/// Partial update of the mutable ticket fields.
#[derive(Debug, Default, Clone)]
pub struct TicketChanges {
    pub category_id: Option<Uuid>,
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub answer: Option<String>,
    pub is_answered: Option<bool>,
    pub is_anonymous: Option<bool>,
}

pub fn update_ticket(
    conn: &mut PgConnection,
    id: Uuid,
    changes: TicketChanges,
) -> Result<Ticket, StoreError> {
    let mut ticket = get_ticket(conn, id)?;

    if let Some(category_id) = changes.category_id {
        find_category(conn, category_id)
            .map_err(|_| StoreError::validation("category", "unknown category"))?;
        ticket.category_id = category_id;
    }
    if let Some(kind) = changes.kind {
        TicketKind::from_str(&kind)
            .ok_or_else(|| StoreError::validation("type", "must be question or complaint"))?;
        ticket.kind = kind;
    }
    if let Some(priority) = changes.priority {
        Priority::from_str(&priority)
            .ok_or_else(|| StoreError::validation("priority", "must be low, medium or high"))?;
        ticket.priority = priority;
    }
    if let Some(status) = changes.status {
        Status::from_str(&status).ok_or_else(|| StoreError::InvalidTransition(status.clone()))?;
        ticket.status = status;
    }
    if let Some(subject) = changes.subject {
        if subject.trim().is_empty() {
            return Err(StoreError::validation("subject", "is required"));
        }
        ticket.subject = subject;
    }
    if let Some(message) = changes.message {
        if message.trim().is_empty() {
            return Err(StoreError::validation("message", "is required"));
        }
        ticket.message = message;
    }
    if let Some(name) = changes.name {
        ticket.name = name;
    }
    if let Some(email) = changes.email {
        ticket.email = email;
    }
    if let Some(answer) = changes.answer {
        // Recording a non-empty staff answer marks the ticket answered.
        if !answer.trim().is_empty() {
            ticket.is_answered = true;
        }
        ticket.answer = answer;
    }
    if let Some(is_answered) = changes.is_answered {
        ticket.is_answered = is_answered;
    }
    if let Some(is_anonymous) = changes.is_anonymous {
        ticket.is_anonymous = is_anonymous;
    }
    // Anonymization is enforced at rest, not just at display time.
    if ticket.is_anonymous {
        ticket.name = String::new();
        ticket.email = String::new();
    }
    ticket.updated_at = Utc::now();

    diesel::update(tickets::table.find(id))
        .set(&ticket)
        .execute(conn)?;
    Ok(ticket)
}

/// Delete a ticket. Comments and ratings cascade with it.
pub fn delete_ticket(conn: &mut PgConnection, id: Uuid) -> Result<(), StoreError> {
    let deleted = diesel::delete(tickets::table.find(id)).execute(conn)?;
    if deleted == 0 {
        return Err(StoreError::NotFound);
    }
    info!(ticket_id = %id, "ticket deleted");
    Ok(())
}

pub fn add_comment(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    author_name: &str,
    body: &str,
) -> Result<TicketComment, StoreError> {
    get_ticket(conn, ticket_id)?;
    if author_name.trim().is_empty() {
        return Err(StoreError::validation("author_name", "is required"));
    }
    if body.trim().is_empty() {
        return Err(StoreError::validation("body", "is required"));
    }
    let comment = TicketComment {
        id: Uuid::new_v4(),
        ticket_id,
        author_name: author_name.trim().to_string(),
        body: body.to_string(),
        created_at: Utc::now(),
    };
    diesel::insert_into(ticket_comments::table)
        .values(&comment)
        .execute(conn)?;
    Ok(comment)
}

pub fn list_comments(
    conn: &mut PgConnection,
    ticket_id: Uuid,
) -> Result<Vec<TicketComment>, StoreError> {
    get_ticket(conn, ticket_id)?;
    Ok(ticket_comments::table
        .filter(ticket_comments::ticket_id.eq(ticket_id))
        .order(ticket_comments::created_at.asc())
        .load(conn)?)
}

pub fn add_rating(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    score: i32,
    rater_name: &str,
    comment: &str,
) -> Result<TicketRating, StoreError> {
    if !(1..=5).contains(&score) {
        return Err(StoreError::validation("score", "must be between 1 and 5"));
    }
    get_ticket(conn, ticket_id)?;
    let rating = TicketRating {
        id: Uuid::new_v4(),
        ticket_id,
        score,
        rater_name: rater_name.trim().to_string(),
        comment: comment.to_string(),
        created_at: Utc::now(),
    };
    diesel::insert_into(ticket_ratings::table)
        .values(&rating)
        .execute(conn)?;
    Ok(rating)
}

pub fn list_ratings(
    conn: &mut PgConnection,
    ticket_id: Uuid,
) -> Result<Vec<TicketRating>, StoreError> {
    get_ticket(conn, ticket_id)?;
    Ok(ticket_ratings::table
        .filter(ticket_ratings::ticket_id.eq(ticket_id))
        .order(ticket_ratings::created_at.desc())
        .load(conn)?)
}

/// One consistent snapshot of the store, loaded inside a single
/// transaction so counts and averages rendered together never skew.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tickets: Vec<Ticket>,
    pub ratings: Vec<TicketRating>,
    pub categories: Vec<Category>,
}

pub fn load_snapshot(conn: &mut PgConnection) -> Result<Snapshot, StoreError> {
    conn.transaction(|conn| {
        let loaded_tickets = tickets::table
            .order(tickets::created_at.desc())
            .load::<Ticket>(conn)?;
        let ratings = ticket_ratings::table.load::<TicketRating>(conn)?;
        let loaded_categories = categories::table.load::<Category>(conn)?;
        Ok(Snapshot {
            tickets: loaded_tickets,
            ratings,
            categories: loaded_categories,
        })
    })
}

/// Annotate tickets with their average rating (2 decimals; `None` when
/// unrated).
pub fn attach_average_ratings(tickets: Vec<Ticket>, ratings: &[TicketRating]) -> Vec<TicketView> {
    use std::collections::HashMap;
    let mut sums: HashMap<Uuid, (i64, i64)> = HashMap::new();
    for rating in ratings {
        let entry = sums.entry(rating.ticket_id).or_insert((0, 0));
        entry.0 += i64::from(rating.score);
        entry.1 += 1;
    }
    tickets
        .into_iter()
        .map(|ticket| {
            let average_rating = sums
                .get(&ticket.id)
                .map(|(sum, count)| round2(*sum as f64 / *count as f64));
            TicketView {
                ticket,
                average_rating,
            }
        })
        .collect()
}

pub fn average_rating_for(conn: &mut PgConnection, ticket_id: Uuid) -> Result<Option<f64>, StoreError> {
    let scores: Vec<i32> = ticket_ratings::table
        .filter(ticket_ratings::ticket_id.eq(ticket_id))
        .select(ticket_ratings::score)
        .load(conn)?;
    if scores.is_empty() {
        return Ok(None);
    }
    let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
    Ok(Some(round2(sum as f64 / scores.len() as f64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_ticket(id: Uuid) -> Ticket {
        let now = Utc::now();
        Ticket {
            id,
            user_id: None,
            category_id: Uuid::new_v4(),
            kind: "question".to_string(),
            priority: "medium".to_string(),
            status: "open".to_string(),
            name: "Amina".to_string(),
            email: "a@x.com".to_string(),
            subject: "Wifi down".to_string(),
            message: "No connectivity in block C".to_string(),
            answer: String::new(),
            is_answered: false,
            is_anonymous: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn rating(ticket_id: Uuid, score: i32) -> TicketRating {
        TicketRating {
            id: Uuid::new_v4(),
            ticket_id,
            score,
            rater_name: String::new(),
            comment: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn slugify_is_url_safe() {
        assert_eq!(slugify("IT"), "it");
        assert_eq!(slugify("Dorm & Housing"), "dorm-housing");
        assert_eq!(slugify("  Study   Rooms  "), "study-rooms");
        assert_eq!(slugify("!!!"), "category");
    }

    #[test]
    fn anonymous_submission_clears_identity() {
        let input = NewTicket {
            is_anonymous: true,
            name: Some("Amina".to_string()),
            email: Some("a@x.com".to_string()),
            subject: Some("Wifi down".to_string()),
            message: Some("details".to_string()),
            ..Default::default()
        };
        let validated = validate_ticket(&input, None).unwrap();
        assert_eq!(validated.name, "");
        assert_eq!(validated.email, "");
    }

    #[test]
    fn named_submission_requires_identity() {
        let input = NewTicket {
            subject: Some("Wifi down".to_string()),
            message: Some("details".to_string()),
            ..Default::default()
        };
        let err = validate_ticket(&input, None).unwrap_err();
        match err {
            StoreError::Validation { field, .. } => assert_eq!(field, "name"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn owner_identity_backfills_blank_fields() {
        let owner = User {
            id: Uuid::new_v4(),
            username: "amina".to_string(),
            email: "amina@campus.edu".to_string(),
            password_hash: String::new(),
            is_staff: false,
            created_at: Utc::now(),
        };
        let input = NewTicket {
            user_id: Some(owner.id),
            subject: Some("Wifi down".to_string()),
            message: Some("details".to_string()),
            ..Default::default()
        };
        let validated = validate_ticket(&input, Some(&owner)).unwrap();
        assert_eq!(validated.name, "amina");
        assert_eq!(validated.email, "amina@campus.edu");
    }

    #[test]
    fn first_failing_field_wins() {
        let input = NewTicket {
            kind: Some("rant".to_string()),
            priority: Some("urgent".to_string()),
            ..Default::default()
        };
        let err = validate_ticket(&input, None).unwrap_err();
        match err {
            StoreError::Validation { field, .. } => assert_eq!(field, "type"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unrated_ticket_has_no_average() {
        let ticket = sample_ticket(Uuid::new_v4());
        let views = attach_average_ratings(vec![ticket], &[]);
        assert_eq!(views[0].average_rating, None);
    }

    #[test]
    fn average_rating_rounds_to_two_decimals() {
        let id = Uuid::new_v4();
        let ticket = sample_ticket(id);
        let ratings = vec![rating(id, 4), rating(id, 5)];
        let views = attach_average_ratings(vec![ticket], &ratings);
        assert_eq!(views[0].average_rating, Some(4.5));

        let id2 = Uuid::new_v4();
        let ratings2 = vec![rating(id2, 5), rating(id2, 4), rating(id2, 4)];
        let views2 = attach_average_ratings(vec![sample_ticket(id2)], &ratings2);
        assert_eq!(views2[0].average_rating, Some(4.33));
    }
}
