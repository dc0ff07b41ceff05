use diesel::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::shared::error::StoreError;
use crate::shared::schema::tickets;
use crate::shared::utils::DbPool;
use crate::tickets::store::{self, NewTicket};

const SEED_CATEGORIES: [&str; 5] = ["Dormitory", "IT", "Study", "Safety", "Cafeteria"];
const SEED_SUBJECTS: [&str; 6] = [
    "Broken light in corridor",
    "Water leak in bathroom",
    "Wi-Fi unstable in classroom",
    "Noise complaint after midnight",
    "Heating not working",
    "Dirty water in dorm",
];
const SEED_NAMES: [&str; 6] = ["Temirlan", "Hilla", "Amina", "Sasha", "Omar", "Lina"];

/// Seed demo categories, tickets and ratings for UI preview.
pub fn seed(pool: &DbPool, count: usize) -> anyhow::Result<()> {
    let mut conn = pool.get()?;

    let mut seeded_categories = Vec::new();
    for name in SEED_CATEGORIES {
        let category = match store::create_category(&mut conn, name) {
            Ok(c) => c,
            Err(StoreError::Validation { .. }) => store::find_category_by_name(&mut conn, name)?,
            Err(e) => return Err(e.into()),
        };
        seeded_categories.push(category);
    }

    let mut rng = rand::thread_rng();
    for _ in 0..count {
        let category = seeded_categories
            .choose(&mut rng)
            .expect("seed categories are non-empty");
        let ticket = store::create_ticket(
            &mut conn,
            NewTicket {
                category_id: Some(category.id),
                kind: Some(
                    ["question", "complaint"]
                        .choose(&mut rng)
                        .expect("non-empty")
                        .to_string(),
                ),
                priority: Some(
                    ["low", "medium", "high"]
                        .choose(&mut rng)
                        .expect("non-empty")
                        .to_string(),
                ),
                name: Some(SEED_NAMES.choose(&mut rng).expect("non-empty").to_string()),
                email: Some("demo@example.com".to_string()),
                subject: Some(
                    SEED_SUBJECTS
                        .choose(&mut rng)
                        .expect("non-empty")
                        .to_string(),
                ),
                message: Some("Demo ticket created for UI preview.".to_string()),
                ..Default::default()
            },
        )?;

        let status = ["open", "in_progress", "closed"]
            .choose(&mut rng)
            .expect("non-empty");
        if *status != "open" {
            store::set_status(&mut conn, ticket.id, status)?;
        }

        for _ in 0..rng.gen_range(0..=3) {
            store::add_rating(
                &mut conn,
                ticket.id,
                rng.gen_range(3..=5),
                SEED_NAMES.choose(&mut rng).expect("non-empty"),
                "Thanks, fixed quickly.",
            )?;
        }
    }

    info!("seeded {count} tickets");
    println!("Seeded {count} tickets.");
    Ok(())
}

/// Delete every ticket; comments and ratings cascade with them.
pub fn clear(pool: &DbPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    let deleted = diesel::delete(tickets::table).execute(&mut conn)?;
    info!("cleared {deleted} tickets");
    println!("Deleted {deleted} tickets.");
    Ok(())
}
