use shopdesk_db::{DemoCatalogDataset, SeedResult};

use crate::commands::{connect_and_migrate, run_async, CommandResult};

pub fn run() -> CommandResult {
    let result = run_async("seed", |config| async move {
        let pool = connect_and_migrate(&config).await?;

        let seeded = DemoCatalogDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoCatalogDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        pool.close().await;

        if verification.all_present {
            Ok(seeded)
        } else {
            Err(("seed_verification", verification_failure_message(&verification.checks), 6u8))
        }
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err(failure) => failure,
    }
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "demo catalog loaded: {} products, {} orders, {} inventory items",
        seeded.products, seeded.orders, seeded.inventory_items
    )
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
