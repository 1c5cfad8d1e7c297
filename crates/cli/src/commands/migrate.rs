use crate::commands::{connect_and_migrate, run_async, CommandResult};

pub fn run() -> CommandResult {
    let result = run_async("migrate", |config| async move {
        let pool = connect_and_migrate(&config).await?;
        pool.close().await;
        Ok(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => failure,
    }
}
