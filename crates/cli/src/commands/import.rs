use std::path::Path;

use reacji_core::catalog_io::{load_catalog_file, CatalogFileError};
use reacji_core::config::{AppConfig, LoadOptions};
use reacji_core::errors::StoreError;
use reacji_core::store::EmojiStore;
use reacji_db::{connect_with_settings, SqlEmojiStore};

use crate::commands::{build_runtime, CommandResult};

pub fn run(file: &Path) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "import",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let records = match load_catalog_file(file) {
        Ok(records) => records,
        Err(error) => {
            let error_class = match &error {
                CatalogFileError::NotFound(_) => "file_not_found",
                CatalogFileError::InvalidJson(_) | CatalogFileError::NotAnArray => "invalid_json",
                CatalogFileError::InvalidEntry { .. } => "invalid_entry",
                CatalogFileError::Read(_) | CatalogFileError::Write(_) => "io",
            };
            return CommandResult::failure("import", error_class, error.to_string(), 2);
        }
    };

    let runtime = match build_runtime("import") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let total = records.len();
    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let store = SqlEmojiStore::new(pool.clone());

        // Row-by-row so one duplicate does not sink the rest of the file.
        let mut inserted = 0usize;
        let mut duplicates = 0usize;
        for record in records {
            match store.insert(record).await {
                Ok(_) => inserted += 1,
                Err(StoreError::DuplicateCode(_)) => duplicates += 1,
                Err(error) => {
                    pool.close().await;
                    return Err(("store", error.to_string(), 5u8));
                }
            }
        }

        pool.close().await;
        Ok::<(usize, usize), (&'static str, String, u8)>((inserted, duplicates))
    });

    match result {
        Ok((inserted, duplicates)) => CommandResult::success(
            "import",
            format!(
                "imported {inserted} of {total} entries from `{}` ({duplicates} already present)",
                file.display()
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("import", error_class, message, exit_code)
        }
    }
}
