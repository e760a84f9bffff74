use std::path::Path;

use reacji_core::catalog_io::export_catalog_file;
use reacji_core::config::{AppConfig, LoadOptions};
use reacji_core::domain::EmojiRecord;
use reacji_core::store::EmojiStore;
use reacji_db::{connect_with_settings, SqlEmojiStore};

use crate::commands::{build_runtime, CommandResult};

const EXPORT_PAGE_SIZE: usize = 1000;

pub fn run(file: &Path) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "export",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("export") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let store = SqlEmojiStore::new(pool.clone());
        let mut catalog: Vec<EmojiRecord> = Vec::new();
        let mut offset = 0;
        loop {
            let page = store
                .get_all(EXPORT_PAGE_SIZE, offset)
                .await
                .map_err(|error| ("store", error.to_string(), 5u8))?;
            let page_len = page.len();
            catalog.extend(page);
            if page_len < EXPORT_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        pool.close().await;
        Ok::<Vec<EmojiRecord>, (&'static str, String, u8)>(catalog)
    });

    let catalog = match result {
        Ok(catalog) => catalog,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("export", error_class, message, exit_code);
        }
    };

    match export_catalog_file(file, &catalog) {
        Ok(()) => CommandResult::success(
            "export",
            format!("exported {} entries to `{}`", catalog.len(), file.display()),
        ),
        Err(error) => CommandResult::failure("export", "io", error.to_string(), 2),
    }
}
