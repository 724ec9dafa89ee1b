use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use storefront_cli::commands::{config, migrate, popular, related, seed};
use storefront_db::repositories::{CatalogRepository, SqlCatalogRepository};
use storefront_db::{connect_with_settings, DemoCatalog};
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_database(&[], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_ranking_limit() {
    with_database(&[("STOREFRONT_RANKING_SIMILAR_LIMIT", "0")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_database(&[], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");

        assert_eq!(
            first_payload["message"],
            "demo catalog ready: 12 items, 7 orders, 14 order lines"
        );

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(second_payload["message"], "demo catalog ready: 0 items, 0 orders, 0 order lines");
    });
}

#[test]
fn seed_verification_failure_uses_seed_exit_code() {
    with_database(&[], || {
        assert_eq!(seed::run().exit_code, 0);
        retire_first_demo_item();

        let result = seed::run();
        assert_eq!(result.exit_code, 5, "seed failures share the migration/seed exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "seed_verification");
        assert!(payload["message"]
            .as_str()
            .expect("message string")
            .contains("demo-active-items"));
    });
}

#[test]
fn popular_ranks_seeded_history_and_pads_ascending() {
    with_database(&[], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = popular::run(None);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "popular");
        assert_eq!(item_ids(&payload), DemoCatalog::EXPECTED_POPULAR.to_vec());
    });
}

#[test]
fn popular_honours_explicit_limit_and_rejects_out_of_range() {
    with_database(&[], || {
        assert_eq!(seed::run().exit_code, 0);

        let payload = parse_payload(&popular::run(Some(2)).output);
        assert_eq!(item_ids(&payload), vec![3, 7]);

        let rejected = popular::run(Some(0));
        assert_eq!(rejected.exit_code, 2);
        assert_eq!(parse_payload(&rejected.output)["error_class"], "invalid_input");
    });
}

#[test]
fn popular_on_empty_catalog_returns_no_items() {
    with_database(&[("STOREFRONT_RANKING_POPULAR_LIMIT", "3")], || {
        assert_eq!(migrate::run().exit_code, 0);

        let payload = parse_payload(&popular::run(None).output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(item_ids(&payload), Vec::<i64>::new());
    });
}

#[test]
fn related_lists_similar_active_items() {
    with_database(&[], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = related::run("slim-denim-jacket");
        assert_eq!(result.exit_code, 0);

        let ids = item_ids(&parse_payload(&result.output));
        assert_eq!(ids.len(), 10);
        assert_eq!(ids[0], 4, "jeans share the most description terms with the jacket");
        assert!(!ids.contains(&3), "reference item must not recommend itself");
        assert!(!ids.contains(&12), "retired items are never recommended");
    });
}

#[test]
fn related_reports_unknown_slug_as_not_found() {
    with_database(&[], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = related::run("no-such-item");
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "not_found");
    });
}

#[test]
fn config_attributes_values_to_their_source() {
    with_database(&[("STOREFRONT_SERVER_PORT", "9090")], || {
        let output = config::run();

        assert!(output.contains("- server.port = 9090 (source: env (STOREFRONT_SERVER_PORT))"));
        assert!(output.contains("- ranking.popular_limit = 8 (source: default)"));
        assert!(output.contains("(source: env (STOREFRONT_DATABASE_URL))"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn item_ids(payload: &Value) -> Vec<i64> {
    payload["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["id"].as_i64().expect("numeric item id"))
        .collect()
}

/// Mark seeded item 1 inactive; reseeding leaves existing rows alone, so verification fails.
fn retire_first_demo_item() {
    let url = env::var("STOREFRONT_DATABASE_URL").expect("database url is set");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime");

    runtime.block_on(async {
        let pool = connect_with_settings(&url, 1, 5).await.expect("connect to seeded database");
        let item = DemoCatalog::items().into_iter().next().expect("demo items").inactive();
        SqlCatalogRepository::new(pool.clone()).save(item).await.expect("retire item");
        pool.close().await;
    });
}

/// Run `test_fn` against a fresh on-disk database with only `vars` set.
fn with_database(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("storefront.db").display());

    let mut all_vars = vec![("STOREFRONT_DATABASE_URL", url.as_str())];
    all_vars.extend_from_slice(vars);
    with_env(&all_vars, test_fn);
    drop(dir);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "STOREFRONT_DATABASE_URL",
        "STOREFRONT_DATABASE_MAX_CONNECTIONS",
        "STOREFRONT_DATABASE_TIMEOUT_SECS",
        "STOREFRONT_SERVER_BIND_ADDRESS",
        "STOREFRONT_SERVER_PORT",
        "STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "STOREFRONT_SERVER_RATE_LIMIT_PER_SEC",
        "STOREFRONT_SERVER_RATE_LIMIT_BURST",
        "STOREFRONT_RANKING_SIMILAR_LIMIT",
        "STOREFRONT_RANKING_POPULAR_LIMIT",
        "STOREFRONT_LOGGING_LEVEL",
        "STOREFRONT_LOGGING_FORMAT",
        "STOREFRONT_LOG_LEVEL",
        "STOREFRONT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
