use std::path::Path;

use anyhow::{bail, Result};
use tracing::{error, info, warn};

use keymill_core::config::AppConfig;
use keymill_core::cookies::load_cookies;
use keymill_inbox::email_prefix_from_cookies;
use keymill_register::SignupEngine;

/// Batch command: register `count` accounts strictly sequentially, one
/// fresh browser pair per iteration. A failed or crashed iteration never
/// takes the rest of the batch down with it.
pub async fn run(config: AppConfig, count: u32) -> Result<()> {
    let cookies = match load_cookies(
        Path::new(&config.files.cookies_file),
        config.files.cookie_max_age_days,
    ) {
        Some(cookies) => cookies,
        None => bail!("no valid webmail cookies; run `keymill setup-cookies` first"),
    };

    let prefix = match email_prefix_from_cookies(&cookies, &config.email.auth_cookie) {
        Some(prefix) => prefix,
        None => {
            warn!(
                fallback = %config.email.default_prefix,
                "could not derive email prefix from cookies, using configured default"
            );
            config.email.default_prefix.clone()
        }
    };

    let credentials_file = config.files.credentials_file.clone();
    let engine = SignupEngine::new(config);

    let mut successful = 0u32;
    for iteration in 1..=count {
        info!(iteration, total = count, "starting iteration");

        match engine.run_once(&cookies, &prefix).await {
            Ok(Some(record)) => {
                successful += 1;
                info!(email = %record.email, "iteration succeeded");
            }
            Ok(None) => {
                warn!(iteration, "iteration failed, moving on");
            }
            Err(e) => {
                error!(iteration, error = %e, "iteration aborted unexpectedly, moving on");
            }
        }
    }

    let failed = count - successful;
    let rate = if count > 0 {
        successful as f64 / count as f64 * 100.0
    } else {
        0.0
    };

    println!("\n╔══════════════════════════════════════════════╗");
    println!("║           Sign-up Batch Summary              ║");
    println!("╠══════════════════════════════════════════════╣");
    println!("║ Attempted:            {:>20}    ║", count);
    println!("║ Successful:           {:>20}    ║", successful);
    println!("║ Failed:               {:>20}    ║", failed);
    println!("║ Success Rate:         {:>19.1}%   ║", rate);
    println!("╚══════════════════════════════════════════════╝\n");
    println!("Credentials appended to {credentials_file}");

    Ok(())
}
