use std::io::Write;
use std::path::Path;

use anyhow::Result;

use keymill_browser::BrowserSession;
use keymill_core::config::AppConfig;
use keymill_core::cookies::save_cookies;
use keymill_inbox::email_prefix_from_cookies;

/// Interactive cookie capture: the operator signs into the webmail by hand
/// in a headed browser, then the session cookies are persisted for the
/// automation runs.
pub async fn run(config: AppConfig) -> Result<()> {
    let mut browser_config = config.browser.clone();
    // The operator has to see the page to log in.
    browser_config.headless = false;

    let session = BrowserSession::launch(&browser_config)?;
    session.navigate(&config.email.check_url).await?;

    println!("============================================================");
    println!("Manual webmail login");
    println!("============================================================");
    println!("1. A browser window is open at {}", config.email.check_url);
    println!("2. Log into the inbox that receives verification mail");
    println!("3. Wait until the message list is visible");
    println!("4. Press Enter here to capture the session");
    print!("> ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    let cookies = session.get_cookies()?;
    save_cookies(Path::new(&config.files.cookies_file), &cookies)?;

    match email_prefix_from_cookies(&cookies, &config.email.auth_cookie) {
        Some(prefix) => {
            println!("Saved {} cookies; detected inbox prefix '{prefix}'", cookies.len());
        }
        None => {
            println!(
                "Saved {} cookies; no prefix detected, the configured default '{}' will be used",
                cookies.len(),
                config.email.default_prefix
            );
        }
    }

    Ok(())
}
