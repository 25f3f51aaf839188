use gcal_events::components::google_calendar::TokenManager;
use gcal_events::startup;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // The consent URL and callback status are only reported through tracing
    startup::init_logging()?;

    // Load configuration
    let config = startup::load_config()?;

    // Always run the browser flow, even if a token is cached
    let token_manager = TokenManager::new(&config, reqwest::Client::new())?
        .interactive(true, config.oauth_redirect_port);

    println!("Opening browser for Google Calendar authorization...");
    let token = token_manager.authorize_and_store().await?;

    println!(
        "Token successfully saved to {}{}",
        config.token_file.display(),
        if token.refresh_token.is_some() {
            ""
        } else {
            " (no refresh token was issued, revoke access and run again for offline use)"
        }
    );

    Ok(())
}
