use std::env;

use portfolio_api::client::{LikeClient, LikedPosts};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let post = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --bin like-post <POST_ID_OR_SLUG>");
        eprintln!("  API_URL     base URL of the API (default http://127.0.0.1:3001)");
        eprintln!("  LIKES_FILE  liked posts file (default .liked-posts.json)");
        std::process::exit(1);
    });
    let base_url = env::var("API_URL").unwrap_or_else(|_| "http://127.0.0.1:3001".to_string());
    let likes_file = env::var("LIKES_FILE").unwrap_or_else(|_| ".liked-posts.json".to_string());

    let mut liked = match LikedPosts::load(&likes_file) {
        Ok(liked) => liked,
        Err(e) => {
            eprintln!("Error reading {}: {}", likes_file, e);
            std::process::exit(1);
        }
    };

    let client = LikeClient::new(&base_url);
    let mut toggle = match client.load(&post, &liked).await {
        Ok(toggle) => toggle,
        Err(e) => {
            eprintln!("Error loading post {}: {}", post, e);
            std::process::exit(1);
        }
    };

    println!(
        "\nPost     : {}\nLiked    : {}\nLikes    : {}",
        toggle.post_id(),
        toggle.liked(),
        toggle.count()
    );

    match client.toggle(&mut toggle, &mut liked).await {
        Ok(outcome) => {
            println!("Now      : {} ({} likes)", if toggle.liked() { "liked" } else { "not liked" }, outcome.likes);
            if let Some(warning) = outcome.warning {
                println!("Warning  : {}", warning);
            }
            println!();
        }
        Err(e) => {
            eprintln!("Failed to update like: {}", e);
            eprintln!("Local state restored ({} likes).", toggle.count());
            std::process::exit(1);
        }
    }
}
