use std::error::Error;

use chrono::{Duration, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use futures::future::try_join_all;
use serde_json::json;
use uuid::Uuid;

use twitter_api::canonical;
use twitter_api::config::Config;
use twitter_api::services::{Services, TweetService, UserService};
use twitter_api::store::JsonFileStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();
    println!("Starting data seeding...");

    let config = Config::from_env()?;
    let store = JsonFileStore::new(&config.data_dir, config.lock_timeout);
    let services = Services::open(&store, config.bcrypt_cost)?;

    let num_users = count_from_env("SEED_USERS", 100)?;
    let tweets_per_user = count_from_env("SEED_TWEETS_PER_USER", 20)?;

    let users = seed_users(&services.users, num_users).await?;
    seed_tweets(&services.tweets, &users, tweets_per_user)?;

    println!("Seeding completed!");
    Ok(())
}

fn count_from_env(var: &str, default: usize) -> Result<usize, Box<dyn Error>> {
    match std::env::var(var) {
        Ok(raw) => Ok(raw.trim().parse()?),
        Err(_) => Ok(default),
    }
}

fn fake_user(index: usize) -> serde_json::Value {
    let email: String = SafeEmail().fake();
    let age_days: i64 = (6_000..25_000).fake();
    let birth_date = Utc::now().date_naive() - Duration::days(age_days);
    json!({
        "user_id": Uuid::new_v4(),
        // Prefixed so two fake addresses never collide.
        "email": format!("{index}.{email}"),
        "first_name": FirstName().fake::<String>(),
        "last_name": LastName().fake::<String>(),
        "birth_date": canonical::encode_date(&birth_date),
        "password": "password123",
    })
}

/// Registrations are bcrypt-bound, so run them a CPU's worth at a time.
async fn seed_users(users: &UserService, count: usize) -> Result<Vec<Uuid>, Box<dyn Error>> {
    println!("Creating {} users...", count);
    let mut created = Vec::with_capacity(count);
    let batch = num_cpus::get().max(1);

    for start in (0..count).step_by(batch) {
        let tasks = (start..count.min(start + batch)).map(|index| {
            let users = users.clone();
            let input = fake_user(index);
            tokio::task::spawn_blocking(move || users.register(input))
        });
        for registered in try_join_all(tasks).await? {
            let user = registered?;
            created.push(user.user_id);
            println!(
                "Created user {}/{}: {} ({})",
                created.len(),
                count,
                user.email,
                user.user_id
            );
        }
    }

    Ok(created)
}

fn seed_tweets(
    tweets: &TweetService,
    users: &[Uuid],
    tweets_per_user: usize,
) -> Result<(), Box<dyn Error>> {
    println!("Creating {} tweets per user...", tweets_per_user);
    let total_tweets = users.len() * tweets_per_user;
    let mut current_tweet = 0;

    for &user_id in users {
        for _ in 0..tweets_per_user {
            let sentence: String = Sentence(3..10).fake();
            let content: String = sentence.chars().take(256).collect();
            tweets.create(json!({
                "tweet_id": Uuid::new_v4(),
                "user_id": user_id,
                "content": content,
            }))?;

            current_tweet += 1;
            if current_tweet % 100 == 0 {
                println!("Created {}/{} tweets", current_tweet, total_tweets);
            }
        }
    }

    Ok(())
}
