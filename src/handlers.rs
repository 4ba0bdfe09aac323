use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::{json, Value};

use crate::error::ServiceError;
use crate::schema::{self, UserLogin, ValidationError};
use crate::services::Services;

type HandlerResult = Result<HttpResponse, ServiceError>;

/// Register every route plus the JSON body settings on an app or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ServiceError::from(ValidationError::field("body", err.to_string())).into()
    }))
    .service(home)
    .service(signup)
    .service(login)
    .service(list_users)
    .service(get_user)
    .service(update_user)
    .service(delete_user)
    .service(list_tweets)
    .service(get_tweet)
    .service(create_tweet)
    .service(update_tweet)
    .service(delete_tweet);
}

#[get("/")]
pub async fn home() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Hello World" }))
}

// Users

#[post("/signup")]
pub async fn signup(services: web::Data<Services>, body: web::Json<Value>) -> HandlerResult {
    let users = services.users.clone();
    let user = web::block(move || users.register(body.into_inner())).await??;
    Ok(HttpResponse::Created().json(user))
}

#[post("/login")]
pub async fn login(services: web::Data<Services>, body: web::Json<Value>) -> HandlerResult {
    let credentials = schema::parse::<UserLogin>(body.into_inner())?;
    let users = services.users.clone();
    let user =
        web::block(move || users.login(&credentials.email, &credentials.password)).await??;
    Ok(HttpResponse::Ok().json(user))
}

#[get("/users/")]
pub async fn list_users(services: web::Data<Services>) -> HandlerResult {
    let users = services.users.clone();
    let all = web::block(move || users.get_all()).await??;
    Ok(HttpResponse::Ok().json(all))
}

#[get("/users/{user_id}")]
pub async fn get_user(services: web::Data<Services>, user_id: web::Path<String>) -> HandlerResult {
    let user_id = schema::parse_id(&user_id)?;
    let users = services.users.clone();
    let user = web::block(move || users.get_by_id(user_id)).await??;
    Ok(HttpResponse::Ok().json(user))
}

#[put("/users/{user_id}")]
pub async fn update_user(
    services: web::Data<Services>,
    user_id: web::Path<String>,
    body: web::Json<Value>,
) -> HandlerResult {
    let user_id = schema::parse_id(&user_id)?;
    let users = services.users.clone();
    let user = web::block(move || users.update(user_id, body.into_inner())).await??;
    Ok(HttpResponse::Ok().json(user))
}

#[delete("/users/{user_id}")]
pub async fn delete_user(
    services: web::Data<Services>,
    user_id: web::Path<String>,
) -> HandlerResult {
    let user_id = schema::parse_id(&user_id)?;
    let users = services.users.clone();
    let user = web::block(move || users.delete(user_id)).await??;
    Ok(HttpResponse::Ok().json(user))
}

// Tweets

#[get("/tweets/")]
pub async fn list_tweets(services: web::Data<Services>) -> HandlerResult {
    let tweets = services.tweets.clone();
    let all = web::block(move || tweets.get_all()).await??;
    Ok(HttpResponse::Ok().json(all))
}

#[get("/tweets/{tweet_id}")]
pub async fn get_tweet(
    services: web::Data<Services>,
    tweet_id: web::Path<String>,
) -> HandlerResult {
    let tweet_id = schema::parse_id(&tweet_id)?;
    let tweets = services.tweets.clone();
    let tweet = web::block(move || tweets.get_by_id(tweet_id)).await??;
    Ok(HttpResponse::Ok().json(tweet))
}

#[post("/tweets/")]
pub async fn create_tweet(services: web::Data<Services>, body: web::Json<Value>) -> HandlerResult {
    let tweets = services.tweets.clone();
    let tweet = web::block(move || tweets.create(body.into_inner())).await??;
    Ok(HttpResponse::Created().json(tweet))
}

#[put("/tweets/{tweet_id}")]
pub async fn update_tweet(
    services: web::Data<Services>,
    tweet_id: web::Path<String>,
    body: web::Json<Value>,
) -> HandlerResult {
    let tweet_id = schema::parse_id(&tweet_id)?;
    let tweets = services.tweets.clone();
    let tweet = web::block(move || tweets.update(tweet_id, body.into_inner())).await??;
    Ok(HttpResponse::Ok().json(tweet))
}

#[delete("/tweets/{tweet_id}")]
pub async fn delete_tweet(
    services: web::Data<Services>,
    tweet_id: web::Path<String>,
) -> HandlerResult {
    let tweet_id = schema::parse_id(&tweet_id)?;
    let tweets = services.tweets.clone();
    let tweet = web::block(move || tweets.delete(tweet_id)).await??;
    Ok(HttpResponse::Ok().json(tweet))
}
