use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub store_backend: String,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub auth_token_secret: String,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "styledecor.db".to_string()),
            store_backend: env::var("STORE").unwrap_or_else(|_| "sqlite".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            auth_token_secret: env::var("AUTH_TOKEN_SECRET")
                .unwrap_or_else(|_| "changeme".to_string()),
            checkout_success_url: env::var("CHECKOUT_SUCCESS_URL").unwrap_or_else(|_| {
                "http://localhost:5173/payment/success?session_id={CHECKOUT_SESSION_ID}".to_string()
            }),
            checkout_cancel_url: env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| "http://localhost:5173/payment/cancel".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
        }
    }
}
