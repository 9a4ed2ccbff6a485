use techquest_backend::auth::{sign_jwt_for_user, SERVICE_KEY_HEADER};

use super::app::{TestApp, TEST_SERVICE_KEY};

/// Mints an access token the way the hosted auth provider would.
pub fn token_for(app: &TestApp, user_id: &str) -> String {
    sign_jwt_for_user(user_id, &app.config.jwt_secret, 1).expect("sign test token")
}

pub fn new_user_token(app: &TestApp) -> (String, String) {
    let user_id = format!("user-{}", uuid::Uuid::new_v4().simple());
    let token = token_for(app, &user_id);
    (user_id, token)
}

pub fn auth_header(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn bearer(token: &str) -> [(&'static str, String); 1] {
    [("authorization", auth_header(token))]
}

pub fn service_headers() -> [(&'static str, String); 1] {
    [(SERVICE_KEY_HEADER, TEST_SERVICE_KEY.to_string())]
}
