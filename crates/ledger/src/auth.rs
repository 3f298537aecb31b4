//! Login, registration and logout.
use api_types::user::{AuthResponse, LoginRequest, RegisterRequest, UserView};

use crate::{
    client::{ApiClient, ApiRequest, Transport},
    error::{LedgerError, ResultLedger},
    navigation::Route,
};

pub struct Auth<T> {
    api: ApiClient<T>,
}

impl<T: Transport> Auth<T> {
    pub fn new(api: ApiClient<T>) -> Self {
        Self { api }
    }

    /// Exchanges credentials for a token, stores it and opens the dashboard.
    pub async fn login(&self, email: &str, password: &str) -> ResultLedger<Option<UserView>> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(LedgerError::validation("Email and password are required"));
        }

        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let res: AuthResponse = self
            .api
            .fetch_public(ApiRequest::post("users/login", &body)?)
            .await?;
        let token = res.token.unwrap_or_default();
        self.api.session().sign_in(&token)?;
        self.api.session().navigator().navigate(Route::Dashboard);
        Ok(res.user)
    }

    /// Creates an account. The user still has to log in afterwards.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ResultLedger<()> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(LedgerError::validation("All fields are required"));
        }

        let body = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.api
            .execute_public(ApiRequest::post("users/register", &body)?)
            .await?;
        tracing::info!("registered {email}");
        self.api.session().navigator().navigate(Route::Login);
        Ok(())
    }

    pub fn logout(&self) {
        self.api.session().sign_out();
    }
}
