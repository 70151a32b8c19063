use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use swift_orders::ValidationError;
use swift_orders::error::require;
use tracing::info;

use crate::error::ClientError;
use crate::network::ApiClient;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(alias = "id")]
    pub customer_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    #[serde(alias = "id")]
    pub driver_id: String,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default, alias = "isAvailable")]
    pub available: bool,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sign-in responses come either wrapped as `{"customer": {...}}` or bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum CustomerEnvelope {
    Wrapped { customer: Customer },
    Bare(Customer),
}

impl From<CustomerEnvelope> for Customer {
    fn from(envelope: CustomerEnvelope) -> Self {
        match envelope {
            CustomerEnvelope::Wrapped { customer } | CustomerEnvelope::Bare(customer) => customer,
        }
    }
}

/// Customer registration form.
#[derive(Debug, Clone, Default)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUp {
    /// Rejects the form before anything is sent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::MissingField { field: "password" });
        }

        let email = self.email.trim();
        if !looks_like_email(email) {
            return Err(ValidationError::InvalidEmail {
                email: email.to_string(),
            });
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }

        Ok(())
    }
}

/// `local@domain.tld` with no whitespace anywhere and non-empty parts.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    !local.is_empty() && !host.is_empty() && !tld.is_empty()
}

impl ApiClient {
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<Customer, ClientError> {
        require("username", username)?;
        require("password", password)?;

        let envelope: CustomerEnvelope = self
            .post(
                "/auth/customer",
                &json!({"username": username, "password": password}),
            )
            .await?;
        let customer = Customer::from(envelope);

        info!(customer_id = %customer.customer_id, "Customer signed in");
        Ok(customer)
    }

    pub async fn sign_up(&self, form: &SignUp) -> Result<Value, ClientError> {
        form.validate()?;

        let body = json!({
            "customerName": form.name.trim(),
            "customerEmail": form.email.trim(),
            "password": form.password,
        });

        Ok(self.post("/auth/sign-up", &body).await?)
    }

    /// Drivers sign in with their email as the username.
    pub async fn driver_sign_in(&self, email: &str, password: &str) -> Result<Value, ClientError> {
        require("email", email)?;
        require("password", password)?;

        Ok(self
            .post("/auth/driver", &json!({"username": email, "password": password}))
            .await?)
    }

    pub async fn driver_sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Value, ClientError> {
        require("name", name)?;
        require("email", email)?;
        require("password", password)?;

        let body = json!({
            "driverName": name.trim(),
            "driverEmail": email.trim(),
            "password": password,
        });

        Ok(self.post("/auth/driver-sign-up", &body).await?)
    }

    pub async fn driver_sign_out(&self, driver_id: &str) -> Result<Value, ClientError> {
        require("driverId", driver_id)?;

        Ok(self
            .post("/driver-logout", &json!({"driverId": driver_id}))
            .await?)
    }
}
