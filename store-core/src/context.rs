//! Per-request capabilities injected into the resolver and the forms.

use std::collections::HashMap;

use crate::models::Customer;

/// Who is making the current request.
pub trait AuthContext: Send + Sync {
    /// The logged-in storefront customer, if any. Administrators and
    /// anonymous visitors yield `None`.
    fn authenticated_customer(&self) -> Option<&Customer>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Principal {
    #[default]
    Anonymous,
    Customer(Customer),
    Admin {
        login_id: String,
    },
}

impl AuthContext for Principal {
    fn authenticated_customer(&self) -> Option<&Customer> {
        match self {
            Self::Customer(customer) => Some(customer),
            Self::Anonymous | Self::Admin { .. } => None,
        }
    }
}

/// The HTTP request a form submission arrived with.
pub trait RequestContext: Send + Sync {
    /// True when the submission came from a modal sub-form.
    fn is_modal(&self) -> bool;
}

/// Query/body parameters of the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    params: HashMap<String, String>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

impl RequestContext for RequestParams {
    fn is_modal(&self) -> bool {
        self.get("modal") == Some("modal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer {
            id: 1,
            email: "buyer@example.com".to_string(),
            pref: None,
            country: None,
        }
    }

    #[test]
    fn only_customers_are_authenticated_customers() {
        assert!(Principal::Anonymous.authenticated_customer().is_none());
        assert!(
            Principal::Admin {
                login_id: "admin".to_string()
            }
            .authenticated_customer()
            .is_none()
        );
        assert_eq!(
            Principal::Customer(customer()).authenticated_customer(),
            Some(&customer())
        );
    }

    #[test]
    fn modal_requires_exact_marker_value() {
        assert!(RequestParams::new().with("modal", "modal").is_modal());
        assert!(!RequestParams::new().with("modal", "1").is_modal());
        assert!(!RequestParams::new().is_modal());
    }
}
