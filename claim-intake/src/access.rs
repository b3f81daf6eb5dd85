use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Account category reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    Member,
    Guest,
}

impl FromStr for UserType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(UserType::Member),
            "guest" => Ok(UserType::Guest),
            _ => Err(()),
        }
    }
}

/// Where a viewer lands after sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landing {
    /// Case list, with the wizard one click away
    Dashboard,
    WizardOnly,
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub account_id: String,
    pub user_type: UserType,
}

impl Viewer {
    /// Build from the raw account id and user-type claim. A missing claim
    /// means a member; a claim we do not recognize gets guest access only.
    pub fn new(account_id: impl Into<String>, user_type: Option<&str>) -> Self {
        let user_type = match user_type {
            None => UserType::default(),
            Some(raw) => raw.parse().unwrap_or(UserType::Guest),
        };
        Self {
            account_id: account_id.into(),
            user_type,
        }
    }

    pub fn landing(&self) -> Landing {
        match self.user_type {
            UserType::Member => Landing::Dashboard,
            UserType::Guest => Landing::WizardOnly,
        }
    }

    pub fn can_view_cases(&self) -> bool {
        self.landing() == Landing::Dashboard
    }
}
