use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ParseValueError, StoreError};
use crate::filter::Filterable;
use crate::store::{Entity, EntityStore};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
    New,
}

impl ClientStatus {
    pub const ALL: [ClientStatus; 3] = [Self::Active, Self::Inactive, Self::New];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::New => "new",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::New => "New",
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "new" => Ok(Self::New),
            _ => Err(ParseValueError::new("client status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Technology,
    Healthcare,
    Finance,
    Education,
    Retail,
    Manufacturing,
}

impl Industry {
    pub const ALL: [Industry; 6] = [
        Self::Technology,
        Self::Healthcare,
        Self::Finance,
        Self::Education,
        Self::Retail,
        Self::Manufacturing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technology => "technology",
            Self::Healthcare => "healthcare",
            Self::Finance => "finance",
            Self::Education => "education",
            Self::Retail => "retail",
            Self::Manufacturing => "manufacturing",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Healthcare => "Healthcare",
            Self::Finance => "Finance",
            Self::Education => "Education",
            Self::Retail => "Retail",
            Self::Manufacturing => "Manufacturing",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Industry {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|industry| industry.as_str() == lower)
            .ok_or_else(|| ParseValueError::new("industry", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub status: ClientStatus,
    pub industry: Industry,
    pub last_contact: NaiveDate,
    pub projects: u32,
    pub revenue: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Everything a new client carries before the store assigns its id and
/// zeroed counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientDraft {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub status: ClientStatus,
    pub industry: Industry,
    pub last_contact: NaiveDate,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl ClientDraft {
    fn into_client(self, id: String) -> Client {
        Client {
            id,
            name: self.name,
            company: self.company,
            email: self.email,
            phone: self.phone,
            status: self.status,
            industry: self.industry,
            last_contact: self.last_contact,
            projects: 0,
            revenue: 0,
            avatar: self.avatar,
        }
    }
}

impl Entity for Client {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Filterable for Client {
    type Status = ClientStatus;
    type Category = Industry;

    const CATEGORY_KEY: &'static str = "industry";

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.company.as_str(), self.email.as_str()]
    }

    fn status(&self) -> ClientStatus {
        self.status
    }

    fn category(&self) -> Industry {
        self.industry
    }
}

impl EntityStore<Client> {
    /// Creates a client at the front of the list.
    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn add_client(&mut self, draft: ClientDraft) -> Result<&Client, StoreError> {
        let id = self.allocate_id();
        let client = draft.into_client(id);
        info!(id = %client.id, company = %client.company, "adding client");
        self.prepend(client)
    }
}
