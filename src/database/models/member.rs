use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Columns shared by both stores, in insert order. `id` must stay first.
pub const MEMBER_COLUMNS: &[&str] = &[
    "id",
    "name",
    "email",
    "phone",
    "address",
    "date_of_birth",
    "gender",
    "baptized",
    "department",
    "position",
    "service_year",
    "profile_image",
    "family_id",
    "user_id",
    "groups",
    "created_at",
    "updated_at",
];

/// A directory member as the primary store holds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub baptized: Option<bool>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub service_year: Option<i32>,
    pub profile_image: Option<String>,
    pub family_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            phone: None,
            address: None,
            date_of_birth: None,
            gender: None,
            baptized: None,
            department: None,
            position: None,
            service_year: None,
            profile_image: None,
            family_id: None,
            user_id: None,
            groups: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }
}

/// A member row as the secondary (MySQL) store holds it: `groups` is a
/// JSON array string, everything else maps one to one.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SecondaryMemberRow {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub baptized: Option<bool>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub service_year: Option<i32>,
    pub profile_image: Option<String>,
    pub family_id: Option<String>,
    pub user_id: Option<String>,
    pub groups: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
#[error("member '{id}' could not be decoded: {reason}")]
pub struct MalformedRow {
    pub id: String,
    pub reason: String,
}

pub fn encode_groups(groups: &[String]) -> String {
    // A Vec<String> always serializes; the fallback is unreachable in practice
    serde_json::to_string(groups).unwrap_or_else(|_| "[]".to_string())
}

/// NULL and blank decode as an empty list
pub fn decode_groups(raw: Option<&str>) -> Result<Vec<String>, serde_json::Error> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text),
    }
}

impl From<&Member> for SecondaryMemberRow {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.clone(),
            name: member.name.clone(),
            email: member.email.clone(),
            phone: member.phone.clone(),
            address: member.address.clone(),
            date_of_birth: member.date_of_birth,
            gender: member.gender.clone(),
            baptized: member.baptized,
            department: member.department.clone(),
            position: member.position.clone(),
            service_year: member.service_year,
            profile_image: member.profile_image.clone(),
            family_id: member.family_id.clone(),
            user_id: member.user_id.clone(),
            groups: Some(encode_groups(&member.groups)),
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

impl TryFrom<SecondaryMemberRow> for Member {
    type Error = MalformedRow;

    fn try_from(row: SecondaryMemberRow) -> Result<Self, Self::Error> {
        let groups = decode_groups(row.groups.as_deref()).map_err(|e| MalformedRow {
            id: row.id.clone(),
            reason: format!("groups: {}", e),
        })?;

        Ok(Member {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            date_of_birth: row.date_of_birth,
            gender: row.gender,
            baptized: row.baptized,
            department: row.department,
            position: row.position,
            service_year: row.service_year,
            profile_image: row.profile_image,
            family_id: row.family_id,
            user_id: row.user_id,
            groups,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
