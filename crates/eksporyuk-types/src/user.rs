//! Users and roles.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Authorization role attached to every user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Affiliate,
    Member,
}

crate::string_enum!(Role {
    Admin => "ADMIN",
    Affiliate => "AFFILIATE",
    Member => "MEMBER",
});

/// Public view of a user account. Never carries credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: u64,
}
