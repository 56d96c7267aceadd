//! Row-level narrowing of listings and lookups.

use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use super::principal::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Everything,
    /// Rows whose user belongs to this club
    Club(Uuid),
    /// Rows referencing this user
    OnlyUser(Uuid),
}

impl Scope {
    pub fn for_principal(principal: &Principal) -> Self {
        if principal.is_admin() {
            Scope::Everything
        } else if principal.is_dive_officer() {
            Scope::Club(principal.club_id)
        } else {
            Scope::OnlyUser(principal.user_id)
        }
    }

    /// Append ` AND ...` restricting the query. The query must already have
    /// a WHERE clause.
    pub fn push_filter(&self, qb: &mut QueryBuilder<'_, Sqlite>, user_col: &str, club_col: &str) {
        match self {
            Scope::Everything => {}
            Scope::Club(club_id) => {
                qb.push(" AND ").push(club_col).push(" = ").push_bind(*club_id);
            }
            Scope::OnlyUser(user_id) => {
                qb.push(" AND ").push(user_col).push(" = ").push_bind(*user_id);
            }
        }
    }

    /// Whether a row for `user_id` (a member of `club_id`) is visible.
    pub fn admits(&self, user_id: Uuid, club_id: Uuid) -> bool {
        match self {
            Scope::Everything => true,
            Scope::Club(club) => *club == club_id,
            Scope::OnlyUser(user) => *user == user_id,
        }
    }
}
