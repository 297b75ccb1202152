pub mod manager;
pub mod member_store;
pub mod models;
pub mod role_store;

pub use manager::{DatabaseError, DatabaseManager};
pub use member_store::{MemberSnapshot, MemberStore, MySqlMemberStore, PostgresMemberStore};
pub use models::member::{Member, SecondaryMemberRow};
pub use role_store::{PostgresRoleStore, RoleStore};
