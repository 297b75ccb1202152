//! In-memory stand-ins for the primary and secondary stores, plus token
//! helpers for driving the router in tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::auth::{Claims, JwtKeys};
use crate::database::models::member::{MalformedRow, Member, SecondaryMemberRow};
use crate::database::{DatabaseError, MemberSnapshot, MemberStore, RoleStore};
use crate::permissions::Role;

pub const TEST_JWT_SECRET: &str = "test-secret-for-unit-tests";
pub const TEST_AUDIENCE: &str = "authenticated";

#[derive(Debug, Clone)]
enum StoredRow {
    Native(Member),
    Json(SecondaryMemberRow),
    Undecodable(String),
}

/// Member table held in memory. A `json_groups` store keeps rows in the
/// secondary representation so reads go through the same decoding path
/// as MySQL.
pub struct MemoryMemberStore {
    label: String,
    json_groups: bool,
    rows: Mutex<BTreeMap<String, StoredRow>>,
    offline: AtomicBool,
    failing_ids: Mutex<HashSet<String>>,
    remaining_upserts: Mutex<Option<usize>>,
    upsert_calls: AtomicUsize,
    schema_ready: AtomicBool,
}

impl MemoryMemberStore {
    pub fn primary() -> Arc<Self> {
        Arc::new(Self::new("primary", false))
    }

    pub fn secondary() -> Arc<Self> {
        Arc::new(Self::new("secondary", true))
    }

    fn new(label: &str, json_groups: bool) -> Self {
        Self {
            label: label.to_string(),
            json_groups,
            rows: Mutex::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
            failing_ids: Mutex::new(HashSet::new()),
            remaining_upserts: Mutex::new(None),
            upsert_calls: AtomicUsize::new(0),
            schema_ready: AtomicBool::new(false),
        }
    }

    pub fn insert(&self, member: Member) {
        let row = self.encode(&member);
        self.rows.lock().unwrap().insert(member.id.clone(), row);
    }

    /// Store a secondary-shaped row verbatim, bypassing encoding
    pub fn insert_raw(&self, row: SecondaryMemberRow) {
        self.rows.lock().unwrap().insert(row.id.clone(), StoredRow::Json(row));
    }

    /// Store a row that fails to decode on read, like a NULL inside a
    /// PostgreSQL array column
    pub fn insert_undecodable(&self, id: &str, reason: &str) {
        self.rows.lock().unwrap().insert(id.to_string(), StoredRow::Undecodable(reason.to_string()));
    }

    pub fn get(&self, id: &str) -> Option<Member> {
        match self.rows.lock().unwrap().get(id)? {
            StoredRow::Native(member) => Some(member.clone()),
            StoredRow::Json(row) => Member::try_from(row.clone()).ok(),
            StoredRow::Undecodable(_) => None,
        }
    }

    pub fn members(&self) -> Vec<Member> {
        let ids: Vec<String> = self.rows.lock().unwrap().keys().cloned().collect();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Writes touching this id fail, batch included
    pub fn fail_writes_for(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    /// Accept this many more upsert calls, then drop the connection for good
    pub fn go_offline_after(&self, upserts: usize) {
        *self.remaining_upserts.lock().unwrap() = Some(upserts);
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn schema_ready(&self) -> bool {
        self.schema_ready.load(Ordering::SeqCst)
    }

    fn encode(&self, member: &Member) -> StoredRow {
        if self.json_groups {
            StoredRow::Json(SecondaryMemberRow::from(member))
        } else {
            StoredRow::Native(member.clone())
        }
    }

    fn consume_upsert_allowance(&self) {
        let mut remaining = self.remaining_upserts.lock().unwrap();
        match remaining.as_mut() {
            Some(0) => self.set_offline(true),
            Some(left) => *left -= 1,
            None => {}
        }
    }

    fn check_online(&self) -> Result<(), DatabaseError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionError(format!("{} store refused connection", self.label)));
        }
        Ok(())
    }
}

#[async_trait]
impl MemberStore for MemoryMemberStore {
    fn label(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.check_online()
    }

    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        self.check_online()?;
        self.schema_ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_all(&self) -> Result<MemberSnapshot, DatabaseError> {
        self.check_online()?;
        let mut snapshot = MemberSnapshot::default();
        for (id, row) in self.rows.lock().unwrap().iter() {
            match row {
                StoredRow::Native(member) => snapshot.members.push(member.clone()),
                StoredRow::Json(row) => match Member::try_from(row.clone()) {
                    Ok(member) => snapshot.members.push(member),
                    Err(malformed) => snapshot.rejected.push(malformed),
                },
                StoredRow::Undecodable(reason) => snapshot.rejected.push(MalformedRow {
                    id: id.clone(),
                    reason: reason.clone(),
                }),
            }
        }
        Ok(snapshot)
    }

    async fn upsert_batch(&self, members: &[Member]) -> Result<(), DatabaseError> {
        self.consume_upsert_allowance();
        self.check_online()?;
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_ids.lock().unwrap();
        if let Some(member) = members.iter().find(|m| failing.contains(&m.id)) {
            return Err(DatabaseError::QueryError(format!("constraint violated by {}", member.id)));
        }
        drop(failing);

        let mut rows = self.rows.lock().unwrap();
        for member in members {
            rows.insert(member.id.clone(), self.encode(member));
        }
        Ok(())
    }
}

/// Role rows held in memory
#[derive(Default)]
pub struct MemoryRoleStore {
    rows: Mutex<HashMap<Uuid, Vec<String>>>,
    offline: AtomicBool,
}

impl MemoryRoleStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_rows(user_id: Uuid, roles: &[&str]) -> Arc<Self> {
        let store = Self::default();
        store
            .rows
            .lock()
            .unwrap()
            .insert(user_id, roles.iter().map(|r| r.to_string()).collect());
        Arc::new(store)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn rows_for(&self, user_id: Uuid) -> Vec<String> {
        self.rows.lock().unwrap().get(&user_id).cloned().unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), DatabaseError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionError("role store refused connection".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn roles_for(&self, user_id: Uuid) -> Result<Vec<String>, DatabaseError> {
        self.check_online()?;
        Ok(self.rows_for(user_id))
    }

    async fn assign(&self, user_id: Uuid, role: Role) -> Result<(), DatabaseError> {
        self.check_online()?;
        self.rows.lock().unwrap().insert(user_id, vec![role.as_str().to_string()]);
        Ok(())
    }

    async fn revoke(&self, user_id: Uuid, role: Role) -> Result<bool, DatabaseError> {
        self.check_online()?;
        let names = role.stored_names();
        let mut rows = self.rows.lock().unwrap();
        let Some(held) = rows.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = held.len();
        held.retain(|r| !names.contains(&r.as_str()));
        Ok(held.len() != before)
    }
}

pub fn test_keys() -> JwtKeys {
    JwtKeys::new(TEST_JWT_SECRET, TEST_AUDIENCE, 1)
}

pub fn bearer_for(user_id: Uuid) -> String {
    let claims = Claims::new(user_id, Some(format!("{}@example.org", user_id.simple())), TEST_AUDIENCE, 1);
    let token = test_keys().encode(&claims).expect("test token");
    format!("Bearer {}", token)
}
