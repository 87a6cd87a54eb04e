//! Persistence of name policies
//!
//! Policies are stored as JSON-encoded [`PolicyRecord`] values in a key-value store addressed by
//! opaque identifiers. The [`PolicyStore`] trait abstracts the store; [`MemoryPolicyStore`] is a
//! simple in-process implementation. [`PolicyDb`] scopes access to the policies of one authority.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::policy::engine::NamePolicyEngine;
use crate::policy::settings::NamePolicySettings;
use crate::util::file_utils::get_file_as_byte_vec;
use crate::util::logging::*;
use crate::{Error, Result};

/// The `PolicyStore` trait defines the interface to a key-value store holding serialized policy
/// records.
pub trait PolicyStore {
    /// `get` returns the value stored under the given identifier or [`Error::NotFound`].
    fn get(&self, id: &str) -> Result<Vec<u8>>;

    /// `list` returns every identifier and value in the store.
    fn list(&self) -> Result<Vec<(String, Vec<u8>)>>;

    /// `put` stores a value under the given identifier, replacing any prior value.
    fn put(&mut self, id: &str, value: Vec<u8>) -> Result<()>;
}

/// `MemoryPolicyStore` is a [`PolicyStore`] backed by a map.
#[derive(Clone, Debug, Default)]
pub struct MemoryPolicyStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryPolicyStore {
    /// `new` returns an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// `from_records` returns a store holding the serialized form of each record, keyed by
    /// record identifier.
    pub fn from_records(records: &[PolicyRecord]) -> Result<Self> {
        let mut store = Self::new();
        for record in records {
            store.put(&record.id, serde_json::to_vec(record)?)?;
        }
        Ok(store)
    }
}

/// `read_policy_store` reads a file containing a JSON array of [`PolicyRecord`] values into a
/// [`MemoryPolicyStore`].
pub fn read_policy_store(fname: &str) -> Result<MemoryPolicyStore> {
    let json = get_file_as_byte_vec(Path::new(fname))?;
    let records: Vec<PolicyRecord> = match serde_json::from_slice(&json) {
        Ok(records) => records,
        Err(e) => {
            log_message(
                &PolicyLogLevels::PolicyError,
                &format!("Failed to parse policy store {}: {}", fname, e),
            );
            return Err(Error::from(e));
        }
    };
    MemoryPolicyStore::from_records(&records)
}

impl PolicyStore for MemoryPolicyStore {
    fn get(&self, id: &str) -> Result<Vec<u8>> {
        match self.entries.get(id) {
            Some(v) => Ok(v.clone()),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    fn list(&self) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn put(&mut self, id: &str, value: Vec<u8>) -> Result<()> {
        self.entries.insert(id.to_string(), value);
        Ok(())
    }
}

/// `PolicyRecord` is the stored form of a named policy owned by an authority.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Identifier of the record within the store
    pub id: String,
    /// Identifier of the authority that owns the policy
    pub authority_id: String,
    /// Human-readable name of the policy
    #[serde(default)]
    pub name: String,
    /// Policy settings
    #[serde(default)]
    pub settings: NamePolicySettings,
    /// Records are marked as deleted rather than removed
    #[serde(default)]
    pub deleted: bool,
}

fn unmarshal_record(id: &str, data: &[u8]) -> Result<PolicyRecord> {
    match serde_json::from_slice(data) {
        Ok(record) => Ok(record),
        Err(e) => {
            log_message(
                &PolicyLogLevels::PolicyError,
                &format!("Failed to unmarshal policy record {}: {}", id, e),
            );
            Err(Error::ParseError(format!("policy {}: {}", id, e)))
        }
    }
}

/// `PolicyDb` provides access to the policies of a single authority held in a [`PolicyStore`].
#[derive(Clone, Debug)]
pub struct PolicyDb<S: PolicyStore> {
    store: S,
    authority_id: String,
}

impl<S: PolicyStore> PolicyDb<S> {
    /// `new` returns a PolicyDb for the given authority.
    pub fn new(store: S, authority_id: &str) -> Self {
        PolicyDb {
            store,
            authority_id: authority_id.to_string(),
        }
    }

    /// `authority_id` returns the identifier of the authority the PolicyDb serves.
    pub fn authority_id(&self) -> &str {
        &self.authority_id
    }

    /// `store` returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// `get_policy` returns the record with the given identifier. A record that is absent yields
    /// [`Error::NotFound`], one that is marked as deleted yields [`Error::Deleted`] and one owned by
    /// a different authority yields [`Error::AuthorityMismatch`].
    pub fn get_policy(&self, id: &str) -> Result<PolicyRecord> {
        let data = self.store.get(id)?;
        let record = unmarshal_record(id, &data)?;
        if record.deleted {
            return Err(Error::Deleted(id.to_string()));
        }
        if record.authority_id != self.authority_id {
            return Err(Error::AuthorityMismatch {
                id: id.to_string(),
                authority_id: self.authority_id.clone(),
            });
        }
        Ok(record)
    }

    /// `get_policies` returns every record owned by the authority that is not marked as deleted.
    pub fn get_policies(&self) -> Result<Vec<PolicyRecord>> {
        let mut records = vec![];
        for (id, data) in self.store.list()? {
            let record = unmarshal_record(&id, &data)?;
            if record.deleted || record.authority_id != self.authority_id {
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }

    /// `put_policy` stores a record, which must be owned by the authority. The settings are
    /// validated before anything is written.
    pub fn put_policy(&mut self, record: &PolicyRecord) -> Result<()> {
        if record.authority_id != self.authority_id {
            return Err(Error::AuthorityMismatch {
                id: record.id.clone(),
                authority_id: self.authority_id.clone(),
            });
        }
        NamePolicyEngine::from_settings(&record.settings)?;
        let data = serde_json::to_vec(record)?;
        self.store.put(&record.id, data)?;
        log_message(
            &PolicyLogLevels::PolicyDebug,
            &format!("Stored policy {} for authority {}", record.id, self.authority_id),
        );
        Ok(())
    }

    /// `delete_policy` marks a record as deleted.
    pub fn delete_policy(&mut self, id: &str) -> Result<()> {
        let mut record = self.get_policy(id)?;
        record.deleted = true;
        let data = serde_json::to_vec(&record)?;
        self.store.put(id, data)
    }

    /// `load_engine` builds an engine from the settings of the identified record.
    pub fn load_engine(&self, id: &str) -> Result<NamePolicyEngine> {
        let record = self.get_policy(id)?;
        NamePolicyEngine::from_settings(&record.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, authority_id: &str) -> PolicyRecord {
        let mut settings = NamePolicySettings::default();
        settings.permitted.dns_domains = Some(vec!["example.com".to_string()]);
        PolicyRecord {
            id: id.to_string(),
            authority_id: authority_id.to_string(),
            name: format!("policy {}", id),
            settings,
            deleted: false,
        }
    }

    #[test]
    fn memory_store() {
        let mut store = MemoryPolicyStore::new();
        assert_eq!(Err(Error::NotFound("a".to_string())), store.get("a"));
        store.put("a", b"1".to_vec()).unwrap();
        store.put("a", b"2".to_vec()).unwrap();
        assert_eq!(b"2".to_vec(), store.get("a").unwrap());
        assert_eq!(1, store.list().unwrap().len());
    }

    #[test]
    fn policy_db() {
        let mut store = MemoryPolicyStore::new();
        let mut deleted = record("p3", "ca1");
        deleted.deleted = true;
        store
            .put("p3", serde_json::to_vec(&deleted).unwrap())
            .unwrap();
        store
            .put("p2", serde_json::to_vec(&record("p2", "ca2")).unwrap())
            .unwrap();

        let mut db = PolicyDb::new(store, "ca1");
        db.put_policy(&record("p1", "ca1")).unwrap();
        assert!(matches!(
            db.put_policy(&record("p4", "ca2")),
            Err(Error::AuthorityMismatch { .. })
        ));

        assert_eq!(record("p1", "ca1"), db.get_policy("p1").unwrap());
        assert_eq!(
            Err(Error::AuthorityMismatch {
                id: "p2".to_string(),
                authority_id: "ca1".to_string()
            }),
            db.get_policy("p2")
        );
        assert_eq!(Err(Error::Deleted("p3".to_string())), db.get_policy("p3"));
        assert_eq!(Err(Error::NotFound("p9".to_string())), db.get_policy("p9"));

        let policies = db.get_policies().unwrap();
        assert_eq!(1, policies.len());
        assert_eq!("p1", policies[0].id);

        let engine = db.load_engine("p1").unwrap();
        assert_eq!(1, engine.permitted().dns_domains.len());

        db.delete_policy("p1").unwrap();
        assert_eq!(Err(Error::Deleted("p1".to_string())), db.get_policy("p1"));
        assert!(db.get_policies().unwrap().is_empty());
    }

    #[test]
    fn invalid_records() {
        let mut store = MemoryPolicyStore::new();
        store.put("bad", b"{".to_vec()).unwrap();
        let mut db = PolicyDb::new(store, "ca1");
        assert!(matches!(db.get_policy("bad"), Err(Error::ParseError(_))));
        assert!(db.get_policies().is_err());

        let mut r = record("p1", "ca1");
        r.settings.excluded.ip_ranges = Some(vec!["not-a-network".to_string()]);
        assert!(matches!(
            db.put_policy(&r),
            Err(Error::InvalidConstraint { .. })
        ));
        assert!(matches!(db.get_policy("p1"), Err(Error::NotFound(_))));
    }
}
