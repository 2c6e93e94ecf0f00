//! JSON-file-backed store client used by the operator binaries.
//!
//! Each collection lives in `<root>/<collection>.json` as one JSON
//! object keyed by document key; authentication principals live in
//! `<root>/principals.json`. A commit applies the whole batch in
//! memory first and then rewrites every touched file through a
//! temp-file rename, so a half-applied collection is never visible on
//! disk. Atomicity is per collection file: a crash between renames can
//! leave a multi-collection batch applied to some collections and not
//! others. The repair and copy flows only ever commit single-collection
//! batches, and every operation in this crate is idempotent, so a
//! re-run converges either way.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tempfile::NamedTempFile;

use crate::config::{ServiceAccountKey, StoreConfig};
use crate::core::{FieldValue, MigrateError, Result};
use crate::store::client::{FieldWrite, Principal, StoreClient, WriteBatch, WriteOp};
use crate::store::document::Document;

type Fields = BTreeMap<String, FieldValue>;
type Collection = BTreeMap<String, Fields>;

const PRINCIPALS_FILE: &str = "principals.json";

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    project_id: String,
}

impl FileStore {
    /// Open the store for a configured environment. Fails before
    /// touching any data when the credential file is absent.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let key = ServiceAccountKey::load(&config.credential_path)?;
        let root = config
            .data_dir
            .clone()
            .unwrap_or_else(|| Path::new("data").join(&key.project_id));
        fs::create_dir_all(&root).map_err(|e| {
            MigrateError::Setup(format!(
                "cannot create store root '{}': {}",
                root.display(),
                e
            ))
        })?;
        tracing::debug!(project = %key.project_id, root = %root.display(), "file store opened");
        Ok(Self {
            root,
            project_id: key.project_id,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.json", collection))
    }

    fn load_collection(&self, collection: &str) -> Result<Collection> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Collection::new());
        }
        let raw = fs::read_to_string(&path)?;
        let json: JsonValue = serde_json::from_str(&raw).map_err(|e| {
            MigrateError::CorruptCollection(collection.to_string(), e.to_string())
        })?;
        let obj = json.as_object().ok_or_else(|| {
            MigrateError::CorruptCollection(
                collection.to_string(),
                "top level is not a JSON object".to_string(),
            )
        })?;

        let mut docs = Collection::new();
        for (key, doc_json) in obj {
            match FieldValue::from_json(doc_json) {
                FieldValue::Map(fields) => {
                    docs.insert(key.clone(), fields);
                }
                other => {
                    return Err(MigrateError::CorruptCollection(
                        collection.to_string(),
                        format!("document '{}' is a {}, not a map", key, other.type_name()),
                    ));
                }
            }
        }
        Ok(docs)
    }

    fn write_json_atomically(&self, path: &Path, json: &JsonValue) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut tmp, json)?;
        tmp.write_all(b"\n")?;
        tmp.persist(path)
            .map_err(|e| MigrateError::CommitFailed(e.to_string()))?;
        Ok(())
    }

    fn store_collection(&self, collection: &str, docs: &Collection) -> Result<()> {
        let json = JsonValue::Object(
            docs.iter()
                .map(|(key, fields)| {
                    (
                        key.clone(),
                        FieldValue::Map(fields.clone()).to_json(),
                    )
                })
                .collect(),
        );
        self.write_json_atomically(&self.collection_path(collection), &json)
    }

    fn load_principals(&self) -> Result<BTreeMap<String, Principal>> {
        let path = self.root.join(PRINCIPALS_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str(&raw).map_err(|e| {
            MigrateError::CorruptCollection(PRINCIPALS_FILE.to_string(), e.to_string())
        })
    }

    fn store_principals(&self, principals: &BTreeMap<String, Principal>) -> Result<()> {
        let json = serde_json::to_value(principals)?;
        self.write_json_atomically(&self.root.join(PRINCIPALS_FILE), &json)
    }

    fn apply(docs: &mut Collection, op: WriteOp) {
        match op {
            WriteOp::Update { key, fields, .. } => {
                let doc = docs.entry(key).or_default();
                for (name, write) in fields {
                    match write {
                        FieldWrite::Set(value) => {
                            doc.insert(name, value);
                        }
                        FieldWrite::Delete => {
                            doc.remove(&name);
                        }
                    }
                }
            }
            WriteOp::SetMerge { key, fields, .. } => {
                let doc = docs.entry(key).or_default();
                for (name, value) in fields {
                    if value.is_null() {
                        doc.remove(&name);
                    } else {
                        doc.insert(name, value);
                    }
                }
            }
            WriteOp::Delete { key, .. } => {
                docs.remove(&key);
            }
        }
    }
}

impl StoreClient for FileStore {
    fn collection_snapshot(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self
            .load_collection(collection)?
            .into_iter()
            .map(|(key, fields)| Document { key, fields })
            .collect())
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        Ok(self
            .load_collection(collection)?
            .remove(key)
            .map(|fields| Document {
                key: key.to_string(),
                fields,
            }))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        // Load every touched collection, apply the full batch in
        // memory, then persist. Nothing reaches disk until the whole
        // batch has applied cleanly; each collection file is then
        // renamed into place on its own (see the module doc for the
        // multi-collection bound).
        let mut touched: BTreeMap<String, Collection> = BTreeMap::new();
        for op in batch.into_ops() {
            if let Some(docs) = touched.get_mut(op.collection()) {
                Self::apply(docs, op);
                continue;
            }
            let mut docs = self.load_collection(op.collection())?;
            let collection = op.collection().to_string();
            Self::apply(&mut docs, op);
            touched.insert(collection, docs);
        }
        for (collection, docs) in &touched {
            self.store_collection(collection, docs)?;
        }
        Ok(())
    }

    fn list_principals(&self) -> Result<Vec<Principal>> {
        Ok(self.load_principals()?.into_values().collect())
    }

    fn create_principal(&mut self, principal: Principal) -> Result<bool> {
        let mut principals = self.load_principals()?;
        if principals.contains_key(&principal.uid) {
            return Ok(false);
        }
        principals.insert(principal.uid.clone(), principal);
        self.store_principals(&principals)?;
        Ok(true)
    }
}
