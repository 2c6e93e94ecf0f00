use crate::core::Result;
use crate::store::client::StoreClient;
use crate::store::document::Document;

/// Pull the full set of documents for a named collection in one pass.
///
/// The snapshot is fully materialized before normalization begins so
/// that reads never interleave with writes on the same collection. An
/// empty collection is an empty vec, not an error; a snapshot failure
/// is fatal for the whole run because no meaningful repair is possible
/// without read access.
pub fn scan<C: StoreClient>(client: &C, collection: &str) -> Result<Vec<Document>> {
    let docs = client.collection_snapshot(collection)?;
    tracing::info!(
        collection = %collection,
        documents = docs.len(),
        "collection snapshot loaded"
    );
    Ok(docs)
}
