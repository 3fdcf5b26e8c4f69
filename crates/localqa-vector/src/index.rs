//! Nearest-neighbor search over the LanceDB vector table.
use anyhow::Result;
use lancedb::{Connection, Table};
use tokio::runtime::Handle;
use tracing::debug;

use localqa_core::error::{Error, Result as CoreResult};
use localqa_core::types::{Metric, SearchHit};

use crate::table::{nearest, read_ids, vector_dim};

fn rank(a: &SearchHit, b: &SearchHit) -> std::cmp::Ordering {
    b.score.total_cmp(&a.score).then(a.chunk_id.cmp(&b.chunk_id))
}

/// Requires the stored ids to be exactly `0..n` in some order.
pub fn check_ids(mut ids: Vec<i32>) -> CoreResult<()> {
    ids.sort_unstable();
    for (pos, id) in ids.iter().enumerate() {
        if usize::try_from(*id).ok() != Some(pos) {
            return Err(Error::MisalignedArtifacts(format!(
                "expected chunk_id {} at position {}, found {}",
                pos, pos, id
            )));
        }
    }
    Ok(())
}

/// An opened vector table. Searches run on the runtime the index was opened on.
pub struct LanceIndex {
    table: Table,
    runtime: Handle,
    metric: Metric,
    len: usize,
    dim: usize,
}

impl LanceIndex {
    /// Must be called from within a tokio runtime.
    pub async fn open(conn: &Connection, name: &str, metric: Metric) -> Result<Self> {
        let table = conn.open_table(name).execute().await?;
        let dim = vector_dim(&table).await?;
        let ids = read_ids(&table).await?;
        let len = ids.len();
        check_ids(ids)?;
        Ok(Self { table, runtime: Handle::current(), metric, len, dim })
    }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn dim(&self) -> usize { self.dim }

    /// Nearest `k` rows, best first; equal scores keep ascending chunk id.
    /// `k` above the table size returns every row.
    pub async fn search_async(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let k = k.min(self.len);
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut limit = (2 * k).min(self.len);
        loop {
            let mut hits = nearest(&self.table, query, self.metric, limit).await?;
            hits.sort_by(rank);
            // rows tied with the k-th may sit past the limit
            let settled = limit >= self.len
                || hits.len() <= k
                || hits.last().map_or(true, |last| last.score < hits[k - 1].score);
            if settled {
                hits.truncate(k);
                debug!(k, limit, "vector search");
                return Ok(hits);
            }
            limit = (limit * 2).min(self.len);
        }
    }

    /// Blocking form of [`search_async`](Self::search_async). Call it from a
    /// plain or `spawn_blocking` thread, never from inside an async task.
    pub fn search(&self, query: &[f32], k: usize) -> CoreResult<Vec<SearchHit>> {
        self.runtime
            .block_on(self.search_async(query, k))
            .map_err(|e| Error::VectorSearch(format!("{:#}", e)))
    }
}
