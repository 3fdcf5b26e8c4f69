//! LanceDB helpers for the `chunk_id -> vector` table.
use anyhow::{anyhow, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator};
use arrow_schema::DataType;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, DistanceType, Table};
use std::sync::Arc;

use localqa_core::types::{ChunkId, Metric, SearchHit};

use crate::schema::build_vectors_schema;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

/// Creates `table` holding one row per vector; row `i` gets `chunk_id = i`.
pub async fn write_vectors(conn: &Connection, table: &str, vectors: &[Vec<f32>], dim: usize) -> Result<()> {
    let dim = i32::try_from(dim)?;
    let schema = build_vectors_schema(dim);
    if vectors.is_empty() {
        conn.create_empty_table(table, schema).execute().await?;
        return Ok(());
    }
    let ids = (0..vectors.len()).map(i32::try_from).collect::<Result<Vec<i32>, _>>()?;
    let values: Vec<Option<Vec<Option<f32>>>> = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect())).collect();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(ids)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(values.into_iter(), dim)),
        ],
    )?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    conn.create_table(table, reader).execute().await?;
    Ok(())
}

/// Width of the `vector` column.
pub async fn vector_dim(table: &Table) -> Result<usize> {
    let schema = table.schema().await?;
    match schema.field_with_name("vector")?.data_type() {
        DataType::FixedSizeList(_, size) => Ok(usize::try_from(*size)?),
        other => Err(anyhow!("vector column has type {:?}, expected a fixed-size list", other)),
    }
}

/// Every `chunk_id` in storage order. Vectors are not read.
pub async fn read_ids(table: &Table) -> Result<Vec<i32>> {
    let total = table.count_rows(None).await?;
    if total == 0 { return Ok(Vec::new()); }
    let mut ids = Vec::with_capacity(total);
    let mut stream = table.query().select(Select::columns(&["chunk_id"])).limit(total).execute().await?;
    while let Some(batch) = stream.try_next().await? {
        let col = batch
            .column_by_name("chunk_id")
            .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
            .ok_or_else(|| anyhow!("table has no Int32 chunk_id column"))?;
        ids.extend(col.values().iter().copied());
    }
    Ok(ids)
}

pub fn distance_type(metric: Metric) -> DistanceType {
    match metric {
        Metric::Dot => DistanceType::Dot,
        Metric::L2 => DistanceType::L2,
    }
}

/// The `limit` rows LanceDB ranks nearest to `query`, scored with `metric`.
pub async fn nearest(table: &Table, query: &[f32], metric: Metric, limit: usize) -> Result<Vec<SearchHit>> {
    let mut stream = table
        .vector_search(query.to_vec())?
        .distance_type(distance_type(metric))
        .limit(limit)
        .execute()
        .await?;
    let mut hits = Vec::with_capacity(limit);
    while let Some(batch) = stream.try_next().await? {
        let ids = batch
            .column_by_name("chunk_id")
            .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
            .ok_or_else(|| anyhow!("search result has no chunk_id column"))?;
        let vecs = batch
            .column_by_name("vector")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| anyhow!("search result has no vector column"))?;
        for i in 0..batch.num_rows() {
            if !vecs.is_valid(i) { continue; }
            let inner = vecs.value(i);
            let score = metric.similarity(query, inner.as_primitive::<Float32Type>().values());
            hits.push(SearchHit { chunk_id: ChunkId::try_from(ids.value(i))?, score });
        }
    }
    Ok(hits)
}
