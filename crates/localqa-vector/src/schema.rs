use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// `chunk_id` is the row's position in `chunks.json`.
pub fn build_vectors_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("chunk_id", DataType::Int32, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
