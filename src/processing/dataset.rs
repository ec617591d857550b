//! Movie plot CSV loading.
//!
//! Rows released before the configured year are dropped, a seeded random sample is drawn, and
//! each sampled row becomes a [`Document`]: the text column becomes `raw_text` and every column,
//! the text column included, is kept in metadata under its CSV name.

use crate::config::DatasetConfig;
use crate::processing::types::Document;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde_json::{Map, Value};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Column holding the release year used for filtering.
pub const RELEASE_YEAR_COLUMN: &str = "Release Year";

/// Errors produced while reading the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// File could not be opened or a row could not be parsed.
    #[error("failed to read dataset '{path}': {source}")]
    Csv {
        /// Dataset location.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
    /// Configured text column is absent from the header.
    #[error("dataset has no column named '{0}'")]
    MissingColumn(String),
}

/// Load and sample documents from the CSV at `config.path`.
pub fn load_documents(config: &DatasetConfig) -> Result<Vec<Document>, DatasetError> {
    let reader = csv::Reader::from_path(&config.path).map_err(|source| DatasetError::Csv {
        path: config.path.clone(),
        source,
    })?;
    let documents = read_documents(reader, config)?;
    tracing::info!(
        path = %config.path.display(),
        documents = documents.len(),
        "Dataset loaded"
    );
    Ok(documents)
}

/// Read, filter and sample documents from an open CSV reader.
pub fn read_documents<R: io::Read>(
    mut reader: csv::Reader<R>,
    config: &DatasetConfig,
) -> Result<Vec<Document>, DatasetError> {
    let csv_error = |source| DatasetError::Csv {
        path: config.path.clone(),
        source,
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    let text_index = headers
        .iter()
        .position(|header| header == config.text_column)
        .ok_or_else(|| DatasetError::MissingColumn(config.text_column.clone()))?;
    let year_index = headers
        .iter()
        .position(|header| header == RELEASE_YEAR_COLUMN);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let eligible = match year_index {
            Some(index) => parse_year(row.get(index))
                .is_some_and(|year| year >= config.min_release_year),
            None => true,
        };
        if eligible {
            rows.push(row);
        } else {
            skipped += 1;
        }
    }

    if rows.len() > config.rows {
        let mut rng = StdRng::seed_from_u64(config.seed);
        rows.shuffle(&mut rng);
        rows.truncate(config.rows);
    }
    tracing::debug!(
        kept = rows.len(),
        skipped,
        min_release_year = config.min_release_year,
        "Filtered dataset rows"
    );

    Ok(rows
        .iter()
        .enumerate()
        .map(|(position, row)| {
            let mut metadata = Map::new();
            for (index, (header, value)) in headers.iter().zip(row.iter()).enumerate() {
                let value = if Some(index) == year_index {
                    parse_year(Some(value))
                        .map(Value::from)
                        .unwrap_or_else(|| Value::String(value.to_string()))
                } else {
                    Value::String(value.to_string())
                };
                metadata.insert(header.to_string(), value);
            }
            Document {
                id: position as u64 + 1,
                raw_text: row.get(text_index).unwrap_or_default().to_string(),
                metadata,
            }
        })
        .collect())
}

fn parse_year(value: Option<&str>) -> Option<i64> {
    value.and_then(|raw| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const CSV: &str = "\
Release Year,Title,Director,Plot
1999,Old Movie,Someone,Too old to keep.
2001,Heist,Ann Lee,A crew robs a casino.
2005,Space,Bo Kim,\"Astronauts drift, alone.\"
2010,River,Cy Park,Two brothers sail south.
";

    fn config(rows: usize) -> DatasetConfig {
        DatasetConfig {
            path: "movies.csv".into(),
            rows,
            text_column: "Plot".into(),
            min_release_year: 2000,
            seed: 42,
        }
    }

    fn read(rows: usize) -> Vec<Document> {
        read_documents(csv::Reader::from_reader(CSV.as_bytes()), &config(rows)).expect("documents")
    }

    #[test]
    fn filters_old_rows_and_keeps_every_column() {
        let documents = read(10);
        assert_eq!(documents.len(), 3);
        let heist = &documents[0];
        assert_eq!(heist.id, 1);
        assert_eq!(heist.raw_text, "A crew robs a casino.");
        assert_eq!(heist.metadata["Title"], json!("Heist"));
        assert_eq!(heist.metadata["Release Year"], json!(2001));
        assert_eq!(heist.metadata["Plot"], json!("A crew robs a casino."));
        assert_eq!(heist.metadata["Director"], json!("Ann Lee"));
        assert_eq!(documents[1].raw_text, "Astronauts drift, alone.");
    }

    #[test]
    fn sampling_is_deterministic_for_a_seed() {
        let first = read(2);
        let second = read(2);
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        let ids: Vec<u64> = first.iter().map(|document| document.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(first.iter().all(|document| document.metadata["Title"] != json!("Old Movie")));
    }

    #[test]
    fn missing_text_column_is_reported() {
        let mut config = config(5);
        config.text_column = "Synopsis".into();
        let error = read_documents(csv::Reader::from_reader(CSV.as_bytes()), &config)
            .expect_err("missing column");
        assert!(matches!(error, DatasetError::MissingColumn(column) if column == "Synopsis"));
    }

    #[test]
    fn loads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(CSV.as_bytes()).expect("write csv");
        let mut config = config(10);
        config.path = file.path().to_path_buf();

        let documents = load_documents(&config).expect("documents");
        assert_eq!(documents.len(), 3);
    }

    #[test]
    fn missing_file_is_a_csv_error() {
        let mut config = config(10);
        config.path = "/nonexistent/plots.csv".into();
        assert!(matches!(
            load_documents(&config),
            Err(DatasetError::Csv { .. })
        ));
    }
}
