use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::external::warehouse::{Warehouse, WarehouseError, WarehouseRow};

/// BigQuery REST implementation of the warehouse interface.
///
/// Uses the synchronous `jobs.query` endpoint with named parameters so the
/// SQL templates stay free of string interpolation. Tables in templates are
/// unqualified; `defaultDataset` pins them to the configured dataset.
pub struct BigQueryWarehouse {
    client: reqwest::Client,
    project_id: String,
    dataset: String,
    access_token: String,
}

impl BigQueryWarehouse {
    pub fn from_env() -> Result<Self, WarehouseError> {
        let project_id = std::env::var("WAREHOUSE_PROJECT_ID")
            .map_err(|_| WarehouseError::Transport("WAREHOUSE_PROJECT_ID not set".into()))?;
        let dataset = std::env::var("WAREHOUSE_DATASET")
            .map_err(|_| WarehouseError::Transport("WAREHOUSE_DATASET not set".into()))?;
        let access_token = std::env::var("WAREHOUSE_ACCESS_TOKEN")
            .map_err(|_| WarehouseError::Transport("WAREHOUSE_ACCESS_TOKEN not set".into()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            project_id,
            dataset,
            access_token,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    parameter_mode: &'a str,
    query_parameters: Vec<QueryParameter>,
    default_dataset: DatasetReference<'a>,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParameter {
    name: String,
    parameter_type: ParameterType,
    parameter_value: ParameterValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParameterType {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParameterValue {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    schema: Option<Schema>,
    rows: Option<Vec<RawRow>>,
    job_complete: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Schema {
    fields: Vec<Field>,
}

#[derive(Debug, Deserialize)]
struct Field {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    v: Value,
}

/// Zip the positional cell values against the schema column names.
fn decode_rows(schema: &Schema, rows: Vec<RawRow>) -> Result<Vec<WarehouseRow>, WarehouseError> {
    let mut out = Vec::with_capacity(rows.len());
    for raw in rows {
        if raw.f.len() != schema.fields.len() {
            return Err(WarehouseError::Malformed(format!(
                "row has {} cells but schema has {} fields",
                raw.f.len(),
                schema.fields.len()
            )));
        }
        let mut row = WarehouseRow::new();
        for (field, cell) in schema.fields.iter().zip(raw.f) {
            row.set(&field.name, cell.v);
        }
        out.push(row);
    }
    Ok(out)
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn execute(
        &self,
        sql: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Result<Vec<WarehouseRow>, WarehouseError> {
        let url = format!(
            "https://bigquery.googleapis.com/bigquery/v2/projects/{}/queries",
            self.project_id
        );

        let request = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: params
                .iter()
                .map(|(name, value)| QueryParameter {
                    name: name.clone(),
                    parameter_type: ParameterType { r#type: "STRING" },
                    parameter_value: ParameterValue {
                        value: value.clone(),
                    },
                })
                .collect(),
            default_dataset: DatasetReference {
                project_id: &self.project_id,
                dataset_id: &self.dataset,
            },
            timeout_ms: timeout.as_millis() as u64,
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WarehouseError::Timeout
                } else {
                    WarehouseError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "unknown error".into());
            return Err(WarehouseError::Transport(format!("HTTP {}: {}", status, body)));
        }

        let body = resp
            .json::<QueryResponse>()
            .await
            .map_err(|e| WarehouseError::Malformed(e.to_string()))?;

        if body.job_complete == Some(false) {
            // Synchronous queries that exceed timeoutMs come back incomplete.
            return Err(WarehouseError::Timeout);
        }

        let rows = match body.rows {
            Some(rows) if !rows.is_empty() => rows,
            _ => return Ok(Vec::new()),
        };

        let schema = body
            .schema
            .ok_or_else(|| WarehouseError::Malformed("rows without schema".into()))?;

        decode_rows(&schema, rows)
    }
}
