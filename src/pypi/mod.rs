//! Daily PyPI download counts per version, from the public
//! `bigquery-public-data.pypi.file_downloads` table.
//!
//! The query goes through the BigQuery REST `jobs.query` endpoint and, when
//! the result spans several pages, `jobs.getQueryResults`. Rows come back as
//! untyped `{"f": [{"v": ...}]}` cells and are projected onto the schema's
//! column names.

use crate::model::{Error, Result};
use chrono::{DateTime, SecondsFormat};
use indexmap::IndexMap;
use log::{debug, info};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
const QUERY_TIMEOUT_MS: u64 = 60_000;

const DOWNLOADS_QUERY: &str = r#"
    SELECT
      TIMESTAMP_TRUNC(timestamp, DAY) AS day,
      file.version,
      COUNT(*) AS count_
    FROM
      bigquery-public-data.pypi.file_downloads
    WHERE
      project = @project AND
      timestamp >= TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL @days DAY)
    GROUP BY
      day,
      file.version
"#;

pub type Row = IndexMap<String, Value>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    schema: Option<Schema>,
    #[serde(default)]
    rows: Vec<RawRow>,
    page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Schema {
    fields: Vec<Field>,
}

#[derive(Debug, Clone, Deserialize)]
struct Field {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRow {
    f: Vec<Cell>,
}

#[derive(Debug, Clone, Deserialize)]
struct Cell {
    v: Value,
}

#[derive(Debug, Clone)]
pub struct BigQueryClient {
    http: Client,
    api_url: String,
    billing_project: String,
    token: String,
}

impl BigQueryClient {
    pub fn new(api_url: &str, billing_project: impl ToString, token: impl ToString) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            billing_project: billing_project.to_string(),
            token: token.to_string(),
        }
    }

    pub async fn fetch_downloads(
        &self,
        package: &str,
        days: u32,
        location: &str,
    ) -> Result<Vec<Row>> {
        let url = format!("{}/projects/{}/queries", self.api_url, self.billing_project);
        let body = downloads_request(package, days, location);
        let mut response: QueryResponse = self.send(self.http.post(&url).json(&body), &url).await?;

        if !response.job_complete {
            return Err(Error::BigQuery(format!(
                "query did not finish within {QUERY_TIMEOUT_MS} ms"
            )));
        }
        let schema = response
            .schema
            .take()
            .ok_or_else(|| Error::BigQuery("completed query has no schema".to_string()))?;

        let mut rows = project_rows(&schema, &response.rows)?;
        while let Some(page_token) = response.page_token.take() {
            let job = response
                .job_reference
                .as_ref()
                .ok_or_else(|| Error::BigQuery("paged result has no job reference".to_string()))?;
            let url = format!(
                "{}/projects/{}/queries/{}",
                self.api_url, self.billing_project, job.job_id
            );
            debug!("fetching next result page of job {}", job.job_id);
            let request = self.http.get(&url).query(&[
                ("pageToken", page_token.as_str()),
                ("location", job.location.as_deref().unwrap_or(location)),
            ]);
            let page: QueryResponse = self.send(request, &url).await?;
            rows.extend(project_rows(&schema, &page.rows)?);
            response = QueryResponse {
                job_reference: response.job_reference,
                ..page
            };
        }

        info!("{package}: {} download rows over {days} days", rows.len());
        Ok(rows)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status,
                url: url.to_string(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

fn downloads_request(package: &str, days: u32, location: &str) -> Value {
    json!({
        "query": DOWNLOADS_QUERY,
        "useLegacySql": false,
        "location": location,
        "timeoutMs": QUERY_TIMEOUT_MS,
        "parameterMode": "NAMED",
        "queryParameters": [
            {
                "name": "project",
                "parameterType": { "type": "STRING" },
                "parameterValue": { "value": package }
            },
            {
                "name": "days",
                "parameterType": { "type": "INT64" },
                "parameterValue": { "value": days.to_string() }
            }
        ]
    })
}

/// Names each cell after its schema column and decodes it by column type.
/// Timestamps become `{"value": "<RFC 3339>"}` objects.
fn project_rows(schema: &Schema, rows: &[RawRow]) -> Result<Vec<Row>> {
    rows.iter()
        .map(|row| {
            if row.f.len() != schema.fields.len() {
                return Err(Error::BigQuery(format!(
                    "row has {} cells for {} columns",
                    row.f.len(),
                    schema.fields.len()
                )));
            }
            schema
                .fields
                .iter()
                .zip(&row.f)
                .map(|(field, cell)| {
                    let value = decode_cell(field, &cell.v)?;
                    Ok::<_, Error>((field.name.clone(), value))
                })
                .collect::<Result<Row>>()
        })
        .collect()
}

fn decode_cell(field: &Field, value: &Value) -> Result<Value> {
    let Some(raw) = value.as_str() else {
        return Ok(value.clone());
    };
    let invalid = || {
        Error::BigQuery(format!(
            "column `{}`: bad {} value `{raw}`",
            field.name, field.field_type
        ))
    };
    match field.field_type.as_str() {
        "INTEGER" | "INT64" => raw.parse::<i64>().map(Value::from).map_err(|_| invalid()),
        "FLOAT" | "FLOAT64" => raw.parse::<f64>().map(Value::from).map_err(|_| invalid()),
        "BOOLEAN" | "BOOL" => raw.parse::<bool>().map(Value::from).map_err(|_| invalid()),
        "TIMESTAMP" => {
            let seconds = raw.parse::<f64>().map_err(|_| invalid())?;
            let millis = (seconds * 1000.0).round() as i64;
            let timestamp = DateTime::from_timestamp_millis(millis).ok_or_else(invalid)?;
            Ok(json!({ "value": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true) }))
        }
        _ => Ok(value.clone()),
    }
}
