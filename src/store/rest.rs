//! PostgREST client over `reqwest::blocking`

use reqwest::blocking::{Client, ClientBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use super::{DataStore, InsertOutcome, Query, Row};
use crate::config::Settings;
use crate::{ui, Error, Result};

const BODY_PREVIEW_CHARS: usize = 200;
const RETURN_REPRESENTATION: &str = "return=representation";
const IGNORE_DUPLICATES: &str = "return=representation,resolution=ignore-duplicates";

pub struct RestStore {
    client: Client,
    base_url: String,
    ignore_duplicates: bool,
}

impl RestStore {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self> {
        Self::with_builder(base_url, service_key, Client::builder())
    }

    fn with_builder(base_url: &str, service_key: &str, builder: ClientBuilder) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(service_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", service_key))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Prefer", HeaderValue::from_static(RETURN_REPRESENTATION));

        let client = builder.default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ignore_duplicates: true,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(&settings.rest_base(), &settings.service_key)?
            .with_ignore_duplicates(settings.ignore_duplicates))
    }

    /// Use `on_conflict` + `resolution=ignore-duplicates` for inserts.
    /// Requires a unique constraint over the key columns.
    pub fn with_ignore_duplicates(mut self, enabled: bool) -> Self {
        self.ignore_duplicates = enabled;
        self
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn read_rows(resp: Response, method: &'static str, table: &str) -> Result<Vec<Row>> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(http_error(method, table, status.as_u16(), &body));
        }
        let text = resp.text()?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn send_insert(&self, table: &str, row: &Value, conflict: Option<&[&str]>) -> Result<Vec<Row>> {
        let mut request = self.client.post(self.table_url(table)).json(row);
        if let Some(columns) = conflict {
            request = request
                .query(&[("on_conflict", columns.join(","))])
                .header("Prefer", IGNORE_DUPLICATES);
        }

        tracing::debug!("POST {}", table);
        let resp = request.send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            let err = http_error("POST", table, status.as_u16(), &body);
            ui::error(&err.to_string());
            return Err(err);
        }
        Self::read_rows(resp, "POST", table)
    }
}

impl DataStore for RestStore {
    fn get(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        tracing::debug!("GET {} {:?}", table, query.to_params());
        let resp = self
            .client
            .get(self.table_url(table))
            .query(&query.to_params())
            .send()?;
        Self::read_rows(resp, "GET", table)
    }

    fn post(&self, table: &str, row: &Value) -> Result<Row> {
        self.send_insert(table, row, None)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidData(format!("POST {} returned no representation", table)))
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let minimal = Query::new().select(&["id"]).limit(1);
        let resp = self
            .client
            .get(self.table_url(table))
            .query(&minimal.to_params())
            .send()?;
        tracing::debug!("exists? {} -> {}", table, resp.status());
        Ok(resp.status().is_success())
    }

    fn insert_if_absent(&self, table: &str, key: &Query, row: &Value) -> Result<InsertOutcome> {
        let existing = key.clone().select(&key.key_columns()).limit(1);
        if !self.get(table, &existing)?.is_empty() {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        if !self.ignore_duplicates {
            return self.post(table, row).map(InsertOutcome::Inserted);
        }

        // An empty representation means a concurrent writer got there first.
        let columns = key.key_columns();
        match self.send_insert(table, row, Some(columns.as_slice()))?.into_iter().next() {
            Some(created) => Ok(InsertOutcome::Inserted(created)),
            None => Ok(InsertOutcome::AlreadyPresent),
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::Config("service key contains characters not allowed in a header".to_string()))
}

fn http_error(method: &'static str, table: &str, status: u16, body: &str) -> Error {
    Error::Http {
        method,
        table: table.to_string(),
        status,
        body: truncate(body, BODY_PREVIEW_CHARS),
    }
}

/// First `max` characters of `text`, never splitting a character.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn store(server: &Server) -> RestStore {
        RestStore::with_builder(&server.url(), "key", Client::builder().no_proxy()).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Matcher {
        Matcher::AllOf(
            pairs
                .iter()
                .map(|(k, v)| Matcher::UrlEncoded(k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_table_url() {
        let store = RestStore::new("https://abc.supabase.co/rest/v1/", "key").unwrap();
        assert_eq!(store.table_url("reference_texts"), "https://abc.supabase.co/rest/v1/reference_texts");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("骨格系の基礎", 2), "骨格");
    }

    #[test]
    fn test_http_error_message() {
        let long = "x".repeat(500);
        let err = http_error("POST", "reference_texts", 409, &long);
        let shown = err.to_string();
        assert!(shown.starts_with("POST reference_texts failed: 409 "));
        assert_eq!(shown.len(), "POST reference_texts failed: 409 ".len() + BODY_PREVIEW_CHARS);
    }

    #[test]
    fn test_rejects_unprintable_key() {
        assert!(RestStore::new("https://abc.supabase.co/rest/v1", "bad\nkey").is_err());
    }

    #[test]
    fn test_empty_table_exists() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/reference_texts")
            .match_query(params(&[("select", "id"), ("limit", "1")]))
            .match_header("apikey", "key")
            .match_header("authorization", "Bearer key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create();

        assert!(store(&server).table_exists("reference_texts").unwrap());
        mock.assert();
    }

    #[test]
    fn test_error_status_means_missing_table() {
        let mut server = Server::new();
        let _get = server
            .mock("GET", "/reference_texts")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"relation \"public.reference_texts\" does not exist"}"#)
            .create();

        assert!(!store(&server).table_exists("reference_texts").unwrap());
    }

    #[test]
    fn test_get_sends_filters_and_parses_rows() {
        let mut server = Server::new();
        let _get = server
            .mock("GET", "/questions")
            .match_query(params(&[("question_text", "eq.How many ribs?"), ("select", "id")]))
            .with_status(200)
            .with_body(r#"[{"id": "5b0c7a1e-3f2d-4c8e-9a61-0d2f4b7e8c13"}]"#)
            .create();

        let rows = store(&server)
            .get("questions", &Query::new().eq("question_text", "How many ribs?").select(&["id"]))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("5b0c7a1e-3f2d-4c8e-9a61-0d2f4b7e8c13"));
    }

    #[test]
    fn test_get_failure_is_an_error() {
        let mut server = Server::new();
        let _get = server
            .mock("GET", "/questions")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("upstream down")
            .create();

        let err = store(&server).get("questions", &Query::new()).unwrap_err();
        assert!(matches!(err, Error::Http { method: "GET", status: 500, ref body, .. } if body == "upstream down"));
    }

    #[test]
    fn test_post_failure_keeps_truncated_body() {
        let mut server = Server::new();
        let _post = server
            .mock("POST", "/reference_texts")
            .with_status(409)
            .with_body("d".repeat(500))
            .create();

        let err = store(&server)
            .post("reference_texts", &json!({"text_id": "bone-01"}))
            .unwrap_err();
        let Error::Http { status, body, .. } = err else {
            panic!("expected an HTTP error");
        };
        assert_eq!(status, 409);
        assert_eq!(body.len(), BODY_PREVIEW_CHARS);
    }

    #[test]
    fn test_existing_row_is_not_posted() {
        let mut server = Server::new();
        let _get = server
            .mock("GET", "/reference_texts")
            .match_query(params(&[("text_id", "eq.bone-01"), ("select", "text_id"), ("limit", "1")]))
            .with_status(200)
            .with_body(r#"[{"text_id": "bone-01"}]"#)
            .create();
        let post = server.mock("POST", "/reference_texts").expect(0).create();

        let outcome = store(&server)
            .insert_if_absent(
                "reference_texts",
                &Query::new().eq("text_id", "bone-01"),
                &json!({"text_id": "bone-01"}),
            )
            .unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyPresent);
        post.assert();
    }

    #[test]
    fn test_conflict_ignoring_insert() {
        let mut server = Server::new();
        let _get = server
            .mock("GET", "/reference_texts")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create();
        let post = server
            .mock("POST", "/reference_texts")
            .match_query(params(&[("on_conflict", "text_id")]))
            .match_header("prefer", IGNORE_DUPLICATES)
            .match_body(Matcher::PartialJson(json!({"text_id": "bone-01"})))
            .with_status(201)
            .with_body(r#"[{"id": "00000000-0000-4000-8000-000000000007", "text_id": "bone-01"}]"#)
            .create();

        let outcome = store(&server)
            .insert_if_absent(
                "reference_texts",
                &Query::new().eq("text_id", "bone-01"),
                &json!({"text_id": "bone-01"}),
            )
            .unwrap();
        let InsertOutcome::Inserted(row) = outcome else {
            panic!("expected an insert");
        };
        assert_eq!(row["text_id"], json!("bone-01"));
        post.assert();
    }

    #[test]
    fn test_ignored_duplicate_is_already_present() {
        let mut server = Server::new();
        let _get = server
            .mock("GET", "/question_reference_texts")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create();
        let _post = server
            .mock("POST", "/question_reference_texts")
            .match_query(params(&[("on_conflict", "question_id,reference_text_id")]))
            .with_status(201)
            .with_body("[]")
            .create();

        let key = Query::new().eq("question_id", "q").eq("reference_text_id", "r");
        let outcome = store(&server)
            .insert_if_absent("question_reference_texts", &key, &json!({"question_id": "q"}))
            .unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyPresent);
    }

    #[test]
    fn test_plain_insert_without_conflict_target() {
        let mut server = Server::new();
        let _get = server
            .mock("GET", "/reference_texts")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create();
        let post = server
            .mock("POST", "/reference_texts")
            .match_header("prefer", RETURN_REPRESENTATION)
            .with_status(201)
            .with_body(r#"[{"text_id": "bone-01"}]"#)
            .create();

        let outcome = store(&server)
            .with_ignore_duplicates(false)
            .insert_if_absent(
                "reference_texts",
                &Query::new().eq("text_id", "bone-01"),
                &json!({"text_id": "bone-01"}),
            )
            .unwrap();
        assert!(outcome.is_inserted());
        post.assert();
    }
}
