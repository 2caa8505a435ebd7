//! Row queries against `/rest/v1/{table}`

use crate::error::{ClientError, ClientResult};
use crate::{check_status, decode, SupabaseClient};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

/// Builder for a single row request
///
/// Filters are `column=eq.value` pairs; every terminal method consumes the builder.
pub struct QueryBuilder<'a> {
    client: &'a SupabaseClient,
    table: String,
    columns: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(client: &'a SupabaseClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Restrict the returned columns (default `*`)
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    /// Equality filter
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{}.{}", column, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string pairs for the current builder state
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        pairs.extend(self.filters.iter().cloned());
        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    fn url(&self) -> String {
        format!("{}/rest/v1/{}", self.client.config().url, self.table)
    }

    async fn request(&self, method: Method) -> reqwest::RequestBuilder {
        let request = self.client.http().request(method, self.url());
        self.client.authorized(request).await
    }

    /// Fetch every matching row
    pub async fn fetch_all<T: DeserializeOwned>(self) -> ClientResult<Vec<T>> {
        debug!(table = %self.table, "select");
        let response = self
            .request(Method::GET)
            .await
            .query(&self.query_pairs())
            .send()
            .await?;
        decode(response).await
    }

    /// Fetch at most one row; `None` when nothing matches
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> ClientResult<Option<T>> {
        let rows: Vec<T> = self.limit(1).fetch_all().await?;
        Ok(rows.into_iter().next())
    }

    /// Insert and return the stored rows
    pub async fn insert<B, T>(self, body: &B) -> ClientResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(table = %self.table, "insert");
        let response = self
            .request(Method::POST)
            .await
            .header("Prefer", "return=representation")
            .query(&[("select", self.columns.as_str())])
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    /// Insert without reading the stored rows back
    pub async fn insert_minimal<B: Serialize + ?Sized>(self, body: &B) -> ClientResult<()> {
        debug!(table = %self.table, "insert");
        let response = self
            .request(Method::POST)
            .await
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Update the filtered rows and return them
    pub async fn update<B, T>(self, body: &B) -> ClientResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if self.filters.is_empty() {
            return Err(ClientError::Config(format!(
                "refusing unfiltered update on {}",
                self.table
            )));
        }
        debug!(table = %self.table, "update");
        let response = self
            .request(Method::PATCH)
            .await
            .header("Prefer", "return=representation")
            .query(&self.query_pairs())
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    /// Delete the filtered rows
    pub async fn delete(self) -> ClientResult<()> {
        if self.filters.is_empty() {
            return Err(ClientError::Config(format!(
                "refusing unfiltered delete on {}",
                self.table
            )));
        }
        debug!(table = %self.table, "delete");
        let response = self
            .request(Method::DELETE)
            .await
            .query(&self.filters)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
